//! # visca
//!
//! Rust implementation of the VISCA camera control protocol.
//!
//! ## Features
//!
//! - Bit-exact command/response codec
//! - Two-phase acknowledge/completion handshake with per-phase timeouts
//! - Interchangeable serial, TCP and UDP transports
//! - Async/await API using Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use visca::{Command, Controller, NetworkMode, TcpTransport};
//!
//! #[tokio::main]
//! async fn main() -> visca::Result<()> {
//!     let transport = TcpTransport::new("192.168.1.100", 5678, NetworkMode::Client);
//!     let controller = Controller::new(transport);
//!
//!     controller.connect().await?;
//!     controller.execute(&Command::power_on(1)).await?;
//!
//!     let info = controller.version_info().await?;
//!     println!("{info}");
//!
//!     controller.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod error;

// Re-exports
pub use controller::Controller;
pub use error::{Error, Result};

// Re-export types
pub use visca_core::{Command, FrameQueue, Response, ResponseKind};
pub use visca_transport::{NetworkMode, SerialTransport, TcpTransport, Transport, UdpTransport};
pub use visca_types::{PowerState, VersionInfo};
