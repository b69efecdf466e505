//! # visca-core
//!
//! Core protocol implementation for VISCA cameras.
//!
//! This crate provides the low-level protocol primitives:
//! - Command construction (power, zoom, focus, inquiries)
//! - Response parsing and classification
//! - The bounded frame queue between receive and execution paths
//! - Protocol constants

pub mod command;
pub mod constants;
pub mod error;
pub mod queue;
pub mod response;

pub use command::Command;
pub use constants::{DEFAULT_ADDRESS, DEFAULT_RESPONSE_TIMEOUT_MS, TERMINATOR};
pub use error::{Error, Result};
pub use queue::FrameQueue;
pub use response::{Response, ResponseKind};
