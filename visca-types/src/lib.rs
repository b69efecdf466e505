//! Type definitions for visca

pub mod power;
pub mod version_info;

pub use power::PowerState;
pub use version_info::VersionInfo;
