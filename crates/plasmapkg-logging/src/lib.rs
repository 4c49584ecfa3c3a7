//! plasmapkg-logging - Tracing setup for plasmapkg tools
//!
//! This crate provides:
//! - [`LogLevel`] parsed from configuration and command line values
//! - [`init_logging`] installing a stderr subscriber
//! - [`ReloadHandle`] to change the level after startup

mod level;
mod reload;
mod subscriber;

pub use level::{LogLevel, ParseLevelError};
pub use reload::{ReloadError, ReloadHandle};
pub use subscriber::{LOG_ENV, init_logging};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LogLevel, ReloadHandle, init_logging};
}
