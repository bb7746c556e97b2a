//! Utility functions and types for the monitor bot.

pub mod error;
mod logging;

pub use error::Error;
pub use logging::init_logging;

/// Common result type for utility functions
pub type Result<T> = std::result::Result<T, Error>;
