//! Logger construction for flagenv programs.

pub mod logging;
pub mod severity;

pub use logging::{parse_level, setup_logger, Fields, LogFormat, Logger, LoggerConfig, LoggingError};
pub use severity::Severity;
