//! Utility modules
//!
//! - Structured logging setup
//! - Glob expansion and path helpers used by dependency providers
//! - Placeholder expansion for tag templates
//! - Reading definition files from disk or HTTP

pub mod config_file;
pub mod expand;
pub mod logging;
pub mod paths;

pub use config_file::{read_configuration, ReadConfigError};
pub use expand::expand;
pub use logging::{init_logging, LoggingConfig};
pub use paths::{abs_file, expand_paths_glob, is_hidden_dir, is_hidden_file, non_empty_lines};
