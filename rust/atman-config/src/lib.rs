// Configuration loading and management
//
// Loading hierarchy: env > file > defaults

pub mod config;
pub mod env;

pub use config::{load_config, load_from_file, validate_config, AtmanConfig, EngineConfig, SandboxConfig};
pub use env::apply_env_overrides;

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
