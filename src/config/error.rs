//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("config file `{0}` not found")]
    NotFound(PathBuf),

    #[error("config validation error:\n{}", .0.join("\n"))]
    Validation(Vec<String>),
}
