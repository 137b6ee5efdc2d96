//! Runtime-level errors.
//!
//! Only setup can fail. Once play has begun, problems inside scripts degrade
//! to defaults instead of surfacing here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to parse runtime config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid runtime config: {0}")]
    InvalidConfig(String),
}
