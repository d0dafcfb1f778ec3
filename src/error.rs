use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type for the confmerge library and CLI.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("failed to render parameters as JSON: {0}")]
    RenderJson(#[from] serde_json::Error),

    #[error("failed to render parameters as TOML: {0}")]
    RenderToml(#[from] toml::ser::Error),
}
