use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("configuration source is not a directory: {0}")]
    SourceNotFound(PathBuf),

    #[error("configuration environment '{env}' not found under {path}")]
    EnvironmentNotFound { env: String, path: PathBuf },

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk configuration directory: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unsupported config file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("duplicate key '{key}' found in '{first}' and '{second}'")]
    DuplicateKey {
        key: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("no config patterns registered for key '{0}'")]
    UnknownConfigKey(String),

    #[error("invalid config pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),

    #[error("circular reference detected in configuration")]
    CircularReference,

    #[error("referenced path not found: {0}")]
    ReferenceNotFound(String),

    #[error("invalid reference path: {0}")]
    InvalidReferencePath(String),

    #[error("cannot reference non-scalar value: {0}")]
    NonScalarReference(String),

    #[error("unclosed reference (missing '}}')")]
    UnclosedReference,

    #[error("unknown resolver '{0}'")]
    UnknownResolver(String),

    #[error("runtime parameter not found: {0}")]
    RuntimeParamNotFound(String),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

impl ConfigError {
    /// Returns `true` when the error means the configuration could not be
    /// read at all, as opposed to being read and found invalid.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::SourceNotFound(_)
                | Self::EnvironmentNotFound { .. }
                | Self::ReadError { .. }
                | Self::WalkError(_)
        )
    }
}
