//! Configuration loading and management.

mod builder;
mod env;
mod error;
mod file;
mod loader;
mod patterns;
mod resolve;
mod source;

pub use builder::Config;
pub use env::{coerce_value, EnvSource};
pub use error::ConfigError;
pub use file::{FileSource, Format};
pub use loader::{ConfigLoader, DEFAULT_BASE_ENV};
pub use patterns::{ConfigPatterns, WILDCARD};
pub use source::{merge_at_path, ConfigEntry, ConfigSource};
