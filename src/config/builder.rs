use std::path::Path;

use serde::de::DeserializeOwned;
use toml::Table;

use super::env::EnvSource;
use super::file::FileSource;
use super::resolve::resolve_references;
use super::source::{merge_at_path, ConfigSource};
use super::ConfigError;

/// Builder for typed configuration layered from files and environment variables.
///
/// Files may be TOML, YAML or JSON, selected by extension. Sources are merged in
/// registration order, with later sources overriding earlier ones. Nested tables
/// are merged recursively; other values (including arrays) are replaced entirely.
///
/// String values can reference other values using `${path.to.field}` syntax,
/// or read the environment with `${env:VAR}`. Use `$$` to escape a literal `$`.
///
/// ## Example
///
/// ```no_run
/// use confmerge::Config;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct MyConfig {
///     conf_source: String,
///     env: String,
/// }
///
/// let config: MyConfig = Config::builder()
///     .with_file("confmerge.toml", true)
///     .with_env("CONFMERGE", "__")
///     .build()?;
/// # Ok::<(), confmerge::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Config {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl Config {
    /// Creates a new configuration builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds a configuration file to be loaded.
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(self, path: impl AsRef<Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Loads configuration from environment variables with the given prefix.
    ///
    /// `MYAPP__DATABASE__PORT=5432` with prefix `MYAPP` and separator `__`
    /// sets `database.port` to the integer `5432`. Path segments are
    /// lowercased; values are coerced to integer, float, boolean or string.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    /// Adds an arbitrary source.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Builds the configuration by loading, merging, resolving, and deserializing.
    pub fn build<T: DeserializeOwned>(self) -> Result<T, ConfigError> {
        let mut merged = Table::new();

        for source in &self.sources {
            for entry in source.entries()? {
                merge_at_path(&mut merged, &entry.path, entry.value);
            }
        }

        resolve_references(&mut merged, &Table::new())?;

        let value = toml::Value::Table(merged);
        value.try_into().map_err(ConfigError::DeserializeError)
    }
}
