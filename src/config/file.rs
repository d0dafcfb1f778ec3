//! File-based configuration source.

use std::path::{Path, PathBuf};

use toml::Table;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Supported configuration file formats, selected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    /// Detects the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn parse(self, contents: &str) -> Result<Table, Box<dyn std::error::Error + Send + Sync>> {
        if contents.trim().is_empty() {
            return Ok(Table::new());
        }
        match self {
            Self::Toml => Ok(toml::from_str(contents)?),
            Self::Yaml => {
                // A document holding only comments parses as null.
                let mut doc: serde_yaml::Value = serde_yaml::from_str(contents)?;
                if doc.is_null() {
                    return Ok(Table::new());
                }
                drop_yaml_nulls(&mut doc, "");
                Ok(serde_yaml::from_value(doc)?)
            }
            Self::Json => {
                let mut doc: serde_json::Value = serde_json::from_str(contents)?;
                drop_json_nulls(&mut doc, "");
                Ok(serde_json::from_value(doc)?)
            }
        }
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Removes `null` mapping entries and sequence items, which have no TOML form.
fn drop_yaml_nulls(value: &mut serde_yaml::Value, path: &str) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            let null_keys: Vec<serde_yaml::Value> = map
                .iter()
                .filter(|(_, v)| v.is_null())
                .map(|(k, _)| k.clone())
                .collect();
            for key in null_keys {
                let name = child_path(path, key.as_str().unwrap_or("?"));
                tracing::debug!(key = %name, "dropping null configuration value");
                map.remove(&key);
            }
            for (key, child) in map.iter_mut() {
                drop_yaml_nulls(child, &child_path(path, key.as_str().unwrap_or("?")));
            }
        }
        serde_yaml::Value::Sequence(items) => {
            items.retain(|item| !item.is_null());
            for item in items.iter_mut() {
                drop_yaml_nulls(item, path);
            }
        }
        serde_yaml::Value::Tagged(tagged) => drop_yaml_nulls(&mut tagged.value, path),
        _ => {}
    }
}

fn drop_json_nulls(value: &mut serde_json::Value, path: &str) {
    match value {
        serde_json::Value::Object(map) => {
            let null_keys: Vec<String> = map
                .iter()
                .filter(|(_, v)| v.is_null())
                .map(|(k, _)| k.clone())
                .collect();
            for key in null_keys {
                tracing::debug!(key = %child_path(path, &key), "dropping null configuration value");
                map.remove(&key);
            }
            for (key, child) in map.iter_mut() {
                drop_json_nulls(child, &child_path(path, key));
            }
        }
        serde_json::Value::Array(items) => {
            items.retain(|item| !item.is_null());
            for item in items.iter_mut() {
                drop_json_nulls(item, path);
            }
        }
        _ => {}
    }
}

/// A configuration source that loads from a TOML, YAML or JSON file.
///
/// Files can be marked as required or optional. Required files that don't exist
/// cause an error; optional files that don't exist are silently skipped.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    /// Creates a new file source.
    ///
    /// If `required` is true, the build will fail if the file doesn't exist.
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }
}

impl ConfigSource for FileSource {
    fn entries(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        match load_config_file(&self.path, self.required)? {
            Some(table) => Ok(vec![ConfigEntry::root(table)]),
            None => Ok(vec![]),
        }
    }
}

/// Loads and parses a config file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
pub fn load_config_file(path: &Path, required: bool) -> Result<Option<Table>, ConfigError> {
    let format =
        Format::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;

    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = format
                .parse(&contents)
                .map_err(|source| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
