//! Glob patterns selecting which configuration files answer a key.

use std::collections::BTreeMap;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use super::ConfigError;

/// Key that selects every configuration file of an environment.
pub const WILDCARD: &str = "**";

/// Maps a configuration key (e.g. `parameters`) to the glob patterns of the
/// files that provide it.
///
/// Patterns are matched against the file path relative to the environment
/// directory, using `/` separators and without the file extension. A `*` does
/// not cross directory boundaries; `**` does.
#[derive(Debug, Clone)]
pub struct ConfigPatterns {
    patterns: BTreeMap<String, Vec<String>>,
}

impl Default for ConfigPatterns {
    fn default() -> Self {
        let mut patterns = Self::empty();
        for key in ["catalog", "parameters", "credentials"] {
            patterns.insert(
                key,
                [
                    format!("{key}*"),
                    format!("{key}*/**"),
                    format!("**/{key}*"),
                ],
            );
        }
        patterns.insert("globals", ["globals"]);
        patterns
    }
}

impl ConfigPatterns {
    /// Creates a pattern table with no keys registered.
    pub fn empty() -> Self {
        Self {
            patterns: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the patterns for `key`.
    pub fn insert<I, S>(&mut self, key: impl Into<String>, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns
            .insert(key.into(), patterns.into_iter().map(Into::into).collect());
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.patterns.get(key).map(Vec::as_slice)
    }

    /// Compiles the patterns for `key` into a matcher.
    ///
    /// The wildcard key matches everything and needs no registration.
    pub fn matcher(&self, key: &str) -> Result<GlobSet, ConfigError> {
        let wildcard = [WILDCARD.to_string()];
        let patterns = if key == WILDCARD {
            &wildcard[..]
        } else {
            self.get(key)
                .ok_or_else(|| ConfigError::UnknownConfigKey(key.to_string()))?
        };

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::InvalidPattern {
            pattern: patterns.join(", "),
            source,
        })
    }
}
