//! Settings for the parameter merge hook.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml::Table;

use crate::config::{Config, ConfigError, ConfigLoader, DEFAULT_BASE_ENV};

/// Prefix of environment variables overriding settings, e.g. `CONFMERGE__ENV`.
pub const SETTINGS_ENV_PREFIX: &str = "CONFMERGE";

/// Where configuration is read from and which sections stay out of the run
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Configuration root holding one directory per environment.
    pub conf_source: PathBuf,
    /// Base environment label.
    pub env: String,
    /// Optional environment layered over `env`.
    pub run_env: Option<String>,
    /// Top-level sections never merged into the parameters.
    pub excluded_sections: BTreeSet<String>,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            conf_source: PathBuf::from("conf"),
            env: DEFAULT_BASE_ENV.to_string(),
            run_env: None,
            excluded_sections: BTreeSet::from(["spark".to_string()]),
        }
    }
}

impl MergeSettings {
    pub fn new(conf_source: impl AsRef<Path>) -> Self {
        Self {
            conf_source: conf_source.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Settings for a project laid out as `<root>/conf/<env>/...`.
    pub fn for_project(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join("conf"))
    }

    #[must_use]
    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }

    #[must_use]
    pub fn with_run_env(mut self, env: impl Into<String>) -> Self {
        self.run_env = Some(env.into());
        self
    }

    /// Adds a section to the exclusion set.
    #[must_use]
    pub fn exclude(mut self, section: impl Into<String>) -> Self {
        self.excluded_sections.insert(section.into());
        self
    }

    /// Loads settings from an optional file, overridden by `CONFMERGE__*`
    /// environment variables. Unset fields keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.with_file(path, true);
        }
        builder.with_env(SETTINGS_ENV_PREFIX, "__").build()
    }

    /// Builds the loader for one merge, carrying the run's runtime parameters.
    pub fn loader(&self, runtime_params: Table) -> ConfigLoader {
        let loader = ConfigLoader::new(&self.conf_source)
            .with_base_env(&self.env)
            .with_runtime_params(runtime_params);
        match &self.run_env {
            Some(run_env) => loader.with_run_env(run_env),
            None => loader,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = MergeSettings::default();

        assert_eq!(settings.conf_source, PathBuf::from("conf"));
        assert_eq!(settings.env, "base");
        assert_eq!(settings.run_env, None);
        assert!(settings.excluded_sections.contains("spark"));
    }

    #[test]
    fn test_for_project() {
        let settings = MergeSettings::for_project("/srv/project").exclude("mlflow");

        assert_eq!(settings.conf_source, PathBuf::from("/srv/project/conf"));
        assert_eq!(settings.excluded_sections.len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("confmerge.yml");
        fs::write(
            &path,
            "conf_source: /etc/pipeline/conf\nrun_env: prod\nexcluded_sections: [spark, dask]\n",
        )
        .unwrap();

        let settings = MergeSettings::load(Some(&path)).unwrap();

        assert_eq!(settings.conf_source, PathBuf::from("/etc/pipeline/conf"));
        assert_eq!(settings.env, "base");
        assert_eq!(settings.run_env.as_deref(), Some("prod"));
        assert!(settings.excluded_sections.contains("dask"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = MergeSettings::load(Some(Path::new("/nonexistent/confmerge.toml")));

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
