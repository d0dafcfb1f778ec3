//! Environment-layered configuration directory loader.
//!
//! A configuration root holds one directory per environment:
//!
//! ```text
//! conf/
//! ├── base/
//! │   ├── parameters.yml
//! │   └── pipelines/parameters_training.toml
//! └── local/
//!     └── parameters.yml
//! ```
//!
//! [`ConfigLoader::get`] selects files by key, merges them per environment,
//! overlays the run environment on the base one and resolves references.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use toml::Table;
use walkdir::WalkDir;

use super::file::{load_config_file, Format};
use super::patterns::ConfigPatterns;
use super::resolve::resolve_references;
use super::source::deep_merge;
use super::ConfigError;

/// Environment loaded first and always required.
pub const DEFAULT_BASE_ENV: &str = "base";

/// Key whose result also receives the runtime parameters as overrides.
const PARAMETERS_KEY: &str = "parameters";

/// Loads configuration from an environment-layered directory tree.
///
/// ## Example
///
/// ```no_run
/// use confmerge::ConfigLoader;
///
/// let loader = ConfigLoader::new("conf").with_run_env("local");
/// let parameters = loader.get("parameters")?;
/// let everything = loader.get("**")?;
/// # Ok::<(), confmerge::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    conf_source: PathBuf,
    base_env: String,
    run_env: Option<String>,
    runtime_params: Table,
    patterns: ConfigPatterns,
}

impl ConfigLoader {
    pub fn new(conf_source: impl AsRef<Path>) -> Self {
        Self {
            conf_source: conf_source.as_ref().to_path_buf(),
            base_env: DEFAULT_BASE_ENV.to_string(),
            run_env: None,
            runtime_params: Table::new(),
            patterns: ConfigPatterns::default(),
        }
    }

    #[must_use]
    pub fn with_base_env(mut self, env: impl Into<String>) -> Self {
        self.base_env = env.into();
        self
    }

    /// Sets the environment layered over the base environment.
    ///
    /// A run environment equal to the base, or missing on disk, adds nothing.
    #[must_use]
    pub fn with_run_env(mut self, env: impl Into<String>) -> Self {
        self.run_env = Some(env.into());
        self
    }

    /// Sets the runtime parameters used for `${runtime_params:...}` references
    /// and as overrides of the `parameters` key.
    #[must_use]
    pub fn with_runtime_params(mut self, runtime_params: Table) -> Self {
        self.runtime_params = runtime_params;
        self
    }

    #[must_use]
    pub fn with_patterns(mut self, patterns: ConfigPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    /// Loads the configuration answering `key`.
    ///
    /// `"**"` selects every file; any other key uses its registered patterns.
    pub fn get(&self, key: &str) -> Result<Table, ConfigError> {
        if !self.conf_source.is_dir() {
            return Err(ConfigError::SourceNotFound(self.conf_source.clone()));
        }
        let matcher = self.patterns.matcher(key)?;

        let base_dir = self.conf_source.join(&self.base_env);
        if !base_dir.is_dir() {
            return Err(ConfigError::EnvironmentNotFound {
                env: self.base_env.clone(),
                path: self.conf_source.clone(),
            });
        }
        let mut merged = load_env_dir(&base_dir, &matcher)?;

        if let Some(run_env) = self.run_env.as_deref().filter(|env| *env != self.base_env) {
            let run_dir = self.conf_source.join(run_env);
            if run_dir.is_dir() {
                // Run environment replaces whole top-level keys.
                merged.extend(load_env_dir(&run_dir, &matcher)?);
            } else {
                tracing::debug!(env = run_env, "run environment not found, skipping");
            }
        }

        if key == PARAMETERS_KEY && !self.runtime_params.is_empty() {
            deep_merge(&mut merged, self.runtime_params.clone());
        }

        resolve_references(&mut merged, &self.runtime_params)?;

        tracing::debug!(key, keys = merged.len(), "configuration loaded");
        Ok(merged)
    }
}

/// Loads and merges every matching file of one environment directory.
///
/// A top-level key may be defined by only one file per environment.
fn load_env_dir(dir: &Path, matcher: &GlobSet) -> Result<Table, ConfigError> {
    let mut merged = Table::new();
    let mut origins: BTreeMap<String, PathBuf> = BTreeMap::new();

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || Format::from_path(entry.path()).is_none() {
            continue;
        }
        let Some(stem) = relative_stem(dir, entry.path()) else {
            continue;
        };
        if !matcher.is_match(&stem) {
            continue;
        }

        let Some(table) = load_config_file(entry.path(), true)? else {
            continue;
        };
        for (key, value) in table {
            if let Some(first) = origins.get(&key) {
                return Err(ConfigError::DuplicateKey {
                    key,
                    first: first.clone(),
                    second: entry.path().to_path_buf(),
                });
            }
            origins.insert(key.clone(), entry.path().to_path_buf());
            merged.insert(key, value);
        }
    }

    Ok(merged)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Relative path of `path` under `dir` with `/` separators and no extension.
fn relative_stem(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?.with_extension("");
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn conf_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/parameters.yml", "model:\n  lr: 0.1\n");
        write(dir.path(), "base/spark.yml", "spark:\n  executor.memory: 4g\n");
        write(dir.path(), "base/catalog.toml", "[raw]\ntype = \"csv\"\n");
        write(dir.path(), "base/flags.json", r#"{"flag": true}"#);
        dir
    }

    #[test]
    fn test_wildcard_loads_every_file() {
        let dir = conf_tree();
        let all = ConfigLoader::new(dir.path()).get("**").unwrap();

        let keys: Vec<&str> = all.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["flag", "model", "raw", "spark"]);
        assert_eq!(all["spark"]["executor.memory"].as_str(), Some("4g"));
    }

    #[test]
    fn test_keyed_lookup_uses_patterns() {
        let dir = conf_tree();
        write(dir.path(), "base/pipelines/parameters_eval.yml", "metric: f1\n");

        let params = ConfigLoader::new(dir.path()).get("parameters").unwrap();

        assert_eq!(params.len(), 2);
        assert_eq!(params["model"]["lr"].as_float(), Some(0.1));
        assert_eq!(params["metric"].as_str(), Some("f1"));
    }

    #[test]
    fn test_run_env_replaces_top_level_keys() {
        let dir = conf_tree();
        write(dir.path(), "local/parameters.yml", "model:\n  dropout: 0.2\n");

        let params = ConfigLoader::new(dir.path())
            .with_run_env("local")
            .get("parameters")
            .unwrap();

        assert_eq!(params["model"]["dropout"].as_float(), Some(0.2));
        assert!(params["model"].get("lr").is_none());
    }

    #[test]
    fn test_missing_run_env_is_skipped() {
        let dir = conf_tree();
        let params = ConfigLoader::new(dir.path())
            .with_run_env("staging")
            .get("parameters")
            .unwrap();

        assert_eq!(params["model"]["lr"].as_float(), Some(0.1));
    }

    #[test]
    fn test_runtime_params_override_parameters_only() {
        let dir = conf_tree();
        let runtime: Table = toml::from_str("[model]\nlr = 0.5\n").unwrap();
        let loader = ConfigLoader::new(dir.path()).with_runtime_params(runtime);

        let params = loader.get("parameters").unwrap();
        assert_eq!(params["model"]["lr"].as_float(), Some(0.5));

        let all = loader.get("**").unwrap();
        assert_eq!(all["model"]["lr"].as_float(), Some(0.1));
    }

    #[test]
    fn test_duplicate_keys_within_env() {
        let dir = conf_tree();
        write(dir.path(), "base/more_params.yml", "flag: false\n");

        let result = ConfigLoader::new(dir.path()).get("**");

        assert!(matches!(result, Err(ConfigError::DuplicateKey { ref key, .. }) if key == "flag"));
    }

    #[test]
    fn test_hidden_and_unsupported_files_ignored() {
        let dir = conf_tree();
        write(dir.path(), "base/.flags.yml", "flag: false\n");
        write(dir.path(), "base/.ipynb_checkpoints/parameters.yml", "model: 1\n");
        write(dir.path(), "base/README.md", "# conf\n");

        let all = ConfigLoader::new(dir.path()).get("**").unwrap();

        assert_eq!(all["flag"].as_bool(), Some(true));
        assert!(all["model"].is_table());
    }

    #[test]
    fn test_missing_source() {
        let result = ConfigLoader::new("/nonexistent/conf").get("**");

        assert!(matches!(result, Err(ConfigError::SourceNotFound(_))));
        assert!(result.unwrap_err().is_unreadable());
    }

    #[test]
    fn test_missing_base_env() {
        let dir = TempDir::new().unwrap();
        let result = ConfigLoader::new(dir.path()).get("**");

        assert!(matches!(result, Err(ConfigError::EnvironmentNotFound { .. })));
    }

    #[test]
    fn test_references_resolved_across_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/globals.yml", "paths:\n  data: /mnt/data\n");
        write(
            dir.path(),
            "base/catalog.yml",
            "raw:\n  filepath: \"${paths.data}/raw.csv\"\n",
        );

        let all = ConfigLoader::new(dir.path()).get("**").unwrap();

        assert_eq!(all["raw"]["filepath"].as_str(), Some("/mnt/data/raw.csv"));
    }
}
