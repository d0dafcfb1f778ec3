//! Merges the whole configuration tree into a run's parameters.

use std::collections::BTreeSet;

use toml::{Table, Value};

use super::{MergeError, MergeSettings, PipelineHook, RunParams};
use crate::config::WILDCARD;

/// Run parameter holding the parameters handed to the pipeline.
pub const PARAMETERS_KEY: &str = "parameters";

/// Run parameter holding overrides passed to the configuration loader.
pub const RUNTIME_PARAMS_KEY: &str = "runtime_params";

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    /// Final parameters: configuration entries overridden by caller parameters.
    pub parameters: Table,
    /// Number of entries contributed by configuration.
    pub merged_count: usize,
}

/// Hook that injects every non-excluded configuration section into
/// `run_params["parameters"]` before a pipeline runs.
///
/// Table sections are flattened one level, so `model: {lr: 0.1}` becomes the
/// parameter `lr`. Parameters already present on the run always win.
///
/// ## Example
///
/// ```no_run
/// use confmerge::{MergeParamsHook, MergeSettings, RunParams};
///
/// let hook = MergeParamsHook::new(MergeSettings::for_project("."));
/// let mut run_params = RunParams::new();
/// hook.merge_into(&mut run_params);
/// assert!(run_params["parameters"].is_table());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MergeParamsHook {
    settings: MergeSettings,
}

impl MergeParamsHook {
    pub fn new(settings: MergeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MergeSettings {
        &self.settings
    }

    /// Merges configuration into `run_params`, never failing.
    ///
    /// On failure the error is logged and `parameters` is left as it was, or
    /// set to an empty table if it was missing.
    pub fn merge_into(&self, run_params: &mut RunParams) {
        match self.try_merge(run_params) {
            Ok(Merged {
                parameters,
                merged_count,
            }) => {
                run_params.insert(PARAMETERS_KEY.to_string(), Value::Table(parameters));
                tracing::debug!(
                    count = merged_count,
                    "merged {merged_count} configuration parameters"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "parameter merging failed");
                if !run_params.contains_key(PARAMETERS_KEY) {
                    run_params.insert(PARAMETERS_KEY.to_string(), Value::Table(Table::new()));
                }
            }
        }
    }

    /// Computes the merged parameters without touching `run_params`.
    pub fn try_merge(&self, run_params: &RunParams) -> Result<Merged, MergeError> {
        let runtime_params = table_param(run_params, RUNTIME_PARAMS_KEY)?
            .cloned()
            .unwrap_or_default();
        let existing = table_param(run_params, PARAMETERS_KEY)?;

        let all_conf = self.settings.loader(runtime_params).get(WILDCARD)?;
        let mut parameters = flatten_sections(all_conf, &self.settings.excluded_sections);
        let merged_count = parameters.len();

        if let Some(existing) = existing {
            for (key, value) in existing {
                parameters.insert(key.clone(), value.clone());
            }
        }

        Ok(Merged {
            parameters,
            merged_count,
        })
    }
}

impl<P: ?Sized, C: ?Sized> PipelineHook<P, C> for MergeParamsHook {
    fn before_pipeline_run(&self, run_params: &mut RunParams, _pipeline: &P, _catalog: &C) {
        self.merge_into(run_params);
    }
}

/// Flattens configuration sections into a single table.
///
/// Excluded sections are dropped. Entries of table sections move up one level;
/// other sections keep their own key. Sections are visited in key order, so on
/// collisions the entry from the later section wins.
pub fn flatten_sections(all_conf: Table, excluded: &BTreeSet<String>) -> Table {
    let mut merged = Table::new();
    for (section, value) in all_conf {
        if excluded.contains(&section) {
            continue;
        }
        match value {
            Value::Table(entries) => merged.extend(entries),
            other => {
                merged.insert(section, other);
            }
        }
    }
    merged
}

fn table_param<'a>(run_params: &'a RunParams, key: &str) -> Result<Option<&'a Table>, MergeError> {
    match run_params.get(key) {
        None => Ok(None),
        Some(Value::Table(table)) => Ok(Some(table)),
        Some(_) => Err(MergeError::InvalidRunParam(key.to_string())),
    }
}
