//! Loads layered configuration and merges it into pipeline run parameters.
//!
//! [`ConfigLoader`] reads an environment-layered directory of TOML, YAML and
//! JSON files. [`MergeParamsHook`] runs before a pipeline starts, flattens
//! every non-excluded configuration section into `run_params["parameters"]`
//! and lets parameters already on the run take precedence.

pub mod config;
mod error;
pub mod hook;
pub mod logging;

pub use config::{Config, ConfigError, ConfigLoader, ConfigPatterns};
pub use error::Error;
pub use hook::{
    default_hooks, HookRegistry, MergeError, MergeParamsHook, MergeSettings, PipelineHook,
    RunParams,
};
