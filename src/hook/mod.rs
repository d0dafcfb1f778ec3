//! Pipeline lifecycle hooks.
//!
//! A host calls [`HookRegistry::before_pipeline_run`] once per run, right
//! before the run starts. Each registered [`PipelineHook`] may rewrite the run
//! parameters; the pipeline and catalog are passed through untouched.

mod error;
mod merge;
mod settings;

pub use error::MergeError;
pub use merge::{flatten_sections, MergeParamsHook, Merged, PARAMETERS_KEY, RUNTIME_PARAMS_KEY};
pub use settings::{MergeSettings, SETTINGS_ENV_PREFIX};

/// Mutable parameters of an in-flight run, owned by the host.
pub type RunParams = toml::Table;

/// A callback invoked at pipeline lifecycle points.
///
/// `P` and `C` are the host's pipeline and catalog types.
pub trait PipelineHook<P: ?Sized, C: ?Sized>: Send + Sync {
    /// Called immediately before the pipeline runs.
    fn before_pipeline_run(&self, run_params: &mut RunParams, pipeline: &P, catalog: &C);
}

/// Ordered collection of hooks dispatched for each run.
pub struct HookRegistry<P: ?Sized, C: ?Sized> {
    hooks: Vec<Box<dyn PipelineHook<P, C>>>,
}

impl<P: ?Sized, C: ?Sized> HookRegistry<P, C> {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Adds a hook; hooks run in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: impl PipelineHook<P, C> + 'static) -> Self {
        self.register(hook);
        self
    }

    pub fn register(&mut self, hook: impl PipelineHook<P, C> + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn before_pipeline_run(&self, run_params: &mut RunParams, pipeline: &P, catalog: &C) {
        tracing::debug!(hooks = self.hooks.len(), "dispatching before_pipeline_run");
        for hook in &self.hooks {
            hook.before_pipeline_run(run_params, pipeline, catalog);
        }
    }
}

impl<P: ?Sized, C: ?Sized> Default for HookRegistry<P, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized, C: ?Sized> std::fmt::Debug for HookRegistry<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Registry holding the parameter merge hook with the given settings.
pub fn default_hooks<P: ?Sized, C: ?Sized>(settings: MergeSettings) -> HookRegistry<P, C> {
    HookRegistry::new().with_hook(MergeParamsHook::new(settings))
}
