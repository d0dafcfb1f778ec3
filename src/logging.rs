//! Logging setup for the confmerge CLI.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary embedding it.

use tracing_subscriber::EnvFilter;

use crate::Error;

/// Initializes a stderr subscriber.
///
/// `verbose` selects `debug` instead of `info` for this crate. `RUST_LOG`
/// overrides both.
pub fn init(verbose: bool) -> Result<(), Error> {
    let level = if verbose { "debug" } else { "info" };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("confmerge={level}")))
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
