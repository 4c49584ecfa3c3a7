//! Global subscriber installation

use crate::{LogLevel, ReloadError, ReloadHandle};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload;

/// Environment variable that, when set, replaces the level filter with an
/// [`EnvFilter`] directive string.
pub const LOG_ENV: &str = "PLASMAPKG_LOG";

/// Install the global subscriber: a reloadable level filter and a compact
/// formatter writing to stderr.
///
/// Returns `Ok(false)` when a global subscriber was already installed; the
/// level is then applied through the reload handle, which fails when that
/// subscriber did not come from this function.
pub fn init_logging(level: LogLevel) -> Result<bool, ReloadError> {
    let (filter, handle) = reload::Layer::new(level.to_filter());

    let (env_filter, rejected) = match std::env::var(LOG_ENV) {
        Ok(directives) => match EnvFilter::try_new(&directives) {
            Ok(env_filter) => (Some(env_filter), None),
            Err(e) => (None, Some((directives, e))),
        },
        Err(_) => (None, None),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(level <= LogLevel::Debug)
        .compact();

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if !installed {
        ReloadHandle::global().reload_level(level)?;
        return Ok(false);
    }

    ReloadHandle::global().set_handle(handle);
    if let Some((directives, e)) = rejected {
        tracing::warn!(%directives, error = %e, "Ignoring invalid {}", LOG_ENV);
    }
    Ok(true)
}
