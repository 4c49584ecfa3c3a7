//! Dynamic log level reloading support

use crate::LogLevel;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{Registry, reload};

/// Failure to change the active level
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("reload handle not initialized")]
    NotInitialized,

    #[error("failed to reload filter: {0}")]
    Reload(#[from] reload::Error),
}

/// Handle for dynamically reloading the log level filter
pub struct ReloadHandle {
    handle: Mutex<Option<reload::Handle<LevelFilter, Registry>>>,
}

impl ReloadHandle {
    /// Create a new reload handle
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Get the global reload handle
    pub fn global() -> &'static ReloadHandle {
        static INSTANCE: OnceCell<ReloadHandle> = OnceCell::new();
        INSTANCE.get_or_init(ReloadHandle::new)
    }

    /// Set the reload handle (called during initialization)
    pub fn set_handle(&self, handle: reload::Handle<LevelFilter, Registry>) {
        *self.handle.lock() = Some(handle);
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Reload the filter to use a new log level
    pub fn reload_level(&self, level: LogLevel) -> Result<(), ReloadError> {
        let guard = self.handle.lock();
        let handle = guard.as_ref().ok_or(ReloadError::NotInitialized)?;
        handle.reload(level.to_filter())?;
        Ok(())
    }

    /// Currently active filter, if initialized
    #[must_use]
    pub fn current_filter(&self) -> Option<LevelFilter> {
        let guard = self.handle.lock();
        guard.as_ref().and_then(|handle| handle.clone_current())
    }
}

impl Default for ReloadHandle {
    fn default() -> Self {
        Self::new()
    }
}
