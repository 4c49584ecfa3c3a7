//! Loader configuration

use crate::PackageResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where packages are searched for and which platforms are active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Data directories, highest priority first.
    ///
    /// Relative package paths and structure description files are looked up
    /// under each of these in order.
    #[serde(default = "default_data_dirs")]
    pub data_dirs: Vec<PathBuf>,

    /// Runtime platforms, most specific first (e.g. `["phone", "touch"]`).
    ///
    /// Each one adds a `platformcontents/<platform>/` prefix ahead of
    /// `contents/` for structures that support it.
    #[serde(default)]
    pub platforms: Vec<String>,

    /// Initial log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = dirs::data_dir().into_iter().collect();
    let system = PathBuf::from("/usr/share");
    if !dirs.contains(&system) {
        dirs.push(system);
    }
    dirs
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dirs: default_data_dirs(),
            platforms: Vec::new(),
            log_level: default_log_level(),
        }
    }
}

impl LoaderConfig {
    /// Configuration with no data directories and no platforms.
    ///
    /// Useful for tests and for callers that only work with absolute paths.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data_dirs: Vec::new(),
            platforms: Vec::new(),
            log_level: default_log_level(),
        }
    }

    /// Parse configuration from TOML. Empty input yields the defaults.
    pub fn from_toml(content: &str) -> PackageResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PackageResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Builder-style override of the data directories.
    #[must_use]
    pub fn with_data_dirs(mut self, data_dirs: Vec<PathBuf>) -> Self {
        self.data_dirs = data_dirs;
        self
    }

    /// Builder-style override of the runtime platforms.
    #[must_use]
    pub fn with_platforms(mut self, platforms: Vec<String>) -> Self {
        self.platforms = platforms;
        self
    }

    /// `data_dir/relative` for every data directory, in priority order.
    #[must_use]
    pub fn locations(&self, relative: &str) -> Vec<PathBuf> {
        let relative = relative.trim_start_matches('/');
        self.data_dirs.iter().map(|dir| dir.join(relative)).collect()
    }
}
