//! Loader, structure type and install root shared by every command.

use anyhow::{Context, Result, bail};
use plasmapkg::{LoaderConfig, Package, PackageLoader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read the loader configuration, or use the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<LoaderConfig> {
    match path {
        Some(path) => {
            debug!(config = %path.display(), "Loading configuration");
            LoaderConfig::from_file(path)
                .with_context(|| format!("Failed to read configuration {}", path.display()))
        }
        None => Ok(LoaderConfig::default()),
    }
}

pub struct Session {
    loader: PackageLoader,
    package_type: String,
    root: Option<PathBuf>,
}

impl Session {
    pub fn new(config: LoaderConfig, package_type: &str, root: Option<PathBuf>) -> Self {
        Self {
            loader: PackageLoader::with_builtin_structures(config),
            package_type: package_type.to_string(),
            root,
        }
    }

    pub fn loader(&self) -> &PackageLoader {
        &self.loader
    }

    /// Unbound package of the selected type.
    pub fn template(&self) -> Result<Package> {
        let package = self.loader.load_package(&self.package_type, "");
        if package.structure().is_none() {
            bail!("Unknown package type: {}", self.package_type);
        }
        Ok(package)
    }

    /// Package of the selected type bound to `location`, a directory or a
    /// plugin id below the install root.
    pub fn open(&self, location: &str) -> Result<Package> {
        let mut package = self.template()?;

        let candidate = Path::new(location);
        if !candidate.is_dir()
            && let Some(root) = &self.root
        {
            package.set_path(root.join(location));
        } else {
            package.set_path(candidate);
        }

        let Some(root) = package.path() else {
            bail!("Package not found: {location}");
        };
        debug!(location, root = %root.display(), "Opened package");
        Ok(package)
    }

    /// Where packages of the selected type are installed.
    pub fn install_root(&self, template: &Package) -> Result<PathBuf> {
        let root = template
            .install_root(self.root.as_deref())
            .context("No install location available")?;
        debug!(package_type = %self.package_type, root = %root.display(), "Install root");
        Ok(root)
    }
}
