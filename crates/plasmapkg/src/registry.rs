//! Structure registry.
//!
//! Structures are registered under a name (`Plasma/Applet`) and optionally a
//! script API. [`PackageLoader::load_package`] turns a name into a fresh,
//! unbound [`Package`]. The canonical [`StructureDefinition`] of each
//! structure is built once at registration and shared by every package
//! loaded from it until that package mutates its own copy.

use crate::structures::builtin_structures;
use crate::{LoaderConfig, Package, PackageResult, StructureDefinition};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Directory (below each data dir) holding structure description files.
pub const PACKAGE_FORMATS_DIR: &str = "packageformats";

/// Global loader
static PACKAGE_LOADER: OnceCell<PackageLoader> = OnceCell::new();

/// Behaviour of a class of package.
///
/// `init_package` declares the layout; `path_changed` may adjust a single
/// package once it is bound to a root (for instance to honour a main script
/// named in its metadata).
pub trait PackageStructure: Send + Sync {
    /// Registry name, e.g. `Plasma/Generic`.
    fn name(&self) -> &str;

    /// Populate a fresh definition.
    fn init_package(&self, definition: &mut StructureDefinition);

    /// Called after a package built from this structure got a new root.
    fn path_changed(&self, _package: &mut Package) {}
}

/// Structure read from a description file.
#[derive(Debug, Clone)]
pub struct DescribedStructure {
    name: String,
    definition: StructureDefinition,
}

impl DescribedStructure {
    #[must_use]
    pub fn new(name: &str, definition: StructureDefinition) -> Self {
        Self {
            name: name.to_string(),
            definition,
        }
    }

    /// Load a TOML structure description.
    pub fn from_file<P: AsRef<Path>>(name: &str, path: P) -> PackageResult<Self> {
        let definition = StructureDefinition::from_file(path)?;
        Ok(Self::new(name, definition))
    }
}

impl PackageStructure for DescribedStructure {
    fn name(&self) -> &str {
        &self.name
    }

    fn init_package(&self, definition: &mut StructureDefinition) {
        *definition = self.definition.clone();
    }
}

struct Registered {
    structure: Arc<dyn PackageStructure>,
    definition: StructureDefinition,
}

/// Maps structure names to structures and hands out packages.
pub struct PackageLoader {
    config: LoaderConfig,
    structures: DashMap<(String, String), Registered>,
}

impl Default for PackageLoader {
    fn default() -> Self {
        Self::with_builtin_structures(LoaderConfig::default())
    }
}

impl PackageLoader {
    /// Loader with no structures registered.
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            structures: DashMap::new(),
        }
    }

    /// Loader preloaded with the `Plasma/*` structures.
    #[must_use]
    pub fn with_builtin_structures(config: LoaderConfig) -> Self {
        let loader = Self::new(config);
        for structure in builtin_structures(&loader.config.platforms) {
            loader.register(structure);
        }
        loader
    }

    /// Get the global loader, built from the default configuration.
    pub fn global() -> &'static PackageLoader {
        PACKAGE_LOADER.get_or_init(PackageLoader::default)
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Register a structure for every script API.
    pub fn register(&self, structure: Arc<dyn PackageStructure>) {
        self.register_for_api("", structure);
    }

    /// Register a structure for one script API. Replaces any structure
    /// previously registered under the same name and API.
    pub fn register_for_api(&self, api: &str, structure: Arc<dyn PackageStructure>) {
        let name = structure.name().to_string();
        let mut definition = StructureDefinition::new(&name);
        structure.init_package(&mut definition);

        debug!(structure = %name, api, "Registering package structure");
        self.structures.insert(
            (name, api.to_string()),
            Registered {
                structure,
                definition,
            },
        );
    }

    /// Names of every registered structure, sorted and without duplicates.
    #[must_use]
    pub fn known_structures(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .structures
            .iter()
            .map(|entry| entry.key().0.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Shared canonical definition of a registered structure.
    #[must_use]
    pub fn canonical_definition(&self, name: &str) -> Option<StructureDefinition> {
        self.structures
            .get(&(name.to_string(), String::new()))
            .map(|entry| entry.definition.clone())
    }

    /// Fresh, unbound package for the structure `name`.
    ///
    /// Tries the structure registered for `(name, api)`, then the one
    /// registered for all APIs, then a description file
    /// `packageformats/<name>.toml` in the data directories, then `name` as a
    /// path to a description file. An unknown name yields an invalid package.
    pub fn load_package(&self, name: &str, api: &str) -> Package {
        let Some(mut package) = self.find(name, api).or_else(|| self.load_described(name)) else {
            warn!(structure = %name, api, "Unknown package structure");
            return Package::default();
        };

        package.set_data_dirs(self.config.data_dirs.clone());
        package
    }

    fn find(&self, name: &str, api: &str) -> Option<Package> {
        let exact = (!api.is_empty())
            .then(|| self.structures.get(&(name.to_string(), api.to_string())))
            .flatten();
        let entry = exact.or_else(|| self.structures.get(&(name.to_string(), String::new())))?;

        Some(Package::with_definition(
            Arc::clone(&entry.structure),
            entry.definition.clone(),
        ))
    }

    fn load_described(&self, name: &str) -> Option<Package> {
        if name.is_empty() {
            return None;
        }

        let file_name = format!("{PACKAGE_FORMATS_DIR}/{name}.toml");
        let candidates = self
            .config
            .locations(&file_name)
            .into_iter()
            .chain(std::iter::once(Path::new(name).to_path_buf()));

        for candidate in candidates {
            if !candidate.is_file() {
                continue;
            }
            match DescribedStructure::from_file(name, &candidate) {
                Ok(structure) => {
                    debug!(
                        structure = %name,
                        file = %candidate.display(),
                        "Loaded structure description"
                    );
                    self.register(Arc::new(structure));
                    return self.find(name, "");
                }
                Err(e) => {
                    warn!(file = %candidate.display(), error = %e, "Invalid structure description");
                }
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "registry/registry_tests.rs"]
mod registry_tests;
