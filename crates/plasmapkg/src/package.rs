//! Packages: a structure bound to a root directory.
//!
//! A [`Package`] resolves logical keys (`mainscript`, `images`, ...) to
//! absolute paths below its root, caching every answer. When a key cannot be
//! resolved locally the lookup is delegated to the fallback package, and to
//! its fallback in turn. Chains may be cyclic; each lookup tracks the
//! packages it has visited and gives up after [`MAX_FALLBACK_DEPTH`] hops.
//!
//! `Package` is a cheap handle. Cloning shares all state including the
//! resolution cache; the first mutation detaches a private copy.

use crate::hash::hash_directory;
use crate::install::Installer;
use crate::resolver::PathResolver;
use crate::{
    METADATA_DESKTOP, METADATA_JSON, METADATA_KEY, PackageError, PackageMetadata, PackageResult,
    PackageStructure, StructureDefinition,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Upper bound on fallback hops followed by a single lookup.
pub const MAX_FALLBACK_DEPTH: usize = 32;

/// Where a cached answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Local,
    Fallback,
    Miss,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    path: Option<PathBuf>,
    origin: Origin,
}

type CacheKey = (String, String);

/// Identity used for cycle detection along a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identity {
    Root(PathBuf),
    Shared(usize),
}

/// Result of one step along a fallback chain.
struct Lookup {
    path: Option<PathBuf>,
    origin: Origin,
    /// The chain was cut short by the visited set or the hop limit.
    truncated: bool,
}

struct PackageData {
    structure: Option<Arc<dyn PackageStructure>>,
    definition: StructureDefinition,
    has_structure: bool,
    path: Option<PathBuf>,
    metadata: Option<PackageMetadata>,
    fallback: Option<Package>,
    data_dirs: Vec<PathBuf>,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl Default for PackageData {
    fn default() -> Self {
        Self {
            structure: None,
            definition: StructureDefinition::default(),
            has_structure: false,
            path: None,
            metadata: None,
            fallback: None,
            data_dirs: Vec::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl Clone for PackageData {
    fn clone(&self) -> Self {
        Self {
            structure: self.structure.clone(),
            definition: self.definition.clone(),
            has_structure: self.has_structure,
            path: self.path.clone(),
            metadata: self.metadata.clone(),
            fallback: self.fallback.clone(),
            data_dirs: self.data_dirs.clone(),
            cache: Mutex::new(self.cache.lock().clone()),
        }
    }
}

/// A structure bound to a concrete root directory.
///
/// # Example
///
/// ```no_run
/// use plasmapkg::PackageLoader;
///
/// let mut package = PackageLoader::global().load_package("Plasma/Applet", "");
/// package.set_path("/usr/share/plasma/plasmoids/org.kde.plasma.clock");
///
/// if package.is_valid() {
///     let main = package.file_path_for("mainscript");
///     println!("{main:?}");
/// }
/// ```
#[derive(Clone, Default)]
pub struct Package {
    d: Arc<PackageData>,
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("structure", &self.d.structure.as_ref().map(|s| s.name().to_string()))
            .field("type_name", &self.d.definition.type_name())
            .field("path", &self.d.path)
            .field("has_fallback", &self.d.fallback.is_some())
            .finish()
    }
}

impl Package {
    /// Package built from a bare structure definition, with no root yet.
    #[must_use]
    pub fn new(definition: StructureDefinition) -> Self {
        Self {
            d: Arc::new(PackageData {
                definition,
                has_structure: true,
                ..PackageData::default()
            }),
        }
    }

    /// Package built by a structure, which also receives `path_changed`
    /// notifications.
    #[must_use]
    pub fn from_structure(structure: Arc<dyn PackageStructure>) -> Self {
        let mut definition = StructureDefinition::new(structure.name());
        structure.init_package(&mut definition);
        Self::with_definition(structure, definition)
    }

    pub(crate) fn with_definition(
        structure: Arc<dyn PackageStructure>,
        definition: StructureDefinition,
    ) -> Self {
        Self {
            d: Arc::new(PackageData {
                structure: Some(structure),
                definition,
                has_structure: true,
                ..PackageData::default()
            }),
        }
    }

    fn detach(&mut self) -> &mut PackageData {
        Arc::make_mut(&mut self.d)
    }

    /// Detach and drop every cached answer.
    fn detach_and_clear(&mut self) -> &mut PackageData {
        let d = self.detach();
        d.cache.get_mut().clear();
        d
    }

    /// True when both values still point at the same shared state.
    #[must_use]
    pub fn shares_data_with(&self, other: &Package) -> bool {
        Arc::ptr_eq(&self.d, &other.d)
    }

    /// The structure behaviour attached to this package, if any.
    #[must_use]
    pub fn structure(&self) -> Option<&Arc<dyn PackageStructure>> {
        self.d.structure.as_ref()
    }

    /// The layout this package resolves against.
    #[must_use]
    pub fn structure_definition(&self) -> &StructureDefinition {
        &self.d.definition
    }

    // ------------------------------------------------------------------
    // Root path
    // ------------------------------------------------------------------

    /// Canonical root directory, if bound.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.d.path.as_deref()
    }

    /// Directories searched when [`Package::set_path`] receives a relative
    /// path that does not exist as given.
    pub fn set_data_dirs(&mut self, data_dirs: Vec<PathBuf>) {
        self.detach().data_dirs = data_dirs;
    }

    #[must_use]
    pub fn data_dirs(&self) -> &[PathBuf] {
        &self.d.data_dirs
    }

    /// Bind the package to a root directory.
    ///
    /// The path is canonicalised. A relative path that does not exist as
    /// given is looked up as `<data dir>/<default package root>/<path>`. A
    /// path that cannot be found unbinds the package.
    pub fn set_path<P: AsRef<Path>>(&mut self, path: P) {
        let located = self.locate(path.as_ref());
        if located == self.d.path {
            return;
        }

        debug!(path = ?located, "Package root changed");
        {
            let d = self.detach_and_clear();
            d.metadata = located.as_deref().and_then(load_metadata);
            d.path = located;
        }

        if self.d.path.is_some()
            && let Some(structure) = self.d.structure.clone()
        {
            structure.path_changed(self);
        }
    }

    fn locate(&self, requested: &Path) -> Option<PathBuf> {
        if requested.as_os_str().is_empty() {
            return None;
        }

        let mut candidates = vec![requested.to_path_buf()];
        if requested.is_relative() {
            let package_root = self.d.definition.default_package_root().trim_matches('/');
            candidates.extend(
                self.d
                    .data_dirs
                    .iter()
                    .map(|dir| dir.join(package_root).join(requested)),
            );
        }

        let located = candidates
            .iter()
            .filter_map(|candidate| std::fs::canonicalize(candidate).ok())
            .find(|canonical| canonical.is_dir());

        if located.is_none() {
            debug!(path = %requested.display(), "Package root not found");
        }
        located
    }

    // ------------------------------------------------------------------
    // Fallback chain
    // ------------------------------------------------------------------

    /// Consult `fallback` for lookups that miss locally.
    ///
    /// The package keeps a snapshot of `fallback`; later changes to the
    /// caller's copy are not seen. Cached misses and answers that came from a
    /// previous fallback are dropped, local hits are kept.
    ///
    /// Cycles through other packages are allowed. A fallback that is this
    /// very package (same root, or same shared state when unbound) is
    /// ignored.
    pub fn set_fallback_package(&mut self, fallback: &Package) {
        if fallback.identity() == self.identity() {
            warn!(
                package = ?self.d.path,
                "Ignoring package set as its own fallback"
            );
            return;
        }

        let d = self.detach();
        d.fallback = Some(fallback.clone());
        d.cache
            .get_mut()
            .retain(|_, entry| entry.origin == Origin::Local);
    }

    /// Stop consulting any fallback.
    pub fn clear_fallback_package(&mut self) {
        if self.d.fallback.is_none() {
            return;
        }
        let d = self.detach();
        d.fallback = None;
        d.cache
            .get_mut()
            .retain(|_, entry| entry.origin == Origin::Local);
    }

    #[must_use]
    pub fn fallback_package(&self) -> Option<&Package> {
        self.d.fallback.as_ref()
    }

    fn identity(&self) -> Identity {
        match &self.d.path {
            Some(path) => Identity::Root(path.clone()),
            None => Identity::Shared(Arc::as_ptr(&self.d) as usize),
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Absolute path of `key`, with `filename` appended for directory keys.
    ///
    /// Returns `None` when neither this package nor its fallback chain has
    /// the entry, or when the package has no root.
    #[must_use]
    pub fn file_path(&self, key: &str, filename: &str) -> Option<PathBuf> {
        let mut visited = HashSet::new();
        self.lookup(key, filename, &mut visited, 0).path
    }

    /// Shorthand for `file_path(key, "")`.
    #[must_use]
    pub fn file_path_for(&self, key: &str) -> Option<PathBuf> {
        self.file_path(key, "")
    }

    fn lookup(
        &self,
        key: &str,
        filename: &str,
        visited: &mut HashSet<Identity>,
        depth: usize,
    ) -> Lookup {
        let Some(root) = self.d.path.as_deref() else {
            return Lookup {
                path: None,
                origin: Origin::Miss,
                truncated: false,
            };
        };

        if depth > MAX_FALLBACK_DEPTH || !visited.insert(self.identity()) {
            debug!(key, root = %root.display(), "Fallback chain revisits package");
            return Lookup {
                path: None,
                origin: Origin::Miss,
                truncated: true,
            };
        }

        let cache_key = (key.to_string(), filename.to_string());
        if let Some(entry) = self.d.cache.lock().get(&cache_key) {
            return Lookup {
                path: entry.path.clone(),
                origin: entry.origin,
                truncated: false,
            };
        }

        let result = match self.resolve_local(root, key, filename) {
            Some(path) => Lookup {
                path: Some(path),
                origin: Origin::Local,
                truncated: false,
            },
            None => match &self.d.fallback {
                Some(fallback) => {
                    let delegated = fallback.lookup(key, filename, visited, depth + 1);
                    Lookup {
                        origin: if delegated.path.is_some() {
                            Origin::Fallback
                        } else {
                            Origin::Miss
                        },
                        ..delegated
                    }
                }
                None => Lookup {
                    path: None,
                    origin: Origin::Miss,
                    truncated: false,
                },
            },
        };

        // A miss seen through a cut-short chain is not final.
        if result.path.is_some() || !result.truncated {
            self.d.cache.lock().insert(
                cache_key,
                CacheEntry {
                    path: result.path.clone(),
                    origin: result.origin,
                },
            );
        }
        result
    }

    fn resolver<'a>(&'a self, root: &'a Path) -> PathResolver<'a> {
        PathResolver::new(
            root,
            self.d.definition.contents_prefix_paths(),
            self.d.definition.allow_external_paths(),
        )
    }

    fn resolve_local(&self, root: &Path, key: &str, filename: &str) -> Option<PathBuf> {
        let definition = &self.d.definition;
        let resolver = self.resolver(root);

        if key == METADATA_KEY && !definition.contains(key) {
            return [METADATA_JSON, METADATA_DESKTOP]
                .iter()
                .find_map(|name| resolver.resolve_in_root(name));
        }

        if key.is_empty() {
            if filename.is_empty() {
                return None;
            }
            return resolver.resolve(&[], filename);
        }

        let entry = definition.entry(key)?;
        resolver.resolve(&entry.paths, filename)
    }

    /// File names inside the directory registered as `key`.
    #[must_use]
    pub fn entry_list(&self, key: &str) -> Vec<String> {
        let Some(root) = self.d.path.as_deref() else {
            return Vec::new();
        };
        self.resolver(root)
            .entry_list(&self.d.definition.search_paths(key))
    }

    // ------------------------------------------------------------------
    // Validity
    // ------------------------------------------------------------------

    /// True when the root exists and every required entry resolves.
    #[must_use]
    pub fn has_valid_structure(&self) -> bool {
        if !self.d.has_structure {
            return false;
        }
        let Some(root) = self.d.path.as_deref() else {
            return false;
        };
        if !root.exists() {
            return false;
        }

        self.d.definition.required_keys().iter().all(|key| {
            let found = self.file_path_for(key).is_some();
            if !found {
                debug!(key = %key, root = %root.display(), "Required entry missing");
            }
            found
        })
    }

    /// A valid package is bound, structurally complete and has usable
    /// metadata (or none at all).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.d.path.is_some()
            && self.has_valid_structure()
            && self.d.metadata.as_ref().is_none_or(PackageMetadata::is_valid)
    }

    /// Metadata read from the root when the path was set.
    #[must_use]
    pub fn metadata(&self) -> Option<&PackageMetadata> {
        self.d.metadata.as_ref()
    }

    /// SHA-256 over the package contents, or `None` for an unbound package
    /// or one without a contents directory.
    #[must_use]
    pub fn contents_hash(&self) -> Option<String> {
        let root = self.d.path.as_deref()?;
        let prefixes = self.d.definition.contents_prefix_paths();

        let base = if prefixes.is_empty() {
            root.to_path_buf()
        } else {
            prefixes
                .iter()
                .map(|prefix| root.join(prefix.trim_matches('/')))
                .find(|dir| dir.is_dir())?
        };

        match hash_directory(&base) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Failed to hash package contents");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Install
    // ------------------------------------------------------------------

    /// Install `source` (a directory or archive) below `package_root`, or
    /// below the default location when `package_root` is `None`.
    pub fn install<P: AsRef<Path>>(
        &self,
        source: P,
        package_root: Option<&Path>,
    ) -> PackageResult<PathBuf> {
        let root = self.install_root(package_root)?;
        Installer::new().install(self, source.as_ref(), &root)
    }

    /// Remove the package named `package_name` from `package_root`, or from
    /// the default location when `package_root` is `None`.
    pub fn uninstall(&self, package_name: &str, package_root: Option<&Path>) -> PackageResult<()> {
        let root = self.install_root(package_root)?;
        Installer::new().uninstall(package_name, &root)
    }

    /// Replace an installed package with `source`, installing it when absent.
    pub fn upgrade<P: AsRef<Path>>(
        &self,
        source: P,
        package_root: Option<&Path>,
    ) -> PackageResult<PathBuf> {
        let root = self.install_root(package_root)?;
        Installer::new().upgrade(self, source.as_ref(), &root)
    }

    /// Directory packages of this structure are installed into: `package_root`
    /// when given, else the default package root below the first data dir.
    pub fn install_root(&self, package_root: Option<&Path>) -> PackageResult<PathBuf> {
        if let Some(root) = package_root {
            return Ok(root.to_path_buf());
        }
        let relative = self.d.definition.default_package_root().trim_matches('/');
        self.d
            .data_dirs
            .first()
            .map(|dir| dir.join(relative))
            .or_else(|| dirs::data_dir().map(|dir| dir.join(relative)))
            .ok_or_else(|| PackageError::InvalidStructure("no package root available".to_string()))
    }

    // ------------------------------------------------------------------
    // Structure passthrough
    // ------------------------------------------------------------------

    /// Description of `key`.
    #[must_use]
    pub fn name(&self, key: &str) -> String {
        self.d.definition.name(key)
    }

    #[must_use]
    pub fn is_required(&self, key: &str) -> bool {
        self.d.definition.is_required(key)
    }

    #[must_use]
    pub fn mime_types(&self, key: &str) -> Vec<String> {
        self.d.definition.mime_types(key)
    }

    #[must_use]
    pub fn files(&self) -> Vec<String> {
        self.d.definition.files()
    }

    #[must_use]
    pub fn directories(&self) -> Vec<String> {
        self.d.definition.directories()
    }

    #[must_use]
    pub fn required_files(&self) -> Vec<String> {
        self.d.definition.required_files()
    }

    #[must_use]
    pub fn required_directories(&self) -> Vec<String> {
        self.d.definition.required_directories()
    }

    #[must_use]
    pub fn contents_prefix_paths(&self) -> &[String] {
        self.d.definition.contents_prefix_paths()
    }

    #[must_use]
    pub fn default_package_root(&self) -> &str {
        self.d.definition.default_package_root()
    }

    #[must_use]
    pub fn service_prefix(&self) -> &str {
        self.d.definition.service_prefix()
    }

    #[must_use]
    pub fn allow_external_paths(&self) -> bool {
        self.d.definition.allow_external_paths()
    }

    pub fn add_file_definition(&mut self, key: &str, path: &str, name: &str) {
        self.detach_and_clear()
            .definition
            .add_file_definition(key, path, name);
    }

    pub fn add_directory_definition(&mut self, key: &str, path: &str, name: &str) {
        self.detach_and_clear()
            .definition
            .add_directory_definition(key, path, name);
    }

    pub fn remove_definition(&mut self, key: &str) {
        if !self.d.definition.contains(key) {
            return;
        }
        self.detach_and_clear().definition.remove_definition(key);
    }

    /// Replace the candidate paths of `key`, keeping its position.
    pub fn set_search_paths(&mut self, key: &str, paths: Vec<String>) {
        if self
            .d
            .definition
            .entry(key)
            .is_none_or(|entry| entry.paths == paths)
        {
            return;
        }
        self.detach_and_clear()
            .definition
            .set_search_paths(key, paths);
    }

    pub fn set_required(&mut self, key: &str, required: bool) {
        if self.d.definition.is_required(key) == required {
            return;
        }
        self.detach().definition.set_required(key, required);
    }

    pub fn set_mime_types(&mut self, key: &str, mime_types: Vec<String>) {
        self.detach().definition.set_mime_types(key, mime_types);
    }

    pub fn set_default_mime_types(&mut self, mime_types: Vec<String>) {
        self.detach().definition.set_default_mime_types(mime_types);
    }

    pub fn set_contents_prefix_paths(&mut self, prefix_paths: Vec<String>) {
        self.detach_and_clear()
            .definition
            .set_contents_prefix_paths(prefix_paths);
    }

    pub fn set_default_package_root(&mut self, package_root: &str) {
        self.detach()
            .definition
            .set_default_package_root(package_root);
    }

    pub fn set_service_prefix(&mut self, service_prefix: &str) {
        self.detach().definition.set_service_prefix(service_prefix);
    }

    pub fn set_allow_external_paths(&mut self, allow: bool) {
        self.detach_and_clear()
            .definition
            .set_allow_external_paths(allow);
    }
}

fn load_metadata(root: &Path) -> Option<PackageMetadata> {
    match PackageMetadata::from_package_root(root) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "Failed to read package metadata");
            None
        }
    }
}
