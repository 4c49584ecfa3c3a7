//! Declarative package layouts.
//!
//! A [`StructureDefinition`] names the files and directories a class of
//! package is expected to ship, e.g. `mainscript` → `ui/main.qml`. It is a
//! copy-on-write value: cloning shares the underlying data and the first
//! mutation on either side detaches a private copy.
//!
//! Definitions can also be described in TOML:
//!
//! ```toml
//! [structure]
//! type = "Plasma/Generic"
//! contents_prefix_paths = ["contents/"]
//!
//! [[entry]]
//! key = "mainscript"
//! paths = ["ui/main.qml"]
//! name = "Main Script File"
//! required = true
//! ```

use crate::{PackageError, PackageResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Default prefix under which package contents live.
pub const DEFAULT_CONTENTS_PREFIX: &str = "contents/";

/// Whether an entry names a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// A single named slot in a structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// File or directory.
    pub kind: EntryKind,
    /// Candidate relative paths, checked in registration order.
    pub paths: Vec<String>,
    /// Human readable description.
    pub name: String,
    /// Mimetypes accepted for this entry; empty means "use the defaults".
    pub mime_types: Vec<String>,
    /// A package missing this entry is not valid.
    pub required: bool,
}

impl ContentEntry {
    fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            paths: Vec::new(),
            name: String::new(),
            mime_types: Vec::new(),
            required: false,
        }
    }

    /// True when this entry describes a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StructureData {
    type_name: String,
    entries: Vec<(String, ContentEntry)>,
    contents_prefix_paths: Vec<String>,
    default_package_root: String,
    service_prefix: String,
    allow_external_paths: bool,
    default_mime_types: Vec<String>,
}

impl Default for StructureData {
    fn default() -> Self {
        Self {
            type_name: String::new(),
            entries: Vec::new(),
            contents_prefix_paths: vec![DEFAULT_CONTENTS_PREFIX.to_string()],
            default_package_root: "plasma/plasmoids/".to_string(),
            service_prefix: "plasma-applet-".to_string(),
            allow_external_paths: false,
            default_mime_types: Vec::new(),
        }
    }
}

impl StructureData {
    fn entry(&self, key: &str) -> Option<&ContentEntry> {
        self.entries
            .iter()
            .find_map(|(k, entry)| (k == key).then_some(entry))
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut ContentEntry> {
        self.entries
            .iter_mut()
            .find_map(|(k, entry)| (k == key).then_some(entry))
    }
}

/// Schema of named file and directory slots for a class of package.
///
/// # Example
///
/// ```
/// use plasmapkg::StructureDefinition;
///
/// let mut structure = StructureDefinition::new("Plasma/Generic");
/// structure.add_directory_definition("images", "images", "Images");
/// structure.add_file_definition("mainscript", "ui/main.qml", "Main Script File");
/// structure.set_required("mainscript", true);
///
/// let copy = structure.clone();
/// structure.set_required("mainscript", false);
/// assert!(copy.is_required("mainscript"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureDefinition {
    d: Arc<StructureData>,
}

impl StructureDefinition {
    /// Create an empty structure with the given type name.
    #[must_use]
    pub fn new(type_name: &str) -> Self {
        Self {
            d: Arc::new(StructureData {
                type_name: type_name.to_string(),
                ..StructureData::default()
            }),
        }
    }

    fn detach(&mut self) -> &mut StructureData {
        Arc::make_mut(&mut self.d)
    }

    /// True when both values still point at the same shared data.
    #[must_use]
    pub fn shares_data_with(&self, other: &StructureDefinition) -> bool {
        Arc::ptr_eq(&self.d, &other.d)
    }

    /// Structure type name, e.g. `Plasma/Applet`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.d.type_name
    }

    pub fn set_type_name(&mut self, type_name: &str) {
        self.detach().type_name = type_name.to_string();
    }

    /// Register a candidate file path for `key`.
    ///
    /// Registering an existing key appends another candidate; a non-empty
    /// `name` replaces the description.
    pub fn add_file_definition(&mut self, key: &str, path: &str, name: &str) {
        self.add_definition(key, EntryKind::File, path, name);
    }

    /// Register a candidate directory path for `key`.
    pub fn add_directory_definition(&mut self, key: &str, path: &str, name: &str) {
        self.add_definition(key, EntryKind::Directory, path, name);
    }

    fn add_definition(&mut self, key: &str, kind: EntryKind, path: &str, name: &str) {
        let d = self.detach();
        let entry = match d.entries.iter().position(|(k, _)| k == key) {
            Some(index) => &mut d.entries[index].1,
            None => {
                d.entries.push((key.to_string(), ContentEntry::new(kind)));
                let last = d.entries.len() - 1;
                &mut d.entries[last].1
            }
        };

        if !name.is_empty() {
            entry.name = name.to_string();
        }
        entry.paths.push(path.to_string());
        entry.kind = kind;
    }

    /// Remove every candidate and attribute registered for `key`.
    pub fn remove_definition(&mut self, key: &str) {
        if self.d.entry(key).is_none() {
            return;
        }
        self.detach().entries.retain(|(k, _)| k != key);
    }

    /// Look up the entry registered for `key`.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&ContentEntry> {
        self.d.entry(key)
    }

    /// True when `key` is declared.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.d.entry(key).is_some()
    }

    /// Iterate over all entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ContentEntry)> {
        self.d.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// All candidate relative paths for `key`.
    #[must_use]
    pub fn search_paths(&self, key: &str) -> Vec<String> {
        self.d
            .entry(key)
            .map(|e| e.paths.clone())
            .unwrap_or_default()
    }

    /// Replace the candidate paths of `key` in place, keeping its position
    /// and attributes. Unknown keys are ignored.
    pub fn set_search_paths(&mut self, key: &str, paths: Vec<String>) {
        if self.d.entry(key).is_none_or(|e| e.paths == paths) {
            return;
        }
        if let Some(entry) = self.detach().entry_mut(key) {
            entry.paths = paths;
        }
    }

    /// Description of `key`, empty when unknown.
    #[must_use]
    pub fn name(&self, key: &str) -> String {
        self.d
            .entry(key)
            .map(|e| e.name.clone())
            .unwrap_or_default()
    }

    pub fn set_required(&mut self, key: &str, required: bool) {
        if self.d.entry(key).is_none_or(|e| e.required == required) {
            return;
        }
        if let Some(entry) = self.detach().entry_mut(key) {
            entry.required = required;
        }
    }

    #[must_use]
    pub fn is_required(&self, key: &str) -> bool {
        self.d.entry(key).is_some_and(|e| e.required)
    }

    /// Mimetypes used for entries that declare none.
    pub fn set_default_mime_types(&mut self, mime_types: Vec<String>) {
        self.detach().default_mime_types = mime_types;
    }

    pub fn set_mime_types(&mut self, key: &str, mime_types: Vec<String>) {
        if self.d.entry(key).is_none() {
            return;
        }
        if let Some(entry) = self.detach().entry_mut(key) {
            entry.mime_types = mime_types;
        }
    }

    /// Mimetypes for `key`, falling back to the defaults. Empty for unknown keys.
    #[must_use]
    pub fn mime_types(&self, key: &str) -> Vec<String> {
        match self.d.entry(key) {
            None => Vec::new(),
            Some(entry) if entry.mime_types.is_empty() => self.d.default_mime_types.clone(),
            Some(entry) => entry.mime_types.clone(),
        }
    }

    /// Set the ordered list of prefixes searched under the package root.
    ///
    /// An empty list searches directly under the root.
    pub fn set_contents_prefix_paths(&mut self, prefix_paths: Vec<String>) {
        self.detach().contents_prefix_paths = prefix_paths;
    }

    #[must_use]
    pub fn contents_prefix_paths(&self) -> &[String] {
        &self.d.contents_prefix_paths
    }

    pub fn set_default_package_root(&mut self, package_root: &str) {
        self.detach().default_package_root = package_root.to_string();
    }

    #[must_use]
    pub fn default_package_root(&self) -> &str {
        &self.d.default_package_root
    }

    pub fn set_service_prefix(&mut self, service_prefix: &str) {
        self.detach().service_prefix = service_prefix.to_string();
    }

    #[must_use]
    pub fn service_prefix(&self) -> &str {
        &self.d.service_prefix
    }

    /// Allow resolved paths to leave the package root (e.g. via symlinks).
    pub fn set_allow_external_paths(&mut self, allow: bool) {
        self.detach().allow_external_paths = allow;
    }

    #[must_use]
    pub fn allow_external_paths(&self) -> bool {
        self.d.allow_external_paths
    }

    /// Keys of all file entries, in registration order.
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        self.keys_where(|e| !e.is_directory())
    }

    /// Keys of all directory entries, in registration order.
    #[must_use]
    pub fn directories(&self) -> Vec<String> {
        self.keys_where(ContentEntry::is_directory)
    }

    #[must_use]
    pub fn required_files(&self) -> Vec<String> {
        self.keys_where(|e| !e.is_directory() && e.required)
    }

    #[must_use]
    pub fn required_directories(&self) -> Vec<String> {
        self.keys_where(|e| e.is_directory() && e.required)
    }

    /// Keys of every required entry, files and directories alike.
    #[must_use]
    pub fn required_keys(&self) -> Vec<String> {
        self.keys_where(|e| e.required)
    }

    fn keys_where(&self, predicate: impl Fn(&ContentEntry) -> bool) -> Vec<String> {
        self.d
            .entries
            .iter()
            .filter(|(_, e)| predicate(e))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Parse a structure description.
    pub fn from_toml(content: &str) -> PackageResult<Self> {
        let file: StructureFile = toml::from_str(content)?;
        file.into_definition()
    }

    /// Load a structure description from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PackageResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Serialize to the structure description format.
    pub fn to_toml(&self) -> PackageResult<String> {
        Ok(toml::to_string(&StructureFile::from_definition(self))?)
    }
}

/// On-disk form of a structure description.
#[derive(Debug, Serialize, Deserialize)]
struct StructureFile {
    structure: StructureHeader,
    #[serde(default, rename = "entry")]
    entries: Vec<EntryRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StructureHeader {
    #[serde(rename = "type", default)]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contents_prefix_paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_package_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_prefix: Option<String>,
    #[serde(default)]
    allow_external_paths: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    default_mime_types: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    key: String,
    paths: Vec<String>,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mime_types: Vec<String>,
    #[serde(default)]
    directory: bool,
    #[serde(default)]
    required: bool,
}

impl StructureFile {
    fn into_definition(self) -> PackageResult<StructureDefinition> {
        let mut definition = StructureDefinition::new(&self.structure.type_name);
        let header = self.structure;

        if let Some(prefixes) = header.contents_prefix_paths {
            definition.set_contents_prefix_paths(prefixes);
        }
        if let Some(root) = header.default_package_root {
            definition.set_default_package_root(&root);
        }
        if let Some(prefix) = header.service_prefix {
            definition.set_service_prefix(&prefix);
        }
        definition.set_allow_external_paths(header.allow_external_paths);
        definition.set_default_mime_types(header.default_mime_types);

        for record in self.entries {
            if record.key.is_empty() {
                return Err(PackageError::InvalidStructure(
                    "entry key is required".to_string(),
                ));
            }
            if record.paths.is_empty() {
                return Err(PackageError::InvalidStructure(format!(
                    "entry {}: at least one path is required",
                    record.key
                )));
            }

            for path in &record.paths {
                if record.directory {
                    definition.add_directory_definition(&record.key, path, &record.name);
                } else {
                    definition.add_file_definition(&record.key, path, &record.name);
                }
            }
            definition.set_mime_types(&record.key, record.mime_types);
            definition.set_required(&record.key, record.required);
        }

        Ok(definition)
    }

    fn from_definition(definition: &StructureDefinition) -> Self {
        Self {
            structure: StructureHeader {
                type_name: definition.type_name().to_string(),
                contents_prefix_paths: Some(definition.contents_prefix_paths().to_vec()),
                default_package_root: Some(definition.default_package_root().to_string()),
                service_prefix: Some(definition.service_prefix().to_string()),
                allow_external_paths: definition.allow_external_paths(),
                default_mime_types: definition.d.default_mime_types.clone(),
            },
            entries: definition
                .entries()
                .map(|(key, entry)| EntryRecord {
                    key: key.to_string(),
                    paths: entry.paths.clone(),
                    name: entry.name.clone(),
                    mime_types: entry.mime_types.clone(),
                    directory: entry.is_directory(),
                    required: entry.required,
                })
                .collect(),
        }
    }
}
