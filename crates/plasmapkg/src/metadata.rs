//! Package metadata.
//!
//! Every package root carries a descriptor next to (not inside) its
//! `contents/` tree, either `metadata.json`:
//!
//! ```json
//! {
//!     "KPlugin": {
//!         "Id": "org.kde.clock",
//!         "Name": "Clock",
//!         "ServiceTypes": ["Plasma/Applet"]
//!     },
//!     "X-Plasma-MainScript": "ui/Clock.qml"
//! }
//! ```
//!
//! or the older `metadata.desktop`:
//!
//! ```text
//! [Desktop Entry]
//! Name=Clock
//! X-KDE-PluginInfo-Name=org.kde.clock
//! X-Plasma-MainScript=ui/Clock.qml
//! ```

use crate::{METADATA_DESKTOP, METADATA_JSON, PackageError, PackageResult};
use ini::{Ini, ParseOption};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Group holding the entries of a desktop file.
pub const DESKTOP_GROUP: &str = "Desktop Entry";

const KEY_PLUGIN_ID: &str = "X-KDE-PluginInfo-Name";
const KEY_NAME: &str = "Name";
const KEY_COMMENT: &str = "Comment";
const KEY_DESCRIPTION: &str = "Description";
const KEY_ICON: &str = "Icon";
const KEY_AUTHOR: &str = "X-KDE-PluginInfo-Author";
const KEY_EMAIL: &str = "X-KDE-PluginInfo-Email";
const KEY_VERSION: &str = "X-KDE-PluginInfo-Version";
const KEY_WEBSITE: &str = "X-KDE-PluginInfo-Website";
const KEY_LICENSE: &str = "X-KDE-PluginInfo-License";
const KEY_CATEGORY: &str = "X-KDE-PluginInfo-Category";
const KEY_SERVICE_TYPES: &str = "ServiceTypes";
const KEY_KDE_SERVICE_TYPES: &str = "X-KDE-ServiceTypes";

/// Plugin descriptor of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Unique plugin id; doubles as the install directory name.
    pub plugin_id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub author: String,
    pub email: String,
    pub version: String,
    pub website: String,
    pub license: String,
    pub category: String,
    pub service_types: Vec<String>,
    /// Every key of the descriptor, including the ones above.
    #[serde(default)]
    values: BTreeMap<String, String>,
}

impl PackageMetadata {
    /// Create metadata with only a plugin id.
    #[must_use]
    pub fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            values: BTreeMap::from([(KEY_PLUGIN_ID.to_string(), plugin_id.to_string())]),
            ..Self::default()
        }
    }

    /// Metadata is usable when it names a plugin.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.plugin_id.is_empty()
    }

    /// Check the metadata can be used to install a package.
    pub fn validate(&self) -> PackageResult<()> {
        if self.plugin_id.is_empty() {
            return Err(PackageError::InvalidMetadata(
                "plugin id is required".to_string(),
            ));
        }
        validate_plugin_name(&self.plugin_id)
    }

    /// Raw value of any descriptor key.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set_value(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Iterate over all raw keys in sorted order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Read the descriptor found in a package root.
    ///
    /// `metadata.json` is preferred over `metadata.desktop`. Returns
    /// `Ok(None)` when the root has neither.
    pub fn from_package_root<P: AsRef<Path>>(root: P) -> PackageResult<Option<Self>> {
        let root = root.as_ref();

        let json = root.join(METADATA_JSON);
        if json.is_file() {
            return Self::from_file(&json).map(Some);
        }

        let desktop = root.join(METADATA_DESKTOP);
        if desktop.is_file() {
            return Self::from_file(&desktop).map(Some);
        }

        Ok(None)
    }

    /// Read a descriptor file, choosing the format by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PackageResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("desktop") => Self::from_desktop(&content),
            _ => Err(PackageError::InvalidMetadata(format!(
                "unknown metadata format: {}",
                path.display()
            ))),
        }
    }

    /// Parse a `metadata.json` document.
    pub fn from_json(json: &str) -> PackageResult<Self> {
        let document: JsonMetadata = serde_json::from_str(json)?;
        let plugin = document.kplugin;

        let mut values = BTreeMap::new();
        for (key, value) in &document.extra {
            match value {
                serde_json::Value::String(s) => {
                    values.insert(key.clone(), s.clone());
                }
                serde_json::Value::Array(items) => {
                    let joined: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                    values.insert(key.clone(), joined.join(","));
                }
                serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {
                    values.insert(key.clone(), value.to_string());
                }
                _ => {}
            }
        }

        let author = plugin.authors.first().cloned().unwrap_or_default();
        let metadata = Self {
            plugin_id: plugin.id,
            name: plugin.name,
            description: plugin.description,
            icon: plugin.icon,
            author: author.name,
            email: author.email,
            version: plugin.version,
            website: plugin.website,
            license: plugin.license,
            category: plugin.category,
            service_types: plugin.service_types,
            values,
        };
        Ok(metadata.with_known_values())
    }

    /// Parse a `metadata.desktop` document.
    pub fn from_desktop(content: &str) -> PackageResult<Self> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, options).map_err(ini::Error::Parse)?;
        let group = ini.section(Some(DESKTOP_GROUP)).ok_or_else(|| {
            PackageError::InvalidMetadata(format!("missing [{DESKTOP_GROUP}] group"))
        })?;

        let values: BTreeMap<String, String> = group
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let get = |key: &str| values.get(key).cloned().unwrap_or_default();

        let description = values
            .get(KEY_COMMENT)
            .or_else(|| values.get(KEY_DESCRIPTION))
            .cloned()
            .unwrap_or_default();
        let service_types = values
            .get(KEY_SERVICE_TYPES)
            .or_else(|| values.get(KEY_KDE_SERVICE_TYPES))
            .map(|v| split_list(v))
            .unwrap_or_default();

        Ok(Self {
            plugin_id: get(KEY_PLUGIN_ID),
            name: get(KEY_NAME),
            description,
            icon: get(KEY_ICON),
            author: get(KEY_AUTHOR),
            email: get(KEY_EMAIL),
            version: get(KEY_VERSION),
            website: get(KEY_WEBSITE),
            license: get(KEY_LICENSE),
            category: get(KEY_CATEGORY),
            service_types,
            values,
        })
    }

    /// Serialize as a `metadata.desktop` document.
    pub fn to_desktop(&self) -> PackageResult<String> {
        let mut ini = Ini::new();
        {
            let mut group = ini.with_section(Some(DESKTOP_GROUP));
            for (key, value) in self.known_values() {
                if !value.is_empty() {
                    group.set(key, value);
                }
            }
        }
        if let Some(group) = ini.section_mut(Some(DESKTOP_GROUP)) {
            for (key, value) in &self.values {
                if !group.contains_key(key.as_str()) && key != KEY_DESCRIPTION {
                    group.insert(key.clone(), value.clone());
                }
            }
        }

        let mut buffer = Vec::new();
        ini.write_to(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| PackageError::InvalidMetadata(format!("non UTF-8 metadata: {e}")))
    }

    /// Write a `metadata.desktop` file.
    pub fn write_desktop<P: AsRef<Path>>(&self, path: P) -> PackageResult<()> {
        std::fs::write(path.as_ref(), self.to_desktop()?)?;
        Ok(())
    }

    fn known_values(&self) -> Vec<(&'static str, String)> {
        vec![
            (KEY_NAME, self.name.clone()),
            (KEY_COMMENT, self.description.clone()),
            (KEY_ICON, self.icon.clone()),
            (KEY_SERVICE_TYPES, self.service_types.join(",")),
            (KEY_PLUGIN_ID, self.plugin_id.clone()),
            (KEY_AUTHOR, self.author.clone()),
            (KEY_EMAIL, self.email.clone()),
            (KEY_VERSION, self.version.clone()),
            (KEY_WEBSITE, self.website.clone()),
            (KEY_LICENSE, self.license.clone()),
            (KEY_CATEGORY, self.category.clone()),
        ]
    }

    fn with_known_values(mut self) -> Self {
        for (key, value) in self.known_values() {
            if !value.is_empty() {
                self.values.entry(key.to_string()).or_insert(value);
            }
        }
        self
    }
}

/// Reject plugin ids that could escape the package root.
///
/// Only ASCII letters, digits, `_`, `-` and `.` are allowed, and the id may
/// not consist of dots alone.
pub fn validate_plugin_name(name: &str) -> PackageResult<()> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.');

    if name.is_empty() || !name.chars().all(allowed) || name.chars().all(|c| c == '.') {
        return Err(PackageError::InvalidPluginName(name.to_string()));
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Deserialize)]
struct JsonMetadata {
    #[serde(rename = "KPlugin", default)]
    kplugin: KPluginRecord,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct KPluginRecord {
    id: String,
    name: String,
    description: String,
    icon: String,
    authors: Vec<AuthorRecord>,
    version: String,
    website: String,
    license: String,
    category: String,
    service_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AuthorRecord {
    name: String,
    email: String,
}
