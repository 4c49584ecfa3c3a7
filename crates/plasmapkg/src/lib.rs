//! Package structures, path resolution and fallback chains for Plasma shell
//! packages.
//!
//! A package is a directory tree with a known layout: a plugin descriptor at
//! the root and the payload below `contents/`.
//!
//! # Package Layout
//!
//! ```text
//! org.kde.plasma.clock/
//! ├── metadata.json                  # or metadata.desktop
//! ├── contents/
//! │   ├── ui/
//! │   │   └── main.qml               # "mainscript"
//! │   ├── config/
//! │   │   └── main.xml               # "mainconfigxml"
//! │   └── images/                    # "images"
//! └── platformcontents/
//!     └── phone/                     # searched first on the "phone" platform
//!         └── ui/
//!             └── main.qml
//! ```
//!
//! A [`StructureDefinition`] names the slots of a layout, a [`Package`]
//! binds one to a root directory and resolves keys to paths, and the
//! [`PackageLoader`] hands out packages by structure name.
//!
//! # Example
//!
//! ```no_run
//! use plasmapkg::{LoaderConfig, PackageLoader};
//!
//! let loader = PackageLoader::with_builtin_structures(LoaderConfig::default());
//!
//! let mut clock = loader.load_package("Plasma/Applet", "");
//! clock.set_path("/usr/share/plasma/plasmoids/org.kde.plasma.clock");
//!
//! let mut fallback = loader.load_package("Plasma/Applet", "");
//! fallback.set_path("/usr/share/plasma/plasmoids/org.kde.plasma.analogclock");
//! clock.set_fallback_package(&fallback);
//!
//! if clock.is_valid() {
//!     println!("{:?}", clock.file_path("images", "face.svg"));
//! }
//! ```

mod error;

pub mod config;
pub mod hash;
pub mod install;
pub mod metadata;
pub mod package;
pub mod registry;
pub mod resolver;
pub mod structure;
pub mod structures;

pub use config::LoaderConfig;
pub use error::PackageError;
pub use install::{ArchiveExtractor, Installer, ZipExtractor, known_packages};
pub use metadata::PackageMetadata;
pub use package::{MAX_FALLBACK_DEPTH, Package};
pub use registry::{DescribedStructure, PackageLoader, PackageStructure};
pub use structure::{ContentEntry, DEFAULT_CONTENTS_PREFIX, EntryKind, StructureDefinition};
pub use structures::{BuiltinKind, BuiltinStructure};

/// Result type for package operations.
pub type PackageResult<T> = Result<T, PackageError>;

/// Desktop-file plugin descriptor at the package root.
pub const METADATA_DESKTOP: &str = "metadata.desktop";

/// JSON plugin descriptor at the package root.
pub const METADATA_JSON: &str = "metadata.json";

/// Key resolving to the plugin descriptor, outside any contents prefix.
pub const METADATA_KEY: &str = "metadata";
