//! Error types for package operations.
//!
//! Path resolution and validity checks never fail: they answer `None` or
//! `false`. Only operations that read or write files report errors.

use thiserror::Error;

/// Errors that can occur while installing packages or reading package files.
#[derive(Debug, Error)]
pub enum PackageError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON metadata parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structure description or configuration parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Structure description serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Desktop file parsing error.
    #[error("desktop file error: {0}")]
    Ini(#[from] ini::Error),

    /// ZIP archive error.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing required file in a package or archive.
    #[error("Missing required file: {0}")]
    MissingFile(String),

    /// Metadata present but unusable.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Plugin id contains characters that are unsafe in a path.
    #[error("Invalid plugin name: {0}")]
    InvalidPluginName(String),

    /// Target directory already holds a package.
    #[error("Package already installed: {0}")]
    AlreadyInstalled(String),

    /// Nothing to remove.
    #[error("Package not installed: {0}")]
    NotInstalled(String),

    /// Source and install location overlap.
    #[error("Invalid install source: {0}")]
    InvalidSource(String),

    /// Source is neither a directory nor a supported archive.
    #[error("Unsupported archive format: {0}")]
    UnsupportedArchive(String),

    /// Structure description is malformed.
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}
