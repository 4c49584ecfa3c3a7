//! Content hashing.

use crate::PackageResult;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// SHA256 over every regular file below `base`.
///
/// Files are visited in sorted order; each contributes its path relative to
/// `base` followed by its bytes, so renames change the digest as well.
pub fn hash_directory(base: &Path) -> PackageResult<String> {
    let mut hasher = Sha256::new();

    for entry in WalkDir::new(base).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(base).unwrap_or(entry.path());
        // Separator-independent so the digest matches across platforms.
        let relative: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();

        hasher.update(relative.join("/").as_bytes());
        hasher.update(fs::read(entry.path())?);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use tempfile::TempDir;

    fn write_tree(root: &Path) {
        fs::create_dir_all(root.join("ui")).unwrap();
        fs::write(root.join("ui/main.qml"), b"Item {}").unwrap();
        fs::write(root.join("config.xml"), b"<kcfg/>").unwrap();
    }

    #[test]
    fn hash_directory___same_tree___same_digest() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_tree(first.path());
        write_tree(second.path());

        assert_eq!(
            hash_directory(first.path()).unwrap(),
            hash_directory(second.path()).unwrap()
        );
    }

    #[test]
    fn hash_directory___changed_content___changes_digest() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path());
        let before = hash_directory(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("ui/main.qml"), b"Item { id: root }").unwrap();

        assert_ne!(hash_directory(temp_dir.path()).unwrap(), before);
    }

    #[test]
    fn hash_directory___renamed_file___changes_digest() {
        let temp_dir = TempDir::new().unwrap();
        write_tree(temp_dir.path());
        let before = hash_directory(temp_dir.path()).unwrap();

        fs::rename(
            temp_dir.path().join("config.xml"),
            temp_dir.path().join("main.xml"),
        )
        .unwrap();

        assert_ne!(hash_directory(temp_dir.path()).unwrap(), before);
    }

    #[test]
    fn hash_directory___missing_directory___returns_error() {
        let result = hash_directory(Path::new("/nonexistent/contents"));

        assert!(result.is_err());
    }
}
