//! Filesystem probing for package entries.
//!
//! [`PathResolver`] walks the `prefix × candidate` grid of a structure entry
//! under a package root and returns the first path that exists. It knows
//! nothing about caching or fallbacks; [`crate::Package`] layers those on top.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Resolves relative entry paths under a package root.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    root: &'a Path,
    prefixes: &'a [String],
    allow_external_paths: bool,
}

impl<'a> PathResolver<'a> {
    /// `root` must already be canonical.
    #[must_use]
    pub fn new(root: &'a Path, prefixes: &'a [String], allow_external_paths: bool) -> Self {
        Self {
            root,
            prefixes,
            allow_external_paths,
        }
    }

    /// Prefixes to search, in priority order. No prefixes means the root itself.
    fn prefixes(&self) -> impl Iterator<Item = &'a str> {
        let root_only: &'static [&'static str] = if self.prefixes.is_empty() {
            &[""]
        } else {
            &[]
        };
        self.prefixes
            .iter()
            .map(String::as_str)
            .chain(root_only.iter().copied())
    }

    /// Every path that would be probed, in order.
    #[must_use]
    pub fn candidates(&self, paths: &[String], filename: &str) -> Vec<PathBuf> {
        let empty = [String::new()];
        let paths = if paths.is_empty() { &empty[..] } else { paths };

        self.prefixes()
            .flat_map(|prefix| {
                paths
                    .iter()
                    .map(move |candidate| self.join(prefix, candidate, filename))
            })
            .collect()
    }

    /// First existing candidate, canonicalised.
    #[must_use]
    pub fn resolve(&self, paths: &[String], filename: &str) -> Option<PathBuf> {
        self.candidates(paths, filename)
            .into_iter()
            .find_map(|candidate| self.accept(&candidate))
    }

    /// Resolve a path relative to the root itself, ignoring prefixes.
    #[must_use]
    pub fn resolve_in_root(&self, relative: &str) -> Option<PathBuf> {
        self.accept(&join_relative(self.root, relative))
    }

    /// Readable file names in the directory registered under `paths`,
    /// collected across all prefixes.
    #[must_use]
    pub fn entry_list(&self, paths: &[String]) -> Vec<String> {
        let Some(relative) = paths.first() else {
            return Vec::new();
        };

        let mut entries = Vec::new();
        for prefix in self.prefixes() {
            let dir = self.join(prefix, relative, "");
            let Some(dir) = self.accept(&dir) else {
                continue;
            };
            let Ok(read_dir) = fs::read_dir(&dir) else {
                continue;
            };

            let mut names: Vec<String> = read_dir
                .filter_map(Result::ok)
                .filter(|entry| entry.path().is_file())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect();
            names.sort();
            entries.extend(names);
        }
        entries
    }

    fn join(&self, prefix: &str, candidate: &str, filename: &str) -> PathBuf {
        let mut path = join_relative(self.root, prefix);
        path = join_relative(&path, candidate);
        if !filename.is_empty() {
            path = join_relative(&path, filename);
        }
        path
    }

    /// Existence check plus the package boundary check.
    fn accept(&self, candidate: &Path) -> Option<PathBuf> {
        let canonical = fs::canonicalize(candidate).ok()?;

        if self.allow_external_paths || canonical.starts_with(self.root) {
            Some(canonical)
        } else {
            warn!(
                path = %candidate.display(),
                root = %self.root.display(),
                "Rejecting path outside of package root"
            );
            None
        }
    }
}

/// Join a relative fragment that may carry leading or trailing slashes.
fn join_relative(base: &Path, fragment: &str) -> PathBuf {
    let trimmed = fragment.trim_matches('/');
    if trimmed.is_empty() {
        base.to_path_buf()
    } else {
        base.join(trimmed)
    }
}
