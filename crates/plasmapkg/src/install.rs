//! Installing and removing packages below a package root.
//!
//! A package is installed into `<package root>/<plugin id>`. The source may
//! be an unpacked directory or an archive; archives are unpacked into a
//! temporary directory first by an [`ArchiveExtractor`].
//!
//! Files are copied into a hidden staging directory below the package root
//! and renamed into place, so a failed copy never leaves a half-installed
//! package behind.

use crate::metadata::validate_plugin_name;
use crate::{METADATA_DESKTOP, METADATA_JSON, Package, PackageError, PackageMetadata, PackageResult};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Unpacks one archive format.
pub trait ArchiveExtractor: Send + Sync {
    /// True when this extractor understands `archive`.
    fn can_extract(&self, archive: &Path) -> bool;

    /// Unpack `archive` into the existing directory `destination`.
    fn extract(&self, archive: &Path, destination: &Path) -> PackageResult<()>;
}

/// ZIP archives (`.zip`, `.plasmoid`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

impl ArchiveExtractor for ZipExtractor {
    fn can_extract(&self, archive: &Path) -> bool {
        let mut magic = [0u8; 4];
        File::open(archive)
            .and_then(|mut file| file.read_exact(&mut magic))
            .is_ok_and(|()| magic == ZIP_MAGIC)
    }

    fn extract(&self, archive: &Path, destination: &Path) -> PackageResult<()> {
        let file = File::open(archive)?;
        let mut archive = ZipArchive::new(file)?;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let Some(relative) = entry.enclosed_name() else {
                return Err(PackageError::UnsupportedArchive(format!(
                    "entry escapes archive root: {}",
                    entry.name()
                )));
            };
            let output_path = destination.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&output_path)?;
                continue;
            }

            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut output = File::create(&output_path)?;
            io::copy(&mut entry, &mut output)?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode().filter(|mode| mode & 0o777 != 0) {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&output_path, fs::Permissions::from_mode(mode & 0o777))?;
            }
        }

        Ok(())
    }
}

/// Source directory ready to be copied, plus the temporary directory that
/// backs it when it came from an archive.
struct Prepared {
    dir: PathBuf,
    _temp: Option<TempDir>,
}

/// Installs, upgrades and removes packages.
pub struct Installer {
    extractors: Vec<Box<dyn ArchiveExtractor>>,
}

impl Default for Installer {
    fn default() -> Self {
        Self::new()
    }
}

impl Installer {
    /// Installer that understands ZIP archives.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: vec![Box::new(ZipExtractor)],
        }
    }

    /// Add support for another archive format. Later extractors are tried
    /// after earlier ones.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn ArchiveExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Install `source` below `package_root`.
    ///
    /// `template` supplies the structure the package must satisfy: every
    /// required entry has to be present. Returns the installed root.
    pub fn install(
        &self,
        template: &Package,
        source: &Path,
        package_root: &Path,
    ) -> PackageResult<PathBuf> {
        let prepared = self.prepare(source)?;
        let metadata = check_package(template, &prepared.dir)?;

        let target = package_root.join(&metadata.plugin_id);
        if target.exists() {
            return Err(PackageError::AlreadyInstalled(target.display().to_string()));
        }
        check_disjoint(&prepared.dir, package_root, &target)?;

        fs::create_dir_all(package_root)?;
        let staging = stage(&prepared.dir, package_root)?;
        promote(staging, &target)?;

        info!(
            plugin = %metadata.plugin_id,
            target = %target.display(),
            "Package installed"
        );
        Ok(target)
    }

    /// Remove `package_name` from `package_root`.
    pub fn uninstall(&self, package_name: &str, package_root: &Path) -> PackageResult<()> {
        validate_plugin_name(package_name)?;

        let target = package_root.join(package_name);
        if !target.is_dir() {
            return Err(PackageError::NotInstalled(target.display().to_string()));
        }

        fs::remove_dir_all(&target)?;
        info!(plugin = %package_name, root = %package_root.display(), "Package removed");
        Ok(())
    }

    /// Replace an installed package with `source`. Installs fresh when
    /// nothing is installed under the same plugin id yet.
    pub fn upgrade(
        &self,
        template: &Package,
        source: &Path,
        package_root: &Path,
    ) -> PackageResult<PathBuf> {
        let prepared = self.prepare(source)?;
        let metadata = check_package(template, &prepared.dir)?;

        let target = package_root.join(&metadata.plugin_id);
        check_disjoint(&prepared.dir, package_root, &target)?;

        fs::create_dir_all(package_root)?;
        let staging = stage(&prepared.dir, package_root)?;

        // The previous version is moved aside and only deleted once the new
        // one is in place.
        let previous = if target.is_dir() {
            let aside = tempfile::Builder::new()
                .prefix(".plasmapkg-previous-")
                .tempdir_in(package_root)?;
            debug!(target = %target.display(), "Moving previous version aside");
            fs::rename(&target, aside.path().join(&metadata.plugin_id))?;
            Some(aside)
        } else {
            None
        };

        if let Err(e) = promote(staging, &target) {
            if let Some(aside) = previous {
                restore(aside, &metadata.plugin_id, &target);
            }
            return Err(e);
        }

        info!(
            plugin = %metadata.plugin_id,
            version = %metadata.version,
            "Package upgraded"
        );
        Ok(target)
    }

    fn prepare(&self, source: &Path) -> PackageResult<Prepared> {
        if !source.exists() {
            return Err(PackageError::MissingFile(source.display().to_string()));
        }

        if source.is_dir() {
            return Ok(Prepared {
                dir: source.to_path_buf(),
                _temp: None,
            });
        }

        let extractor = self
            .extractors
            .iter()
            .find(|e| e.can_extract(source))
            .ok_or_else(|| PackageError::UnsupportedArchive(source.display().to_string()))?;

        let temp = tempfile::Builder::new().prefix("plasmapkg-").tempdir()?;
        extractor.extract(source, temp.path())?;

        let dir = package_dir_in(temp.path())?;
        Ok(Prepared {
            dir,
            _temp: Some(temp),
        })
    }
}

/// Plugin ids of the packages installed below `package_root`, sorted.
pub fn known_packages(package_root: &Path) -> PackageResult<Vec<String>> {
    if !package_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut packages = Vec::new();
    for entry in fs::read_dir(package_root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        if !has_metadata(&entry.path()) {
            continue;
        }
        // Staging and previous-version directories are hidden.
        if let Ok(name) = entry.file_name().into_string()
            && !name.starts_with('.')
        {
            packages.push(name);
        }
    }

    packages.sort();
    Ok(packages)
}

/// Archives often wrap the package in one top-level directory.
fn package_dir_in(extracted: &Path) -> PackageResult<PathBuf> {
    if has_metadata(extracted) {
        return Ok(extracted.to_path_buf());
    }

    let entries: Vec<PathBuf> = fs::read_dir(extracted)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();

    match entries.as_slice() {
        [single] if single.is_dir() => Ok(single.clone()),
        _ => Ok(extracted.to_path_buf()),
    }
}

fn has_metadata(dir: &Path) -> bool {
    [METADATA_JSON, METADATA_DESKTOP]
        .iter()
        .any(|name| dir.join(name).is_file())
}

/// Metadata of the package in `dir`, after checking it against `template`.
fn check_package(template: &Package, dir: &Path) -> PackageResult<PackageMetadata> {
    let metadata = PackageMetadata::from_package_root(dir)?.ok_or_else(|| {
        PackageError::MissingFile(format!("{METADATA_JSON} or {METADATA_DESKTOP}"))
    })?;
    metadata.validate()?;

    let mut candidate = template.clone();
    candidate.clear_fallback_package();
    candidate.set_path(dir);

    if let Some(missing) = candidate
        .structure_definition()
        .required_keys()
        .into_iter()
        .find(|key| candidate.file_path_for(key).is_none())
    {
        warn!(plugin = %metadata.plugin_id, key = %missing, "Package is missing a required entry");
        return Err(PackageError::MissingFile(missing));
    }

    Ok(metadata)
}

/// Reject a source that contains the install root, or that lives inside the
/// package it would replace.
fn check_disjoint(source: &Path, package_root: &Path, target: &Path) -> PackageResult<()> {
    let source = fs::canonicalize(source)?;
    let root = canonical_lenient(package_root);
    let target = canonical_lenient(target);

    if root.starts_with(&source) || source.starts_with(&target) {
        return Err(PackageError::InvalidSource(format!(
            "{} overlaps install location {}",
            source.display(),
            target.display()
        )));
    }
    Ok(())
}

/// Canonical form of a path whose tail may not exist yet.
fn canonical_lenient(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return absolute.clone(),
        }
    }
}

/// Copy `source` into a fresh staging directory below `package_root`.
///
/// The staging directory is removed again if the copy fails.
fn stage(source: &Path, package_root: &Path) -> PackageResult<TempDir> {
    let staging = tempfile::Builder::new()
        .prefix(".plasmapkg-staging-")
        .tempdir_in(package_root)?;
    copy_tree(source, staging.path())?;

    // Temporary directories are private; installed packages are not.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(staging.path(), fs::Permissions::from_mode(0o755))?;
    }
    Ok(staging)
}

/// Move a staged package to its final location.
fn promote(staging: TempDir, target: &Path) -> PackageResult<()> {
    fs::rename(staging.path(), target)?;
    // Renamed away; nothing is left to clean up.
    let _kept = staging.keep();
    Ok(())
}

/// Put the previous version back after a failed upgrade.
fn restore(aside: TempDir, plugin_id: &str, target: &Path) {
    let previous = aside.path().join(plugin_id);
    if let Err(e) = fs::rename(&previous, target) {
        let kept = aside.keep();
        warn!(
            previous = %kept.join(plugin_id).display(),
            error = %e,
            "Could not restore previous version"
        );
    }
}

/// Recursively copy `source` to `target`.
fn copy_tree(source: &Path, target: &Path) -> PackageResult<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else if entry.path().is_file() {
            fs::copy(entry.path(), &destination)?;
        } else {
            warn!(path = %entry.path().display(), "Skipping entry that is not a regular file");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "install/install_tests.rs"]
mod install_tests;
