//! Read-only commands: show, resolve, hash and structures.

use crate::session::Session;
use anyhow::{Context, Result, bail};
use plasmapkg::Package;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct PackageReport {
    path: Option<PathBuf>,
    structure: String,
    valid: bool,
    plugin_id: Option<String>,
    name: Option<String>,
    version: Option<String>,
    entries: Vec<EntryReport>,
}

#[derive(Debug, Serialize)]
struct EntryReport {
    key: String,
    directory: bool,
    required: bool,
    path: Option<PathBuf>,
}

impl PackageReport {
    fn new(package: &Package) -> Self {
        let metadata = package.metadata();
        let definition = package.structure_definition();

        Self {
            path: package.path().map(PathBuf::from),
            structure: definition.type_name().to_string(),
            valid: package.is_valid(),
            plugin_id: metadata.map(|m| m.plugin_id.clone()),
            name: metadata.map(|m| m.name.clone()),
            version: metadata.map(|m| m.version.clone()),
            entries: definition
                .entries()
                .map(|(key, entry)| EntryReport {
                    key: key.to_string(),
                    directory: entry.is_directory(),
                    required: entry.required,
                    path: package.file_path_for(key),
                })
                .collect(),
        }
    }
}

/// Run the show command.
pub fn show(session: &Session, location: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let package = session.open(location)?;
    let report = PackageReport::new(&package);

    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    let display = |path: &Option<PathBuf>| {
        path.as_ref()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string())
    };
    writeln!(out, "Path:      {}", display(&report.path))?;
    writeln!(out, "Structure: {}", report.structure)?;
    writeln!(out, "Valid:     {}", if report.valid { "yes" } else { "no" })?;
    if let Some(plugin_id) = &report.plugin_id {
        writeln!(out, "Plugin:    {plugin_id}")?;
    }
    if let Some(name) = report.name.as_ref().filter(|n| !n.is_empty()) {
        writeln!(out, "Name:      {name}")?;
    }
    if let Some(version) = report.version.as_ref().filter(|v| !v.is_empty()) {
        writeln!(out, "Version:   {version}")?;
    }

    writeln!(out)?;
    for entry in &report.entries {
        let marker = match (entry.required, entry.path.is_some()) {
            (true, false) => "!",
            (true, true) => "*",
            _ => " ",
        };
        writeln!(out, "{marker} {:<28} {}", entry.key, display(&entry.path))?;
    }
    Ok(())
}

/// Run the resolve command.
///
/// `fallbacks` form a chain: the first is consulted after the package
/// itself, the second after the first, and so on.
pub fn resolve(
    session: &Session,
    location: &str,
    key: &str,
    filename: Option<&str>,
    fallbacks: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let mut package = session.open(location)?;

    let mut chain: Option<Package> = None;
    for fallback in fallbacks.iter().rev() {
        let mut next = session
            .open(fallback)
            .with_context(|| format!("Invalid fallback {fallback}"))?;
        if let Some(deeper) = &chain {
            next.set_fallback_package(deeper);
        }
        chain = Some(next);
    }
    if let Some(fallback) = &chain {
        package.set_fallback_package(fallback);
    }

    let Some(path) = package.file_path(key, filename.unwrap_or_default()) else {
        bail!("{key} not found in {location}");
    };
    writeln!(out, "{}", path.display())?;
    Ok(())
}

/// Run the hash command.
pub fn hash(session: &Session, location: &str, out: &mut impl Write) -> Result<()> {
    let package = session.open(location)?;

    let Some(hash) = package.contents_hash() else {
        bail!("{location} has no contents to hash");
    };
    writeln!(out, "sha256:{hash}")?;
    Ok(())
}

/// Run the structures command: list every structure, or print the layout of
/// one as TOML.
pub fn structures(session: &Session, name: Option<&str>, out: &mut impl Write) -> Result<()> {
    let loader = session.loader();

    let Some(name) = name else {
        for structure in loader.known_structures() {
            writeln!(out, "{structure}")?;
        }
        return Ok(());
    };

    let package = loader.load_package(name, "");
    if package.structure().is_none() {
        bail!("Unknown package type: {name}");
    }
    let description = package
        .structure_definition()
        .to_toml()
        .with_context(|| format!("Failed to describe {name}"))?;
    write!(out, "{description}")?;
    Ok(())
}
