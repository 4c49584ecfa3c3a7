//! Install, upgrade, uninstall and list commands.

use crate::session::Session;
use anyhow::{Context, Result};
use plasmapkg::known_packages;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Run the install command.
pub fn install(session: &Session, source: &Path, out: &mut impl Write) -> Result<()> {
    let template = session.template()?;
    let root = session.install_root(&template)?;

    debug!(source = %source.display(), "Installing package");
    let target = template
        .install(source, Some(&root))
        .with_context(|| format!("Failed to install {}", source.display()))?;

    writeln!(out, "Installed {}", target.display())?;
    Ok(())
}

/// Run the upgrade command.
pub fn upgrade(session: &Session, source: &Path, out: &mut impl Write) -> Result<()> {
    let template = session.template()?;
    let root = session.install_root(&template)?;

    debug!(source = %source.display(), "Upgrading package");
    let target = template
        .upgrade(source, Some(&root))
        .with_context(|| format!("Failed to upgrade from {}", source.display()))?;

    writeln!(out, "Upgraded {}", target.display())?;
    Ok(())
}

/// Run the uninstall command.
pub fn uninstall(session: &Session, name: &str, out: &mut impl Write) -> Result<()> {
    let template = session.template()?;
    let root = session.install_root(&template)?;

    debug!(name, root = %root.display(), "Uninstalling package");
    template
        .uninstall(name, Some(&root))
        .with_context(|| format!("Failed to uninstall {name}"))?;

    writeln!(out, "Removed {name}")?;
    Ok(())
}

/// Run the list command.
pub fn list(session: &Session, out: &mut impl Write) -> Result<()> {
    let template = session.template()?;
    let root = session.install_root(&template)?;

    let packages = known_packages(&root)
        .with_context(|| format!("Failed to list {}", root.display()))?;

    if packages.is_empty() {
        debug!(root = %root.display(), "No installed packages found");
        writeln!(out, "No packages in {}", root.display())?;
    }
    for package in packages {
        writeln!(out, "{package}")?;
    }
    Ok(())
}
