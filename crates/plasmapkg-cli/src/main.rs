//! plasmapkg CLI - Install, inspect and resolve Plasma packages
//!
//! Commands:
//! - `plasmapkg install` - Install a package directory or archive
//! - `plasmapkg upgrade` - Replace an installed package
//! - `plasmapkg uninstall` - Remove an installed package
//! - `plasmapkg list` - List installed packages
//! - `plasmapkg show` - Show metadata and resolved entries of a package
//! - `plasmapkg resolve` - Resolve a key, optionally through fallbacks
//! - `plasmapkg hash` - Hash the contents of a package
//! - `plasmapkg structures` - List structures or describe one

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use plasmapkg_logging::{LogLevel, ParseLevelError, init_logging};
use std::path::PathBuf;
use tracing::warn;

mod inspect;
mod manage;
mod session;

#[derive(Parser)]
#[command(name = "plasmapkg")]
#[command(
    author,
    version,
    about = "Install, inspect and resolve Plasma packages",
    long_about = None
)]
struct Cli {
    /// Package structure, e.g. Plasma/Applet
    #[arg(short = 't', long = "type", global = true, default_value = "Plasma/Generic")]
    package_type: String,

    /// Install root (default: <data dir>/<structure package root>)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Loader configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package directory or archive
    Install {
        /// Package directory or .zip archive
        path: PathBuf,
    },

    /// Replace an installed package, installing it if absent
    Upgrade {
        /// Package directory or .zip archive
        path: PathBuf,
    },

    /// Remove an installed package
    Uninstall {
        /// Plugin id of the package
        name: String,
    },

    /// List installed packages
    List,

    /// Show metadata and resolved entries of a package
    Show {
        /// Package directory or installed plugin id
        package: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a key to a path
    Resolve {
        /// Package directory or installed plugin id
        package: String,

        /// Structure key, e.g. mainscript
        key: String,

        /// File name inside a directory key
        filename: Option<String>,

        /// Fallback package, consulted in the order given
        #[arg(short, long = "fallback")]
        fallbacks: Vec<String>,
    },

    /// Print the SHA-256 of the package contents
    Hash {
        /// Package directory or installed plugin id
        package: String,
    },

    /// List known structures, or print one as TOML
    Structures {
        /// Structure name
        name: Option<String>,
    },
}

/// Configured level raised by `-v`. An unknown configured level is
/// returned alongside the default it was replaced with.
fn log_level(configured: &str, verbose: u8) -> (LogLevel, Option<ParseLevelError>) {
    let (level, rejected) = match configured.parse::<LogLevel>() {
        Ok(level) => (level, None),
        Err(e) => (LogLevel::default(), Some(e)),
    };
    (level.more_verbose(verbose), rejected)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = session::load_config(cli.config.as_deref())?;
    let (level, rejected) = log_level(&config.log_level, cli.verbose);
    init_logging(level).context("Failed to initialize logging")?;
    if let Some(e) = rejected {
        warn!(error = %e, level = %level, "Ignoring log_level from configuration");
    }

    let session = session::Session::new(config, &cli.package_type, cli.root);
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Install { path } => {
            manage::install(&session, &path, &mut out)?;
        }
        Commands::Upgrade { path } => {
            manage::upgrade(&session, &path, &mut out)?;
        }
        Commands::Uninstall { name } => {
            manage::uninstall(&session, &name, &mut out)?;
        }
        Commands::List => {
            manage::list(&session, &mut out)?;
        }
        Commands::Show { package, json } => {
            inspect::show(&session, &package, json, &mut out)?;
        }
        Commands::Resolve {
            package,
            key,
            filename,
            fallbacks,
        } => {
            inspect::resolve(
                &session,
                &package,
                &key,
                filename.as_deref(),
                &fallbacks,
                &mut out,
            )?;
        }
        Commands::Hash { package } => {
            inspect::hash(&session, &package, &mut out)?;
        }
        Commands::Structures { name } => {
            inspect::structures(&session, name.as_deref(), &mut out)?;
        }
    }

    Ok(())
}
