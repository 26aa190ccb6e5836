//! The `srcset config` command for configuration management.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use srcset_core::config::SITE_CONFIG_FILE;
use srcset_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,

    /// Show which config file is in use
    Path,

    /// Write a config file with defaults (site-local unless --config is given)
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub fn execute(args: ConfigArgs, site_dir: &Path, explicit: Option<&Path>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load_for_site(site_dir, explicit)?;
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            let path = active_path(site_dir, explicit);
            if path.exists() {
                println!("{}", path.display());
            } else {
                println!("{} (not present, using defaults)", path.display());
            }
        }

        ConfigCommand::Init { force } => {
            let path = explicit
                .map(Path::to_path_buf)
                .unwrap_or_else(|| site_dir.join(SITE_CONFIG_FILE));
            init(&path, force)?;
            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

/// The file `Config::load_for_site` would read, or the per-user path when
/// no file exists anywhere.
fn active_path(site_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = site_dir.join(SITE_CONFIG_FILE);
    if local.exists() {
        local
    } else {
        Config::default_path()
    }
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}
