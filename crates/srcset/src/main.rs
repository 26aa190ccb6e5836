//! Srcset CLI - responsive image derivatives and manifest for static sites.
//!
//! Walks the site's source photo tree, writes resized AVIF/JPEG/WebP
//! derivatives next to a JSON manifest that the page layer reads to build
//! `<picture>` elements.
//!
//! # Usage
//!
//! ```bash
//! # Regenerate every derivative and the manifest
//! srcset
//!
//! # Replace corrupt sources with flat placeholders instead of failing
//! srcset --fix-invalid
//!
//! # CI check: fail if any source is missing its derivatives
//! srcset --verify
//!
//! # View configuration
//! srcset config show
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Srcset - responsive image derivatives and manifest for static sites.
#[derive(Parser, Debug)]
#[command(name = "srcset")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Site directory that configured paths are relative to
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    site_dir: PathBuf,

    /// Config file (default: <site-dir>/srcset.toml, then the per-user file)
    #[arg(long, global = true, value_name = "FILE", env = "SRCSET_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    generate: cli::generate::GenerateArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands. Without one, derivatives are generated.
#[derive(Subcommand, Debug)]
enum Commands {
    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logging needs the config, so a load error is only reported afterwards.
    let loaded = srcset_core::Config::load_for_site(&cli.site_dir, cli.config.as_deref());
    logging::init_from_config(loaded.as_ref().ok(), cli.verbose, cli.json_logs);

    tracing::debug!("srcset v{}", srcset_core::VERSION);

    let succeeded = match cli.command {
        Some(Commands::Config(args)) => {
            cli::config::execute(args, &cli.site_dir, cli.config.as_deref())?;
            true
        }
        None => cli::generate::execute(cli.generate, loaded?, &cli.site_dir).await?,
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
