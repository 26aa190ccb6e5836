//! Logging initialization.
//!
//! Logs go to stderr through a `tracing-subscriber` registry, either
//! human-readable or as JSON lines. `RUST_LOG` overrides the level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `verbose` selects DEBUG instead of INFO when `RUST_LOG` is unset.
pub fn init(verbose: bool, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Install the global subscriber using the `[logging]` table, with CLI flags
/// taking precedence. A config that failed to load falls back to flags only.
pub fn init_from_config(
    config: Option<&srcset_core::Config>,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let (verbose, json_format) = resolve(config, verbose_override, json_logs_override);
    init(verbose, json_format);
}

fn resolve(
    config: Option<&srcset_core::Config>,
    verbose_override: bool,
    json_logs_override: bool,
) -> (bool, bool) {
    let verbose = verbose_override
        || config.is_some_and(|c| matches!(c.logging.level.as_str(), "debug" | "trace"));
    let json_format = json_logs_override || config.is_some_and(|c| c.logging.format == "json");
    (verbose, json_format)
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}
