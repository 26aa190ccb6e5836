//! Default command: generate derivatives and the manifest, or verify them.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use srcset_core::config::InvalidSourcePolicy;
use srcset_core::pipeline::FileDiscovery;
use srcset_core::{Config, FileStatus, Generator, RunReport, SiteLayout};

/// Flags for a generation or verification run.
#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Only check that every source has derivatives; write nothing
    #[arg(long)]
    pub verify: bool,

    /// Replace invalid sources with flat placeholders instead of failing
    #[arg(long, visible_alias = "placeholders")]
    pub fix_invalid: bool,

    /// Override the source directory
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl GenerateArgs {
    /// Apply flag overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if self.fix_invalid {
            config.fallback.on_invalid_source = InvalidSourcePolicy::Placeholder;
        }
        if let Some(source) = &self.source {
            config.paths.source_dir = source.to_string_lossy().into_owned();
        }
        if let Some(output) = &self.output {
            config.paths.output_dir = output.to_string_lossy().into_owned();
        }
    }
}

/// Run generation (or verification). Returns whether the run succeeded.
pub async fn execute(args: GenerateArgs, mut config: Config, site_dir: &Path) -> anyhow::Result<bool> {
    args.apply(&mut config);
    config.validate()?;
    let layout = config.layout(site_dir)?;
    let generator = Generator::new(config);

    if args.verify {
        return verify(&generator, &layout);
    }

    let files = generator.discover(&layout)?;
    tracing::info!(
        "Found {} images ({:.1} MB) in {:?}",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / 1_000_000.0,
        layout.source_root()
    );

    let progress = if args.no_progress || files.is_empty() {
        ProgressBar::hidden()
    } else {
        create_progress_bar(files.len() as u64)
    };

    let start = Instant::now();
    let mut failed = 0u64;
    let report = generator
        .generate_files(&layout, &files, |result| {
            if result.status == FileStatus::Failed {
                failed += 1;
            }
            progress.inc(1);
            progress.set_message(if failed > 0 {
                format!("{failed} failed")
            } else {
                String::new()
            });
        })
        .await?;
    progress.finish_and_clear();

    print_summary(&report, start.elapsed());
    tracing::info!(
        "Done. Processed {} files, wrote/updated {} sets. Manifest: {}",
        report.discovered,
        report.succeeded(),
        report.manifest_path.display()
    );

    Ok(!report.has_failures())
}

fn verify(generator: &Generator, layout: &SiteLayout) -> anyhow::Result<bool> {
    let report = generator.verify(layout)?;
    if report.is_complete() {
        tracing::info!(
            "Verified {} sources: all derivatives present",
            report.checked
        );
    } else {
        tracing::error!(
            "{} of {} sources are missing derivatives",
            report.missing.len(),
            report.checked
        );
    }
    Ok(report.is_complete())
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

/// Print a formatted summary table after a run.
fn print_summary(report: &RunReport, elapsed: Duration) {
    let rate = if elapsed.as_secs_f64() > 0.0 {
        report.discovered as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Written:      {:>8}", report.written);
    if report.placeholders > 0 {
        eprintln!("    Placeholders: {:>8}", report.placeholders);
    }
    if report.has_failures() {
        eprintln!("    Failed:       {:>8}", report.failed.len());
    }
    if !report.collisions.is_empty() {
        eprintln!("    Collisions:   {:>8}", report.collisions.len());
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Sources:      {:>8}", report.discovered);
    eprintln!("    Files:        {:>8}", report.files_written);
    eprintln!("    Manifest:     {:>8}", report.manifest_entries);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
    for failure in &report.failed {
        eprintln!("    ✗ {}: {}", failure.path.display(), failure.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use srcset_core::DerivativeFormat;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.derivatives.target_widths = vec![16, 24];
        config.derivatives.max_full_width = 24;
        config.derivatives.formats = vec![DerivativeFormat::Jpeg];
        config.blur.width = 8;
        config
    }

    fn args() -> GenerateArgs {
        GenerateArgs {
            no_progress: true,
            ..Default::default()
        }
    }

    fn write_photo(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = RgbImage::from_fn(32, 20, |x, y| Rgb([x as u8 * 8, y as u8 * 8, 0]));
        DynamicImage::ImageRgb8(img).save(path).unwrap();
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        let args = GenerateArgs {
            fix_invalid: true,
            source: Some(PathBuf::from("shots")),
            output: Some(PathBuf::from("static/img")),
            ..Default::default()
        };
        args.apply(&mut config);

        assert_eq!(config.fallback.on_invalid_source, InvalidSourcePolicy::Placeholder);
        assert_eq!(config.paths.source_dir, "shots");
        assert_eq!(config.paths.output_dir, "static/img");
    }

    #[tokio::test]
    async fn test_generate_then_verify() {
        let dir = tempfile::tempdir().unwrap();
        write_photo(&dir.path().join("photos/photo.jpg"));

        let verify_args = GenerateArgs {
            verify: true,
            ..args()
        };
        assert!(!execute(verify_args, small_config(), dir.path()).await.unwrap());

        assert!(execute(args(), small_config(), dir.path()).await.unwrap());
        assert!(dir.path().join("public/images/photo-16.jpg").exists());
        assert!(dir.path().join("public/images/manifest.json").exists());

        let verify_args = GenerateArgs {
            verify: true,
            ..args()
        };
        assert!(execute(verify_args, small_config(), dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_source_fails_run() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("photos");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("corrupt.png"), [0x89, b'P', b'N', b'G', 0, 0]).unwrap();

        assert!(!execute(args(), small_config(), dir.path()).await.unwrap());

        let fix = GenerateArgs {
            fix_invalid: true,
            ..args()
        };
        assert!(execute(fix, small_config(), dir.path()).await.unwrap());
        assert!(dir.path().join("public/images/corrupt.jpg").exists());
    }

    #[tokio::test]
    async fn test_missing_source_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(execute(args(), small_config(), dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_same_source_and_output_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = GenerateArgs {
            source: Some(PathBuf::from("img")),
            output: Some(PathBuf::from("img")),
            ..args()
        };
        assert!(execute(args, small_config(), dir.path()).await.is_err());
    }
}
