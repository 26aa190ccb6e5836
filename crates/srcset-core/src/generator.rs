//! Run orchestration: discover, process every source, fold results into the manifest.
//!
//! Sources are processed one after another. Each produces an immutable
//! [`SourceResult`]; the manifest is only built once every source has been
//! attempted, so no state is shared between files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{CollisionPolicy, Config};
use crate::error::{PipelineError, Result};
use crate::layout::{DerivativeBase, SiteLayout};
use crate::manifest::Manifest;
use crate::pipeline::{
    DerivativeProcessor, DiscoveredFile, FileDiscovery, ImageCodec, RasterCodec, SourceResult,
    Verifier,
};
use crate::types::{Collision, FailedSource, FileStatus, RunReport, VerifyReport};

/// The derivative generator.
pub struct Generator {
    config: Config,
    processor: DerivativeProcessor,
    verifier: Verifier,
}

impl Generator {
    /// Create a generator using the `image`-backed codec.
    pub fn new(config: Config) -> Self {
        let codec = Arc::new(RasterCodec::new(config.derivatives.avif_speed));
        Self::with_codec(config, codec)
    }

    /// Create a generator with a custom codec.
    pub fn with_codec(config: Config, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            processor: DerivativeProcessor::new(&config, codec),
            verifier: Verifier::new(config.derivatives.formats.clone()),
            config,
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Find every raster source under the layout's source root.
    pub fn discover(&self, layout: &SiteLayout) -> Result<Vec<DiscoveredFile>> {
        FileDiscovery::new(self.config.processing.clone())
            .skipping(layout.nested_output())
            .discover(layout.source_root())
    }

    /// Full rebuild: discover, process every source, write the manifest.
    pub async fn generate(&self, layout: &SiteLayout) -> Result<RunReport> {
        let files = self.discover(layout)?;
        self.generate_files(layout, &files, |_| {}).await
    }

    /// Process an already-discovered file list, calling `on_result` after each
    /// source reaches its terminal state.
    ///
    /// The manifest is written unconditionally once every file has been
    /// attempted, even if some failed. Only a manifest write failure is an error.
    pub async fn generate_files<F>(
        &self,
        layout: &SiteLayout,
        files: &[DiscoveredFile],
        mut on_result: F,
    ) -> Result<RunReport>
    where
        F: FnMut(&SourceResult),
    {
        let bases: Vec<DerivativeBase> = files
            .iter()
            .map(|f| layout.derivative_base(&f.path))
            .collect();

        let collisions = detect_collisions(&bases);
        let blocked: HashMap<&Path, &Collision> = match self.config.processing.on_collision {
            CollisionPolicy::Fail => collisions
                .iter()
                .map(|c| (c.second.as_path(), c))
                .collect(),
            CollisionPolicy::LastWriteWins => {
                for c in &collisions {
                    tracing::warn!(
                        "{} and {} share manifest key {:?}; the latter wins",
                        c.first.display(),
                        c.second.display(),
                        c.key
                    );
                }
                HashMap::new()
            }
        };

        let mut results = Vec::with_capacity(bases.len());
        for base in &bases {
            let result = match blocked.get(base.source.as_path()) {
                Some(collision) => {
                    let error = PipelineError::Collision {
                        path: base.source.clone(),
                        other: collision.first.clone(),
                        key: collision.key.clone(),
                    };
                    tracing::error!("Failed: {:?} - {}", base.source, error);
                    SourceResult::failed(base, &error)
                }
                None => self.processor.process(base).await,
            };
            on_result(&result);
            results.push(result);
        }

        let mut report = RunReport {
            discovered: files.len(),
            collisions,
            manifest_path: layout.manifest_path(),
            ..Default::default()
        };
        let manifest = fold_results(results, &mut report);
        manifest.save(&report.manifest_path)?;
        report.manifest_entries = manifest.len();
        tracing::debug!(
            "Manifest with {} entries written to {:?}",
            report.manifest_entries,
            report.manifest_path
        );

        Ok(report)
    }

    /// Read-only check that every source has a base derivative.
    pub fn verify(&self, layout: &SiteLayout) -> Result<VerifyReport> {
        let files = self.discover(layout)?;
        Ok(self.verifier.verify(layout, &files))
    }
}

/// Pairs of sources sharing a manifest key, each later source paired with the
/// first one seen (in slice order).
pub fn detect_collisions(bases: &[DerivativeBase]) -> Vec<Collision> {
    let mut first_seen: HashMap<&str, &PathBuf> = HashMap::new();
    let mut collisions = Vec::new();

    for base in bases {
        match first_seen.get(base.key.as_str()) {
            Some(first) => collisions.push(Collision {
                key: base.key.clone(),
                first: (*first).clone(),
                second: base.source.clone(),
            }),
            None => {
                first_seen.insert(&base.key, &base.source);
            }
        }
    }

    collisions
}

/// Reduce per-file results into the manifest, in processing order.
fn fold_results(results: Vec<SourceResult>, report: &mut RunReport) -> Manifest {
    let mut manifest = Manifest::new();
    for result in results {
        report.files_written += result.files_written;
        match result.status {
            FileStatus::Written => report.written += 1,
            FileStatus::Placeholder => report.placeholders += 1,
            FileStatus::Failed => report.failed.push(FailedSource {
                path: result.source,
                message: result.error.unwrap_or_default(),
            }),
        }
        if let Some(entry) = result.entry {
            manifest.insert(entry);
        }
    }
    manifest
}
