//! Core data types for the srcset derivative pipeline.
//!
//! These types describe what the pipeline produces: the encoded formats, the
//! per-image manifest entries consumed by the page layer, and the reports that
//! summarize a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// An output encoding for derivatives.
///
/// Serialized as the file extension, which is also the manifest key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeFormat {
    /// AV1 still image, best compression
    Avif,
    /// Baseline JPEG, universally supported fallback
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
    /// WebP, legacy-compatible modern format
    Webp,
}

impl DerivativeFormat {
    /// All formats, in manifest order.
    pub const ALL: [DerivativeFormat; 3] = [Self::Avif, Self::Jpeg, Self::Webp];

    /// File extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

impl fmt::Display for DerivativeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One responsive candidate: a derivative width and its web-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeRef {
    /// Pixel width of the encoded derivative
    pub width: u32,
    /// Path relative to the web root, `/`-separated
    pub path: String,
}

/// The manifest record for one source image.
///
/// Serializes to the shape the page layer reads:
/// `{ width, height, base, avif: [...], jpg: [...], webp: [...], blurDataURL }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Intrinsic width of the source (placeholder width for fallbacks)
    pub width: u32,

    /// Intrinsic height of the source (placeholder height for fallbacks)
    pub height: u32,

    /// Normalized base path, extension stripped
    pub base: String,

    /// Responsive derivatives per format, ascending by width
    #[serde(flatten)]
    pub variants: BTreeMap<DerivativeFormat, Vec<DerivativeRef>>,

    /// Inline blur-up preview as a `data:` URI
    #[serde(rename = "blurDataURL")]
    pub blur_data_url: String,

    /// Set when the source was invalid and replaced by a flat placeholder
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

impl ManifestEntry {
    /// Responsive candidates for one format (empty if the format was not produced).
    pub fn candidates(&self, format: DerivativeFormat) -> &[DerivativeRef] {
        self.variants.get(&format).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Terminal state of one source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// All derivatives were encoded and written
    Written,
    /// The source was invalid and a flat placeholder was written instead
    Placeholder,
    /// Nothing was written for this source
    Failed,
}

/// A source that ended in [`FileStatus::Failed`].
#[derive(Debug, Clone)]
pub struct FailedSource {
    /// The source file
    pub path: PathBuf,
    /// Human-readable error message
    pub message: String,
}

/// Two sources that normalize to the same manifest key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// The shared manifest key
    pub key: String,
    /// The source that was seen first (sorted order)
    pub first: PathBuf,
    /// The later source
    pub second: PathBuf,
}

/// Summary of a full generation run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Raster sources discovered under the source root
    pub discovered: usize,
    /// Sources whose full derivative set was written
    pub written: usize,
    /// Sources replaced by placeholders
    pub placeholders: usize,
    /// Sources that failed
    pub failed: Vec<FailedSource>,
    /// Manifest key collisions detected before processing
    pub collisions: Vec<Collision>,
    /// Number of derivative files written to disk
    pub files_written: usize,
    /// Number of entries in the written manifest
    pub manifest_entries: usize,
    /// Where the manifest was written
    pub manifest_path: PathBuf,
}

impl RunReport {
    /// Sources that produced output (full sets plus placeholders).
    pub fn succeeded(&self) -> usize {
        self.written + self.placeholders
    }

    /// Whether the run should exit with a failure status.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Summary of a verification run.
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    /// Raster sources checked
    pub checked: usize,
    /// Sources with no base-format sibling in any configured format
    pub missing: Vec<PathBuf>,
}

impl VerifyReport {
    /// Whether every source has at least one base derivative.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}
