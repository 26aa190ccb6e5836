//! Sub-configuration structs with defaults matching the site's published derivatives.

use serde::{Deserialize, Serialize};

use crate::types::DerivativeFormat;

/// Filesystem layout settings.
///
/// Relative paths are resolved against the site directory; `~` is expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory scanned recursively for source photos
    pub source_dir: String,

    /// Directory derivatives and the manifest are written to
    pub output_dir: String,

    /// Directory served as `/`; manifest paths are relative to it
    pub web_root: String,

    /// Manifest file name inside `output_dir`
    pub manifest_name: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: "photos".to_string(),
            output_dir: "public/images".to_string(),
            web_root: "public".to_string(),
            manifest_name: "manifest.json".to_string(),
        }
    }
}

/// What to do when two sources normalize to the same manifest key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Warn, and let the later source (sorted path order) replace the earlier one
    #[default]
    LastWriteWins,
    /// Report every later colliding source as a failure
    Fail,
}

/// Source discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Raster extensions treated as sources (case-insensitive)
    pub supported_extensions: Vec<String>,

    /// Manifest key collision handling
    pub on_collision: CollisionPolicy,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            on_collision: CollisionPolicy::default(),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
        }
    }
}

/// Encoder quality per output format, on a 1-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityConfig {
    pub avif: u8,
    pub jpg: u8,
    pub webp: u8,
}

impl QualityConfig {
    /// Quality for one format.
    pub fn for_format(&self, format: DerivativeFormat) -> u8 {
        match format {
            DerivativeFormat::Avif => self.avif,
            DerivativeFormat::Jpeg => self.jpg,
            DerivativeFormat::Webp => self.webp,
        }
    }

    pub(crate) fn values(&self) -> [(&'static str, u8); 3] {
        [("avif", self.avif), ("jpg", self.jpg), ("webp", self.webp)]
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            avif: 50,
            jpg: 82,
            webp: 78,
        }
    }
}

/// Responsive derivative settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativeConfig {
    /// Widths of the responsive derivatives, clamped to the source width
    pub target_widths: Vec<u32>,

    /// Width cap for the unsuffixed full-size derivative
    pub max_full_width: u32,

    /// Encodings produced for every width
    pub formats: Vec<DerivativeFormat>,

    /// Encoder quality per format
    pub quality: QualityConfig,

    /// AVIF encoder speed: 1 (slowest, smallest) to 10 (fastest)
    pub avif_speed: u8,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            target_widths: vec![960, 1440, 1920],
            max_full_width: 1920,
            formats: DerivativeFormat::ALL.to_vec(),
            quality: QualityConfig::default(),
            avif_speed: 6,
        }
    }
}

/// Blur-up placeholder (LQIP) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    /// Width of the inline preview in pixels
    pub width: u32,

    /// JPEG quality of the inline preview
    pub quality: u8,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            width: 24,
            quality: 40,
        }
    }
}

/// What to do with a source that cannot be read, decoded or encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidSourcePolicy {
    /// Log the failure, write nothing, and exit non-zero at the end
    #[default]
    Fail,
    /// Write a flat neutral placeholder at the bare base name
    Placeholder,
}

/// Invalid-source fallback settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Policy applied to unreadable or corrupt sources
    pub on_invalid_source: InvalidSourcePolicy,

    /// Placeholder width in pixels
    pub width: u32,

    /// Placeholder height in pixels
    pub height: u32,

    /// Placeholder fill color (RGB)
    pub color: [u8; 3],

    /// Encoder quality per format for placeholders
    pub quality: QualityConfig,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            on_invalid_source: InvalidSourcePolicy::default(),
            width: 8,
            height: 8,
            color: [230, 230, 230],
            quality: QualityConfig {
                avif: 45,
                jpg: 60,
                webp: 60,
            },
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
