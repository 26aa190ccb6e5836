//! Input validation before and after decoding.

use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Raster formats accepted as sources, detected from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
}

/// Validates source files against size limits and magic bytes.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Reject files larger than the configured limit.
    pub fn check_size(&self, path: &Path, len: u64) -> Result<(), PipelineError> {
        let max_bytes = self.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        if len > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: len / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }
        Ok(())
    }

    /// Sniff the source format from its first bytes.
    ///
    /// The extension is only used for discovery; a PNG named `.jpg` is still
    /// decoded as PNG, and an HTML error page named `.jpg` is rejected here.
    pub fn check_magic_bytes(&self, path: &Path, bytes: &[u8]) -> Result<SourceFormat, PipelineError> {
        if bytes.len() < 4 {
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: "File too small to be a valid image".to_string(),
            });
        }

        Self::sniff(bytes).ok_or_else(|| PipelineError::Decode {
            path: path.to_path_buf(),
            message: "Unrecognized image format (invalid magic bytes)".to_string(),
        })
    }

    /// Reject decoded images larger than the configured dimension limit.
    pub fn check_dimensions(&self, path: &Path, width: u32, height: u32) -> Result<(), PipelineError> {
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                max_dim,
            });
        }
        Ok(())
    }

    fn sniff(header: &[u8]) -> Option<SourceFormat> {
        // JPEG: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(SourceFormat::Jpeg);
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if header.starts_with(&[0x89, b'P', b'N', b'G']) {
            return Some(SourceFormat::Png);
        }

        None
    }
}
