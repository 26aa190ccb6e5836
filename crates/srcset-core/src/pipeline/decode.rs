//! Source reading and decoding with content-based format detection.

use image::{DynamicImage, GenericImageView};
use std::path::Path;
use std::sync::Arc;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::codec::ImageCodec;
use super::validate::{SourceFormat, Validator};

/// Reads and decodes source images.
pub struct ImageDecoder {
    validator: Validator,
    codec: Arc<dyn ImageCodec>,
}

/// Result of decoding a source image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Format detected from content
    pub format: SourceFormat,
    /// Intrinsic width in pixels
    pub width: u32,
    /// Intrinsic height in pixels
    pub height: u32,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits and codec.
    pub fn new(limits: LimitsConfig, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            validator: Validator::new(limits),
            codec,
        }
    }

    /// Read `path` and decode it off the async runtime.
    pub async fn decode(&self, path: &Path) -> Result<DecodedImage, PipelineError> {
        let unreadable = |e: std::io::Error| PipelineError::SourceUnreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let meta = tokio::fs::metadata(path).await.map_err(unreadable)?;
        self.validator.check_size(path, meta.len())?;

        let bytes = tokio::fs::read(path).await.map_err(unreadable)?;
        self.decode_from_bytes(bytes, path).await
    }

    /// Decode an in-memory source.
    pub async fn decode_from_bytes(
        &self,
        bytes: Vec<u8>,
        path: &Path,
    ) -> Result<DecodedImage, PipelineError> {
        let format = self.validator.check_magic_bytes(path, &bytes)?;

        let codec = Arc::clone(&self.codec);
        let image = tokio::task::spawn_blocking(move || codec.decode(&bytes))
            .await
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Task join error: {e}"),
            })?
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let (width, height) = image.dimensions();
        self.validator.check_dimensions(path, width, height)?;
        tracing::trace!("Decoded {:?} as {:?} ({}x{})", path, format, width, height);

        Ok(DecodedImage {
            image,
            format,
            width,
            height,
        })
    }
}
