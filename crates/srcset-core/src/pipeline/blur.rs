//! Blur-up placeholder generation: a tiny JPEG inlined as a data URI.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::DynamicImage;

use crate::config::BlurConfig;
use crate::error::CodecError;
use crate::types::DerivativeFormat;

use super::codec::ImageCodec;

/// Prefix of every generated blur data URI.
pub const BLUR_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Generates low-quality image placeholders.
#[derive(Debug, Clone)]
pub struct BlurGenerator {
    config: BlurConfig,
}

impl BlurGenerator {
    /// Create a new blur generator with the given configuration.
    pub fn new(config: BlurConfig) -> Self {
        Self { config }
    }

    /// Downscale to the configured width and return it as a base64 JPEG data URI.
    pub fn generate(&self, codec: &dyn ImageCodec, image: &DynamicImage) -> Result<String, CodecError> {
        let bytes = self.generate_bytes(codec, image)?;
        Ok(format!("{BLUR_DATA_URI_PREFIX}{}", BASE64.encode(bytes)))
    }

    /// Generate the placeholder and return the raw JPEG bytes.
    pub fn generate_bytes(
        &self,
        codec: &dyn ImageCodec,
        image: &DynamicImage,
    ) -> Result<Vec<u8>, CodecError> {
        let tiny = codec.resize(image, self.config.width);
        codec.encode(&tiny, DerivativeFormat::Jpeg, self.config.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RasterCodec;
    use image::GenericImageView;

    #[test]
    fn test_blur_data_uri() {
        let generator = BlurGenerator::new(BlurConfig::default());
        let img = DynamicImage::new_rgb8(100, 50);

        let uri = generator.generate(&RasterCodec::default(), &img).unwrap();
        assert!(uri.starts_with(BLUR_DATA_URI_PREFIX));
        assert!(uri.len() > BLUR_DATA_URI_PREFIX.len());
    }

    #[test]
    fn test_blur_bytes_are_small_jpeg() {
        let codec = RasterCodec::default();
        let generator = BlurGenerator::new(BlurConfig {
            width: 24,
            quality: 40,
        });
        let img = DynamicImage::new_rgb8(240, 160);

        let bytes = generator.generate_bytes(&codec, &img).unwrap();
        assert_eq!(&bytes[0..3], &[0xFF, 0xD8, 0xFF]);

        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (24, 16));
    }

    #[test]
    fn test_blur_does_not_enlarge() {
        let codec = RasterCodec::default();
        let generator = BlurGenerator::new(BlurConfig::default());
        let img = DynamicImage::new_rgb8(8, 8);

        let bytes = generator.generate_bytes(&codec, &img).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap().dimensions(), (8, 8));
    }
}
