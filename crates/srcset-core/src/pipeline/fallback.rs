//! Flat placeholder images written in place of invalid sources.

use image::{DynamicImage, Rgb, RgbImage};

use crate::config::FallbackConfig;
use crate::types::DerivativeFormat;

/// Synthesizes and encodes the neutral placeholder image.
#[derive(Debug, Clone)]
pub struct FallbackGenerator {
    config: FallbackConfig,
}

impl FallbackGenerator {
    /// Create a new fallback generator with the given configuration.
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// The flat-color placeholder image.
    pub fn image(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(
            self.config.width,
            self.config.height,
            Rgb(self.config.color),
        ))
    }

    /// Placeholder dimensions `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Encoder quality for the placeholder in `format`.
    pub fn quality(&self, format: DerivativeFormat) -> u8 {
        self.config.quality.for_format(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_placeholder_is_flat_and_sized() {
        let generator = FallbackGenerator::new(FallbackConfig::default());
        let img = generator.image();

        assert_eq!(img.dimensions(), (8, 8));
        let rgb = img.to_rgb8();
        assert!(rgb.pixels().all(|p| p.0 == [230, 230, 230]));
    }

    #[test]
    fn test_placeholder_quality_per_format() {
        let generator = FallbackGenerator::new(FallbackConfig::default());
        assert_eq!(generator.quality(DerivativeFormat::Jpeg), 60);
        assert_eq!(generator.quality(DerivativeFormat::Webp), 60);
        assert_eq!(generator.quality(DerivativeFormat::Avif), 45);
    }
}
