//! The image codec capability: decode, resize, encode.
//!
//! The generator never touches pixels itself. Everything goes through
//! [`ImageCodec`], so tests can swap in a codec that fails on demand and the
//! production [`RasterCodec`] stays a thin layer over the `image` crate.

use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder};
use std::io::Cursor;

use crate::error::CodecError;
use crate::types::DerivativeFormat;

/// Decode, resize and encode operations used by the pipeline.
pub trait ImageCodec: Send + Sync {
    /// Decode an in-memory image, sniffing its format from content.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError>;

    /// Resize to `width`, preserving aspect ratio. Never enlarges.
    fn resize(&self, image: &DynamicImage, width: u32) -> DynamicImage {
        let (w, h) = image.dimensions();
        if width >= w {
            return image.clone();
        }
        image.resize_exact(width, scaled_height(w, h, width), FilterType::Lanczos3)
    }

    /// Encode at a 1-100 quality.
    fn encode(
        &self,
        image: &DynamicImage,
        format: DerivativeFormat,
        quality: u8,
    ) -> Result<Vec<u8>, CodecError>;
}

/// Height matching `width` at the source aspect ratio, at least 1px.
pub fn scaled_height(src_width: u32, src_height: u32, width: u32) -> u32 {
    if src_width == 0 {
        return src_height.max(1);
    }
    let h = (src_height as f64 * width as f64 / src_width as f64).round() as u32;
    h.max(1)
}

/// Production codec backed by the `image` crate, with lossy WebP from
/// libwebp through the `webp` crate.
#[derive(Debug, Clone, Copy)]
pub struct RasterCodec {
    avif_speed: u8,
}

impl RasterCodec {
    /// Create a codec with the given AVIF encoder speed (1-10).
    pub fn new(avif_speed: u8) -> Self {
        Self {
            avif_speed: avif_speed.clamp(1, 10),
        }
    }
}

impl Default for RasterCodec {
    fn default() -> Self {
        Self::new(6)
    }
}

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CodecError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CodecError(format!("Cannot detect image format: {e}")))?;
        Ok(reader.decode()?)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: DerivativeFormat,
        quality: u8,
    ) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        let (width, height) = image.dimensions();

        match format {
            DerivativeFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = image.to_rgb8();
                JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )?;
            }
            DerivativeFormat::Webp => {
                let (pixels, color) = pixels_for(image);
                let encoder = match color {
                    ExtendedColorType::Rgba8 => webp::Encoder::from_rgba(&pixels, width, height),
                    _ => webp::Encoder::from_rgb(&pixels, width, height),
                };
                let encoded = encoder
                    .encode_simple(false, f32::from(quality))
                    .map_err(|e| CodecError(format!("WebP encode failed: {e:?}")))?;
                buffer.extend_from_slice(&encoded);
            }
            DerivativeFormat::Avif => {
                let (pixels, color) = pixels_for(image);
                AvifEncoder::new_with_speed_quality(&mut buffer, self.avif_speed, quality)
                    .write_image(&pixels, width, height, color)?;
            }
        }

        Ok(buffer)
    }
}

/// 8-bit RGB or RGBA pixels, keeping alpha only when the source has it.
fn pixels_for(image: &DynamicImage) -> (Vec<u8>, ExtendedColorType) {
    if image.color().has_alpha() {
        (image.to_rgba8().into_raw(), ExtendedColorType::Rgba8)
    } else {
        (image.to_rgb8().into_raw(), ExtendedColorType::Rgb8)
    }
}
