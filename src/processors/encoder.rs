// pixconvert/src/processors/encoder.rs
use crate::core::{ConvertError, OutputFormat, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat};
use oxipng::{optimize_from_memory, Options};
use std::io::Cursor;

/// Serializes bitmaps into the supported output formats.
///
/// Color handling per format:
/// - jpg drops any alpha channel (the bitmap is flattened to 8-bit RGB).
/// - png and bmp keep alpha when the bitmap has one.
/// - gif and webp are always written as RGBA.
///
/// Every bitmap is normalized to 8 bits per channel first.
pub struct Encoder {
    optimize_png: bool,
}

impl Encoder {
    pub fn new() -> Self {
        Self { optimize_png: true }
    }

    pub fn with_png_optimization(mut self, optimize: bool) -> Self {
        self.optimize_png = optimize;
        self
    }

    /// Encodes `image` as `format`. `quality` is clamped to 1..=100 and only
    /// affects jpg and webp.
    pub fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<(Vec<u8>, &'static str)> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ConvertError::Encode("Cannot encode an empty bitmap".to_string()));
        }

        let quality = quality.clamp(1, 100);
        log::debug!(
            "Encoding {}x{} image as {} (quality {}{})",
            image.width(),
            image.height(),
            format,
            quality,
            if format.is_lossy() { "" } else { ", ignored" }
        );

        let bytes = match format {
            OutputFormat::Jpg => self.encode_jpeg(image, quality)?,
            OutputFormat::Png => self.encode_png(image)?,
            OutputFormat::Webp => self.encode_webp(image, quality)?,
            OutputFormat::Gif => {
                let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
                self.encode_generic(&rgba, ImageFormat::Gif)?
            }
            OutputFormat::Bmp => self.encode_generic(&normalize(image), ImageFormat::Bmp)?,
        };

        log::debug!("Encoded {} bytes of {}", bytes.len(), format.mime_type());
        Ok((bytes, format.mime_type()))
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| ConvertError::Encode(format!("Failed to encode JPEG: {}", e)))?;
        Ok(buffer)
    }

    fn encode_png(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let data = self.encode_generic(&normalize(image), ImageFormat::Png)?;
        if !self.optimize_png {
            return Ok(data);
        }

        match optimize_from_memory(&data, &Options::default()) {
            Ok(optimized) if optimized.len() < data.len() => Ok(optimized),
            Ok(_) => Ok(data),
            Err(e) => {
                log::warn!("PNG optimization failed, keeping unoptimized output: {}", e);
                Ok(data)
            }
        }
    }

    /// Lossy WebP on top of the lossless encoder.
    ///
    /// RGB is snapped to a per-channel palette before encoding. Coarse
    /// palettes can band and compress worse than finer ones, so every rung of
    /// the ladder at or above the one `quality` asks for is tried and the
    /// smallest result wins. Raising quality only removes candidates, so the
    /// output never shrinks as quality goes up. Quality 100 leaves only the
    /// exact encoding.
    fn encode_webp(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let rgba = image.to_rgba8();
        let mut smallest: Option<Vec<u8>> = None;

        for &levels in &LEVEL_LADDER[rung_for_quality(quality)..] {
            let mut candidate = rgba.clone();
            quantize_rgb(candidate.as_mut(), levels);

            let mut buffer = Vec::new();
            WebPEncoder::new_lossless(&mut buffer)
                .encode(
                    candidate.as_raw(),
                    candidate.width(),
                    candidate.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(|e| ConvertError::Encode(format!("Failed to encode WebP: {}", e)))?;

            if smallest.as_ref().map_or(true, |best| buffer.len() < best.len()) {
                smallest = Some(buffer);
            }
        }

        smallest.ok_or_else(|| ConvertError::Encode("No WebP candidate produced".to_string()))
    }

    fn encode_generic(&self, image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, format)
            .map_err(|e| ConvertError::Encode(format!("Failed to encode {:?}: {}", format, e)))?;
        Ok(buffer.into_inner())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Brings any bitmap down to 8-bit RGB or RGBA.
fn normalize(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image.clone(),
        _ if image.color().has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// Palette sizes per channel, coarsest first. The last rung is exact.
const LEVEL_LADDER: [u16; 12] = [2, 4, 6, 8, 12, 16, 24, 32, 64, 128, 192, 256];

/// Ladder rung for `quality`; non-decreasing, with 100 on the exact rung.
fn rung_for_quality(quality: u8) -> usize {
    let quality = usize::from(quality.clamp(1, 100));
    if quality == 100 {
        return LEVEL_LADDER.len() - 1;
    }
    (quality - 1) * (LEVEL_LADDER.len() - 1) / 99
}

/// Snaps RGB channels to `levels` evenly spaced values, leaving alpha
/// untouched. 256 levels is a no-op.
fn quantize_rgb(data: &mut [u8], levels: u16) {
    if levels >= 256 {
        return;
    }
    let step = 255.0 / (f32::from(levels.max(2)) - 1.0);
    for pixel in data.chunks_exact_mut(4) {
        for channel in pixel.iter_mut().take(3) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}
