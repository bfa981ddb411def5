// pixconvert/src/processors/decoder.rs
use crate::core::{ConvertError, Result, MAX_DIMENSION};
use crate::processors::orientation;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use std::io::Cursor;

/// Formats the decoder will attempt. Anything else is a decode error even if
/// the `image` crate could read it.
const SUPPORTED_INPUTS: [ImageFormat; 6] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::WebP,
    ImageFormat::Tiff,
];

#[derive(Debug, Clone)]
pub struct Decoder {
    max_dimensions: (u32, u32),
    apply_orientation: bool,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            max_dimensions: (MAX_DIMENSION, MAX_DIMENSION),
            apply_orientation: true,
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = (width, height);
        self
    }

    pub fn with_orientation(mut self, apply: bool) -> Self {
        self.apply_orientation = apply;
        self
    }

    /// Decodes `data` into a bitmap.
    ///
    /// The format is sniffed from the content; `declared_media_type` is only
    /// consulted when the bytes carry no recognizable signature.
    pub fn decode(&self, data: &[u8], declared_media_type: &str) -> Result<DynamicImage> {
        if data.is_empty() {
            return Err(ConvertError::Decode("Input is empty".to_string()));
        }

        let format = self.detect_format(data, declared_media_type)?;
        log::debug!(
            "Decoding {} bytes as {:?} (declared: {})",
            data.len(),
            format,
            declared_media_type
        );

        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimensions.0);
        limits.max_image_height = Some(self.max_dimensions.1);

        let mut reader = ImageReader::with_format(Cursor::new(data), format);
        reader.limits(limits);

        let image = reader.decode().map_err(|e| {
            ConvertError::Decode(format!("Failed to decode {:?} image: {}", format, e))
        })?;

        if image.width() == 0 || image.height() == 0 {
            return Err(ConvertError::Decode("Image has no pixels".to_string()));
        }

        let image = if self.apply_orientation {
            orientation::apply_exif_orientation(image, data)
        } else {
            image
        };

        log::debug!(
            "Decoded image: {}x{} pixels, color: {:?}",
            image.width(),
            image.height(),
            image.color()
        );

        Ok(image)
    }

    pub fn detect_format(&self, data: &[u8], declared_media_type: &str) -> Result<ImageFormat> {
        let sniffed = image::guess_format(data).ok();
        let declared = ImageFormat::from_mime_type(declared_media_type.trim());

        if let (Some(sniffed), Some(declared)) = (sniffed, declared) {
            if sniffed != declared {
                log::debug!(
                    "Declared media type {} disagrees with content ({:?}), trusting content",
                    declared_media_type,
                    sniffed
                );
            }
        }

        let format = sniffed.or(declared).ok_or_else(|| {
            ConvertError::Decode(format!(
                "Unrecognized image data (declared media type: {})",
                if declared_media_type.is_empty() { "none" } else { declared_media_type }
            ))
        })?;

        if !SUPPORTED_INPUTS.contains(&format) {
            return Err(ConvertError::Decode(format!(
                "Unsupported input format: {:?}",
                format
            )));
        }

        Ok(format)
    }

    /// Reads only the header to report format and dimensions.
    pub fn probe(&self, data: &[u8]) -> Result<(ImageFormat, u32, u32)> {
        let format = self.detect_format(data, "")?;
        let (width, height) = ImageReader::with_format(Cursor::new(data), format)
            .into_dimensions()
            .map_err(|e| ConvertError::Decode(format!("Failed to read image header: {}", e)))?;
        Ok((format, width, height))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
