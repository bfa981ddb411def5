// pixconvert/src/core/processor.rs
use super::{
    Configuration, ConversionResult, ConvertError, ConvertedImage, EngineSettings, RawFile,
    Result,
};
use crate::processors::{Decoder, Encoder, Resizer};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Single-file conversion pipeline: decode, orient, resize, encode.
///
/// An `ImageConverter` holds no per-file state, so one instance can serve any
/// number of files and threads. Construct it explicitly and hand it to
/// whatever drives the conversions.
pub struct ImageConverter {
    decoder: Decoder,
    resizer: Resizer,
    encoder: Encoder,
}

impl ImageConverter {
    pub fn new(settings: &EngineSettings) -> Self {
        let (max_w, max_h) = settings.max_dimensions;
        Self {
            decoder: Decoder::new()
                .with_max_dimensions(max_w, max_h)
                .with_orientation(settings.apply_orientation),
            resizer: Resizer::new(settings.algorithm).with_max_dimensions(max_w, max_h),
            encoder: Encoder::new().with_png_optimization(settings.optimize_png),
        }
    }

    /// Converts one file. Failures are captured in the returned result.
    ///
    /// `config` is expected to be validated already; an invalid one surfaces
    /// as a per-file error from the stage that trips over it.
    pub fn convert(&self, file: &RawFile, config: &Configuration) -> ConversionResult {
        let outcome = self.run_pipeline(file, config);
        match &outcome {
            Ok(converted) => log::debug!(
                "Converted {} ({} -> {} bytes)",
                file.name,
                file.len(),
                converted.bytes.len()
            ),
            Err(e) => log::warn!("Failed to convert {}: {}", file.name, e),
        }

        ConversionResult {
            original: file.clone(),
            outcome,
        }
    }

    fn run_pipeline(&self, file: &RawFile, config: &Configuration) -> Result<ConvertedImage> {
        let mut image = guarded(ConvertError::Decode, || {
            self.decoder.decode(&file.data, &file.media_type)
        })?;

        if config.resize {
            let width = config.width.unwrap_or(0);
            let height = config.height.unwrap_or(0);
            image = guarded(ConvertError::Resize, || self.resizer.resize(image, width, height))?;
        }

        let (bytes, mime_type) = guarded(ConvertError::Encode, || {
            self.encoder.encode(&image, config.format, config.quality)
        })?;

        Ok(ConvertedImage {
            bytes,
            mime_type,
            format: config.format,
            width: image.width(),
            height: image.height(),
        })
    }
}

/// Runs one pipeline stage, reporting a codec panic as that stage's error.
fn guarded<T>(
    stage_error: fn(String) -> ConvertError,
    step: impl FnOnce() -> Result<T>,
) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(step)) {
        Ok(result) => result,
        Err(payload) => {
            let message = format!("codec panicked: {}", panic_message(&*payload));
            Err(stage_error(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

impl Default for ImageConverter {
    fn default() -> Self {
        Self::new(&EngineSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, OutputFormat};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn jpeg_file(name: &str, width: u32, height: u32) -> RawFile {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 90]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .unwrap();
        RawFile::new(name, name, "image/jpeg", buffer.into_inner())
    }

    #[test]
    fn converts_jpeg_to_png() {
        let converter = ImageConverter::default();
        let config = Configuration::new(OutputFormat::Png, 90);
        let result = converter.convert(&jpeg_file("a.jpg", 20, 10), &config);
        let converted = result.converted().unwrap();
        assert_eq!(converted.mime_type, "image/png");
        assert_eq!((converted.width, converted.height), (20, 10));
    }

    #[test]
    fn applies_resize_when_enabled() {
        let converter = ImageConverter::default();
        let config = Configuration::new(OutputFormat::Bmp, 90).with_resize(5, 40);
        let result = converter.convert(&jpeg_file("a.jpg", 20, 10), &config);
        let decoded = image::load_from_memory(result.converted_bytes().unwrap()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 40));
    }

    #[test]
    fn resize_without_dimensions_fails_the_file() {
        let converter = ImageConverter::default();
        let mut config = Configuration::new(OutputFormat::Png, 90);
        config.resize = true;
        let result = converter.convert(&jpeg_file("a.jpg", 4, 4), &config);
        assert_eq!(result.error_kind(), Some(ErrorKind::Resize));
    }

    #[test]
    fn corrupt_input_reports_decode_error() {
        let converter = ImageConverter::default();
        let file = RawFile::new("x", "x.jpg", "image/jpeg", vec![0xFFu8, 0xD8, 0xFF, 0x00]);
        let result = converter.convert(&file, &Configuration::default());
        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::Decode));
        assert!(result.mime_type().is_none());
    }

    #[test]
    fn stage_panic_becomes_stage_error() {
        let err = guarded(ConvertError::Encode, || -> Result<()> { panic!("codec bug") })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);
        assert!(err.to_string().contains("codec bug"));

        let err = guarded(ConvertError::Decode, || -> Result<()> {
            panic!("bad marker {}", 7)
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("bad marker 7"));
    }

    #[test]
    fn stage_errors_pass_through() {
        let err = guarded(ConvertError::Decode, || -> Result<()> {
            Err(ConvertError::Resize("too big".to_string()))
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resize);
    }
}
