// pixconvert/src/processors/resizer.rs
use crate::core::{ConvertError, ResizeAlgorithm, Result, MAX_ALLOC_BYTES, MAX_DIMENSION};
use image::{imageops::FilterType, DynamicImage};

/// Stretches bitmaps to an exact target size.
///
/// Aspect ratio is not preserved: a 400x100 source resized to 100x100 comes
/// out squashed, never cropped or letterboxed.
#[derive(Debug, Clone)]
pub struct Resizer {
    algorithm: ResizeAlgorithm,
    max_dimensions: (u32, u32),
}

impl Resizer {
    pub fn new(algorithm: ResizeAlgorithm) -> Self {
        Self {
            algorithm,
            max_dimensions: (MAX_DIMENSION, MAX_DIMENSION),
        }
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = (width, height);
        self
    }

    pub fn resize(&self, image: DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
        if width == 0 || height == 0 {
            return Err(ConvertError::Resize(format!(
                "Target dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let (max_w, max_h) = self.max_dimensions;
        if width > max_w || height > max_h {
            return Err(ConvertError::Resize(format!(
                "Target dimensions {}x{} exceed maximum {}x{}",
                width, height, max_w, max_h
            )));
        }

        let needed = u64::from(width)
            * u64::from(height)
            * u64::from(image.color().bytes_per_pixel());
        if needed > MAX_ALLOC_BYTES {
            return Err(ConvertError::Resize(format!(
                "Resizing to {}x{} needs {} bytes, limit is {}",
                width, height, needed, MAX_ALLOC_BYTES
            )));
        }

        if width == image.width() && height == image.height() {
            log::debug!("Image dimensions unchanged, skipping resize");
            return Ok(image);
        }

        log::debug!(
            "Resizing image from {}x{} to {}x{}",
            image.width(),
            image.height(),
            width,
            height
        );

        Ok(image.resize_exact(width, height, self.filter_type()))
    }

    fn filter_type(&self) -> FilterType {
        match self.algorithm {
            ResizeAlgorithm::Nearest => FilterType::Nearest,
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Bicubic => FilterType::CatmullRom,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new(ResizeAlgorithm::Lanczos3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use image::RgbaImage;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
    }

    #[test]
    fn stretches_to_exact_size() {
        let resizer = Resizer::default();
        let out = resizer.resize(blank(400, 100), 100, 100).unwrap();
        assert_eq!((out.width(), out.height()), (100, 100));

        let out = resizer.resize(blank(10, 10), 37, 3).unwrap();
        assert_eq!((out.width(), out.height()), (37, 3));
    }

    #[test]
    fn zero_dimension_is_a_resize_error() {
        let err = Resizer::default().resize(blank(4, 4), 0, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resize);
    }

    #[test]
    fn oversized_target_is_rejected() {
        let resizer = Resizer::new(ResizeAlgorithm::Nearest).with_max_dimensions(64, 64);
        let err = resizer.resize(blank(4, 4), 65, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resize);
    }

    #[test]
    fn target_area_is_capped() {
        let err = Resizer::default()
            .resize(blank(4, 4), MAX_DIMENSION, MAX_DIMENSION)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resize);
    }
}
