// pixconvert/src/processors/orientation.rs
use exif::{In, Reader, Tag};
use image::DynamicImage;
use std::io::Cursor;

/// Returns the EXIF orientation (1..=8) embedded in `data`, if any.
pub fn read_orientation(data: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(data);
    let exif = match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return None,
        Err(e) => {
            log::debug!("Ignoring unreadable EXIF block: {}", e);
            return None;
        }
    };

    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .filter(|value| (1..=8).contains(value))
}

/// Rotates and flips `image` so it displays upright.
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

pub fn apply_exif_orientation(image: DynamicImage, data: &[u8]) -> DynamicImage {
    match read_orientation(data) {
        Some(orientation) if orientation != 1 => {
            log::debug!("Applying EXIF orientation {}", orientation);
            apply_orientation(image, orientation)
        }
        _ => image,
    }
}
