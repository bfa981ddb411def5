// pixconvert/src/utils/mod.rs
use crate::core::OutputFormat;
use std::path::{Path, PathBuf};

/// Extensions picked up when scanning directories for inputs. SVG is accepted
/// like any other upload and then fails to decode.
pub const ACCEPTED_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif", "svg",
];

/// Name of the file without directories or its final extension, with
/// characters that are invalid in filenames replaced. Never empty.
pub fn file_stem(filename: &str) -> String {
    let name = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);

    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    };

    let stem = sanitize_filename(stem.trim());
    if stem.is_empty() {
        "image".to_string()
    } else {
        stem
    }
}

pub fn converted_filename(original: &str, format: OutputFormat) -> String {
    format!("{}_converted.{}", file_stem(original), format.extension())
}

pub fn sanitize_filename(filename: &str) -> String {
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    filename
        .chars()
        .map(|c| if invalid_chars.contains(&c) || c.is_control() { '_' } else { c })
        .collect()
}

/// `dir/filename`, or `dir/<stem>_<n>.<ext>` with the first free `n` when
/// that path already exists.
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let extension = path.extension().and_then(|e| e.to_str());

    let mut counter = 1;
    loop {
        let name = match extension {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base = 1024_f64;
    let bytes_f64 = bytes as f64;
    let exponent = ((bytes_f64.log10() / base.log10()).floor() as usize).min(UNITS.len() - 1);
    let size = bytes_f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}

pub fn is_accepted_file(path: &Path) -> bool {
    get_file_extension(path)
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Media type a browser would declare for `path`, judged by extension only.
pub fn media_type_for_path(path: &Path) -> String {
    match get_file_extension(path).as_deref() {
        Some("svg") => "image/svg+xml".to_string(),
        _ => image::ImageFormat::from_path(path)
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_strips_last_extension_and_directories() {
        assert_eq!(file_stem("photo.jpg"), "photo");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem("C:\\pics\\cat.png"), "cat");
        assert_eq!(file_stem("a/b/dog.webp"), "dog");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(file_stem(".png"), ".png");
        assert_eq!(file_stem(""), "image");
        assert_eq!(file_stem("what?.jpg"), "what_");
    }

    #[test]
    fn converted_name_uses_format_extension() {
        assert_eq!(converted_filename("photo.jpg", OutputFormat::Png), "photo_converted.png");
        assert_eq!(converted_filename("x.PNG", OutputFormat::Jpg), "x_converted.jpg");
    }

    #[test]
    fn file_sizes_are_human_readable() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn accepted_extensions_are_case_insensitive() {
        assert!(is_accepted_file(Path::new("a/B.JPG")));
        assert!(is_accepted_file(Path::new("vector.svg")));
        assert!(!is_accepted_file(Path::new("notes.txt")));
        assert!(!is_accepted_file(Path::new("README")));
    }

    #[test]
    fn media_type_from_extension() {
        assert_eq!(media_type_for_path(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(media_type_for_path(Path::new("a.svg")), "image/svg+xml");
        assert_eq!(media_type_for_path(Path::new("a.xyz")), "application/octet-stream");
    }

    #[test]
    fn unique_path_avoids_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_path(dir.path(), "a_converted.png");
        assert_eq!(first, dir.path().join("a_converted.png"));
        std::fs::write(&first, b"x").unwrap();
        let second = unique_path(dir.path(), "a_converted.png");
        assert_eq!(second, dir.path().join("a_converted_1.png"));
    }
}
