// pixconvert/src/core/mod.rs
pub mod processor;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub use processor::ImageConverter;

/// Largest width or height accepted for decoding and resizing.
pub const MAX_DIMENSION: u32 = 100_000;

/// Largest bitmap a resize may produce, in bytes. Matches the default
/// `image::Limits::max_alloc`.
pub const MAX_ALLOC_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAlgorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

/// Target formats the engine can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpg,
    Png,
    Webp,
    Gif,
    Bmp,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Jpg,
        OutputFormat::Png,
        OutputFormat::Webp,
        OutputFormat::Gif,
        OutputFormat::Bmp,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
        }
    }

    /// Whether `quality` changes the encoded output for this format.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpg | Self::Webp)
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Webp => image::ImageFormat::WebP,
            Self::Gif => image::ImageFormat::Gif,
            Self::Bmp => image::ImageFormat::Bmp,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            "gif" => Ok(Self::Gif),
            "bmp" => Ok(Self::Bmp),
            other => Err(ConvertError::Configuration(format!(
                "Unsupported output format: {}",
                other
            ))),
        }
    }
}

/// Per-run conversion settings chosen by the user.
///
/// `width` and `height` are only read when `resize` is set. `quality` is
/// honored by the lossy formats (jpg, webp); png, gif and bmp accept it and
/// ignore it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub format: OutputFormat,
    pub quality: u8,
    #[serde(default)]
    pub resize: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpg,
            quality: 85,
            resize: false,
            width: None,
            height: None,
        }
    }
}

impl Configuration {
    pub fn new(format: OutputFormat, quality: u8) -> Self {
        Self {
            format,
            quality,
            ..Default::default()
        }
    }

    pub fn with_resize(mut self, width: u32, height: u32) -> Self {
        self.resize = true;
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(ConvertError::Configuration(format!(
                "Quality must be between 1 and 100, got {}",
                self.quality
            )));
        }

        if self.resize {
            let (width, height) = match (self.width, self.height) {
                (Some(w), Some(h)) => (w, h),
                _ => {
                    return Err(ConvertError::Configuration(
                        "Resize requested without both width and height".to_string(),
                    ))
                }
            };

            if width == 0 || height == 0 {
                return Err(ConvertError::Configuration(format!(
                    "Resize dimensions must be positive, got {}x{}",
                    width, height
                )));
            }

            if width > MAX_DIMENSION || height > MAX_DIMENSION {
                return Err(ConvertError::Configuration(format!(
                    "Dimensions too large (max {} pixels)",
                    MAX_DIMENSION
                )));
            }

            if u64::from(width) * u64::from(height) * 4 > MAX_ALLOC_BYTES {
                return Err(ConvertError::Configuration(format!(
                    "Resize target {}x{} needs more than {} bytes",
                    width, height, MAX_ALLOC_BYTES
                )));
            }
        }

        Ok(())
    }

    /// Target dimensions when resizing is enabled and fully specified.
    pub fn target_dimensions(&self) -> Option<(u32, u32)> {
        if !self.resize {
            return None;
        }
        self.width.zip(self.height)
    }
}

/// Engine-wide tuning, fixed when the engine is constructed.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Concurrency cap for batches; `0` means one worker per CPU.
    pub max_threads: usize,
    pub algorithm: ResizeAlgorithm,
    pub optimize_png: bool,
    pub apply_orientation: bool,
    pub max_dimensions: (u32, u32),
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_threads: 4,
            algorithm: ResizeAlgorithm::Lanczos3,
            optimize_png: true,
            apply_orientation: true,
            max_dimensions: (MAX_DIMENSION, MAX_DIMENSION),
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        let (max_w, max_h) = self.max_dimensions;
        if max_w == 0 || max_h == 0 {
            return Err(ConvertError::Configuration(
                "Maximum dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// One user-supplied input file. The buffer is shared, so cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub id: String,
    pub name: String,
    pub media_type: String,
    pub data: Arc<[u8]>,
}

impl RawFile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Encoded output of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct ConversionResult {
    pub original: RawFile,
    pub outcome: Result<ConvertedImage>,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn converted(&self) -> Option<&ConvertedImage> {
        self.outcome.as_ref().ok()
    }

    pub fn converted_bytes(&self) -> Option<&[u8]> {
        self.converted().map(|c| c.bytes.as_slice())
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        self.converted().map(|c| c.mime_type)
    }

    pub fn error(&self) -> Option<&ConvertError> {
        self.outcome.as_ref().err()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(ConvertError::kind)
    }
}

/// Results of one conversion run, in input order.
#[derive(Debug, Default)]
pub struct Batch {
    pub results: Vec<ConversionResult>,
    /// Set when the run was stopped early; `results` then omits the files
    /// that never started.
    pub cancelled: bool,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled
    }

    pub fn successes(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn stats(&self) -> BatchStats {
        let mut stats = BatchStats::default();
        for result in &self.results {
            stats.bytes_in += result.original.len() as u64;
            match &result.outcome {
                Ok(converted) => {
                    stats.succeeded += 1;
                    stats.bytes_out += converted.bytes.len() as u64;
                }
                Err(e) => {
                    stats.failed += 1;
                    stats.failures.push((result.original.name.clone(), e.kind()));
                }
            }
        }
        stats
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub failures: Vec<(String, ErrorKind)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    Resize,
    Encode,
    Configuration,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decode => "DecodeError",
            Self::Resize => "ResizeError",
            Self::Encode => "EncodeError",
            Self::Configuration => "ConfigurationError",
            Self::Io => "IoError",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Resize error: {0}")]
    Resize(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("File was not converted ({0})")]
    NotConverted(ErrorKind),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::Resize(_) => ErrorKind::Resize,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::NotConverted(kind) => *kind,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
