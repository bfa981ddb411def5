// pixconvert/src/cli.rs
use crate::core::{Configuration, ConvertError, OutputFormat, RawFile, ResizeAlgorithm, Result};
use crate::utils::{is_accepted_file, media_type_for_path};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "pixconvert", version, about = "Convert batches of images between formats")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert files (or directories of files) to one output format
    Convert {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory the converted files are written to
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Format::Jpg)]
        format: Format,

        /// Encoding quality (1-100), used by jpg and webp
        #[arg(
            short,
            long,
            default_value_t = 85,
            value_parser = clap::value_parser!(u8).range(1..=100)
        )]
        quality: u8,

        /// Stretch every image to this width (requires --height)
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Stretch every image to this height (requires --width)
        #[arg(long, requires = "width")]
        height: Option<u32>,

        /// Number of files converted concurrently (0 = one per CPU)
        #[arg(short, long, default_value_t = 4)]
        threads: usize,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        #[arg(short, long, value_enum, default_value_t = Algorithm::Lanczos3)]
        algorithm: Algorithm,

        /// Skip the oxipng pass on PNG output
        #[arg(long)]
        no_png_optimize: bool,

        /// Keep EXIF orientation instead of rotating pixels upright
        #[arg(long)]
        keep_orientation: bool,

        /// Maximum number of files accepted per run
        #[arg(long, default_value_t = crate::session::DEFAULT_MAX_FILES)]
        max_files: usize,
    },

    /// Show format, dimensions and orientation of an image
    Info { input: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Jpg,
    Png,
    Webp,
    Gif,
    Bmp,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Jpg => OutputFormat::Jpg,
            Format::Png => OutputFormat::Png,
            Format::Webp => OutputFormat::Webp,
            Format::Gif => OutputFormat::Gif,
            Format::Bmp => OutputFormat::Bmp,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl From<Algorithm> for ResizeAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Nearest => ResizeAlgorithm::Nearest,
            Algorithm::Bilinear => ResizeAlgorithm::Bilinear,
            Algorithm::Bicubic => ResizeAlgorithm::Bicubic,
            Algorithm::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}

pub fn build_configuration(
    format: Format,
    quality: u8,
    width: Option<u32>,
    height: Option<u32>,
) -> Configuration {
    let config = Configuration::new(format.into(), quality);
    match (width, height) {
        (Some(w), Some(h)) => config.with_resize(w, h),
        _ => config,
    }
}

/// Expands `inputs` into a sorted, de-duplicated list of image paths.
/// Explicit files are always kept; directory entries are filtered by
/// extension.
pub fn collect_input_paths(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if input.is_file() {
            paths.push(input.clone());
            continue;
        }

        if !input.is_dir() {
            return Err(ConvertError::Configuration(format!(
                "Input does not exist: {}",
                input.display()
            )));
        }

        let walker = if recursive {
            WalkDir::new(input)
        } else {
            WalkDir::new(input).max_depth(1)
        };

        let mut found: Vec<PathBuf> = walker
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_accepted_file(entry.path()))
            .map(|entry| entry.into_path())
            .collect();

        if found.is_empty() {
            log::warn!("No image files found in {}", input.display());
        }
        paths.append(&mut found);
    }

    let mut seen = std::collections::HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
    Ok(paths)
}

pub fn read_raw_file(path: &Path) -> Result<RawFile> {
    let data = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(RawFile::new(
        path.display().to_string(),
        name,
        media_type_for_path(path),
        data,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_convert_with_resize() {
        let cli = Cli::try_parse_from([
            "pixconvert",
            "convert",
            "a.jpg",
            "-o",
            "out",
            "-f",
            "png",
            "--width",
            "10",
            "--height",
            "20",
        ])
        .unwrap();
        match cli.command {
            Commands::Convert { format, width, height, quality, .. } => {
                let config = build_configuration(format, quality, width, height);
                assert_eq!(config.format, OutputFormat::Png);
                assert_eq!(config.target_dimensions(), Some((10, 20)));
                assert_eq!(config.quality, 85);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn width_without_height_is_rejected() {
        let parsed =
            Cli::try_parse_from(["pixconvert", "convert", "a.jpg", "-o", "out", "--width", "10"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn quality_range_is_enforced() {
        let parsed =
            Cli::try_parse_from(["pixconvert", "convert", "a.jpg", "-o", "out", "-q", "0"]);
        assert!(parsed.is_err());
    }
}
