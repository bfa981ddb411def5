// pixconvert/src/packager.rs
//! Turns conversion results into named artifacts and hands them to the host.
//!
//! "Download all" is delivered as one save per successful file, in input
//! order. Nothing is archived.

use crate::core::{ConversionResult, ConvertError, OutputFormat, Result};
use crate::utils::{converted_filename, file_stem, unique_path};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A named, typed byte buffer ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Host capability for persisting an artifact (a browser download, a file
/// write, an upload...). Closures with the matching signature implement it.
pub trait ArtifactSink {
    fn save_artifact(&mut self, bytes: &[u8], filename: &str, mime_type: &str) -> Result<()>;
}

impl<F> ArtifactSink for F
where
    F: FnMut(&[u8], &str, &str) -> Result<()>,
{
    fn save_artifact(&mut self, bytes: &[u8], filename: &str, mime_type: &str) -> Result<()> {
        self(bytes, filename, mime_type)
    }
}

/// Builds the artifact for one successful result, named
/// `<stem>_converted.<format>`.
pub fn package_one(result: &ConversionResult) -> Result<Artifact> {
    let converted = match &result.outcome {
        Ok(converted) => converted,
        Err(e) => return Err(ConvertError::NotConverted(e.kind())),
    };

    Ok(Artifact {
        filename: converted_filename(&result.original.name, converted.format),
        mime_type: converted.mime_type,
        bytes: converted.bytes.clone(),
    })
}

/// Builds one artifact per successful result, skipping failures.
///
/// Names that collide (ignoring case) with an earlier artifact get the
/// smallest free `_<n>` suffix, so the output is the same on every run.
pub fn package_many(results: &[ConversionResult]) -> Vec<Artifact> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut artifacts = Vec::new();

    for result in results {
        let Some(converted) = result.converted() else {
            log::debug!("Skipping failed result for {}", result.original.name);
            continue;
        };

        let filename = dedupe_name(&result.original.name, converted.format, &mut taken);
        artifacts.push(Artifact {
            filename,
            mime_type: converted.mime_type,
            bytes: converted.bytes.clone(),
        });
    }

    artifacts
}

fn dedupe_name(original: &str, format: OutputFormat, taken: &mut HashSet<String>) -> String {
    let mut candidate = converted_filename(original, format);
    let mut index = 1;
    while !taken.insert(candidate.to_lowercase()) {
        candidate = format!(
            "{}_converted_{}.{}",
            file_stem(original),
            index,
            format.extension()
        );
        index += 1;
    }
    candidate
}

/// Saves a single result through `sink` and returns the name used.
pub fn deliver_one(result: &ConversionResult, sink: &mut dyn ArtifactSink) -> Result<String> {
    let artifact = package_one(result)?;
    sink.save_artifact(&artifact.bytes, &artifact.filename, artifact.mime_type)?;
    Ok(artifact.filename)
}

/// Saves every successful result through `sink`, one call per file.
/// Returns how many artifacts were saved; zero means `sink` was never called.
pub fn deliver_all(results: &[ConversionResult], sink: &mut dyn ArtifactSink) -> Result<usize> {
    let artifacts = package_many(results);
    if artifacts.is_empty() {
        log::info!("No successful conversions to save");
        return Ok(0);
    }

    for artifact in &artifacts {
        sink.save_artifact(&artifact.bytes, &artifact.filename, artifact.mime_type)?;
    }

    log::info!("Saved {} artifacts", artifacts.len());
    Ok(artifacts.len())
}

/// Writes artifacts into a directory. Existing files are never overwritten;
/// a numeric suffix is added instead.
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if dir.exists() && !dir.is_dir() {
            return Err(ConvertError::Configuration(format!(
                "Output path exists but is not a directory: {}",
                dir.display()
            )));
        }
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ArtifactSink for DirectorySink {
    fn save_artifact(&mut self, bytes: &[u8], filename: &str, mime_type: &str) -> Result<()> {
        let path = unique_path(&self.dir, filename);
        fs::write(&path, bytes)?;
        log::info!(
            "Saved {} ({}, {} bytes)",
            path.display(),
            mime_type,
            bytes.len()
        );
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConvertedImage, ErrorKind, RawFile};

    fn ok(name: &str, format: OutputFormat) -> ConversionResult {
        ConversionResult {
            original: RawFile::new(name, name, "image/jpeg", vec![0u8; 4]),
            outcome: Ok(ConvertedImage {
                bytes: vec![1, 2, 3],
                mime_type: format.mime_type(),
                format,
                width: 1,
                height: 1,
            }),
        }
    }

    fn failed(name: &str) -> ConversionResult {
        ConversionResult {
            original: RawFile::new(name, name, "image/jpeg", vec![0u8; 4]),
            outcome: Err(ConvertError::Decode("corrupt".to_string())),
        }
    }

    #[test]
    fn package_one_names_after_original() {
        let artifact = package_one(&ok("holiday.jpeg", OutputFormat::Webp)).unwrap();
        assert_eq!(artifact.filename, "holiday_converted.webp");
        assert_eq!(artifact.mime_type, "image/webp");
    }

    #[test]
    fn package_one_refuses_failed_result() {
        let err = package_one(&failed("x.jpg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn duplicates_get_stable_suffixes() {
        let results = vec![
            ok("photo.jpg", OutputFormat::Png),
            ok("photo.jpg", OutputFormat::Png),
            ok("PHOTO.bmp", OutputFormat::Png),
            ok("photo_converted_1.gif", OutputFormat::Png),
        ];
        let names: Vec<_> = package_many(&results).into_iter().map(|a| a.filename).collect();
        assert_eq!(
            names,
            vec![
                "photo_converted.png",
                "photo_converted_1.png",
                "PHOTO_converted_2.png",
                "photo_converted_1_converted.png",
            ]
        );
    }

    #[test]
    fn failures_are_skipped() {
        let results = vec![failed("a.jpg"), ok("b.jpg", OutputFormat::Gif), failed("c.jpg")];
        let artifacts = package_many(&results);
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].filename, "b_converted.gif");
    }

    #[test]
    fn deliver_all_without_successes_never_calls_sink() {
        let results = vec![failed("a.jpg"), failed("b.jpg")];
        let mut calls = 0;
        let mut sink = |_: &[u8], _: &str, _: &str| -> Result<()> {
            calls += 1;
            Ok(())
        };
        assert_eq!(deliver_all(&results, &mut sink).unwrap(), 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn deliver_all_saves_in_input_order() {
        let results = vec![
            ok("b.png", OutputFormat::Jpg),
            failed("x.png"),
            ok("a.png", OutputFormat::Jpg),
        ];
        let mut saved = Vec::new();
        let mut sink = |bytes: &[u8], name: &str, mime: &str| -> Result<()> {
            saved.push((name.to_string(), mime.to_string(), bytes.len()));
            Ok(())
        };
        assert_eq!(deliver_all(&results, &mut sink).unwrap(), 2);
        assert_eq!(
            saved,
            vec![
                ("b_converted.jpg".to_string(), "image/jpeg".to_string(), 3),
                ("a_converted.jpg".to_string(), "image/jpeg".to_string(), 3),
            ]
        );
    }
}
