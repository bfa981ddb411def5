use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use pixconvert::cli::{self, Algorithm, Cli, Commands, Format};
use pixconvert::{
    deliver_all, format_file_size, orientation, BatchConverter, Decoder, DirectorySink,
    EngineSettings, Session,
};
use std::path::PathBuf;

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    match cli.command {
        Commands::Convert {
            inputs,
            output,
            format,
            quality,
            width,
            height,
            threads,
            recursive,
            algorithm,
            no_png_optimize,
            keep_orientation,
            max_files,
        } => process_convert(ConvertArgs {
            inputs,
            output,
            format,
            quality,
            width,
            height,
            threads,
            recursive,
            algorithm,
            optimize_png: !no_png_optimize,
            apply_orientation: !keep_orientation,
            max_files,
        }),
        Commands::Info { input } => process_info(input),
    }
}

struct ConvertArgs {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    format: Format,
    quality: u8,
    width: Option<u32>,
    height: Option<u32>,
    threads: usize,
    recursive: bool,
    algorithm: Algorithm,
    optimize_png: bool,
    apply_orientation: bool,
    max_files: usize,
}

fn process_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let config = cli::build_configuration(args.format, args.quality, args.width, args.height);
    config.validate()?;

    let paths = cli::collect_input_paths(&args.inputs, args.recursive)?;
    if paths.is_empty() {
        bail!("No image files to convert");
    }

    let mut session = Session::new(args.max_files);
    for path in &paths {
        let file = cli::read_raw_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if session.add(file.name, file.media_type, file.data).is_none() {
            log::warn!(
                "Only the first {} files are converted, {} skipped",
                args.max_files,
                paths.len() - session.len()
            );
            break;
        }
    }

    let settings = EngineSettings {
        max_threads: args.threads,
        algorithm: args.algorithm.into(),
        optimize_png: args.optimize_png,
        apply_orientation: args.apply_orientation,
        ..Default::default()
    };

    let progress = ProgressBar::new(session.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)?
            .progress_chars("#>-"),
    );

    let engine = BatchConverter::new(settings)?.with_progress(progress);
    let batch = session.convert(&engine, &config)?;
    let stats = batch.stats();

    let mut sink = DirectorySink::new(&args.output)?;
    deliver_all(&batch.results, &mut sink)?;

    println!(
        "Converted {} of {} images to {} ({} -> {})",
        stats.succeeded,
        batch.len(),
        args.output.display(),
        format_file_size(stats.bytes_in),
        format_file_size(stats.bytes_out)
    );

    for (name, kind) in &stats.failures {
        println!("  failed: {} ({})", name, kind);
    }

    if batch.cancelled {
        bail!("Conversion was cancelled before all files were processed");
    }
    if stats.failed > 0 {
        bail!("{} of {} files failed to convert", stats.failed, batch.len());
    }

    Ok(())
}

fn process_info(input: PathBuf) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("File does not exist: {}", input.display());
    }

    let data = std::fs::read(&input)?;
    let (format, width, height) = Decoder::new().probe(&data)?;
    let aspect_ratio = if height == 0 { 0.0 } else { width as f32 / height as f32 };

    println!("=== Image Information ===");
    println!("File: {}", input.display());
    println!("Size: {}", format_file_size(data.len() as u64));
    println!("Dimensions: {} x {} pixels", width, height);
    println!("Aspect Ratio: {:.2}:1", aspect_ratio);
    println!("Format: {:?} ({})", format, format.to_mime_type());
    match orientation::read_orientation(&data) {
        Some(value) => println!("EXIF orientation: {}", value),
        None => println!("EXIF orientation: none"),
    }

    Ok(())
}
