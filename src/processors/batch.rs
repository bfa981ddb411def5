// pixconvert/src/processors/batch.rs
use crate::core::{
    Batch, Configuration, ConversionResult, ConvertError, EngineSettings, ImageConverter,
    RawFile, Result,
};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag for a running batch. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs the conversion pipeline over a list of files on a bounded pool.
///
/// At most `max_threads` files are decoded at once. Results come back in
/// input order no matter which worker finishes first. When a batch is
/// cancelled, files that already started run to completion and are kept;
/// files that never started are left out and the batch is flagged.
pub struct BatchConverter {
    converter: ImageConverter,
    max_threads: usize,
    thread_pool: rayon::ThreadPool,
    progress: ProgressBar,
}

impl BatchConverter {
    pub fn new(settings: EngineSettings) -> Result<Self> {
        settings.validate()?;

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.max_threads)
            .thread_name(|i| format!("pixconvert-{}", i))
            .build()
            .map_err(|e| {
                ConvertError::Configuration(format!("Failed to create thread pool: {}", e))
            })?;

        Ok(Self {
            converter: ImageConverter::new(&settings),
            max_threads: thread_pool.current_num_threads(),
            thread_pool,
            progress: ProgressBar::hidden(),
        })
    }

    /// Ticks `progress` once per finished file.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    pub fn convert_all(&self, files: &[RawFile], config: &Configuration) -> Result<Batch> {
        self.convert_all_cancellable(files, config, &CancelToken::new())
    }

    pub fn convert_all_cancellable(
        &self,
        files: &[RawFile],
        config: &Configuration,
        cancel: &CancelToken,
    ) -> Result<Batch> {
        self.convert_all_with(files, config, cancel, |_| {})
    }

    /// Like [`convert_all_cancellable`](Self::convert_all_cancellable), calling
    /// `on_result` from the worker as soon as each file finishes. Calls arrive
    /// in completion order, not input order.
    pub fn convert_all_with<F>(
        &self,
        files: &[RawFile],
        config: &Configuration,
        cancel: &CancelToken,
        on_result: F,
    ) -> Result<Batch>
    where
        F: Fn(&ConversionResult) + Sync,
    {
        config.validate()?;

        if files.is_empty() {
            log::warn!("No files to convert");
            return Ok(Batch::default());
        }

        log::info!(
            "Converting {} files to {} (quality {}, {} workers)",
            files.len(),
            config.format,
            config.quality,
            self.max_threads
        );
        self.progress.set_length(files.len() as u64);

        // One slot per input; rayon's indexed collect keeps slot i for file i.
        let slots: Vec<Option<ConversionResult>> = self.thread_pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    if cancel.is_cancelled() {
                        log::debug!("Skipping {} after cancellation", file.name);
                        return None;
                    }
                    let result = self.converter.convert(file, config);
                    self.progress.inc(1);
                    on_result(&result);
                    Some(result)
                })
                .collect()
        });

        let scheduled = slots.len();
        let results: Vec<ConversionResult> = slots.into_iter().flatten().collect();
        let cancelled = results.len() < scheduled;

        let batch = Batch { results, cancelled };
        let stats = batch.stats();

        if cancelled {
            log::warn!(
                "Batch cancelled after {} of {} files",
                batch.len(),
                scheduled
            );
            self.progress.abandon_with_message("cancelled");
        } else {
            self.progress.finish_with_message(format!(
                "Converted {} of {} images",
                stats.succeeded, scheduled
            ));
        }

        log::info!(
            "Batch finished: {} succeeded, {} failed ({} -> {} bytes)",
            stats.succeeded,
            stats.failed,
            stats.bytes_in,
            stats.bytes_out
        );

        Ok(batch)
    }
}
