//! Concurrent conversion scheduler.
//!
//! A producer task feeds source paths through a bounded channel; up to
//! `concurrency` conversions run at once on the blocking pool. Results flow
//! back to the calling task, which is the only writer of the cache store.

use crate::core::cache::CacheStore;
use crate::core::pipeline::{Pipeline, WorkResult};
use crate::models::outcome::{ConversionOutcome, RunReport};
use crate::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unit of work submitted to the pool.
#[derive(Debug)]
enum Job {
    Convert(usize, PathBuf),
    /// Submitted after the stop flag was raised.
    Cancelled(usize, PathBuf),
}

/// Runs the pipeline over many sources.
pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    stop: Arc<AtomicBool>,
    show_progress: bool,
}

impl Scheduler {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            stop: Arc::new(AtomicBool::new(false)),
            show_progress: false,
        }
    }

    /// Show a progress bar while running.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Flag that stops submission when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Convert every source, returning exactly one outcome per source in
    /// submission order.
    pub async fn run_all(&self, sources: Vec<PathBuf>, cache: &mut CacheStore) -> Result<RunReport> {
        let started_at = Utc::now();
        let config = self.pipeline.config();
        let dry_run = config.dry_run;
        let concurrency = config.effective_concurrency();
        let checkpoint_interval = config.checkpoint_interval;
        let total = sources.len();

        tracing::info!(
            "Converting {} files ({} workers, queue depth {})",
            total,
            concurrency,
            config.queue_depth
        );

        let (tx, rx) = mpsc::channel::<Job>(config.queue_depth.max(1));
        let stop = Arc::clone(&self.stop);
        let producer = tokio::spawn(async move {
            for (index, path) in sources.into_iter().enumerate() {
                let job = if stop.load(Ordering::SeqCst) {
                    Job::Cancelled(index, path)
                } else {
                    Job::Convert(index, path)
                };
                if tx.send(job).await.is_err() {
                    break;
                }
            }
        });

        let snapshot = cache.snapshot();
        let pipeline = Arc::clone(&self.pipeline);
        let jobs = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|job| (job, rx)) });
        let results = jobs
            .map(move |job| {
                let pipeline = Arc::clone(&pipeline);
                let snapshot = snapshot.clone();
                async move {
                    match job {
                        Job::Cancelled(index, path) => (
                            index,
                            WorkResult {
                                outcome: ConversionOutcome::skipped(path, None, "cancelled")
                                    .with_dry_run(dry_run),
                                cache_update: None,
                            },
                        ),
                        Job::Convert(index, path) => {
                            let source = path.clone();
                            let handle =
                                tokio::task::spawn_blocking(move || pipeline.process(&path, &snapshot));
                            let result = match handle.await {
                                Ok(result) => result,
                                Err(e) => {
                                    tracing::error!("Worker failed on {:?}: {}", source, e);
                                    WorkResult {
                                        outcome: ConversionOutcome::failed(
                                            source,
                                            None,
                                            format!("worker panicked: {}", e),
                                        )
                                        .with_dry_run(dry_run),
                                        cache_update: None,
                                    }
                                }
                            };
                            (index, result)
                        }
                    }
                }
            })
            .buffer_unordered(concurrency);
        futures::pin_mut!(results);

        let pb = if self.show_progress {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut outcomes: Vec<(usize, ConversionOutcome)> = Vec::with_capacity(total);
        let mut updates = 0usize;

        while let Some((index, result)) = results.next().await {
            pb.set_message(
                result
                    .outcome
                    .source_path
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string(),
            );
            pb.inc(1);

            if let Some(update) = result.cache_update {
                cache.apply(update);
                updates += 1;
                if !dry_run && checkpoint_interval > 0 && updates % checkpoint_interval == 0 {
                    tracing::debug!("Cache checkpoint after {} updates", updates);
                    if let Err(e) = cache.persist() {
                        tracing::warn!("Cache checkpoint failed: {}", e);
                    }
                }
            }
            outcomes.push((index, result.outcome));
        }
        pb.finish_and_clear();

        if let Err(e) = producer.await {
            tracing::warn!("Submission task failed: {}", e);
        }

        if !dry_run && cache.is_dirty() {
            if let Err(e) = cache.persist() {
                tracing::warn!("Failed to persist cache to {}: {}", cache.path().display(), e);
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        let report = RunReport {
            run_id: Uuid::new_v4().to_string(),
            started_at,
            finished_at: Utc::now(),
            dry_run,
            outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
        };

        tracing::info!(
            "Run {} finished: {} converted, {} skipped, {} failed",
            report.run_id,
            report.converted_count(),
            report.skipped_count(),
            report.failed_count()
        );
        Ok(report)
    }
}
