//! Chunked batch scheduling of handle fetches.
//!
//! The scheduler is the orchestrator: it dedupes the input into a work set,
//! partitions it into fixed-size batches, fans each batch out through the
//! limiter, waits for the whole batch to settle, drains results into the
//! sink, and pauses with jitter before the next batch. Batch boundaries are
//! barriers: every result of batch N is accepted before batch N+1 starts.

use crate::error::HandleCheckError;
use crate::fetcher::PageFetcher;
use crate::limiter::Limiter;
use crate::sink::ResultSink;
use crate::types::{CheckConfig, HandleResult, HandleStatus, RunSummary};
use crate::utils::dedupe_counted;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Runs batches of fetches against the remote service.
pub(crate) struct BatchScheduler {
    fetcher: Arc<PageFetcher>,
    limiter: Arc<Limiter>,
    config: CheckConfig,
}

impl BatchScheduler {
    pub(crate) fn new(fetcher: Arc<PageFetcher>, config: CheckConfig) -> Self {
        let limiter = Limiter::new(config.concurrency);
        Self {
            fetcher,
            limiter,
            config,
        }
    }

    /// Process every input name exactly once, routing results into `sink`.
    ///
    /// Cancellation is honored promptly: no new batch starts after the token
    /// fires, in-flight fetches of the current batch are aborted, and the
    /// sink is flushed so partial output remains valid.
    pub(crate) async fn run(
        &self,
        names: &[String],
        sink: &mut ResultSink,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, HandleCheckError> {
        let started = Instant::now();

        let (work, duplicates) = dedupe_counted(names);
        if duplicates > 0 {
            tracing::info!(duplicates, "dropped duplicate handles from the work set");
        }
        tracing::info!(
            total = names.len(),
            distinct = work.len(),
            "work set prepared"
        );

        let chunk_size = self.config.chunk_size.max(1);
        let total_batches = work.len().div_ceil(chunk_size);
        let mut batches_completed = 0;
        let mut cancelled = false;

        for (index, chunk) in work.chunks(chunk_size).enumerate() {
            let batch_number = index + 1;

            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            tracing::info!(
                batch = batch_number,
                total_batches,
                size = chunk.len(),
                "processing batch"
            );

            let mut handles = Vec::with_capacity(chunk.len());
            for name in chunk {
                let fetcher = self.fetcher.clone();
                let limiter = self.limiter.clone();
                let name = name.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = limiter.acquire().await;
                    // The permit is held across retries and backoff sleeps:
                    // the cap bounds outstanding load, not just open sockets.
                    fetcher.fetch_status(&name).await
                }));
            }

            let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
            let drain = async move {
                let joined = futures::future::join_all(handles).await;
                chunk
                    .iter()
                    .zip(joined)
                    .map(|(name, joined)| match joined {
                        Ok(result) => result,
                        Err(e) => HandleResult {
                            name: name.clone(),
                            status: HandleStatus::FatalError(format!("task failed: {}", e)),
                            attempts: 0,
                            check_duration: None,
                        },
                    })
                    .collect::<Vec<_>>()
            };
            tokio::pin!(drain);

            let results = tokio::select! {
                results = &mut drain => results,
                _ = cancel.cancelled() => {
                    for abort in &abort_handles {
                        abort.abort();
                    }
                    tracing::warn!(batch = batch_number, "run cancelled mid-batch");
                    cancelled = true;
                    break;
                }
            };

            // Barrier: the whole batch settles before anything is routed,
            // and everything is routed before the next batch starts.
            for result in results {
                sink.accept(result)?;
            }
            sink.flush()?;
            batches_completed += 1;

            if batch_number < total_batches {
                let pause = inter_batch_pause(self.config.pause_between_chunks);
                tracing::info!(
                    pause_ms = pause.as_millis() as u64,
                    "pausing before next batch"
                );
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                }
            }
        }

        sink.flush()?;

        let report = sink.report();
        Ok(RunSummary {
            total_input: names.len(),
            distinct: work.len(),
            duplicates,
            available: report.available,
            taken: report.taken,
            undetermined: report.undetermined,
            for_sale: report.for_sale,
            anomalies: report.anomalies.clone(),
            batches_completed,
            peak_in_flight: self.limiter.peak(),
            cancelled,
            elapsed: started.elapsed(),
        })
    }
}

/// Pause between batches: the configured base plus up to 2 seconds of jitter.
fn inter_batch_pause(base: Duration) -> Duration {
    let jitter: f64 = rand::thread_rng().gen_range(0.0..2.0);
    base + Duration::from_secs_f64(jitter)
}
