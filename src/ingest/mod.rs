//! Drives Fetch → Encode → Store for single sources and bounded batches.
//!
//! Every per-source failure is classified into an [`IngestOutcome`], counted,
//! and written to the ingest log; nothing a single source does can abort a
//! batch. The only batch-wide stop conditions are storage exhaustion (the
//! batch pauses) and the caller's [`CancellationToken`].

pub mod probe;
pub mod source;

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::IngestionConfig;
use crate::error::StoreError;
use crate::fetch::ContentFetcher;
use crate::index::{IndexStore, LogOutcome};
use crate::signature::{CategoryTag, SignatureEncoder};

pub use probe::{DiskProbe, StorageProbe, UnlimitedProbe};
pub use source::{Manifest, Source, Tier};

/// Why a source was skipped. Skips are normal, non-error outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyIndexed,
    ContentTooShort,
    DuplicateContent { existing_url: String },
}

/// Which stage failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum FailureReason {
    Fetch { kind: String, message: String },
    Encode { message: String },
    Storage { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PauseReason {
    StorageExhausted {
        available_bytes: u64,
        required_bytes: u64,
    },
}

/// Terminal state of one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Indexed {
        content_hash: String,
        primary_frequency: f64,
        category_tag: CategoryTag,
        /// `false` when a force reload overwrote an existing row.
        created: bool,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        reason: FailureReason,
    },
    Paused {
        reason: PauseReason,
    },
}

impl IngestOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Indexed { .. } => "indexed",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
            Self::Paused { .. } => "paused",
        }
    }

    fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    fn failed(reason: FailureReason) -> Self {
        Self::Failed { reason }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub max_concurrency: usize,
    /// Slept by a worker after every source that made a network request.
    pub delay: Duration,
    pub force_reload: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&IngestionConfig::default())
    }
}

impl BatchOptions {
    pub fn from_config(config: &IngestionConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            delay: Duration::from_millis(config.delay_ms),
            force_reload: false,
        }
    }
}

/// Aggregate counts for one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub paused: bool,
    pub cancelled: bool,
    /// Sources never attempted because the batch paused or was cancelled.
    pub remaining: usize,
    pub elapsed_seconds: f64,
    pub sources_per_minute: f64,
}

/// Called after each source completes, from whichever worker ran it.
pub type ProgressFn = Arc<dyn Fn(&Source, &IngestOutcome) + Send + Sync>;

#[derive(Default)]
struct Counters {
    processed: AtomicUsize,
    successful: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

#[derive(Clone)]
pub struct IngestionManager {
    fetcher: Arc<dyn ContentFetcher>,
    encoder: Arc<SignatureEncoder>,
    store: IndexStore,
    probe: Arc<dyn StorageProbe>,
    min_free_bytes: u64,
}

impl IngestionManager {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        encoder: Arc<SignatureEncoder>,
        store: IndexStore,
        probe: Arc<dyn StorageProbe>,
        min_free_bytes: u64,
    ) -> Self {
        Self {
            fetcher,
            encoder,
            store,
            probe,
            min_free_bytes,
        }
    }

    /// Run one source through the pipeline.
    pub async fn ingest_source(&self, source: &Source, force_reload: bool) -> IngestOutcome {
        self.run_source(source, force_reload).await.0
    }

    /// The outcome plus whether the network was touched (so the caller knows
    /// whether to apply the politeness delay).
    async fn run_source(&self, source: &Source, force_reload: bool) -> (IngestOutcome, bool) {
        let url = source.url.as_str();

        if !force_reload {
            match self.store.exists(url).await {
                Ok(true) => {
                    tracing::debug!(url, "already indexed, skipping");
                    let outcome = IngestOutcome::skipped(SkipReason::AlreadyIndexed);
                    self.record(url, &outcome).await;
                    return (outcome, false);
                }
                Ok(false) => {}
                Err(e) => {
                    let outcome = storage_failure(url, &e);
                    self.record(url, &outcome).await;
                    return (outcome, false);
                }
            }
        }

        if let Some(outcome) = self.check_headroom() {
            return (outcome, false);
        }

        let text = match self.fetcher.fetch(url).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                let outcome = IngestOutcome::skipped(SkipReason::ContentTooShort);
                self.record(url, &outcome).await;
                return (outcome, true);
            }
            Err(e) => {
                tracing::warn!(url, kind = e.kind(), error = %e, "fetch failed");
                let outcome = IngestOutcome::failed(FailureReason::Fetch {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
                self.record(url, &outcome).await;
                return (outcome, true);
            }
        };

        let signature = match self.encoder.encode(&text) {
            Ok(Some(signature)) => signature,
            Ok(None) => {
                let outcome = IngestOutcome::skipped(SkipReason::ContentTooShort);
                self.record(url, &outcome).await;
                return (outcome, true);
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "encoding failed");
                let outcome = IngestOutcome::failed(FailureReason::Encode {
                    message: e.to_string(),
                });
                self.record(url, &outcome).await;
                return (outcome, true);
            }
        };

        // the store writes its own log entries for indexed and duplicate rows
        let outcome = match self.store.upsert(url, &signature).await {
            Ok(created) => {
                tracing::info!(
                    url,
                    name = %source.name,
                    frequency = signature.primary_frequency,
                    category = %signature.category_tag,
                    "source indexed"
                );
                IngestOutcome::Indexed {
                    content_hash: signature.content_hash().to_string(),
                    primary_frequency: signature.primary_frequency,
                    category_tag: signature.category_tag,
                    created,
                }
            }
            Err(StoreError::DuplicateContent { existing_url, .. }) => {
                tracing::info!(url, existing = %existing_url, "duplicate content, skipping");
                IngestOutcome::skipped(SkipReason::DuplicateContent { existing_url })
            }
            Err(e) => {
                let outcome = storage_failure(url, &e);
                self.record(url, &outcome).await;
                outcome
            }
        };
        (outcome, true)
    }

    fn check_headroom(&self) -> Option<IngestOutcome> {
        match self.probe.available_bytes() {
            Ok(available) if available < self.min_free_bytes => {
                tracing::warn!(
                    available,
                    required = self.min_free_bytes,
                    "storage headroom exhausted"
                );
                Some(IngestOutcome::Paused {
                    reason: PauseReason::StorageExhausted {
                        available_bytes: available,
                        required_bytes: self.min_free_bytes,
                    },
                })
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not probe free space, continuing");
                None
            }
        }
    }

    /// Audit-log a skip or failure. Logging problems never change the outcome.
    async fn record(&self, url: &str, outcome: &IngestOutcome) {
        let kind = match outcome {
            IngestOutcome::Skipped { .. } => LogOutcome::Skipped,
            IngestOutcome::Failed { .. } => LogOutcome::Failed,
            _ => return,
        };
        let details = serde_json::to_value(outcome).ok();
        if let Err(e) = self.store.log_outcome(url, kind, details).await {
            tracing::warn!(url, error = %e, "failed to write ingest log");
        }
    }

    /// Ingest `sources` with at most `options.max_concurrency` workers.
    ///
    /// Sources are taken in ascending priority (stable), duplicate URLs are
    /// dropped, and the token is checked before each source is taken.
    pub async fn ingest_batch(
        &self,
        sources: Vec<Source>,
        options: BatchOptions,
        cancel: CancellationToken,
        progress: Option<ProgressFn>,
    ) -> BatchReport {
        let started = Instant::now();

        let mut seen = HashSet::new();
        let mut ordered: Vec<Source> = sources
            .into_iter()
            .filter(|s| seen.insert(s.url.clone()))
            .collect();
        ordered.sort_by_key(|s| s.priority);

        let total = ordered.len();
        let workers = options.max_concurrency.max(1).min(total.max(1));
        tracing::info!(total, workers, delay_ms = options.delay.as_millis() as u64, "batch started");

        let queue = Arc::new(Mutex::new(VecDeque::from(ordered)));
        let counters = Arc::new(Counters::default());
        let paused = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let manager = self.clone();
            let queue = Arc::clone(&queue);
            let counters = Arc::clone(&counters);
            let paused = Arc::clone(&paused);
            let cancel = cancel.clone();
            let progress = progress.clone();
            let options = options.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() || paused.load(Ordering::SeqCst) {
                        break;
                    }
                    let next = match queue.lock() {
                        Ok(mut q) => q.pop_front(),
                        Err(_) => break,
                    };
                    let Some(source) = next else { break };

                    let (outcome, fetched) = manager.run_source(&source, options.force_reload).await;

                    if matches!(outcome, IngestOutcome::Paused { .. }) {
                        paused.store(true, Ordering::SeqCst);
                        if let Ok(mut q) = queue.lock() {
                            q.push_front(source);
                        }
                        break;
                    }

                    counters.processed.fetch_add(1, Ordering::SeqCst);
                    let bucket = match &outcome {
                        IngestOutcome::Indexed { .. } => &counters.successful,
                        IngestOutcome::Skipped { .. } => &counters.skipped,
                        _ => &counters.failed,
                    };
                    bucket.fetch_add(1, Ordering::SeqCst);

                    if let Some(progress) = &progress {
                        progress(&source, &outcome);
                    }

                    if fetched && !options.delay.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(options.delay) => {}
                        }
                    }
                }
                tracing::debug!(worker, "ingestion worker finished");
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "ingestion worker panicked");
            }
        }

        let remaining = queue.lock().map(|q| q.len()).unwrap_or(0);
        let elapsed_seconds = started.elapsed().as_secs_f64();
        let processed = counters.processed.load(Ordering::SeqCst);
        let sources_per_minute = if elapsed_seconds > 0.0 {
            processed as f64 / elapsed_seconds * 60.0
        } else {
            0.0
        };

        let report = BatchReport {
            processed,
            successful: counters.successful.load(Ordering::SeqCst),
            failed: counters.failed.load(Ordering::SeqCst),
            skipped: counters.skipped.load(Ordering::SeqCst),
            paused: paused.load(Ordering::SeqCst),
            cancelled: cancel.is_cancelled(),
            remaining,
            elapsed_seconds,
            sources_per_minute,
        };

        tracing::info!(
            processed = report.processed,
            successful = report.successful,
            failed = report.failed,
            skipped = report.skipped,
            paused = report.paused,
            cancelled = report.cancelled,
            elapsed_seconds = report.elapsed_seconds,
            "batch finished"
        );
        report
    }
}

fn storage_failure(url: &str, e: &StoreError) -> IngestOutcome {
    tracing::error!(url, error = %e, "index store error");
    IngestOutcome::failed(FailureReason::Storage {
        message: e.to_string(),
    })
}
