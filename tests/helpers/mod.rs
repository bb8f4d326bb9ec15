#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use resonant::config::ResonantConfig;
use resonant::error::FetchError;
use resonant::fetch::ContentFetcher;
use resonant::index::IndexStore;
use resonant::ingest::{IngestionManager, Source, StorageProbe};
use resonant::signature::SignatureEncoder;

/// What a [`FakeFetcher`] serves for one URL.
#[derive(Clone)]
pub enum FakePage {
    Text(String),
    /// Below the content threshold.
    Short,
    Status(u16),
}

/// In-memory [`ContentFetcher`]. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, FakePage>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn serve(&self, url: &str, page: FakePage) {
        self.pages.lock().unwrap().insert(url.to_string(), page);
    }

    pub fn serve_text(&self, url: &str, text: impl Into<String>) {
        self.serve(url, FakePage::Text(text.into()));
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let page = self.pages.lock().unwrap().get(url).cloned();
        match page {
            Some(FakePage::Text(text)) => Ok(Some(text)),
            Some(FakePage::Short) => Ok(None),
            Some(FakePage::Status(status)) => Err(FetchError::HttpStatus {
                url: url.to_string(),
                status,
            }),
            None => Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// A [`StorageProbe`] reporting whatever the test sets.
pub struct FixedProbe {
    available: AtomicU64,
}

impl FixedProbe {
    pub fn new(available: u64) -> Self {
        Self {
            available: AtomicU64::new(available),
        }
    }

    pub fn set(&self, available: u64) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl StorageProbe for FixedProbe {
    fn available_bytes(&self) -> io::Result<u64> {
        Ok(self.available.load(Ordering::SeqCst))
    }
}

pub const MIN_FREE_BYTES: u64 = 1024;

/// Distinct, deterministic article text about `topic`. Different `seed`s
/// always hash differently.
pub fn long_text(topic: &str, seed: usize) -> String {
    format!(
        "Article {seed} about {topic}. The {topic} community gathered again this season \
         to compare notes on {topic}, and researchers published fresh findings on the \
         subject. Readers wrote in with questions about {topic} and its history, while \
         engineers described how they measure progress. Entry number {seed} closes with \
         a short summary of what is known about {topic} today."
    )
}

pub fn source(url: &str) -> Source {
    Source::new(url, url)
}

pub fn test_store() -> IndexStore {
    IndexStore::in_memory().unwrap()
}

/// Manager over `store` with a fake fetcher and a probe reporting plenty of space.
pub fn test_manager(
    fetcher: Arc<FakeFetcher>,
    probe: Arc<FixedProbe>,
    store: IndexStore,
) -> IngestionManager {
    IngestionManager::new(
        fetcher,
        Arc::new(SignatureEncoder::default()),
        store,
        probe,
        MIN_FREE_BYTES,
    )
}

/// Config with no politeness delay and no web sources, so nothing leaves the process.
pub fn test_config() -> ResonantConfig {
    let mut config = ResonantConfig::default();
    config.ingestion.delay_ms = 0;
    config.storage.min_free_bytes = MIN_FREE_BYTES;
    config.answer.reference_url_template = String::new();
    config.answer.news_url_template = String::new();
    config
}
