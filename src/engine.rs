//! The service object every surface talks to.
//!
//! An [`Engine`] owns the index store, fetcher, encoder, ingestion manager,
//! retrieval agent and answer orchestrator. It is built once, either from
//! config ([`Engine::open`]) or from injected parts ([`Engine::from_parts`]),
//! and torn down with [`Engine::close`].

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::answer::cache::{CacheStats, QueryCache};
use crate::answer::sources::{ExcerptSummarizer, ResonanceSource, SourceKind, Summarizer, WebSource};
use crate::answer::{Answer, Orchestrator, QueryContext};
use crate::config::ResonantConfig;
use crate::db::HealthReport;
use crate::error::StoreError;
use crate::fetch::{ContentFetcher, HttpFetcher};
use crate::index::{IndexStats, IndexStore};
use crate::ingest::{
    BatchOptions, BatchReport, DiskProbe, IngestOutcome, IngestionManager, Manifest, ProgressFn,
    Source, StorageProbe,
};
use crate::retrieval::{RetrievalAgent, SearchHit};
use crate::signature::{CategoryTag, SignatureEncoder};

/// Result of ingesting a single source.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub status: &'static str,
    pub outcome: IngestOutcome,
    pub stats: IndexStats,
}

pub struct Engine {
    config: Arc<ResonantConfig>,
    store: IndexStore,
    ingestion: IngestionManager,
    retrieval: RetrievalAgent,
    orchestrator: Orchestrator,
}

impl Engine {
    /// Open the on-disk index named by `config` and wire the production parts.
    pub fn open(config: ResonantConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let store = IndexStore::open(&db_path)
            .with_context(|| format!("failed to open index at {}", db_path.display()))?;
        tracing::info!(db = %db_path.display(), "index ready");

        let fetcher: Arc<dyn ContentFetcher> = Arc::new(HttpFetcher::new(&config.fetch));
        let probe: Arc<dyn StorageProbe> = Arc::new(DiskProbe::for_database(&db_path));
        Ok(Self::from_parts(config, store, fetcher, probe))
    }

    /// Build from injected parts. The answer chain gets the resonance source
    /// plus a web source for every configured URL template.
    pub fn from_parts(
        config: ResonantConfig,
        store: IndexStore,
        fetcher: Arc<dyn ContentFetcher>,
        probe: Arc<dyn StorageProbe>,
    ) -> Self {
        let store = store.with_max_candidates(config.retrieval.max_candidates);
        let encoder = Arc::new(SignatureEncoder::new(&config.signature));

        let ingestion = IngestionManager::new(
            Arc::clone(&fetcher),
            Arc::clone(&encoder),
            store.clone(),
            probe,
            config.storage.min_free_bytes,
        );
        let retrieval = RetrievalAgent::new(
            store.clone(),
            Arc::clone(&encoder),
            config.similarity,
            config.retrieval.clone(),
        );

        let summarizer: Arc<dyn Summarizer> = Arc::new(ExcerptSummarizer::default());
        let mut orchestrator = Orchestrator::new(QueryCache::from_config(&config.cache), &config.answer)
            .with_source(Arc::new(ResonanceSource::new(
                retrieval.clone(),
                Arc::clone(&fetcher),
                Arc::clone(&summarizer),
            )));
        for (kind, template, confidence) in [
            (
                SourceKind::Reference,
                &config.answer.reference_url_template,
                config.answer.reference_confidence,
            ),
            (
                SourceKind::News,
                &config.answer.news_url_template,
                config.answer.news_confidence,
            ),
        ] {
            if !template.trim().is_empty() {
                orchestrator.register(Arc::new(WebSource::new(
                    kind,
                    template.clone(),
                    confidence,
                    Arc::clone(&fetcher),
                    Arc::clone(&summarizer),
                )));
            }
        }
        tracing::debug!(sources = ?orchestrator.registered_kinds(), "answer chain ready");

        Self {
            config: Arc::new(config),
            store,
            ingestion,
            retrieval,
            orchestrator,
        }
    }

    pub fn config(&self) -> &ResonantConfig {
        &self.config
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    pub async fn ingest_one(&self, source: &Source, force_reload: bool) -> Result<IngestReport, StoreError> {
        let outcome = self.ingestion.ingest_source(source, force_reload).await;
        if matches!(outcome, IngestOutcome::Indexed { .. }) {
            self.orchestrator.clear_cache();
        }
        Ok(IngestReport {
            status: outcome.status(),
            outcome,
            stats: self.store.stats().await?,
        })
    }

    pub async fn ingest_batch(
        &self,
        sources: Vec<Source>,
        options: BatchOptions,
        cancel: CancellationToken,
        progress: Option<ProgressFn>,
    ) -> BatchReport {
        let report = self
            .ingestion
            .ingest_batch(sources, options, cancel, progress)
            .await;
        if report.successful > 0 {
            self.orchestrator.clear_cache();
        }
        report
    }

    /// Batch options seeded from `[ingestion]` config.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions::from_config(&self.config.ingestion)
    }

    pub fn load_manifest(&self) -> Result<Manifest> {
        Manifest::load(self.config.resolved_manifest_path())
    }

    /// Ingest every source of one manifest tier.
    pub async fn ingest_tier(
        &self,
        manifest: &Manifest,
        tier: &str,
        options: BatchOptions,
        cancel: CancellationToken,
        progress: Option<ProgressFn>,
    ) -> Result<BatchReport> {
        let tier = manifest.tier(tier).with_context(|| {
            format!(
                "unknown tier '{tier}' (available: {})",
                manifest.tier_names().join(", ")
            )
        })?;
        tracing::info!(tier = %tier.name, sources = tier.sources.len(), "ingesting tier");
        Ok(self
            .ingest_batch(tier.sources.clone(), options, cancel, progress)
            .await)
    }

    pub async fn search(
        &self,
        query: &str,
        top_n: usize,
        min_similarity: f64,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let matches = self
            .retrieval
            .find_by_text(query, top_n, min_similarity)
            .await?;
        Ok(matches.iter().map(SearchHit::from).collect())
    }

    /// URLs whose primary frequency falls inside `[min_freq, max_freq]`.
    pub async fn frequency_range(
        &self,
        min_freq: f64,
        max_freq: f64,
        category: Option<CategoryTag>,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let rows = self
            .store
            .range_query(min_freq, max_freq, category, limit)
            .await?;
        Ok(rows.into_iter().map(|(url, _)| url).collect())
    }

    pub async fn stats(&self) -> Result<IndexStats, StoreError> {
        self.store.stats().await
    }

    pub async fn answer(&self, query: &str, context: &QueryContext) -> Answer {
        self.orchestrator.answer(query, context).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.orchestrator.cache_stats()
    }

    pub async fn forget(&self, source_url: &str) -> Result<bool, StoreError> {
        let deleted = self.store.delete(source_url).await?;
        if deleted {
            self.orchestrator.clear_cache();
        }
        Ok(deleted)
    }

    pub async fn health(&self) -> Result<HealthReport, StoreError> {
        self.store.health().await
    }

    pub async fn close(self) -> Result<(), StoreError> {
        self.orchestrator.clear_cache();
        self.store.close().await?;
        tracing::info!("engine closed");
        Ok(())
    }
}
