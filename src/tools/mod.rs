pub mod ask;
pub mod forget_source;
pub mod frequency_range;
pub mod index_stats;
pub mod ingest_source;
pub mod ingest_tier;
pub mod search_index;

use ask::AskParams;
use forget_source::ForgetSourceParams;
use frequency_range::FrequencyRangeParams;
use index_stats::IndexStatsParams;
use ingest_source::IngestSourceParams;
use ingest_tier::IngestTierParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use search_index::SearchIndexParams;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use resonant::answer::QueryContext;
use resonant::engine::Engine;
use resonant::ingest::Source;
use resonant::signature::CategoryTag;

const MAX_TOP_N: usize = 50;
const DEFAULT_RANGE_LIMIT: usize = 10;

/// The Resonant MCP tool handler. Holds the shared [`Engine`] and exposes all
/// MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct ResonantTools {
    tool_router: ToolRouter<Self>,
    engine: Arc<Engine>,
}

#[tool_router]
impl ResonantTools {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            engine,
        }
    }

    /// Fetch a URL, encode it, and add it to the index.
    #[tool(description = "Fetch a public web page, encode its text into a frequency signature, and add it to the index. Already-indexed URLs are skipped unless force_reload is true.")]
    async fn ingest_source(
        &self,
        Parameters(params): Parameters<IngestSourceParams>,
    ) -> Result<String, String> {
        if params.url.trim().is_empty() {
            return Err("url must not be empty".into());
        }

        let mut source = Source::new(params.url, params.name);
        if let Some(description) = params.description {
            source = source.with_description(description);
        }
        if let Some(priority) = params.priority {
            source = source.with_priority(priority);
        }

        tracing::info!(url = %source.url, "ingest_source called");

        let report = self
            .engine
            .ingest_one(&source, params.force_reload.unwrap_or(false))
            .await
            .map_err(|e| format!("ingest failed: {e}"))?;

        serde_json::to_string(&report).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Batch-ingest one manifest tier.
    #[tool(description = "Ingest every source in a tier of the sources manifest with bounded concurrency and a politeness delay. Returns processed/successful/failed/skipped counts, elapsed_seconds and sources_per_minute.")]
    async fn ingest_tier(
        &self,
        Parameters(params): Parameters<IngestTierParams>,
    ) -> Result<String, String> {
        let manifest = self
            .engine
            .load_manifest()
            .map_err(|e| format!("failed to load manifest: {e:#}"))?;

        let mut options = self.engine.batch_options();
        if let Some(max_concurrency) = params.max_concurrency {
            options.max_concurrency = max_concurrency.max(1);
        }
        if let Some(delay_ms) = params.delay_ms {
            options.delay = Duration::from_millis(delay_ms);
        }
        options.force_reload = params.force_reload.unwrap_or(false);

        tracing::info!(tier = %params.tier, "ingest_tier called");

        let report = self
            .engine
            .ingest_tier(&manifest, &params.tier, options, CancellationToken::new(), None)
            .await
            .map_err(|e| format!("{e:#}"))?;

        serde_json::to_string(&report).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Rank indexed sources against a free-text query.
    #[tool(description = "Search the index for sources that resonate with a free-text query. Returns url, score, primary_frequency, category_tag and word_count per hit.")]
    async fn search_index(
        &self,
        Parameters(params): Parameters<SearchIndexParams>,
    ) -> Result<String, String> {
        let retrieval = &self.engine.config().retrieval;
        let top_n = params
            .top_n
            .unwrap_or(retrieval.default_top_n)
            .clamp(1, MAX_TOP_N);
        let min_similarity = params
            .min_similarity
            .unwrap_or(retrieval.default_min_similarity);
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err("min_similarity must be between 0.0 and 1.0".into());
        }

        tracing::info!(query = %params.query, top_n, min_similarity, "search_index called");

        let hits = self
            .engine
            .search(&params.query, top_n, min_similarity)
            .await
            .map_err(|e| format!("search failed: {e}"))?;

        Ok(serde_json::json!({
            "results": hits,
            "total": hits.len(),
        })
        .to_string())
    }

    /// List URLs inside a frequency band.
    #[tool(description = "List indexed URLs whose primary frequency lies in [min_freq, max_freq], closest to the band midpoint first. Optionally filter by category tag.")]
    async fn frequency_range(
        &self,
        Parameters(params): Parameters<FrequencyRangeParams>,
    ) -> Result<String, String> {
        if params.min_freq > params.max_freq {
            return Err("min_freq must not exceed max_freq".into());
        }
        let category = params
            .category
            .as_deref()
            .map(str::parse::<CategoryTag>)
            .transpose()
            .map_err(|e: String| e)?;
        let limit = params.limit.unwrap_or(DEFAULT_RANGE_LIMIT).max(1);

        let urls = self
            .engine
            .frequency_range(params.min_freq, params.max_freq, category, limit)
            .await
            .map_err(|e| format!("range query failed: {e}"))?;

        Ok(serde_json::json!({ "urls": urls }).to_string())
    }

    /// Running totals for the index.
    #[tool(description = "Get index statistics: total_sources, total_words, avg_frequency, plus answer cache hit/miss counters.")]
    async fn index_stats(
        &self,
        Parameters(_params): Parameters<IndexStatsParams>,
    ) -> Result<String, String> {
        let stats = self
            .engine
            .stats()
            .await
            .map_err(|e| format!("stats failed: {e}"))?;
        Ok(serde_json::json!({
            "total_sources": stats.total_sources,
            "total_words": stats.total_words,
            "avg_frequency": stats.avg_frequency,
            "cache": self.engine.cache_stats(),
        })
        .to_string())
    }

    /// Answer a question through the cached source chain.
    #[tool(description = "Answer a question using the index first and configured reference/news sources as fallbacks. Always returns {answer, source, confidence, cached}; source is 'fallback' when nothing reliable was found.")]
    async fn ask(&self, Parameters(params): Parameters<AskParams>) -> Result<String, String> {
        if params.query.trim().is_empty() {
            return Err("query must not be empty".into());
        }
        let context = QueryContext {
            history: params.history.unwrap_or_default(),
            bypass_cache: params.bypass_cache.unwrap_or(false),
        };

        tracing::info!(query = %params.query, "ask called");
        let answer = self.engine.answer(&params.query, &context).await;

        serde_json::to_string(&answer).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Remove a source from the index.
    #[tool(description = "Remove an indexed source by URL. Returns {deleted: bool}.")]
    async fn forget_source(
        &self,
        Parameters(params): Parameters<ForgetSourceParams>,
    ) -> Result<String, String> {
        tracing::info!(url = %params.url, "forget_source called");
        let deleted = self
            .engine
            .forget(&params.url)
            .await
            .map_err(|e| format!("forget failed: {e}"))?;
        Ok(serde_json::json!({ "url": params.url, "deleted": deleted }).to_string())
    }
}

#[tool_handler]
impl ServerHandler for ResonantTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Resonant is a frequency-indexed knowledge store. Use ingest_source to teach it \
                 a web page or ingest_tier for a whole manifest tier. Use search_index to find \
                 resonant sources, and ask for a cached answer with honest confidence."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
