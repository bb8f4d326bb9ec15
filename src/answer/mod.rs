//! Cached, prioritized fallback chain over knowledge sources.
//!
//! [`Orchestrator::answer`] never fails: cache hits return immediately, then
//! the sources routed for the query's intent are tried in order until one
//! answers with enough confidence. When every source declines or errors, a
//! fixed low-confidence fallback answer is returned (and not cached).

pub mod cache;
pub mod intent;
pub mod sources;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::config::AnswerConfig;
use cache::{normalize_key, CacheStats, QueryCache};
use sources::{KnowledgeSource, SourceKind};

pub use intent::{IntentCategory, QueryIntent};

/// Text of the answer returned when no source is confident enough.
pub const FALLBACK_ANSWER: &str =
    "I don't have reliable information about that. Try rephrasing, or teach me a source on the topic.";

/// Source tag of [`FALLBACK_ANSWER`].
pub const FALLBACK_SOURCE: &str = "fallback";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub source: String,
    pub confidence: f64,
    pub cached: bool,
}

/// Per-request knobs passed through to every source.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    /// Earlier turns of the conversation, oldest first.
    pub history: Vec<String>,
    /// Skip the cache lookup (the result is still cached).
    pub bypass_cache: bool,
}

pub struct Orchestrator {
    sources: HashMap<SourceKind, Arc<dyn KnowledgeSource>>,
    cache: QueryCache,
    confidence_threshold: f64,
    fallback_confidence: f64,
}

impl Orchestrator {
    pub fn new(cache: QueryCache, config: &AnswerConfig) -> Self {
        Self {
            sources: HashMap::new(),
            cache,
            confidence_threshold: config.confidence_threshold,
            fallback_confidence: config.fallback_confidence,
        }
    }

    /// Register a source for its kind, replacing any earlier one.
    pub fn register(&mut self, source: Arc<dyn KnowledgeSource>) {
        self.sources.insert(source.kind(), source);
    }

    pub fn with_source(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.register(source);
        self
    }

    pub fn registered_kinds(&self) -> Vec<SourceKind> {
        let mut kinds: Vec<_> = self.sources.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached answer, e.g. after the index changed.
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    pub async fn answer(&self, query: &str, context: &QueryContext) -> Answer {
        let key = normalize_key(query);
        if key.is_empty() {
            return self.fallback();
        }

        if !context.bypass_cache {
            if let Some(mut hit) = self.cache.get(&key) {
                tracing::debug!(query = %key, source = %hit.source, "answer cache hit");
                hit.cached = true;
                return hit;
            }
        }

        let intent = intent::classify(query);
        tracing::debug!(query = %key, intent = intent.category.as_str(), "routing query");

        for kind in &intent.sources {
            let Some(source) = self.sources.get(kind) else {
                continue;
            };
            match source.lookup(query, context).await {
                Ok(Some(found))
                    if found.confidence.is_finite()
                        && found.confidence >= self.confidence_threshold =>
                {
                    let answer = Answer {
                        answer: found.answer,
                        source: kind.as_str().to_string(),
                        confidence: found.confidence,
                        cached: false,
                    };
                    self.cache.insert(key, answer.clone());
                    tracing::info!(
                        source = kind.as_str(),
                        confidence = answer.confidence,
                        "answer accepted"
                    );
                    return answer;
                }
                Ok(Some(found)) => {
                    tracing::debug!(
                        source = kind.as_str(),
                        confidence = found.confidence,
                        threshold = self.confidence_threshold,
                        "answer below threshold, discarded"
                    );
                }
                Ok(None) => {
                    tracing::debug!(source = kind.as_str(), "source had no answer");
                }
                Err(e) => {
                    tracing::warn!(source = kind.as_str(), error = %e, "source failed, trying next");
                }
            }
        }

        tracing::info!(query = %key, "all sources exhausted, returning fallback");
        self.fallback()
    }

    fn fallback(&self) -> Answer {
        Answer {
            answer: FALLBACK_ANSWER.to_string(),
            source: FALLBACK_SOURCE.to_string(),
            confidence: self.fallback_confidence,
            cached: false,
        }
    }
}
