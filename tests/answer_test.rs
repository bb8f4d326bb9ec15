use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resonant::answer::cache::QueryCache;
use resonant::answer::sources::{KnowledgeSource, SourceAnswer, SourceKind};
use resonant::answer::{Orchestrator, QueryContext, FALLBACK_ANSWER, FALLBACK_SOURCE};
use resonant::config::AnswerConfig;
use resonant::error::SourceError;

// routed Resonance, Reference, News
const GENERAL_QUERY: &str = "Why is the sky blue";

enum Reply {
    Confidence(f64),
    Nothing,
    Error,
}

struct ScriptedSource {
    kind: SourceKind,
    reply: Reply,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(kind: SourceKind, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            kind,
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeSource for ScriptedSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn lookup(
        &self,
        _query: &str,
        _context: &QueryContext,
    ) -> Result<Option<SourceAnswer>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Reply::Confidence(confidence) => Ok(Some(SourceAnswer {
                answer: format!("answer from {}", self.kind.as_str()),
                confidence,
            })),
            Reply::Nothing => Ok(None),
            Reply::Error => Err(SourceError::Unavailable("scripted outage".into())),
        }
    }
}

fn orchestrator(ttl: Duration) -> Orchestrator {
    Orchestrator::new(QueryCache::new(100, ttl), &AnswerConfig::default())
}

#[tokio::test]
async fn first_confident_source_wins_and_later_ones_are_not_asked() {
    let resonance = ScriptedSource::new(SourceKind::Resonance, Reply::Confidence(0.5));
    let reference = ScriptedSource::new(SourceKind::Reference, Reply::Confidence(0.9));
    let news = ScriptedSource::new(SourceKind::News, Reply::Confidence(0.95));
    let orch = orchestrator(Duration::from_secs(60))
        .with_source(resonance.clone())
        .with_source(reference.clone())
        .with_source(news.clone());

    let answer = orch.answer(GENERAL_QUERY, &QueryContext::default()).await;

    assert_eq!(answer.source, "reference");
    assert_eq!(answer.confidence, 0.9);
    assert!(!answer.cached);
    assert_eq!(resonance.calls(), 1);
    assert_eq!(reference.calls(), 1);
    assert_eq!(news.calls(), 0);
}

#[tokio::test]
async fn repeated_query_is_served_from_cache_until_ttl_expires() {
    let reference = ScriptedSource::new(SourceKind::Reference, Reply::Confidence(0.8));
    let orch = orchestrator(Duration::from_millis(50)).with_source(reference.clone());
    let ctx = QueryContext::default();

    let first = orch.answer(GENERAL_QUERY, &ctx).await;
    let second = orch.answer("  why IS the sky   blue ", &ctx).await;

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.answer, first.answer);
    assert_eq!(reference.calls(), 1);
    assert_eq!(orch.cache_stats().hits, 1);
    assert_eq!(orch.cache_stats().misses, 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    let third = orch.answer(GENERAL_QUERY, &ctx).await;
    assert!(!third.cached);
    assert_eq!(reference.calls(), 2);
    let stats = orch.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
}

#[tokio::test]
async fn bypass_cache_consults_sources_again() {
    let reference = ScriptedSource::new(SourceKind::Reference, Reply::Confidence(0.8));
    let orch = orchestrator(Duration::from_secs(60)).with_source(reference.clone());

    orch.answer(GENERAL_QUERY, &QueryContext::default()).await;
    let bypass = QueryContext {
        bypass_cache: true,
        ..QueryContext::default()
    };
    let fresh = orch.answer(GENERAL_QUERY, &bypass).await;

    assert!(!fresh.cached);
    assert_eq!(reference.calls(), 2);
}

#[tokio::test]
async fn exhausted_chain_returns_uncached_fallback() {
    let resonance = ScriptedSource::new(SourceKind::Resonance, Reply::Confidence(0.2));
    let reference = ScriptedSource::new(SourceKind::Reference, Reply::Nothing);
    let orch = orchestrator(Duration::from_secs(60))
        .with_source(resonance.clone())
        .with_source(reference.clone());

    let answer = orch.answer(GENERAL_QUERY, &QueryContext::default()).await;
    assert_eq!(answer.answer, FALLBACK_ANSWER);
    assert_eq!(answer.source, FALLBACK_SOURCE);
    assert_eq!(answer.confidence, AnswerConfig::default().fallback_confidence);

    let again = orch.answer(GENERAL_QUERY, &QueryContext::default()).await;
    assert!(!again.cached);
    assert_eq!(resonance.calls(), 2);
}

#[tokio::test]
async fn failing_source_does_not_stop_the_chain() {
    let resonance = ScriptedSource::new(SourceKind::Resonance, Reply::Error);
    let reference = ScriptedSource::new(SourceKind::Reference, Reply::Confidence(0.75));
    let orch = orchestrator(Duration::from_secs(60))
        .with_source(resonance.clone())
        .with_source(reference);

    let answer = orch.answer(GENERAL_QUERY, &QueryContext::default()).await;

    assert_eq!(answer.source, "reference");
    assert_eq!(resonance.calls(), 1);
}

#[tokio::test]
async fn unregistered_kinds_are_skipped() {
    let news = ScriptedSource::new(SourceKind::News, Reply::Confidence(0.9));
    let orch = orchestrator(Duration::from_secs(60)).with_source(news.clone());

    let answer = orch.answer(GENERAL_QUERY, &QueryContext::default()).await;

    assert_eq!(answer.source, "news");
    assert_eq!(news.calls(), 1);
}

#[tokio::test]
async fn blank_query_gets_fallback_without_lookups() {
    let reference = ScriptedSource::new(SourceKind::Reference, Reply::Confidence(0.9));
    let orch = orchestrator(Duration::from_secs(60)).with_source(reference.clone());

    let answer = orch.answer("   ", &QueryContext::default()).await;

    assert_eq!(answer.source, FALLBACK_SOURCE);
    assert_eq!(reference.calls(), 0);
}

#[tokio::test]
async fn clearing_the_cache_forces_a_new_lookup() {
    let reference = ScriptedSource::new(SourceKind::Reference, Reply::Confidence(0.9));
    let orch = orchestrator(Duration::from_secs(60)).with_source(reference.clone());

    orch.answer(GENERAL_QUERY, &QueryContext::default()).await;
    orch.clear_cache();
    let answer = orch.answer(GENERAL_QUERY, &QueryContext::default()).await;

    assert!(!answer.cached);
    assert_eq!(reference.calls(), 2);
}
