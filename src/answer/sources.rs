//! Knowledge sources consulted by the orchestrator, and the summarizer seam.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::QueryContext;
use crate::error::SourceError;
use crate::fetch::ContentFetcher;
use crate::retrieval::RetrievalAgent;
use crate::signature::features::{tokenize, MIN_KEYWORD_CHARS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Resonance,
    Reference,
    News,
    Conversational,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resonance => "resonance",
            Self::Reference => "reference",
            Self::News => "news",
            Self::Conversational => "conversational",
        }
    }
}

/// A candidate answer. Whether it is accepted depends on `confidence`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAnswer {
    pub answer: String,
    pub confidence: f64,
}

#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// `Ok(None)` when the source has nothing to say.
    async fn lookup(
        &self,
        query: &str,
        context: &QueryContext,
    ) -> Result<Option<SourceAnswer>, SourceError>;
}

/// Turns raw retrieved content into user-facing text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, raw_content: &str, query: &str) -> Result<String, SourceError>;
}

/// Extractive summarizer: the sentences that mention the query's keywords,
/// or the opening of the document when none do.
pub struct ExcerptSummarizer {
    max_chars: usize,
}

impl Default for ExcerptSummarizer {
    fn default() -> Self {
        Self { max_chars: 600 }
    }
}

impl ExcerptSummarizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

#[async_trait]
impl Summarizer for ExcerptSummarizer {
    async fn summarize(&self, raw_content: &str, query: &str) -> Result<String, SourceError> {
        let keywords: Vec<String> = tokenize(query)
            .into_iter()
            .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
            .collect();

        let sentences = split_sentences(raw_content);
        let relevant: Vec<&str> = sentences
            .iter()
            .copied()
            .filter(|s| {
                let words = tokenize(s);
                keywords.iter().any(|k| words.contains(k))
            })
            .collect();
        let picked = if relevant.is_empty() { sentences } else { relevant };

        let mut out = String::new();
        for sentence in picked {
            let needed = sentence.chars().count() + usize::from(!out.is_empty());
            if out.chars().count() + needed > self.max_chars {
                break;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(sentence);
        }
        if out.is_empty() {
            out = raw_content.chars().take(self.max_chars).collect();
        }

        let out = out.trim().to_string();
        if out.is_empty() {
            return Err(SourceError::Summarize("no content to summarize".into()));
        }
        Ok(out)
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split_inclusive(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Answers from the local index: the best-resonating stored source is
/// re-fetched and summarized. Confidence is the match score.
pub struct ResonanceSource {
    agent: RetrievalAgent,
    fetcher: Arc<dyn ContentFetcher>,
    summarizer: Arc<dyn Summarizer>,
    top_n: usize,
    min_similarity: f64,
}

impl ResonanceSource {
    pub fn new(
        agent: RetrievalAgent,
        fetcher: Arc<dyn ContentFetcher>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let top_n = agent.config().default_top_n;
        let min_similarity = agent.config().default_min_similarity;
        Self {
            agent,
            fetcher,
            summarizer,
            top_n,
            min_similarity,
        }
    }
}

#[async_trait]
impl KnowledgeSource for ResonanceSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Resonance
    }

    async fn lookup(
        &self,
        query: &str,
        _context: &QueryContext,
    ) -> Result<Option<SourceAnswer>, SourceError> {
        let matches = self
            .agent
            .find_by_text(query, self.top_n, self.min_similarity)
            .await?;

        for m in matches {
            match self.fetcher.fetch(&m.url).await {
                Ok(Some(content)) => {
                    let summary = self.summarizer.summarize(&content, query).await?;
                    return Ok(Some(SourceAnswer {
                        answer: format!("{summary}\n\nSource: {}", m.url),
                        confidence: m.score,
                    }));
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(url = %m.url, error = %e, "resonant source unavailable");
                    continue;
                }
            }
        }
        Ok(None)
    }
}

/// Answers by fetching a templated URL (`{query}` is replaced with the
/// URL-encoded query). Confidence is fixed per source.
pub struct WebSource {
    kind: SourceKind,
    url_template: String,
    confidence: f64,
    fetcher: Arc<dyn ContentFetcher>,
    summarizer: Arc<dyn Summarizer>,
}

impl WebSource {
    pub fn new(
        kind: SourceKind,
        url_template: impl Into<String>,
        confidence: f64,
        fetcher: Arc<dyn ContentFetcher>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            kind,
            url_template: url_template.into(),
            confidence,
            fetcher,
            summarizer,
        }
    }

    pub fn url_for(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        self.url_template.replace("{query}", &encoded)
    }
}

#[async_trait]
impl KnowledgeSource for WebSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn lookup(
        &self,
        query: &str,
        _context: &QueryContext,
    ) -> Result<Option<SourceAnswer>, SourceError> {
        let url = self.url_for(query);
        let Some(content) = self.fetcher.fetch(&url).await? else {
            return Ok(None);
        };
        let summary = self.summarizer.summarize(&content, query).await?;
        Ok(Some(SourceAnswer {
            answer: summary,
            confidence: self.confidence,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_excerpt_prefers_matching_sentences() {
        let text = "Cats sleep a lot. Tides follow the moon. Bread needs yeast.";
        let summary = ExcerptSummarizer::default()
            .summarize(text, "why do tides happen")
            .await
            .unwrap();
        assert_eq!(summary, "Tides follow the moon.");
    }

    #[tokio::test]
    async fn test_excerpt_falls_back_to_opening() {
        let text = "First sentence here. Second sentence here. Third one.";
        let summary = ExcerptSummarizer::new(25).summarize(text, "zzz").await.unwrap();
        assert_eq!(summary, "First sentence here.");
    }

    #[tokio::test]
    async fn test_excerpt_rejects_empty_content() {
        assert!(ExcerptSummarizer::default().summarize("   ", "q").await.is_err());
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two!\nThree? "),
            vec!["One.", "Two!", "Three?"]
        );
    }
}
