//! Two-phase retrieval: an index-assisted frequency-band prefilter, then
//! in-memory similarity scoring and ranking.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{RetrievalConfig, SimilarityWeights};
use crate::error::StoreError;
use crate::index::IndexStore;
use crate::signature::similarity::keyword_overlap;
use crate::signature::{similarity, Signature, SignatureEncoder};

/// A stored signature ranked against a query.
#[derive(Debug, Clone, Serialize)]
pub struct ResonantMatch {
    pub url: String,
    pub score: f64,
    pub signature: Signature,
}

/// Flattened match for external callers.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub url: String,
    pub score: f64,
    pub primary_frequency: f64,
    pub category_tag: String,
    pub word_count: u64,
}

impl From<&ResonantMatch> for SearchHit {
    fn from(m: &ResonantMatch) -> Self {
        Self {
            url: m.url.clone(),
            score: m.score,
            primary_frequency: m.signature.primary_frequency,
            category_tag: m.signature.category_tag.to_string(),
            word_count: m.signature.text_features.word_count,
        }
    }
}

#[derive(Clone)]
pub struct RetrievalAgent {
    store: IndexStore,
    encoder: Arc<SignatureEncoder>,
    weights: SimilarityWeights,
    config: RetrievalConfig,
}

impl RetrievalAgent {
    pub fn new(
        store: IndexStore,
        encoder: Arc<SignatureEncoder>,
        weights: SimilarityWeights,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            encoder,
            weights,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Rank stored signatures against `query`.
    ///
    /// Candidates come from the ±`frequency_band` prefilter; when that is
    /// empty, from a bounded scan of the whole index.
    pub async fn find_resonant(
        &self,
        query: &Signature,
        top_n: usize,
        min_similarity: f64,
    ) -> Result<Vec<ResonantMatch>, StoreError> {
        if top_n == 0 {
            return Ok(Vec::new());
        }

        let band = self.config.frequency_band;
        let category = self.config.category_prefilter.then_some(query.category_tag);
        let mut candidates = self
            .store
            .range_query(
                query.primary_frequency - band,
                query.primary_frequency + band,
                category,
                self.config.max_candidates,
            )
            .await?;

        if candidates.is_empty() {
            tracing::debug!(
                frequency = query.primary_frequency,
                band,
                "prefilter empty, scanning index"
            );
            candidates = self.store.scan(self.config.fallback_scan_limit).await?;
        }

        let considered = candidates.len();
        let weights = self.weights;
        let matches = rank_candidates(candidates, top_n, min_similarity, |candidate| {
            (
                similarity(query, candidate, &weights),
                keyword_overlap(query, candidate),
            )
        });

        tracing::debug!(considered, returned = matches.len(), "retrieval ranked");

        if !matches.is_empty() {
            let urls = matches.iter().map(|m| m.url.clone()).collect();
            if let Err(e) = self.store.record_access(urls).await {
                tracing::warn!(error = %e, "failed to record access");
            }
        }

        Ok(matches)
    }

    /// Encode `text` and rank against it. Text below the encoder's minimum
    /// length yields no matches.
    pub async fn find_by_text(
        &self,
        text: &str,
        top_n: usize,
        min_similarity: f64,
    ) -> Result<Vec<ResonantMatch>, StoreError> {
        match self.encoder.encode(text)? {
            Some(query) => self.find_resonant(&query, top_n, min_similarity).await,
            None => Ok(Vec::new()),
        }
    }
}

/// Score every candidate, drop those under `min_similarity`, and return the
/// best `top_n`, highest score first.
///
/// `score` yields the similarity and a secondary key; equal scores order by
/// the secondary key (highest first), then by URL.
pub fn rank_candidates<F>(
    candidates: Vec<(String, Signature)>,
    top_n: usize,
    min_similarity: f64,
    score: F,
) -> Vec<ResonantMatch>
where
    F: Fn(&Signature) -> (f64, f64),
{
    let mut scored: Vec<(f64, ResonantMatch)> = candidates
        .into_iter()
        .filter_map(|(url, signature)| {
            let (s, secondary) = score(&signature);
            (s >= min_similarity).then_some((
                secondary,
                ResonantMatch {
                    url,
                    score: s,
                    signature,
                },
            ))
        })
        .collect();

    scored.sort_by(|(ka, a), (kb, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| kb.partial_cmp(ka).unwrap_or(Ordering::Equal))
            .then_with(|| a.url.cmp(&b.url))
    });
    scored.truncate(top_n);
    scored.into_iter().map(|(_, m)| m).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<(String, Signature)> {
        let encoder = SignatureEncoder::default();
        ["alpha source text body", "beta source text body", "gamma source text body"]
            .iter()
            .enumerate()
            .map(|(i, text)| {
                (
                    format!("https://c.example/{i}"),
                    encoder.encode(text).unwrap().unwrap(),
                )
            })
            .collect()
    }

    fn fixed_scores(sig: &Signature, all: &[(String, Signature)]) -> f64 {
        let idx = all.iter().position(|(_, s)| s == sig).unwrap();
        [0.4, 0.9, 0.1][idx]
    }

    #[test]
    fn test_rank_filters_and_orders() {
        let all = candidates();
        let ranked = rank_candidates(all.clone(), 5, 0.3, |s| (fixed_scores(s, &all), 0.0));
        let scores: Vec<f64> = ranked.iter().map(|m| m.score).collect();
        assert_eq!(scores, vec![0.9, 0.4]);
        assert_eq!(ranked[0].url, "https://c.example/1");
    }

    #[test]
    fn test_rank_breaks_ties_by_secondary_key() {
        let all = candidates();
        let ranked = rank_candidates(all.clone(), 3, 0.0, |s| (0.5, fixed_scores(s, &all)));
        let urls: Vec<&str> = ranked.iter().map(|m| m.url.as_str()).collect();
        assert_eq!(urls, ["https://c.example/1", "https://c.example/0", "https://c.example/2"]);
    }

    #[test]
    fn test_rank_truncates_and_breaks_ties_by_url() {
        let all = candidates();
        let ranked = rank_candidates(all, 2, 0.0, |_| (0.5, 0.0));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].url, "https://c.example/0");
        assert_eq!(ranked[1].url, "https://c.example/1");
    }

    #[test]
    fn test_search_hit_flattens_match() {
        let (url, signature) = candidates().remove(0);
        let m = ResonantMatch {
            url,
            score: 0.75,
            signature,
        };
        let hit = SearchHit::from(&m);
        assert_eq!(hit.url, m.url);
        assert_eq!(hit.word_count, 4);
        assert_eq!(hit.category_tag, m.signature.category_tag.to_string());
    }
}
