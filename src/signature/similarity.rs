//! Weighted resonance score between two signatures.

use std::collections::BTreeSet;

use super::Signature;
use crate::config::SimilarityWeights;

/// Score in `[0, 1]`: weighted harmonic overlap, pattern closeness, and category affinity.
pub fn similarity(a: &Signature, b: &Signature, weights: &SimilarityWeights) -> f64 {
    let score = weights.harmonic * harmonic_overlap(&a.harmonic_ladder, &b.harmonic_ladder)
        + weights.pattern * pattern_closeness(a, b)
        + weights.category * category_affinity(a, b);
    score.clamp(0.0, 1.0)
}

/// Jaccard overlap of the two ladders after rounding each term to one decimal.
pub fn harmonic_overlap(a: &[f64], b: &[f64]) -> f64 {
    let a = rounded_set(a);
    let b = rounded_set(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// 1 − mean absolute difference of symmetry, complexity, and coherence.
pub fn pattern_closeness(a: &Signature, b: &Signature) -> f64 {
    (1.0 - a.pattern_metrics.mean_abs_diff(&b.pattern_metrics)).clamp(0.0, 1.0)
}

/// 1.0 for the same category tag, 0.5 otherwise.
pub fn category_affinity(a: &Signature, b: &Signature) -> f64 {
    if a.category_tag == b.category_tag {
        1.0
    } else {
        0.5
    }
}

/// Jaccard overlap of the two top-keyword lists. Orders matches that share
/// a category, and so a resonance score.
pub fn keyword_overlap(a: &Signature, b: &Signature) -> f64 {
    let a: BTreeSet<&str> = a.text_features.top_keywords.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.text_features.top_keywords.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Values in tenths, so set membership compares at one decimal place.
fn rounded_set(values: &[f64]) -> BTreeSet<i64> {
    values.iter().map(|v| (v * 10.0).round() as i64).collect()
}
