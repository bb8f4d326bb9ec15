//! Heuristic query intent classification and source routing.

use serde::Serialize;

use super::sources::SourceKind;
use crate::signature::features::tokenize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Emotional,
    Technical,
    CurrentEvents,
    General,
    Conversational,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emotional => "emotional",
            Self::Technical => "technical",
            Self::CurrentEvents => "current_events",
            Self::General => "general",
            Self::Conversational => "conversational",
        }
    }

    /// Source kinds to try, in order.
    pub fn route(&self) -> Vec<SourceKind> {
        use SourceKind::*;
        match self {
            Self::Emotional => vec![Resonance, Conversational, Reference],
            Self::Technical => vec![Reference, Resonance],
            Self::CurrentEvents => vec![News, Reference, Resonance],
            Self::General => vec![Resonance, Reference, News],
            Self::Conversational => vec![Conversational, Resonance],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryIntent {
    pub category: IntentCategory,
    pub sources: Vec<SourceKind>,
}

/// Scored in this order; the first category wins a tie.
const CUES: [(IntentCategory, &[&str]); 4] = [
    (
        IntentCategory::CurrentEvents,
        &[
            "news", "today", "latest", "current", "recent", "recently", "breaking", "yesterday",
            "tonight", "announced", "election", "headlines", "week",
        ],
    ),
    (
        IntentCategory::Technical,
        &[
            "code", "program", "programming", "software", "algorithm", "computer", "database",
            "api", "bug", "compile", "compiler", "server", "network", "function", "install",
            "error", "debug", "rust", "python", "linux",
        ],
    ),
    (
        IntentCategory::Emotional,
        &[
            "feel", "feeling", "feelings", "sad", "happy", "anxious", "anxiety", "angry",
            "lonely", "afraid", "scared", "stress", "stressed", "depressed", "grief", "hurt",
            "upset", "worried", "love", "heartbroken",
        ],
    ),
    (
        IntentCategory::Conversational,
        &[
            "hello", "hi", "hey", "thanks", "thank", "bye", "goodbye", "morning", "evening",
        ],
    ),
];

pub fn classify(query: &str) -> QueryIntent {
    let words = tokenize(query);

    let mut best = IntentCategory::General;
    let mut best_hits = 0;
    for (category, cues) in CUES {
        let hits = words.iter().filter(|w| cues.contains(&w.as_str())).count();
        if hits > best_hits {
            best = category;
            best_hits = hits;
        }
    }

    QueryIntent {
        category: best,
        sources: best.route(),
    }
}
