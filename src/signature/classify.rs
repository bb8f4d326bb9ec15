//! Content classification: text → (primary frequency, category tag).
//!
//! The [`Classifier`] trait is the pluggable strategy; its only contract is
//! determinism. [`KeywordClassifier`] scores words against two fixed catalogs,
//! emotional tones and knowledge domains, each entry carrying a base frequency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotional tone catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmotionalTone {
    Anger,
    Fear,
    Sadness,
    Joy,
    Calm,
    Wonder,
}

/// Knowledge domain catalog. `General` is the no-signal default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnowledgeDomain {
    History,
    Society,
    General,
    Health,
    Arts,
    Science,
    Technology,
}

/// A category from exactly one of the two catalogs.
///
/// Stored and serialized as `"emotion:<tone>"` or `"domain:<domain>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CategoryTag {
    Emotion(EmotionalTone),
    Domain(KnowledgeDomain),
}

impl EmotionalTone {
    pub const ALL: [EmotionalTone; 6] = [
        Self::Anger,
        Self::Fear,
        Self::Sadness,
        Self::Joy,
        Self::Calm,
        Self::Wonder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anger => "anger",
            Self::Fear => "fear",
            Self::Sadness => "sadness",
            Self::Joy => "joy",
            Self::Calm => "calm",
            Self::Wonder => "wonder",
        }
    }

    pub fn base_frequency(&self) -> f64 {
        match self {
            Self::Anger => 285.0,
            Self::Fear => 396.0,
            Self::Sadness => 417.0,
            Self::Joy => 528.0,
            Self::Calm => 639.0,
            Self::Wonder => 852.0,
        }
    }

    fn stems(&self) -> &'static [&'static str] {
        match self {
            Self::Anger => &["anger", "angry", "rage", "furious", "outrage", "hatred", "resent", "hostil", "frustrat", "annoy"],
            Self::Fear => &["fear", "afraid", "anxi", "worri", "worry", "panic", "terror", "dread", "threat", "nervous"],
            Self::Sadness => &["sad", "grief", "griev", "sorrow", "mourn", "lonel", "loss", "tears", "melanchol", "despair"],
            Self::Joy => &["joy", "happ", "delight", "celebrat", "cheer", "glad", "love", "laugh", "smil", "wonderful"],
            Self::Calm => &["calm", "peace", "serene", "relax", "tranquil", "gentle", "quiet", "stillness", "breath", "meditat"],
            Self::Wonder => &["wonder", "awe", "curio", "myster", "marvel", "amaz", "astonish", "fascinat", "dream", "discover"],
        }
    }
}

impl KnowledgeDomain {
    pub const ALL: [KnowledgeDomain; 7] = [
        Self::History,
        Self::Society,
        Self::General,
        Self::Health,
        Self::Arts,
        Self::Science,
        Self::Technology,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::History => "history",
            Self::Society => "society",
            Self::General => "general",
            Self::Health => "health",
            Self::Arts => "arts",
            Self::Science => "science",
            Self::Technology => "technology",
        }
    }

    pub fn base_frequency(&self) -> f64 {
        match self {
            Self::History => 174.0,
            Self::Society => 330.0,
            Self::General => 432.0,
            Self::Health => 486.0,
            Self::Arts => 594.0,
            Self::Science => 741.0,
            Self::Technology => 963.0,
        }
    }

    fn stems(&self) -> &'static [&'static str] {
        match self {
            Self::History => &["histor", "ancient", "century", "centuries", "empire", "dynast", "war", "revolution", "medieval", "archae"],
            Self::Society => &["govern", "policy", "policies", "econom", "communit", "law", "election", "citizen", "social", "politic"],
            Self::General => &[],
            Self::Health => &["health", "medic", "disease", "patient", "treatment", "therap", "clinic", "symptom", "nutrition", "diagnos"],
            Self::Arts => &["music", "paint", "poet", "poem", "film", "novel", "sculpt", "artist", "theat", "danc"],
            Self::Science => &["scien", "research", "experiment", "theor", "physic", "biolog", "chemi", "hypothes", "molecul", "quantum"],
            Self::Technology => &["software", "comput", "algorithm", "network", "program", "digital", "data", "engineer", "internet", "robot"],
        }
    }
}

impl CategoryTag {
    pub fn base_frequency(&self) -> f64 {
        match self {
            Self::Emotion(tone) => tone.base_frequency(),
            Self::Domain(domain) => domain.base_frequency(),
        }
    }

    pub fn is_emotional(&self) -> bool {
        matches!(self, Self::Emotion(_))
    }
}

impl fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emotion(tone) => write!(f, "emotion:{}", tone.as_str()),
            Self::Domain(domain) => write!(f, "domain:{}", domain.as_str()),
        }
    }
}

impl FromStr for CategoryTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (family, name) = s
            .split_once(':')
            .ok_or_else(|| format!("unknown category tag: {s}"))?;
        match family {
            "emotion" => EmotionalTone::ALL
                .iter()
                .find(|t| t.as_str() == name)
                .map(|t| Self::Emotion(*t))
                .ok_or_else(|| format!("unknown emotional tone: {name}")),
            "domain" => KnowledgeDomain::ALL
                .iter()
                .find(|d| d.as_str() == name)
                .map(|d| Self::Domain(*d))
                .ok_or_else(|| format!("unknown knowledge domain: {name}")),
            _ => Err(format!("unknown category tag: {s}")),
        }
    }
}

impl From<CategoryTag> for String {
    fn from(tag: CategoryTag) -> Self {
        tag.to_string()
    }
}

impl TryFrom<String> for CategoryTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Output of a [`Classifier`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub primary_frequency: f64,
    pub category_tag: CategoryTag,
}

/// Pluggable classification strategy. Must be a pure function of its inputs.
pub trait Classifier: Send + Sync {
    /// `words` are the lower-cased tokens of the text.
    fn classify(&self, words: &[String]) -> Classification;
}

/// Keyword-stem scoring against the emotional and domain catalogs.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl Classifier for KeywordClassifier {
    fn classify(&self, words: &[String]) -> Classification {
        let candidates = EmotionalTone::ALL
            .iter()
            .map(|t| (CategoryTag::Emotion(*t), t.stems()))
            .chain(
                KnowledgeDomain::ALL
                    .iter()
                    .map(|d| (CategoryTag::Domain(*d), d.stems())),
            );

        // Strictly-greater keeps the first catalog entry on ties.
        let mut best = (CategoryTag::Domain(KnowledgeDomain::General), 0usize);
        for (tag, stems) in candidates {
            let hits = words.iter().filter(|w| matches_any(w, stems)).count();
            if hits > best.1 {
                best = (tag, hits);
            }
        }

        // Texts in one category share a frequency, and with it a harmonic ladder.
        let category_tag = best.0;
        Classification {
            primary_frequency: category_tag.base_frequency(),
            category_tag,
        }
    }
}

/// Stems of four or more characters match as prefixes; shorter ones only exactly.
fn matches_any(word: &str, stems: &[&str]) -> bool {
    stems.iter().any(|stem| {
        if stem.len() >= 4 {
            word.starts_with(stem)
        } else {
            word == *stem
        }
    })
}
