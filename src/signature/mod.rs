//! Deterministic text → [`Signature`] encoding.
//!
//! A signature is a pure function of the input text: the same text always
//! produces a bit-identical signature. The encoder runs four steps:
//!
//! 1. hash the raw text ([`content_hash`]),
//! 2. classify it into a primary frequency and [`CategoryTag`] ([`classify`]),
//! 3. derive the golden-ratio harmonic ladder and its [`PatternMetrics`] ([`pattern`]),
//! 4. collect [`TextFeatures`] ([`features`]).
//!
//! Signatures are compared with [`similarity::similarity`].

pub mod classify;
pub mod features;
pub mod pattern;
pub mod similarity;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::SignatureConfig;
use crate::error::SignatureError;

pub use classify::{CategoryTag, Classification, Classifier, EmotionalTone, KeywordClassifier, KnowledgeDomain};
pub use features::TextFeatures;
pub use pattern::{CouplingData, CouplingType, PatternMetrics};
pub use similarity::similarity;

/// Version of the signature layout. Bumped whenever derivation changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Number of terms in the harmonic ladder for [`SCHEMA_VERSION`].
pub const LADDER_LEN: usize = 7;

/// Golden ratio used to scale successive ladder terms.
pub const PHI: f64 = 1.618_033_988_749_895;

/// The durable unit of knowledge derived from a piece of text.
///
/// `content_hash` and `schema_version` are only set by [`SignatureEncoder`];
/// decoding validates the version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignatureRecord")]
pub struct Signature {
    content_hash: String,
    pub primary_frequency: f64,
    pub category_tag: CategoryTag,
    pub harmonic_ladder: [f64; LADDER_LEN],
    pub pattern_metrics: PatternMetrics,
    pub coupling_data: CouplingData,
    pub text_features: TextFeatures,
    schema_version: u32,
}

/// Unvalidated wire form of [`Signature`].
#[derive(Debug, Deserialize)]
struct SignatureRecord {
    content_hash: String,
    primary_frequency: f64,
    category_tag: CategoryTag,
    harmonic_ladder: Vec<f64>,
    pattern_metrics: PatternMetrics,
    coupling_data: CouplingData,
    text_features: TextFeatures,
    schema_version: u32,
}

impl TryFrom<SignatureRecord> for Signature {
    type Error = SignatureError;

    fn try_from(record: SignatureRecord) -> Result<Self, Self::Error> {
        if record.schema_version != SCHEMA_VERSION {
            return Err(SignatureError::UnsupportedSchema {
                found: record.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        if record.content_hash.len() != 16
            || !record.content_hash.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(SignatureError::Malformed(format!(
                "content_hash '{}' is not 16 hex characters",
                record.content_hash
            )));
        }
        let harmonic_ladder: [f64; LADDER_LEN] =
            record.harmonic_ladder.try_into().map_err(|v: Vec<f64>| {
                SignatureError::Malformed(format!(
                    "harmonic_ladder has {} terms, expected {LADDER_LEN}",
                    v.len()
                ))
            })?;
        if !record.primary_frequency.is_finite() {
            return Err(SignatureError::NonFinite {
                field: "primary_frequency",
            });
        }

        Ok(Self {
            content_hash: record.content_hash,
            primary_frequency: record.primary_frequency,
            category_tag: record.category_tag,
            harmonic_ladder,
            pattern_metrics: record.pattern_metrics,
            coupling_data: record.coupling_data,
            text_features: record.text_features,
            schema_version: record.schema_version,
        })
    }
}

impl Signature {
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn to_json(&self) -> Result<String, SignatureError> {
        serde_json::to_string(self).map_err(|e| SignatureError::Malformed(e.to_string()))
    }

    /// Decode a stored signature, keeping schema-version errors typed.
    pub fn from_json(json: &str) -> Result<Self, SignatureError> {
        let record: SignatureRecord =
            serde_json::from_str(json).map_err(|e| SignatureError::Malformed(e.to_string()))?;
        Signature::try_from(record)
    }
}

/// First 8 bytes of SHA-256 over the raw text, as 16 lowercase hex characters.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..8])
}

/// `f·φ^k` for `k = 1..=LADDER_LEN`.
pub fn harmonic_ladder(primary_frequency: f64) -> [f64; LADDER_LEN] {
    let mut ladder = [0.0; LADDER_LEN];
    let mut value = primary_frequency;
    for term in ladder.iter_mut() {
        value *= PHI;
        *term = value;
    }
    ladder
}

/// Turns text into signatures. Cheap to share behind an `Arc`.
pub struct SignatureEncoder {
    classifier: Box<dyn Classifier>,
    min_length: usize,
}

impl Default for SignatureEncoder {
    fn default() -> Self {
        Self::new(&SignatureConfig::default())
    }
}

impl SignatureEncoder {
    /// Encoder with the built-in [`KeywordClassifier`].
    pub fn new(config: &SignatureConfig) -> Self {
        Self::with_classifier(config.min_length, Box::new(KeywordClassifier))
    }

    pub fn with_classifier(min_length: usize, classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier,
            min_length,
        }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Encode `text`. Returns `Ok(None)` when the text is shorter than `min_length` characters.
    pub fn encode(&self, text: &str) -> Result<Option<Signature>, SignatureError> {
        if text.chars().count() < self.min_length {
            return Ok(None);
        }

        let content_hash = content_hash(text);
        let words = features::tokenize(text);
        let Classification {
            primary_frequency,
            category_tag,
        } = self.classifier.classify(&words);

        if !primary_frequency.is_finite() {
            return Err(SignatureError::NonFinite {
                field: "primary_frequency",
            });
        }

        let harmonic_ladder = harmonic_ladder(primary_frequency);
        let pattern_metrics = PatternMetrics::from_ladder(&harmonic_ladder);
        let coupling_data = CouplingData::from_metrics(&pattern_metrics);
        let text_features = TextFeatures::from_text(text, &words);

        Ok(Some(Signature {
            content_hash,
            primary_frequency,
            category_tag,
            harmonic_ladder,
            pattern_metrics,
            coupling_data,
            text_features,
            schema_version: SCHEMA_VERSION,
        }))
    }
}
