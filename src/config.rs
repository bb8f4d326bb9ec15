use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResonantConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
    pub signature: SignatureConfig,
    pub similarity: SimilarityWeights,
    pub retrieval: RetrievalConfig,
    pub ingestion: IngestionConfig,
    pub cache: CacheConfig,
    pub answer: AnswerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Batch ingestion pauses when free space under the database directory drops below this.
    pub min_free_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
    pub min_content_chars: usize,
    pub max_body_bytes: usize,
    pub allowed_ports: Vec<u16>,
    /// Disables the private/loopback address checks. Only meant for local test servers.
    pub allow_private_networks: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SignatureConfig {
    pub min_length: usize,
}

/// Weights of the three similarity components. Expected to sum to 1.0.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SimilarityWeights {
    pub harmonic: f64,
    pub pattern: f64,
    pub category: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub frequency_band: f64,
    pub max_candidates: usize,
    pub fallback_scan_limit: usize,
    pub default_top_n: usize,
    pub default_min_similarity: f64,
    /// Restrict the prefilter to the query's own category tag.
    pub category_prefilter: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestionConfig {
    pub max_concurrency: usize,
    pub delay_ms: u64,
    pub manifest_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: u64,
    pub ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnswerConfig {
    pub confidence_threshold: f64,
    pub fallback_confidence: f64,
    /// `{query}` is replaced by the URL-encoded query. Empty disables the source.
    pub reference_url_template: String,
    pub reference_confidence: f64,
    pub news_url_template: String,
    pub news_confidence: f64,
}

impl Default for ResonantConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            fetch: FetchConfig::default(),
            signature: SignatureConfig::default(),
            similarity: SimilarityWeights::default(),
            retrieval: RetrievalConfig::default(),
            ingestion: IngestionConfig::default(),
            cache: CacheConfig::default(),
            answer: AnswerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_resonant_dir()
            .join("index.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            min_free_bytes: 512 * 1024 * 1024,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_redirects: 3,
            user_agent: concat!(
                "resonant/",
                env!("CARGO_PKG_VERSION"),
                " (knowledge indexer; +https://github.com/resonant-index/resonant)"
            )
            .into(),
            min_content_chars: 200,
            max_body_bytes: 2 * 1024 * 1024,
            allowed_ports: vec![80, 443],
            allow_private_networks: false,
        }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self { min_length: 10 }
    }
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            harmonic: 0.5,
            pattern: 0.3,
            category: 0.2,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            frequency_band: 30.0,
            max_candidates: 500,
            fallback_scan_limit: 5000,
            default_top_n: 5,
            default_min_similarity: 0.1,
            category_prefilter: false,
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        let manifest_path = default_resonant_dir()
            .join("sources.toml")
            .to_string_lossy()
            .into_owned();
        Self {
            max_concurrency: 3,
            delay_ms: 1000,
            manifest_path,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl_secs: 3600,
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            fallback_confidence: 0.1,
            reference_url_template: "https://en.wikipedia.org/wiki/Special:Search?search={query}"
                .into(),
            reference_confidence: 0.75,
            news_url_template: String::new(),
            news_confidence: 0.72,
        }
    }
}

/// Returns `~/.resonant/`, or `./.resonant` when no home directory is known.
pub fn default_resonant_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".resonant")
}

/// Returns the default config file path: `~/.resonant/config.toml`
pub fn default_config_path() -> PathBuf {
    default_resonant_dir().join("config.toml")
}

impl ResonantConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ResonantConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (RESONANT_DB, RESONANT_MANIFEST, RESONANT_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RESONANT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("RESONANT_MANIFEST") {
            self.ingestion.manifest_path = val;
        }
        if let Ok(val) = std::env::var("RESONANT_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    fn validate(&self) -> Result<()> {
        let w = &self.similarity;
        for (name, value) in [
            ("similarity.harmonic", w.harmonic),
            ("similarity.pattern", w.pattern),
            ("similarity.category", w.category),
        ] {
            anyhow::ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must be in [0.0, 1.0], got {value}"
            );
        }
        anyhow::ensure!(
            self.retrieval.frequency_band > 0.0,
            "retrieval.frequency_band must be > 0"
        );
        anyhow::ensure!(
            self.retrieval.max_candidates > 0,
            "retrieval.max_candidates must be > 0"
        );
        anyhow::ensure!(
            self.ingestion.max_concurrency > 0,
            "ingestion.max_concurrency must be > 0"
        );
        anyhow::ensure!(self.cache.capacity > 0, "cache.capacity must be > 0");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.answer.confidence_threshold),
            "answer.confidence_threshold must be in [0.0, 1.0]"
        );
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn resolved_manifest_path(&self) -> PathBuf {
        expand_tilde(&self.ingestion.manifest_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ResonantConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.fetch.timeout_secs, 15);
        assert_eq!(config.fetch.max_redirects, 3);
        assert_eq!(config.fetch.allowed_ports, vec![80, 443]);
        assert_eq!(config.retrieval.frequency_band, 30.0);
        assert_eq!(config.retrieval.max_candidates, 500);
        assert_eq!(config.ingestion.max_concurrency, 3);
        assert_eq!(config.answer.confidence_threshold, 0.7);
        assert!(config.storage.db_path.ends_with("index.db"));
        config.validate().unwrap();
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[similarity]
harmonic = 0.6
pattern = 0.2
category = 0.2

[retrieval]
frequency_band = 45.0
"#;
        let config: ResonantConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.similarity.harmonic, 0.6);
        assert_eq!(config.retrieval.frequency_band, 45.0);
        // defaults still apply for unset fields
        assert_eq!(config.retrieval.max_candidates, 500);
        assert_eq!(config.cache.capacity, 1000);
    }

    #[test]
    fn out_of_range_weight_is_rejected() {
        let mut config = ResonantConfig::default();
        config.similarity.pattern = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ResonantConfig::default();
        std::env::set_var("RESONANT_DB", "/tmp/override.db");
        std::env::set_var("RESONANT_MANIFEST", "/tmp/tiers.toml");
        std::env::set_var("RESONANT_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.ingestion.manifest_path, "/tmp/tiers.toml");
        assert_eq!(config.server.log_level, "trace");

        // Clean up
        std::env::remove_var("RESONANT_DB");
        std::env::remove_var("RESONANT_MANIFEST");
        std::env::remove_var("RESONANT_LOG_LEVEL");
    }
}
