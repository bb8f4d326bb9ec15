//! Ingestion requests and the tier manifest they are loaded from.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_priority() -> u32 {
    5
}

/// A request to learn from one URL. Lower `priority` is processed first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

impl Source {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            description: String::new(),
            priority: default_priority(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A named group of sources processed together.
#[derive(Debug, Clone, Deserialize)]
pub struct Tier {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Curated source lists, kept out of code in a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "tier")]
    pub tiers: Vec<Tier>,
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(contents)?;
        for tier in &manifest.tiers {
            if tier.name.trim().is_empty() {
                bail!("tier with empty name");
            }
            if let Some(source) = tier.sources.iter().find(|s| s.url.trim().is_empty()) {
                bail!("tier '{}' has a source with an empty url ({})", tier.name, source.name);
            }
        }
        Ok(manifest)
    }

    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name.as_str()).collect()
    }

    /// Every source in every tier, in manifest order.
    pub fn all_sources(&self) -> Vec<Source> {
        self.tiers.iter().flat_map(|t| t.sources.iter().cloned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[[tier]]
name = "foundations"
description = "Core reference material"

[[tier.sources]]
url = "https://en.wikipedia.org/wiki/Resonance"
name = "Resonance"
priority = 1

[[tier.sources]]
url = "https://en.wikipedia.org/wiki/Golden_ratio"
name = "Golden ratio"
description = "phi"

[[tier]]
name = "news"
"#;

    #[test]
    fn test_parse_tiers_and_defaults() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.tier_names(), vec!["foundations", "news"]);

        let foundations = manifest.tier("Foundations").unwrap();
        assert_eq!(foundations.sources.len(), 2);
        assert_eq!(foundations.sources[0].priority, 1);
        assert_eq!(foundations.sources[1].priority, 5);
        assert_eq!(foundations.sources[1].description, "phi");

        assert!(manifest.tier("news").unwrap().sources.is_empty());
        assert!(manifest.tier("missing").is_none());
        assert_eq!(manifest.all_sources().len(), 2);
    }

    #[test]
    fn test_empty_url_rejected() {
        let bad = r#"
[[tier]]
name = "broken"
[[tier.sources]]
url = ""
name = "nothing"
"#;
        assert!(Manifest::parse(bad).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.toml");
        std::fs::write(&path, MANIFEST).unwrap();
        assert_eq!(Manifest::load(&path).unwrap().tiers.len(), 2);
        assert!(Manifest::load(dir.path().join("absent.toml")).is_err());
    }
}
