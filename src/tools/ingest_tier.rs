//! MCP `ingest_tier` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `ingest_tier` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IngestTierParams {
    #[schemars(description = "Tier name from the sources manifest (case-insensitive)")]
    pub tier: String,

    #[schemars(description = "Concurrent fetch workers (default from config, usually 3)")]
    pub max_concurrency: Option<usize>,

    #[schemars(description = "Politeness delay per worker in milliseconds (default from config)")]
    pub delay_ms: Option<u64>,

    #[schemars(description = "Re-fetch sources that are already indexed (default: false)")]
    pub force_reload: Option<bool>,
}
