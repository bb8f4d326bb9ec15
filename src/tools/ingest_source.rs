//! MCP `ingest_source` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `ingest_source` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IngestSourceParams {
    /// URL to fetch and index. Must be public http(s) on port 80 or 443.
    #[schemars(description = "URL to fetch and index (public http/https, port 80 or 443)")]
    pub url: String,

    #[schemars(description = "Human-readable name for the source")]
    pub name: String,

    #[schemars(description = "Optional description of the source")]
    pub description: Option<String>,

    /// Lower numbers run first in batches. Defaults to 5.
    #[schemars(description = "Priority (lower runs first in batches). Defaults to 5.")]
    pub priority: Option<u32>,

    #[schemars(description = "Re-fetch and overwrite even if the URL is already indexed (default: false)")]
    pub force_reload: Option<bool>,
}
