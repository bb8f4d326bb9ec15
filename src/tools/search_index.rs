//! MCP `search_index` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `search_index` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchIndexParams {
    /// Free-text query. Encoded into a signature and compared against the index.
    #[schemars(description = "Free-text query to find resonant indexed sources")]
    pub query: String,

    /// Maximum number of results. Defaults to 5.
    #[schemars(description = "Maximum number of results to return (1-50). Defaults to 5.")]
    pub top_n: Option<usize>,

    /// Minimum similarity (0.0–1.0). Defaults to 0.1.
    #[schemars(description = "Minimum similarity score (0.0-1.0). Defaults to 0.1.")]
    pub min_similarity: Option<f64>,
}
