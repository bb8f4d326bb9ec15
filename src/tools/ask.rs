use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    #[schemars(description = "Question to answer from the index and configured web sources")]
    pub query: String,

    #[schemars(description = "Earlier conversation turns, oldest first (optional)")]
    pub history: Option<Vec<String>>,

    #[schemars(description = "Skip the answer cache for this request (default: false)")]
    pub bypass_cache: Option<bool>,
}
