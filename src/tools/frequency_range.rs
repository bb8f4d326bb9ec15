use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FrequencyRangeParams {
    #[schemars(description = "Lower bound of the primary frequency band (inclusive)")]
    pub min_freq: f64,

    #[schemars(description = "Upper bound of the primary frequency band (inclusive)")]
    pub max_freq: f64,

    #[schemars(
        description = "Optional category tag filter, e.g. 'emotion:joy' or 'domain:science'"
    )]
    pub category: Option<String>,

    #[schemars(description = "Maximum number of URLs to return. Defaults to 10.")]
    pub limit: Option<usize>,
}
