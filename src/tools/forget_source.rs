use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ForgetSourceParams {
    #[schemars(description = "URL of the indexed source to remove")]
    pub url: String,
}
