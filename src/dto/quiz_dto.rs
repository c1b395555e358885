use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The operator's answer. `answer` is any JSON value and is forwarded
/// untouched to `submit_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    pub answer: JsonValue,
    #[serde(default)]
    pub submit_url: String,
    #[serde(default)]
    pub password: String,
}
