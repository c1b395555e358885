use crate::error::SubmissionError;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Response contract of a submission endpoint. An absent or null `url` or
/// `reason` reads as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub correct: bool,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub url: String,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub reason: String,
}

impl Verdict {
    pub fn next_url(&self) -> Option<&str> {
        Some(self.url.as_str()).filter(|url| !url.is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Forwards operator answers to the quiz's own submission endpoint.
#[derive(Clone)]
pub struct SubmissionService {
    client: Client,
}

impl SubmissionService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// POSTs `payload` exactly as given (no envelope) and parses the body as a
    /// [`Verdict`]. The response status is not inspected. One try, no retry.
    pub async fn submit(
        &self,
        url: &str,
        payload: &JsonValue,
    ) -> std::result::Result<Verdict, SubmissionError> {
        let resp = self.client.post(url).json(payload).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!(%url, %status, bytes = body.len(), "Submission endpoint responded");

        let verdict: Verdict = serde_json::from_slice(&body)?;
        Ok(verdict)
    }
}
