//! Generative-text client
//!
//! Sends the itinerary prompt to the Gemini `generateContent` endpoint and
//! returns the raw text of the first candidate. The text is not parsed here;
//! truncated or fenced output is the recovery stage's concern.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::upstream::{UpstreamError, UpstreamKind};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const SERVICE: &str = "gemini";
const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Something that turns a prompt into free-form text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate
///
/// A `MAX_TOKENS` finish reason is not an error: the partial text is
/// returned for the recovery stage to salvage.
fn candidate_text(response: GenerateContentResponse) -> Result<String, UpstreamError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(UpstreamError::new(
            UpstreamKind::Configuration,
            SERVICE,
            format!("prompt blocked: {}", reason),
        ));
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        UpstreamError::new(UpstreamKind::Network, SERVICE, "response had no candidates")
    })?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        debug!(finish_reason = %reason, "Gemini candidate finished");
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(UpstreamError::new(
            UpstreamKind::Network,
            SERVICE,
            "candidate contained no text",
        ));
    }

    Ok(text)
}

/// Gemini REST client
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// A missing API key is reported when `generate` is called, not here,
    /// so the service can start and serve `/health` without one.
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::new(UpstreamKind::Network, SERVICE, e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            UpstreamError::new(
                UpstreamKind::Configuration,
                SERVICE,
                "Gemini API key not configured",
            )
        })?;

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
                "responseMimeType": "application/json",
            }
        });

        debug!(model = %self.model, prompt_len = prompt.len(), "Requesting itinerary text");

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    UpstreamError::new(UpstreamKind::Network, SERVICE, e.to_string())
                } else {
                    UpstreamError::classified(SERVICE, e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_response(
                SERVICE,
                status.as_u16(),
                &error_text,
            ));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::new(UpstreamKind::Network, SERVICE, e.to_string()))?;

        let text = candidate_text(parsed)?;
        debug!(text_len = text.len(), "Received itinerary text");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> GenerateContentResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"days\":"},{"text":"[]}"}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(candidate_text(response).unwrap(), r#"{"days":[]}"#);
    }

    #[test]
    fn test_truncated_candidate_still_returned() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"days\":[{"}]},"finishReason":"MAX_TOKENS"}]}"#,
        );
        assert_eq!(candidate_text(response).unwrap(), r#"{"days":[{"#);
    }

    #[test]
    fn test_no_candidates_is_network_error() {
        let err = candidate_text(parse(r#"{"candidates":[]}"#)).unwrap_err();
        assert_eq!(err.kind, UpstreamKind::Network);
    }

    #[test]
    fn test_blocked_prompt_is_configuration_error() {
        let err = candidate_text(parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#))
            .unwrap_err();
        assert_eq!(err.kind, UpstreamKind::Configuration);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn test_endpoint_uses_model_and_base_url() {
        let client = GeminiClient::new(None, "gemini-test", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9999/v1/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1/models/gemini-test:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let client =
            GeminiClient::new(Some("  ".to_string()), "gemini-test", Duration::from_secs(5))
                .unwrap();
        assert!(!client.has_api_key());

        let err = client.generate("plan a trip").await.unwrap_err();
        assert_eq!(err.kind, UpstreamKind::Configuration);
    }
}
