//! Gemini `generateContent` client.
//!
//! The API key travels as the `key` query parameter, so URLs are only ever
//! logged without their query string.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{GenerationConfig, PersonaConfig};
use crate::error::GenerateError;

/// Safety-rating probabilities treated as the reason for a block.
const BLOCKING_PROBABILITIES: [&str; 2] = ["HIGH", "MEDIUM"];
const MAX_BACKOFF_SECS: u64 = 10;

/// Outcome of a generation call that reached the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Text of the first candidate.
    Text(String),
    /// No candidates; the prompt was rejected by safety filters.
    Blocked { categories: Vec<String> },
    /// No candidates and no feedback, or a candidate without text.
    Empty,
}

/// Anything that can turn a prompt into a completion.
#[async_trait]
pub trait ReplyModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Completion, GenerateError>;
}

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiOptions {
    pub api_base: String,
    pub api_version: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl GeminiOptions {
    pub fn from_config(cfg: &PersonaConfig) -> Self {
        GeminiOptions {
            api_base: cfg.api_base.clone(),
            api_version: cfg.api_version.clone(),
            model: cfg.model.clone(),
            timeout_secs: cfg.request_timeout_secs,
            max_retries: cfg.max_retries,
        }
    }
}

/// A model entry from the catalogue listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
struct SafetyRating {
    category: String,
    #[serde(default)]
    probability: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

impl GenerateResponse {
    fn into_completion(self) -> Completion {
        if let Some(first) = self.candidates.into_iter().next() {
            return first
                .content
                .and_then(|c| c.parts.into_iter().next())
                .and_then(|p| p.text)
                .map(Completion::Text)
                .unwrap_or(Completion::Empty);
        }
        match self.prompt_feedback {
            Some(feedback) if !feedback.safety_ratings.is_empty() => {
                let flagged: Vec<String> = feedback
                    .safety_ratings
                    .iter()
                    .filter(|r| BLOCKING_PROBABILITIES.contains(&r.probability.as_str()))
                    .map(|r| r.category.clone())
                    .collect();
                let categories = if flagged.is_empty() {
                    feedback.safety_ratings.into_iter().map(|r| r.category).collect()
                } else {
                    flagged
                };
                Completion::Blocked { categories }
            }
            _ => Completion::Empty,
        }
    }
}

/// Delay before retry number `attempt` (1-based): 1s, 2s, 4s, ... capped.
fn backoff_secs(attempt: u32) -> u64 {
    1u64.checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX)
        .min(MAX_BACKOFF_SECS)
}

/// HTTP client for the Gemini REST API.
pub struct GeminiClient {
    api_key: String,
    options: GeminiOptions,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, options: GeminiOptions) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(GenerateError::Transport)?;
        Ok(Self {
            api_key: api_key.into(),
            options,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }

    fn base(&self) -> String {
        format!(
            "{}/{}",
            self.options.api_base.trim_end_matches('/'),
            self.options.api_version
        )
    }

    fn generate_url(&self) -> String {
        let model = self
            .options
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.options.model);
        format!("{}/models/{}:generateContent", self.base(), model)
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenerateError {
        if e.is_timeout() {
            GenerateError::Timeout(self.options.timeout_secs)
        } else {
            GenerateError::Transport(e)
        }
    }

    /// Turn a non-success response body into an error, preferring the API's
    /// own `error.message` over the raw body.
    fn http_error(status: reqwest::StatusCode, body: &str) -> GenerateError {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.trim().to_string());
        GenerateError::Http {
            status: status.as_u16(),
            message,
        }
    }

    async fn generate_once(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Completion, GenerateError> {
        let url = self.generate_url();
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: config,
        };

        debug!(url = %url, prompt_chars = prompt.len(), "sending generateContent request");
        let res = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = res.status();
        let text = res.text().await.map_err(|e| self.map_send_error(e))?;
        if !status.is_success() {
            return Err(Self::http_error(status, &text));
        }
        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| GenerateError::Decode(e.to_string()))?;
        Ok(parsed.into_completion())
    }

    /// Generate a completion, retrying transient failures with exponential backoff.
    pub async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Completion, GenerateError> {
        let mut attempt: u32 = 0;
        loop {
            match self.generate_once(prompt, config).await {
                Ok(c) => return Ok(c),
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    attempt += 1;
                    let backoff_secs = backoff_secs(attempt);
                    warn!(
                        attempt,
                        max_retries = self.options.max_retries,
                        backoff_secs,
                        error = %e,
                        "generateContent failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// List models available to this key that support `generateContent`.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, GenerateError> {
        let url = format!("{}/models", self.base());
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .get(&url)
                .query(&[("key", self.api_key.as_str())]);
            if let Some(token) = page_token.as_deref() {
                req = req.query(&[("pageToken", token)]);
            }
            let res = req.send().await.map_err(|e| self.map_send_error(e))?;
            let status = res.status();
            let text = res.text().await.map_err(|e| self.map_send_error(e))?;
            if !status.is_success() {
                return Err(Self::http_error(status, &text));
            }
            let page: ListModelsResponse =
                serde_json::from_str(&text).map_err(|e| GenerateError::Decode(e.to_string()))?;
            out.extend(
                page.models
                    .into_iter()
                    .filter(ModelInfo::supports_generate_content),
            );
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(out)
    }
}

#[async_trait]
impl ReplyModel for GeminiClient {
    async fn complete(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Completion, GenerateError> {
        self.generate(prompt, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Completion {
        serde_json::from_str::<GenerateResponse>(body)
            .unwrap()
            .into_completion()
    }

    #[test]
    fn first_candidate_text_wins() {
        let c = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"yo"},{"text":"ignored"}]}},{"content":{"parts":[{"text":"second"}]}}]}"#,
        );
        assert_eq!(c, Completion::Text("yo".into()));
    }

    #[test]
    fn blocked_lists_high_and_medium_categories() {
        let c = parse(
            r#"{"promptFeedback":{"safetyRatings":[
                {"category":"HARM_CATEGORY_HARASSMENT","probability":"HIGH"},
                {"category":"HARM_CATEGORY_HATE_SPEECH","probability":"NEGLIGIBLE"},
                {"category":"HARM_CATEGORY_DANGEROUS_CONTENT","probability":"MEDIUM"}]}}"#,
        );
        assert_eq!(
            c,
            Completion::Blocked {
                categories: vec![
                    "HARM_CATEGORY_HARASSMENT".into(),
                    "HARM_CATEGORY_DANGEROUS_CONTENT".into()
                ]
            }
        );
    }

    #[test]
    fn no_candidates_no_feedback_is_empty() {
        assert_eq!(parse("{}"), Completion::Empty);
        assert_eq!(parse(r#"{"candidates":[{}]}"#), Completion::Empty);
    }

    #[test]
    fn feedback_without_ratings_is_empty_not_blocked() {
        assert_eq!(parse(r#"{"promptFeedback":{}}"#), Completion::Empty);
        assert_eq!(
            parse(r#"{"promptFeedback":{"safetyRatings":[]}}"#),
            Completion::Empty
        );
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_secs(1), 1);
        assert_eq!(backoff_secs(2), 2);
        assert_eq!(backoff_secs(4), 8);
        assert_eq!(backoff_secs(5), MAX_BACKOFF_SECS);
        assert_eq!(backoff_secs(65), MAX_BACKOFF_SECS);
        assert_eq!(backoff_secs(u32::MAX), MAX_BACKOFF_SECS);
    }

    #[test]
    fn http_error_prefers_api_message() {
        let e = GeminiClient::http_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid"}}"#,
        );
        match e {
            GenerateError::Http { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn model_prefix_is_stripped_from_url() {
        let opts = GeminiOptions {
            api_base: "http://localhost/".into(),
            api_version: "v1".into(),
            model: "models/gemini-1.5-flash".into(),
            timeout_secs: 5,
            max_retries: 0,
        };
        let client = GeminiClient::new("k", opts).unwrap();
        assert_eq!(
            client.generate_url(),
            "http://localhost/v1/models/gemini-1.5-flash:generateContent"
        );
    }
}
