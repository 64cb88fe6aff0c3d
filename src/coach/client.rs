use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Default generative-language endpoint
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta2/models/gemini-2.5-flash-latest:generateText";

/// Environment variables checked for the API key, in order
pub const API_KEY_VARS: [&str; 3] = ["GOOGLE_API_KEY", "VITE_GOOGLE_API_KEY", "google_api_key"];

const TEMPERATURE: f32 = 0.2;
const MAX_OUTPUT_TOKENS: u32 = 256;

#[derive(Debug, Error)]
pub enum CoachError {
    #[error("Google API key not configured on server")]
    MissingApiKey,
    #[error("invalid request body: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Json(String),
}

impl From<reqwest::Error> for CoachError {
    fn from(err: reqwest::Error) -> Self {
        CoachError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptText {
    pub text: String,
}

/// Body of a text generation call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: PromptText,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: PromptText {
                text: prompt.into(),
            },
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

/// Anything that can turn a prompt into a raw model response
pub trait TextGenerator {
    fn generate(&self, request: &GenerateRequest) -> Result<Value, CoachError>;
}

/// Blocking client for the generative-language HTTP API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(api_key: String, endpoint: Option<String>) -> Result<Self, CoachError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("vitality-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        })
    }

    /// Build a client with the key from the environment
    pub fn from_env(endpoint: Option<String>) -> Result<Self, CoachError> {
        let api_key = resolve_api_key().ok_or(CoachError::MissingApiKey)?;
        Self::new(api_key, endpoint)
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, request: &GenerateRequest) -> Result<Value, CoachError> {
        let res = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()?;

        let status = res.status();
        // Error bodies are not normalized into a `{text}` reply; the caller
        // answers 500 `{error}` for any non-2xx status.
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(CoachError::Http {
                status: status.as_u16(),
                body,
            });
        }

        res.json::<Value>()
            .map_err(|e| CoachError::Json(e.to_string()))
    }
}

/// First non-empty key among [`API_KEY_VARS`], looked up through `lookup`
pub fn resolve_api_key_with<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_VARS
        .iter()
        .filter_map(|name| lookup(*name))
        .find(|key| !key.is_empty())
}

/// First non-empty key among [`API_KEY_VARS`] in the process environment
pub fn resolve_api_key() -> Option<String> {
    resolve_api_key_with(|name| std::env::var(name).ok())
}

fn join_parts(parts: &Value) -> Option<String> {
    let parts = parts.as_array()?;
    Some(
        parts
            .iter()
            .map(|p| p.get("text").and_then(Value::as_str).unwrap_or(""))
            .collect(),
    )
}

/// Pull the reply text out of the response shapes the API has used
///
/// Checked in order: `candidates[0].content[].text`, `candidates[0].output`,
/// `output[0].content[].text`, `result.output_text`, `outputs[0].data.text`.
/// Anything else comes back as the raw JSON.
pub fn extract_text(response: &Value) -> String {
    if let Some(candidate) = response.get("candidates").and_then(|c| c.get(0)) {
        if let Some(content) = candidate.get("content").filter(|c| !c.is_null()) {
            return join_parts(content).unwrap_or_default();
        }
        if let Some(output) = candidate.get("output").and_then(Value::as_str) {
            return output.to_string();
        }
        return String::new();
    }

    if let Some(content) = response
        .get("output")
        .and_then(|o| o.get(0))
        .and_then(|o| o.get("content"))
    {
        if let Some(text) = join_parts(content) {
            return text;
        }
    }

    if let Some(text) = response
        .get("result")
        .and_then(|r| r.get("output_text"))
        .and_then(Value::as_str)
    {
        return text.to_string();
    }

    if let Some(text) = response
        .get("outputs")
        .and_then(|o| o.get(0))
        .and_then(|o| o.get("data"))
        .and_then(|d| d.get("text"))
        .and_then(Value::as_str)
    {
        return text.to_string();
    }

    response.to_string()
}
