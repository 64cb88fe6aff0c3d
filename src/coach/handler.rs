use serde::{Deserialize, Serialize};

use super::client::{extract_text, CoachError, GeminiClient, GenerateRequest, TextGenerator};
use super::prompt::CoachRequest;

/// JSON body returned by the proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoachResponse {
    Text { text: String },
    Error { error: String },
}

/// Status code plus body, as the proxy would answer over HTTP
#[derive(Debug, Clone, PartialEq)]
pub struct CoachReply {
    pub status: u16,
    pub body: CoachResponse,
}

impl CoachReply {
    fn ok(text: String) -> Self {
        Self {
            status: 200,
            body: CoachResponse::Text { text },
        }
    }

    fn error(err: CoachError) -> Self {
        Self {
            status: 500,
            body: CoachResponse::Error {
                error: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.body)
            .unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
    }
}

fn parse_request(body: &str) -> Result<CoachRequest, CoachError> {
    serde_json::from_str(body).map_err(|e| CoachError::InvalidRequest(e.to_string()))
}

fn ask(request: &CoachRequest, generator: &dyn TextGenerator) -> Result<String, CoachError> {
    let prompt = request.build_prompt();
    log::debug!("Coach prompt is {} chars", prompt.chars().count());

    let response = generator.generate(&GenerateRequest::new(prompt))?;
    Ok(extract_text(&response))
}

/// Answer a raw request body with the given generator
pub fn handle_request(body: &str, generator: &dyn TextGenerator) -> CoachReply {
    let result = parse_request(body).and_then(|request| ask(&request, generator));
    match result {
        Ok(text) => CoachReply::ok(text),
        Err(e) => {
            log::error!("Coach request failed: {e}");
            CoachReply::error(e)
        }
    }
}

/// Answer a raw request body using the API key from the environment
///
/// The body is parsed before the key is looked up, so a malformed body is
/// reported even when no key is configured.
pub fn handle_with_env(body: &str, endpoint: Option<String>) -> CoachReply {
    let result = parse_request(body).and_then(|request| {
        let client = GeminiClient::from_env(endpoint)?;
        ask(&request, &client)
    });

    match result {
        Ok(text) => CoachReply::ok(text),
        Err(e) => {
            log::error!("Coach request failed: {e}");
            CoachReply::error(e)
        }
    }
}
