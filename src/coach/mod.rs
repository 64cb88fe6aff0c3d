//! Chat coach proxy.
//!
//! Accepts `{messages, userText, stats, userName}`, builds the coach prompt,
//! forwards it to the generative-language API with a server-held key and
//! answers `{text}` or `{error}`.

mod client;
mod handler;
mod prompt;

pub use client::{
    extract_text, resolve_api_key, resolve_api_key_with, CoachError, GeminiClient,
    GenerateRequest, TextGenerator, API_KEY_VARS, DEFAULT_ENDPOINT,
};
pub use handler::{handle_request, handle_with_env, CoachReply, CoachResponse};
pub use prompt::{ChatMessage, CoachRequest};
