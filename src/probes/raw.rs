//! Raw HTTP probe
//!
//! Posts a chat completion straight to the gateway with the virtual key as a
//! bearer token and unpacks the provider's native content-block response by
//! hand. Used for providers whose native shape is not OpenAI-compatible.

use serde::Serialize;
use tracing::debug;

use super::CHAT_COMPLETIONS_PATH;
use crate::error::ProbeError;
use crate::http::HttpClient;
use crate::models::{GatewayTarget, TestCase, Transport};
use crate::response::GatewayResponse;

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> ChatRequest<'a> {
    /// Single-turn user request
    pub fn single_turn(model: &'a str, prompt: &'a str, max_tokens: u32) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        }
    }
}

pub struct RawHttpProbe {
    client: HttpClient,
    prompt: String,
    max_tokens: u32,
}

impl RawHttpProbe {
    pub fn new(target: &GatewayTarget) -> Result<Self, ProbeError> {
        let client = HttpClient::build(target.timeout_secs, target.accept_invalid_certs)?
            .base_url(target.base());

        Ok(Self {
            client,
            prompt: target.prompt.clone(),
            max_tokens: target.max_tokens,
        })
    }

    /// Send the identity prompt and return the first content block's text
    pub async fn fetch_answer(&self, case: &TestCase) -> Result<String, ProbeError> {
        let payload = ChatRequest::single_turn(&case.model_id, &self.prompt, self.max_tokens);

        let response = self
            .client
            .post_json(CHAT_COMPLETIONS_PATH, case.virtual_key.expose(), &payload)
            .await?;

        debug!(
            "{}: HTTP {} in {}ms",
            case.name, response.status_code, response.duration_ms
        );

        // Anything but 200 is reported with its body; extraction is not attempted
        if !response.is_ok() {
            return Err(ProbeError::Status {
                status: response.status_code,
                body: response.body,
            });
        }

        let body = response
            .json()
            .map_err(|e| ProbeError::MalformedBody(e.to_string()))?;

        let parsed = GatewayResponse::parse(Transport::RawHttp, &body)?;
        debug!("{}: {} response", case.name, parsed.shape());
        Ok(parsed.answer()?)
    }
}
