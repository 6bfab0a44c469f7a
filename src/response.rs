//! Gateway response normalization
//!
//! The gateway passes each provider's native response through untouched, so
//! the answer text lives in a different place depending on the transport:
//!
//! - FlatChoice (OpenAI-compatible): `choices[0].message.content`
//! - ContentBlocks (Anthropic-style): `content[0].text`
//!
//! The transport is known when the test case is built, so parsing is
//! dispatched on it rather than guessed from the payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::Transport;

/// Answer text could not be reached in an otherwise valid JSON response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("response has no top-level '{0}' field")]
    MissingField(&'static str),

    #[error("top-level '{0}' field is not a sequence")]
    NotASequence(&'static str),

    #[error("'{0}' sequence is empty")]
    EmptySequence(&'static str),

    #[error("first choice carries no message content")]
    MissingContent,

    #[error("unexpected element shape in '{field}': {detail}")]
    Malformed { field: &'static str, detail: String },
}

/// A way to reach the first assistant utterance of a response
pub trait FirstUtterance {
    fn first_utterance(&self) -> Result<String, ExtractionError>;
}

/// OpenAI-compatible response shape
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatChoice {
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl FlatChoice {
    pub fn from_contents<I>(contents: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        Self {
            choices: contents
                .into_iter()
                .map(|content| Choice {
                    message: ChoiceMessage { content },
                })
                .collect(),
        }
    }
}

impl FirstUtterance for FlatChoice {
    fn first_utterance(&self) -> Result<String, ExtractionError> {
        let first = self
            .choices
            .first()
            .ok_or(ExtractionError::EmptySequence("choices"))?;

        first
            .message
            .content
            .clone()
            .ok_or(ExtractionError::MissingContent)
    }
}

/// Anthropic-style response shape
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlocks {
    pub content: Vec<ContentBlock>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl FirstUtterance for ContentBlocks {
    fn first_utterance(&self) -> Result<String, ExtractionError> {
        let first = self
            .content
            .first()
            .ok_or(ExtractionError::EmptySequence("content"))?;

        // A block without text is an empty answer, not a failed extraction
        Ok(first.text.clone().unwrap_or_default())
    }
}

/// Transport-shaped gateway payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayResponse {
    FlatChoice(FlatChoice),
    ContentBlocks(ContentBlocks),
}

impl GatewayResponse {
    /// Parse a decoded body into the shape expected for `transport`
    pub fn parse(transport: Transport, body: &Value) -> Result<Self, ExtractionError> {
        match transport {
            Transport::Sdk => {
                let choices = top_level_sequence(body, "choices")?;
                let parsed = serde_json::from_value(Value::Array(choices.clone())).map_err(
                    |e| ExtractionError::Malformed {
                        field: "choices",
                        detail: e.to_string(),
                    },
                )?;
                Ok(GatewayResponse::FlatChoice(FlatChoice { choices: parsed }))
            }
            Transport::RawHttp => {
                let content = top_level_sequence(body, "content")?;
                let parsed = serde_json::from_value(Value::Array(content.clone())).map_err(
                    |e| ExtractionError::Malformed {
                        field: "content",
                        detail: e.to_string(),
                    },
                )?;
                Ok(GatewayResponse::ContentBlocks(ContentBlocks { content: parsed }))
            }
        }
    }

    /// Extracted answer text
    pub fn answer(&self) -> Result<String, ExtractionError> {
        self.first_utterance()
    }

    pub fn shape(&self) -> &'static str {
        match self {
            GatewayResponse::FlatChoice(_) => "flat-choice",
            GatewayResponse::ContentBlocks(_) => "content-blocks",
        }
    }
}

impl FirstUtterance for GatewayResponse {
    fn first_utterance(&self) -> Result<String, ExtractionError> {
        match self {
            GatewayResponse::FlatChoice(inner) => inner.first_utterance(),
            GatewayResponse::ContentBlocks(inner) => inner.first_utterance(),
        }
    }
}

impl From<FlatChoice> for GatewayResponse {
    fn from(value: FlatChoice) -> Self {
        GatewayResponse::FlatChoice(value)
    }
}

impl From<ContentBlocks> for GatewayResponse {
    fn from(value: ContentBlocks) -> Self {
        GatewayResponse::ContentBlocks(value)
    }
}

fn top_level_sequence<'a>(
    body: &'a Value,
    field: &'static str,
) -> Result<&'a Vec<Value>, ExtractionError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ExtractionError::MissingField(field)),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ExtractionError::NotASequence(field)),
    }
}
