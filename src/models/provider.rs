//! Provider profiles
//!
//! Defines the upstream LLM providers a gateway can route to, together with
//! the defaults used to build a routing test case for each of them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Transport;

/// Upstream providers known to the harness
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    DeepSeek,
}

impl Provider {
    /// Get provider display name
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::DeepSeek => "DeepSeek",
        }
    }

    /// Get the lowercase identifier used in config files
    pub fn id(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::DeepSeek => "deepseek",
        }
    }

    /// Model requested when a case does not name one
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Anthropic => "claude-3-5-sonnet-20241022",
            Provider::DeepSeek => "deepseek-chat",
        }
    }

    /// Response shape the gateway passes through for this provider
    pub fn default_transport(&self) -> Transport {
        match self {
            Provider::OpenAi | Provider::DeepSeek => Transport::Sdk,
            Provider::Anthropic => Transport::RawHttp,
        }
    }

    /// Substrings an honest self-description from this provider contains
    pub fn default_markers(&self) -> &'static [&'static str] {
        match self {
            Provider::OpenAi => &["openai", "gpt", "chatgpt"],
            Provider::Anthropic => &["claude", "anthropic"],
            Provider::DeepSeek => &["deepseek"],
        }
    }

    /// Get all providers
    pub fn all() -> Vec<Provider> {
        vec![Provider::OpenAi, Provider::Anthropic, Provider::DeepSeek]
    }

    /// Parse from string
    pub fn from_name(s: &str) -> Option<Provider> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open_ai" | "open-ai" => Some(Provider::OpenAi),
            "anthropic" | "claude" => Some(Provider::Anthropic),
            "deepseek" | "deep-seek" => Some(Provider::DeepSeek),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
