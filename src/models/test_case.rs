//! Routing test case models
//!
//! A test case binds one virtual key to the provider the gateway is expected
//! to route it to, and to the identity markers that prove it did.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::Provider;

/// Characters of a virtual key left visible in logs and reports
const VISIBLE_KEY_PREFIX: usize = 6;

/// Default gateway base URL
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default `max_tokens` sent on the raw HTTP path
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Fixed self-identification prompt
pub const IDENTITY_PROMPT: &str =
    "In one sentence, who are you? What AI assistant/model are you?";

/// Opaque credential presented to the gateway.
///
/// The harness never parses it; only the gateway knows which provider it
/// resolves to. `Debug` and `Display` redact everything past a short prefix.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualKey(String);

impl VirtualKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Full key, for the Authorization header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Short prefix followed by a mask
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(VISIBLE_KEY_PREFIX).collect();
        if self.0.chars().count() <= VISIBLE_KEY_PREFIX {
            "***".to_string()
        } else {
            format!("{prefix}***")
        }
    }
}

impl fmt::Debug for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualKey({})", self.redacted())
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

/// Request/response schema used to reach a provider through the gateway
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// OpenAI-compatible client library, flat `choices` response
    Sdk,
    /// Hand-built HTTP POST, `content` block list response
    RawHttp,
}

impl Transport {
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Sdk => "sdk",
            Transport::RawHttp => "raw-http",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One provider under test
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub virtual_key: VirtualKey,
    pub model_id: String,
    pub expected_provider: String,
    pub expected_markers: BTreeSet<String>,
    pub transport: Transport,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        virtual_key: VirtualKey,
        model_id: impl Into<String>,
        expected_provider: impl Into<String>,
        transport: Transport,
    ) -> Self {
        Self {
            name: name.into(),
            virtual_key,
            model_id: model_id.into(),
            expected_provider: expected_provider.into(),
            expected_markers: BTreeSet::new(),
            transport,
        }
    }

    /// Build a case from a provider profile's defaults
    pub fn for_provider(provider: Provider, virtual_key: VirtualKey) -> Self {
        let case = Self::new(
            provider.id(),
            virtual_key,
            provider.default_model(),
            provider.name(),
            provider.default_transport(),
        );
        provider
            .default_markers()
            .iter()
            .fold(case, |case, marker| case.with_marker(*marker))
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.expected_markers.insert(marker.into());
        self
    }

    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_markers
            .extend(markers.into_iter().map(Into::into));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Copy safe to put in reports
    pub fn redacted(&self) -> Self {
        Self {
            virtual_key: VirtualKey::new(self.virtual_key.redacted()),
            ..self.clone()
        }
    }

    /// Cases exercised when nothing else is configured
    pub fn defaults() -> Vec<TestCase> {
        vec![
            TestCase::for_provider(Provider::DeepSeek, VirtualKey::new("vk_user3_deepseek")),
            TestCase::for_provider(Provider::Anthropic, VirtualKey::new("vk_user2_anthropic")),
        ]
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} via {}, key {})",
            self.name, self.expected_provider, self.transport, self.virtual_key
        )
    }
}

/// Where and how the probes reach the gateway.
///
/// Passed into every probe explicitly so cases stay independent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTarget {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub prompt: String,
    pub accept_invalid_certs: bool,
}

impl GatewayTarget {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt: IDENTITY_PROMPT.to_string(),
            accept_invalid_certs: false,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for GatewayTarget {
    fn default() -> Self {
        Self::new(DEFAULT_GATEWAY_URL)
    }
}
