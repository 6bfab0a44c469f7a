//! Configuration module
//!
//! Handles loading and managing configuration. Precedence is CLI flags,
//! then `ROUTECHECK_*` environment variables, then the config file, then
//! built-in defaults.

pub mod env;
pub mod file;
pub mod keys;

pub use env::EnvConfig;
pub use file::ConfigFile;
pub use keys::GatewayKeys;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{
    GatewayTarget, Provider, TestCase, Transport, VirtualKey, DEFAULT_GATEWAY_URL,
    DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT_SECS, IDENTITY_PROMPT,
};

/// Harness settings shared by every case in a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Gateway base URL
    pub gateway_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// max_tokens sent on the raw HTTP path
    pub max_tokens: u32,

    /// Self-identification prompt
    pub prompt: String,

    /// Run cases concurrently
    pub parallel: bool,

    /// Maximum concurrent cases in parallel mode
    pub max_concurrent: usize,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,

    /// Gateway keys.json to derive cases from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys_file: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt: IDENTITY_PROMPT.to_string(),
            parallel: false,
            max_concurrent: 4,
            accept_invalid_certs: false,
            keys_file: None,
        }
    }
}

impl HarnessConfig {
    /// Apply environment overrides on top of file values
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(url) = &env.gateway_url {
            self.gateway_url = url.clone();
        }
        if let Some(timeout) = env.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(max_tokens) = env.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(parallel) = env.parallel {
            self.parallel = parallel;
        }
        if let Some(keys_file) = &env.keys_file {
            self.keys_file = Some(keys_file.clone());
        }
    }

    /// Check the settings a run cannot start without
    pub fn validate(&self) -> Result<()> {
        let url = self.gateway_url.trim();
        if url.is_empty() {
            bail!("Gateway URL is empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("Gateway URL must start with http:// or https://: {}", url);
        }
        if self.timeout_secs == 0 {
            bail!("Timeout must be at least 1 second");
        }
        Ok(())
    }

    pub fn to_target(&self) -> GatewayTarget {
        GatewayTarget::new(self.gateway_url.trim())
            .with_timeout(self.timeout_secs)
            .with_max_tokens(self.max_tokens)
            .with_prompt(self.prompt.clone())
            .accept_invalid_certs(self.accept_invalid_certs)
    }
}

/// A case as written in the config file.
///
/// Known providers fill in model, transport and markers from their profile;
/// anything given explicitly wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub virtual_key: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<String>,
}

impl TestCaseConfig {
    pub fn to_test_case(&self) -> Result<TestCase> {
        let key = VirtualKey::new(self.virtual_key.trim());
        if key.is_empty() {
            bail!("Case for provider '{}' has no virtual key", self.provider);
        }

        let mut case = match Provider::from_name(&self.provider) {
            Some(provider) => TestCase::for_provider(provider, key),
            None => {
                let Some(model) = &self.model else {
                    bail!(
                        "Case for unknown provider '{}' needs an explicit model",
                        self.provider
                    );
                };
                TestCase::new(
                    self.provider.to_lowercase(),
                    key,
                    model,
                    &self.provider,
                    self.transport.unwrap_or(Transport::Sdk),
                )
            }
        };

        if let Some(name) = &self.name {
            case = case.with_name(name);
        }
        if let Some(model) = &self.model {
            case = case.with_model(model);
        }
        if let Some(transport) = self.transport {
            case = case.with_transport(transport);
        }
        if !self.markers.is_empty() {
            case.expected_markers = BTreeSet::new();
            case = case.with_markers(self.markers.iter().map(|m| m.trim().to_lowercase()));
        }

        if !case.expected_markers.iter().any(|m| !m.trim().is_empty()) {
            bail!("Case '{}' has no expected markers", case.name);
        }
        Ok(case)
    }
}

impl From<&TestCase> for TestCaseConfig {
    fn from(case: &TestCase) -> Self {
        Self {
            name: Some(case.name.clone()),
            virtual_key: case.virtual_key.expose().to_string(),
            provider: case.expected_provider.to_lowercase(),
            model: Some(case.model_id.clone()),
            transport: Some(case.transport),
            markers: case.expected_markers.iter().cloned().collect(),
        }
    }
}

/// Cases for a run: a keys file wins, then the config file's cases, then
/// the built-in defaults
pub fn resolve_cases(config: &ConfigFile, keys_file: Option<&str>) -> Result<Vec<TestCase>> {
    let cases = if let Some(path) = keys_file {
        let cases = GatewayKeys::load(file::expand_path(path))?.to_test_cases();
        if cases.is_empty() {
            bail!("No usable virtual keys in {}", path);
        }
        cases
    } else if !config.cases.is_empty() {
        config.test_cases()?
    } else {
        TestCase::defaults()
    };

    ensure_unique_names(&cases)?;
    Ok(cases)
}

/// Reject duplicate case names, compared case-insensitively
pub fn ensure_unique_names(cases: &[TestCase]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for case in cases {
        if !seen.insert(case.name.to_lowercase()) {
            bail!("Duplicate case name: {}", case.name);
        }
    }
    Ok(())
}

/// Keep only the named cases, in definition order
pub fn select_cases(cases: Vec<TestCase>, names: &[String]) -> Result<Vec<TestCase>> {
    if names.is_empty() {
        return Ok(cases);
    }

    let wanted: BTreeSet<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
    let known: BTreeSet<String> = cases.iter().map(|c| c.name.to_lowercase()).collect();

    let unknown: Vec<&String> = wanted.iter().filter(|n| !known.contains(*n)).collect();
    if !unknown.is_empty() {
        let valid: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
        bail!(
            "Unknown case(s): {}. Valid names: {}",
            unknown
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            valid.join(", ")
        );
    }

    Ok(cases
        .into_iter()
        .filter(|c| wanted.contains(&c.name.to_lowercase()))
        .collect())
}
