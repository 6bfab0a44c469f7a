//! Gateway keys import
//!
//! Reads the gateway's own `keys.json` and turns every virtual key into a
//! routing case for the provider it is mapped to. Upstream API keys in the
//! file are never read into memory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

use crate::models::{Provider, TestCase, VirtualKey};

/// The parts of `keys.json` the harness needs
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GatewayKeys {
    #[serde(default)]
    pub virtual_keys: BTreeMap<String, KeyEntry>,
}

/// One virtual key mapping
#[derive(Clone, Debug, Deserialize)]
pub struct KeyEntry {
    pub provider: String,
}

impl GatewayKeys {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keys file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse keys file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// One case per virtual key, ordered by key.
    ///
    /// Case names are the provider id, suffixed with a counter when several
    /// keys map to the same provider.
    pub fn to_test_cases(&self) -> Vec<TestCase> {
        let mut mapped = Vec::new();
        for (vk, entry) in &self.virtual_keys {
            match Provider::from_name(&entry.provider) {
                Some(provider) => mapped.push((provider, vk)),
                None => warn!(
                    "Skipping key {}: unknown provider '{}'",
                    VirtualKey::new(vk.as_str()),
                    entry.provider
                ),
            }
        }

        let mut totals: HashMap<Provider, usize> = HashMap::new();
        for (provider, _) in &mapped {
            *totals.entry(*provider).or_default() += 1;
        }

        let mut seen: HashMap<Provider, usize> = HashMap::new();
        mapped
            .into_iter()
            .map(|(provider, vk)| {
                let case = TestCase::for_provider(provider, VirtualKey::new(vk.as_str()));
                let n = seen.entry(provider).or_default();
                *n += 1;
                let case = if totals[&provider] > 1 {
                    case.with_name(format!("{}-{}", provider.id(), n))
                } else {
                    case
                };
                debug!("Derived case {}", case);
                case
            })
            .collect()
    }
}
