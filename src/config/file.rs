//! routecheck.yaml / routecheck.json
//!
//! Harness settings sit at the top level of the file next to an optional
//! `cases` list. Every load is validated before it is returned.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ensure_unique_names, HarnessConfig, TestCaseConfig};
use crate::models::TestCase;

/// Searched in order when no `--config` is given
const CONFIG_LOCATIONS: &[&str] = &[
    "./routecheck.yaml",
    "./routecheck.yml",
    "./.routecheck.yaml",
    "~/.config/routecheck/config.yaml",
];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_version")]
    pub version: String,

    /// Harness settings, written at the top level of the file
    #[serde(flatten)]
    pub settings: HarnessConfig,

    /// Cases to run; empty means the built-in defaults
    #[serde(default)]
    pub cases: Vec<TestCaseConfig>,
}

fn default_version() -> String {
    SUPPORTED_VERSIONS[0].to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            settings: HarnessConfig::default(),
            cases: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// First existing file among the search locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load the first file found, or built-in defaults when there is none
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path, or fall back to the standard locations
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load(expand_path(p)),
            None => Self::load_default(),
        }
    }

    /// Read, parse by extension, and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content, is_yaml_file(path))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        debug!(
            "Loaded {} ({} case(s))",
            path.display(),
            config.cases.len()
        );
        Ok(config)
    }

    fn parse(content: &str, yaml: bool) -> Result<Self> {
        Ok(if yaml {
            serde_yaml::from_str(content)?
        } else {
            serde_json::from_str(content)?
        })
    }

    /// Write as YAML or JSON by extension, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Version, settings, every case, and unique case names
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            anyhow::bail!(
                "Unsupported config version {} (supported: {})",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            );
        }

        self.settings.validate()?;
        ensure_unique_names(&self.test_cases()?)?;
        Ok(())
    }

    /// Cases declared in the file, in file order
    pub fn test_cases(&self) -> Result<Vec<TestCase>> {
        self.cases
            .iter()
            .enumerate()
            .map(|(i, c)| {
                c.to_test_case()
                    .with_context(|| format!("Invalid case #{} in config", i + 1))
            })
            .collect()
    }

    /// Starter file written by `config init`: defaults plus the built-in cases
    pub fn example() -> Self {
        Self {
            version: default_version(),
            settings: HarnessConfig::default(),
            cases: TestCase::defaults().iter().map(TestCaseConfig::from).collect(),
        }
    }
}

/// `~/x` becomes `$HOME/x`; anything else is taken as is
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn is_yaml_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}
