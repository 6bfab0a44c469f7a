//! Saved runs
//!
//! `run --save` writes one pretty-printed JSON file per run, named by run id.
//! Virtual keys in saved runs are already redacted.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::models::{ConsistencyReport, RunSummary};
use crate::output::summaries_to_csv;

/// Stored run containing every round
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRun {
    /// Unique run ID
    pub id: String,

    /// Gateway base URL
    pub gateway_url: String,

    /// Timestamp when the first round started
    pub started_at: DateTime<Utc>,

    /// Timestamp when the run was stored
    pub completed_at: DateTime<Utc>,

    /// Number of rounds
    pub rounds: u32,

    /// Round summaries; virtual keys are already redacted
    pub summaries: Vec<RunSummary>,

    /// Verdict stability across rounds
    pub consistency: ConsistencyReport,

    /// Settings the run used
    pub config: RunConfig,

    /// Environment info
    pub environment: EnvironmentInfo,
}

/// Settings recorded with a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub parallel: bool,
    pub concurrency: usize,
}

impl From<&HarnessConfig> for RunConfig {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
            max_tokens: config.max_tokens,
            parallel: config.parallel,
            concurrency: config.max_concurrent,
        }
    }
}

/// Host the run was made from
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    /// Operating system
    pub os: String,

    /// Architecture
    pub arch: String,

    /// Tool version
    pub tool_version: String,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl StoredRun {
    pub fn new(
        summaries: Vec<RunSummary>,
        consistency: ConsistencyReport,
        config: RunConfig,
    ) -> Self {
        let started_at = summaries
            .first()
            .map(|s| s.started_at)
            .unwrap_or_else(Utc::now);
        let gateway_url = summaries
            .first()
            .map(|s| s.gateway_url.clone())
            .unwrap_or_default();

        Self {
            id: generate_run_id(),
            gateway_url,
            started_at,
            completed_at: Utc::now(),
            rounds: summaries.len() as u32,
            summaries,
            consistency,
            config,
            environment: EnvironmentInfo::default(),
        }
    }

    /// Mean pass rate over all rounds
    pub fn pass_rate(&self) -> f64 {
        if self.summaries.is_empty() {
            return 0.0;
        }
        self.summaries.iter().map(|s| s.pass_rate()).sum::<f64>() / self.summaries.len() as f64
    }

    pub fn is_all_passed(&self) -> bool {
        self.summaries.iter().all(|s| s.is_all_passed())
    }
}

/// `YYYYmmdd_HHMMSS_NNNN`, sortable by start time
fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Directory of saved runs
pub struct ResultsStorage {
    base_dir: PathBuf,
}

impl ResultsStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `<data dir>/routecheck/results`, or `./routecheck/results` without one
    pub fn default_dir() -> Self {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("routecheck")
            .join("results");
        Self::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(format!("{run_id}.json"))
    }

    /// Save a run
    pub fn save(&self, run: &StoredRun) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create directory: {}", self.base_dir.display())
        })?;

        let path = self.run_path(&run.id);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), run)
            .with_context(|| format!("Failed to write run {}", run.id))?;

        info!("Saved run {} to {}", run.id, path.display());
        Ok(path)
    }

    /// Load a run by ID
    pub fn load(&self, run_id: &str) -> Result<StoredRun> {
        if run_id.contains(['/', '\\']) || run_id.contains("..") {
            bail!("Invalid run ID: {}", run_id);
        }

        let path = self.run_path(run_id);
        if !path.exists() {
            bail!("No stored run with ID {}", run_id);
        }

        let run = self.load_from_path(&path)?;
        debug!("Loaded run from {}", path.display());
        Ok(run)
    }

    pub fn load_from_path(&self, path: &Path) -> Result<StoredRun> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open results file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse results: {}", path.display()))
    }

    /// List stored runs, newest first
    pub fn list(&self) -> Result<Vec<RunInfo>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if !path.extension().map(|e| e == "json").unwrap_or(false) {
                continue;
            }

            match self.load_from_path(&path) {
                Ok(run) => runs.push(RunInfo {
                    pass_rate: run.pass_rate(),
                    all_passed: run.is_all_passed(),
                    id: run.id,
                    gateway_url: run.gateway_url,
                    started_at: run.started_at,
                    rounds: run.rounds,
                }),
                Err(e) => debug!("Skipping {}: {:#}", path.display(), e),
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    /// Delete a run
    pub fn delete(&self, run_id: &str) -> Result<()> {
        let path = self.run_path(run_id);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Deleted run {}", run_id);
        }
        Ok(())
    }

    /// Export run to a file
    pub fn export(&self, run: &StoredRun, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                serde_json::to_writer_pretty(BufWriter::new(file), run)?;
            }
            ExportFormat::Csv => {
                fs::write(path, summaries_to_csv(&run.summaries)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }

        info!("Exported run {} to {}", run.id, path.display());
        Ok(())
    }
}

/// Brief run information
#[derive(Clone, Debug)]
pub struct RunInfo {
    pub id: String,
    pub gateway_url: String,
    pub started_at: DateTime<Utc>,
    pub rounds: u32,
    pub pass_rate: f64,
    pub all_passed: bool,
}

/// Export format
#[derive(Clone, Copy, Debug)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}
