//! Parallel test execution
//!
//! Cases share no state and each owns its client, so they can run
//! concurrently. Results are still reported in definition order.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::models::{ConsistencyReport, GatewayTarget, RunSummary, TestCase};
use crate::probes;

/// Parallel test executor
pub struct ParallelExecutor {
    max_concurrent: usize,
}

impl ParallelExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    #[cfg(test)]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run all cases concurrently for one round
    pub async fn run_round(
        &self,
        target: &GatewayTarget,
        cases: &[TestCase],
        round: u32,
    ) -> Result<RunSummary> {
        info!(
            "Starting round {} against {} ({} case(s), up to {} at once)",
            round,
            target.base(),
            cases.len(),
            self.max_concurrent
        );

        let started_at = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(cases.len());

        for case in cases.iter().cloned() {
            let semaphore = semaphore.clone();
            let target = target.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .context("Concurrency limiter closed")?;
                debug!("Starting parallel execution of {}", case.name);
                Ok::<_, anyhow::Error>(probes::run_case(&case, &target).await)
            }));
        }

        // join_all preserves spawn order, which is definition order
        let mut results = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            results.push(joined.context("Probe task panicked")??);
        }

        let summary = RunSummary::new(round, target.base(), started_at, results);

        info!(
            "Round {} completed: {}/{} passed ({:.1}%)",
            round,
            summary.passed,
            summary.total,
            summary.pass_rate()
        );

        Ok(summary)
    }

    /// Run multiple parallel rounds and compare verdicts across them
    pub async fn run_rounds(
        &self,
        target: &GatewayTarget,
        cases: &[TestCase],
        num_rounds: u32,
    ) -> Result<(Vec<RunSummary>, ConsistencyReport)> {
        let mut summaries = Vec::new();
        for round in 1..=num_rounds {
            summaries.push(self.run_round(target, cases, round).await?);
        }

        let report = ConsistencyReport::from_summaries(&summaries);
        Ok((summaries, report))
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(4)
    }
}
