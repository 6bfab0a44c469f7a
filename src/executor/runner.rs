//! Test execution runner
//!
//! Runs routing cases one after another against a single gateway.

use chrono::Utc;
use tracing::{info, warn};

use crate::models::{ConsistencyReport, GatewayTarget, RunSummary, TestCase, ValidationResult};
use crate::probes;
use crate::utils::timer::Timer;

/// Sequential runner: each case finishes before the next is dispatched
pub struct TestRunner {
    target: GatewayTarget,
    cases: Vec<TestCase>,
}

impl TestRunner {
    /// Create a new test runner
    pub fn new(target: GatewayTarget, cases: Vec<TestCase>) -> Self {
        Self { target, cases }
    }

    /// Run a single test case
    pub async fn run_case(&self, case: &TestCase) -> ValidationResult {
        probes::run_case(case, &self.target).await
    }

    async fn run_round(&self, round: u32) -> RunSummary {
        info!(
            "Starting round {} against {} ({} case(s))",
            round,
            self.target.base(),
            self.cases.len()
        );

        let started_at = Utc::now();
        let timer = Timer::start(format!("round {round}"));
        let mut results = Vec::with_capacity(self.cases.len());

        for case in &self.cases {
            results.push(self.run_case(case).await);
        }

        let summary = RunSummary::new(round, self.target.base(), started_at, results);

        info!(
            "Round {} completed in {}ms - Pass: {}/{} ({:.1}%)",
            round,
            timer.elapsed_ms(),
            summary.passed,
            summary.total,
            summary.pass_rate()
        );

        summary
    }

    /// Run every case `num_rounds` times and compare verdicts across rounds
    pub async fn run_rounds(&self, num_rounds: u32) -> (Vec<RunSummary>, ConsistencyReport) {
        info!("Running {} rounds against {}", num_rounds, self.target.base());

        let mut summaries = Vec::new();
        for round in 1..=num_rounds {
            info!("=== Round {}/{} ===", round, num_rounds);
            summaries.push(self.run_round(round).await);
        }

        let report = ConsistencyReport::from_summaries(&summaries);
        if report.is_consistent() {
            info!("Verdicts identical across {} round(s)", num_rounds);
        }
        for case in report.inconsistent() {
            warn!("Verdict for {} changed between rounds: {:?}", case.name, case.outcomes);
        }

        (summaries, report)
    }
}
