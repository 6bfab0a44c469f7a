//! Test result models for routing validation
//!
//! Defines per-case outcomes, the case state machine, and run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::TestCase;
use crate::error::ProbeError;
use crate::validator::Verdict;

/// Terminal outcome of one test case
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Answer extracted and an identity marker matched
    Passed,
    /// Answer extracted but no identity marker matched
    FailedHeuristic,
    /// Connection, DNS, timeout, or non-200 status
    FailedTransport,
    /// Body was not JSON, or the answer could not be reached in it
    FailedParse,
}

impl Outcome {
    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::Passed => "✓",
            Outcome::FailedHeuristic => "✗",
            Outcome::FailedTransport => "!",
            Outcome::FailedParse => "?",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "PASSED"),
            Outcome::FailedHeuristic => write!(f, "FAILED_HEURISTIC"),
            Outcome::FailedTransport => write!(f, "FAILED_TRANSPORT"),
            Outcome::FailedParse => write!(f, "FAILED_PARSE"),
        }
    }
}

/// Lifecycle of a single test case within one round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseState {
    NotRun,
    Dispatched,
    Succeeded,
    Finished(Outcome),
}

impl CaseState {
    pub fn can_transition_to(&self, next: &CaseState) -> bool {
        matches!(
            (self, next),
            (CaseState::NotRun, CaseState::Dispatched)
                | (CaseState::Dispatched, CaseState::Succeeded)
                | (
                    CaseState::Dispatched,
                    CaseState::Finished(Outcome::FailedTransport | Outcome::FailedParse)
                )
                | (
                    CaseState::Succeeded,
                    CaseState::Finished(Outcome::Passed | Outcome::FailedHeuristic)
                )
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseState::Finished(_))
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseState::NotRun => write!(f, "NOT_RUN"),
            CaseState::Dispatched => write!(f, "DISPATCHED"),
            CaseState::Succeeded => write!(f, "SUCCEEDED"),
            CaseState::Finished(outcome) => write!(f, "{outcome}"),
        }
    }
}

/// Tracks one case through its state machine
#[derive(Debug)]
pub struct CaseProgress {
    case: String,
    state: CaseState,
}

impl CaseProgress {
    pub fn new(case: impl Into<String>) -> Self {
        Self {
            case: case.into(),
            state: CaseState::NotRun,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> CaseState {
        self.state
    }

    pub fn advance(&mut self, next: CaseState) {
        debug_assert!(!self.state.is_terminal(), "{} already finished", self.case);
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {} -> {} for {}",
            self.state,
            next,
            self.case
        );
        debug!("{}: {} -> {}", self.case, self.state, next);
        self.state = next;
    }
}

/// Verdict for one test case
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Case with its virtual key redacted
    pub test_case: TestCase,
    pub raw_text: Option<String>,
    pub passed: bool,
    pub outcome: Outcome,
    pub reason: String,
    /// Error taxonomy class when the probe itself failed
    pub error_kind: Option<String>,
    pub duration_ms: u64,
}

impl ValidationResult {
    /// Answer extracted and checked against the markers
    pub fn validated(
        test_case: &TestCase,
        raw_text: impl Into<String>,
        verdict: &Verdict,
        duration_ms: u64,
    ) -> Self {
        let raw_text = raw_text.into();
        let outcome = if verdict.passed() {
            Outcome::Passed
        } else {
            Outcome::FailedHeuristic
        };
        let passed = outcome.is_success();
        let reason = if raw_text.is_empty() && !verdict.passed() {
            format!("{} in empty response", verdict.reason())
        } else {
            verdict.reason()
        };

        Self {
            test_case: test_case.redacted(),
            raw_text: Some(raw_text),
            passed,
            outcome,
            reason,
            error_kind: if passed {
                None
            } else {
                Some("HeuristicMismatch".to_string())
            },
            duration_ms,
        }
    }

    /// Probe failed before an answer could be validated
    pub fn failed(test_case: &TestCase, error: &ProbeError, duration_ms: u64) -> Self {
        Self {
            test_case: test_case.redacted(),
            raw_text: None,
            passed: error.outcome().is_success(),
            outcome: error.outcome(),
            reason: error.to_string(),
            error_kind: Some(error.kind().to_string()),
            duration_ms,
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] {} ({}ms) - {}",
            self.outcome.symbol(),
            self.test_case.name,
            self.test_case.transport,
            self.outcome,
            self.duration_ms,
            self.reason
        )
    }
}

/// Summary of one pass over all cases
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub round: u32,
    pub gateway_url: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed_heuristic: usize,
    pub failed_transport: usize,
    pub failed_parse: usize,
    pub total_duration_ms: u64,
    pub results: Vec<ValidationResult>,
}

impl RunSummary {
    pub fn new(
        round: u32,
        gateway_url: impl Into<String>,
        started_at: DateTime<Utc>,
        results: Vec<ValidationResult>,
    ) -> Self {
        let count = |outcome: Outcome| results.iter().filter(|r| r.outcome == outcome).count();

        Self {
            round,
            gateway_url: gateway_url.into(),
            started_at,
            total: results.len(),
            passed: count(Outcome::Passed),
            failed_heuristic: count(Outcome::FailedHeuristic),
            failed_transport: count(Outcome::FailedTransport),
            failed_parse: count(Outcome::FailedParse),
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
            results,
        }
    }

    pub fn failed(&self) -> usize {
        self.total - self.passed
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.passed == self.total
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Round {} - {}", self.round, self.gateway_url)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Heuristic: {} | Transport: {} | Parse: {}",
            self.total,
            self.passed,
            self.failed_heuristic,
            self.failed_transport,
            self.failed_parse
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}

/// Verdict stability of one case across rounds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseConsistency {
    pub name: String,
    pub outcomes: Vec<Outcome>,
    pub consistent: bool,
}

/// Whether repeated rounds produced the same verdict per case
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub rounds: usize,
    pub cases: Vec<CaseConsistency>,
}

impl ConsistencyReport {
    pub fn from_summaries(summaries: &[RunSummary]) -> Self {
        let mut cases: Vec<CaseConsistency> = Vec::new();

        for summary in summaries {
            for result in &summary.results {
                match cases.iter_mut().find(|c| c.name == result.test_case.name) {
                    Some(entry) => entry.outcomes.push(result.outcome),
                    None => cases.push(CaseConsistency {
                        name: result.test_case.name.clone(),
                        outcomes: vec![result.outcome],
                        consistent: true,
                    }),
                }
            }
        }

        for case in &mut cases {
            case.consistent = case.outcomes.windows(2).all(|w| w[0] == w[1]);
        }

        Self {
            rounds: summaries.len(),
            cases,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.cases.iter().all(|c| c.consistent)
    }

    pub fn inconsistent(&self) -> impl Iterator<Item = &CaseConsistency> {
        self.cases.iter().filter(|c| !c.consistent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpError;
    use crate::models::{Provider, VirtualKey};
    use crate::response::ExtractionError;

    fn deepseek() -> TestCase {
        TestCase::for_provider(Provider::DeepSeek, VirtualKey::new("vk_user3_deepseek"))
    }

    fn passed(case: &TestCase) -> ValidationResult {
        let verdict = Verdict::Matched {
            marker: "deepseek".to_string(),
        };
        ValidationResult::validated(case, "I am DeepSeek.", &verdict, 40)
    }

    #[test]
    fn test_state_machine_transitions() {
        assert!(CaseState::NotRun.can_transition_to(&CaseState::Dispatched));
        assert!(CaseState::Dispatched.can_transition_to(&CaseState::Succeeded));
        assert!(CaseState::Dispatched
            .can_transition_to(&CaseState::Finished(Outcome::FailedTransport)));
        assert!(CaseState::Succeeded.can_transition_to(&CaseState::Finished(Outcome::Passed)));

        assert!(!CaseState::NotRun.can_transition_to(&CaseState::Succeeded));
        assert!(!CaseState::Dispatched.can_transition_to(&CaseState::Finished(Outcome::Passed)));
        assert!(!CaseState::Succeeded
            .can_transition_to(&CaseState::Finished(Outcome::FailedTransport)));
        assert!(!CaseState::Finished(Outcome::Passed).can_transition_to(&CaseState::Dispatched));
    }

    #[test]
    fn test_case_progress() {
        let mut progress = CaseProgress::new("deepseek");
        assert_eq!(progress.state(), CaseState::NotRun);
        progress.advance(CaseState::Dispatched);
        progress.advance(CaseState::Succeeded);
        progress.advance(CaseState::Finished(Outcome::Passed));
        assert!(progress.state().is_terminal());
    }

    #[test]
    fn test_validated_result() {
        let result = passed(&deepseek());
        assert!(result.passed);
        assert_eq!(result.outcome, Outcome::Passed);
        assert_eq!(result.reason, "found 'deepseek' in response");
        assert_eq!(result.test_case.virtual_key.expose(), "vk_use***");
        assert!(result.error_kind.is_none());
    }

    #[test]
    fn test_heuristic_mismatch_result() {
        let verdict = Verdict::NoMatch {
            tried: vec!["deepseek".to_string()],
        };
        let result = ValidationResult::validated(&deepseek(), "", &verdict, 10);
        assert!(!result.passed);
        assert_eq!(result.outcome, Outcome::FailedHeuristic);
        assert_eq!(result.raw_text.as_deref(), Some(""));
        assert!(result.reason.ends_with("in empty response"));
        assert_eq!(result.error_kind.as_deref(), Some("HeuristicMismatch"));
    }

    #[test]
    fn test_failed_result() {
        let err = ProbeError::Status {
            status: 500,
            body: r#"{"error":"upstream unavailable"}"#.to_string(),
        };
        let result = ValidationResult::failed(&deepseek(), &err, 5);
        assert_eq!(result.outcome, Outcome::FailedTransport);
        assert!(result.raw_text.is_none());
        assert!(result.reason.contains("upstream unavailable"));
        assert_eq!(result.error_kind.as_deref(), Some("ProtocolError"));
    }

    #[test]
    fn test_run_summary() {
        let case = deepseek();
        let results = vec![
            passed(&case),
            ValidationResult::failed(&case, &ProbeError::Transport(HttpError::Timeout(30)), 30_000),
            ValidationResult::failed(
                &case,
                &ProbeError::Extraction(ExtractionError::EmptySequence("choices")),
                12,
            ),
        ];

        let summary = RunSummary::new(1, "http://localhost:8080", Utc::now(), results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed_transport, 1);
        assert_eq!(summary.failed_parse, 1);
        assert_eq!(summary.failed(), 2);
        assert!(!summary.is_all_passed());
        assert_eq!(summary.total_duration_ms, 30_052);
    }

    #[test]
    fn test_consistency_report() {
        let case = deepseek();
        let round = |n: u32, result: ValidationResult| {
            RunSummary::new(n, "http://gw", Utc::now(), vec![result])
        };

        let stable = vec![round(1, passed(&case)), round(2, passed(&case))];
        assert!(ConsistencyReport::from_summaries(&stable).is_consistent());

        let flaky = vec![
            round(1, passed(&case)),
            round(
                2,
                ValidationResult::failed(&case, &ProbeError::Transport(HttpError::Timeout(30)), 1),
            ),
        ];
        let report = ConsistencyReport::from_summaries(&flaky);
        assert!(!report.is_consistent());
        assert_eq!(report.rounds, 2);
        assert_eq!(report.inconsistent().count(), 1);
        assert_eq!(
            report.cases[0].outcomes,
            vec![Outcome::Passed, Outcome::FailedTransport]
        );
    }
}
