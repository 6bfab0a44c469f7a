//! Output formatters for routing results
//!
//! Provides Table, JSON, CSV and one-line summary formats.

use serde::Serialize;

use crate::models::{ConsistencyReport, Outcome, RunSummary, ValidationResult};

/// Response text shown per case in table output
const DEFAULT_TEXT_WIDTH: usize = 60;

const RULE: &str = "══════════════════════════════════════════════════════════════════════";

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Serialized shape of a multi-round run
#[derive(Serialize)]
struct RunReport<'a> {
    rounds: &'a [RunSummary],
    consistency: &'a ConsistencyReport,
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
    text_width: usize,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
            text_width: DEFAULT_TEXT_WIDTH,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn paint(&self, outcome: Outcome, text: &str) -> String {
        if !self.colorize {
            return text.to_string();
        }
        let code = match outcome {
            Outcome::Passed => "32",
            Outcome::FailedHeuristic => "33",
            Outcome::FailedTransport | Outcome::FailedParse => "31",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn format_result_table(&self, result: &ValidationResult) -> String {
        let status = self.paint(
            result.outcome,
            &format!("{} {:16}", result.outcome.symbol(), result.outcome.to_string()),
        );

        let mut line = format!(
            "  {} {:14} {:10} {:8} [{:>6}ms]\n      {}\n",
            status,
            result.test_case.name,
            result.test_case.expected_provider,
            result.test_case.transport.name(),
            result.duration_ms,
            result.reason
        );
        if let Some(text) = &result.raw_text {
            line.push_str(&format!(
                "      > \"{}\"\n",
                truncate(text, self.text_width)
            ));
        }
        line
    }

    /// Format one round
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Csv => summaries_to_csv(std::slice::from_ref(summary)).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{RULE}\n"));
        output.push_str(&format!(
            " Round {} - {} ({})\n",
            summary.round,
            summary.gateway_url,
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!("{RULE}\n"));

        for result in &summary.results {
            output.push_str(&self.format_result_table(result));
        }

        output.push_str(&format!("{RULE}\n"));

        let passed = if self.colorize {
            self.paint(Outcome::Passed, &summary.passed.to_string())
        } else {
            summary.passed.to_string()
        };
        let failed = if self.colorize && summary.failed() > 0 {
            self.paint(Outcome::FailedTransport, &summary.failed().to_string())
        } else {
            summary.failed().to_string()
        };

        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} (heuristic {}, transport {}, parse {})\n",
            summary.total,
            passed,
            failed,
            summary.failed_heuristic,
            summary.failed_transport,
            summary.failed_parse
        ));
        output.push_str(&format!(
            " Pass Rate: {:5.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));
        output.push_str(&format!("{RULE}\n"));

        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{} - Round {}: {}/{} passed ({:.1}%) in {}ms",
            summary.gateway_url,
            summary.round,
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.total_duration_ms
        )
    }

    /// Format verdict stability across rounds
    pub fn format_consistency(&self, report: &ConsistencyReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(report).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(report).unwrap_or_default(),
            _ => self.format_consistency_table(report),
        }
    }

    fn format_consistency_table(&self, report: &ConsistencyReport) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "\n Consistency across {} round(s):\n",
            report.rounds
        ));

        for case in &report.cases {
            let history: Vec<&str> = case.outcomes.iter().map(|o| o.symbol()).collect();
            let verdict = match (case.consistent, case.outcomes.first()) {
                (true, Some(outcome)) => self.paint(*outcome, "stable"),
                _ => self.paint(Outcome::FailedHeuristic, "CHANGED"),
            };
            output.push_str(&format!(
                "   {:14} {} {}\n",
                case.name,
                history.join(" "),
                verdict
            ));
        }

        output
    }

    /// Format a whole run: every round plus, for several rounds, consistency
    pub fn format_run(&self, summaries: &[RunSummary], report: &ConsistencyReport) -> String {
        let multi = summaries.len() > 1;
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty if multi => {
                let run = RunReport {
                    rounds: summaries,
                    consistency: report,
                };
                if self.format == OutputFormat::JsonPretty {
                    serde_json::to_string_pretty(&run).unwrap_or_default()
                } else {
                    serde_json::to_string(&run).unwrap_or_default()
                }
            }
            OutputFormat::Csv => summaries_to_csv(summaries).unwrap_or_default(),
            _ => {
                let mut parts: Vec<String> =
                    summaries.iter().map(|s| self.format_summary(s)).collect();
                if multi {
                    parts.push(self.format_consistency(report));
                }
                parts.join("\n")
            }
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// CSV with one row per case per round
pub fn summaries_to_csv(summaries: &[RunSummary]) -> anyhow::Result<String> {
    let mut output = String::new();
    for (i, summary) in summaries.iter().enumerate() {
        output.push_str(&csv_rows(&summary.results, summary.round, i == 0)?);
    }
    Ok(output)
}

fn csv_rows(results: &[ValidationResult], round: u32, header: bool) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    if header {
        writer.write_record([
            "round",
            "name",
            "provider",
            "model",
            "transport",
            "outcome",
            "passed",
            "duration_ms",
            "error_kind",
            "reason",
            "response",
        ])?;
    }

    for r in results {
        writer.write_record([
            round.to_string(),
            r.test_case.name.clone(),
            r.test_case.expected_provider.clone(),
            r.test_case.model_id.clone(),
            r.test_case.transport.to_string(),
            r.outcome.to_string(),
            r.passed.to_string(),
            r.duration_ms.to_string(),
            r.error_kind.clone().unwrap_or_default(),
            r.reason.clone(),
            r.raw_text.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Single-line preview of a response, cut at `width` characters
pub fn truncate(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= width {
        flat
    } else {
        let cut: String = flat.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::http::HttpError;
    use crate::models::{Provider, TestCase, VirtualKey};
    use crate::validator::IdentityValidator;
    use chrono::Utc;

    fn sample_summary() -> RunSummary {
        let case = TestCase::for_provider(Provider::Anthropic, VirtualKey::new("vk_user2_anthropic"));
        let text = "I am Claude, an AI assistant made by Anthropic.";
        let verdict = IdentityValidator::new(&case.expected_markers).validate(text);
        let passed = ValidationResult::validated(&case, text, &verdict, 120);

        let other = TestCase::for_provider(Provider::DeepSeek, VirtualKey::new("vk_user3_deepseek"));
        let failed = ValidationResult::failed(
            &other,
            &ProbeError::Transport(HttpError::ConnectionRefused("http://localhost:8080".into())),
            3,
        );

        RunSummary::new(1, "http://localhost:8080", Utc::now(), vec![passed, failed])
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("TABLE"), Some(OutputFormat::Table));
        assert_eq!(
            OutputFormat::from_str("json-pretty"),
            Some(OutputFormat::JsonPretty)
        );
        assert_eq!(OutputFormat::from_str("unknown"), None);
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = ResultFormatter::new(OutputFormat::Json).no_color();
        assert_eq!(formatter.format, OutputFormat::Json);
        assert!(!formatter.colorize);
    }

    #[test]
    fn test_table_output() {
        let output = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_summary(&sample_summary());

        assert!(output.contains("PASSED"));
        assert!(output.contains("FAILED_TRANSPORT"));
        assert!(output.contains("I am Claude"));
        assert!(output.contains("Pass Rate:  50.0%"));
        assert!(!output.contains("\x1b["));
        assert!(!output.contains("vk_user2_anthropic"));
    }

    #[test]
    fn test_json_output_keeps_full_text() {
        let output = ResultFormatter::new(OutputFormat::Json).format_summary(&sample_summary());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["total"], 2);
        assert_eq!(
            value["results"][0]["raw_text"],
            "I am Claude, an AI assistant made by Anthropic."
        );
        assert_eq!(value["results"][1]["outcome"], "failed_transport");
    }

    #[test]
    fn test_csv_output() {
        let output = ResultFormatter::new(OutputFormat::Csv).format_summary(&sample_summary());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("round,name,provider"));
        assert!(lines[1].starts_with("1,anthropic,Anthropic"));
        assert!(lines[1].contains("\"I am Claude, an AI assistant made by Anthropic.\""));
        assert!(lines[2].contains("TransportError"));
    }

    #[test]
    fn test_multi_round_json() {
        let summaries = vec![sample_summary(), sample_summary()];
        let report = ConsistencyReport::from_summaries(&summaries);
        let output = ResultFormatter::new(OutputFormat::Json).format_run(&summaries, &report);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["rounds"].as_array().unwrap().len(), 2);
        assert_eq!(value["consistency"]["rounds"], 2);
    }

    #[test]
    fn test_consistency_table() {
        let summaries = vec![sample_summary(), sample_summary()];
        let report = ConsistencyReport::from_summaries(&summaries);
        let output = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_consistency(&report);

        assert!(output.contains("2 round(s)"));
        assert!(output.contains("stable"));
        assert!(!output.contains("CHANGED"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line one\nline two", 40), "line one line two");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
