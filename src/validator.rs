//! Identity validation
//!
//! Decides whether an answer came from the expected provider by looking for
//! any of the case's identity markers in the text, ignoring case.
//!
//! This is a heuristic. A model that answers evasively, or that describes
//! itself generically, fails even when the gateway routed correctly; a model
//! that mentions a competitor passes even when it did not. Proving the route
//! would need the gateway to echo routing metadata, which it does not.

use std::collections::BTreeSet;

/// Outcome of matching one answer against a marker set
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Matched { marker: String },
    NoMatch { tried: Vec<String> },
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Matched { .. })
    }

    /// Human-readable reason
    pub fn reason(&self) -> String {
        match self {
            Verdict::Matched { marker } => format!("found '{marker}' in response"),
            Verdict::NoMatch { tried } if tried.is_empty() => {
                "no expected marker found (no markers configured)".to_string()
            }
            Verdict::NoMatch { tried } => {
                format!("no expected marker found (tried: {})", tried.join(", "))
            }
        }
    }
}

/// Case-insensitive OR-match over identity markers
#[derive(Clone, Debug)]
pub struct IdentityValidator {
    markers: Vec<String>,
}

impl IdentityValidator {
    /// Blank markers are dropped; they would match any text.
    pub fn new<'a, I>(markers: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let markers = markers
            .into_iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self { markers }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn validate(&self, answer: &str) -> Verdict {
        let haystack = answer.to_lowercase();

        match self.markers.iter().find(|m| haystack.contains(m.as_str())) {
            Some(marker) => Verdict::Matched {
                marker: marker.clone(),
            },
            None => Verdict::NoMatch {
                tried: self.markers.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let set = markers(&["deepseek"]);
        let verdict = IdentityValidator::new(&set)
            .validate("Hello! I'm DeepSeek-V3, an AI assistant created by DeepSeek.");
        assert!(verdict.passed());
        assert_eq!(verdict.reason(), "found 'deepseek' in response");
    }

    #[test]
    fn test_any_marker_is_enough() {
        let set = markers(&["claude", "anthropic"]);
        let validator = IdentityValidator::new(&set);

        assert!(validator.validate("I am Claude.").passed());
        assert!(validator.validate("I was made by Anthropic.").passed());
        assert!(validator.validate("I am Claude, made by Anthropic.").passed());
    }

    #[test]
    fn test_no_match() {
        let set = markers(&["claude", "anthropic"]);
        let verdict = IdentityValidator::new(&set).validate("I am ChatGPT, made by OpenAI.");
        assert!(!verdict.passed());
        assert_eq!(
            verdict.reason(),
            "no expected marker found (tried: anthropic, claude)"
        );
    }

    #[test]
    fn test_empty_answer_fails() {
        let set = markers(&["deepseek"]);
        assert!(!IdentityValidator::new(&set).validate("").passed());
    }

    #[test]
    fn test_blank_markers_are_ignored() {
        let set = markers(&["", "  "]);
        let validator = IdentityValidator::new(&set);
        assert!(validator.markers().is_empty());

        let verdict = validator.validate("anything at all");
        assert!(!verdict.passed());
        assert_eq!(
            verdict.reason(),
            "no expected marker found (no markers configured)"
        );
    }

    #[test]
    fn test_markers_are_normalized() {
        let set = markers(&["Claude", "claude ", "ANTHROPIC"]);
        let validator = IdentityValidator::new(&set);
        assert_eq!(validator.markers(), &["anthropic", "claude"]);
    }
}
