//! Routing probes
//!
//! One probe per transport style. Each test case owns its own client, runs
//! exactly once, and ends in a single `ValidationResult`.
//!
//! - `sdk`: OpenAI-compatible client library, flat `choices` response
//! - `raw`: hand-built HTTP POST, `content` block list response

mod raw;
mod sdk;

pub use raw::RawHttpProbe;
pub use sdk::SdkProbe;

/// Gateway chat completions path, shared by both transports
pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

use tracing::{debug, info, warn};

use crate::error::ProbeError;
use crate::models::{CaseProgress, CaseState, GatewayTarget, TestCase, Transport, ValidationResult};
use crate::utils::timer::Timer;
use crate::validator::IdentityValidator;

/// Fetch the answer text for a case over its transport
pub async fn fetch_answer(case: &TestCase, target: &GatewayTarget) -> Result<String, ProbeError> {
    match case.transport {
        Transport::Sdk => SdkProbe::new(target)?.fetch_answer(case).await,
        Transport::RawHttp => RawHttpProbe::new(target)?.fetch_answer(case).await,
    }
}

/// Run one case end to end: dispatch, normalize, validate
pub async fn run_case(case: &TestCase, target: &GatewayTarget) -> ValidationResult {
    info!("Probing {}", case);

    let timer = Timer::start(&case.name);
    let mut progress = CaseProgress::new(&case.name);
    progress.advance(CaseState::Dispatched);

    let fetched = fetch_answer(case, target).await;
    let duration_ms = timer.finish();

    let result = match fetched {
        Ok(answer) => {
            progress.advance(CaseState::Succeeded);
            debug!("{}: answer {:?}", case.name, answer);

            let validator = IdentityValidator::new(&case.expected_markers);
            debug!("{}: markers {:?}", case.name, validator.markers());
            let verdict = validator.validate(&answer);
            let result = ValidationResult::validated(case, answer, &verdict, duration_ms);
            progress.advance(CaseState::Finished(result.outcome));
            result
        }
        Err(err) => {
            progress.advance(CaseState::Finished(err.outcome()));
            ValidationResult::failed(case, &err, duration_ms)
        }
    };

    if result.passed {
        info!("  {}", result);
    } else {
        warn!("  {}", result);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Outcome, Provider, VirtualKey};
    use serde_json::json;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn flat_choice(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "deepseek-chat",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_sdk_case_passes_on_marker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(flat_choice("I am DeepSeek Chat.")),
            )
            .mount(&server)
            .await;

        let case = TestCase::for_provider(Provider::DeepSeek, VirtualKey::new("vk_user3_deepseek"));
        let result = run_case(&case, &GatewayTarget::new(server.uri())).await;

        assert!(result.passed);
        assert_eq!(result.outcome, Outcome::Passed);
        assert_eq!(result.reason, "found 'deepseek' in response");
        assert_eq!(result.raw_text.as_deref(), Some("I am DeepSeek Chat."));
    }

    #[tokio::test]
    async fn test_raw_case_passes_for_claude() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer vk_user2_anthropic"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "I am Claude, made by Anthropic."}]
            })))
            .mount(&server)
            .await;

        let case =
            TestCase::for_provider(Provider::Anthropic, VirtualKey::new("vk_user2_anthropic"));
        let result = run_case(&case, &GatewayTarget::new(server.uri())).await;

        assert_eq!(result.outcome, Outcome::Passed);
        assert_eq!(
            result.raw_text.as_deref(),
            Some("I am Claude, made by Anthropic.")
        );
    }

    #[tokio::test]
    async fn test_misrouted_answer_fails_heuristic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "I'm ChatGPT, built by OpenAI."}]
            })))
            .mount(&server)
            .await;

        let case =
            TestCase::for_provider(Provider::Anthropic, VirtualKey::new("vk_user2_anthropic"));
        let result = run_case(&case, &GatewayTarget::new(server.uri())).await;

        assert!(!result.passed);
        assert_eq!(result.outcome, Outcome::FailedHeuristic);
        assert!(result.reason.starts_with("no expected marker found"));
    }

    #[tokio::test]
    async fn test_status_500_is_transport_failure_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_string(r#"{"error":"upstream unavailable"}"#),
            )
            .mount(&server)
            .await;

        let case =
            TestCase::for_provider(Provider::Anthropic, VirtualKey::new("vk_user2_anthropic"));
        let result = run_case(&case, &GatewayTarget::new(server.uri())).await;

        assert_eq!(result.outcome, Outcome::FailedTransport);
        assert_eq!(result.error_kind.as_deref(), Some("ProtocolError"));
        assert!(result.reason.contains(r#"{"error":"upstream unavailable"}"#));
        assert!(result.raw_text.is_none());
    }

    #[tokio::test]
    async fn test_sdk_case_with_rejected_key_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid virtual key\n"))
            .mount(&server)
            .await;

        let case = TestCase::for_provider(Provider::DeepSeek, VirtualKey::new("vk_revoked"));
        let result = run_case(&case, &GatewayTarget::new(server.uri())).await;

        assert_eq!(result.outcome, Outcome::FailedTransport);
        assert_eq!(result.error_kind.as_deref(), Some("ProtocolError"));
        assert!(result.reason.contains("HTTP 401"), "{}", result.reason);
        assert!(result.reason.contains("Invalid virtual key"));
        assert!(result.raw_text.is_none());
    }

    #[tokio::test]
    async fn test_same_case_twice_gives_same_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(flat_choice("DeepSeek here.")),
            )
            .mount(&server)
            .await;

        let case = TestCase::for_provider(Provider::DeepSeek, VirtualKey::new("vk_user3_deepseek"));
        let target = GatewayTarget::new(server.uri());
        let first = run_case(&case, &target).await;
        let second = run_case(&case, &target).await;

        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.reason, second.reason);
    }
}
