//! OpenAI-compatible SDK probe
//!
//! Builds the request and decodes the response with the `async-openai`
//! schema types, pointed at the gateway instead of the upstream provider,
//! with the virtual key as the bearer credential. The call itself goes
//! through the harness HTTP client so a rejected request is reported with
//! its status code and body, the same as on the raw path.

use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
};
use serde_json::Value;
use tracing::debug;

use super::CHAT_COMPLETIONS_PATH;
use crate::error::ProbeError;
use crate::http::{HttpClient, HttpError};
use crate::models::{GatewayTarget, TestCase, Transport};
use crate::response::{FlatChoice, GatewayResponse};

impl From<&CreateChatCompletionResponse> for FlatChoice {
    fn from(response: &CreateChatCompletionResponse) -> Self {
        FlatChoice::from_contents(
            response
                .choices
                .iter()
                .map(|choice| choice.message.content.clone()),
        )
    }
}

pub struct SdkProbe {
    client: HttpClient,
    prompt: String,
}

impl SdkProbe {
    pub fn new(target: &GatewayTarget) -> Result<Self, ProbeError> {
        let client = HttpClient::build(target.timeout_secs, target.accept_invalid_certs)?
            .base_url(target.base());

        Ok(Self {
            client,
            prompt: target.prompt.clone(),
        })
    }

    fn request_for(&self, case: &TestCase) -> Result<CreateChatCompletionRequest, ProbeError> {
        let message: ChatCompletionRequestMessage = ChatCompletionRequestUserMessageArgs::default()
            .content(self.prompt.as_str())
            .build()
            .map_err(invalid_request)?
            .into();

        CreateChatCompletionRequestArgs::default()
            .model(case.model_id.as_str())
            .messages(vec![message])
            .build()
            .map_err(invalid_request)
    }

    /// Send the identity prompt once and return `choices[0].message.content`
    pub async fn fetch_answer(&self, case: &TestCase) -> Result<String, ProbeError> {
        let request = self.request_for(case)?;

        let response = self
            .client
            .post_json(CHAT_COMPLETIONS_PATH, case.virtual_key.expose(), &request)
            .await?;

        debug!(
            "{}: HTTP {} in {}ms",
            case.name, response.status_code, response.duration_ms
        );

        // Anything but 200 is reported with its body; extraction is not attempted
        if !response.is_ok() {
            return Err(ProbeError::Status {
                status: response.status_code,
                body: response.body,
            });
        }

        let body = response
            .json()
            .map_err(|e| ProbeError::MalformedBody(e.to_string()))?;

        let parsed = decode_completion(&body)?;
        debug!("{}: {} response", case.name, parsed.shape());
        Ok(parsed.answer()?)
    }
}

/// Decode with the SDK schema; bodies it rejects go through the normalizer
/// so a missing or empty `choices` is reported as an extraction error
fn decode_completion(body: &Value) -> Result<GatewayResponse, ProbeError> {
    match serde_json::from_value::<CreateChatCompletionResponse>(body.clone()) {
        Ok(completion) => {
            debug!(
                "model {} returned {} choice(s)",
                completion.model,
                completion.choices.len()
            );
            Ok(GatewayResponse::from(FlatChoice::from(&completion)))
        }
        Err(e) => {
            debug!("not a full chat completion ({e}), falling back to the flat shape");
            Ok(GatewayResponse::parse(Transport::Sdk, body)?)
        }
    }
}

fn invalid_request(err: OpenAIError) -> ProbeError {
    HttpError::RequestFailed(format!("Failed to build request: {err}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Outcome, Provider, VirtualKey};
    use crate::response::ExtractionError;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn deepseek() -> TestCase {
        TestCase::for_provider(Provider::DeepSeek, VirtualKey::new("vk_user3_deepseek"))
    }

    fn completion(choices: Value) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "deepseek-chat",
            "choices": choices
        })
    }

    fn choice(content: &str) -> Value {
        json!({
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        })
    }

    async fn probe_against(server: &MockServer) -> SdkProbe {
        SdkProbe::new(&GatewayTarget::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_flat_choice_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer vk_user3_deepseek"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!([choice(
                "Hi! I'm DeepSeek-V3, an AI assistant by DeepSeek."
            )]))))
            .expect(1)
            .mount(&server)
            .await;

        let answer = probe_against(&server)
            .await
            .fetch_answer(&deepseek())
            .await
            .unwrap();
        assert_eq!(answer, "Hi! I'm DeepSeek-V3, an AI assistant by DeepSeek.");
    }

    #[tokio::test]
    async fn test_request_carries_model_and_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(json!([choice("ok")]))),
            )
            .mount(&server)
            .await;

        probe_against(&server)
            .await
            .fetch_answer(&deepseek())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], crate::models::IDENTITY_PROMPT);
    }

    #[tokio::test]
    async fn test_empty_choices_is_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!([]))))
            .mount(&server)
            .await;

        let err = probe_against(&server)
            .await
            .fetch_answer(&deepseek())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProbeError::Extraction(ExtractionError::EmptySequence("choices"))
        );
        assert_eq!(err.outcome(), Outcome::FailedParse);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached", "type": "requests"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = probe_against(&server)
            .await
            .fetch_answer(&deepseek())
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Status { status: 429, .. }), "{err:?}");
        assert!(err.to_string().contains("Rate limit reached"));
        assert_eq!(err.outcome(), Outcome::FailedTransport);
    }

    #[tokio::test]
    async fn test_unknown_key_reports_status_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer vk_nobody"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid virtual key\n"))
            .expect(1)
            .mount(&server)
            .await;

        let case = TestCase::for_provider(Provider::DeepSeek, VirtualKey::new("vk_nobody"));
        let err = probe_against(&server)
            .await
            .fetch_answer(&case)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProbeError::Status {
                status: 401,
                body: "Invalid virtual key\n".to_string()
            }
        );
        assert_eq!(err.kind(), "ProtocolError");
        assert_eq!(err.outcome(), Outcome::FailedTransport);
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_string(r#"{"error":"upstream unavailable"}"#),
            )
            .mount(&server)
            .await;

        let err = probe_against(&server)
            .await
            .fetch_answer(&deepseek())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"gateway returned HTTP 500: {"error":"upstream unavailable"}"#
        );
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = probe_against(&server)
            .await
            .fetch_answer(&deepseek())
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::MalformedBody(_)), "{err:?}");
        assert_eq!(err.outcome(), Outcome::FailedParse);
    }

    #[tokio::test]
    async fn test_missing_choices_is_extraction_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
            .mount(&server)
            .await;

        let err = probe_against(&server)
            .await
            .fetch_answer(&deepseek())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProbeError::Extraction(ExtractionError::MissingField("choices"))
        );
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let target = GatewayTarget::new("http://127.0.0.1:9").with_timeout(5);
        let err = SdkProbe::new(&target)
            .unwrap()
            .fetch_answer(&deepseek())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ProbeError::Transport(HttpError::ConnectionRefused(_))),
            "{err:?}"
        );
    }

    #[test]
    fn test_flat_choice_from_sdk_response() {
        let response: CreateChatCompletionResponse =
            serde_json::from_value(completion(json!([choice("first"), choice("second")])))
                .unwrap();
        let flat = FlatChoice::from(&response);
        assert_eq!(flat.choices.len(), 2);
        assert_eq!(flat.choices[0].message.content.as_deref(), Some("first"));
    }
}
