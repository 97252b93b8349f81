//! Mock providers for integration testing
//!
//! [`MockAdapter`] is an in-process adapter driven by a script of outcomes.
//! [`MockOpenAI`] and [`MockAnthropic`] are wiremock servers speaking the
//! real provider wire formats.

use async_trait::async_trait;
use gateway_core::{
    ChatCompletionOutput, ChatMessage, EmbeddingOutput, GatewayError, GatewayResult,
    OperationInput, OperationOutput, OperationType, ProviderAdapter, ProviderKind,
    ProviderRawResult, TextGenerationOutput, Usage,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One scripted outcome
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Return a canned output for the operation
    Succeed,
    /// Return a canned output with token usage
    SucceedWithUsage(Usage),
    /// Fail with the given error
    Fail(GatewayError),
    /// Sleep before answering; pair with a short timeout
    Hang(Duration),
    /// Return an output of the wrong operation type
    WrongOutput,
}

impl MockStep {
    /// Retryable 500 from the provider
    pub fn server_error(kind: ProviderKind) -> Self {
        Self::Fail(GatewayError::provider(kind, "Internal server error", Some(500), true))
    }

    /// 401 from the provider
    pub fn auth_error(kind: ProviderKind) -> Self {
        Self::Fail(GatewayError::authentication(kind, "Incorrect API key provided", Some(401)))
    }
}

/// Scriptable in-process provider
pub struct MockAdapter {
    kind: ProviderKind,
    operations: Vec<OperationType>,
    script: Mutex<VecDeque<MockStep>>,
    default_step: MockStep,
    calls: AtomicUsize,
}

impl MockAdapter {
    /// Adapter that always succeeds for text, chat and embedding
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            operations: vec![
                OperationType::TextGeneration,
                OperationType::ChatCompletion,
                OperationType::Embedding,
            ],
            script: Mutex::new(VecDeque::new()),
            default_step: MockStep::Succeed,
            calls: AtomicUsize::new(0),
        }
    }

    /// Restrict the operations this adapter declares
    pub fn with_operations(mut self, operations: &[OperationType]) -> Self {
        self.operations = operations.to_vec();
        self
    }

    /// Outcomes returned in order before falling back to the default step
    pub fn with_script(self, steps: impl IntoIterator<Item = MockStep>) -> Self {
        self.script.lock().expect("script lock").extend(steps);
        self
    }

    /// Outcome used once the script is exhausted
    pub fn with_default(mut self, step: MockStep) -> Self {
        self.default_step = step;
        self
    }

    /// Append outcomes to the script
    pub fn push(&self, steps: impl IntoIterator<Item = MockStep>) {
        self.script.lock().expect("script lock").extend(steps);
    }

    /// Number of calls made to the adapter
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wrap in an `Arc` for registration
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn next_step(&self) -> MockStep {
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| self.default_step.clone())
    }

    fn output(&self, input: &OperationInput, usage: Option<Usage>) -> OperationOutput {
        let reply = format!("{} reply", self.kind);
        match input {
            OperationInput::ChatCompletion(_) => {
                OperationOutput::ChatCompletion(ChatCompletionOutput {
                    message: ChatMessage::assistant(reply),
                    usage,
                })
            }
            OperationInput::Embedding(request) => OperationOutput::Embedding(EmbeddingOutput {
                embeddings: request.input.texts().iter().map(|_| vec![0.1, 0.2, 0.3]).collect(),
                usage,
            }),
            _ => OperationOutput::TextGeneration(TextGenerationOutput { text: reply, usage }),
        }
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn supported_operations(&self) -> &[OperationType] {
        &self.operations
    }

    async fn execute(
        &self,
        input: &OperationInput,
        _timeout: Duration,
    ) -> GatewayResult<ProviderRawResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (output, usage) = match self.next_step() {
            MockStep::Succeed => (self.output(input, None), None),
            MockStep::SucceedWithUsage(usage) => (self.output(input, Some(usage)), Some(usage)),
            MockStep::Fail(error) => return Err(error),
            MockStep::Hang(delay) => {
                tokio::time::sleep(delay).await;
                (self.output(input, None), None)
            }
            MockStep::WrongOutput => (
                OperationOutput::Embedding(EmbeddingOutput {
                    embeddings: Vec::new(),
                    usage: None,
                }),
                None,
            ),
        };
        Ok(ProviderRawResult::new(output, json!({"mock": self.kind})).with_usage(usage))
    }
}

/// Mock OpenAI API server
pub struct MockOpenAI {
    pub server: MockServer,
}

impl MockOpenAI {
    /// Create a new mock OpenAI server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL for this mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Setup a successful chat completion response
    pub async fn mock_chat_completion(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(openai_chat_response(content)))
            .mount(&self.server)
            .await;
    }

    /// Setup a server error response
    pub async fn mock_server_error(&self) {
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(openai_error_response("server_error", "Internal server error")),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup an authentication error response
    pub async fn mock_auth_error(&self) {
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(openai_error_response(
                        "invalid_api_key",
                        "Incorrect API key provided",
                    )),
            )
            .mount(&self.server)
            .await;
    }

    /// Setup a moderation response
    pub async fn mock_moderation(&self, flagged: bool) {
        Mock::given(method("POST"))
            .and(path("/moderations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "modr-1",
                "model": "omni-moderation-latest",
                "results": [{
                    "flagged": flagged,
                    "categories": {"violence": flagged, "hate": false},
                    "category_scores": {"violence": if flagged { 0.91 } else { 0.01 }, "hate": 0.0}
                }]
            })))
            .mount(&self.server)
            .await;
    }

    /// Number of requests the server received
    pub async fn calls(&self) -> usize {
        self.server.received_requests().await.map_or(0, |r| r.len())
    }
}

/// Mock Anthropic API server
pub struct MockAnthropic {
    pub server: MockServer,
}

impl MockAnthropic {
    /// Create a new mock Anthropic server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL for this mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Setup a successful messages response
    pub async fn mock_messages(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_response(content)))
            .mount(&self.server)
            .await;
    }

    /// Number of requests the server received
    pub async fn calls(&self) -> usize {
        self.server.received_requests().await.map_or(0, |r| r.len())
    }
}

/// OpenAI chat completion body
pub fn openai_chat_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
    })
}

/// OpenAI error body
pub fn openai_error_response(code: &str, message: &str) -> Value {
    json!({
        "error": {"message": message, "type": "invalid_request_error", "code": code}
    })
}

/// Anthropic messages body
pub fn anthropic_response(content: &str) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": content}],
        "usage": {"input_tokens": 10, "output_tokens": 20}
    })
}
