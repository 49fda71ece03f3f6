//! Completion orchestration for one model

use std::sync::Arc;

use futures_util::stream;
use relay_config::ModelConfig;

use crate::convert::messages::convert_messages;
use crate::convert::response::map_response;
use crate::convert::stream::decode_sse;
use crate::convert::tools::{prepare_response_format, prepare_tools};
use crate::convert::usage::normalize_usage;
use crate::error::LlmError;
use crate::protocol::runner::RunnerRequest;
use crate::provider::{Runner, RunnerOutput};
use crate::types::{
    CompletionRequest, ContentPart, FinishReason, GenerateResult, Role, StreamEvent, StreamResult, Usage, Warning,
};

/// Per-model defaults merged into every call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSettings {
    /// Ask the runner to prepend its safety prompt
    pub safe_prompt: Option<bool>,
    /// `max_tokens` used when the call does not set one
    pub max_tokens: Option<u32>,
}

impl From<&ModelConfig> for ModelSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            safe_prompt: config.safe_prompt,
            max_tokens: config.max_tokens,
        }
    }
}

/// Chat model bound to a runner
///
/// Cheap to clone; clones share the runner.
#[derive(Clone)]
pub struct ChatModel {
    model_id: String,
    runner: Arc<dyn Runner>,
    settings: ModelSettings,
}

impl ChatModel {
    /// Create a chat model for `model_id` backed by `runner`
    pub fn new(model_id: impl Into<String>, runner: Arc<dyn Runner>, settings: ModelSettings) -> Self {
        Self {
            model_id: model_id.into(),
            runner,
            settings,
        }
    }

    /// Model identifier sent to the runner
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Settings applied to every call
    pub const fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Run a single-shot completion
    ///
    /// # Errors
    ///
    /// Returns a validation error before any runner call if the request
    /// cannot be expressed on the wire, `LlmError::UnexpectedResponseShape`
    /// if the runner answers with a stream, or the runner's own error.
    pub async fn do_generate(&self, request: &CompletionRequest) -> Result<GenerateResult, LlmError> {
        let (wire, warnings) = self.prepare(request, false)?;

        let response = match self.runner.run(&wire).await? {
            RunnerOutput::Json(response) => response,
            other @ RunnerOutput::Stream(_) => {
                return Err(LlmError::UnexpectedResponseShape {
                    expected: "json",
                    received: other.shape(),
                });
            }
        };

        let (content, finish_reason) = map_response(&response);

        Ok(GenerateResult {
            content,
            finish_reason,
            usage: normalize_usage(response.usage.as_ref()),
            warnings,
        })
    }

    /// Run a streamed completion
    ///
    /// When tools are offered and the user spoke last, one single-shot call
    /// is made instead and its result replayed as events.
    ///
    /// # Errors
    ///
    /// Same as [`Self::do_generate`]; errors raised while the stream is
    /// consumed arrive as stream items instead.
    pub async fn do_stream(&self, request: &CompletionRequest) -> Result<StreamResult, LlmError> {
        let last_is_user = request.messages.last().is_some_and(|message| message.role == Role::User);

        if !request.tools.is_empty() && last_is_user {
            tracing::debug!(model = %self.model_id, "simulating stream from single-shot completion");

            let result = self.do_generate(request).await?;
            return Ok(StreamResult {
                stream: Box::pin(stream::iter(replay(result.content, result.finish_reason, result.usage))),
                warnings: result.warnings,
            });
        }

        let (wire, warnings) = self.prepare(request, true)?;

        match self.runner.run(&wire).await? {
            RunnerOutput::Stream(bytes) => Ok(StreamResult {
                stream: decode_sse(bytes),
                warnings,
            }),
            other @ RunnerOutput::Json(_) => Err(LlmError::UnexpectedResponseShape {
                expected: "stream",
                received: other.shape(),
            }),
        }
    }

    /// Build the wire request and collect warnings; performs no I/O
    fn prepare(&self, request: &CompletionRequest, stream: bool) -> Result<(RunnerRequest, Vec<Warning>), LlmError> {
        let prompt = convert_messages(&request.messages)?;

        if prompt.images.len() > 1 {
            return Err(LlmError::MultipleImagesUnsupported {
                count: prompt.images.len(),
            });
        }

        let tools = prepare_tools(&request.tools, request.tool_choice.as_ref())?;
        let response_format = prepare_response_format(request.response_format.as_ref())?;
        let warnings = self.unsupported_settings(request);

        let params = &request.params;
        let wire = RunnerRequest {
            model: self.model_id.clone(),
            messages: prompt.messages,
            tools: tools.tools,
            tool_choice: tools.tool_choice,
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens.or(self.settings.max_tokens),
            seed: params.seed,
            response_format,
            safe_prompt: self.settings.safe_prompt,
            stream: stream.then_some(true),
            image: prompt.images.into_iter().next().map(|image| image.data),
        };

        Ok((wire, warnings))
    }

    fn unsupported_settings(&self, request: &CompletionRequest) -> Vec<Warning> {
        let params = &request.params;
        let ignored = [
            ("frequency_penalty", params.frequency_penalty.is_some()),
            ("presence_penalty", params.presence_penalty.is_some()),
            ("stop", params.stop.is_some()),
        ];

        ignored
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(setting, _)| {
                tracing::debug!(model = %self.model_id, setting, "ignoring unsupported setting");
                Warning::unsupported_setting(setting)
            })
            .collect()
    }
}

impl std::fmt::Debug for ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatModel")
            .field("model_id", &self.model_id)
            .field("runner", &self.runner.name())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Single-shot content as stream events, closed by one `Finish`
fn replay(content: Vec<ContentPart>, finish_reason: FinishReason, usage: Usage) -> Vec<Result<StreamEvent, LlmError>> {
    content
        .into_iter()
        .map(|part| match part {
            ContentPart::Text { text } => StreamEvent::TextDelta { text },
            ContentPart::Reasoning { text } => StreamEvent::ReasoningDelta { text },
            ContentPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => StreamEvent::ToolCall {
                tool_call_id,
                tool_name,
                args,
            },
        })
        .chain(std::iter::once(StreamEvent::Finish { finish_reason, usage }))
        .map(Ok)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::TryStreamExt;
    use serde_json::json;

    use super::*;
    use crate::protocol::runner::RunnerResponse;
    use crate::types::{Message, Part, ToolDefinition};

    /// Runner answering with canned outputs and recording every request
    #[derive(Default)]
    struct SpyRunner {
        calls: AtomicUsize,
        outputs: Mutex<VecDeque<RunnerOutput>>,
        requests: Mutex<Vec<RunnerRequest>>,
    }

    impl SpyRunner {
        fn answering(output: RunnerOutput) -> Arc<Self> {
            let spy = Self::default();
            spy.outputs.lock().unwrap().push_back(output);
            Arc::new(spy)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> RunnerRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Runner for SpyRunner {
        fn name(&self) -> &str {
            "spy"
        }

        async fn run(&self, request: &RunnerRequest) -> Result<RunnerOutput, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Upstream("no canned output".to_owned()))
        }
    }

    fn json_output(value: serde_json::Value) -> RunnerOutput {
        RunnerOutput::Json(serde_json::from_value::<RunnerResponse>(value).unwrap())
    }

    fn sse_output(frames: &[&str]) -> RunnerOutput {
        let chunks: Vec<Result<Bytes, LlmError>> = frames
            .iter()
            .map(|frame| Ok(Bytes::from(format!("data: {frame}\n\n"))))
            .collect();
        RunnerOutput::Stream(Box::pin(stream::iter(chunks)))
    }

    fn model(runner: Arc<SpyRunner>) -> ChatModel {
        ChatModel::new("@cf/meta/llama-3.1-8b-instruct", runner, ModelSettings::default())
    }

    fn weather_tool() -> ToolDefinition {
        ToolDefinition {
            name: "get_weather".to_owned(),
            description: Some("Current weather".to_owned()),
            parameters: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        }
    }

    fn two_images() -> CompletionRequest {
        let image = |data: &[u8]| Part::Image {
            data: data.to_vec(),
            mime_type: "image/png".to_owned(),
        };
        CompletionRequest::new(vec![Message::with_parts(
            Role::User,
            vec![Part::text("compare"), image(&[1, 2]), image(&[3, 4])],
        )])
    }

    #[tokio::test]
    async fn generate_maps_text_and_usage() {
        let runner = SpyRunner::answering(json_output(json!({
            "response": "Hello!",
            "usage": {"prompt_tokens": 2, "completion_tokens": 1}
        })));

        let result = model(runner.clone())
            .do_generate(&CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap();

        assert_eq!(
            result.content,
            vec![ContentPart::Text {
                text: "Hello!".to_owned()
            }]
        );
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(
            result.usage,
            Usage {
                input_tokens: 2,
                output_tokens: 1,
                total_tokens: 3,
            }
        );
        assert!(result.warnings.is_empty());
        assert_eq!(runner.calls(), 1);

        let sent = runner.last_request();
        assert_eq!(sent.model, "@cf/meta/llama-3.1-8b-instruct");
        assert_eq!(sent.stream, None);
        assert_eq!(sent.messages[0].content, "Hi");
    }

    #[tokio::test]
    async fn multiple_images_fail_before_any_call() {
        let runner = Arc::new(SpyRunner::default());
        let model = model(runner.clone());

        let err = model.do_generate(&two_images()).await.unwrap_err();
        assert!(matches!(err, LlmError::MultipleImagesUnsupported { count: 2 }));

        let err = model.do_stream(&two_images()).await.unwrap_err();
        assert!(matches!(err, LlmError::MultipleImagesUnsupported { count: 2 }));

        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn single_image_is_sent_as_bytes() {
        let runner = SpyRunner::answering(json_output(json!({"response": "a cat"})));
        let request = CompletionRequest::new(vec![Message::with_parts(
            Role::User,
            vec![
                Part::text("what is this?"),
                Part::Image {
                    data: vec![137, 80, 78, 71],
                    mime_type: "image/png".to_owned(),
                },
            ],
        )]);

        model(runner.clone()).do_generate(&request).await.unwrap();

        let sent = runner.last_request();
        assert_eq!(sent.image, Some(vec![137, 80, 78, 71]));
        assert_eq!(serde_json::to_value(&sent).unwrap()["image"], json!([137, 80, 78, 71]));
    }

    #[tokio::test]
    async fn unsupported_settings_become_warnings() {
        let runner = SpyRunner::answering(json_output(json!({"response": "ok"})));
        let mut request = CompletionRequest::new(vec![Message::user("Hi")]);
        request.params.frequency_penalty = Some(0.5);
        request.params.stop = Some(vec!["END".to_owned()]);

        let result = model(runner).do_generate(&request).await.unwrap();

        assert_eq!(
            result.warnings,
            vec![
                Warning::unsupported_setting("frequency_penalty"),
                Warning::unsupported_setting("stop"),
            ]
        );
    }

    #[tokio::test]
    async fn model_settings_fill_request_defaults() {
        let runner = SpyRunner::answering(json_output(json!({"response": "ok"})));
        let settings = ModelSettings {
            safe_prompt: Some(true),
            max_tokens: Some(256),
        };
        let model = ChatModel::new("@cf/mistral/mistral-7b-instruct-v0.1", runner.clone(), settings);

        model
            .do_generate(&CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap();

        let sent = runner.last_request();
        assert_eq!(sent.safe_prompt, Some(true));
        assert_eq!(sent.max_tokens, Some(256));
    }

    #[tokio::test]
    async fn call_max_tokens_overrides_model_default() {
        let runner = SpyRunner::answering(json_output(json!({"response": "ok"})));
        let settings = ModelSettings {
            safe_prompt: None,
            max_tokens: Some(256),
        };
        let mut request = CompletionRequest::new(vec![Message::user("Hi")]);
        request.params.max_tokens = Some(32);

        ChatModel::new("m", runner.clone(), settings)
            .do_generate(&request)
            .await
            .unwrap();

        assert_eq!(runner.last_request().max_tokens, Some(32));
    }

    #[tokio::test]
    async fn generate_rejects_stream_output() {
        let runner = SpyRunner::answering(sse_output(&["[DONE]"]));

        let err = model(runner)
            .do_generate(&CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LlmError::UnexpectedResponseShape {
                expected: "json",
                received: "stream"
            }
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn stream_rejects_json_output() {
        let runner = SpyRunner::answering(json_output(json!({"response": "Hello!"})));

        let err = model(runner)
            .do_stream(&CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LlmError::UnexpectedResponseShape {
                expected: "stream",
                received: "json"
            }
        ));
    }

    #[tokio::test]
    async fn native_stream_is_decoded() {
        let runner = SpyRunner::answering(sse_output(&[
            r#"{"response":"Hel"}"#,
            r#"{"response":"lo","usage":{"prompt_tokens":2,"completion_tokens":1,"total_tokens":3}}"#,
            "[DONE]",
        ]));

        let result = model(runner.clone())
            .do_stream(&CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap();
        let events: Vec<StreamEvent> = result.stream.try_collect().await.unwrap();

        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta {
                    text: "Hel".to_owned()
                },
                StreamEvent::TextDelta { text: "lo".to_owned() },
                StreamEvent::Finish {
                    finish_reason: FinishReason::Stop,
                    usage: Usage {
                        input_tokens: 2,
                        output_tokens: 1,
                        total_tokens: 3,
                    },
                },
            ]
        );
        assert_eq!(runner.last_request().stream, Some(true));
    }

    #[tokio::test]
    async fn tools_with_user_last_simulate_stream() {
        let runner = SpyRunner::answering(json_output(json!({
            "response": null,
            "tool_calls": [{"name": "get_weather", "arguments": {"city": "Oslo"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        })));
        let mut request = CompletionRequest::new(vec![Message::user("Weather in Oslo?")]);
        request.tools = vec![weather_tool()];

        let result = model(runner.clone()).do_stream(&request).await.unwrap();
        let events: Vec<StreamEvent> = result.stream.try_collect().await.unwrap();

        assert_eq!(runner.calls(), 1);
        assert_eq!(runner.last_request().stream, None);
        assert_eq!(
            events,
            vec![
                StreamEvent::ToolCall {
                    tool_call_id: "functions.get_weather:0".to_owned(),
                    tool_name: "get_weather".to_owned(),
                    args: r#"{"city":"Oslo"}"#.to_owned(),
                },
                StreamEvent::Finish {
                    finish_reason: FinishReason::ToolCalls,
                    usage: Usage {
                        input_tokens: 10,
                        output_tokens: 4,
                        total_tokens: 14,
                    },
                },
            ]
        );
    }

    #[tokio::test]
    async fn simulated_stream_replays_reasoning_and_text() {
        let runner = SpyRunner::answering(json_output(json!({
            "choices": [{
                "message": {"content": "Sunny", "reasoning_content": "Checked the sky"},
                "finish_reason": "stop"
            }]
        })));
        let mut request = CompletionRequest::new(vec![Message::user("Weather?")]);
        request.tools = vec![weather_tool()];
        request.params.presence_penalty = Some(1.0);

        let result = model(runner).do_stream(&request).await.unwrap();
        assert_eq!(result.warnings, vec![Warning::unsupported_setting("presence_penalty")]);

        let events: Vec<StreamEvent> = result.stream.try_collect().await.unwrap();
        assert_eq!(
            events,
            vec![
                StreamEvent::ReasoningDelta {
                    text: "Checked the sky".to_owned()
                },
                StreamEvent::TextDelta {
                    text: "Sunny".to_owned()
                },
                StreamEvent::Finish {
                    finish_reason: FinishReason::Stop,
                    usage: Usage::default(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn tools_after_tool_turn_stream_natively() {
        let runner = SpyRunner::answering(sse_output(&[r#"{"response":"It is sunny"}"#, "[DONE]"]));
        let mut request = CompletionRequest::new(vec![
            Message::user("Weather in Oslo?"),
            Message::with_parts(
                Role::Assistant,
                vec![Part::ToolCall {
                    tool_call_id: "functions.get_weather:0".to_owned(),
                    tool_name: "get_weather".to_owned(),
                    args: r#"{"city":"Oslo"}"#.to_owned(),
                }],
            ),
            Message::with_parts(
                Role::Tool,
                vec![Part::ToolResult {
                    tool_call_id: "functions.get_weather:0".to_owned(),
                    tool_name: "get_weather".to_owned(),
                    result: json!({"sky": "clear"}),
                }],
            ),
        ]);
        request.tools = vec![weather_tool()];

        let result = model(runner.clone()).do_stream(&request).await.unwrap();
        let events: Vec<StreamEvent> = result.stream.try_collect().await.unwrap();

        assert_eq!(runner.last_request().stream, Some(true));
        assert_eq!(
            events.first(),
            Some(&StreamEvent::TextDelta {
                text: "It is sunny".to_owned()
            })
        );
    }

    #[tokio::test]
    async fn runner_errors_propagate() {
        let runner = Arc::new(SpyRunner::default());

        let err = model(runner)
            .do_generate(&CompletionRequest::new(vec![Message::user("Hi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Upstream(_)));
        assert!(err.is_retryable());
    }
}
