//! Single-shot runner response to canonical content

use serde_json::Value;

use super::messages::tool_call_id;
use crate::protocol::runner::{RunnerChoiceMessage, RunnerResponse, RunnerToolCall};
use crate::types::{ContentPart, FinishReason};

/// Content and finish reason extracted from a runner response
pub fn map_response(response: &RunnerResponse) -> (Vec<ContentPart>, FinishReason) {
    let choice_message = first_choice_message(response);
    let mut content = Vec::new();

    if let Some(text) = choice_message
        .and_then(|m| m.reasoning_content.as_deref())
        .filter(|text| !text.is_empty())
    {
        content.push(ContentPart::Reasoning { text: text.to_owned() });
    }

    let text = match &response.response {
        Some(value) => response_text(value),
        None => choice_message.and_then(|m| m.content.clone()),
    };
    if let Some(text) = text.filter(|text| !text.is_empty()) {
        content.push(ContentPart::Text { text });
    }

    let tool_calls = response
        .tool_calls
        .as_deref()
        .or_else(|| choice_message.and_then(|m| m.tool_calls.as_deref()))
        .unwrap_or_default();
    content.extend(tool_calls.iter().enumerate().map(|(index, call)| tool_call_part(call, index)));

    let finish_reason = finish_reason(response, !tool_calls.is_empty());

    (content, finish_reason)
}

fn first_choice_message(response: &RunnerResponse) -> Option<&RunnerChoiceMessage> {
    response
        .choices
        .as_ref()
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.message.as_ref())
}

/// Structured-output models answer with an object instead of a string
fn response_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn arguments_json(arguments: Option<&Value>) -> String {
    match arguments {
        None | Some(Value::Null) => "{}".to_owned(),
        Some(Value::String(raw)) => raw.clone(),
        Some(other) => other.to_string(),
    }
}

fn tool_call_part(call: &RunnerToolCall, index: usize) -> ContentPart {
    let (id, name, arguments) = match call {
        RunnerToolCall::Nested { id, function } => (id, &function.name, function.arguments.as_ref()),
        RunnerToolCall::Flat { id, name, arguments } => (id, name, arguments.as_ref()),
    };

    ContentPart::ToolCall {
        tool_call_id: id.clone().unwrap_or_else(|| tool_call_id(name, index)),
        tool_name: name.clone(),
        args: arguments_json(arguments),
    }
}

fn finish_reason(response: &RunnerResponse, has_tool_calls: bool) -> FinishReason {
    let reported = response
        .choices
        .as_ref()
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.finish_reason.as_deref())
        .or(response.finish_reason.as_deref());

    match reported {
        Some(reason) => parse_finish_reason(reason),
        None if has_tool_calls => FinishReason::ToolCalls,
        None => FinishReason::Stop,
    }
}

/// Parse a runner finish reason string
pub fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" | "end_turn" => FinishReason::Stop,
        "length" | "model_length" | "max_tokens" => FinishReason::Length,
        "tool_calls" | "tool_use" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        "error" => FinishReason::Error,
        "other" => FinishReason::Other,
        _ => FinishReason::Unknown,
    }
}
