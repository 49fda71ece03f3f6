//! Conversation messages to runner wire messages

use std::borrow::Cow;

use serde_json::Value;

use crate::error::LlmError;
use crate::protocol::runner::{WireFunctionCall, WireMessage, WireToolCall};
use crate::types::{Content, Message, Part, Role};

/// Image pulled out of the text channel of a user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// Media type (e.g. "image/png")
    pub mime_type: String,
}

/// Wire messages plus the images extracted from them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertedPrompt {
    /// Wire messages in conversation order
    pub messages: Vec<WireMessage>,
    /// Extracted images in conversation order
    pub images: Vec<ImageInput>,
}

/// Tool call id shared by an assistant turn and the tool turn answering it
///
/// The index restarts at 0 in every turn, so two turns calling the same tool
/// produce the same ids.
pub fn tool_call_id(tool_name: &str, index: usize) -> String {
    format!("functions.{tool_name}:{index}")
}

/// Convert a conversation into runner wire messages
///
/// Pure: the same input always yields the same output.
pub fn convert_messages(messages: &[Message]) -> Result<ConvertedPrompt, LlmError> {
    let mut prompt = ConvertedPrompt::default();

    for message in messages {
        match &message.role {
            Role::System => {
                let content = system_content(&message.content)?;
                prompt.messages.push(WireMessage::text("system", content));
            }
            Role::User => {
                let content = user_content(&message.content, &mut prompt.images)?;
                prompt.messages.push(WireMessage::text("user", content));
            }
            Role::Assistant => prompt.messages.push(assistant_message(&message.content)?),
            Role::Tool => prompt.messages.extend(tool_messages(&message.content)?),
            Role::Other(name) => {
                return Err(LlmError::UnsupportedInput(format!("role `{name}`")));
            }
        }
    }

    Ok(prompt)
}

fn parts(content: &Content) -> Cow<'_, [Part]> {
    match content {
        Content::Text(text) => Cow::Owned(vec![Part::text(text.clone())]),
        Content::Parts(parts) => Cow::Borrowed(parts),
    }
}

fn unsupported_part(role: &str, part: &Part) -> LlmError {
    LlmError::UnsupportedInput(format!("`{}` part in {role} message", part.kind()))
}

fn system_content(content: &Content) -> Result<String, LlmError> {
    match content {
        Content::Text(text) => Ok(text.clone()),
        Content::Parts(parts) => {
            let mut lines = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    Part::Text { text } => lines.push(text.as_str()),
                    other => return Err(unsupported_part("system", other)),
                }
            }
            Ok(lines.join("\n"))
        }
    }
}

fn user_content(content: &Content, images: &mut Vec<ImageInput>) -> Result<String, LlmError> {
    let mut lines = Vec::new();

    for part in parts(content).iter() {
        match part {
            Part::Text { text } => lines.push(text.clone()),
            Part::Image { data, mime_type } => images.push(ImageInput {
                data: data.clone(),
                mime_type: mime_type.clone(),
            }),
            other => return Err(unsupported_part("user", other)),
        }
    }

    Ok(lines.join("\n"))
}

fn assistant_message(content: &Content) -> Result<WireMessage, LlmError> {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in parts(content).iter() {
        match part {
            Part::Text { text: fragment } | Part::Reasoning { text: fragment } => text.push_str(fragment),
            Part::ToolCall { tool_name, args, .. } => {
                // Replaces, not appends: the tool call envelope becomes the whole body
                text = tool_call_envelope(tool_name, args);
                tool_calls.push(WireToolCall {
                    id: tool_call_id(tool_name, tool_calls.len()),
                    tool_type: "function".to_owned(),
                    function: WireFunctionCall {
                        name: tool_name.clone(),
                        arguments: args.clone(),
                    },
                });
            }
            other => return Err(unsupported_part("assistant", other)),
        }
    }

    let mut message = WireMessage::text("assistant", text);
    if !tool_calls.is_empty() {
        message.tool_calls = Some(tool_calls);
    }

    Ok(message)
}

fn tool_call_envelope(tool_name: &str, args: &str) -> String {
    let parameters = serde_json::from_str::<Value>(args).unwrap_or_else(|_| Value::String(args.to_owned()));
    serde_json::json!({ "name": tool_name, "parameters": parameters }).to_string()
}

fn tool_messages(content: &Content) -> Result<Vec<WireMessage>, LlmError> {
    let mut messages = Vec::new();

    for part in parts(content).iter() {
        match part {
            Part::ToolResult { tool_name, result, .. } => {
                let mut message = WireMessage::text("tool", result.to_string());
                message.name = Some(tool_name.clone());
                message.tool_call_id = Some(tool_call_id(tool_name, messages.len()));
                messages.push(message);
            }
            other => return Err(unsupported_part("tool", other)),
        }
    }

    Ok(messages)
}
