//! Server-sent event frames to canonical stream events

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use eventsource_stream::{Event, Eventsource};
use futures_util::{Stream, StreamExt, stream};
use indexmap::IndexMap;
use serde_json::Value;

use super::messages::tool_call_id;
use super::usage::normalize_usage;
use crate::error::LlmError;
use crate::protocol::runner::{PartialToolCall, RunnerStreamChunk};
use crate::provider::ByteStream;
use crate::types::{EventStream, FinishReason, StreamEvent, Usage};

/// Data of the frame that ends the stream
const DONE_SENTINEL: &str = "[DONE]";

type FrameSource = Pin<Box<dyn Stream<Item = Result<Event, String>> + Send>>;

/// Tool call pieces collected under one index
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ToolCallFragments {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Accumulators for one stream
///
/// Owned by a single decode loop and consumed when it flushes.
#[derive(Debug, Default)]
pub struct DecodeState {
    usage: Usage,
    tool_calls: IndexMap<u32, ToolCallFragments>,
}

impl DecodeState {
    /// Fold one chunk into the state, returning events ready for immediate emission
    pub fn apply(&mut self, chunk: RunnerStreamChunk) -> Vec<StreamEvent> {
        // Last known usage wins, no merging
        if let Some(usage) = &chunk.usage {
            self.usage = normalize_usage(Some(usage));
        }

        let delta = chunk
            .choices
            .and_then(|choices| choices.into_iter().next())
            .map(|choice| choice.delta)
            .unwrap_or_default();

        let fragments = chunk
            .tool_calls
            .filter(|calls| !calls.is_empty())
            .or_else(|| delta.tool_calls.filter(|calls| !calls.is_empty()));

        if let Some(fragments) = fragments {
            fragments.into_iter().for_each(|fragment| self.buffer(fragment));
            return Vec::new();
        }

        let mut events = Vec::new();

        if let Some(text) = delta.reasoning_content.filter(|text| !text.is_empty()) {
            events.push(StreamEvent::ReasoningDelta { text });
        }
        if let Some(text) = chunk.response.or(delta.content).filter(|text| !text.is_empty()) {
            events.push(StreamEvent::TextDelta { text });
        }

        events
    }

    fn buffer(&mut self, fragment: PartialToolCall) {
        let entry = self.tool_calls.entry(fragment.index).or_default();

        if fragment.id.is_some() {
            entry.id = fragment.id;
        }

        let (name, arguments) = match fragment.function {
            Some(function) => (function.name, function.arguments),
            None => (fragment.name, fragment.arguments),
        };
        if let Some(name) = name {
            entry.name.push_str(&name);
        }
        match arguments {
            None | Some(Value::Null) => {}
            Some(Value::String(piece)) => entry.arguments.push_str(&piece),
            Some(object) => entry.arguments.push_str(&object.to_string()),
        }
    }

    /// Reassembled tool calls in first-seen order, then the single finish event
    pub fn finish(self) -> Vec<StreamEvent> {
        let mut events: Vec<StreamEvent> = self
            .tool_calls
            .into_iter()
            .map(|(index, call)| StreamEvent::ToolCall {
                tool_call_id: call
                    .id
                    .unwrap_or_else(|| tool_call_id(&call.name, index as usize)),
                tool_name: call.name,
                args: if call.arguments.is_empty() {
                    "{}".to_owned()
                } else {
                    call.arguments
                },
            })
            .collect();

        events.push(StreamEvent::Finish {
            finish_reason: FinishReason::Stop,
            usage: self.usage,
        });

        events
    }
}

/// Decode loop: frame source, accumulators and events awaiting emission
struct Decoder {
    source: FrameSource,
    /// `None` once the stream has been flushed or has failed
    state: Option<DecodeState>,
    pending: VecDeque<StreamEvent>,
}

impl Decoder {
    fn flush(&mut self) {
        if let Some(state) = self.state.take() {
            self.pending.extend(state.finish());
        }
        // Release the connection without waiting for the consumer to drain
        self.source = Box::pin(stream::empty());
    }

    fn apply_frame(&mut self, data: &str) {
        match serde_json::from_str::<RunnerStreamChunk>(data) {
            Ok(chunk) => {
                if let Some(state) = self.state.as_mut() {
                    self.pending.extend(state.apply(chunk));
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
            }
        }
    }
}

async fn next_event(mut decoder: Decoder) -> Option<(Result<StreamEvent, LlmError>, Decoder)> {
    loop {
        if let Some(event) = decoder.pending.pop_front() {
            return Some((Ok(event), decoder));
        }

        if decoder.state.is_none() {
            return None;
        }

        match decoder.source.next().await {
            Some(Ok(frame)) => {
                let data = frame.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == DONE_SENTINEL {
                    decoder.flush();
                } else {
                    decoder.apply_frame(data);
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "event source failed mid-stream");
                decoder.state = None;
                decoder.source = Box::pin(stream::empty());
                return Some((Err(LlmError::Streaming(e)), decoder));
            }
            None => decoder.flush(),
        }
    }
}

/// Decode parsed SSE frames into canonical events
///
/// The returned stream is lazy: frames are read only as events are pulled.
/// Dropping it drops the source.
pub fn decode_events<S, E>(source: S) -> EventStream
where
    S: Stream<Item = Result<Event, E>> + Send + 'static,
    E: Display + 'static,
{
    let decoder = Decoder {
        source: Box::pin(source.map(|frame| frame.map_err(|e| e.to_string()))),
        state: Some(DecodeState::default()),
        pending: VecDeque::new(),
    };

    Box::pin(stream::unfold(decoder, next_event))
}

/// Decode a raw SSE byte stream into canonical events
pub fn decode_sse(bytes: ByteStream) -> EventStream {
    decode_events(bytes.eventsource())
}
