use std::fmt;
use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};

use super::response::{FinishReason, Usage, Warning};
use crate::error::LlmError;

/// Canonical event in a streamed completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental text
    TextDelta {
        /// The text fragment
        text: String,
    },
    /// Incremental reasoning text
    ReasoningDelta {
        /// The reasoning fragment
        text: String,
    },
    /// Complete tool invocation
    ToolCall {
        /// Tool call identifier
        tool_call_id: String,
        /// Name of the tool
        tool_name: String,
        /// JSON-encoded arguments
        args: String,
    },
    /// Terminal event; nothing follows it
    Finish {
        /// Why generation stopped
        finish_reason: FinishReason,
        /// Last known usage
        usage: Usage,
    },
}

/// Lazy sequence of stream events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Result of a streamed completion
pub struct StreamResult {
    /// Events, pulled on demand
    pub stream: EventStream,
    /// Ignored settings and similar notices
    pub warnings: Vec<Warning>,
}

impl fmt::Debug for StreamResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamResult")
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}
