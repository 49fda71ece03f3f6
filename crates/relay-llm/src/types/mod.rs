//! Canonical types for completion requests, results and stream events
//!
//! These are runner-agnostic; the wire shapes live in [`crate::protocol`].

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{Content, Message, Part, Role};
pub use request::{CompletionParams, CompletionRequest, ResponseFormat};
pub use response::{ContentPart, FinishReason, GenerateResult, Usage, Warning};
pub use stream::{EventStream, StreamEvent, StreamResult};
pub use tool::{ToolChoice, ToolDefinition};
