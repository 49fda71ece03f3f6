//! Chat completion adapter for Relay
//!
//! Lets a multi-turn chat client talk to an inference runner that answers
//! either as one JSON completion or as a server-sent event stream, and hands
//! back the same canonical result shape in both cases.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod backend;
pub mod convert;
pub mod error;
pub mod model;
pub mod protocol;
pub mod provider;
pub mod types;

pub use backend::Backend;
pub use error::LlmError;
pub use model::{ChatModel, ModelSettings};
pub use provider::{RestRunner, Runner, RunnerOutput};
pub use types::{CompletionRequest, GenerateResult, StreamEvent, StreamResult};
