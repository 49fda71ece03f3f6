//! Runner trait and implementations for inference backends

pub mod rest;

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::error::LlmError;
use crate::protocol::runner::{RunnerRequest, RunnerResponse};

pub use rest::RestRunner;

/// Raw response body of a streaming run
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// What a runner answered with
pub enum RunnerOutput {
    /// A single JSON completion
    Json(RunnerResponse),
    /// A server-sent event byte stream
    Stream(ByteStream),
}

impl RunnerOutput {
    /// Short name of the shape, used in error messages
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Stream(_) => "stream",
        }
    }
}

impl fmt::Debug for RunnerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(response) => f.debug_tuple("Json").field(response).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Trait implemented by each inference backend
///
/// One call is one network round trip. Implementations never retry.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Human-readable runner name
    fn name(&self) -> &str;

    /// Run a model; `request.stream` says which shape the caller expects back
    async fn run(&self, request: &RunnerRequest) -> Result<RunnerOutput, LlmError>;
}
