//! Mock inference runner for integration tests
//!
//! Serves the direct and gateway run routes and answers every request with a
//! canned reply, recording what it received.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// What the mock answers with
#[derive(Debug, Clone)]
pub enum Reply {
    /// JSON model output, wrapped in the REST `result` envelope
    Json(Value),
    /// SSE frames; each entry becomes one `data:` line
    Sse(Vec<String>),
    /// JSON body sent as is, with a success status
    Raw(Value),
    /// Error status with a plain body
    Status(StatusCode, String),
}

/// A request as the mock saw it
#[derive(Debug, Clone)]
pub struct Received {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Mock runner that returns predictable responses
pub struct MockRunner {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockRunnerState>,
}

struct MockRunnerState {
    request_count: AtomicU32,
    reply: Reply,
    received: Mutex<Vec<Received>>,
}

impl MockRunner {
    /// Start a mock answering every request with `reply`
    pub async fn start(reply: Reply) -> anyhow::Result<Self> {
        let state = Arc::new(MockRunnerState {
            request_count: AtomicU32::new(0),
            reply,
            received: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/client/v4/accounts/{account}/ai/run/{*model}", routing::post(handle_run))
            .route("/v1/{account}/{gateway}/workers-ai/{*model}", routing::post(handle_run))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Start a mock answering with a plain text completion
    pub async fn start_with_text(text: &str, prompt_tokens: u32, completion_tokens: u32) -> anyhow::Result<Self> {
        Self::start(Reply::Json(json!({
            "response": text,
            "usage": {
                "prompt_tokens": prompt_tokens,
                "completion_tokens": completion_tokens,
                "total_tokens": prompt_tokens + completion_tokens
            }
        })))
        .await
    }

    /// Base URL of the direct endpoint
    pub fn direct_url(&self) -> String {
        format!("http://{}/client/v4", self.addr)
    }

    /// Base URL of the gateway endpoint
    pub fn gateway_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of run requests received
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    /// The most recent request
    pub fn last_request(&self) -> Received {
        self.state
            .received
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .expect("at least one request")
    }
}

impl Drop for MockRunner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_run(State(state): State<Arc<MockRunnerState>>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.received.lock().expect("lock").push(Received {
        path: uri.path().to_owned(),
        headers,
        body,
    });

    match &state.reply {
        Reply::Json(result) => Json(json!({
            "result": result,
            "success": true,
            "errors": [],
            "messages": []
        }))
        .into_response(),
        Reply::Raw(body) => Json(body.clone()).into_response(),
        Reply::Sse(frames) => {
            let body: String = frames.iter().map(|frame| format!("data: {frame}\n\n")).collect();
            ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
        }
        Reply::Status(status, message) => (*status, message.clone()).into_response(),
    }
}
