//! Transport adapter: issues the workflow request and drives the pipeline.

pub mod http;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{Map, Value};
use tracing::debug;

use crate::dispatch::{dispatch, CompletionGuard, WorkflowCallbacks};
use crate::error::{FlowError, Result};
use crate::session::{event_stream, SessionEvent, SessionPhase};

use self::http::{bearer_headers, shared_client, status_to_error};

const WORKFLOW_PATH: &str = "workflows/run";
const COMPLETION_PATH: &str = "completion-messages";

/// Request descriptor for one streaming session.
///
/// Serializes to `{inputs, user, response_mode: "streaming", ...extra}`.
/// Streaming mode is always forced; caller fields cannot override it.
#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub inputs: Value,
    pub user: String,
    /// Extra caller fields merged into the JSON body.
    pub extra: Map<String, Value>,
    path: &'static str,
}

impl WorkflowRequest {
    pub fn new(inputs: Value, user: impl Into<String>) -> Self {
        Self {
            inputs,
            user: user.into(),
            extra: Map::new(),
            path: WORKFLOW_PATH,
        }
    }

    /// Target the legacy completion endpoint instead of the workflow one.
    pub fn completion_mode(mut self) -> Self {
        self.path = COMPLETION_PATH;
        self
    }

    /// Merge an extra top-level field into the request body.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn path(&self) -> &str {
        self.path
    }

    fn body(&self) -> Value {
        let mut obj = self.extra.clone();
        obj.insert("inputs".into(), self.inputs.clone());
        obj.insert("user".into(), Value::String(self.user.clone()));
        obj.insert("response_mode".into(), Value::String("streaming".into()));
        Value::Object(obj)
    }
}

/// Client for a workflow execution service's streaming API.
///
/// Each call owns its session; concurrent invocations share nothing but the
/// underlying connection pool.
pub struct WorkflowClient {
    api_key: String,
    base_url: String,
}

impl WorkflowClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            api_key: api_key.into(),
            base_url,
        }
    }

    /// Construct from `WORKFLOW_API_KEY` / `WORKFLOW_BASE_URL`, loading
    /// `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let api_key = std::env::var("WORKFLOW_API_KEY")
            .map_err(|_| FlowError::Configuration("WORKFLOW_API_KEY is not set".to_string()))?;
        let base_url = std::env::var("WORKFLOW_BASE_URL")
            .map_err(|_| FlowError::Configuration("WORKFLOW_BASE_URL is not set".to_string()))?;
        Ok(Self::new(api_key, base_url))
    }

    /// Open a streaming session, returning the ordered event stream.
    ///
    /// Returns `Err` only for failures before streaming begins: request
    /// build, network, or a non-2xx status (whose structured `{message,
    /// code}` body is parsed when present). Once the stream exists, every
    /// further condition arrives as a stream item.
    pub async fn stream_events(
        &self,
        request: &WorkflowRequest,
    ) -> Result<BoxStream<'static, Result<SessionEvent>>> {
        let url = format!("{}/{}", self.base_url, request.path());
        debug!(%url, "opening workflow stream");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&request.body())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }

        let bytes = resp
            .bytes_stream()
            .map(|item| item.map_err(FlowError::Network));
        Ok(event_stream(bytes))
    }

    /// Run a full session through the callback surface.
    ///
    /// Never returns an error: every failure, including a pre-stream
    /// transport failure, is delivered through `on_error`, and
    /// `on_completed(has_error)` fires exactly once. Recoverable frame
    /// errors keep the session alive; fatal errors finalize it. Returns the
    /// terminal phase.
    pub async fn run(
        &self,
        request: &WorkflowRequest,
        callbacks: &mut WorkflowCallbacks,
    ) -> SessionPhase {
        let mut guard = CompletionGuard::new();

        let mut stream = match self.stream_events(request).await {
            Ok(stream) => stream,
            Err(err) => {
                callbacks.report_error(&err);
                guard.fail(callbacks);
                return guard.phase();
            }
        };
        guard.start_streaming();

        let mut has_error = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => dispatch(&event, callbacks),
                Err(err) => {
                    has_error = true;
                    callbacks.report_error(&err);
                    if err.is_fatal() {
                        guard.fail(callbacks);
                        return guard.phase();
                    }
                }
            }
        }

        guard.complete(callbacks, has_error);
        guard.phase()
    }
}
