use crate::Provider;
use crate::sse;
use crate::types::*;
use bytes::Bytes;
use notechat_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted reply for deterministic runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MockResponse {
    /// Whole reply; streams as a single delta
    Text { content: String },
    /// Reply delivered piece by piece
    Deltas { pieces: Vec<String> },
    /// Non-success HTTP status
    Error { status: u16, body: String },
}

/// Mock configuration from TOML file
#[derive(Debug, Deserialize)]
struct MockConfig {
    responses: Vec<MockResponse>,
}

/// Provider that replays scripted responses in order and records every request
pub struct MockProvider {
    responses: Vec<MockResponse>,
    current: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self { responses, current: AtomicUsize::new(0), requests: Mutex::new(Vec::new()) }
    }

    /// Load `[[responses]]` tables from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MockConfig =
            toml::from_str(content).map_err(|e| Error::Parse(format!("invalid mock responses: {}", e)))?;
        tracing::debug!(responses = config.responses.len(), "loaded mock responses");
        Ok(Self::new(config.responses))
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    fn next_response(&self, request: CompletionRequest) -> Result<MockResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let index = self.current.fetch_add(1, Ordering::SeqCst);
        self.responses.get(index).cloned().ok_or_else(|| {
            Error::Other(format!(
                "no more mock responses configured (requested: {}, available: {})",
                index + 1,
                self.responses.len()
            ))
        })
    }
}

/// Encode pieces the way a streaming endpoint would send them
fn wire_lines(pieces: &[String]) -> Vec<std::result::Result<Bytes, Infallible>> {
    pieces
        .iter()
        .map(|piece| {
            let event = serde_json::json!({ "choices": [{ "delta": { "content": piece } }] });
            Ok(Bytes::from(format!("{}{}\n", sse::DATA_PREFIX, event)))
        })
        .chain(std::iter::once(Ok(Bytes::from(format!("{}{}\n", sse::DATA_PREFIX, sse::DONE_SENTINEL)))))
        .collect()
}

#[async_trait::async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        match self.next_response(request)? {
            MockResponse::Text { content } => Ok(content.trim().to_string()),
            MockResponse::Deltas { pieces } => Ok(pieces.concat().trim().to_string()),
            MockResponse::Error { status, body } => Err(Error::http(status, body)),
        }
    }

    async fn stream_completion(&self, request: CompletionRequest) -> Result<SnapshotStream> {
        let pieces = match self.next_response(request)? {
            MockResponse::Text { content } => vec![content],
            MockResponse::Deltas { pieces } => pieces,
            MockResponse::Error { status, body } => return Err(Error::http(status, body)),
        };

        let body = tokio_stream::iter(wire_lines(&pieces));
        Ok(Box::pin(sse::snapshots(body)))
    }
}
