use futures::stream::Stream;
use notechat_core::{ChatMessage, CompletionParams, Result};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Growing reply text, one item per received increment.
///
/// Finite and not restartable. Dropping it releases the underlying
/// connection.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat-completion request: the full message list plus caller parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub params: CompletionParams,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>, params: CompletionParams) -> Self {
        Self { messages, params }
    }

    /// Request body in the chat-completions wire format
    pub fn wire_body(&self, stream: bool) -> WireRequest<'_> {
        WireRequest {
            model: &self.params.model,
            messages: &self.messages,
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
            stream,
        }
    }
}

/// `POST` body sent to the completion endpoint
#[derive(Debug, Serialize)]
pub struct WireRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Non-streaming response body
#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// `choices[0].message.content`, trimmed
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
    }
}

/// One streamed event
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_body_serialization() {
        let request = CompletionRequest::new(
            vec![ChatMessage::system("/no_think"), ChatMessage::user("Hello")],
            CompletionParams::default(),
        );

        let json = serde_json::to_value(request.wire_body(true)).unwrap();
        assert_eq!(json["model"], "Qwen3-32B");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hello");
        assert_eq!(json["max_tokens"], 12800);
        assert_eq!(json["stream"], true);
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_completion_response_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  Hi!\n"}}]}"#;
        let response: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_content(), Some("Hi!".to_string()));
    }

    #[test]
    fn test_completion_response_without_choices() {
        let response: CompletionResponse = serde_json::from_str(r#"{"object":"error"}"#).unwrap();
        assert_eq!(response.into_content(), None);
    }

    #[test]
    fn test_stream_chunk_delta_optional() {
        let chunk: StreamChunk = serde_json::from_str(r#"{"choices":[{"index":0,"finish_reason":"stop"}]}"#).unwrap();
        assert!(chunk.choices[0].delta.is_none());

        let chunk: StreamChunk = serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant","content":null}}]}"#).unwrap();
        assert!(chunk.choices[0].delta.as_ref().unwrap().content.is_none());
    }
}
