use futures::stream::{self, Stream, StreamExt};
use notechat_core::logging::{PrivacyConfig, redact_content};
use notechat_core::transcript::{self, ChatMessage};
use notechat_core::{CompletionParams, Result};
use notechat_providers::{CompletionRequest, Provider, summary};
use std::pin::Pin;
use std::sync::Arc;

/// One update of the three UI fields: transcript text, bubble list, input box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatView {
    pub transcript: String,
    pub display: Vec<ChatMessage>,
    pub input: String,
}

impl ChatView {
    /// View of an existing transcript, input untouched
    pub fn from_transcript(text: &str, system_message: &str) -> Self {
        let messages = transcript::decode(text, system_message);
        Self { transcript: text.to_string(), display: transcript::project(&messages), input: String::new() }
    }

    /// View of a message list after a turn: re-encoded, projected, input cleared
    fn from_messages(messages: &[ChatMessage]) -> Self {
        Self {
            transcript: transcript::encode(messages),
            display: transcript::project(messages),
            input: String::new(),
        }
    }
}

/// Views for one turn, in order. Dropping it abandons the reply.
pub type ViewStream = Pin<Box<dyn Stream<Item = Result<ChatView>> + Send>>;

/// Drives turns against a provider. Holds no conversation state of its own:
/// the transcript text passed in is the whole conversation.
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    privacy: PrivacyConfig,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider, privacy: PrivacyConfig::default() }
    }

    pub fn with_privacy(mut self, privacy: PrivacyConfig) -> Self {
        self.privacy = privacy;
        self
    }

    /// Run one turn.
    ///
    /// Streaming yields a view per reply snapshot with reasoning left raw;
    /// otherwise a single view with the rendered reply.
    pub async fn send(
        &self, transcript_text: &str, input: &str, system_message: &str, params: &CompletionParams,
    ) -> Result<ViewStream> {
        let mut messages = transcript::decode(transcript_text, system_message);
        let input = input.trim();
        messages.push(ChatMessage::user(input));

        tracing::debug!(
            input = %redact_content(input, &self.privacy),
            history = messages.len() - 1,
            stream = params.stream,
            "starting turn"
        );

        let request = CompletionRequest::new(messages.clone(), params.clone());

        if params.stream {
            let snapshots = self.provider.stream_completion(request).await?;
            let views = snapshots.map(move |snapshot| {
                snapshot.map(|reply| {
                    let mut turn = messages.clone();
                    turn.push(ChatMessage::assistant(reply));
                    ChatView::from_messages(&turn)
                })
            });
            Ok(Box::pin(views))
        } else {
            let reply = self.provider.request_once(request).await?;
            messages.push(ChatMessage::assistant(reply));
            let view = ChatView::from_messages(&messages);
            Ok(Box::pin(stream::iter(vec![Ok(view)])))
        }
    }

    /// Summarize a transcript with a single non-streaming request
    pub async fn summarize(
        &self, transcript_text: &str, instruction: &str, system_message: &str, params: &CompletionParams,
    ) -> Result<String> {
        let summary =
            summary::summarize(self.provider.as_ref(), transcript_text, instruction, system_message, params).await?;
        tracing::debug!(summary = %redact_content(&summary, &self.privacy), "summary ready");
        Ok(summary)
    }
}
