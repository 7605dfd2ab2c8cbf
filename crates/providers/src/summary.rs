//! One-shot summarization of a transcript.

use notechat_core::{ChatMessage, CompletionParams, Result};

use crate::Provider;
use crate::types::CompletionRequest;

/// The two-message request the summary is produced from.
///
/// Always non-streaming, whatever `params.stream` says.
pub fn summary_request(
    transcript_text: &str, instruction: &str, system_message: &str, params: &CompletionParams,
) -> CompletionRequest {
    let content = format!("{}\n\n{}", instruction.trim(), transcript_text.trim());
    CompletionRequest::new(
        vec![ChatMessage::system(system_message), ChatMessage::user(content)],
        params.clone().with_stream(false),
    )
}

/// Summarize a transcript; the reply is returned trimmed and unrendered
pub async fn summarize(
    provider: &dyn Provider, transcript_text: &str, instruction: &str, system_message: &str,
    params: &CompletionParams,
) -> Result<String> {
    let request = summary_request(transcript_text, instruction, system_message, params);
    tracing::info!(chars = transcript_text.chars().count(), "summarizing transcript");
    provider.complete(request).await
}
