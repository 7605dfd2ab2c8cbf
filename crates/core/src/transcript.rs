//! Transcript codec.
//!
//! The transcript text is the only durable form of a conversation. It holds
//! user/assistant pairs as tagged blocks and never contains the system
//! message, which is supplied again on every decode:
//!
//! ```text
//! [USER]
//! hello
//! [/USER]
//! [ASSISTANT]
//! hi there
//! [/ASSISTANT]
//!
//! ---
//!
//! [USER]
//! ...
//! ```
//!
//! Messages are rebuilt from the text on every turn, extended in memory and
//! encoded straight back. Only complete pairs survive the trip: a trailing
//! user turn with no reply is dropped by [`encode`], and unmatched blocks are
//! dropped by [`decode`].

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const USER_OPEN: &str = "[USER]";
pub const USER_CLOSE: &str = "[/USER]";
pub const ASSISTANT_OPEN: &str = "[ASSISTANT]";
pub const ASSISTANT_CLOSE: &str = "[/ASSISTANT]";

/// Separator placed between encoded pairs
pub const PAIR_SEPARATOR: &str = "\n\n---\n\n";

static USER_BLOCK: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?s)\[USER\](.*?)\[/USER\]").expect("static user block pattern"));

static ASSISTANT_BLOCK: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?s)\[ASSISTANT\](.*?)\[/ASSISTANT\]").expect("static assistant block pattern")
});

/// The role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Rebuild the message list from transcript text.
///
/// The result always starts with `system_message` and has length
/// `1 + 2 * min(user_blocks, assistant_blocks)`.
pub fn decode(text: &str, system_message: &str) -> Vec<ChatMessage> {
    let users = USER_BLOCK.captures_iter(text).map(|c| c[1].trim().to_string());
    let assistants = ASSISTANT_BLOCK.captures_iter(text).map(|c| c[1].trim().to_string());

    let mut messages = vec![ChatMessage::system(system_message)];
    for (user, assistant) in users.zip(assistants) {
        messages.push(ChatMessage::user(user));
        messages.push(ChatMessage::assistant(assistant));
    }
    messages
}

/// Encode a message list back into transcript text.
///
/// Index 0 is taken to be the system message and is not written. Messages
/// from index 1 onward are read as (user, assistant) pairs; an unpaired
/// trailing message is dropped.
pub fn encode(messages: &[ChatMessage]) -> String {
    let body = messages.get(1..).unwrap_or_default();
    let pairs = body.chunks_exact(2);

    if let [dropped] = pairs.remainder() {
        tracing::debug!(role = %dropped.role, "transcript encode dropped trailing unpaired message");
    }

    pairs
        .map(|pair| {
            format!(
                "{USER_OPEN}\n{}\n{USER_CLOSE}\n{ASSISTANT_OPEN}\n{}\n{ASSISTANT_CLOSE}",
                pair[0].content, pair[1].content
            )
        })
        .collect::<Vec<_>>()
        .join(PAIR_SEPARATOR)
}

/// The display list: every message except system messages, in order
pub fn project(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    messages.iter().filter(|m| m.role != Role::System).cloned().collect()
}
