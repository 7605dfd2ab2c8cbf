//! Reasoning-block rendering for finished assistant replies.
//!
//! Only complete replies go through [`render`]. Streaming snapshots are
//! shown raw, so partial tags never have to be parsed.

use std::sync::LazyLock;

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

/// Visible label of the collapsed section
pub const REASONING_LABEL: &str = "Reasoning";

static THINK_BLOCK: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?s)<think>(.*?)</think>").expect("static think block pattern"));

/// Replace every `<think>…</think>` span with a collapsible section
pub fn render(text: &str) -> String {
    THINK_BLOCK
        .replace_all(text, |caps: &regex::Captures| {
            format!(
                "<details><summary>{REASONING_LABEL}</summary>\n\n{}\n\n</details>",
                caps[1].trim()
            )
        })
        .into_owned()
}

/// Whether `text` holds at least one complete reasoning span
pub fn has_think_block(text: &str) -> bool {
    THINK_BLOCK.is_match(text)
}
