//! Terminal rendering of the chat-bubble view.

use notechat_core::transcript::{ChatMessage, Role};
use notechat_core::{SystemPreset, think};
use owo_colors::OwoColorize;
use std::sync::LazyLock;

static DETAILS_BLOCK: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?s)<details><summary>(.*?)</summary>.*?</details>").expect("static details pattern")
});

/// Replace every reasoning section with a one-line marker
pub fn collapse_reasoning(text: &str) -> String {
    DETAILS_BLOCK.replace_all(&think::render(text), "[▸ $1]").into_owned()
}

/// Speaker label for a bubble
fn label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
        Role::System => "System",
    }
}

/// Plain bubble text, without colors
pub fn bubble_text(message: &ChatMessage) -> String {
    let body = match message.role {
        Role::Assistant => collapse_reasoning(&message.content),
        _ => message.content.clone(),
    };
    let indented: Vec<String> = body.lines().map(|line| format!("  {}", line)).collect();
    format!("{}:\n{}", label(message.role), indented.join("\n"))
}

/// Print the display list as alternating chat bubbles
pub fn print_bubbles(display: &[ChatMessage]) {
    if display.is_empty() {
        println!("{}", "(no messages yet)".dimmed());
        return;
    }

    for message in display {
        let text = bubble_text(message);
        let (head, body) = text.split_once('\n').unwrap_or((text.as_str(), ""));
        match message.role {
            Role::User => println!("{}", head.cyan().bold()),
            _ => println!("{}", head.green().bold()),
        }
        if !body.is_empty() {
            println!("{}", body);
        }
        println!();
    }
}

/// Preset listing, marking the active one
pub fn preset_lines(active: Option<SystemPreset>) -> Vec<String> {
    SystemPreset::all()
        .iter()
        .map(|preset| {
            let marker = if Some(*preset) == active { "*" } else { " " };
            format!("{} {:<9} {:?}", marker, preset.as_str(), preset.message())
        })
        .collect()
}
