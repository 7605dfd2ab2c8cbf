//! Interactive chat loop.

use anyhow::Result;
use notechat_agent::ChatView;
use notechat_core::SystemPreset;
use owo_colors::OwoColorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::interrupt::{Interrupt, interruptible};
use crate::{App, read_transcript, render, report_abandoned, run_turn, summarize, write_to_notion, write_transcript};

/// A line starting with `/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Show,
    Summary,
    Notion,
    /// `/preset` alone lists presets
    Preset(Option<String>),
    Help,
    Quit,
    Unknown(String),
}

impl SlashCommand {
    /// `None` for ordinary chat input
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let rest = line.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim().to_string()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };

        Some(match name {
            "show" => SlashCommand::Show,
            "summary" => SlashCommand::Summary,
            "notion" => SlashCommand::Notion,
            "preset" => SlashCommand::Preset(arg),
            "help" | "?" => SlashCommand::Help,
            "quit" | "exit" | "q" => SlashCommand::Quit,
            // `/no_think` is a message some models read, not a command
            "no_think" => return None,
            other => SlashCommand::Unknown(other.to_string()),
        })
    }
}

const HELP: &str = "\
/show           show the conversation as chat bubbles
/summary        summarize the conversation
/notion         summarize and record the summary in Notion
/preset [name]  list presets or switch the system message
/quit           leave (Ctrl-D works too)
Ctrl-C while waiting for a reply or summary abandons it and keeps the transcript unchanged.";

fn prompt() {
    print!("{} ", ">".cyan().bold());
    std::io::stdout().flush().ok();
}

/// Read turns from stdin until `/quit`, end of input, or Ctrl-C at the prompt
pub async fn run(app: &mut App) -> Result<()> {
    let mut transcript_text = read_transcript(&app.transcript_path)?;
    let existing = ChatView::from_transcript(&transcript_text, &app.system_message);

    println!("{}", "notechat".green().bold().underline());
    println!(
        "{} {} earlier messages in {}; /help for commands",
        "Info:".blue().bold(),
        existing.display.len(),
        app.transcript_path.display()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        // One listener per command, covering the prompt and everything the command awaits
        let interrupt = Interrupt::listen();
        let cancel = interrupt.token();

        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = cancel.cancelled() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        if line.trim().is_empty() {
            continue;
        }

        match SlashCommand::parse(&line) {
            None => match run_turn(app, &transcript_text, &line, cancel).await {
                Ok(Some(view)) => {
                    transcript_text = view.transcript;
                    write_transcript(&app.transcript_path, &transcript_text)?;
                }
                Ok(None) => {}
                Err(e) => eprintln!("{} {:#}", "Error:".red().bold(), e),
            },
            Some(SlashCommand::Quit) => break,
            Some(SlashCommand::Help) => println!("{}", HELP),
            Some(SlashCommand::Show) => {
                let view = ChatView::from_transcript(&transcript_text, &app.system_message);
                render::print_bubbles(&view.display);
            }
            Some(SlashCommand::Summary) => match interruptible(cancel, summarize(app, &transcript_text)).await {
                Some(Ok(summary)) => println!("{}\n{}", "Summary:".green().bold(), summary),
                Some(Err(e)) => eprintln!("{} {:#}", "Error:".red().bold(), e),
                None => report_abandoned(),
            },
            Some(SlashCommand::Notion) => {
                let app: &App = app;
                let outcome = interruptible(cancel, async {
                    let summary = summarize(app, &transcript_text).await?;
                    println!("{}\n{}", "Summary:".green().bold(), summary);
                    write_to_notion(&app.app, &summary).await
                })
                .await;
                match outcome {
                    Some(Ok(())) => {}
                    Some(Err(e)) => eprintln!("{} {:#}", "Error:".red().bold(), e),
                    None => report_abandoned(),
                }
            }
            Some(SlashCommand::Preset(None)) => {
                for line in render::preset_lines(app.preset) {
                    println!("{}", line);
                }
            }
            Some(SlashCommand::Preset(Some(name))) => switch_preset(app, &name),
            Some(SlashCommand::Unknown(name)) => {
                println!("{} Unknown command /{}; try /help", "Warning:".yellow().bold(), name)
            }
        }
    }

    Ok(())
}

/// Unknown names clear the system message
fn switch_preset(app: &mut App, name: &str) {
    app.preset = name.parse::<SystemPreset>().ok();
    app.system_message = SystemPreset::message_for(name).to_string();
    match app.preset {
        Some(preset) => println!("{} System preset: {}", "Info:".blue().bold(), preset.as_str().cyan()),
        None => println!(
            "{} Unknown preset {}; system message cleared",
            "Warning:".yellow().bold(),
            name
        ),
    }
}
