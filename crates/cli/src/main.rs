mod chat;
mod interrupt;
mod render;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, CommandFactory, Parser, Subcommand};
use futures::StreamExt;
use notechat_agent::{ChatSession, ChatView};
use notechat_core::logging::{LoggingConfig, init_logging};
use notechat_core::{AppConfig, CompletionParams, Config, Error, SystemPreset, think};
use notechat_notion::NotionClient;
use notechat_providers::ProviderFactory;
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::interrupt::{Interrupt, interruptible};

/// notechat - chat with an OpenAI-compatible model and keep summaries in Notion
#[derive(Parser, Debug)]
#[command(name = "notechat")]
#[command(about = "Chat client for OpenAI-compatible endpoints with Notion summaries", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to notechat.toml (default: ./notechat.toml)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Transcript file holding the conversation
    #[arg(short, long, value_name = "PATH", default_value = "transcript.txt", global = true)]
    transcript: PathBuf,

    /// Replay scripted responses from a TOML file instead of calling the endpoint
    #[arg(long, value_name = "FILE", global = true)]
    mock: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    request: RequestArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Per-request overrides of the configured completion defaults
#[derive(Args, Debug, Default)]
struct RequestArgs {
    /// Model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Chat-completions endpoint URL
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Maximum tokens in the reply
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// Wait for the whole reply instead of streaming it
    #[arg(long, global = true)]
    no_stream: bool,

    /// System-message preset (default, no-think)
    #[arg(long, value_name = "NAME", global = true)]
    preset: Option<SystemPreset>,

    /// Literal system message; wins over --preset
    #[arg(long, value_name = "TEXT", global = true)]
    system: Option<String>,
}

impl RequestArgs {
    fn params(&self, config: &Config) -> Result<CompletionParams> {
        let mut params = config.completion_params();
        if let Some(model) = &self.model {
            params.model = model.clone();
        }
        if let Some(api_url) = &self.api_url {
            params.api_url = api_url.clone();
        }
        if let Some(temperature) = self.temperature {
            anyhow::ensure!(
                (0.0..=2.0).contains(&temperature),
                "temperature must be between 0.0 and 2.0, got {}",
                temperature
            );
            params.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            anyhow::ensure!(max_tokens > 0, "max-tokens must be greater than 0");
            params.max_tokens = max_tokens;
        }
        if self.no_stream {
            params.stream = false;
        }
        Ok(params)
    }

    fn system_message(&self, config: &Config) -> String {
        match (&self.system, self.preset) {
            (Some(system), _) => system.clone(),
            (None, Some(preset)) => preset.message().to_string(),
            (None, None) => config.system_message(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive chat on the transcript
    Chat,
    /// Send one message and print the reply
    Send {
        /// Message text
        #[arg(required = true, value_name = "MESSAGE")]
        message: Vec<String>,
    },
    /// Show the transcript as chat bubbles
    Show,
    /// Summarize the transcript
    Summarize {
        /// Also record the summary in Notion
        #[arg(short, long)]
        write: bool,
    },
    /// Work with the Notion database
    Notion {
        #[command(subcommand)]
        command: NotionCommands,
    },
    /// List system-message presets
    Presets,
    /// Write an example notechat.toml
    Init,
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum NotionCommands {
    /// Show the database name and properties
    Schema,
    /// List every page in the database
    Pages,
    /// Record a summary read from a file, or stdin with `-`
    Write {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Everything a command needs, resolved once at startup
pub(crate) struct App {
    pub(crate) app: AppConfig,
    pub(crate) session: ChatSession,
    pub(crate) params: CompletionParams,
    pub(crate) system_message: String,
    pub(crate) preset: Option<SystemPreset>,
    pub(crate) transcript_path: PathBuf,
    pub(crate) verbose: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("notechat.toml"));

    match &cli.command {
        Commands::Init => return cmd_init(&config_path),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "notechat", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let app_config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let mut logging = LoggingConfig::from(app_config.config.logging.clone());
    if cli.verbose {
        logging = logging.with_level("debug");
    }
    let privacy = logging.privacy.clone();
    let _guard = init_logging(Some(logging)).context("Failed to initialize logging")?;

    let params = cli.request.params(&app_config.config)?;
    let system_message = cli.request.system_message(&app_config.config);
    let preset = cli
        .request
        .preset
        .or_else(|| app_config.config.completion.preset.parse().ok());
    let provider = ProviderFactory::create(&app_config, cli.mock.as_deref()).context("Failed to create provider")?;

    if cli.verbose {
        println!("{} Using config: {}", "Info:".blue().bold(), config_path.display());
        println!("{} Endpoint: {}", "Info:".blue().bold(), params.api_url.cyan());
        println!("{} Model: {}", "Info:".blue().bold(), params.model.cyan());
        println!("{} Transcript: {}", "Info:".blue().bold(), cli.transcript.display());
    }

    let mut app = App {
        app: app_config,
        session: ChatSession::new(provider).with_privacy(privacy),
        params,
        system_message,
        preset,
        transcript_path: cli.transcript,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Chat => chat::run(&mut app).await?,
        Commands::Send { message } => {
            let interrupt = Interrupt::listen();
            cmd_send(&app, &message.join(" "), interrupt.token()).await?
        }
        Commands::Show => cmd_show(&app)?,
        Commands::Summarize { write } => cmd_summarize(&app, write).await?,
        Commands::Notion { command } => cmd_notion(&app, command).await?,
        Commands::Presets => cmd_presets(app.preset),
        Commands::Init | Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Write the example config unless one already exists
fn cmd_init(path: &Path) -> Result<()> {
    if path.exists() {
        println!("{} Config already exists at {}", "Warning:".yellow().bold(), path.display());
        return Ok(());
    }

    std::fs::write(path, Config::example()).context("Failed to create config")?;
    println!("{} Created config at {}", "Success:".green().bold(), path.display());
    Ok(())
}

/// Transcript text, or empty when the file does not exist yet
pub(crate) fn read_transcript(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read transcript {}", path.display()))
}

pub(crate) fn write_transcript(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("Failed to write transcript {}", path.display()))
}

/// Run one turn, printing the reply as it arrives.
///
/// Returns the final view, or `None` when `cancel` fired before the reply
/// was complete. That covers waiting for a whole non-streamed reply as well
/// as reading a stream.
pub(crate) async fn run_turn(
    app: &App, transcript_text: &str, input: &str, cancel: &CancellationToken,
) -> Result<Option<ChatView>> {
    let request = app.session.send(transcript_text, input, &app.system_message, &app.params);
    let Some(sent) = interruptible(cancel, request).await else {
        report_abandoned();
        return Ok(None);
    };
    let mut views = sent.context("Completion request failed")?;

    let mut printed = String::new();
    let mut last: Option<ChatView> = None;
    let mut stdout = std::io::stdout();
    println!("{}", "Assistant:".green().bold());

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Returning drops the stream, which closes the connection.
                println!();
                report_abandoned();
                return Ok(None);
            }
            next = views.next() => match next {
                Some(Ok(view)) => {
                    let reply = view.display.last().map(|m| m.content.clone()).unwrap_or_default();
                    if app.params.stream {
                        let fresh = reply.strip_prefix(printed.as_str()).unwrap_or(reply.as_str());
                        print!("{}", fresh);
                        stdout.flush().ok();
                    } else {
                        print!("{}", render::collapse_reasoning(&reply));
                    }
                    printed = reply;
                    last = Some(view);
                }
                Some(Err(e)) => {
                    println!();
                    return Err(e).context("Reply stream failed");
                }
                None => break,
            },
        }
    }

    println!();
    if app.params.stream && think::has_think_block(&printed) {
        println!("{}", "(reasoning shown raw while streaming; `show` collapses it)".dimmed());
    }
    Ok(last)
}

pub(crate) fn report_abandoned() {
    println!("{} Reply abandoned; transcript unchanged", "Info:".yellow().bold());
}

async fn cmd_send(app: &App, message: &str, cancel: &CancellationToken) -> Result<()> {
    let transcript_text = read_transcript(&app.transcript_path)?;
    if let Some(view) = run_turn(app, &transcript_text, message, cancel).await? {
        write_transcript(&app.transcript_path, &view.transcript)?;
        if app.verbose {
            println!("{} Transcript saved to {}", "Info:".blue().bold(), app.transcript_path.display());
        }
    }
    Ok(())
}

fn cmd_show(app: &App) -> Result<()> {
    let transcript_text = read_transcript(&app.transcript_path)?;
    let view = ChatView::from_transcript(&transcript_text, &app.system_message);
    render::print_bubbles(&view.display);
    Ok(())
}

pub(crate) async fn summarize(app: &App, transcript_text: &str) -> Result<String> {
    app.session
        .summarize(transcript_text, &app.app.config.summary.prompt, &app.system_message, &app.params)
        .await
        .context("Summary request failed")
}

async fn cmd_summarize(app: &App, write: bool) -> Result<()> {
    let transcript_text = read_transcript(&app.transcript_path)?;
    let summary = summarize(app, &transcript_text).await?;
    println!("{}", summary);

    if write {
        write_to_notion(&app.app, &summary).await?;
    }
    Ok(())
}

/// Record the summary; a rejected write is reported, not raised
pub(crate) async fn write_to_notion(app: &AppConfig, summary: &str) -> Result<()> {
    let client = NotionClient::from_config(app).context("Notion is not configured")?;
    match client.create_summary_page(summary, Local::now()).await {
        Ok(()) => println!("{} Summary written to Notion", "Success:".green().bold()),
        Err(Error::Http { body, .. }) => println!("{} Failed to write to Notion: {}", "Error:".red().bold(), body),
        Err(e) => return Err(e).context("Failed to write to Notion"),
    }
    Ok(())
}

async fn cmd_notion(app: &App, command: NotionCommands) -> Result<()> {
    match command {
        NotionCommands::Schema => {
            let client = NotionClient::from_config(&app.app).context("Notion is not configured")?;
            let schema = client.database_schema().await.context("Failed to fetch database schema")?;
            println!("{}", schema);
        }
        NotionCommands::Pages => {
            let client = NotionClient::from_config(&app.app).context("Notion is not configured")?;
            let pages = client.query_all_pages().await.context("Failed to query database")?;
            println!("{}", "Database pages:".green().bold());
            for page in &pages {
                println!("{}", page);
            }
        }
        NotionCommands::Write { file } => {
            let summary = read_summary(&file)?;
            write_to_notion(&app.app, summary.trim()).await?;
        }
    }
    Ok(())
}

/// Summary text from a file, or stdin for `-`
fn read_summary(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        return std::io::read_to_string(std::io::stdin()).context("Failed to read summary from stdin");
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read summary {}", file.display()))
}

fn cmd_presets(active: Option<SystemPreset>) {
    println!("{}", "System presets".green().bold().underline());
    for line in render::preset_lines(active) {
        println!("{}", line);
    }
}
