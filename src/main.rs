//! Chat Stream CLI
//!
//! Sends one prompt to a configured provider and prints the reply as it
//! streams in

use anyhow::{Context, Result};
use chatstream::config::LoggingConfig;
use chatstream::{version_info, AppConfig, Message, Settings, StreamingClient};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "chatstream", version, about = "Stream a chat completion from a configured provider")]
struct Args {
    /// Configuration file (defaults to ~/.config/chatstream/chatstream.json, then ./chatstream.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider name from the configuration file
    #[arg(short, long)]
    provider: Option<String>,

    /// System instruction
    #[arg(short, long, default_value = "")]
    instruction: String,

    /// List configured providers and exit
    #[arg(long)]
    list: bool,

    /// Prompt text
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::new().context("Failed to load settings")?;
    init_logging(&settings.logging)?;
    debug!("{}", version_info());

    let app_config = match &args.config {
        Some(path) => AppConfig::load(path),
        None => AppConfig::load_default(),
    }
    .context("Failed to load provider configuration")?;

    if args.list {
        for name in app_config.provider_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let (name, provider) = app_config.select(args.provider.as_deref())?;
    let prompt = args.prompt.join(" ");
    if prompt.trim().is_empty() {
        anyhow::bail!("Prompt cannot be empty");
    }
    info!("📡 Streaming from provider '{}' ({})", name, provider.protocol);

    let client = StreamingClient::new(settings)?;

    // Ctrl-C cancels cooperatively; the monitor notices on its next tick
    let cancel = client.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    let result = client
        .stream_chat_completion(provider, &args.instruction, &[Message::user(prompt)], |delta| {
            // best effort; a closed stdout must not abort the call
            let _ = stdout.write_all(delta.as_bytes());
            let _ = stdout.flush();
        })
        .await;
    println!();

    match result {
        Ok(payload) => {
            eprintln!("[{} tokens from {}]", payload.total_tokens, payload.endpoint);
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("[cancelled]");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Initialize logging system
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if logging.format == "json" {
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(logging.level.as_str())
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .finish(),
        )
    } else {
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(logging.level.as_str())
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}
