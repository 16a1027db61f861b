//! `murmur` command-line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use murmur::config::AppConfig;
use murmur::device::LogLights;
use murmur::dialogue::DialogueLoop;
use murmur::llm::ChatClient;
use murmur::memory::memory::{open_memory, DocumentMemory, KeyValueMemory, MemoryFormat};
use murmur::memory::storage::{FsStorage, StorageBackend};
use murmur::memory::MemoryError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status when the storage device cannot be mounted
const EXIT_STORAGE_UNAVAILABLE: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "murmur", version, about = "Push-to-talk voice assistant with SD card memory")]
struct Cli {
    /// Configuration file (defaults to ./murmur.toml if present)
    #[arg(long, env = "MURMUR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory standing in for the SD card
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Memory format, overriding the configuration
    #[arg(long, value_enum, global = true)]
    format: Option<FormatArg>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the dialogue loop; press Enter to toggle the power button
    Run {
        /// Start switched on instead of waiting for a press
        #[arg(long)]
        start_on: bool,
    },
    /// Print the recorded conversation
    History,
    /// Store a fact
    Remember { key: String, value: String },
    /// Look up a fact
    Recall { key: String },
    /// Print the raw memory contents
    Load,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    KeyValue,
    Document,
}

impl From<FormatArg> for MemoryFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::KeyValue => MemoryFormat::KeyValue,
            FormatArg::Document => MemoryFormat::Document,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            let unavailable = err
                .downcast_ref::<MemoryError>()
                .is_some_and(MemoryError::is_unavailable);
            if unavailable {
                ExitCode::from(EXIT_STORAGE_UNAVAILABLE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(root) = cli.storage_root {
        config.storage_root = root;
    }
    if let Some(format) = cli.format {
        config.memory.format = format.into();
    }

    let storage: Arc<dyn StorageBackend> = Arc::new(FsStorage::mount(&config.storage_root).await?);
    info!(root = %config.storage_root.display(), "SD card mounted");

    match cli.command {
        Command::Run { start_on } => run_dialogue(&config, storage, start_on).await?,
        Command::History => {
            let memory = open_memory(&config.memory, storage).await?;
            for turn in memory.history().await? {
                println!("{}: {}", turn.role, turn.message);
            }
        }
        Command::Remember { key, value } => {
            let mut memory = open_memory(&config.memory, storage).await?;
            memory.remember_fact(&key, &value).await?;
        }
        Command::Recall { key } => {
            let memory = open_memory(&config.memory, storage).await?;
            match memory.recall_fact(&key).await? {
                Some(value) => println!("{}", value),
                None => {
                    eprintln!("no fact stored under '{}'", key);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Load => print_memory(&config, storage).await?,
    }

    Ok(ExitCode::SUCCESS)
}

async fn print_memory(config: &AppConfig, storage: Arc<dyn StorageBackend>) -> Result<()> {
    match config.memory.format {
        MemoryFormat::KeyValue => {
            let memory = KeyValueMemory::new(storage, &config.memory);
            for line in memory.load().await? {
                println!("{}", line);
            }
        }
        MemoryFormat::Document => {
            let mut memory = DocumentMemory::new(storage, &config.memory);
            memory.load().await?;
            println!("{}", serde_json::to_string_pretty(memory.document())?);
        }
    }
    Ok(())
}

async fn run_dialogue(config: &AppConfig, storage: Arc<dyn StorageBackend>, start_on: bool) -> Result<()> {
    let memory = open_memory(&config.memory, storage).await?;
    let chat = ChatClient::new(config.llm.client_config()?)?;

    let mut dialogue = DialogueLoop::new(
        memory,
        Box::new(chat),
        Box::new(config.dialogue.speech_input()),
        Box::new(config.dialogue.speech_output()),
        Box::new(LogLights::new()),
    )
    .with_button(config.dialogue.button())
    .with_settings(config.dialogue.settings());

    if start_on {
        dialogue.press_button(Instant::now());
    }

    let mut presses = spawn_button_reader();
    info!("Press Enter to toggle the power button, Ctrl-C to quit");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    dialogue.run(&mut presses, shutdown).await;

    info!("Shutting down");
    Ok(())
}

/// Treat each line on stdin as a button press
fn spawn_button_reader() -> mpsc::Receiver<Instant> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if tx.send(Instant::now()).await.is_err() {
                break;
            }
        }
    });
    rx
}
