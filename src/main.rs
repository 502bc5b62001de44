use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hey_todo::daemon::build_synthesizer;
use hey_todo::view::TerminalView;
use hey_todo::voice::{AudioCapture, Synthesizer as _};
use hey_todo::{
    Config, Daemon, HttpTaskStore, ManualAction, SortMode, TaskFilter, TaskId, TaskStore, TaskView,
};

/// Hey To Do - manage a to-do list by voice
#[derive(Parser)]
#[command(name = "hey-todo", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/hey-todo/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Task store base URL
    #[arg(long)]
    store_url: Option<String>,

    /// Voice input backend (console or microphone)
    #[arg(long)]
    input: Option<String>,

    /// Start with voice paused (manual input only)
    #[arg(long, env = "HEY_TODO_DISABLE_VOICE")]
    disable_voice: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the task list
    List {
        /// Only tasks that are not done
        #[arg(long, conflicts_with = "completed")]
        pending: bool,
        /// Only tasks that are done
        #[arg(long)]
        completed: bool,
        /// Sort order (created, priority, category, due)
        #[arg(long)]
        sort: Option<String>,
    },
    /// Add a task
    Add {
        /// Task name
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Flip a task's done flag
    Toggle {
        /// Task id
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task id
        id: String,
    },
    /// Delete every task
    Clear,
    /// Run one spoken command without audio (e.g. "mark buy milk as done")
    Say {
        #[arg(required = true, num_args = 1..)]
        utterance: Vec<String>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,hey_todo=info",
        1 => "info,hey_todo=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_with_options(cli.config.as_deref(), cli.disable_voice)?;
    if let Some(url) = cli.store_url {
        config.store.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(input) = cli.input {
        config.voice.input = input.parse()?;
    }
    tracing::debug!(store = %config.store.base_url, input = ?config.voice.input, "loaded configuration");

    let Some(command) = cli.command else {
        let daemon = Daemon::new(config)?;
        daemon.run().await?;
        return Ok(());
    };

    match command {
        Command::List {
            pending,
            completed,
            sort,
        } => {
            let filter = if pending {
                TaskFilter::Pending
            } else if completed {
                TaskFilter::Completed
            } else {
                TaskFilter::All
            };
            let sort = sort.map(|s| s.parse::<SortMode>()).transpose()?.unwrap_or(config.sort);
            list(&config, filter, sort).await
        }
        Command::Add { name } => manual(config, ManualAction::Add(name.join(" "))).await,
        Command::Toggle { id } => manual(config, ManualAction::Toggle(TaskId::new(id))).await,
        Command::Delete { id } => manual(config, ManualAction::Delete(TaskId::new(id))).await,
        Command::Clear => manual(config, ManualAction::Clear).await,
        Command::Say { utterance } => {
            let handler = Daemon::new(config)?.handler();
            let utterance = utterance.join(" ");
            match handler.handle_transcript(&utterance).await {
                Some(command) => tracing::debug!(%command, "utterance handled"),
                None => println!("(nothing to do for an empty utterance)"),
            }
            Ok(())
        }
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

/// Print tasks without speaking
async fn list(config: &Config, filter: TaskFilter, sort: SortMode) -> anyhow::Result<()> {
    let store = HttpTaskStore::from_config(&config.store)?;
    let tasks = store.list(filter).await?;
    TerminalView::new(sort).render(&tasks);
    Ok(())
}

async fn manual(config: Config, action: ManualAction) -> anyhow::Result<()> {
    let handler = Daemon::new(config)?.handler();
    handler.run_manual(action).await;
    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = tokio::task::spawn_blocking(AudioCapture::start).await??;
    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    tokio::task::spawn_blocking(move || capture.stop()).await?;

    println!("\n---");
    println!("If the meter moved, your mic is working. Speech above ~0.03 RMS");
    println!("is picked up by the microphone input backend.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS ({:?})...", config.voice.tts_provider);
    build_synthesizer(config).speak(text).await?;
    println!("Done.");
    Ok(())
}
