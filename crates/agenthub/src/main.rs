//! A terminal front end for running `agenthub` presets.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use agenthub::core::{RunResult, TerminationReason, TranscriptSource};
use agenthub::{Preset, Session, SessionBuilder};
use agenthub_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";
const TOOL_OUTPUT_PREVIEW_LINES: usize = 8;

/// Runs an LLM agent that works in your terminal.
#[derive(Parser)]
#[command(name = "agenthub", version, long_about = None)]
struct Cli {
    /// Agent preset to use (swe, code-alchemist, scaffolder).
    #[arg(long, default_value_t = Preset::Swe)]
    preset: Preset,

    /// Extra tools to enable, separated by commas.
    #[arg(long, value_delimiter = ',')]
    tools: Vec<String>,

    /// Runs a single task and exits instead of starting a prompt.
    #[arg(short, long)]
    input: Option<String>,

    /// Maximum number of rounds per task.
    #[arg(long)]
    max_steps: Option<usize>,

    /// Working directory of the agent.
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// API key of the model service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Base URL of the model service.
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,

    /// Model name.
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,
}

enum SessionEvent {
    Transcript(String, TranscriptSource),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = OpenAIConfigBuilder::with_api_key(cli.api_key);
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(model) = cli.model {
        config = config.with_model(model);
    }
    let model_provider = OpenAIProvider::new(config.build());

    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let mut builder = SessionBuilder::with_model_provider(model_provider)
        .with_preset(cli.preset)
        .with_tools(cli.tools)
        .on_transcript(move |transcript, source| {
            event_tx
                .send(SessionEvent::Transcript(transcript.to_owned(), source))
                .ok();
        });
    if let Some(workdir) = cli.workdir {
        builder = builder.with_workdir(workdir);
    }
    if let Some(max_steps) = cli.max_steps {
        builder = builder.with_max_steps(max_steps);
    }
    let session = match builder.build() {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{}", err.bright_red());
            return ExitCode::FAILURE;
        }
    };
    info!(
        "started `{}` session in {}",
        session.preset(),
        session.current_dir().display()
    );

    match cli.input {
        Some(input) => run_once(&session, &input).await,
        None => {
            run_prompt_loop(&session, event_rx).await;
            ExitCode::SUCCESS
        }
    }
}

async fn run_once(session: &Session, input: &str) -> ExitCode {
    let result = match session.run(input).await {
        Ok(result) => result,
        Err(err) => {
            eprintln!("{}", err.bright_red());
            return ExitCode::FAILURE;
        }
    };
    println!("{}", result.summary());
    if matches!(result.reason, TerminationReason::OracleError { .. }) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run_prompt_loop(
    session: &Session,
    mut event_rx: mpsc::UnboundedReceiver<SessionEvent>,
) {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }
        let mut reply_rx = session.send_message(line);

        let mut progress_bar = None;

        loop {
            // Create a new progress bar if it has been finished.
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🤔 Thinking...");
                    progress_bar
                })
                .inc(1);

            let sleep = sleep(Duration::from_millis(100));
            let event = select! {
                biased;

                event = event_rx.recv() => event,
                result = &mut reply_rx => {
                    if let Some(progress_bar) = progress_bar.take() {
                        progress_bar.finish_and_clear();
                    }
                    match result {
                        Ok(result) => print_result(&result),
                        Err(_) => error!("the agent has stopped"),
                    }
                    break;
                }
                _ = sleep => {
                    continue;
                }
            };
            let Some(SessionEvent::Transcript(transcript, source)) = event
            else {
                return;
            };

            // Finish the progress bar before printing anything else.
            if let Some(progress_bar) = progress_bar.take() {
                progress_bar.finish_and_clear();
            }
            print_transcript(&transcript, source);
        }
    }
}

fn print_transcript(transcript: &str, source: TranscriptSource) {
    match source {
        TranscriptSource::Assistant => {
            println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                transcript.bright_white()
            );
        }
        TranscriptSource::Tool => {
            let bar = BAR_CHAR.bright_black();
            let mut lines = transcript.lines();
            for line in lines.by_ref().take(TOOL_OUTPUT_PREVIEW_LINES) {
                println!("{bar}{}", line.dimmed());
            }
            let rest = lines.count();
            if rest > 0 {
                println!("{bar}{}", format!("... {rest} more lines").dimmed());
            }
        }
        TranscriptSource::User => {}
    }
}

fn print_result(result: &RunResult) {
    let bar = if result.is_completed() {
        BAR_CHAR.bright_green().to_string()
    } else {
        BAR_CHAR.bright_yellow().to_string()
    };
    println!("{bar}{} ({} rounds)", result.reason, result.steps);
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
