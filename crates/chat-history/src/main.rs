use std::fs;
use std::io::{self, BufReader, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use chat_history::HistoryConfig;
use chat_history::replay::{self, Replayer};

#[derive(Parser, Debug)]
#[command(name = "chat-history")]
#[command(about = "Replay chat history batches against an in-memory store")]
#[command(version)]
struct Cli {
    /// Config file path (optional)
    #[arg(short, long, env = "CHAT_HISTORY_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a JSON replay script and print the results as JSON lines
    Replay {
        /// Script file, or `-` for stdin
        script: PathBuf,

        /// Page size for steps without a limit (overrides config)
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = HistoryConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&cli, &config);
    debug!(?config, "configuration loaded");

    match cli.command {
        Command::Replay { script, page_size } => {
            let page_size = page_size.unwrap_or(config.page_size);
            run_replay(&script, page_size)
        }
        Command::Config => {
            let rendered = config.to_toml().context("serializing configuration")?;
            print!("{rendered}");
            Ok(())
        }
    }
}

fn run_replay(script: &Path, page_size: usize) -> Result<()> {
    anyhow::ensure!(page_size > 0, "page size must be greater than zero");

    let steps = if script.as_os_str() == "-" {
        replay::parse_script(io::stdin().lock()).context("reading replay script from stdin")?
    } else {
        let file = fs::File::open(script)
            .with_context(|| format!("opening replay script {}", script.display()))?;
        replay::parse_script(BufReader::new(file))
            .with_context(|| format!("parsing replay script {}", script.display()))?
    };

    let stdout = io::stdout().lock();
    let mut replayer = Replayer::new(stdout, page_size);
    replayer.run(steps).context("replaying script")?;
    Ok(())
}

fn init_logging(cli: &Cli, config: &HistoryConfig) {
    let level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chat_history={level}")));

    // stdout carries replay output; logs go to stderr.
    if cli.json_logs || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(io::stderr().is_terminal()),
            )
            .try_init()
            .ok();
    }
}
