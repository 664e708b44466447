use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use octoprint_monitor::{configure, to_lines, StatusCollector, TomlConfig};
use tracing_subscriber::{fmt::format::FmtSpan, FmtSubscriber};

mod cmd_once;
mod cmd_watch;

/// Show the state of an OctoPrint managed 3D printer in the terminal.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "octoprint-monitor")]
struct Cli {
    /// Config file to use; a missing file means all defaults.
    #[arg(long, short, default_value = "octoprint-monitor.toml")]
    config: PathBuf,

    /// verbosity of logging output [trace, debug, info, warn, error]
    #[arg(long, short, default_value = "info")]
    log_level: String,

    /// Start with the panel disabled; nothing is requested or drawn.
    #[arg(long)]
    disable: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the printer on a fixed interval and redraw the panel.
    Watch {
        /// Seconds between polls.
        #[arg(long, short, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Width of the panel in columns.
        #[arg(long, short, default_value_t = 80)]
        width: usize,

        /// Give up after this many polls in a row return garbage.
        #[arg(long, default_value_t = 3)]
        max_failures: usize,
    },

    /// Poll the printer once and print the panel.
    Once {
        /// Width of the panel in columns.
        #[arg(long, short, default_value_t = 80)]
        width: usize,

        /// Print the collected stats as json instead of the panel.
        #[arg(long)]
        json: bool,
    },
}

async fn handle_signals() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
            tracing::error!(error = format!("{:?}", e), "Failed to set up SIGINT handler");
            e
        })?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            tracing::error!(error = format!("{:?}", e), "Failed to set up SIGTERM handler");
            e
        })?;

        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await.map_err(|e| {
            tracing::error!(error = format!("{:?}", e), "Failed to set up Ctrl+C handler");
            anyhow::Error::new(e)
        })?;

        tracing::info!("received Ctrl+C (SIGINT)");
    }

    tracing::info!("exiting");
    std::process::exit(0);
}

fn load_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::info!(path = format!("{}", path.display()), "no config file, using defaults");
        return Ok(TomlConfig::default());
    }
    TomlConfig::from_file(path).map_err(|e| anyhow::anyhow!("failed to load {}: {}", path.display(), e))
}

/// Write the panel to stdout, one row per line.
fn print_panel(collector: &StatusCollector, width: usize) {
    for line in to_lines(&collector.msg_lines(width)) {
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::spawn(async { handle_signals().await });

    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::from_str(&cli.log_level)?)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cfg = load_config(&cli.config)?;
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("unable to determine the home directory"))?;

    let mut collector = StatusCollector::connect(configure(&cfg, &home))?;
    collector.set_disabled(cli.disable);

    match cli.command {
        Commands::Watch {
            interval,
            width,
            max_failures,
        } => cmd_watch::main(&mut collector, interval, width, max_failures).await,
        Commands::Once { width, json } => cmd_once::main(&mut collector, width, json).await,
    }
}
