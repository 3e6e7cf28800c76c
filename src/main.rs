//! # Cortex Link
//!
//! Bridges a cortex microcontroller's serial link to the navigation side.
//!
//! Reads status, behind-scan and pickup frames from the cortex, integrates
//! wheel odometry, samples the inertial sensor, and records everything as
//! JSON Lines telemetry. Pose estimates and pickup targets arrive as JSON
//! commands on stdin and are forwarded to the cortex.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cortex_link::commands::{apply, parse_command};
use cortex_link::config::{Config, LoggingConfig};
use cortex_link::imu::NullSensor;
use cortex_link::serial::CortexSerial;
use cortex_link::session::{CortexSender, Session, SessionSettings};
use cortex_link::telemetry::{records_for, TelemetryWriter};

/// Configuration file used when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Command lines buffered between the stdin thread and the sender
const COMMAND_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Parser)]
#[command(name = "cortex-link", version, about = "Cortex serial link and odometry bridge")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device, overrides the configuration file
    #[arg(short, long)]
    port: Option<String>,

    /// Log filter directive (e.g. "info", "cortex_link=debug")
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _log_guard = init_logging(&cli.log_level, &config.logging)?;

    info!("Cortex Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let serial = CortexSerial::open(&config.serial)
        .with_context(|| format!("opening cortex link at {}", config.serial.port))?;
    let (reader, writer) = serial.split();

    warn!("No inertial sensor driver configured, sampling zeros");
    let mut session = Session::new(
        reader,
        writer,
        NullSensor,
        SessionSettings::from_config(&config),
    );

    let mut telemetry = if config.telemetry.enabled {
        Some(TelemetryWriter::from_config(&config.telemetry).context("opening telemetry log")?)
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let lines = spawn_stdin_lines()?;
    let commands = spawn_command_reader(lines, session.sender(), cancel.clone());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down...");
                shutdown.cancel();
            }
            Err(e) => warn!("Unable to listen for Ctrl+C: {}", e),
        }
    });

    info!("Polling cortex link, press Ctrl+C to exit");
    let result = session
        .run(cancel.clone(), |outcome| {
            if let Some(writer) = telemetry.as_mut() {
                for record in records_for(&outcome) {
                    if let Err(e) = writer.write(&record) {
                        error!("Failed to write telemetry: {}", e);
                    }
                }
            }
        })
        .await;

    cancel.cancel();
    if let Err(e) = commands.await {
        warn!("Command reader ended abnormally: {}", e);
    }
    if let Some(writer) = telemetry.as_mut() {
        writer.flush().context("flushing telemetry")?;
    }

    result.context("cortex session failed")?;
    Ok(())
}

/// Load the configuration file and apply command-line overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("loading configuration from {}", DEFAULT_CONFIG_PATH))?,
        None => Config::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Install the stderr subscriber, plus a daily log file when configured.
///
/// The returned guard must live until exit so buffered file lines are
/// written.
fn init_logging(level: &str, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {:?}", level))?;

    let (file_layer, guard) = match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cortex-link.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("installing log subscriber")?;

    Ok(guard)
}

/// Read stdin lines on a dedicated thread.
///
/// A blocking stdin read cannot be cancelled, so it stays off the runtime;
/// the detached thread dies with the process.
fn spawn_stdin_lines() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("cortex-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read command input: {}", e);
                        break;
                    }
                }
            }
        })
        .context("spawning stdin reader thread")?;

    Ok(rx)
}

/// Forward JSON command lines to the cortex until input ends or the
/// session is cancelled
fn spawn_command_reader<W>(
    mut lines: mpsc::Receiver<String>,
    sender: CortexSender<W>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.recv() => line,
            };

            let Some(line) = line else {
                info!("Command input closed");
                break;
            };

            match parse_command(&line) {
                Ok(Some(command)) => {
                    if let Err(e) = apply(&command, &sender).await {
                        error!("Failed to send {:?}: {}", command, e);
                        cancel.cancel();
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
    })
}
