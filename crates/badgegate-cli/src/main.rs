#![forbid(unsafe_code)]

mod commands;
mod config;
mod console;

use anyhow::Context;
use badgegate_hardware::{
    AnyBadgeChannel, MockBadgeChannel, MockBadgeChannelHandle, ReaderLoop, SerialBadgeChannel,
};
use badgegate_kiosk::{Kiosk, KioskView};
use badgegate_storage::{DirectoryStore, Ledger};
use clap::{Parser, Subcommand};
use commands::AdminCommand;
use config::AppConfig;
use console::{ConsoleCommand, ConsoleView, HELP, parse_command};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const ACTION_QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Parser)]
#[command(name = "badgegate", version, about = "RFID badge access kiosk")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true, env = "BADGEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding users.json, access_logs.csv and user_images/.
    #[arg(long, global = true, env = "BADGEGATE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the kiosk with an operator console on stdin.
    Run {
        /// Serial device of the badge reader.
        #[arg(long, env = "BADGEGATE_PORT")]
        port: Option<String>,

        #[arg(long)]
        baud: Option<u32>,

        /// Use an in-process reader fed by the console `card` command.
        #[arg(long)]
        mock_reader: bool,

        /// How long a decision stays on screen, in milliseconds.
        #[arg(long)]
        idle_reset_ms: Option<u64>,
    },
    /// Enroll a badge, or replace an existing enrollment.
    Enroll {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        image: PathBuf,
    },
    /// Rename a badge holder and optionally replace the portrait.
    Edit {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete an enrollment.
    Remove {
        #[arg(long)]
        id: String,
    },
    /// List enrolled badges.
    List,
    /// Print the access logs.
    Logs,
    /// Copy the access logs to a file.
    ExportLogs { destination: PathBuf },
    /// Truncate the access logs.
    ClearLogs {
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = &cli.data_dir {
        config = config.with_data_dir(data_dir);
    }
    debug!(?config, "Configuration loaded");

    let admin = match cli.command {
        Command::Run {
            port,
            baud,
            mock_reader,
            idle_reset_ms,
        } => {
            if let Some(port) = port {
                config.serial.port = port;
            }
            if let Some(baud) = baud {
                config.serial.baud_rate = baud;
            }
            if let Some(ms) = idle_reset_ms {
                config.kiosk.idle_reset_ms = ms;
            }
            return run_kiosk(config, mock_reader).await;
        }
        Command::Enroll { id, name, image } => AdminCommand::Enroll { id, name, image },
        Command::Edit { id, name, image } => AdminCommand::Edit { id, name, image },
        Command::Remove { id } => AdminCommand::Remove { id },
        Command::List => AdminCommand::List,
        Command::Logs => AdminCommand::Logs,
        Command::ExportLogs { destination } => AdminCommand::ExportLogs { destination },
        Command::ClearLogs { yes } => AdminCommand::ClearLogs { confirmed: yes },
    };

    commands::execute(admin, &config.store, &mut io::stdout().lock())
}

async fn run_kiosk(config: AppConfig, mock_reader: bool) -> anyhow::Result<()> {
    let store = DirectoryStore::open(&config.store);
    let ledger = Ledger::new(&config.store.ledger_file);
    info!(
        directory = %store.path().display(),
        ledger = %ledger.path().display(),
        enrolled = store.len(),
        "Data files opened"
    );

    let (channel, mock) = open_channel(&config, mock_reader);
    let reader = channel.map(|channel| {
        ReaderLoop::new(channel, store.subscribe(), config.reader.clone()).start()
    });

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            signal.cancel();
        }
    });

    let (actions_tx, actions_rx) = mpsc::channel(ACTION_QUEUE_CAPACITY);
    spawn_console(actions_tx, mock, shutdown.clone())?;

    let mut view = ConsoleView::new(io::stdout());
    view.show_notice(HELP);

    Kiosk::new(store, ledger, view, config.kiosk)
        .run(reader, actions_rx, shutdown)
        .await;
    Ok(())
}

/// Open the configured reader. A reader that cannot be opened is logged and
/// the kiosk runs without one.
fn open_channel(
    config: &AppConfig,
    mock_reader: bool,
) -> (Option<AnyBadgeChannel>, Option<MockBadgeChannelHandle>) {
    if mock_reader {
        let (channel, handle) = MockBadgeChannel::with_name("console");
        return (Some(channel.into()), Some(handle));
    }

    match SerialBadgeChannel::open(&config.serial) {
        Ok(channel) => (Some(channel.into()), None),
        Err(e) => {
            warn!(
                error = %e,
                port = %config.serial.port,
                "Badge reader unavailable; continuing without it"
            );
            (None, None)
        }
    }
}

/// Read operator commands from stdin on a dedicated thread.
///
/// The action queue closes when stdin reaches end of file, which stops the
/// kiosk.
fn spawn_console(
    actions: mpsc::Sender<badgegate_kiosk::UiAction>,
    mock: Option<MockBadgeChannelHandle>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(ConsoleCommand::Action(action))) => {
                        if actions.blocking_send(action).is_err() {
                            break;
                        }
                    }
                    Ok(Some(ConsoleCommand::Present(token))) => match &mock {
                        Some(handle) => {
                            if let Err(e) = handle.present(&token) {
                                eprintln!("{e}");
                            }
                        }
                        None => eprintln!("'card' needs --mock-reader"),
                    },
                    Ok(Some(ConsoleCommand::Help)) => println!("{HELP}"),
                    Ok(Some(ConsoleCommand::Quit)) => {
                        shutdown.cancel();
                        break;
                    }
                    Err(message) => eprintln!("{message}"),
                }
            }
            debug!("Console input closed");
        })
        .context("spawning the console thread")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "badgegate",
            "--data-dir",
            "/srv/kiosk",
            "run",
            "--port",
            "/dev/ttyACM0",
            "--mock-reader",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/srv/kiosk")));
        match cli.command {
            Command::Run {
                port, mock_reader, ..
            } => {
                assert_eq!(port.as_deref(), Some("/dev/ttyACM0"));
                assert!(mock_reader);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_enroll_requires_image() {
        assert!(Cli::try_parse_from(["badgegate", "enroll", "--id", "A1B2", "--name", "Alice"]).is_err());
    }

    #[test]
    fn test_clear_logs_without_yes_parses_unconfirmed() {
        let cli = Cli::try_parse_from(["badgegate", "clear-logs"]).unwrap();
        assert!(matches!(cli.command, Command::ClearLogs { yes: false }));
    }
}
