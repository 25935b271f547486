//! swall-ctl
//!
//! Command-line controller for the swall compositor.

mod render;
mod shell;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use swall_control::{CommandClient, Connection, RetryPolicy};
use swall_control_config::Config;
use tracing_subscriber::EnvFilter;

use crate::render::Action;

/// Environment variable overriding the configured control socket
const SOCKET_ENV: &str = "SWALL_CONTROL_SOCKET";

#[derive(Parser, Debug)]
#[command(name = "swall-ctl")]
#[command(about = "Control applications running on the swall compositor")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/swall/control.kdl")]
    config: String,

    /// Control socket path (overrides $SWALL_CONTROL_SOCKET and the config file)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct AreaArgs {
    #[arg(long)]
    x: u32,
    #[arg(long)]
    y: u32,
    #[arg(long)]
    width: u32,
    #[arg(long)]
    height: u32,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an application in a region of the screen
    Spawn {
        #[command(flatten)]
        area: AreaArgs,

        /// Executable followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Kill an application by pid
    Kill { pid: u32 },

    /// List running applications
    List,

    /// Show the compositor's screen size
    ScreenSize,

    /// Move an application's window
    Move {
        pid: u32,

        #[command(flatten)]
        area: AreaArgs,
    },

    /// Start an interactive session
    Shell,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();
    let config = swall_control_config::load_config(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let endpoint = resolve_endpoint(cli.socket, std::env::var_os(SOCKET_ENV), &config);
    let policy = RetryPolicy::default()
        .with_interval(Duration::from_millis(config.connect.retry_interval_ms))
        .with_max_attempts(config.connect.max_attempts);

    tracing::info!("Connecting to compositor at {}", endpoint.display());

    let mut connection = Connection::new(endpoint).with_chunk_size(config.receive.chunk_size);
    connection.open(&policy).await.into_diagnostic()?;
    let mut client = CommandClient::with_policy(connection, policy);

    let (action, result) = match cli.command {
        Commands::Spawn { area, command } => {
            let (executable, args) = command
                .split_first()
                .ok_or_else(|| miette::miette!("No executable given"))?;
            let result = client
                .spawn(area.x, area.y, area.width, area.height, executable.as_str(), args.iter().cloned())
                .await;
            (Action::Spawn, result)
        }
        Commands::Kill { pid } => (Action::Kill, client.kill(pid).await),
        Commands::List => (Action::List, client.list().await),
        Commands::ScreenSize => (Action::ScreenSize, client.screen_size().await),
        Commands::Move { pid, area } => {
            let result = client
                .move_window(pid, area.x, area.y, area.width, area.height)
                .await;
            (Action::Move, result)
        }
        Commands::Shell => return shell::run(&mut client).await,
    };

    let reply = result.into_diagnostic()?;
    client.close();

    match render::reply(action, &reply)? {
        Some(error) => Err(miette::miette!("Compositor rejected the command: {}", error)),
        None => Ok(()),
    }
}

/// Pick the control socket: `--socket`, then the environment, then the config file
fn resolve_endpoint(
    flag: Option<PathBuf>,
    env: Option<std::ffi::OsString>,
    config: &Config,
) -> PathBuf {
    flag.or_else(|| env.filter(|value| !value.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| config.endpoint.clone())
}
