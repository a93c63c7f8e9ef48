use std::{env, path::Path};

use clap::{Args, Parser, Subcommand};
use kitero::{
    capture::{self, Capture},
    config::{self, Config},
    poller::{self, Poller},
    source::{self, Source},
};
use kitero_stats::Engine;
use tokio::{runtime::Builder, sync::mpsc};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

// Updates waiting for the capture sink before the poller blocks.
const CAPTURE_BUFFER: usize = 16;

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Failed to load kitero config: {0}")]
    Config(#[from] config::Error),
    #[error("Snapshot source error: {0}")]
    Source(#[from] source::Error),
    #[error("Kitero poller returned an error: {0}")]
    Poller(#[from] poller::Error),
    #[error("Kitero capture returned an error: {0}")]
    Capture(#[from] capture::Error),
    #[error("Could not join the capture task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn default_config_path() -> String {
    "/etc/kitero/kitero.yaml".to_string()
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll snapshots and record their derived history
    Run(RunCommand),
    /// Validate configuration file and exit
    ConfigCheck(ConfigCheckCommand),
}

#[derive(Args)]
struct RunCommand {
    /// path on disk to the configuration file
    #[clap(long, default_value_t = default_config_path())]
    config_path: String,
}

#[derive(Args)]
struct ConfigCheckCommand {
    /// path on disk to the configuration file
    #[clap(long, default_value_t = default_config_path())]
    config_path: String,
}

fn get_config(config_path: &str) -> Result<Config, Error> {
    let config = if let Ok(env_var_value) = env::var("KITERO_CONFIG") {
        debug!("Using config from env var 'KITERO_CONFIG'");
        Config::from_yaml(&env_var_value)
    } else {
        debug!("Attempting to open configuration file at: {}", config_path);
        Config::load(Path::new(config_path))
    };
    config.map_err(|err| {
        error!("Configuration validation failed: {}", err);
        Error::Config(err)
    })
}

async fn inner_main(config: Config) -> Result<(), Error> {
    let (updates_tx, updates_rx) = mpsc::channel(CAPTURE_BUFFER);
    let capture = Capture::open(&config.capture, updates_rx).await?;
    let source = Source::open(&config.source).await?;
    let engine = Engine::new(&config.stats);
    let poller = Poller::new(engine, source, config.poll_period(), updates_tx);

    let capture_handle = tokio::spawn(capture.run());

    // Dropping the poller closes the update channel, letting the capture
    // drain and finish on its own.
    let res = tokio::select! {
        res = poller.run() => match res {
            Ok(ticks) => {
                info!(ticks, "poller finished");
                Ok(())
            }
            Err(err) => Err(Error::from(err)),
        },
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => {
                info!("shutdown signal received");
                Ok(())
            }
            Err(err) => Err(Error::from(err)),
        },
    };

    let lines = capture_handle.await??;
    debug!(lines, "capture joined");
    res
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting kitero {version}.");

    let cli = Cli::parse();
    let config_path = match cli.command {
        Commands::Run(run_cmd) => run_cmd.config_path,
        Commands::ConfigCheck(config_check_cmd) => {
            match get_config(&config_check_cmd.config_path) {
                Ok(_) => {
                    info!("Configuration file is valid");
                    std::process::exit(0)
                }
                Err(_) => std::process::exit(1),
            }
        }
    };
    let config = get_config(&config_path)?;

    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let res = runtime.block_on(inner_main(config));
    info!("Bye. :)");
    res
}
