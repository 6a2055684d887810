use std::path::PathBuf;

use biped_zenoh_runtime::config::{RobotConfig, SERVO_ENABLED};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Leg and neck motion runtime for the biped
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON robot configuration (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the servo board, overrides the config
    #[arg(short, long)]
    port: Option<String>,

    /// Run against simulated servos
    #[arg(long)]
    no_hardware: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match RobotConfig::load(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => RobotConfig::default(),
    };
    if let Some(port) = args.port {
        config.servo.port = port;
    }

    let hardware = SERVO_ENABLED && !args.no_hardware;
    if let Err(e) = biped_zenoh_runtime::runtime::run(config, hardware).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
