use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use light_api::{DeviceAddress, DeviceClient, Probe};
use lighting::{LightingConfig, LightingController};
use tracing::info;
use voicelight::logging::{self, LoggingMode};
use voicelight::{InMemoryTargets, VoiceLight};

mod settings;

use settings::Settings;

/// Keeps LED devices in sync with your voice-chat status
#[derive(Parser, Debug)]
#[command(name = "voicelight-cli")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Timeout for device utility calls, in milliseconds
    #[arg(long, global = true, default_value = "3000")]
    pub timeout_ms: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow the voice client and drive the configured lights until Ctrl-C
    Run {
        /// Settings file (JSON)
        #[arg(short, long)]
        settings: PathBuf,
    },
    /// Check whether a device answers
    Probe { address: String },
    /// List a device's usable effects
    Effects { address: String },
    /// Print a device's current state
    State { address: String },
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        logging::validate_level(&self.log_level)?;
        if self.timeout_ms == 0 {
            anyhow::bail!("Timeout must be positive");
        }
        Ok(())
    }

    fn logging_mode(&self) -> LoggingMode {
        if self.json_logs {
            LoggingMode::Json
        } else {
            LoggingMode::Development
        }
    }

    fn lighting_config(&self) -> LightingConfig {
        let timeout = Duration::from_millis(self.timeout_ms);
        LightingConfig::new()
            .with_request_timeout(timeout)
            .with_probe_timeout(timeout)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;
    logging::init_logging_with_level(args.logging_mode(), &args.log_level)
        .context("Failed to initialize logging")?;

    match &args.command {
        Command::Run { settings } => run(settings).await,
        Command::Probe { address } => probe(&args, address).await,
        Command::Effects { address } => effects(&args, address).await,
        Command::State { address } => state(&args, address).await,
    }
}

async fn run(path: &Path) -> Result<()> {
    let settings = Settings::load(path)?;
    let config = settings.to_config()?;
    let targets = Arc::new(InMemoryTargets::new(settings.devices, settings.zones));

    let (app, mut notifications) = VoiceLight::start(config, targets)
        .await
        .context("Failed to start voicelight")?;
    info!("Running, press Ctrl-C to stop");

    loop {
        tokio::select! {
            notification = notifications.recv() => match notification {
                Some(notification) => println!("{}", serde_json::to_string(&notification)?),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Shutting down");
                break;
            }
        }
    }

    app.shutdown().await.context("Failed to shut down cleanly")?;
    Ok(())
}

async fn probe(args: &Args, address: &str) -> Result<()> {
    let parsed = DeviceAddress::parse(address)?;
    let timeout = Duration::from_millis(args.timeout_ms);
    let info = DeviceClient::new()
        .execute(&parsed, &Probe, timeout)
        .await
        .with_context(|| format!("{} did not answer", parsed))?;

    println!(
        "{} is online: {} (firmware {})",
        parsed,
        info.name.as_deref().unwrap_or("unnamed"),
        info.ver.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

async fn effects(args: &Args, address: &str) -> Result<()> {
    let controller = LightingController::new(args.lighting_config())?;
    let effects = controller
        .effects(address)
        .await
        .with_context(|| format!("Failed to read effects of {}", address))?;

    for effect in effects {
        println!("{:>3}  {}", effect.id, effect.name);
    }
    Ok(())
}

async fn state(args: &Args, address: &str) -> Result<()> {
    let controller = LightingController::new(args.lighting_config())?;
    let state = controller
        .current_state(address)
        .await
        .with_context(|| format!("Failed to read state of {}", address))?;

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
