use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nosa_capture::{list_interfaces, PcapOpener, PcapSettings};
use nosa_config::{CaptureConfig, NosaConfig};
use nosa_core::{Engine, EngineSettings};
use nosa_telemetry::{EventLogger, MetricsRecorder};
use tracing::{error, info};

#[derive(Parser)]
#[command(version, about = "Live packet capture with a query and streaming API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the capture API
    Serve(ServeArgs),
    /// List capture devices
    Interfaces,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Configuration file; defaults to config/nosa.yaml plus environment
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Interface to capture on
    #[arg(short, long)]
    pub interface: Option<String>,
    /// Listen address, e.g. 127.0.0.1:8000
    #[arg(short, long)]
    pub bind: Option<String>,
    /// Packets retained in memory
    #[arg(long)]
    pub capacity: Option<usize>,
    /// Start capturing immediately
    #[arg(long)]
    pub start: bool,
}

impl ServeArgs {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut NosaConfig) {
        if let Some(interface) = &self.interface {
            config.capture.interface = Some(interface.clone());
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(capacity) = self.capacity {
            config.store.capacity = capacity;
        }
    }
}

pub fn pcap_settings(config: &CaptureConfig) -> PcapSettings {
    PcapSettings {
        promiscuous: config.promiscuous,
        snaplen: i32::try_from(config.snaplen).unwrap_or(i32::MAX),
        read_timeout_ms: i32::try_from(config.read_timeout_ms).unwrap_or(i32::MAX),
        filter: config.filter.clone(),
    }
}

fn load_config(args: &ServeArgs) -> anyhow::Result<NosaConfig> {
    let mut config = match &args.config {
        Some(path) => NosaConfig::load_from_path(path),
        None => NosaConfig::load(),
    }
    .context("Failed to load configuration")?;

    args.apply(&mut config);
    config
        .validate_all()
        .context("Invalid command-line override")?;
    Ok(config)
}

pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    EventLogger::init(&config.telemetry.log_level, config.telemetry.ansi);

    let metrics = MetricsRecorder::new().context("Failed to register metrics")?;
    let opener = Arc::new(PcapOpener::new(pcap_settings(&config.capture)));
    let engine = Arc::new(Engine::new(
        EngineSettings::from_config(&config),
        opener,
        metrics,
    ));

    if args.start {
        engine.start().context("Failed to start capture")?;
    }

    info!(bind = %config.server.bind, "Starting nosa");
    let served = nosa_api::serve(Arc::clone(&engine), &config.server, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
    })
    .await;

    let engine_ref = Arc::clone(&engine);
    tokio::task::spawn_blocking(move || engine_ref.shutdown())
        .await
        .context("Capture shutdown task failed")?;

    served.context("API server failed")
}

pub fn interfaces() -> anyhow::Result<()> {
    let devices = list_interfaces().context("Failed to list capture devices")?;
    for device in devices {
        let addresses: Vec<String> = device.addresses.iter().map(|a| a.to_string()).collect();
        println!(
            "{:<16} {:<40} {}",
            device.name,
            device.description.unwrap_or_default(),
            addresses.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_serve_overrides() {
        let cli = Cli::try_parse_from([
            "nosa",
            "serve",
            "--interface",
            "eth0",
            "--bind",
            "127.0.0.1:9000",
            "--capacity",
            "50",
            "--start",
        ])
        .unwrap();

        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let mut config = NosaConfig::default();
        args.apply(&mut config);

        assert!(args.start);
        assert_eq!(config.capture.interface.as_deref(), Some("eth0"));
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.store.capacity, 50);
    }

    #[test]
    fn capture_config_maps_to_pcap_settings() {
        let config = CaptureConfig {
            filter: Some("tcp port 443".into()),
            ..Default::default()
        };
        let settings = pcap_settings(&config);
        assert_eq!(settings.snaplen, 65535);
        assert_eq!(settings.read_timeout_ms, 250);
        assert_eq!(settings.filter.as_deref(), Some("tcp port 443"));
    }

    #[test]
    fn interfaces_subcommand_parses() {
        let cli = Cli::try_parse_from(["nosa", "interfaces"]).unwrap();
        assert!(matches!(cli.command, Commands::Interfaces));
    }
}
