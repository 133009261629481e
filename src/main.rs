// MIT License - Copyright (c) 2026 Peter Wright
// mochad to MQTT bridge daemon

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use mochad_bridge::constants::{
    DEFAULT_CONTROLLER_HOST, DEFAULT_CONTROLLER_PORT, DEFAULT_MQTT_DISCOVERY,
};
use mochad_bridge::dispatch::{MqttDispatcher, MqttSession, TopicScheme};
use mochad_bridge::transport::TcpLineSource;
use mochad_bridge::{
    BridgeConfig, BrokerUri, ConnectionWorker, DiscoveryTarget, HealthWatchdog, HouseCodes,
    PayloadStyle, Shutdown, ShutdownState,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "mochad2mqtt")]
#[command(about = "Publish X10 events from mochad to an MQTT broker")]
#[command(version)]
struct Cli {
    /// Broker URI: mqtt://host[:port][,user=USER,pass=PASS]
    dispatch_uri: Option<String>,

    /// mochad host
    #[arg(short = 's', long)]
    server: Option<String>,

    /// mochad status port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Legacy topics and {"func": ...} payloads, no discovery
    #[arg(short = 'l', long)]
    legacy: bool,

    /// Home Assistant discovery as PREFIX/ID
    #[arg(short = 'm', long = "mqtt-discovery")]
    mqtt_discovery: Option<String>,

    /// CA bundle for TLS to the broker
    #[arg(long)]
    cafile: Option<PathBuf>,

    /// House codes to forward, e.g. "ABC"
    #[arg(short = 'c', long)]
    housecodes: Option<String>,

    /// Optional TOML file supplying any option not given on the command line
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for a rotating mochad2mqtt.log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config file
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    dispatch_uri: Option<String>,
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    legacy: bool,
    #[serde(default)]
    mqtt_discovery: Option<String>,
    #[serde(default)]
    cafile: Option<PathBuf>,
    #[serde(default)]
    housecodes: Option<String>,
    #[serde(default)]
    log_file: Option<PathBuf>,
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Command-line values win; the file fills the gaps.
fn build_bridge_config(cli: &Cli, file: &FileConfig) -> Result<BridgeConfig> {
    let dispatch_uri = cli
        .dispatch_uri
        .as_deref()
        .or(file.dispatch_uri.as_deref())
        .context("No dispatch URI given (mqtt://host[:port])")?;
    let broker = BrokerUri::parse(dispatch_uri)?;

    let style = if cli.legacy || file.legacy {
        PayloadStyle::Legacy
    } else {
        PayloadStyle::Discovery
    };

    let discovery = DiscoveryTarget::parse(
        cli.mqtt_discovery
            .as_deref()
            .or(file.mqtt_discovery.as_deref())
            .unwrap_or(DEFAULT_MQTT_DISCOVERY),
    )?;

    let house_codes = match cli.housecodes.as_deref().or(file.housecodes.as_deref()) {
        Some(codes) => HouseCodes::parse(codes)?,
        None => HouseCodes::default(),
    };

    Ok(BridgeConfig::builder()
        .controller_host(
            cli.server
                .as_deref()
                .or(file.server.as_deref())
                .unwrap_or(DEFAULT_CONTROLLER_HOST),
        )
        .controller_port(cli.port.or(file.port).unwrap_or(DEFAULT_CONTROLLER_PORT))
        .broker(broker)
        .ca_file(cli.cafile.clone().or_else(|| file.cafile.clone()))
        .house_codes(house_codes)
        .style(style)
        .discovery(discovery)
        .build())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Console logging, plus a daily-rotated file when `log_dir` is set. The
/// returned guard flushes the file writer and must outlive the process work.
fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=mochad_bridge=trace).
    // Default: info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    let journal = std::env::var_os("JOURNAL_STREAM").is_some();
    let console_plain = (!journal).then(fmt::layer);
    let console_journal = journal.then(|| fmt::layer().without_time());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = RollingBuilder::new()
                .rotation(Rotation::DAILY)
                .filename_prefix("mochad2mqtt.log")
                .max_log_files(3)
                .build(dir)
                .with_context(|| format!("Failed to open log directory {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_plain)
        .with(console_journal)
        .with(file_layer)
        .init();

    Ok(guard)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let file = load_file_config(cli.config.as_deref())?;
    let _log_guard = init_logging(cli.log_file.as_deref().or(file.log_file.as_deref()))?;

    let config = build_bridge_config(&cli, &file)?;
    info!(
        "mochad host: {}:{}, house codes: {}, style: {:?}",
        config.controller_host,
        config.controller_port,
        config.house_codes.as_str(),
        config.style
    );

    let mut sigterm = signal(SignalKind::terminate())?;
    let shutdown = Shutdown::new();

    let session = match MqttSession::connect(&config, shutdown.clone()).await {
        Ok(session) => session,
        Err(e) if e.is_fatal() => {
            error!("{e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Failed to start MQTT session"),
    };
    let dispatcher = Arc::new(MqttDispatcher::new(
        session.client(),
        TopicScheme::from_config(&config),
        config.discovery_settle,
    ));

    // Task 1: broker outage watchdog
    let watchdog_handle = tokio::spawn(
        HealthWatchdog::new(
            session.health(),
            shutdown.clone(),
            config.reconnect_limit,
            config.poll_interval,
        )
        .run(),
    );

    // Task 2: mochad reader
    let source = TcpLineSource::new(config.controller_host.clone(), config.controller_port);
    let worker = ConnectionWorker::new(source, dispatcher, &config, shutdown.clone());
    let worker_handle = tokio::spawn(worker.run());

    info!("mochad2mqtt running. Send SIGINT/SIGTERM to stop.");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
            shutdown.request();
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
            shutdown.request();
        }
        _ = shutdown.triggered() => {}
    }

    // Abort tasks
    worker_handle.abort();
    watchdog_handle.abort();
    session.disconnect().await;
    drop(session);

    match shutdown.state() {
        ShutdownState::Fatal(reason) => {
            warn!("Exiting after fatal error: {reason}");
            Ok(ExitCode::FAILURE)
        }
        _ => {
            info!("Shutdown complete");
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mochad2mqtt").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = build_bridge_config(&cli(&["mqtt://broker"]), &FileConfig::default()).unwrap();
        assert_eq!(config.controller_host, "127.0.0.1");
        assert_eq!(config.controller_port, 1099);
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.style, PayloadStyle::Discovery);
        assert_eq!(config.discovery.prefix, "homeassistant");
        assert_eq!(config.discovery.ha_id, "5A0uqYZF2_mochad_dispatch");
        assert_eq!(config.house_codes.as_str(), "ABCDEFGHIJKLMNOP");
        assert!(config.ca_file.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let config = build_bridge_config(
            &cli(&[
                "-s", "x10.lan", "-p", "2000", "-l", "-c", "ab", "--cafile", "/etc/ca.pem",
                "mqtt://broker:8883,user=u,pass=p",
            ]),
            &FileConfig::default(),
        )
        .unwrap();
        assert_eq!(config.controller_host, "x10.lan");
        assert_eq!(config.controller_port, 2000);
        assert_eq!(config.style, PayloadStyle::Legacy);
        assert_eq!(config.house_codes.as_str(), "AB");
        assert_eq!(config.ca_file, Some(PathBuf::from("/etc/ca.pem")));
        assert_eq!(
            config.broker.credentials,
            Some(("u".to_string(), "p".to_string()))
        );
    }

    #[test]
    fn test_file_fills_gaps() {
        let file: FileConfig = toml::from_str(
            r#"
            dispatch_uri = "mqtt://file-broker:1884"
            server = "file-host"
            mqtt_discovery = "ha/house"
            housecodes = "P"
            "#,
        )
        .unwrap();
        let config = build_bridge_config(&cli(&["-s", "cli-host"]), &file).unwrap();
        assert_eq!(config.controller_host, "cli-host");
        assert_eq!(config.broker.host, "file-broker");
        assert_eq!(config.broker.port, 1884);
        assert_eq!(config.discovery.prefix, "ha");
        assert_eq!(config.discovery.ha_id, "house");
        assert_eq!(config.house_codes.as_str(), "P");
    }

    #[test]
    fn test_missing_dispatch_uri() {
        assert!(build_bridge_config(&cli(&[]), &FileConfig::default()).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        let file = FileConfig::default();
        assert!(build_bridge_config(&cli(&["http://broker"]), &file).is_err());
        assert!(build_bridge_config(&cli(&["-c", "XYZ", "mqtt://broker"]), &file).is_err());
        assert!(build_bridge_config(&cli(&["-m", "nope", "mqtt://broker"]), &file).is_err());
    }

    #[test]
    fn test_unknown_file_key() {
        assert!(toml::from_str::<FileConfig>("brokr = \"x\"").is_err());
    }
}
