//! uhf-scan - poll a serial UHF RFID reader and forward new tags.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use uhf_scan::{available_ports, HttpNotifier, LogSink, ScanConfig, ScanLoop, SerialTransport};

/// Poll a serial UHF RFID reader and forward new tags.
#[derive(Parser)]
#[command(name = "uhf-scan", version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List candidate serial ports
    Ports {
        /// Override the configured port filter
        #[arg(long)]
        filter: Option<String>,
        /// Show every port, ignoring the filter
        #[arg(long)]
        all: bool,
    },
    /// Scan until stopped by a disconnect
    Scan {
        /// Serial device, e.g. COM3 or /dev/ttyUSB0
        #[arg(long)]
        port: String,
        /// Position number sent with every tag
        #[arg(long)]
        position: String,
        /// Forward tags to this URL (enables the notifier)
        #[arg(long)]
        notify_url: Option<String>,
        /// Delay between polling cycles
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default()))
        .init();

    let config = match &cli.config {
        Some(path) => match ScanConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Config {:?}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => ScanConfig::default(),
    };

    match cli.command {
        Command::Ports { filter, all } => list_ports(&config, filter, all),
        Command::Scan {
            port,
            position,
            notify_url,
            interval_ms,
        } => scan(config, &port, &position, notify_url, interval_ms),
    }
}

/// `RUST_LOG` directives, falling back to INFO when none are given
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

fn list_ports(config: &ScanConfig, filter: Option<String>, all: bool) -> ExitCode {
    let filter = if all {
        String::new()
    } else {
        filter.unwrap_or_else(|| config.reader.port_filter.clone())
    };

    match available_ports(&filter) {
        Ok(ports) if ports.is_empty() => {
            warn!("No port detected");
            ExitCode::SUCCESS
        }
        Ok(ports) => {
            for port in ports {
                println!("{}", port);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to enumerate ports: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn scan(
    mut config: ScanConfig,
    port: &str,
    position: &str,
    notify_url: Option<String>,
    interval_ms: Option<u64>,
) -> ExitCode {
    if let Some(url) = notify_url {
        config.notifier.enabled = true;
        config.notifier.url = url;
    }
    if let Some(ms) = interval_ms {
        config.reader.scan_interval_ms = ms;
    }
    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let mut scanner: ScanLoop<SerialTransport> = match ScanLoop::new(config.scan_options(), Arc::new(LogSink)) {
        Ok(scanner) => scanner,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.notifier.enabled {
        match HttpNotifier::new(config.notifier.url.clone(), config.notify_timeout()) {
            Ok(notifier) => {
                let notifier = notifier.with_params(
                    config.notifier.position_param.clone(),
                    config.notifier.uid_param.clone(),
                );
                scanner.set_notifier(Some(Box::new(notifier)));
                info!("Forwarding tags to {}", config.notifier.url);
            }
            Err(e) => {
                error!("Notifier setup failed: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(e) = scanner.configure_serial(port, position) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = scanner.start() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    while scanner.is_scanning() {
        thread::sleep(Duration::from_millis(200));
    }
    info!("Last accepted tag: {}", scanner.last_uid());
    scanner.close();
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter("").to_string(), "info");
    }

    #[test]
    fn test_log_filter_keeps_rust_log_level() {
        assert_eq!(log_filter("debug").to_string(), "debug");
        assert_eq!(log_filter("uhf_scan=trace").to_string(), "uhf_scan=trace");
    }
}
