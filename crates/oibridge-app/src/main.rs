//! oibridge: serve an Open Interface robot to TCP clients
//!
//! Usage: `oibridge [CONFIG] [--listen ADDR] [--simulate]`
//!
//! Without a CONFIG argument `oibridge.json` in the working directory is used
//! when present, otherwise built-in defaults.

use anyhow::Context;
use oibridge_core::prelude::*;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Configuration file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "oibridge.json";

/// Pick the configuration file: explicit first argument, then the default file if it exists
fn config_path(args: &[String], cwd: &Path) -> Option<PathBuf> {
    if let Some(first) = args.get(1).filter(|a| !a.starts_with("--")) {
        return Some(PathBuf::from(first));
    }
    let fallback = cwd.join(DEFAULT_CONFIG_FILE);
    fallback.exists().then_some(fallback)
}

/// Value following `flag`, if any
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn load_config(args: &[String]) -> anyhow::Result<BridgeConfig> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let mut config = match config_path(args, &cwd) {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            BridgeConfig::from_file(&path)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => {
            info!("using default configuration");
            BridgeConfig::default()
        }
    };

    if let Some(addr) = flag_value(args, "--listen") {
        info!(addr, "listen address overridden");
        config.listen_addr = addr.to_string();
    }
    if args.iter().any(|a| a == "--simulate") {
        info!("serving a simulated robot");
        config.device = DeviceConfig::Simulated { sensing: true };
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oibridge=info,oibridge_core=info".into()),
        )
        .init();

    info!(version = oibridge_core::VERSION, "oibridge starting");
    let args: Vec<String> = std::env::args().collect();
    let config = load_config(&args)?;

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received; shutting down"),
            Err(e) => warn!(error = %e, "cannot listen for interrupt"),
        }
        on_signal.cancel();
    });

    Supervisor::new(config, SensorTable::with_mock_values())
        .run(shutdown)
        .await
        .context("bridge stopped")?;

    info!("oibridge stopped");
    Ok(())
}
