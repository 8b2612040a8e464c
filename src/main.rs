//! Bridge daemon entry point
//!
//! Wires configuration, logging, and signal flags together, opens the two
//! collaborator handles, and hands everything to the bridge loop. Exit
//! status is success for a signal-triggered shutdown and failure for setup
//! or loop errors.

use log::{info, warn};
use sds011_bridge::aggregate::Aggregator;
use sds011_bridge::bridge::Bridge;
use sds011_bridge::broadcast::Broadcaster;
use sds011_bridge::config::BridgeConfig;
use sds011_bridge::error::Result;
use sds011_bridge::serial::SerialChannel;
use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use std::env;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "/etc/sds011-bridge.toml";

/// Parse the config path and verbosity from command line arguments.
///
/// Supports:
/// - `sds011-bridge <path>` (positional)
/// - `sds011-bridge --config <path>` (flag-based)
/// - `sds011-bridge -c <path>` (short flag)
/// - repeated `-v` to raise diagnostic detail
fn parse_args() -> (String, u8) {
    let args: Vec<String> = env::args().collect();
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut verbosity = 0u8;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => {
                config_path = args[i + 1].clone();
                i += 1;
            }
            "-v" => verbosity = verbosity.saturating_add(1),
            "-vv" => verbosity = verbosity.saturating_add(2),
            other if !other.starts_with('-') => config_path = other.to_string(),
            other => eprintln!("Ignoring unknown option '{}'", other),
        }
        i += 1;
    }

    (config_path, verbosity)
}

fn main() -> Result<()> {
    let (config_path, verbosity) = parse_args();

    let (config, config_missing) = if Path::new(&config_path).exists() {
        (BridgeConfig::from_file(&config_path)?, false)
    } else {
        (BridgeConfig::sds011_defaults(), true)
    };
    config.validate()?;

    // -v flags override the configured level; RUST_LOG overrides both.
    let default_filter = match verbosity {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    info!("sds011-bridge starting...");
    if config_missing {
        warn!("No config file at {}, using defaults", config_path);
    }
    if let Some(host) = &config.network.host {
        warn!(
            "Destination host '{}' accepted but unused: delivery is broadcast-only",
            host
        );
    }

    // Cooperative flags: set from signal-delivery context, read only by the
    // loop body.
    let cancel = Arc::new(AtomicBool::new(false));
    let hangup = Arc::new(AtomicBool::new(false));
    for sig in [SIGTERM, SIGINT, SIGQUIT] {
        signal_hook::flag::register(sig, Arc::clone(&cancel))?;
    }
    signal_hook::flag::register(SIGHUP, Arc::clone(&hangup))?;

    let serial = SerialChannel::open(&config.serial.device, config.serial.baud)?;
    let net = Broadcaster::open(config.network.port)?;
    let aggregator = Aggregator::new(config.window.samples)?;

    let mut bridge = Bridge::new(serial, net, aggregator, cancel, hangup);
    bridge.run()?;

    info!("sds011-bridge stopped");
    Ok(())
}
