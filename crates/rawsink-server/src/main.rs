//! rawsink server: entry point.
//!
//! Captures every keyboard's raw input on this Windows machine and
//! re-publishes each key press and release as an 11-byte UDP broadcast, so
//! any listener on the LAN can follow the physical keyboards in real time.
//!
//! # Usage
//!
//! ```text
//! rawsink-server [OPTIONS]
//!
//! Options:
//!       --local-network-interface-preference <PATTERN>
//!                                  Local IPv4 wildcard pattern [default: *.*.*.*]
//!   -p, --broadcast-port <PORT>    UDP broadcast port [default: 5973]
//!   -v, --verbose                  Log every sent event
//!       --config <PATH>            Config file (default: platform config dir)
//!       --list-devices             Print the attached input devices and exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable            | Description                         |
//! |---------------------|-------------------------------------|
//! | `RAWSINK_INTERFACE` | Local interface wildcard pattern    |
//! | `RAWSINK_PORT`      | UDP broadcast port                  |
//! | `RAWSINK_CONFIG`    | Path to the TOML config file        |
//! | `RUST_LOG`          | `tracing` filter (overrides config) |
//!
//! Command-line flags beat environment variables, which beat the config file,
//! which beats the built-in defaults.
//!
//! # Startup sequence
//!
//! ```text
//! parse CLI ─▶ load config ─▶ init logging ─▶ wait for a local IPv4 address
//!   ─▶ bind broadcaster ─▶ spawn drain thread ─▶ run capture message loop
//!   ─▶ (loop ends / Ctrl+C) ─▶ stop drain ─▶ close broadcaster
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rawsink_core::select_local_address;
use rawsink_server::application::{DrainOptions, Pipeline};
use rawsink_server::infrastructure::input_capture::{describe_devices, platform_capture, StopSignal};
use rawsink_server::infrastructure::network::broadcaster::UdpBroadcaster;
use rawsink_server::infrastructure::network::local_address::{
    discover_local_addresses, wait_for_local_addresses, AddressError, ADDRESS_RETRY_INTERVAL,
};
use rawsink_server::infrastructure::storage::config::{load_config, SinkConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Raw keyboard input to UDP broadcast bridge.
///
/// Every option left unset falls back to the config file, then to the
/// built-in default.
#[derive(Debug, Parser)]
#[command(
    name = "rawsink-server",
    about = "Broadcasts raw keyboard key transitions on the local network",
    version
)]
struct Cli {
    /// Wildcard pattern selecting the local IPv4 address to broadcast from,
    /// e.g. `192.168.*.*` [default: *.*.*.*].
    #[arg(long, env = "RAWSINK_INTERFACE")]
    local_network_interface_preference: Option<String>,

    /// UDP port the key events are broadcast to [default: 5973].
    #[arg(short = 'p', long, env = "RAWSINK_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    broadcast_port: Option<u16>,

    /// Log every sent event.
    #[arg(short, long)]
    verbose: bool,

    /// Path to the TOML config file.
    #[arg(long, env = "RAWSINK_CONFIG")]
    config: Option<PathBuf>,

    /// Print the attached input devices and exit.
    #[arg(long)]
    list_devices: bool,
}

impl Cli {
    /// Applies the command-line overrides on top of `file`.
    fn into_sink_config(self, mut file: SinkConfig) -> SinkConfig {
        if let Some(pattern) = self.local_network_interface_preference {
            file.network.interface_preference = pattern;
        }
        if let Some(port) = self.broadcast_port {
            file.network.broadcast_port = port;
        }
        if self.verbose {
            file.logging.verbose = true;
        }
        file
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let list_devices = cli.list_devices;

    let file_config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let config = cli.into_sink_config(file_config);
    config.validate().context("invalid configuration")?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins when set; otherwise the configured level applies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .init();

    if list_devices {
        let devices = describe_devices().context("failed to list input devices")?;
        for device in &devices {
            println!("{device}");
        }
        return Ok(());
    }

    run(config).await
}

async fn run(config: SinkConfig) -> anyhow::Result<()> {
    let verbose = config.logging.verbose;
    let pattern = config.interface_pattern()?;
    let capture = platform_capture(verbose).context("raw input capture is not available")?;

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    //
    // Ctrl+C clears `running` (stops address discovery and the drain loop) and
    // asks the capture message loop to quit.
    let running = Arc::new(AtomicBool::new(true));
    let stop = StopSignal::new();
    {
        let running = Arc::clone(&running);
        let stop = stop.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received Ctrl+C, shutting down");
                    running.store(false, Ordering::Relaxed);
                    stop.request_stop();
                }
                Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
            }
        });
    }

    // ── Local address ─────────────────────────────────────────────────────────
    let discover = || tokio::task::block_in_place(discover_local_addresses);
    let Some(addresses) = wait_for_local_addresses(discover, &running, ADDRESS_RETRY_INTERVAL).await else {
        info!("shutdown requested before a local address was found");
        return Ok(());
    };
    let local = select_local_address(&addresses, &pattern).ok_or(AddressError::NoAddress)?;
    info!("Local address: {local}");

    let broadcaster = UdpBroadcaster::new(local, config.network.broadcast_port)
        .with_context(|| format!("failed to open broadcast socket on {local}"))?;
    info!("Broadcasting key events to {}", broadcaster.destination());

    // ── Pipeline ──────────────────────────────────────────────────────────────
    let options = DrainOptions {
        verbose,
        ..DrainOptions::default()
    };
    let (producer, drain) = Pipeline::new(broadcaster, options).split();
    let drain_handle = drain
        .spawn(Arc::clone(&running))
        .context("failed to start drain thread")?;

    info!("Input sink setup, listening...");

    // The capture loop blocks its thread until WM_QUIT or an OS error.
    let capture_stop = stop.clone();
    let capture_result = tokio::task::spawn_blocking(move || capture.run(&producer, &capture_stop))
        .await
        .context("capture thread panicked")?;

    running.store(false, Ordering::Relaxed);
    let outcome = tokio::task::spawn_blocking(move || drain_handle.join())
        .await
        .context("failed to join drain thread")?
        .map_err(|_| anyhow!("drain thread panicked"))?;

    let mut broadcaster = outcome.transport;
    broadcaster.close();

    capture_result.context("raw input capture failed")?;
    info!("rawsink server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
