//! # uplinkd
//!
//! Telemetry uplink daemon. Brings the radio link up, keeps it converged
//! to the requested state, and uploads a fixed-size payload at a fixed
//! period while the link is registered.
//!
//! On a development host the radio is simulated (`SimModem`); the UDP
//! transport is real.
//!
//! ```bash
//! # Defaults (simulated modem, config defaults)
//! uplinkd
//!
//! # Config file plus overrides
//! uplinkd --config uplink.toml --dest 192.0.2.10:5000 --period-secs 60
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use uplink::config::UplinkConfig;
use uplink::runtime::UplinkRuntime;
use uplink::sim::SimModem;
use uplink::transport::UdpTransport;

/// Telemetry uplink daemon.
#[derive(Parser, Debug)]
#[command(name = "uplinkd", about = "Connectivity-lifecycle controller and uplink scheduler")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<String>,

    /// Destination override, `addr:port`.
    #[arg(long)]
    dest: Option<std::net::SocketAddr>,

    /// Upload period override, in seconds.
    #[arg(long)]
    period_secs: Option<u64>,

    /// Payload size override, in bytes.
    #[arg(long)]
    payload_bytes: Option<usize>,

    /// Simulated modem attach delay, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    attach_delay_ms: u64,

    /// Stats logging interval, in seconds.
    #[arg(long, default_value_t = 30)]
    stats_interval_secs: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => UplinkConfig::load(path)?,
        None => UplinkConfig::default(),
    };
    if let Some(dest) = cli.dest {
        config.server_addr = dest.ip();
        config.server_port = dest.port();
    }
    if let Some(period) = cli.period_secs {
        config.upload_period_secs = period;
    }
    if let Some(size) = cli.payload_bytes {
        config.payload_size_bytes = size;
    }

    tracing::info!(
        dest = %config.destination(),
        payload_bytes = config.payload_size_bytes,
        period_secs = config.upload_period_secs,
        "uplinkd starting"
    );

    let modem = Arc::new(SimModem::new(Duration::from_millis(cli.attach_delay_ms)));
    // Without physical switches, the live toggles start at the configured
    // enables.
    let mut runtime = UplinkRuntime::start(
        config.clone(),
        modem,
        Arc::new(UdpTransport),
        config.power_save_configured,
        config.release_assist_configured,
    )?;

    runtime.wait_until_ready()?;
    runtime.arm_transmit();

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            tracing::info!("shutting down...");
            running.store(false, Ordering::Relaxed);
        })?;
    }

    let stats_interval = Duration::from_secs(cli.stats_interval_secs.max(1));
    let mut last_stats = std::time::Instant::now();
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(200));
        if last_stats.elapsed() >= stats_interval {
            let stats = runtime.stats();
            tracing::info!(
                state = %runtime.state(),
                sent_packets = stats.sent_packets,
                sent_bytes = stats.sent_bytes,
                failed_sends = stats.failed_sends,
                registrations = stats.registrations,
                "uplink stats"
            );
            last_stats = std::time::Instant::now();
        }
    }

    runtime.shutdown();
    tracing::info!("uplinkd stopped");
    Ok(())
}
