//! fdb-bridge - forward kernel FDB notifications back toward the kernel
//!
//! # Usage
//!
//! ```bash
//! # Create and publish both rings in /dev/shm, poll once per second
//! fdb-bridge
//!
//! # Attach to rings another process already published
//! fdb-bridge --attach --namespace /sys/fs/bpf --inbound to_user --outbound from_user
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fdb_ringbridge::Bridge::{
    fdb_entry_schema, BackpressurePolicy, Bridge, BridgeConfig, FdbOffloadTransform,
};
use fdb_ringbridge::Ring::{ChannelKind, RingBuilder, RingChannel, DEFAULT_CAPACITY, DEFAULT_NAMESPACE};

/// Bridge FDB offload events between two shared ring buffers
#[derive(Parser, Debug)]
#[command(name = "fdb-bridge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding published ring names
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: PathBuf,

    /// Name of the kernel -> user ring
    #[arg(long, default_value = "fdb_to_user")]
    inbound: String,

    /// Name of the user -> kernel ring
    #[arg(long, default_value = "fdb_from_user")]
    outbound: String,

    /// Ring data area size in bytes (power of two)
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Attach to existing rings instead of creating them
    #[arg(long)]
    attach: bool,

    /// Leave created rings published on exit
    #[arg(long)]
    keep_published: bool,

    /// Retry a full outbound ring this many times before dropping (0 = drop)
    #[arg(long, default_value_t = 0)]
    retry: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let inbound = open_channel(&cli, ChannelKind::KernelWritable, &cli.inbound)?;
    let outbound = open_channel(&cli, ChannelKind::UserWritable, &cli.outbound)?;

    let backpressure = if cli.retry == 0 {
        BackpressurePolicy::Drop
    } else {
        BackpressurePolicy::Retry {
            attempts: cli.retry,
            backoff: Duration::from_millis(10),
        }
    };
    let config = BridgeConfig::new()
        .with_poll_interval(Duration::from_millis(cli.interval_ms))
        .with_backpressure(backpressure);

    let schema = fdb_entry_schema().context("invalid FDB record schema")?;
    let mut bridge = Bridge::new(inbound, outbound, schema, FdbOffloadTransform, config);

    // Handle Ctrl+C to stop at the next iteration boundary
    let shutdown = bridge.shutdown_handle();
    ctrlc::set_handler(move || shutdown.trigger()).context("failed to set Ctrl+C handler")?;

    bridge.run().context("bridge loop failed")?;
    Ok(())
}

fn open_channel(cli: &Cli, kind: ChannelKind, name: &str) -> Result<RingChannel> {
    let builder = RingBuilder::new()
        .with_namespace(&cli.namespace)
        .with_kind(kind)
        .with_capacity(cli.capacity)
        .keep_published(cli.keep_published);

    if cli.attach {
        builder
            .attach(name)
            .with_context(|| format!("failed to attach to ring `{}`", name))
    } else {
        builder
            .create_published(name)
            .with_context(|| format!("failed to create ring `{}`", name))
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    Ok(())
}
