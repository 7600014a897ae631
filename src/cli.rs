//! Command-line surfaces for the three diagnostics
//!
//! Every knob the reference tools hard-coded is a flag here, with the
//! hard-coded value as its default. Offsets accept `0x`-prefixed hex so
//! they can be pasted straight out of an address map.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::events;
use crate::pattern::{self, LoopbackConfig};
use crate::sampler::{self, SweepConfig};

/// Output format for reports
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text lines (default)
    Text,
    /// JSON document for machine parsing
    Json,
}

/// Throughput sweep flags.
#[derive(Parser, Debug)]
#[command(name = "xdma-bench", version, about = "Host-to-card DMA throughput sweep", long_about = None)]
pub struct BenchArgs {
    /// H2C device node to write through
    #[arg(short, long, default_value = "/dev/xdma0_h2c_0")]
    pub device: PathBuf,

    /// Number of size buckets (sizes 2^1 up to 2^buckets, capped)
    #[arg(long, default_value_t = sampler::DEFAULT_BUCKETS)]
    pub buckets: u32,

    /// Timed writes per bucket
    #[arg(long, default_value_t = sampler::DEFAULT_TRIALS)]
    pub trials: u32,

    /// Largest single transfer in bytes
    #[arg(long, default_value_t = sampler::DEFAULT_MAX_TRANSFER)]
    pub max_transfer: u64,

    /// Device offset seeked to before every write (decimal or 0x hex)
    #[arg(long, default_value_t = sampler::DEFAULT_DEVICE_OFFSET, value_parser = parse_offset)]
    pub offset: u64,

    /// Divisor applied to accumulated microseconds in the MB/s figure
    #[arg(long, default_value_t = sampler::DEFAULT_AVERAGING_DIVISOR,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub averaging_divisor: u32,

    /// Accumulate short writes instead of failing the sweep
    #[arg(long)]
    pub allow_short_writes: bool,

    /// Report format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing to stderr
    #[arg(long)]
    pub debug: bool,
}

impl BenchArgs {
    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            buckets: self.buckets,
            trials: self.trials,
            max_transfer: self.max_transfer,
            device_offset: self.offset,
            averaging_divisor: self.averaging_divisor,
            allow_short_writes: self.allow_short_writes,
        }
    }
}

/// Round-trip integrity check flags.
#[derive(Parser, Debug)]
#[command(name = "xdma-loopback", version, about = "DMA round-trip data integrity check", long_about = None)]
pub struct LoopbackArgs {
    /// H2C device node (host to card)
    #[arg(long, default_value = "/dev/xdma0_h2c_0")]
    pub h2c: PathBuf,

    /// C2H device node (card to host)
    #[arg(long, default_value = "/dev/xdma0_c2h_0")]
    pub c2h: PathBuf,

    /// Surface width in 32-bit words
    #[arg(long, default_value_t = pattern::DEFAULT_WIDTH)]
    pub width: u32,

    /// Surface height in rows
    #[arg(long, default_value_t = pattern::DEFAULT_HEIGHT)]
    pub height: u32,

    /// Device offset for both directions (decimal or 0x hex)
    #[arg(long, default_value_t = sampler::DEFAULT_DEVICE_OFFSET, value_parser = parse_offset)]
    pub offset: u64,

    /// Report format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing to stderr
    #[arg(long)]
    pub debug: bool,
}

impl LoopbackArgs {
    pub fn loopback_config(&self) -> LoopbackConfig {
        LoopbackConfig {
            width: self.width,
            height: self.height,
            device_offset: self.offset,
        }
    }
}

/// Event watch flags.
#[derive(Parser, Debug)]
#[command(name = "xdma-events", version, about = "Watch an XDMA event device for interrupts", long_about = None)]
pub struct EventArgs {
    /// Event device node to watch
    #[arg(short, long, default_value = "/dev/xdma0_events_0")]
    pub device: PathBuf,

    /// Quiet interval in milliseconds that ends the watch
    #[arg(long, default_value_t = events::DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u16,

    /// Report format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing to stderr
    #[arg(long)]
    pub debug: bool,
}

/// Initialize tracing subscriber for debug output. Without `--debug` the
/// tools stay silent on stderr except for fatal diagnostics.
pub fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Parse a device offset flag: decimal, or hex with a `0x`/`0X` prefix.
pub fn parse_offset(raw: &str) -> Result<u64, String> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex offset: {e}"))
    } else {
        raw.parse().map_err(|e| format!("invalid offset: {e}"))
    }
}
