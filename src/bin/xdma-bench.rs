//! Host-to-card throughput sweep over an XDMA H2C character device.

use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;

use xdma_diag::channel::XdmaChannel;
use xdma_diag::cli::{self, BenchArgs, OutputFormat};
use xdma_diag::report::SweepReport;
use xdma_diag::sampler;

fn main() -> Result<()> {
    let args = BenchArgs::parse();
    cli::init_tracing(args.debug);

    let cfg = args.sweep_config();
    tracing::info!(
        "sweeping {} sizes, {} trials each, against {}",
        cfg.buckets,
        cfg.trials,
        args.device.display()
    );

    let mut channel = XdmaChannel::open_write(&args.device)?;
    let buckets = sampler::run_sweep(&mut channel, &cfg)?;

    let report = SweepReport::new(args.device.display().to_string(), cfg, buckets);
    match args.format {
        OutputFormat::Json => println!("{}", report.to_json_string()?),
        OutputFormat::Text => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            report.write_text(&mut out)?;
            out.flush()?;
        }
    }

    // Closed only after the report is flushed; a failing close must not
    // discard measured data.
    channel.close()?;

    Ok(())
}
