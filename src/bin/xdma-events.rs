//! Watch an XDMA event character device and print interrupt counters
//! until the line goes quiet or the device closes.

use anyhow::Result;
use clap::Parser;

use xdma_diag::cli::{self, EventArgs, OutputFormat};
use xdma_diag::events::{self, EventWatcher};

fn main() -> Result<()> {
    let args = EventArgs::parse();
    cli::init_tracing(args.debug);
    tracing::info!(
        "watching {} with a {} ms quiet timeout",
        args.device.display(),
        args.timeout_ms
    );

    let text = matches!(args.format, OutputFormat::Text);
    let mut watcher = EventWatcher::open(&args.device)?;
    let summary = events::watch_until_timeout(&mut watcher, args.timeout_ms, |counter| {
        if text {
            println!("Events:{counter}");
        }
    })?;

    if text {
        println!("Total:{}", summary.events_total);
    } else {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
