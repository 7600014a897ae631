//! Round-trip integrity check: write a coordinate pattern through H2C,
//! read it back through C2H, compare word by word.

use std::process;

use anyhow::Result;
use clap::Parser;

use xdma_diag::channel::XdmaChannel;
use xdma_diag::cli::{self, LoopbackArgs, OutputFormat};
use xdma_diag::pattern;

fn main() -> Result<()> {
    let args = LoopbackArgs::parse();
    cli::init_tracing(args.debug);

    let cfg = args.loopback_config();
    tracing::info!(
        "loopback {}x{} words, {} -> card -> {}",
        cfg.width,
        cfg.height,
        args.h2c.display(),
        args.c2h.display()
    );

    let mut h2c = XdmaChannel::open_write(&args.h2c)?;
    let mut c2h = XdmaChannel::open_read(&args.c2h)?;
    let outcome = pattern::run_loopback(&mut h2c, &mut c2h, &cfg)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => {
            for mismatch in &outcome.sample {
                eprintln!("{mismatch}");
            }
            let unlisted = outcome.mismatches - outcome.sample.len() as u64;
            if unlisted > 0 {
                eprintln!("... {unlisted} more mismatches not shown");
            }
            if outcome.is_clean() {
                println!("loopback OK: {} words verified", outcome.words);
            } else {
                println!(
                    "loopback FAILED: {} of {} words mismatched",
                    outcome.mismatches, outcome.words
                );
            }
        }
    }

    // Closed only after the verdict is printed; a failing close must not
    // discard a completed comparison.
    h2c.close()?;
    c2h.close()?;

    if !outcome.is_clean() {
        process::exit(1);
    }
    Ok(())
}
