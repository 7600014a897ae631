//! Diagnostics for XDMA-style DMA character devices
//!
//! Three companion binaries share this library:
//!
//! - `xdma-bench` sweeps a geometric series of transfer sizes through an
//!   H2C channel and reports sustained write throughput per size
//! - `xdma-loopback` pushes a coordinate-encoded surface to the card and
//!   reads it back, comparing word by word
//! - `xdma-events` watches an event device and prints interrupt counters
//!   until the line goes quiet
//!
//! The channel layer talks to the character devices through plain file
//! descriptors, so any node that supports `lseek`/`read`/`write` works,
//! including regular files when exercising the tools without hardware.

pub mod channel;
pub mod cli;
pub mod error;
pub mod events;
pub mod pattern;
pub mod report;
pub mod sampler;

pub use channel::{DmaChannel, XdmaChannel};
pub use error::{DmaError, Result};
