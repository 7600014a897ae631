//! Host-to-card transfer-rate sampler
//!
//! Sweeps a geometric series of transfer sizes and measures sustained write
//! throughput per size: for each bucket, allocate a zero-filled buffer once,
//! then repeatedly seek to the fixed device offset, stamp a monotonic clock,
//! write the whole buffer, stamp again, and fold the elapsed microseconds
//! into the bucket accumulator. Exactly one bucket buffer is live at any
//! time, and any failure aborts the sweep with no partial report.

use std::ops::Deref;
use std::time::Instant;

use serde::Serialize;

use crate::channel::DmaChannel;
use crate::error::{DmaError, Result};

/// Number of size buckets in the sweep (sizes 2^1 through 2^buckets, capped)
pub const DEFAULT_BUCKETS: u32 = 27;

/// Timed write repetitions per bucket
pub const DEFAULT_TRIALS: u32 = 10;

/// Cap on a single transfer (100 MiB)
pub const DEFAULT_MAX_TRANSFER: u64 = 100 * 1024 * 1024;

/// Absolute device offset every trial seeks to before writing
pub const DEFAULT_DEVICE_OFFSET: u64 = 0x8000_0000;

/// Divisor applied to the accumulated time when deriving the MB/s figure.
/// Deliberately distinct from the trial count: the reference tool divides by
/// 2 while running 10 trials, so its reported rate is not a plain average.
pub const DEFAULT_AVERAGING_DIVISOR: u32 = 2;

/// Sweep parameters. Defaults reproduce the reference tool exactly.
#[derive(Debug, Clone, Serialize)]
pub struct SweepConfig {
    /// Number of size buckets `B`
    pub buckets: u32,
    /// Trials per bucket `T`
    pub trials: u32,
    /// Maximum transfer size `M` in bytes
    pub max_transfer: u64,
    /// Device offset seeked to before every write
    pub device_offset: u64,
    /// Averaging divisor `A` used by the rate formula
    pub averaging_divisor: u32,
    /// Treat short writes as the reference did (accumulate and continue)
    /// instead of failing the sweep
    pub allow_short_writes: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            buckets: DEFAULT_BUCKETS,
            trials: DEFAULT_TRIALS,
            max_transfer: DEFAULT_MAX_TRANSFER,
            device_offset: DEFAULT_DEVICE_OFFSET,
            averaging_divisor: DEFAULT_AVERAGING_DIVISOR,
            allow_short_writes: false,
        }
    }
}

/// Transfer sizes for the sweep: `min(2^(i+1), max_transfer)` for bucket
/// `i`, strictly increasing until the cap, constant afterwards.
pub fn bucket_sizes(cfg: &SweepConfig) -> Vec<u64> {
    (0..cfg.buckets)
        .map(|i| {
            let pow = 1u64.checked_shl(i + 1).unwrap_or(u64::MAX);
            pow.min(cfg.max_transfer)
        })
        .collect()
}

/// One measured size bucket: the transfer size and the time accumulated
/// over all trials at that size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeBucket {
    /// Bytes written per trial
    pub size_bytes: u64,
    /// Sum of per-trial elapsed time, microseconds
    pub total_time_us: u64,
}

impl SizeBucket {
    /// Derived rate in MB/s: `size_bytes / (total_time_us / divisor)`.
    ///
    /// A zero accumulator (instantaneous writes, a measurement anomaly)
    /// yields `+inf` rather than a panic.
    pub fn mb_per_sec(&self, averaging_divisor: u32) -> f64 {
        if self.total_time_us == 0 {
            return f64::INFINITY;
        }
        self.size_bytes as f64 / (self.total_time_us as f64 / f64::from(averaging_divisor))
    }
}

/// A zero-initialized transfer buffer, allocated fallibly and scoped to one
/// bucket's measurement.
#[derive(Debug)]
pub struct TransferBuffer {
    bytes: Vec<u8>,
}

impl TransferBuffer {
    /// Allocate `size` zeroed bytes, reporting failure as
    /// [`DmaError::Allocation`] instead of aborting.
    pub fn zeroed(size: u64) -> Result<Self> {
        let len = usize::try_from(size).map_err(|_| DmaError::Allocation { size })?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| DmaError::Allocation { size })?;
        bytes.resize(len, 0);
        #[cfg(test)]
        LIVE_BUFFERS.with(|live| live.set(live.get() + 1));
        Ok(Self { bytes })
    }

    /// Number of live buffers on this thread. Test hook for the
    /// one-buffer-at-a-time guarantee.
    #[cfg(test)]
    pub(crate) fn live_count() -> usize {
        LIVE_BUFFERS.with(std::cell::Cell::get)
    }
}

impl Deref for TransferBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
thread_local! {
    static LIVE_BUFFERS: std::cell::Cell<usize> = std::cell::Cell::new(0);
}

#[cfg(test)]
impl Drop for TransferBuffer {
    fn drop(&mut self) {
        LIVE_BUFFERS.with(|live| live.set(live.get() - 1));
    }
}

/// Run the full sweep over `channel`.
///
/// Returns one [`SizeBucket`] per configured bucket, in size order. Any
/// open/seek/allocation/write failure aborts the whole sweep immediately;
/// no buckets measured so far are returned.
pub fn run_sweep<C: DmaChannel>(channel: &mut C, cfg: &SweepConfig) -> Result<Vec<SizeBucket>> {
    let sizes = bucket_sizes(cfg);
    let mut buckets = Vec::with_capacity(sizes.len());

    for &size_bytes in &sizes {
        tracing::info!("measuring transfer size {}", size_bytes);
        let buf = TransferBuffer::zeroed(size_bytes)?;
        let mut total_time_us = 0u64;

        for _ in 0..cfg.trials {
            channel.seek(cfg.device_offset)?;
            let start = Instant::now();
            let written = channel.write(&buf)?;
            let elapsed_us = start.elapsed().as_micros() as u64;

            if (written as u64) < size_bytes {
                if cfg.allow_short_writes {
                    tracing::warn!(
                        "short write: {} of {} bytes accepted, accumulating anyway",
                        written,
                        size_bytes
                    );
                } else {
                    return Err(DmaError::ShortWrite {
                        requested: size_bytes,
                        written: written as u64,
                    });
                }
            }
            total_time_us += elapsed_us;
        }

        buckets.push(SizeBucket {
            size_bytes,
            total_time_us,
        });
        // bucket buffer dropped here, before the next size is allocated
    }

    Ok(buckets)
}
