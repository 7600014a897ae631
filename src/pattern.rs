//! Round-trip integrity check
//!
//! Builds a coordinate-encoded test surface, pushes it through the
//! host-to-card channel, reads it back over card-to-host, and compares
//! word by word. Each 32-bit word encodes its own (x, y) position, so a
//! mismatch report points straight at the misrouted address.

use std::fmt;

use serde::Serialize;

use crate::channel::DmaChannel;
use crate::error::{DmaError, Result};

/// Default surface width in 32-bit words
pub const DEFAULT_WIDTH: u32 = 1024;

/// Default surface height in rows
pub const DEFAULT_HEIGHT: u32 = 1024;

/// Mismatches beyond this many are counted but not individually listed
pub const MAX_REPORTED_MISMATCHES: usize = 64;

/// Surface geometry and placement for one loopback run. Defaults match
/// the reference tool's 1024x1024 surface at offset 0x8000_0000.
#[derive(Debug, Clone, Serialize)]
pub struct LoopbackConfig {
    /// Surface width in words
    pub width: u32,
    /// Surface height in rows
    pub height: u32,
    /// Absolute device offset for both directions
    pub device_offset: u64,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            device_offset: crate::sampler::DEFAULT_DEVICE_OFFSET,
        }
    }
}

/// Pattern word for position (x, y): row in the high half-word, column in
/// the low half-word. Coordinates wrap at 16 bits.
pub fn pattern_word(x: u32, y: u32) -> u32 {
    ((y & 0xffff) << 16) | (x & 0xffff)
}

/// Row-major test surface: `surface[y * width + x] == pattern_word(x, y)`.
pub fn fill_pattern(width: u32, height: u32) -> Result<Vec<u32>> {
    let words = u64::from(width) * u64::from(height);
    let size = words.saturating_mul(4);
    let len = usize::try_from(words).map_err(|_| DmaError::Allocation { size })?;

    let mut surface = Vec::new();
    surface
        .try_reserve_exact(len)
        .map_err(|_| DmaError::Allocation { size })?;
    for y in 0..height {
        for x in 0..width {
            surface.push(pattern_word(x, y));
        }
    }
    Ok(surface)
}

/// Bitwise complement of every word. The read buffer is prefilled with
/// this so data the card never wrote back cannot masquerade as a match.
pub fn complement_pattern(words: &[u32]) -> Result<Vec<u32>> {
    let mut inverted = Vec::new();
    inverted
        .try_reserve_exact(words.len())
        .map_err(|_| DmaError::Allocation {
            size: (words.len() as u64).saturating_mul(4),
        })?;
    inverted.extend(words.iter().map(|w| !w));
    Ok(inverted)
}

/// Native-endian byte image of a word surface, as the DMA engine moves it.
pub fn words_to_bytes(words: &[u32]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(words.len() * 4)
        .map_err(|_| DmaError::Allocation {
            size: (words.len() as u64).saturating_mul(4),
        })?;
    for word in words {
        bytes.extend_from_slice(&word.to_ne_bytes());
    }
    Ok(bytes)
}

/// Inverse of [`words_to_bytes`]. Trailing bytes short of a full word are
/// dropped.
pub fn bytes_to_words(bytes: &[u8]) -> Result<Vec<u32>> {
    let count = bytes.len() / 4;
    let mut words = Vec::new();
    words
        .try_reserve_exact(count)
        .map_err(|_| DmaError::Allocation {
            size: (count as u64).saturating_mul(4),
        })?;
    for chunk in bytes.chunks_exact(4) {
        words.push(u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(words)
}

/// One miscompared word with its surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub x: u32,
    pub y: u32,
    pub expected: u32,
    pub actual: u32,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mismatch at ({}, {}): expected {:#010x}, got {:#010x}",
            self.x, self.y, self.expected, self.actual
        )
    }
}

/// Comparison result: total word count, total mismatches, and the first
/// [`MAX_REPORTED_MISMATCHES`] mismatches in surface order.
#[derive(Debug, Serialize)]
pub struct VerifyOutcome {
    pub words: u64,
    pub mismatches: u64,
    pub sample: Vec<Mismatch>,
}

impl VerifyOutcome {
    pub fn is_clean(&self) -> bool {
        self.mismatches == 0
    }
}

/// Compare a readback surface against the expected pattern. `width` maps
/// linear indices back to (x, y) coordinates.
pub fn verify(expected: &[u32], actual: &[u32], width: u32) -> VerifyOutcome {
    let stride = u64::from(width).max(1);
    let mut mismatches = 0u64;
    let mut sample = Vec::new();

    for (idx, (&want, &got)) in expected.iter().zip(actual.iter()).enumerate() {
        if want != got {
            mismatches += 1;
            if sample.len() < MAX_REPORTED_MISMATCHES {
                sample.push(Mismatch {
                    x: (idx as u64 % stride) as u32,
                    y: (idx as u64 / stride) as u32,
                    expected: want,
                    actual: got,
                });
            }
        }
    }

    VerifyOutcome {
        words: expected.len() as u64,
        mismatches,
        sample,
    }
}

/// Full round trip: write the pattern surface host-to-card, read it back
/// card-to-host into a complement-prefilled buffer, and compare.
///
/// A zero-area surface passes trivially without touching either channel.
/// Short transfers in either direction fail the run rather than comparing
/// a partially-moved surface.
pub fn run_loopback<H, C>(h2c: &mut H, c2h: &mut C, cfg: &LoopbackConfig) -> Result<VerifyOutcome>
where
    H: DmaChannel,
    C: DmaChannel,
{
    if cfg.width == 0 || cfg.height == 0 {
        tracing::warn!("zero-area surface, nothing to transfer");
        return Ok(VerifyOutcome {
            words: 0,
            mismatches: 0,
            sample: Vec::new(),
        });
    }

    let expected = fill_pattern(cfg.width, cfg.height)?;
    let out_bytes = words_to_bytes(&expected)?;

    tracing::info!(
        "writing {} bytes to offset {:#x}",
        out_bytes.len(),
        cfg.device_offset
    );
    h2c.seek(cfg.device_offset)?;
    h2c.write_all(&out_bytes)?;

    let mut in_bytes = words_to_bytes(&complement_pattern(&expected)?)?;
    tracing::info!("reading {} bytes back", in_bytes.len());
    c2h.seek(cfg.device_offset)?;
    c2h.read_exact(&mut in_bytes)?;

    let actual = bytes_to_words(&in_bytes)?;
    Ok(verify(&expected, &actual, cfg.width))
}
