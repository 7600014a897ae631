//! Error taxonomy for DMA device operations
//!
//! Every variant is fatal at the point it occurs: the tools perform no
//! retries and salvage no partial results. Each message names the failed
//! operation and the parameters involved so the operator can tell which
//! step of a run died.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for DMA device operations
pub type Result<T> = std::result::Result<T, DmaError>;

/// Errors that can occur while driving a DMA character device
#[derive(Error, Debug)]
pub enum DmaError {
    /// Failed to open the device node
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Failed to seek to the absolute device offset
    #[error("seek to offset {offset:#x} failed: {source}")]
    Seek { offset: u64, source: io::Error },

    /// Buffer reservation failed (or the size does not fit in memory)
    #[error("allocation of {size} byte buffer failed")]
    Allocation { size: u64 },

    /// The device rejected a write
    #[error("write of {requested} bytes failed: {source}")]
    Write { requested: u64, source: io::Error },

    /// The device accepted fewer bytes than requested
    #[error("short write: {written} of {requested} bytes accepted")]
    ShortWrite { requested: u64, written: u64 },

    /// The device rejected a read
    #[error("read of {requested} bytes failed: {source}")]
    Read { requested: u64, source: io::Error },

    /// The device delivered fewer bytes than requested
    #[error("short read: {read} of {requested} bytes delivered")]
    ShortRead { requested: u64, read: u64 },

    /// Releasing the device handle failed
    #[error("close failed: {0}")]
    Close(#[source] io::Error),

    /// Event polling failed (epoll create, register, or wait)
    #[error("event poll failed: {0}")]
    Poll(#[source] io::Error),
}
