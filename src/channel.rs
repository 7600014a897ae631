//! DMA channel handles
//!
//! The driver exposes each DMA engine as a byte-oriented, seekable character
//! device. [`DmaChannel`] is the seam the diagnostics are written against;
//! [`XdmaChannel`] is the real device-node implementation. Tests substitute
//! mock channels to exercise failure paths no healthy device produces.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::io::IntoRawFd;
use std::path::{Path, PathBuf};

use crate::error::{DmaError, Result};

/// A byte-oriented, seekable DMA data path.
///
/// `write` and `read` return the raw transfer count so callers can decide
/// how to treat short transfers; `write_all`/`read_exact` are for callers
/// that need the full buffer moved or an error.
pub trait DmaChannel {
    /// Seek to an absolute device offset.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Write the buffer, returning the number of bytes the device accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Read into the buffer, returning the number of bytes delivered.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write the whole buffer or fail with [`DmaError::ShortWrite`] if the
    /// device stops accepting data.
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut written = 0usize;
        while written < buf.len() {
            let n = self.write(&buf[written..])?;
            if n == 0 {
                return Err(DmaError::ShortWrite {
                    requested: buf.len() as u64,
                    written: written as u64,
                });
            }
            written += n;
        }
        Ok(())
    }

    /// Fill the whole buffer or fail with [`DmaError::ShortRead`] if the
    /// device runs out of data.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();
        let mut filled = 0usize;
        while filled < len {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(DmaError::ShortRead {
                    requested: len as u64,
                    read: filled as u64,
                });
            }
            filled += n;
        }
        Ok(())
    }
}

/// A DMA channel backed by an XDMA character device node.
///
/// The handle is acquired once and held for the whole run. Dropping it
/// releases the file descriptor on every exit path; call [`close`] on the
/// success path to surface close errors the way the driver reports them.
///
/// [`close`]: XdmaChannel::close
#[derive(Debug)]
pub struct XdmaChannel {
    path: PathBuf,
    file: File,
}

impl XdmaChannel {
    /// Open a card-to-host channel (read side).
    pub fn open_read(path: &Path) -> Result<Self> {
        Self::open_with(path, true, false)
    }

    /// Open a host-to-card channel (write side).
    pub fn open_write(path: &Path) -> Result<Self> {
        Self::open_with(path, false, true)
    }

    /// Open a channel for both directions.
    pub fn open_read_write(path: &Path) -> Result<Self> {
        Self::open_with(path, true, true)
    }

    fn open_with(path: &Path, read: bool, write: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(read)
            .write(write)
            .open(path)
            .map_err(|source| DmaError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!("opened DMA channel {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Device node this channel was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the handle, surfacing the close result.
    pub fn close(self) -> Result<()> {
        tracing::debug!("closing DMA channel {}", self.path.display());
        let fd = self.file.into_raw_fd();
        // SAFETY: the fd was just released from the File, so this is the
        // only remaining owner and it is closed exactly once.
        let rc = unsafe { libc::close(fd) };
        if rc < 0 {
            return Err(DmaError::Close(io::Error::last_os_error()));
        }
        Ok(())
    }
}

impl DmaChannel for XdmaChannel {
    fn seek(&mut self, offset: u64) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|source| DmaError::Seek { offset, source })?;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.file.write(buf).map_err(|source| DmaError::Write {
            requested: buf.len() as u64,
            source,
        })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file.read(buf).map_err(|source| DmaError::Read {
            requested: buf.len() as u64,
            source,
        })
    }
}
