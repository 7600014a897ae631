//! Interrupt event watcher
//!
//! Wraps an XDMA event character device in an epoll loop. Each wakeup
//! delivers a 4-byte native-endian counter saying how many interrupts
//! fired since the last read. The loop runs until a poll interval passes
//! with no events or the device reaches end of file.

use std::fs::OpenOptions;
use std::io::{self, Read};
use std::path::Path;

use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags};

use crate::error::{DmaError, Result};

/// How long one wait may go without an event before the watch ends
pub const DEFAULT_TIMEOUT_MS: u16 = 3000;

/// Outcome of a single bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventWait {
    /// The device has data (or hung up); a drain will not block
    Readable,
    /// The full interval elapsed with no activity
    TimedOut,
}

/// An event device registered with an epoll instance for readability.
#[derive(Debug)]
pub struct EventWatcher {
    file: std::fs::File,
    epoll: Epoll,
}

impl EventWatcher {
    /// Open the event device read-only and register it.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|source| DmaError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!("opened event device {}", path.display());
        Self::from_file(file)
    }

    /// Register an already-open handle. Fails with [`DmaError::Poll`] for
    /// files epoll cannot watch, such as regular files.
    pub fn from_file(file: std::fs::File) -> Result<Self> {
        let epoll = Epoll::new(EpollCreateFlags::empty())
            .map_err(|errno| DmaError::Poll(errno.into()))?;
        epoll
            .add(&file, EpollEvent::new(EpollFlags::EPOLLIN, 0))
            .map_err(|errno| DmaError::Poll(errno.into()))?;
        Ok(Self { file, epoll })
    }

    /// Block until the device is readable or `timeout_ms` elapses.
    /// Interrupted waits restart with the full interval.
    pub fn wait(&self, timeout_ms: u16) -> Result<EventWait> {
        let mut events = [EpollEvent::empty(); 1];
        loop {
            match self.epoll.wait(&mut events, timeout_ms) {
                Ok(0) => return Ok(EventWait::TimedOut),
                Ok(_) => return Ok(EventWait::Readable),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(DmaError::Poll(errno.into())),
            }
        }
    }

    /// Read one 4-byte event counter. `Ok(None)` means the device reached
    /// end of file with no pending counter; a counter torn mid-word is a
    /// [`DmaError::ShortRead`].
    pub fn drain(&mut self) -> Result<Option<u32>> {
        let mut raw = [0u8; 4];
        let mut filled = 0usize;
        while filled < raw.len() {
            match self.file.read(&mut raw[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(DmaError::ShortRead {
                        requested: raw.len() as u64,
                        read: filled as u64,
                    })
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(DmaError::Read {
                        requested: raw.len() as u64,
                        source,
                    })
                }
            }
        }
        Ok(Some(u32::from_ne_bytes(raw)))
    }
}

/// Totals for a completed watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct WatchSummary {
    /// Wakeups that delivered a counter
    pub wakeups: u64,
    /// Sum of all delivered counters
    pub events_total: u64,
    /// The most recent counter, if any arrived
    pub last_counter: Option<u32>,
}

/// Drive the watcher until a quiet interval or end of file, invoking
/// `on_event` with each delivered counter.
pub fn watch_until_timeout<F>(
    watcher: &mut EventWatcher,
    timeout_ms: u16,
    mut on_event: F,
) -> Result<WatchSummary>
where
    F: FnMut(u32),
{
    let mut summary = WatchSummary {
        wakeups: 0,
        events_total: 0,
        last_counter: None,
    };

    loop {
        match watcher.wait(timeout_ms)? {
            EventWait::TimedOut => {
                tracing::info!("no events for {} ms, stopping", timeout_ms);
                break;
            }
            EventWait::Readable => match watcher.drain()? {
                None => {
                    tracing::info!("event device reached end of file");
                    break;
                }
                Some(counter) => {
                    summary.wakeups += 1;
                    summary.events_total += u64::from(counter);
                    summary.last_counter = Some(counter);
                    on_event(counter);
                }
            },
        }
    }

    Ok(summary)
}
