//! Port traits: the hexagonal boundary between coordination logic and the platform.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ConnectionManager / StatusMonitor / UpdatePipeline
//! ```
//!
//! ESP-IDF adapters and host simulations implement these traits; the domain
//! consumes them through generics so it never touches the radio or flash
//! directly.

use core::fmt;
use core::time::Duration;

use crate::error::{StorageError, WifiError};
use crate::mailbox::{Mailbox, MailboxError};

use super::credentials::WifiCredentials;
use super::messages::StatusMsg;

// ───────────────────────────────────────────────────────────────
// WiFi driver port (domain → radio)
// ───────────────────────────────────────────────────────────────

/// Station-side controls the connection manager needs from the driver.
///
/// Connection outcomes are not returned here; they arrive later as
/// [`DriverEvent`](super::messages::DriverEvent)s.
pub trait WifiDriverPort {
    /// Replace the station configuration with `credentials`.
    fn apply_station_config(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError>;

    /// Issue a single association attempt.
    fn connect(&mut self) -> Result<(), WifiError>;
}

// ───────────────────────────────────────────────────────────────
// Status sink port (domain → status monitor)
// ───────────────────────────────────────────────────────────────

pub trait StatusSink {
    fn post(&mut self, msg: StatusMsg) -> Result<(), MailboxError>;
}

/// Posts into a status mailbox, waiting up to `timeout` for room.
#[derive(Clone, Copy)]
pub struct MailboxSink<'a> {
    mailbox: &'a Mailbox<StatusMsg>,
    timeout: Duration,
}

impl<'a> MailboxSink<'a> {
    pub fn new(mailbox: &'a Mailbox<StatusMsg>, timeout: Duration) -> Self {
        Self { mailbox, timeout }
    }
}

impl StatusSink for MailboxSink<'_> {
    fn post(&mut self, msg: StatusMsg) -> Result<(), MailboxError> {
        self.mailbox.send_timeout(msg, self.timeout)
    }
}

// ───────────────────────────────────────────────────────────────
// Upload stream port (HTTP request body → pipeline)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// Socket receive timed out; the read may be retried.
    Timeout,
    /// Any other transport failure, with the platform error code.
    Io(i32),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "socket timeout"),
            Self::Io(code) => write!(f, "receive error {code}"),
        }
    }
}

pub trait UploadStream {
    /// Read up to `buf.len()` bytes. `Ok(0)` means the peer closed the stream.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;
}

// ───────────────────────────────────────────────────────────────
// Firmware store port (pipeline → flash)
// ───────────────────────────────────────────────────────────────

/// Application partition descriptor, for logs and results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    pub label: heapless::String<16>,
    pub address: u32,
    pub size: u32,
}

/// Dual-slot image storage.
///
/// Lifecycle: `begin` → `write`* → `finalize` → `activate`. `abort` may be
/// called at any point after `begin` and leaves the boot pointer untouched.
pub trait FirmwareStore {
    /// Open the inactive partition for writing.
    fn begin(&mut self) -> Result<PartitionInfo, StorageError>;
    fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;
    /// Close the session and validate the image.
    fn finalize(&mut self) -> Result<(), StorageError>;
    /// Point the bootloader at the finalized image. Returns the new boot partition.
    fn activate(&mut self) -> Result<PartitionInfo, StorageError>;
    fn abort(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Restart ports
// ───────────────────────────────────────────────────────────────

/// Hard device restart.
pub trait RestartPort: Send + Sync + 'static {
    fn restart(&self);
}

/// One-shot deferred restart. Arming again replaces the pending deadline.
pub trait RestartTimer {
    fn arm(&mut self, delay: Duration);
}
