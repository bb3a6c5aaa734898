//! Bounded actor mailboxes.
//!
//! Uses an `embassy-sync` bounded MPMC channel as the backing queue and
//! drives it from plain blocking threads with `futures-lite`. Timeouts
//! come from the `async-io-mini` reactor timer, so a waiting sender is
//! parked instead of spinning.
//!
//! ```text
//! ┌──────────────────┐  ConnectionMsg  ┌──────────────────┐
//! │  HTTP handlers   │───────────────▶│ Connection Mgr   │
//! │  WiFi driver cb  │                 │  (actor thread)  │
//! └──────────────────┘                 └────────┬─────────┘
//!                                               │ StatusMsg
//! ┌──────────────────┐  StatusMsg               ▼
//! │  OTA pipeline    │───────────────▶┌──────────────────┐
//! │  (HTTP task)     │                 │  Status Monitor  │
//! └──────────────────┘                 │  (actor thread)  │
//!                                      └──────────────────┘
//! ```
//!
//! Every mailbox has exactly one reader. Delivery within a mailbox is FIFO;
//! there is no ordering between two different mailboxes.

use core::fmt;
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use futures_lite::future;

/// Slots per mailbox.
pub const MAILBOX_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// The mailbox stayed full for the whole send timeout.
    Full,
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "mailbox full (send timed out)"),
        }
    }
}

/// Fixed-capacity FIFO between schedulable units.
///
/// `const`-constructible so firmware can keep its mailboxes in statics;
/// tests build them on the stack and share them with scoped threads.
pub struct Mailbox<T, const N: usize = MAILBOX_DEPTH> {
    channel: Channel<CriticalSectionRawMutex, T, N>,
}

impl<T, const N: usize> Mailbox<T, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue `msg`, waiting at most `timeout` for a free slot.
    ///
    /// On timeout the message is dropped and [`MailboxError::Full`] is
    /// returned so the caller can report backpressure.
    pub fn send_timeout(&self, msg: T, timeout: Duration) -> Result<(), MailboxError> {
        let msg = match self.channel.try_send(msg) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(msg)) => msg,
        };

        future::block_on(future::or(
            async {
                self.channel.send(msg).await;
                Ok(())
            },
            async {
                async_io_mini::Timer::after(timeout).await;
                Err(MailboxError::Full)
            },
        ))
    }

    /// Enqueue without waiting.
    pub fn try_send(&self, msg: T) -> Result<(), MailboxError> {
        self.channel.try_send(msg).map_err(|_| MailboxError::Full)
    }

    /// Block the calling thread until a message arrives.
    pub fn recv(&self) -> T {
        future::block_on(self.channel.receive())
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for Mailbox<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
