//! Error types for the provisioning portal.
//!
//! Subsystem errors (`WifiError`, `StorageError`, `OtaError`, ...) stay
//! typed at their ports. Request paths that cross more than one subsystem
//! return the crate-wide [`Error`] and propagate with `?`. All variants are
//! `Copy` so they can travel through log lines without allocation.

use core::fmt;

use crate::app::credentials::CredentialsError;
use crate::mailbox::MailboxError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Submitted credentials were malformed.
    Credentials(CredentialsError),
    /// A message could not be handed to an actor.
    Mailbox(MailboxError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentials(e) => write!(f, "credentials: {e}"),
            Self::Mailbox(e) => write!(f, "mailbox: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// WiFi driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    /// Station configuration was refused by the driver.
    ConfigRejected,
    /// `esp_wifi_connect` returned an error.
    ConnectFailed,
    /// The driver has not been started.
    NotStarted,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigRejected => write!(f, "station configuration rejected"),
            Self::ConnectFailed => write!(f, "connect request failed"),
            Self::NotStarted => write!(f, "driver not started"),
        }
    }
}

// ---------------------------------------------------------------------------
// Firmware partition errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// No inactive application partition exists.
    NoPartition,
    /// `esp_ota_begin` failed.
    BeginFailed,
    /// A flash write failed.
    WriteFailed,
    /// Image validation at `esp_ota_end` failed.
    FinalizeFailed,
    /// The boot pointer could not be moved.
    BootSetFailed,
    /// Operation issued without an open update session.
    NotOpen,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPartition => write!(f, "no inactive app partition"),
            Self::BeginFailed => write!(f, "could not open update partition"),
            Self::WriteFailed => write!(f, "flash write failed"),
            Self::FinalizeFailed => write!(f, "image validation failed"),
            Self::BootSetFailed => write!(f, "could not set boot partition"),
            Self::NotOpen => write!(f, "no update session open"),
        }
    }
}

impl From<MailboxError> for Error {
    fn from(e: MailboxError) -> Self {
        Self::Mailbox(e)
    }
}

impl From<CredentialsError> for Error {
    fn from(e: CredentialsError) -> Self {
        Self::Credentials(e)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
