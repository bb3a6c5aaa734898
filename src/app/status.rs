//! Shared status board.
//!
//! Two scalars written only by the status monitor and read by HTTP handlers.
//! Each lives in its own atomic, so a reader always sees a value that was
//! actually written, never a torn one. The writer half is not `Clone`,
//! which keeps the single-writer rule in the type system.

use core::sync::atomic::{AtomicI8, AtomicU8, Ordering};
use std::sync::Arc;

/// Station link state. Discriminants are the codes reported by
/// `/wifiConnectStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Idle = 0,
    Connecting = 1,
    Connected = 2,
    Failed = 3,
}

impl ConnectionState {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Idle),
            1 => Some(Self::Connecting),
            2 => Some(Self::Connected),
            3 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Legal edges of the connection state machine.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::{Connected, Connecting, Failed, Idle};
        matches!(
            (self, next),
            (Idle | Connecting | Connected | Failed, Connecting)
                | (Connecting, Connected | Failed)
        )
    }
}

/// Firmware update outcome. Discriminants are the codes reported by
/// `/OTAstatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum UpdateStatus {
    Pending = 0,
    Successful = 1,
    Failed = -1,
}

impl UpdateStatus {
    pub const fn code(self) -> i8 {
        self as i8
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(Self::Pending),
            1 => Some(Self::Successful),
            -1 => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }

    /// Pending resolves exactly once; terminal values never change.
    pub fn can_transition_to(self, next: Self) -> bool {
        self == Self::Pending && next.is_terminal()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub connection: ConnectionState,
    pub update: UpdateStatus,
}

struct Board {
    connection: AtomicU8,
    update: AtomicI8,
}

/// Create the board, returning its single writer and a cloneable reader.
pub fn status_board() -> (StatusWriter, StatusReader) {
    let board = Arc::new(Board {
        connection: AtomicU8::new(ConnectionState::Idle.code()),
        update: AtomicI8::new(UpdateStatus::Pending.code()),
    });
    (
        StatusWriter { board: Arc::clone(&board) },
        StatusReader { board },
    )
}

pub struct StatusWriter {
    board: Arc<Board>,
}

impl StatusWriter {
    pub fn set_connection(&mut self, state: ConnectionState) {
        self.board.connection.store(state.code(), Ordering::Release);
    }

    pub fn set_update(&mut self, status: UpdateStatus) {
        self.board.update.store(status.code(), Ordering::Release);
    }

    pub fn reader(&self) -> StatusReader {
        StatusReader { board: Arc::clone(&self.board) }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.reader().snapshot()
    }
}

#[derive(Clone)]
pub struct StatusReader {
    board: Arc<Board>,
}

impl StatusReader {
    pub fn connection(&self) -> ConnectionState {
        // Only the writer stores, and it only stores valid codes.
        ConnectionState::from_code(self.board.connection.load(Ordering::Acquire))
            .unwrap_or(ConnectionState::Idle)
    }

    pub fn update(&self) -> UpdateStatus {
        UpdateStatus::from_code(self.board.update.load(Ordering::Acquire))
            .unwrap_or(UpdateStatus::Pending)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            connection: self.connection(),
            update: self.update(),
        }
    }
}
