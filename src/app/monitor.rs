//! Status monitor: the single writer of the status board.
//!
//! Applies only legal transitions; anything else is logged and dropped so a
//! late or duplicated message can never move the board backwards. A
//! committed firmware update arms the deferred restart.

use core::time::Duration;

use log::{info, warn};

use crate::mailbox::Mailbox;

use super::messages::StatusMsg;
use super::ports::RestartTimer;
use super::status::{ConnectionState, StatusReader, StatusWriter, UpdateStatus};

pub struct StatusMonitor<T: RestartTimer> {
    writer: StatusWriter,
    connection: ConnectionState,
    update: UpdateStatus,
    restart: T,
    restart_delay: Duration,
}

impl<T: RestartTimer> StatusMonitor<T> {
    pub fn new(writer: StatusWriter, restart: T, restart_delay: Duration) -> Self {
        let snapshot = writer.snapshot();
        Self {
            writer,
            connection: snapshot.connection,
            update: snapshot.update,
            restart,
            restart_delay,
        }
    }

    pub fn reader(&self) -> StatusReader {
        self.writer.reader()
    }

    pub fn restart_timer(&self) -> &T {
        &self.restart
    }

    pub fn dispatch(&mut self, msg: StatusMsg) {
        match msg {
            StatusMsg::WifiConnectInit => self.set_connection(ConnectionState::Connecting),
            StatusMsg::WifiConnectSuccess => self.set_connection(ConnectionState::Connected),
            StatusMsg::WifiConnectFail => self.set_connection(ConnectionState::Failed),
            StatusMsg::OtaSuccessful => {
                if self.resolve_update(UpdateStatus::Successful) {
                    info!(
                        "Monitor: update committed, restarting in {} ms",
                        self.restart_delay.as_millis()
                    );
                    self.restart.arm(self.restart_delay);
                }
            }
            StatusMsg::OtaFailed => {
                self.resolve_update(UpdateStatus::Failed);
            }
        }
    }

    /// Process one message, blocking until it arrives.
    pub fn step(&mut self, mailbox: &Mailbox<StatusMsg>) {
        let msg = mailbox.recv();
        self.dispatch(msg);
    }

    pub fn run(mut self, mailbox: &Mailbox<StatusMsg>) -> ! {
        info!("Monitor: running");
        loop {
            self.step(mailbox);
        }
    }

    fn set_connection(&mut self, next: ConnectionState) {
        if !self.connection.can_transition_to(next) {
            warn!("Monitor: ignoring link {:?} -> {:?}", self.connection, next);
            return;
        }
        info!("Monitor: link {:?} -> {:?}", self.connection, next);
        self.connection = next;
        self.writer.set_connection(next);
    }

    fn resolve_update(&mut self, next: UpdateStatus) -> bool {
        if !self.update.can_transition_to(next) {
            warn!("Monitor: update already {:?}, ignoring {:?}", self.update, next);
            return false;
        }
        info!("Monitor: update {:?}", next);
        self.update = next;
        self.writer.set_update(next);
        true
    }
}
