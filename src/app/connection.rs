//! Station connection manager.
//!
//! Owns the WiFi driver and the retry budget. Every status change it makes
//! is posted to the status monitor as a [`StatusMsg`]; the monitor is the
//! only writer of the shared board.
//!
//! ```text
//!              provision
//!   Idle ─────────────────▶ Connecting ──GotIp──▶ Connected
//!                            │    ▲                   │
//!                disconnect, │    │ disconnect,       │ disconnect
//!              budget spent  │    │ budget left       │
//!                            ▼    └───────────────────┘
//!                          Failed
//! ```

use core::time::Duration;

use log::{debug, info, warn};

use crate::mailbox::{Mailbox, MailboxError};

use super::credentials::WifiCredentials;
use super::messages::{ConnectionMsg, DriverEvent, StatusMsg};
use super::ports::{StatusSink, WifiDriverPort};
use super::status::ConnectionState;

pub struct ConnectionManager<W: WifiDriverPort, S: StatusSink> {
    driver: W,
    sink: S,
    credentials: Option<WifiCredentials>,
    state: ConnectionState,
    retries: u8,
    max_retries: u8,
}

impl<W: WifiDriverPort, S: StatusSink> ConnectionManager<W, S> {
    pub fn new(driver: W, sink: S, max_retries: u8) -> Self {
        Self {
            driver,
            sink,
            credentials: None,
            state: ConnectionState::Idle,
            retries: 0,
            max_retries,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    pub fn credentials(&self) -> Option<&WifiCredentials> {
        self.credentials.as_ref()
    }

    pub fn driver(&self) -> &W {
        &self.driver
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Adopt new credentials and start a fresh connection attempt.
    pub fn provision(&mut self, credentials: WifiCredentials) {
        info!("WiFi: provisioning station for '{}'", credentials.ssid());
        self.retries = 0;
        self.state = ConnectionState::Connecting;
        self.emit(StatusMsg::WifiConnectInit);

        let applied = self.driver.apply_station_config(&credentials);
        self.credentials = Some(credentials);
        if let Err(e) = applied {
            warn!("WiFi: station config rejected: {}", e);
            self.state = ConnectionState::Failed;
            self.emit(StatusMsg::WifiConnectFail);
            return;
        }

        if let Err(e) = self.driver.connect() {
            warn!("WiFi: connect refused: {}", e);
            if let Some(msg) = self.reconnect() {
                self.emit(msg);
            }
        }
    }

    /// Fold one driver notification into the state machine.
    ///
    /// Returns the last status message posted for this event, if any.
    pub fn on_driver_event(&mut self, event: DriverEvent) -> Option<StatusMsg> {
        match event {
            DriverEvent::GotIp(ip) => self.on_got_ip(ip),
            DriverEvent::StaDisconnected { reason } => self.on_disconnected(reason),
            DriverEvent::ApStarted => {
                info!("WiFi: provisioning AP up");
                None
            }
            DriverEvent::ApStopped => {
                info!("WiFi: provisioning AP down");
                None
            }
            DriverEvent::ApClientJoined => {
                info!("WiFi: client joined AP");
                None
            }
            DriverEvent::ApClientLeft => {
                info!("WiFi: client left AP");
                None
            }
            DriverEvent::StaStarted | DriverEvent::StaConnected => {
                debug!("WiFi: {:?}", event);
                None
            }
        }
    }

    pub fn dispatch(&mut self, msg: ConnectionMsg) {
        match msg {
            ConnectionMsg::Provision(credentials) => self.provision(credentials),
            ConnectionMsg::Driver(event) => {
                self.on_driver_event(event);
            }
        }
    }

    /// Process one message, blocking until it arrives.
    pub fn step(&mut self, mailbox: &Mailbox<ConnectionMsg>) {
        let msg = mailbox.recv();
        self.dispatch(msg);
    }

    /// Actor loop. Never returns.
    pub fn run(mut self, mailbox: &Mailbox<ConnectionMsg>) -> ! {
        info!("WiFi: connection manager running");
        loop {
            self.step(mailbox);
        }
    }

    fn on_got_ip(&mut self, ip: core::net::Ipv4Addr) -> Option<StatusMsg> {
        match self.state {
            ConnectionState::Connecting => {
                info!("WiFi: connected, station IP {}", ip);
                self.state = ConnectionState::Connected;
                // A disconnect after this point starts with a full budget.
                self.retries = 0;
                self.emit(StatusMsg::WifiConnectSuccess);
                Some(StatusMsg::WifiConnectSuccess)
            }
            ConnectionState::Connected => {
                debug!("WiFi: IP renewed ({})", ip);
                None
            }
            ConnectionState::Idle | ConnectionState::Failed => {
                warn!("WiFi: stray IP {} while {:?}, ignored", ip, self.state);
                None
            }
        }
    }

    fn on_disconnected(&mut self, reason: u16) -> Option<StatusMsg> {
        match self.state {
            ConnectionState::Idle | ConnectionState::Failed => {
                debug!("WiFi: disconnect (reason {}) while {:?}, ignored", reason, self.state);
                None
            }
            ConnectionState::Connected => {
                warn!("WiFi: link lost (reason {})", reason);
                self.state = ConnectionState::Connecting;
                self.emit(StatusMsg::WifiConnectInit);
                match self.reconnect() {
                    Some(msg) => {
                        self.emit(msg);
                        Some(msg)
                    }
                    None => Some(StatusMsg::WifiConnectInit),
                }
            }
            ConnectionState::Connecting => {
                info!("WiFi: attempt failed (reason {})", reason);
                let outcome = self.reconnect();
                if let Some(msg) = outcome {
                    self.emit(msg);
                }
                outcome
            }
        }
    }

    /// Spend retries until the driver accepts a connect request.
    /// Returns `WifiConnectFail` once the budget is gone.
    fn reconnect(&mut self) -> Option<StatusMsg> {
        while self.retries < self.max_retries {
            self.retries += 1;
            info!("WiFi: reconnect {}/{}", self.retries, self.max_retries);
            match self.driver.connect() {
                Ok(()) => return None,
                Err(e) => warn!("WiFi: reconnect refused: {}", e),
            }
        }
        warn!("WiFi: giving up after {} retries", self.retries);
        self.state = ConnectionState::Failed;
        Some(StatusMsg::WifiConnectFail)
    }

    fn emit(&mut self, msg: StatusMsg) {
        if let Err(e) = self.sink.post(msg) {
            warn!("WiFi: status {:?} dropped: {}", msg, e);
        }
    }
}

/// Producer side of the connection manager's mailbox.
#[derive(Clone, Copy)]
pub struct ConnectionHandle<'a> {
    mailbox: &'a Mailbox<ConnectionMsg>,
    timeout: Duration,
}

impl<'a> ConnectionHandle<'a> {
    pub fn new(mailbox: &'a Mailbox<ConnectionMsg>, timeout: Duration) -> Self {
        Self { mailbox, timeout }
    }

    pub fn provision(&self, credentials: WifiCredentials) -> Result<(), MailboxError> {
        self.mailbox
            .send_timeout(ConnectionMsg::Provision(credentials), self.timeout)
    }

    pub fn driver_event(&self, event: DriverEvent) -> Result<(), MailboxError> {
        self.mailbox.send_timeout(ConnectionMsg::Driver(event), self.timeout)
    }
}
