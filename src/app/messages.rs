//! Messages carried by the two actor mailboxes.

use core::net::Ipv4Addr;

use super::credentials::WifiCredentials;

/// Status notifications consumed by the status monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMsg {
    WifiConnectInit,
    WifiConnectSuccess,
    WifiConnectFail,
    OtaSuccessful,
    OtaFailed,
}

/// WiFi driver notifications, decoded from the system event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    ApStarted,
    ApStopped,
    /// A client joined the provisioning AP.
    ApClientJoined,
    ApClientLeft,
    StaStarted,
    StaConnected,
    /// Station link lost; `reason` is the 802.11 reason code.
    StaDisconnected { reason: u16 },
    GotIp(Ipv4Addr),
}

/// Requests consumed by the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMsg {
    /// Portal user submitted new station credentials.
    Provision(WifiCredentials),
    Driver(DriverEvent),
}
