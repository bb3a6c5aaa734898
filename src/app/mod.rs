//! Coordination core: pure logic, no platform I/O.
//!
//! The connection manager and status monitor are actors fed by bounded
//! [`Mailbox`](crate::mailbox::Mailbox)es. All interaction with the radio,
//! flash and reset hardware goes through the **port traits** in [`ports`],
//! so this layer is fully testable on the host.

pub mod connection;
pub mod credentials;
pub mod messages;
pub mod monitor;
pub mod ports;
pub mod restart;
pub mod status;
