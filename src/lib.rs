//! OtaPortal firmware library.
//!
//! Exposes the coordination core (connection manager, status monitor,
//! update pipeline) and its adapters for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, with host simulations alongside.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod mailbox;
pub mod ota;

pub use error::{Error, Result};
