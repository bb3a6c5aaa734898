//! System configuration parameters
//!
//! All tunable parameters for the provisioning portal. Defaults match the
//! shipped firmware; the struct is serde-derived so a build can override it
//! from a JSON blob.

use core::time::Duration;

use serde::{Deserialize, Serialize};

/// Soft-AP settings for the provisioning network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointConfig {
    pub ssid: heapless::String<32>,
    /// WPA2-PSK passphrase (8-64 bytes).
    pub password: heapless::String<64>,
    pub channel: u8,
    pub hidden: bool,
    pub max_connections: u16,
    /// AP interface address; also handed out as gateway by the DHCP server.
    pub ip: [u8; 4],
    /// Netmask prefix length.
    pub netmask_bits: u8,
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        Self {
            ssid: heapless::String::try_from("ESP32_AP").unwrap_or_default(),
            password: heapless::String::try_from("11111111").unwrap_or_default(),
            channel: 1,
            hidden: false,
            max_connections: 5,
            ip: [192, 168, 0, 1],
            netmask_bits: 24,
        }
    }
}

/// Firmware upload settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaConfig {
    /// Consecutive socket timeouts tolerated before the upload is abandoned.
    pub max_read_timeouts: u8,
    /// Upper bound on `Content-Length` (app partition size).
    pub max_image_size: u32,
}

impl Default for OtaConfig {
    fn default() -> Self {
        Self {
            max_read_timeouts: 10,
            max_image_size: 4 * 1024 * 1024, // 4 MB
        }
    }
}

/// `esp_http_server` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpServerConfig {
    pub stack_size: usize,
    pub max_uri_handlers: usize,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            stack_size: 8192,
            max_uri_handlers: 20,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub access_point: AccessPointConfig,

    // --- Station ---
    /// Reconnect attempts after a disconnect before the link is reported failed.
    pub max_connection_retries: u8,

    // --- Mailboxes ---
    /// How long a sender waits on a full mailbox before giving up (milliseconds).
    pub mailbox_send_timeout_ms: u32,

    // --- OTA ---
    pub ota: OtaConfig,
    /// Delay between a committed update and the restart into it (milliseconds).
    pub restart_delay_ms: u32,

    // --- HTTP ---
    pub http: HttpServerConfig,
}

impl SystemConfig {
    pub fn mailbox_send_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.mailbox_send_timeout_ms))
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.restart_delay_ms))
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            access_point: AccessPointConfig::default(),
            max_connection_retries: 5,
            mailbox_send_timeout_ms: 2000,
            ota: OtaConfig::default(),
            restart_delay_ms: 8000,
            http: HttpServerConfig::default(),
        }
    }
}

/// FreeRTOS task layout for the long-lived actors.
pub mod tasks {
    use crate::drivers::task_pin::Core;

    /// Thread name (NUL-terminated for `esp_pthread_cfg_t`), core, priority, stack.
    #[derive(Debug, Clone, Copy)]
    pub struct TaskSpec {
        pub name: &'static str,
        pub core: Core,
        pub priority: u8,
        pub stack_kb: usize,
    }

    /// WiFi application task: connection manager event loop.
    pub const CONNECTION_MANAGER: TaskSpec = TaskSpec {
        name: "wifi-app\0",
        core: Core::Pro,
        priority: 5,
        stack_kb: 4,
    };

    /// HTTP server monitor: status monitor event loop.
    pub const STATUS_MONITOR: TaskSpec = TaskSpec {
        name: "http-monitor\0",
        core: Core::Pro,
        priority: 3,
        stack_kb: 4,
    };
}
