//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                  | Connects to                  |
//! |------------|-----------------------------|------------------------------|
//! | `firmware` | FirmwareStore               | esp-ota partitions / RAM sim |
//! | `http`     | route handlers              | esp_http_server              |
//! | `system`   | RestartPort, RestartTimer   | esp_restart, esp_timer       |
//! | `wifi`     | WifiDriverPort              | ESP-IDF WiFi AP+STA / sim    |
//! |            | driver event forwarding     | system event loop            |

pub mod firmware;
pub mod http;
pub mod system;
pub mod wifi;
