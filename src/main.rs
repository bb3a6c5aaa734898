//! OtaPortal firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  EspWifiDriver     EspFirmwareStore    EspRestartTimer       │
//! │  (WifiDriverPort)  (FirmwareStore)     (RestartTimer)        │
//! │  sysloop forwarder esp_http_server routes                    │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌──────────────────────┐  StatusMsg  ┌───────────────────┐  │
//! │  │ ConnectionManager    │────────────▶│ StatusMonitor     │  │
//! │  │ (wifi-app task)      │             │ (http-monitor)    │  │
//! │  └──────────────────────┘      ▲      └─────────┬─────────┘  │
//! │                                │ StatusMsg      │ writes     │
//! │                   UpdatePipeline (httpd task)   ▼            │
//! │                                          StatusBoard ──▶ GET │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::{Context, Result};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use otaportal::adapters::firmware::{self, EspFirmwareStore};
use otaportal::adapters::http::{PortalContext, UploadRoute, start_http_server};
use otaportal::adapters::system::{BuildInfo, EspRestartTimer};
use otaportal::adapters::wifi::{EspWifiDriver, forward_driver_events, start_portal_wifi};
use otaportal::app::connection::{ConnectionHandle, ConnectionManager};
use otaportal::app::messages::{ConnectionMsg, StatusMsg};
use otaportal::app::monitor::StatusMonitor;
use otaportal::app::ports::MailboxSink;
use otaportal::app::status::status_board;
use otaportal::config::{SystemConfig, tasks};
use otaportal::drivers::task_pin::spawn_task;
use otaportal::mailbox::Mailbox;

// ── Mailboxes ─────────────────────────────────────────────────

static CONNECTION_MAILBOX: Mailbox<ConnectionMsg> = Mailbox::new();
static STATUS_MAILBOX: Mailbox<StatusMsg> = Mailbox::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    let build = BuildInfo::current();
    info!(
        "OtaPortal v{} (built {} {})",
        env!("CARGO_PKG_VERSION"),
        build.date,
        build.time
    );

    // ── 2. Keep the image we booted into ──────────────────────
    firmware::check_rollback();

    let config = SystemConfig::default();
    let send_timeout = config.mailbox_send_timeout();

    // ── 3. Status board + monitor ─────────────────────────────
    let (writer, reader) = status_board();
    let monitor = StatusMonitor::new(writer, EspRestartTimer::new()?, config.restart_delay());
    spawn_task(&tasks::STATUS_MONITOR, move || monitor.run(&STATUS_MAILBOX))
        .context("status monitor task")?;

    // ── 4. Radio: AP+STA with event forwarding ────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = match EspDefaultNvsPartition::take() {
        Ok(nvs) => Some(nvs),
        Err(e) => {
            warn!("NVS partition unavailable ({}), WiFi runs without persistence", e);
            None
        }
    };
    let wifi = start_portal_wifi(peripherals.modem, sysloop.clone(), nvs, &config.access_point)?;

    // Event loop callbacks must not block on a full mailbox.
    let event_handle = ConnectionHandle::new(&CONNECTION_MAILBOX, core::time::Duration::ZERO);
    let _subscriptions = forward_driver_events(&sysloop, event_handle)?;

    // ── 5. Connection manager ─────────────────────────────────
    let manager = ConnectionManager::new(
        EspWifiDriver::new(wifi),
        MailboxSink::new(&STATUS_MAILBOX, send_timeout),
        config.max_connection_retries,
    );
    spawn_task(&tasks::CONNECTION_MANAGER, move || manager.run(&CONNECTION_MAILBOX))
        .context("connection manager task")?;

    // ── 6. HTTP portal ────────────────────────────────────────
    let ctx = Arc::new(PortalContext {
        status: reader.clone(),
        connection: ConnectionHandle::new(&CONNECTION_MAILBOX, send_timeout),
        status_sink: MailboxSink::new(&STATUS_MAILBOX, send_timeout),
        upload: UploadRoute::new(EspFirmwareStore::new(), &config.ota, reader),
        build,
    });
    let _server = start_http_server(&config.http, ctx)?;

    info!("System ready. Portal at http://{}.{}.{}.{}/",
        config.access_point.ip[0],
        config.access_point.ip[1],
        config.access_point.ip[2],
        config.access_point.ip[3]
    );

    // Actors and httpd run on their own tasks; keep the handles alive.
    loop {
        std::thread::park();
    }
}
