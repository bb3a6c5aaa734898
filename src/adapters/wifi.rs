//! WiFi AP+STA adapter.
//!
//! Implements [`WifiDriverPort`] for the radio
//! and forwards system-event-loop notifications to the connection manager
//! as [`DriverEvent`]s.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulated radio for host-side tests.
//!
//! ## Mode
//!
//! The portal runs the soft-AP and the station side by side: the AP stays
//! up so the user can watch `/wifiConnectStatus` while the station joins
//! the target network.

use log::{info, warn};

use crate::app::credentials::WifiCredentials;
use crate::app::messages::DriverEvent;
use crate::app::ports::WifiDriverPort;
use crate::error::WifiError;

/// 802.11 reason codes reported by the simulated radio.
pub mod reason {
    pub const HANDSHAKE_TIMEOUT: u16 = 15;
    pub const NO_AP_FOUND: u16 = 201;
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF driver
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::{EspWifiDriver, forward_driver_events, start_portal_wifi};

#[cfg(target_os = "espidf")]
mod esp {
    use anyhow::{Context, anyhow};
    use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::ipv4::{
        Configuration as IpConfiguration, Mask, RouterConfiguration, Subnet,
    };
    use esp_idf_svc::netif::{EspNetif, IpEvent, NetifConfiguration};
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{
        AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
        WifiEvent,
    };

    use super::{DriverEvent, WifiCredentials, WifiDriverPort, WifiError, info, warn};
    use crate::app::connection::ConnectionHandle;
    use crate::config::AccessPointConfig;

    /// Bring up the radio in AP+STA mode with the provisioning AP on a static address.
    pub fn start_portal_wifi(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        ap: &AccessPointConfig,
    ) -> anyhow::Result<EspWifi<'static>> {
        let mut wifi = EspWifi::new(modem, sysloop, nvs)?;

        let [a, b, c, d] = ap.ip;
        let ap_ip = core::net::Ipv4Addr::new(a, b, c, d);
        let ap_netif = EspNetif::new_with_conf(&NetifConfiguration {
            ip_configuration: Some(IpConfiguration::Router(RouterConfiguration {
                subnet: Subnet {
                    gateway: ap_ip,
                    mask: Mask(ap.netmask_bits),
                },
                dhcp_enabled: true,
                dns: None,
                secondary_dns: None,
            })),
            ..NetifConfiguration::wifi_default_router()
        })
        .context("failed to create AP netif")?;
        wifi.swap_netif_ap(ap_netif)
            .context("failed to apply static AP address")?;

        wifi.set_configuration(&Configuration::Mixed(
            ClientConfiguration::default(),
            AccessPointConfiguration {
                ssid: ap
                    .ssid
                    .as_str()
                    .try_into()
                    .map_err(|_| anyhow!("AP SSID too long"))?,
                password: ap
                    .password
                    .as_str()
                    .try_into()
                    .map_err(|_| anyhow!("AP password too long"))?,
                auth_method: AuthMethod::WPA2Personal,
                channel: ap.channel,
                ssid_hidden: ap.hidden,
                max_connections: ap.max_connections,
                ..Default::default()
            },
        ))?;

        // HT20 on the AP, and no modem sleep so the portal stays responsive.
        esp_idf_sys::esp!(unsafe {
            esp_idf_sys::esp_wifi_set_bandwidth(
                esp_idf_sys::wifi_interface_t_WIFI_IF_AP,
                esp_idf_sys::wifi_bandwidth_t_WIFI_BW_HT20,
            )
        })?;
        wifi.start()?;
        esp_idf_sys::esp!(unsafe {
            esp_idf_sys::esp_wifi_set_ps(esp_idf_sys::wifi_ps_type_t_WIFI_PS_NONE)
        })?;

        info!(
            "WiFi: AP '{}' up on {} (channel {}, max {} clients)",
            ap.ssid, ap_ip, ap.channel, ap.max_connections
        );
        Ok(wifi)
    }

    fn decode_wifi(event: &WifiEvent<'_>) -> Option<DriverEvent> {
        Some(match event {
            WifiEvent::ApStarted => DriverEvent::ApStarted,
            WifiEvent::ApStopped => DriverEvent::ApStopped,
            WifiEvent::ApStaConnected(_) => DriverEvent::ApClientJoined,
            WifiEvent::ApStaDisconnected(_) => DriverEvent::ApClientLeft,
            WifiEvent::StaStarted => DriverEvent::StaStarted,
            WifiEvent::StaConnected(_) => DriverEvent::StaConnected,
            WifiEvent::StaDisconnected(info) => DriverEvent::StaDisconnected {
                reason: info.reason(),
            },
            _ => return None,
        })
    }

    fn decode_ip(event: &IpEvent<'_>) -> Option<DriverEvent> {
        match event {
            IpEvent::DhcpIpAssigned(assignment) => Some(DriverEvent::GotIp(assignment.ip())),
            _ => None,
        }
    }

    /// Subscribe to WiFi and IP events and push them into the connection
    /// manager's mailbox. Keep the returned subscriptions alive.
    pub fn forward_driver_events(
        sysloop: &EspSystemEventLoop,
        connection: ConnectionHandle<'static>,
    ) -> anyhow::Result<[EspSubscription<'static, System>; 2]> {
        let wifi_sub = sysloop.subscribe::<WifiEvent, _>(move |event| {
            if let Some(ev) = decode_wifi(&event) {
                if let Err(e) = connection.driver_event(ev) {
                    warn!("WiFi: dropped driver event {:?}: {}", ev, e);
                }
            }
        })?;
        let ip_sub = sysloop.subscribe::<IpEvent, _>(move |event| {
            if let Some(ev) = decode_ip(&event) {
                if let Err(e) = connection.driver_event(ev) {
                    warn!("WiFi: dropped driver event {:?}: {}", ev, e);
                }
            }
        })?;
        Ok([wifi_sub, ip_sub])
    }

    /// Station-side control over the shared AP+STA driver.
    pub struct EspWifiDriver {
        wifi: EspWifi<'static>,
    }

    impl EspWifiDriver {
        pub fn new(wifi: EspWifi<'static>) -> Self {
            Self { wifi }
        }
    }

    impl WifiDriverPort for EspWifiDriver {
        fn apply_station_config(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError> {
            let ap = match self.wifi.get_configuration() {
                Ok(Configuration::Mixed(_, ap) | Configuration::AccessPoint(ap)) => ap,
                Ok(_) => AccessPointConfiguration::default(),
                Err(e) => {
                    warn!("WiFi: cannot read configuration: {}", e);
                    return Err(WifiError::NotStarted);
                }
            };
            let client = ClientConfiguration {
                ssid: credentials
                    .ssid()
                    .try_into()
                    .map_err(|_| WifiError::ConfigRejected)?,
                password: credentials
                    .password()
                    .try_into()
                    .map_err(|_| WifiError::ConfigRejected)?,
                auth_method: if credentials.is_open() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            };
            self.wifi
                .set_configuration(&Configuration::Mixed(client, ap))
                .map_err(|e| {
                    warn!("WiFi: set_configuration failed: {}", e);
                    WifiError::ConfigRejected
                })
        }

        fn connect(&mut self) -> Result<(), WifiError> {
            self.wifi.connect().map_err(|e| {
                warn!("WiFi: esp_wifi_connect failed: {}", e);
                WifiError::ConnectFailed
            })
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated radio
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use sim::{SimNetwork, SimWifiDriver};

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::net::Ipv4Addr;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::{DriverEvent, WifiCredentials, WifiDriverPort, WifiError, info, reason, warn};

    /// An access point the simulated station can see.
    #[derive(Debug, Clone)]
    pub struct SimNetwork {
        pub ssid: String,
        pub password: String,
    }

    /// Station driver that answers each connect with a scripted outcome.
    ///
    /// Outcomes are queued on a shared feed; the test (or a pump thread)
    /// moves them into the connection manager's mailbox, the way the system
    /// event loop does on hardware.
    pub struct SimWifiDriver {
        networks: Vec<SimNetwork>,
        configured: Option<WifiCredentials>,
        connect_calls: u32,
        feed: Arc<Mutex<VecDeque<DriverEvent>>>,
    }

    impl SimWifiDriver {
        pub fn new(networks: Vec<SimNetwork>) -> Self {
            Self {
                networks,
                configured: None,
                connect_calls: 0,
                feed: Arc::new(Mutex::new(VecDeque::new())),
            }
        }

        /// Shared handle to the pending driver events.
        pub fn feed(&self) -> Arc<Mutex<VecDeque<DriverEvent>>> {
            Arc::clone(&self.feed)
        }

        pub fn connect_calls(&self) -> u32 {
            self.connect_calls
        }

        pub fn configured(&self) -> Option<&WifiCredentials> {
            self.configured.as_ref()
        }

        fn push(&self, event: DriverEvent) {
            match self.feed.lock() {
                Ok(mut q) => q.push_back(event),
                Err(_) => warn!("WiFi(sim): event feed poisoned, dropping {:?}", event),
            }
        }
    }

    impl WifiDriverPort for SimWifiDriver {
        fn apply_station_config(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError> {
            info!("WiFi(sim): station config -> '{}'", credentials.ssid());
            self.configured = Some(credentials.clone());
            Ok(())
        }

        fn connect(&mut self) -> Result<(), WifiError> {
            let creds = self.configured.as_ref().ok_or(WifiError::NotStarted)?;
            self.connect_calls += 1;
            let outcome = match self.networks.iter().find(|n| n.ssid == creds.ssid()) {
                None => DriverEvent::StaDisconnected {
                    reason: reason::NO_AP_FOUND,
                },
                Some(n) if n.password != creds.password() => DriverEvent::StaDisconnected {
                    reason: reason::HANDSHAKE_TIMEOUT,
                },
                Some(_) => DriverEvent::GotIp(Ipv4Addr::new(192, 168, 1, 100)),
            };
            info!("WiFi(sim): connect #{} -> {:?}", self.connect_calls, outcome);
            self.push(outcome);
            Ok(())
        }
    }

}
