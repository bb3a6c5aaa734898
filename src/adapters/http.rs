//! HTTP portal routes.
//!
//! Route logic (bodies, status codes, credential parsing, upload
//! exclusivity) is plain Rust and tested on the host. The `esp_http_server`
//! registration that wires it to real requests is ESP-IDF only.
//!
//! | Method | Path                | Handler                      |
//! |--------|---------------------|------------------------------|
//! | POST   | `/OTAupdate`        | [`UploadRoute::handle`]      |
//! | POST   | `/OTAstatus`        | [`ota_status_body`]          |
//! | POST   | `/wifiConnect.json` | [`submit_provisioning`]      |
//! | POST   | `/wifiConnectStatus`| [`wifi_status_body`]         |

use std::sync::{Mutex, TryLockError};

use log::{info, warn};
use serde::Serialize;

use crate::Error;
use crate::app::connection::ConnectionHandle;
use crate::app::credentials::{CredentialsError, WifiCredentials};
use crate::app::ports::{FirmwareStore, StatusSink, UploadStream};
use crate::app::status::{ConnectionState, StatusReader, UpdateStatus};
use crate::config::OtaConfig;
use crate::mailbox::MailboxError;
use crate::ota::UpdatePipeline;

use super::system::BuildInfo;

pub const SSID_HEADER: &str = "my-connect-ssid";
pub const PASSWORD_HEADER: &str = "my-connect-pwd";

pub const HTTP_OK: u16 = 200;
pub const HTTP_BAD_REQUEST: u16 = 400;
pub const HTTP_CONFLICT: u16 = 409;
pub const HTTP_INTERNAL_ERROR: u16 = 500;
pub const HTTP_UNAVAILABLE: u16 = 503;

// ── Response bodies ───────────────────────────────────────────

#[derive(Serialize)]
struct OtaStatusBody<'a> {
    ota_update_status: i8,
    compile_time: &'a str,
    compile_date: &'a str,
}

#[derive(Serialize)]
struct WifiStatusBody {
    wifi_connect_status: u8,
}

fn json_body<T: Serialize>(route: &str, body: &T) -> String {
    serde_json::to_string(body).unwrap_or_else(|e| {
        warn!("HTTP: could not encode {} response: {}", route, e);
        String::new()
    })
}

/// `/OTAstatus` response.
pub fn ota_status_body(status: UpdateStatus, build: &BuildInfo) -> String {
    json_body(
        "/OTAstatus",
        &OtaStatusBody {
            ota_update_status: status.code(),
            compile_time: build.time,
            compile_date: build.date,
        },
    )
}

/// `/wifiConnectStatus` response.
pub fn wifi_status_body(state: ConnectionState) -> String {
    json_body(
        "/wifiConnectStatus",
        &WifiStatusBody {
            wifi_connect_status: state.code(),
        },
    )
}

// ── /wifiConnect.json ─────────────────────────────────────────

/// Build credentials from the portal's request headers.
///
/// A missing password header is rejected; an empty one selects an open network.
pub fn credentials_from_headers(
    ssid: Option<&str>,
    password: Option<&str>,
) -> Result<WifiCredentials, CredentialsError> {
    let ssid = ssid.ok_or(CredentialsError::InvalidSsid)?;
    let password = password.ok_or(CredentialsError::InvalidPassword)?;
    WifiCredentials::new(ssid, password)
}

/// Parse the provisioning headers and queue the credentials for the
/// connection manager.
pub fn submit_provisioning(
    connection: &ConnectionHandle<'_>,
    ssid: Option<&str>,
    password: Option<&str>,
) -> crate::Result<()> {
    let credentials = credentials_from_headers(ssid, password)?;
    info!("HTTP: provisioning request for '{}'", credentials.ssid());
    connection.provision(credentials)?;
    Ok(())
}

/// Status code for the outcome of [`submit_provisioning`].
pub fn provision_status_code(outcome: &crate::Result<()>) -> u16 {
    match outcome {
        Ok(()) => HTTP_OK,
        Err(Error::Mailbox(MailboxError::Full)) => HTTP_UNAVAILABLE,
        Err(Error::Credentials(_)) => HTTP_BAD_REQUEST,
    }
}

// ── /OTAupdate ────────────────────────────────────────────────

/// Firmware store plus the outcome this route has already produced.
///
/// The status board learns the outcome only when the monitor drains its
/// mailbox, so the route keeps its own record under the same lock.
struct UploadSlot<F> {
    store: F,
    resolved: Option<UpdateStatus>,
}

/// Upload endpoint state: the firmware store behind a lock that doubles as
/// the one-upload-at-a-time gate.
pub struct UploadRoute<F: FirmwareStore> {
    slot: Mutex<UploadSlot<F>>,
    pipeline: UpdatePipeline,
    status: StatusReader,
}

impl<F: FirmwareStore> UploadRoute<F> {
    pub fn new(store: F, config: &OtaConfig, status: StatusReader) -> Self {
        Self {
            slot: Mutex::new(UploadSlot {
                store,
                resolved: None,
            }),
            pipeline: UpdatePipeline::new(config),
            status,
        }
    }

    /// Run one upload and return the HTTP status code.
    ///
    /// 200 once the body was consumed (the outcome itself is reported
    /// through `/OTAstatus`), 500 when the socket failed, 409 when another
    /// upload holds the store or an outcome is already recorded.
    pub fn handle<U, S>(&self, stream: &mut U, content_length: usize, sink: &mut S) -> u16
    where
        U: UploadStream,
        S: StatusSink,
    {
        let recorded = self.status.update();
        if recorded.is_terminal() {
            warn!("HTTP: upload refused, update already {:?}", recorded);
            return HTTP_CONFLICT;
        }

        let mut slot = match self.slot.try_lock() {
            Ok(slot) => slot,
            Err(TryLockError::WouldBlock) => {
                warn!("HTTP: upload refused, another upload in progress");
                return HTTP_CONFLICT;
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                warn!("HTTP: firmware store lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        // The inactive slot may already be the next boot target.
        if let Some(outcome) = slot.resolved {
            warn!("HTTP: upload refused, this boot already produced {:?}", outcome);
            return HTTP_CONFLICT;
        }

        let result = self
            .pipeline
            .handle_upload(stream, content_length, &mut slot.store, sink);
        slot.resolved = Some(if result.is_ok() {
            UpdateStatus::Successful
        } else {
            UpdateStatus::Failed
        });

        match result {
            Ok(committed) => {
                info!("HTTP: upload accepted ({} bytes)", committed.bytes_written);
                HTTP_OK
            }
            Err(e) if e.is_stream_failure() => HTTP_INTERNAL_ERROR,
            Err(_) => HTTP_OK,
        }
    }
}

// ── esp_http_server wiring ────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::{PortalContext, start_http_server};

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::Arc;

    use esp_idf_svc::http::{Headers, Method};
    use esp_idf_svc::http::server::{
        Configuration as HttpConfiguration, EspHttpConnection, EspHttpServer, Request,
    };
    use esp_idf_svc::io::{Read, Write};
    use log::{info, warn};

    use super::{
        HTTP_OK, PASSWORD_HEADER, SSID_HEADER, UploadRoute, ota_status_body,
        provision_status_code, submit_provisioning, wifi_status_body,
    };
    use crate::adapters::firmware::EspFirmwareStore;
    use crate::adapters::system::BuildInfo;
    use crate::app::connection::ConnectionHandle;
    use crate::app::ports::{MailboxSink, StreamError, UploadStream};
    use crate::app::status::StatusReader;
    use crate::config::HttpServerConfig;

    /// Everything the handlers share.
    pub struct PortalContext {
        pub status: StatusReader,
        pub connection: ConnectionHandle<'static>,
        pub status_sink: MailboxSink<'static>,
        pub upload: UploadRoute<EspFirmwareStore>,
        pub build: BuildInfo,
    }

    type Req<'r, 'c> = Request<&'r mut EspHttpConnection<'c>>;

    struct RequestStream<'a, 'r, 'c> {
        req: &'a mut Req<'r, 'c>,
    }

    impl UploadStream for RequestStream<'_, '_, '_> {
        fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
            self.req.read(buf).map_err(|e| {
                let code = e.0.code();
                if code == esp_idf_sys::HTTPD_SOCK_ERR_TIMEOUT {
                    StreamError::Timeout
                } else {
                    StreamError::Io(code)
                }
            })
        }
    }

    fn respond(req: Req<'_, '_>, code: u16, content_type: &str, body: &[u8]) -> anyhow::Result<()> {
        req.into_response(code, None, &[("Content-Type", content_type)])?
            .write_all(body)?;
        Ok(())
    }

    pub fn start_http_server(
        config: &HttpServerConfig,
        ctx: Arc<PortalContext>,
    ) -> anyhow::Result<EspHttpServer<'static>> {
        let mut server = EspHttpServer::new(&HttpConfiguration {
            stack_size: config.stack_size,
            max_uri_handlers: config.max_uri_handlers,
            ..Default::default()
        })?;

        {
            let ctx = Arc::clone(&ctx);
            server.fn_handler::<anyhow::Error, _>("/OTAupdate", Method::Post, move |mut req| {
                let content_length = req.content_len().unwrap_or(0) as usize;
                let mut sink = ctx.status_sink;
                let code = ctx.upload.handle(
                    &mut RequestStream { req: &mut req },
                    content_length,
                    &mut sink,
                );
                respond(req, code, "text/plain", b"")
            })?;
        }

        {
            let ctx = Arc::clone(&ctx);
            server.fn_handler::<anyhow::Error, _>("/OTAstatus", Method::Post, move |req| {
                let body = ota_status_body(ctx.status.update(), &ctx.build);
                respond(req, HTTP_OK, "application/json", body.as_bytes())
            })?;
        }

        {
            let ctx = Arc::clone(&ctx);
            server.fn_handler::<anyhow::Error, _>("/wifiConnect.json", Method::Post, move |req| {
                let outcome = submit_provisioning(
                    &ctx.connection,
                    req.header(SSID_HEADER),
                    req.header(PASSWORD_HEADER),
                );
                if let Err(e) = &outcome {
                    warn!("HTTP: provisioning request refused: {}", e);
                }
                respond(req, provision_status_code(&outcome), "text/plain", b"")
            })?;
        }

        {
            let ctx = Arc::clone(&ctx);
            server.fn_handler::<anyhow::Error, _>("/wifiConnectStatus", Method::Post, move |req| {
                let body = wifi_status_body(ctx.status.connection());
                respond(req, HTTP_OK, "application/json", body.as_bytes())
            })?;
        }

        info!("HTTP: portal routes registered");
        Ok(server)
    }
}
