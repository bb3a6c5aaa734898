//! Streaming update pipeline.
//!
//! Pulls the request body through a fixed 1 KiB buffer, strips the
//! multipart headers from the first chunk and streams the rest into the
//! inactive partition. The outcome is posted to the status monitor exactly
//! once, after every flash operation has finished.

use core::fmt::Write as _;

use log::{debug, error, info, warn};

use crate::app::messages::StatusMsg;
use crate::app::ports::{FirmwareStore, PartitionInfo, StatusSink, StreamError, UploadStream};
use crate::config::OtaConfig;

use super::OtaError;
use super::boundary::find_payload_start;

/// Receive buffer; also the largest single read requested from the stream.
pub const RECV_BUF_SIZE: usize = 1024;

/// Result of a committed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Payload bytes written to flash (body minus multipart headers).
    pub bytes_written: usize,
    /// Partition the bootloader will start next.
    pub partition: PartitionInfo,
    /// SHA-256 of the written payload.
    pub sha256: [u8; 32],
}

/// Bookkeeping for one upload request.
pub struct UpdateSession {
    pub target: Option<PartitionInfo>,
    /// `Content-Length` of the request.
    pub bytes_expected: usize,
    /// Raw body bytes pulled from the stream, headers included.
    pub bytes_received: usize,
    /// Payload bytes written to flash.
    pub bytes_written: usize,
    pub first_chunk_processed: bool,
    digest: hmac_sha256::Hash,
}

impl UpdateSession {
    pub fn new(content_length: usize) -> Self {
        Self {
            target: None,
            bytes_expected: content_length,
            bytes_received: 0,
            bytes_written: 0,
            first_chunk_processed: false,
            digest: hmac_sha256::Hash::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.bytes_expected.saturating_sub(self.bytes_received)
    }

    fn is_open(&self) -> bool {
        self.target.is_some()
    }

    fn write(&mut self, store: &mut impl FirmwareStore, data: &[u8]) -> Result<(), OtaError> {
        if data.is_empty() {
            return Ok(());
        }
        store.write(data).map_err(OtaError::Write)?;
        self.digest.update(data);
        self.bytes_written += data.len();
        Ok(())
    }
}

pub struct UpdatePipeline {
    max_read_timeouts: u8,
    max_image_size: usize,
}

impl UpdatePipeline {
    pub fn new(config: &OtaConfig) -> Self {
        Self {
            max_read_timeouts: config.max_read_timeouts,
            max_image_size: config.max_image_size as usize,
        }
    }

    /// Stream one upload into the inactive partition and report the outcome.
    ///
    /// Exactly one of `OtaSuccessful` / `OtaFailed` is posted to `sink`, and
    /// only after the store has been activated or aborted.
    pub fn handle_upload<U, F, S>(
        &self,
        stream: &mut U,
        content_length: usize,
        store: &mut F,
        sink: &mut S,
    ) -> Result<Committed, OtaError>
    where
        U: UploadStream,
        F: FirmwareStore,
        S: StatusSink,
    {
        info!("OTA: receiving {} byte upload", content_length);
        let mut session = UpdateSession::new(content_length);

        let outcome = self.receive(&mut session, stream, store);
        if outcome.is_err() && session.is_open() {
            store.abort();
        }

        let msg = match &outcome {
            Ok(committed) => {
                info!(
                    "OTA: committed {} bytes to '{}', sha256 {}",
                    committed.bytes_written,
                    committed.partition.label,
                    hex_digest(&committed.sha256)
                );
                StatusMsg::OtaSuccessful
            }
            Err(e) => {
                warn!(
                    "OTA: upload failed after {}/{} bytes: {}",
                    session.bytes_received, session.bytes_expected, e
                );
                StatusMsg::OtaFailed
            }
        };
        if let Err(e) = sink.post(msg) {
            error!("OTA: could not report {:?}: {}", msg, e);
        }
        outcome
    }

    fn receive<U, F>(
        &self,
        session: &mut UpdateSession,
        stream: &mut U,
        store: &mut F,
    ) -> Result<Committed, OtaError>
    where
        U: UploadStream,
        F: FirmwareStore,
    {
        if session.bytes_expected == 0 {
            return Err(OtaError::EmptyUpload);
        }
        if session.bytes_expected > self.max_image_size {
            return Err(OtaError::TooLarge);
        }

        let mut buf = [0u8; RECV_BUF_SIZE];
        let mut timeouts: u8 = 0;

        while session.remaining() > 0 {
            let want = session.remaining().min(RECV_BUF_SIZE);
            let n = match stream.read_chunk(&mut buf[..want]) {
                Ok(0) => {
                    return Err(OtaError::Incomplete {
                        received: session.bytes_received,
                        expected: session.bytes_expected,
                    });
                }
                Ok(n) => {
                    timeouts = 0;
                    n.min(want)
                }
                Err(StreamError::Timeout) => {
                    if timeouts == self.max_read_timeouts {
                        return Err(OtaError::TimedOut);
                    }
                    timeouts += 1;
                    debug!("OTA: socket timeout {}/{}", timeouts, self.max_read_timeouts);
                    continue;
                }
                Err(StreamError::Io(code)) => return Err(OtaError::StreamRead(code)),
            };
            session.bytes_received += n;
            let chunk = &buf[..n];

            let payload = if session.first_chunk_processed {
                chunk
            } else {
                session.first_chunk_processed = true;
                let start = find_payload_start(chunk).ok_or(OtaError::MissingBoundary)?;
                let target = store.begin().map_err(OtaError::Open)?;
                info!(
                    "OTA: writing to partition '{}' at {:#x} ({} bytes)",
                    target.label, target.address, target.size
                );
                session.target = Some(target);
                &chunk[start..]
            };
            session.write(store, payload)?;
            debug!(
                "OTA: {} of {} bytes received",
                session.bytes_received, session.bytes_expected
            );
        }

        store.finalize().map_err(OtaError::Finalize)?;
        let partition = store.activate().map_err(OtaError::Activate)?;
        info!("OTA: next boot partition '{}' at {:#x}", partition.label, partition.address);

        Ok(Committed {
            bytes_written: session.bytes_written,
            partition,
            sha256: core::mem::replace(&mut session.digest, hmac_sha256::Hash::new()).finalize(),
        })
    }
}

/// Lower-case hex rendering of a SHA-256 digest.
pub fn hex_digest(digest: &[u8; 32]) -> heapless::String<64> {
    let mut out = heapless::String::new();
    for b in digest {
        // 32 bytes render to exactly 64 chars.
        if write!(out, "{b:02x}").is_err() {
            break;
        }
    }
    out
}
