//! Mock platform adapters for integration tests.
//!
//! Records every status message, restart arming and stream read so tests
//! can assert on the full history without a radio or flash.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use otaportal::app::messages::StatusMsg;
use otaportal::app::ports::{RestartPort, RestartTimer, StatusSink, StreamError, UploadStream};
use otaportal::mailbox::MailboxError;

// ── Status sink ───────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Vec<StatusMsg>,
}

impl StatusSink for RecordingSink {
    fn post(&mut self, msg: StatusMsg) -> Result<(), MailboxError> {
        self.sent.push(msg);
        Ok(())
    }
}

// ── Restart timer ─────────────────────────────────────────────

/// Records arming delays; shares them with the test through an `Arc`.
#[derive(Clone, Default)]
pub struct RecordingTimer {
    pub armed: Arc<Mutex<Vec<Duration>>>,
}

#[allow(dead_code)]
impl RecordingTimer {
    pub fn arms(&self) -> Vec<Duration> {
        self.armed.lock().unwrap().clone()
    }
}

impl RestartTimer for RecordingTimer {
    fn arm(&mut self, delay: Duration) {
        self.armed.lock().unwrap().push(delay);
    }
}

#[derive(Default)]
pub struct CountingRestart(pub AtomicU32);

#[allow(dead_code)]
impl CountingRestart {
    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

impl RestartPort for CountingRestart {
    fn restart(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Upload stream ─────────────────────────────────────────────

/// One scripted socket read.
#[derive(Debug, Clone)]
pub enum Read {
    Data(Vec<u8>),
    Timeout,
    Error(i32),
}

/// Replays a script of reads; returns `Ok(0)` (peer closed) once exhausted.
///
/// A `Data` step larger than the caller's buffer is split across reads.
pub struct ScriptedStream {
    script: VecDeque<Read>,
    pub requested: Vec<usize>,
}

#[allow(dead_code)]
impl ScriptedStream {
    pub fn new(script: Vec<Read>) -> Self {
        Self {
            script: script.into(),
            requested: Vec::new(),
        }
    }

    /// `body` split into reads of at most `chunk` bytes.
    pub fn chunked(body: &[u8], chunk: usize) -> Self {
        Self::new(body.chunks(chunk).map(|c| Read::Data(c.to_vec())).collect())
    }

    /// `body` split at arbitrary cut points.
    pub fn cut_at(body: &[u8], cuts: &[usize]) -> Self {
        let mut script = Vec::new();
        let mut start = 0;
        for &cut in cuts {
            let cut = cut.clamp(start, body.len());
            if cut > start {
                script.push(Read::Data(body[start..cut].to_vec()));
                start = cut;
            }
        }
        if start < body.len() {
            script.push(Read::Data(body[start..].to_vec()));
        }
        Self::new(script)
    }
}

impl UploadStream for ScriptedStream {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.requested.push(buf.len());
        match self.script.pop_front() {
            None => Ok(0),
            Some(Read::Timeout) => Err(StreamError::Timeout),
            Some(Read::Error(code)) => Err(StreamError::Io(code)),
            Some(Read::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.script.push_front(Read::Data(data.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

// ── Upload bodies ─────────────────────────────────────────────

/// Deterministic pseudo-image of `len` bytes.
pub fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) ^ (i >> 3)) as u8).collect()
}

/// Multipart-style body: `prefix_len` bytes of part headers (ending in the
/// blank line) followed by `payload`.
pub fn upload_body(prefix_len: usize, payload: &[u8]) -> Vec<u8> {
    assert!(prefix_len >= 4);
    let mut headers = b"Content-Disposition: form-data; name=\"firmware\"".to_vec();
    headers.resize(prefix_len - 4, b' ');
    let mut body = headers;
    body.extend_from_slice(b"\r\n\r\n");
    body.extend_from_slice(payload);
    body
}
