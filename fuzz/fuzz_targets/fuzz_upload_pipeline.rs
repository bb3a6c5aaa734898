//! Fuzz target: `UpdatePipeline::handle_upload`
//!
//! The input is split into a declared content length, a chunking pattern
//! and a body. Whatever arrives, the pipeline must not panic, must report
//! exactly one outcome, and may only move the boot pointer on success.
//!
//! cargo fuzz run fuzz_upload_pipeline

#![no_main]

use libfuzzer_sys::fuzz_target;
use otaportal::adapters::firmware::SimFirmwareStore;
use otaportal::app::messages::StatusMsg;
use otaportal::app::ports::{StatusSink, StreamError, UploadStream};
use otaportal::config::OtaConfig;
use otaportal::mailbox::MailboxError;
use otaportal::ota::UpdatePipeline;

#[derive(Default)]
struct Outcomes(Vec<StatusMsg>);

impl StatusSink for Outcomes {
    fn post(&mut self, msg: StatusMsg) -> Result<(), MailboxError> {
        self.0.push(msg);
        Ok(())
    }
}

/// Serves `body` in reads sized by cycling through `pattern`; a zero entry
/// becomes a socket timeout.
struct Patterned<'a> {
    body: &'a [u8],
    pattern: &'a [u8],
    step: usize,
}

impl UploadStream for Patterned<'_> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let size = match self.pattern.get(self.step % self.pattern.len().max(1)) {
            Some(0) => {
                self.step += 1;
                return Err(StreamError::Timeout);
            }
            Some(&s) => s as usize,
            None => buf.len(),
        };
        self.step += 1;
        let n = size.min(buf.len()).min(self.body.len());
        buf[..n].copy_from_slice(&self.body[..n]);
        self.body = &self.body[n..];
        Ok(n)
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let declared = u16::from_le_bytes([data[0], data[1]]) as usize;
    let pattern_len = (data[2] as usize % 8).min(data.len() - 3);
    let (pattern, body) = data[3..].split_at(pattern_len);

    let mut store = SimFirmwareStore::new();
    let mut outcomes = Outcomes::default();
    let mut stream = Patterned { body, pattern, step: 0 };
    let result = UpdatePipeline::new(&OtaConfig::default()).handle_upload(
        &mut stream,
        declared,
        &mut store,
        &mut outcomes,
    );

    assert_eq!(outcomes.0.len(), 1, "exactly one outcome per upload");
    match result {
        Ok(committed) => {
            assert_eq!(outcomes.0[0], StatusMsg::OtaSuccessful);
            assert_eq!(store.boot_slot(), 1);
            assert_eq!(store.slot(1).len(), committed.bytes_written);
        }
        Err(_) => {
            assert_eq!(outcomes.0[0], StatusMsg::OtaFailed);
            assert_eq!(store.boot_slot(), 0, "failed upload moved the boot pointer");
        }
    }
});
