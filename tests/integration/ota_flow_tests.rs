//! End-to-end upload flows: HTTP route → pipeline → simulated flash →
//! status monitor → restart timer.

use std::sync::Barrier;
use std::time::Duration;

use otaportal::adapters::firmware::{Fault, SimFirmwareStore};
use otaportal::adapters::http::{HTTP_CONFLICT, HTTP_INTERNAL_ERROR, HTTP_OK, UploadRoute};
use otaportal::app::messages::StatusMsg;
use otaportal::app::monitor::StatusMonitor;
use otaportal::app::ports::{StreamError, UploadStream};
use otaportal::app::status::{UpdateStatus, status_board};
use otaportal::config::{OtaConfig, SystemConfig};
use otaportal::ota::{OtaError, UpdatePipeline};

use crate::mock_hw::{
    Read, RecordingSink, RecordingTimer, ScriptedStream, image, upload_body,
};

fn pipeline() -> UpdatePipeline {
    UpdatePipeline::new(&OtaConfig::default())
}

#[test]
fn scenario_a_two_chunks_commit_and_arm_restart() {
    let payload = image(1998);
    let body = upload_body(50, &payload);
    assert_eq!(body.len(), 2048);

    let (writer, reader) = status_board();
    let timer = RecordingTimer::default();
    let mut monitor = StatusMonitor::new(
        writer,
        timer.clone(),
        SystemConfig::default().restart_delay(),
    );

    let mut store = SimFirmwareStore::new();
    let mut sink = RecordingSink::default();
    let mut stream = ScriptedStream::chunked(&body, 1024);
    let committed = pipeline()
        .handle_upload(&mut stream, body.len(), &mut store, &mut sink)
        .unwrap();

    assert_eq!(committed.bytes_written, 1998);
    assert_eq!(committed.partition.label.as_str(), "ota_1");
    assert_eq!(store.slot(1), payload.as_slice());
    assert_eq!(store.boot_slot(), 1);
    assert_eq!(stream.requested, vec![1024, 1024]);
    assert_eq!(sink.sent, vec![StatusMsg::OtaSuccessful]);

    for msg in sink.sent {
        monitor.dispatch(msg);
    }
    assert_eq!(reader.update(), UpdateStatus::Successful);
    assert_eq!(timer.arms(), vec![Duration::from_secs(8)]);
}

#[test]
fn scenario_b_early_close_leaves_boot_partition() {
    let body = upload_body(40, &image(160));
    let mut store = SimFirmwareStore::new();
    let mut sink = RecordingSink::default();

    let err = pipeline()
        .handle_upload(&mut ScriptedStream::chunked(&body, 100), 500, &mut store, &mut sink)
        .unwrap_err();

    assert_eq!(
        err,
        OtaError::Incomplete {
            received: 200,
            expected: 500
        }
    );
    assert_eq!(store.boot_slot(), 0);
    assert_eq!(store.aborts(), 1);
    assert_eq!(sink.sent, vec![StatusMsg::OtaFailed]);

    let (writer, reader) = status_board();
    let timer = RecordingTimer::default();
    let mut monitor = StatusMonitor::new(writer, timer.clone(), Duration::from_secs(8));
    monitor.dispatch(StatusMsg::OtaFailed);
    assert_eq!(reader.update(), UpdateStatus::Failed);
    assert!(timer.arms().is_empty());
}

#[test]
fn zero_length_never_opens_partition() {
    let mut store = SimFirmwareStore::new();
    let mut sink = RecordingSink::default();
    let err = pipeline()
        .handle_upload(&mut ScriptedStream::new(vec![]), 0, &mut store, &mut sink)
        .unwrap_err();
    assert_eq!(err, OtaError::EmptyUpload);
    assert_eq!(store.aborts(), 0);
    assert!(store.slot(1).is_empty());
    assert_eq!(sink.sent, vec![StatusMsg::OtaFailed]);
}

#[test]
fn header_only_first_chunk_is_a_legal_empty_slice() {
    let payload = image(300);
    let body = upload_body(60, &payload);
    // First read ends exactly at the blank line.
    let mut stream = ScriptedStream::cut_at(&body, &[60, 200]);
    let mut store = SimFirmwareStore::new();
    let committed = pipeline()
        .handle_upload(&mut stream, body.len(), &mut store, &mut RecordingSink::default())
        .unwrap();
    assert_eq!(committed.bytes_written, 300);
    assert_eq!(store.slot(1), payload.as_slice());
}

#[test]
fn separator_split_across_reads_is_rejected() {
    let body = upload_body(30, &image(50));
    // "\r\n" | "\r\n": first chunk has no complete separator.
    let mut stream = ScriptedStream::cut_at(&body, &[28]);
    let mut store = SimFirmwareStore::new();
    let err = pipeline()
        .handle_upload(&mut stream, body.len(), &mut store, &mut RecordingSink::default())
        .unwrap_err();
    assert_eq!(err, OtaError::MissingBoundary);
    assert_eq!(store.boot_slot(), 0);
}

#[test]
fn timeouts_do_not_count_toward_length() {
    let payload = image(900);
    let body = upload_body(50, &payload);
    let mut script = vec![Read::Timeout, Read::Data(body[..500].to_vec()), Read::Timeout];
    script.push(Read::Data(body[500..].to_vec()));
    let mut store = SimFirmwareStore::new();
    let committed = pipeline()
        .handle_upload(
            &mut ScriptedStream::new(script),
            body.len(),
            &mut store,
            &mut RecordingSink::default(),
        )
        .unwrap();
    assert_eq!(committed.bytes_written, 900);
    assert_eq!(store.boot_slot(), 1);
}

#[test]
fn flash_faults_keep_running_image_authoritative() {
    for fault in [Fault::Begin, Fault::WriteAfter(100), Fault::Finalize, Fault::Activate] {
        let body = upload_body(50, &image(400));
        let mut store = SimFirmwareStore::with_fault(fault);
        let mut sink = RecordingSink::default();
        let result = pipeline().handle_upload(
            &mut ScriptedStream::chunked(&body, 128),
            body.len(),
            &mut store,
            &mut sink,
        );
        assert!(result.is_err(), "{fault:?} must fail the upload");
        assert_eq!(store.boot_slot(), 0, "{fault:?} moved the boot pointer");
        assert_eq!(sink.sent, vec![StatusMsg::OtaFailed], "{fault:?}");
    }
}

#[test]
fn digest_covers_payload_only() {
    let payload = image(1500);
    let body = upload_body(120, &payload);
    let committed = pipeline()
        .handle_upload(
            &mut ScriptedStream::chunked(&body, 333),
            body.len(),
            &mut SimFirmwareStore::new(),
            &mut RecordingSink::default(),
        )
        .unwrap();
    assert_eq!(committed.sha256, hmac_sha256::Hash::hash(&payload));
}

// ── HTTP route ────────────────────────────────────────────────

fn fresh_route() -> UploadRoute<SimFirmwareStore> {
    let (_writer, reader) = status_board();
    UploadRoute::new(SimFirmwareStore::new(), &OtaConfig::default(), reader)
}

#[test]
fn route_maps_outcomes_to_status_codes() {
    let mut stream = ScriptedStream::new(vec![Read::Error(-104)]);
    assert_eq!(
        fresh_route().handle(&mut stream, 100, &mut RecordingSink::default()),
        HTTP_INTERNAL_ERROR
    );

    // Stream consumed but image rejected: still 200, outcome via /OTAstatus.
    let mut stream = ScriptedStream::chunked(&[0xEE; 64], 64);
    assert_eq!(
        fresh_route().handle(&mut stream, 64, &mut RecordingSink::default()),
        HTTP_OK
    );
}

#[test]
fn second_upload_refused_before_monitor_catches_up() {
    // Nothing drains the status mailbox between the two requests.
    let route = fresh_route();
    let body = upload_body(50, &image(450));
    let mut sink = RecordingSink::default();

    assert_eq!(
        route.handle(&mut ScriptedStream::chunked(&body, 1024), body.len(), &mut sink),
        HTTP_OK
    );
    let mut truncated = ScriptedStream::cut_at(&body[..17], &[]);
    assert_eq!(route.handle(&mut truncated, body.len(), &mut sink), HTTP_CONFLICT);

    assert!(truncated.requested.is_empty(), "the committed slot must not be reopened");
    assert_eq!(sink.sent, vec![StatusMsg::OtaSuccessful]);
}

#[test]
fn retry_after_failed_upload_is_refused() {
    let route = fresh_route();
    let body = upload_body(50, &image(300));
    let mut sink = RecordingSink::default();

    let mut cut = ScriptedStream::cut_at(&body[..120], &[]);
    assert_eq!(route.handle(&mut cut, body.len(), &mut sink), HTTP_OK);
    let mut full = ScriptedStream::chunked(&body, 1024);
    assert_eq!(route.handle(&mut full, body.len(), &mut sink), HTTP_CONFLICT);
    assert_eq!(sink.sent, vec![StatusMsg::OtaFailed]);
}

#[test]
fn route_refuses_after_outcome_recorded() {
    let (writer, reader) = status_board();
    let mut monitor = StatusMonitor::new(writer, RecordingTimer::default(), Duration::from_secs(8));
    let route = UploadRoute::new(SimFirmwareStore::new(), &OtaConfig::default(), reader);

    let body = upload_body(50, &image(200));
    let mut sink = RecordingSink::default();
    assert_eq!(
        route.handle(&mut ScriptedStream::chunked(&body, 1024), body.len(), &mut sink),
        HTTP_OK
    );
    for msg in sink.sent.drain(..) {
        monitor.dispatch(msg);
    }

    let mut again = ScriptedStream::chunked(&body, 1024);
    assert_eq!(route.handle(&mut again, body.len(), &mut sink), HTTP_CONFLICT);
    assert!(again.requested.is_empty(), "refused upload must not read the body");
    assert!(sink.sent.is_empty());
}

/// Blocks in its first read until the test releases it.
struct GatedStream<'a> {
    entered: &'a Barrier,
    release: &'a Barrier,
    inner: ScriptedStream,
    first: bool,
}

impl UploadStream for GatedStream<'_> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        if self.first {
            self.first = false;
            self.entered.wait();
            self.release.wait();
        }
        self.inner.read_chunk(buf)
    }
}

#[test]
fn concurrent_upload_gets_conflict() {
    let (_writer, reader) = status_board();
    let route = UploadRoute::new(SimFirmwareStore::new(), &OtaConfig::default(), reader);
    let body = upload_body(50, &image(300));
    let entered = Barrier::new(2);
    let release = Barrier::new(2);

    std::thread::scope(|s| {
        let first = s.spawn(|| {
            let mut stream = GatedStream {
                entered: &entered,
                release: &release,
                inner: ScriptedStream::chunked(&body, 1024),
                first: true,
            };
            route.handle(&mut stream, body.len(), &mut RecordingSink::default())
        });

        entered.wait();
        let mut second = ScriptedStream::chunked(&body, 1024);
        let code = route.handle(&mut second, body.len(), &mut RecordingSink::default());
        release.wait();

        assert_eq!(code, HTTP_CONFLICT);
        assert_eq!(first.join().unwrap(), HTTP_OK);
    });
}
