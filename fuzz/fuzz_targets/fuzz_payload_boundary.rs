//! Fuzz target: `find_payload_start`
//!
//! Arbitrary first chunks must never panic, and a reported payload offset
//! must sit inside the chunk right after a header terminator.
//!
//! cargo fuzz run fuzz_payload_boundary

#![no_main]

use libfuzzer_sys::fuzz_target;
use otaportal::ota::boundary::{HEADER_TERMINATOR, find_payload_start};

fuzz_target!(|data: &[u8]| {
    if let Some(start) = find_payload_start(data) {
        assert!(start <= data.len(), "payload offset past end of chunk");
        assert!(start >= HEADER_TERMINATOR.len());
        assert_eq!(&data[start - HEADER_TERMINATOR.len()..start], HEADER_TERMINATOR);
    }
});
