//! Locating the image payload inside a multipart upload.
//!
//! The portal posts the firmware as a single-part `multipart/form-data`
//! body. Only the first received chunk carries the part headers; the
//! payload begins right after the blank line that ends them.

/// Blank line that ends the part headers.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Offset of the first payload byte in `chunk`, or `None` when the chunk
/// holds no header terminator.
///
/// The scan never reads past `chunk.len()`.
pub fn find_payload_start(chunk: &[u8]) -> Option<usize> {
    chunk
        .windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
        .map(|pos| pos + HEADER_TERMINATOR.len())
}
