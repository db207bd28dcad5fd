//! Splits a `multipart/byteranges` response body into individual range
//! payloads. A pure byte-in/events-out state machine: the dispatcher owns a
//! carry-over buffer for boundaries that split across network frames and
//! does not touch the network itself.

use regex::bytes::Regex as BytesRegex;
use regex::Regex;

use crate::constants::{ERROR_MULTIPART_BOUNDARY_NOT_FOUND, ERROR_MULTIPART_MALFORMED};
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::Result;

#[cfg(feature = "log")]
use log::warn;

/// Progress through one multipart body. `ExpectPartHeaders` is reachable in
/// principle (the boundary delimiter and the header block that follows it
/// are two separate grammar productions) but this dispatcher matches both
/// in a single regex pass, the same way the reference implementation's
/// `regexec` call matched boundary-plus-headers atomically; the state is
/// kept in the enum for parity with that state machine, and `phase()` never
/// actually reports it as a distinct pause point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartPhase {
    /// Scanning for the next `--boundary` delimiter and the header block
    /// that follows it.
    ExpectBoundary,
    /// Reachable in the grammar; this dispatcher never parks here (see
    /// the type's documentation).
    ExpectPartHeaders,
    /// Passing through `n` more body bytes before the next boundary.
    ExpectPartBody(u64),
}

/// One unit of progress reported out of [`MultipartDispatcher::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartEvent {
    /// A new part begins; `start`/`end` are the inclusive byte offsets from
    /// its `Content-Range` header.
    PartStart { start: u64, end: u64 },
    /// Body bytes belonging to the part most recently started. May be
    /// split across multiple events if the body arrives in more than one
    /// `feed` call.
    BodyChunk(Vec<u8>),
}

/// Parses one multipart response. Each instance owns its own compiled
/// patterns, built lazily from the boundary discovered via `on_header` --
/// there is no process-wide regex cache.
pub struct MultipartDispatcher {
    boundary: Option<String>,
    phase: MultipartPhase,
    carry: Vec<u8>,
    part_regex: Option<BytesRegex>,
    end_regex: Option<BytesRegex>,
}

impl MultipartDispatcher {
    /// Creates a dispatcher with no boundary yet discovered; call
    /// `on_header` with the response's `Content-Type` before the first
    /// `feed`.
    pub fn new() -> Self {
        Self { boundary: None, phase: MultipartPhase::ExpectBoundary, carry: Vec::new(), part_regex: None, end_regex: None }
    }

    /// Observes one response header. Only `Content-Type` is inspected; a
    /// `boundary=...` parameter sets the boundary token this dispatcher
    /// will look for.
    pub fn on_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("content-type") {
            if let Some(boundary) = extract_boundary(value) {
                self.boundary = Some(boundary);
            }
        }
    }

    /// Current phase, for callers that want to inspect progress between
    /// `feed` calls.
    pub fn phase(&self) -> MultipartPhase {
        self.phase
    }

    fn ensure_regexes(&mut self) -> Result<()> {
        if self.part_regex.is_some() {
            return Ok(());
        }
        let boundary = self
            .boundary
            .as_ref()
            .ok_or_else(|| ZchunkError::new(ZchunkErrorKind::Transport, ERROR_MULTIPART_BOUNDARY_NOT_FOUND))?;
        let escaped = regex::escape(boundary);
        let part_pattern = format!(
            r"(?is)\r\n--{escaped}\r\ncontent-type:[^\r\n]*\r\ncontent-range:\s*bytes\s*([0-9]+)\s*-\s*([0-9]+)\s*/[^\r\n]*\r\n\r\n"
        );
        self.part_regex = Some(BytesRegex::new(&part_pattern)?);
        let end_pattern = format!(r"--{escaped}--");
        self.end_regex = Some(BytesRegex::new(&end_pattern)?);
        Ok(())
    }

    /// Feeds newly received bytes and drains as many events as the
    /// currently buffered bytes allow. Returns fewer events than the data
    /// warrants, rather than erroring, when a boundary or header block is
    /// split across the call boundary; the remainder stays in the carry
    /// buffer for the next `feed` call.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<MultipartEvent>> {
        self.carry.extend_from_slice(data);
        let mut events = Vec::new();

        loop {
            match self.phase {
                MultipartPhase::ExpectBoundary | MultipartPhase::ExpectPartHeaders => {
                    self.ensure_regexes()?;
                    let part_regex = self.part_regex.as_ref().unwrap();
                    if let Some(caps) = part_regex.captures(&self.carry) {
                        let whole = caps.get(0).unwrap();
                        let match_end = whole.end();
                        let start = parse_capture(&caps, 1)?;
                        let end = parse_capture(&caps, 2)?;
                        if end < start {
                            #[cfg(feature = "log")]
                            warn!("multipart part header has end ({end}) before start ({start})");
                            return Err(ZchunkError::new(ZchunkErrorKind::Transport, ERROR_MULTIPART_MALFORMED));
                        }
                        self.carry.drain(..match_end);
                        let length = end - start + 1;
                        events.push(MultipartEvent::PartStart { start, end });
                        self.phase = MultipartPhase::ExpectPartBody(length);
                        continue;
                    }
                    let end_regex = self.end_regex.as_ref().unwrap();
                    if end_regex.is_match(&self.carry) {
                        self.carry.clear();
                        break;
                    }
                    // boundary or header block not fully buffered yet; wait for more
                    break;
                }
                MultipartPhase::ExpectPartBody(remaining) => {
                    if self.carry.is_empty() {
                        break;
                    }
                    let n = (remaining as usize).min(self.carry.len());
                    let body: Vec<u8> = self.carry.drain(..n).collect();
                    events.push(MultipartEvent::BodyChunk(body));
                    let left = remaining - n as u64;
                    if left == 0 {
                        self.phase = MultipartPhase::ExpectBoundary;
                        continue;
                    }
                    self.phase = MultipartPhase::ExpectPartBody(left);
                    break;
                }
            }
        }

        Ok(events)
    }
}

impl Default for MultipartDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_capture(caps: &regex::bytes::Captures, index: usize) -> Result<u64> {
    let bytes = caps.get(index).ok_or_else(|| ZchunkError::new(ZchunkErrorKind::Transport, ERROR_MULTIPART_MALFORMED))?.as_bytes();
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| ZchunkError::new(ZchunkErrorKind::Transport, ERROR_MULTIPART_MALFORMED))
}

fn extract_boundary(content_type: &str) -> Option<String> {
    let regex = Regex::new(r#"(?i)boundary\s*=\s*"?([^";]+)"?"#).ok()?;
    regex.captures(content_type).map(|caps| caps.get(1).unwrap().as_str().trim_end_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body(boundary: &str) -> Vec<u8> {
        format!(
            "\r\n--{b}\r\nContent-Type: application/octet-stream\r\nContent-Range: bytes 0-3/100\r\n\r\nABCD\r\n--{b}\r\nContent-Type: application/octet-stream\r\nContent-Range: bytes 10-12/100\r\n\r\nXYZ\r\n--{b}--\r\n",
            b = boundary
        )
        .into_bytes()
    }

    #[test]
    fn boundary_extracted_from_content_type_header() {
        let mut dispatcher = MultipartDispatcher::new();
        dispatcher.on_header("Content-Type", "multipart/byteranges; boundary=THIS_STRING_SEPARATES");
        assert_eq!(dispatcher.boundary.as_deref(), Some("THIS_STRING_SEPARATES"));
    }

    #[test]
    fn feed_in_one_shot_splits_two_parts() {
        let mut dispatcher = MultipartDispatcher::new();
        dispatcher.on_header("Content-Type", "multipart/byteranges; boundary=SEP");
        let events = dispatcher.feed(&sample_body("SEP")).unwrap();
        assert_eq!(
            events,
            vec![
                MultipartEvent::PartStart { start: 0, end: 3 },
                MultipartEvent::BodyChunk(b"ABCD".to_vec()),
                MultipartEvent::PartStart { start: 10, end: 12 },
                MultipartEvent::BodyChunk(b"XYZ".to_vec()),
            ]
        );
    }

    #[test]
    fn feed_one_byte_at_a_time_matches_one_shot() {
        let mut dispatcher = MultipartDispatcher::new();
        dispatcher.on_header("Content-Type", "multipart/byteranges; boundary=SEP");
        let body = sample_body("SEP");
        let mut events = Vec::new();
        for byte in &body {
            events.extend(dispatcher.feed(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(
            events,
            vec![
                MultipartEvent::PartStart { start: 0, end: 3 },
                MultipartEvent::BodyChunk(b"A".to_vec()),
                MultipartEvent::BodyChunk(b"B".to_vec()),
                MultipartEvent::BodyChunk(b"C".to_vec()),
                MultipartEvent::BodyChunk(b"D".to_vec()),
                MultipartEvent::PartStart { start: 10, end: 12 },
                MultipartEvent::BodyChunk(b"X".to_vec()),
                MultipartEvent::BodyChunk(b"Y".to_vec()),
                MultipartEvent::BodyChunk(b"Z".to_vec()),
            ]
        );
    }

    #[test]
    fn feed_without_boundary_is_a_config_error() {
        let mut dispatcher = MultipartDispatcher::new();
        let err = dispatcher.feed(b"\r\n--x\r\n").unwrap_err();
        assert_eq!(err.kind(), ZchunkErrorKind::Transport);
    }
}
