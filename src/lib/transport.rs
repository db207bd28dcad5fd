//! The abstract range-fetcher the delta engine consumes from its host. The
//! core never speaks HTTP directly; it asks for byte ranges and lets the
//! host translate that into requests, retries, and connection pooling.

use std::io::Read;

use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::Result;

/// A response status the host observed for a fetch the core required to be
/// ranged. A `200` when ranges were required means the server doesn't
/// support `Range`; the delta engine surfaces that as a distinct condition
/// rather than trying to interpret the full body as a range response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangesSupport {
    /// The host honored the range request (`206`, or a `multipart/byteranges` `200`).
    Supported,
    /// The host returned a plain `200`; byte ranges are not available.
    Unsupported,
}

impl RangesSupport {
    /// Fails with a `Transport` error if the host could not honor a range
    /// request the delta engine required. Any bytes already flushed to the
    /// output before this point are the caller's responsibility to leave in
    /// place; this call does not touch the output itself.
    pub fn require_supported(self) -> Result<()> {
        match self {
            RangesSupport::Supported => Ok(()),
            RangesSupport::Unsupported => {
                Err(ZchunkError::new(ZchunkErrorKind::Transport, crate::constants::ERROR_RANGES_UNSUPPORTED))
            }
        }
    }
}

/// Capability the delta engine needs from its host: fetch a URL with an
/// optional `Range` header, and observe response headers as they arrive so
/// the multipart boundary can be discovered without a second callback.
pub trait RangeFetcher {
    /// The byte stream a fetch call hands back.
    type Stream: Read;

    /// Issues a request for `url`. `range_header` is the literal value to
    /// send as the `Range` header (e.g. `"bytes=0-1023,2048-4095"`), or
    /// `None` for a plain GET.
    fn fetch(&mut self, url: &str, range_header: Option<&str>) -> Result<Self::Stream>;

    /// Called by the host once per response header as they arrive, in the
    /// order received. The multipart dispatcher uses this to discover the
    /// boundary token from `Content-Type` before the body is available.
    fn on_header(&mut self, name: &str, value: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FakeFetcher {
        seen_headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl RangeFetcher for FakeFetcher {
        type Stream = Cursor<Vec<u8>>;

        fn fetch(&mut self, _url: &str, _range_header: Option<&str>) -> Result<Self::Stream> {
            Ok(Cursor::new(self.body.clone()))
        }

        fn on_header(&mut self, name: &str, value: &str) {
            self.seen_headers.push((name.to_string(), value.to_string()));
        }
    }

    #[test]
    fn unsupported_ranges_surface_a_transport_error() {
        let err = RangesSupport::Unsupported.require_supported().unwrap_err();
        assert_eq!(err.kind(), crate::ZchunkErrorKind::Transport);
        assert!(RangesSupport::Supported.require_supported().is_ok());
    }

    #[test]
    fn fetcher_records_headers_and_serves_body() {
        let mut fetcher = FakeFetcher { seen_headers: Vec::new(), body: b"hello".to_vec() };
        fetcher.on_header("Content-Type", "multipart/byteranges; boundary=THIS_STRING_SEPARATES");
        let mut stream = fetcher.fetch("https://example.test/file.zck", Some("bytes=0-4")).unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
        assert_eq!(fetcher.seen_headers.len(), 1);
    }
}
