#![forbid(unsafe_code)]
#![deny(missing_docs)]
//! A content-addressed, chunked file format: independently compressed and
//! checksummed chunks behind a self-describing header, plus the write,
//! read, and delta/resume engines that produce and consume it. Two files
//! sharing chunk content synchronize by fetching only the chunks whose
//! digests differ.

/// Variable-length unsigned integer encoding used throughout the header.
pub mod compint;
/// Wire-format magic bytes, default option values, and error message strings.
pub mod constants;
/// Polymorphic hashing: full-hash and chunk-hash digest kinds.
pub mod digest;
/// Polymorphic compression with an optional shared dictionary.
pub mod codec;
/// The [`chunk::Chunk`]/[`chunk::Index`] data model.
pub mod chunk;
/// Content-defined, split-string, and manual chunk-boundary discovery.
pub mod chunker;
/// Header region serialization: Lead, Preface, Index, Signatures.
pub mod format;
/// OS facade: scratch directory, path helpers, file truncation.
pub mod os;
/// The `RangeFetcher` trait the delta engine consumes from its host.
pub mod transport;
/// Accepts bytes and explicit or content-defined chunk boundaries; stages
/// compressed chunks and finalizes a sealed header.
pub mod writer;
/// Parses a header, drives per-chunk decompression, and verifies digests.
pub mod reader;
/// Diffs a target header against local or donor state and plans byte ranges.
pub mod delta;

mod error;
mod hex_ser;

// - re-exports
pub use chunk::{Chunk, ChunkState, Index};
pub use codec::{Codec, CodecKind};
pub use delta::DeltaEngine;
pub use digest::{DigestKind, Hasher};
pub use error::{ZchunkError, ZchunkErrorKind};
pub use format::{Header, HeaderParsePhase, HeaderParser};
pub use reader::Reader;
pub use writer::{Writer, WriterOptions};

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ZchunkError>;
