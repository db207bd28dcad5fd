//! Wire-format magic bytes, default option values, and error message strings.

// - Magic / identifiers
/// The 5-byte magic that opens every zchunk file's Lead region.
pub const LEAD_MAGIC: [u8; 5] = [0x00, b'Z', b'C', b'K', b'1'];

// - Preface flag bit positions (compint-encoded bitfield, see format::preface)
pub(crate) const PREFACE_FLAG_HAS_STREAMS: u64 = 1 << 0;
pub(crate) const PREFACE_FLAG_HAS_OPTIONAL_FLAGS: u64 = 1 << 1;
pub(crate) const PREFACE_FLAG_HAS_UNCOMPRESSED_CHECKSUMS: u64 = 1 << 2;
/// Not one of the three named bits; this build's own marker for "index[0]
/// is the dictionary chunk", since the three named bits don't cover it and
/// the format otherwise gives a reader no way to tell a dictionary chunk
/// from an ordinary one. Round-trips like any other flag bit.
pub(crate) const PREFACE_FLAG_HAS_DICTIONARY: u64 = 1 << 3;

// - Digest wire codes (size is a property of the kind, see digest::DigestKind)
pub(crate) const DIGEST_WIRE_SHA1: u8 = 0;
pub(crate) const DIGEST_WIRE_SHA256: u8 = 1;
pub(crate) const DIGEST_WIRE_SHA512: u8 = 2;
pub(crate) const DIGEST_WIRE_SHA512_128: u8 = 3;

// - Codec wire codes
pub(crate) const CODEC_WIRE_NONE: u8 = 0;
pub(crate) const CODEC_WIRE_ZSTD: u8 = 1;

// - CompInt
/// Maximum number of bytes a single compint may span before decode gives up.
/// 10 bytes of 7 payload bits each covers every value up to 2^70, comfortably
/// past `u64::MAX`; anything longer is either truncated or malicious input.
pub(crate) const COMPINT_MAX_BYTES: usize = 10;

// - Chunking defaults (content-defined / buzhash chunker, see chunker.rs)
pub(crate) const CHUNKER_WINDOW_SIZE: usize = 48;
pub(crate) const CHUNKER_BUZHASH_BITMASK: u32 = (1 << 15) - 1;
/// Below this size content-defined mode never looks for a boundary; the
/// tail bytes just become the next chunk's start.
pub const DEFAULT_CHUNK_SIZE_MIN: usize = (CHUNKER_BUZHASH_BITMASK as usize + 1) / 4;
/// Above this size a boundary is forced even if the rolling hash hasn't
/// found one, bounding worst-case chunk size.
pub const DEFAULT_CHUNK_SIZE_MAX: usize = (CHUNKER_BUZHASH_BITMASK as usize + 1) * 4;

// - Codec defaults
/// Default zstd compression level used by `configure()` when the caller does
/// not pick one.
pub const DEFAULT_ZSTD_LEVEL: i32 = 9;

// - Delta engine defaults
/// Default cap on the number of byte ranges bundled into a single HTTP
/// range-fetcher request when the caller does not specify one.
pub const DEFAULT_MAX_RANGES_PER_REQUEST: usize = 50;

// - Environment
/// Environment variable consulted by the OS facade for the writer's scratch
/// directory.
pub const ENV_TMPDIR: &str = "TMPDIR";

// - Error messages
pub(crate) const ERROR_LEAD_MAGIC_MISMATCH: &str = "Lead magic does not match the expected zchunk signature.";
pub(crate) const ERROR_UNKNOWN_DIGEST_KIND: &str = "Unknown digest kind value.";
pub(crate) const ERROR_UNKNOWN_CODEC_KIND: &str = "Unknown codec kind value.";
pub(crate) const ERROR_COMPINT_OVERFLOW: &str = "CompInt value overflows the platform's unsigned integer range.";
pub(crate) const ERROR_COMPINT_TRUNCATED: &str = "CompInt ran past the declared header length without a terminator byte.";
pub(crate) const ERROR_HEADER_DIGEST_MISMATCH: &str = "Recomputed header digest does not match the digest stamped in the Lead.";
pub(crate) const ERROR_HEADER_SIZE_MISMATCH: &str = "Declared header region size does not match the bytes actually consumed.";
pub(crate) const ERROR_HEADER_TRUNCATED: &str = "Not enough bytes buffered yet to parse this header region.";
pub(crate) const ERROR_CHUNK_DIGEST_MISMATCH: &str = "Chunk digest does not match the digest recorded in the index.";
pub(crate) const ERROR_FULL_DATA_DIGEST_MISMATCH: &str = "Full-data digest does not match the digest recorded in the preface.";
pub(crate) const ERROR_DECOMPRESSED_SIZE_MISMATCH: &str = "Decompressed chunk size does not match the length recorded in the index.";
pub(crate) const ERROR_WRITER_CONFIGURE_AFTER_WRITE: &str = "configure() was called after the first byte was written.";
pub(crate) const ERROR_MULTIPART_MALFORMED: &str = "Malformed multipart/byteranges part header.";
pub(crate) const ERROR_MULTIPART_BOUNDARY_NOT_FOUND: &str = "No boundary token found in Content-Type header.";
pub(crate) const ERROR_RANGES_UNSUPPORTED: &str = "Host returned 200 for a fetch that required byte-range support.";
