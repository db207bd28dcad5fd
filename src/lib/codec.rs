//! Polymorphic compressor/decompressor with an optional shared dictionary.
//! Two kinds exist: `None` (identity) and `Zstd` (one frame per chunk, no
//! streaming across chunk boundaries, so chunk boundaries stay deterministic
//! on the wire).

// - STD
use std::fmt;

// - internal
use crate::constants::{CODEC_WIRE_NONE, CODEC_WIRE_ZSTD, DEFAULT_ZSTD_LEVEL};
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::Result;

/// The compressor kinds this build supports.
#[repr(u8)]
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CodecKind {
	/// Identity: `out = in`.
	None = CODEC_WIRE_NONE,
	/// Zstd, one independent frame per chunk.
	Zstd = CODEC_WIRE_ZSTD,
}

impl CodecKind {
	/// The single-byte wire code stored in the preface.
	pub fn wire_code(&self) -> u8 {
		*self as u8
	}

	/// Parses a wire code into a `CodecKind`, failing with a `Config` error
	/// for anything this build doesn't implement.
	pub fn from_wire_code(code: u8) -> Result<Self> {
		match code {
			CODEC_WIRE_NONE => Ok(CodecKind::None),
			CODEC_WIRE_ZSTD => Ok(CodecKind::Zstd),
			other => Err(ZchunkError::new(
				ZchunkErrorKind::Config,
				format!("{}: {}", crate::constants::ERROR_UNKNOWN_CODEC_KIND, other),
			)),
		}
	}
}

impl fmt::Display for CodecKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let msg = match self {
			CodecKind::None => "None",
			CodecKind::Zstd => "Zstd",
		};
		write!(f, "{}", msg)
	}
}

/// A configured codec instance: kind, level, and optional dictionary.
/// Each `compress_chunk`/`decompress_chunk` call builds a fresh zstd
/// bulk compressor/decompressor seeded with the dictionary, which is
/// zstd's own replacement for the legacy "recreate the context for
/// determinism" workaround -- no state needs to persist across chunks.
#[derive(Clone)]
pub struct Codec {
	kind: CodecKind,
	level: i32,
	dictionary: Option<Vec<u8>>,
}

impl Codec {
	/// Creates a codec of the given kind at the default level, with no dictionary.
	pub fn new(kind: CodecKind) -> Self {
		Self {
			kind,
			level: DEFAULT_ZSTD_LEVEL,
			dictionary: None,
		}
	}

	/// Overrides the compression level (only meaningful for `Zstd`).
	pub fn set_level(&mut self, level: i32) {
		self.level = level;
	}

	/// Attaches a dictionary blob; every subsequent compress/decompress call
	/// uses it. Only meaningful for `Zstd`.
	pub fn set_dictionary(&mut self, dictionary: Vec<u8>) {
		self.dictionary = Some(dictionary);
	}

	/// The codec kind, for stamping into the preface.
	pub fn kind(&self) -> CodecKind {
		self.kind
	}

	/// Compresses one chunk's worth of uncompressed bytes.
	pub fn compress_chunk(&self, input: &[u8]) -> Result<Vec<u8>> {
		match self.kind {
			CodecKind::None => Ok(input.to_vec()),
			CodecKind::Zstd => {
				let mut compressor = match &self.dictionary {
					Some(dict) => zstd::bulk::Compressor::with_dictionary(self.level, dict)?,
					None => zstd::bulk::Compressor::new(self.level)?,
				};
				Ok(compressor.compress(input)?)
			}
		}
	}

	/// Decompresses one chunk's worth of compressed bytes. `expected_uncomp_size`
	/// comes from the index; the call fails if the produced output size
	/// diverges from it.
	pub fn decompress_chunk(&self, input: &[u8], expected_uncomp_size: usize) -> Result<Vec<u8>> {
		let out = match self.kind {
			CodecKind::None => input.to_vec(),
			CodecKind::Zstd => {
				let mut decompressor = match &self.dictionary {
					Some(dict) => zstd::bulk::Decompressor::with_dictionary(dict)?,
					None => zstd::bulk::Decompressor::new()?,
				};
				decompressor.decompress(input, expected_uncomp_size)?
			}
		};
		if out.len() != expected_uncomp_size {
			return Err(ZchunkError::new(
				ZchunkErrorKind::Decode,
				crate::constants::ERROR_DECOMPRESSED_SIZE_MISMATCH,
			));
		}
		Ok(out)
	}
}
