//! The Preface region: full-data digest, the flag bitfield, and the codec
//! kind. The `has_optional_flags` bit is preserved and round-tripped only;
//! this build does not parse whatever extra byte it may have once gated in
//! the source format, per the open design question on its semantics.

use crate::codec::CodecKind;
use crate::compint;
use crate::constants::{
	PREFACE_FLAG_HAS_DICTIONARY, PREFACE_FLAG_HAS_OPTIONAL_FLAGS, PREFACE_FLAG_HAS_STREAMS,
	PREFACE_FLAG_HAS_UNCOMPRESSED_CHECKSUMS,
};
use crate::constants::ERROR_HEADER_TRUNCATED;
use crate::digest::DigestKind;
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::Result;

/// The second region of a zchunk header.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Preface {
	/// Digest of the full, uncompressed stream, sized by the Lead's full-hash kind.
	#[cfg_attr(feature = "serde", serde(serialize_with = "crate::hex_ser::serialize"))]
	pub full_data_digest: Vec<u8>,
	/// Bitfield of `PREFACE_FLAG_*` bits.
	pub flags: u64,
	/// Compression codec applied to every chunk payload.
	pub comp_kind: CodecKind,
}

impl Preface {
	/// Builds a Preface from its three fields.
	pub fn new(full_data_digest: Vec<u8>, flags: u64, comp_kind: CodecKind) -> Self {
		Self { full_data_digest, flags, comp_kind }
	}

	/// Whether the stream was written with independent per-stream framing.
	pub fn has_streams(&self) -> bool {
		self.flags & PREFACE_FLAG_HAS_STREAMS != 0
	}

	/// Whether an optional-flags byte follows the named flags (preserved, not parsed).
	pub fn has_optional_flags(&self) -> bool {
		self.flags & PREFACE_FLAG_HAS_OPTIONAL_FLAGS != 0
	}

	/// Whether each chunk entry in the Index carries an uncompressed-data digest.
	pub fn has_uncompressed_checksums(&self) -> bool {
		self.flags & PREFACE_FLAG_HAS_UNCOMPRESSED_CHECKSUMS != 0
	}

	/// Whether chunk 0 is a shared dictionary rather than stream data.
	pub fn has_dictionary(&self) -> bool {
		self.flags & PREFACE_FLAG_HAS_DICTIONARY != 0
	}

	/// Sets or clears a single flag bit.
	pub fn set_flag(&mut self, bit: u64, on: bool) {
		if on {
			self.flags |= bit;
		} else {
			self.flags &= !bit;
		}
	}

	/// Parses a Preface, given the full-hash kind (fixes the digest field's
	/// size) already read from the Lead.
	pub fn read_from(data: &[u8], full_hash_kind: DigestKind) -> Result<(Preface, usize)> {
		let digest_size = full_hash_kind.digest_size();
		if data.len() < digest_size {
			return Err(ZchunkError::new(ZchunkErrorKind::Decode, ERROR_HEADER_TRUNCATED));
		}
		let full_data_digest = data[..digest_size].to_vec();
		let mut pos = digest_size;

		let (flags, n) = compint::decode(&data[pos..], data.len() - pos)?;
		pos += n;
		let (comp_kind_code, n) = compint::decode(&data[pos..], data.len() - pos)?;
		pos += n;
		let comp_kind = CodecKind::from_wire_code(comp_kind_code as u8)?;

		Ok((Self { full_data_digest, flags, comp_kind }, pos))
	}

	/// Serializes the Preface exactly as it appears on disk.
	pub fn write_to(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(self.full_data_digest.len() + 4);
		out.extend_from_slice(&self.full_data_digest);
		out.extend(compint::encode(self.flags));
		out.extend(compint::encode(self.comp_kind.wire_code() as u64));
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_with_all_named_flags_set() {
		let flags = PREFACE_FLAG_HAS_STREAMS | PREFACE_FLAG_HAS_OPTIONAL_FLAGS | PREFACE_FLAG_HAS_UNCOMPRESSED_CHECKSUMS;
		let preface = Preface::new(vec![1u8; 32], flags, CodecKind::Zstd);
		let bytes = preface.write_to();
		let (parsed, consumed) = Preface::read_from(&bytes, DigestKind::Sha256).unwrap();
		assert_eq!(consumed, bytes.len());
		assert!(parsed.has_streams());
		assert!(parsed.has_optional_flags());
		assert!(parsed.has_uncompressed_checksums());
		assert!(!parsed.has_dictionary());
	}

	#[test]
	fn unset_flags_round_trip_false() {
		let preface = Preface::new(vec![0u8; 20], 0, CodecKind::None);
		let bytes = preface.write_to();
		let (parsed, _) = Preface::read_from(&bytes, DigestKind::Sha1).unwrap();
		assert!(!parsed.has_streams());
		assert!(!parsed.has_optional_flags());
		assert!(!parsed.has_uncompressed_checksums());
	}

	#[test]
	fn set_flag_toggles_individual_bits() {
		let mut preface = Preface::new(vec![0u8; 32], 0, CodecKind::Zstd);
		preface.set_flag(PREFACE_FLAG_HAS_DICTIONARY, true);
		assert!(preface.has_dictionary());
		preface.set_flag(PREFACE_FLAG_HAS_DICTIONARY, false);
		assert!(!preface.has_dictionary());
	}
}
