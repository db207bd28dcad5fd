//! The Lead region: magic, full-hash kind, header digest, and the compint
//! giving the combined size of everything that follows it.

use crate::compint;
use crate::constants::{ERROR_HEADER_TRUNCATED, ERROR_LEAD_MAGIC_MISMATCH, LEAD_MAGIC};
use crate::digest::DigestKind;
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::Result;

fn truncated() -> ZchunkError {
	ZchunkError::new(ZchunkErrorKind::Decode, ERROR_HEADER_TRUNCATED)
}

/// The first region of a zchunk header.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Lead {
	/// Digest kind the full-data digest and header digest are both computed with.
	pub full_hash_kind: DigestKind,
	/// The full-hash over Lead(digest zeroed)‖Preface‖Index‖Signatures.
	#[cfg_attr(feature = "serde", serde(serialize_with = "crate::hex_ser::serialize"))]
	pub header_digest: Vec<u8>,
	/// Combined byte length of Preface‖Index‖Signatures.
	pub rest_size: u64,
	encoded_len: usize,
}

impl Lead {
	/// Builds a Lead around an already-known digest and rest size (used by
	/// the writer once it knows how big the trailing regions are).
	pub fn new(full_hash_kind: DigestKind, header_digest: Vec<u8>, rest_size: u64) -> Self {
		let mut lead = Self { full_hash_kind, header_digest, rest_size, encoded_len: 0 };
		lead.encoded_len = lead.write_to().len();
		lead
	}

	/// A copy of this Lead with the digest field zeroed, the form the header
	/// digest is actually computed over.
	pub fn with_digest_zeroed(&self) -> Self {
		Self { header_digest: vec![0u8; self.header_digest.len()], ..self.clone() }
	}

	/// Parses a Lead from the front of `data`. Fails with a truncation error
	/// (not a hard decode error) when `data` simply doesn't hold enough
	/// bytes yet; callers doing incremental/streaming parse should treat
	/// that as "fetch more and retry", and only a genuine magic mismatch or
	/// compint overflow is an unrecoverable decode error.
	pub fn read_from(data: &[u8]) -> Result<(Lead, usize)> {
		if data.len() < LEAD_MAGIC.len() {
			return Err(truncated());
		}
		if data[..LEAD_MAGIC.len()] != LEAD_MAGIC {
			return Err(ZchunkError::new(ZchunkErrorKind::Decode, ERROR_LEAD_MAGIC_MISMATCH));
		}
		let hash_kind_pos = LEAD_MAGIC.len();
		if data.len() <= hash_kind_pos {
			return Err(truncated());
		}
		let full_hash_kind = DigestKind::from_wire_code(data[hash_kind_pos])?;
		let digest_start = hash_kind_pos + 1;
		let digest_end = digest_start + full_hash_kind.digest_size();
		if data.len() < digest_end {
			return Err(truncated());
		}
		let header_digest = data[digest_start..digest_end].to_vec();
		let remaining = &data[digest_end..];
		let (rest_size, consumed) = match compint::decode(remaining, remaining.len()) {
			Ok(v) => v,
			// no terminator byte buffered yet: ask for more rather than failing hard
			Err(_) if !remaining.iter().any(|b| b & 0x80 != 0) => return Err(truncated()),
			Err(e) => return Err(e),
		};
		let encoded_len = digest_end + consumed;
		Ok((Self { full_hash_kind, header_digest, rest_size, encoded_len }, encoded_len))
	}

	/// Serializes the Lead exactly as it appears on disk.
	pub fn write_to(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(LEAD_MAGIC.len() + 1 + self.header_digest.len() + 4);
		out.extend_from_slice(&LEAD_MAGIC);
		out.push(self.full_hash_kind.wire_code());
		out.extend_from_slice(&self.header_digest);
		out.extend(compint::encode(self.rest_size));
		out
	}

	/// Number of bytes this Lead occupies on disk.
	pub fn encoded_len(&self) -> usize {
		self.encoded_len
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips() {
		let lead = Lead::new(DigestKind::Sha256, vec![7u8; 32], 1234);
		let bytes = lead.write_to();
		let (parsed, consumed) = Lead::read_from(&bytes).unwrap();
		assert_eq!(consumed, bytes.len());
		assert_eq!(parsed.full_hash_kind, DigestKind::Sha256);
		assert_eq!(parsed.header_digest, vec![7u8; 32]);
		assert_eq!(parsed.rest_size, 1234);
	}

	#[test]
	fn rejects_bad_magic() {
		let mut bytes = Lead::new(DigestKind::Sha1, vec![0u8; 20], 0).write_to();
		bytes[1] = b'X';
		let err = Lead::read_from(&bytes).unwrap_err();
		assert_eq!(err.kind(), ZchunkErrorKind::Decode);
	}

	#[test]
	fn reports_truncation_on_short_buffer() {
		let bytes = Lead::new(DigestKind::Sha512, vec![0u8; 64], 9).write_to();
		let err = Lead::read_from(&bytes[..bytes.len() - 1]).unwrap_err();
		assert_eq!(err.kind(), ZchunkErrorKind::Decode);
	}

	#[test]
	fn zeroed_digest_copy_preserves_length() {
		let lead = Lead::new(DigestKind::Sha256, vec![9u8; 32], 5);
		let zeroed = lead.with_digest_zeroed();
		assert_eq!(zeroed.header_digest, vec![0u8; 32]);
		assert_eq!(zeroed.rest_size, 5);
	}
}
