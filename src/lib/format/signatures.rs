//! The Signatures region. Opaque passthrough: this build neither verifies
//! nor produces signatures, but it must preserve every byte so the header
//! digest recomputes identically on a file it did not author.

use crate::compint;
use crate::Result;

/// One signature entry: a hash-kind byte, a length, and that many raw bytes.
/// The hash-kind and payload are never interpreted, only preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SignatureEntry {
	/// Wire code of the signing hash, preserved but never interpreted.
	pub hash_kind: u8,
	/// Raw signature bytes, preserved but never interpreted.
	#[cfg_attr(feature = "serde", serde(serialize_with = "crate::hex_ser::serialize"))]
	pub payload: Vec<u8>,
}

/// The fourth and final header region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Signatures {
	/// Zero or more opaque signature entries, in on-disk order.
	pub entries: Vec<SignatureEntry>,
}

impl Signatures {
	/// An empty Signatures region (the common case: zero entries).
	pub fn empty() -> Self {
		Self::default()
	}

	/// Parses a Signatures region from the front of `data`.
	pub fn read_from(data: &[u8]) -> Result<(Signatures, usize)> {
		let mut pos = 0;
		let (count, n) = compint::decode(&data[pos..], data.len() - pos)?;
		pos += n;

		let mut entries = Vec::with_capacity(count as usize);
		for _ in 0..count {
			if pos >= data.len() {
				return Err(crate::error::ZchunkError::new(
					crate::error::ZchunkErrorKind::Decode,
					crate::constants::ERROR_HEADER_TRUNCATED,
				));
			}
			let hash_kind = data[pos];
			pos += 1;
			let (length, n) = compint::decode(&data[pos..], data.len() - pos)?;
			pos += n;
			let length = length as usize;
			if pos + length > data.len() {
				return Err(crate::error::ZchunkError::new(
					crate::error::ZchunkErrorKind::Decode,
					crate::constants::ERROR_HEADER_TRUNCATED,
				));
			}
			let payload = data[pos..pos + length].to_vec();
			pos += length;
			entries.push(SignatureEntry { hash_kind, payload });
		}

		Ok((Self { entries }, pos))
	}

	/// Serializes the Signatures region exactly as it appears on disk.
	pub fn write_to(&self) -> Vec<u8> {
		let mut out = Vec::new();
		out.extend(compint::encode(self.entries.len() as u64));
		for entry in &self.entries {
			out.push(entry.hash_kind);
			out.extend(compint::encode(entry.payload.len() as u64));
			out.extend_from_slice(&entry.payload);
		}
		out
	}
}
