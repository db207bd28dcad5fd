//! Polymorphic hashing: the full-hash applies to the header and to the
//! concatenated uncompressed payload; the chunk-hash applies independently
//! to each chunk's uncompressed bytes. Digest size is a property of the
//! kind and must match the on-disk size byte-for-byte.

// - STD
use std::fmt;

// - external
use digest::DynDigest;
use sha1::Sha1;
use sha2::{Digest as _, Sha256, Sha512};

use crate::constants::{DIGEST_WIRE_SHA1, DIGEST_WIRE_SHA256, DIGEST_WIRE_SHA512, DIGEST_WIRE_SHA512_128};
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::Result;

/// The digest kinds this build supports, matching the wire codes in the
/// preface and index.
#[repr(u8)]
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DigestKind {
	/// SHA-1, kept for legacy chunk-hash compatibility.
	Sha1 = DIGEST_WIRE_SHA1,
	/// SHA-256, the default full-hash.
	Sha256 = DIGEST_WIRE_SHA256,
	/// SHA-512.
	Sha512 = DIGEST_WIRE_SHA512,
	/// SHA-512, truncated to the first 16 bytes.
	Sha512_128 = DIGEST_WIRE_SHA512_128,
}

impl DigestKind {
	/// The digest's on-disk byte size.
	pub fn digest_size(&self) -> usize {
		match self {
			DigestKind::Sha1 => 20,
			DigestKind::Sha256 => 32,
			DigestKind::Sha512 => 64,
			DigestKind::Sha512_128 => 16,
		}
	}

	/// The single-byte wire code stored in the preface/index.
	pub fn wire_code(&self) -> u8 {
		*self as u8
	}

	/// Parses a wire code into a `DigestKind`, failing with a `Config`
	/// error for anything this build doesn't implement.
	pub fn from_wire_code(code: u8) -> Result<Self> {
		match code {
			DIGEST_WIRE_SHA1 => Ok(DigestKind::Sha1),
			DIGEST_WIRE_SHA256 => Ok(DigestKind::Sha256),
			DIGEST_WIRE_SHA512 => Ok(DigestKind::Sha512),
			DIGEST_WIRE_SHA512_128 => Ok(DigestKind::Sha512_128),
			other => Err(ZchunkError::new(
				ZchunkErrorKind::Config,
				format!("{}: {}", crate::constants::ERROR_UNKNOWN_DIGEST_KIND, other),
			)),
		}
	}
}

impl fmt::Display for DigestKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let msg = match self {
			DigestKind::Sha1 => "SHA-1",
			DigestKind::Sha256 => "SHA-256",
			DigestKind::Sha512 => "SHA-512",
			DigestKind::Sha512_128 => "SHA-512/128",
		};
		write!(f, "{}", msg)
	}
}

/// A running hash computation: `init`, `update`, `finalize`.
pub struct Hasher {
	kind: DigestKind,
	inner: Box<dyn DynDigest + Send>,
}

impl Hasher {
	/// Starts a new hasher for the given kind.
	pub fn new(kind: DigestKind) -> Self {
		let inner: Box<dyn DynDigest + Send> = match kind {
			DigestKind::Sha1 => Box::new(Sha1::new()),
			DigestKind::Sha256 => Box::new(Sha256::new()),
			// Sha512_128 runs a full SHA-512 and truncates at finalize time;
			// it is not a distinct hash function.
			DigestKind::Sha512 | DigestKind::Sha512_128 => Box::new(Sha512::new()),
		};
		Self { kind, inner }
	}

	/// Feeds more bytes into the running hash.
	pub fn update(&mut self, bytes: &[u8]) {
		self.inner.update(bytes);
	}

	/// Consumes the hasher and returns the digest, truncated to
	/// `kind.digest_size()` bytes where the kind calls for truncation.
	pub fn finalize(self) -> Vec<u8> {
		let mut out = self.inner.finalize().to_vec();
		out.truncate(self.kind.digest_size());
		out
	}

	/// The kind this hasher was started with.
	pub fn kind(&self) -> DigestKind {
		self.kind
	}
}

/// Convenience one-shot hash of a full buffer.
pub fn digest(kind: DigestKind, bytes: &[u8]) -> Vec<u8> {
	let mut hasher = Hasher::new(kind);
	hasher.update(bytes);
	hasher.finalize()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn digest_sizes_match_kind() {
		for kind in [DigestKind::Sha1, DigestKind::Sha256, DigestKind::Sha512, DigestKind::Sha512_128] {
			let d = digest(kind, b"hello world");
			assert_eq!(d.len(), kind.digest_size());
		}
	}

	#[test]
	fn empty_sha256_matches_known_vector() {
		let d = digest(DigestKind::Sha256, b"");
		assert_eq!(
			hex::encode(d),
			"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
		);
	}

	#[test]
	fn sha512_128_is_a_truncated_sha512() {
		let full = digest(DigestKind::Sha512, b"zchunk");
		let truncated = digest(DigestKind::Sha512_128, b"zchunk");
		assert_eq!(truncated.len(), 16);
		assert_eq!(&full[..16], &truncated[..]);
	}

	#[test]
	fn wire_code_round_trips() {
		for kind in [DigestKind::Sha1, DigestKind::Sha256, DigestKind::Sha512, DigestKind::Sha512_128] {
			assert_eq!(DigestKind::from_wire_code(kind.wire_code()).unwrap(), kind);
		}
		assert!(DigestKind::from_wire_code(0xff).is_err());
	}
}
