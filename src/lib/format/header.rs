//! The full header: Lead, Preface, Index, Signatures, plus the seal/verify
//! logic and the incremental parser used by the delta engine when bytes
//! arrive one transport fetch at a time.

use crate::chunk::Index;
use crate::codec::CodecKind;
use crate::constants::ERROR_HEADER_DIGEST_MISMATCH;
use crate::digest::{self, DigestKind};
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::format::lead::Lead;
use crate::format::preface::Preface;
use crate::format::signatures::Signatures;
use crate::Result;

#[cfg(feature = "log")]
use log::{debug, warn};

/// A fully parsed and digest-verified header.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Header {
	/// Magic, full-hash kind, header digest, and the size of everything after it.
	pub lead: Lead,
	/// Full-data digest, flags, and codec kind.
	pub preface: Preface,
	/// Per-chunk digests, lengths, and offsets.
	pub index: Index,
	/// Opaque, preserved-but-unverified signature entries.
	pub signatures: Signatures,
}

impl Header {
	/// Builds and seals a header: serializes Preface‖Index‖Signatures,
	/// computes the header digest over Lead(zeroed)‖that, then returns the
	/// complete header bytes with the real digest stamped in.
	pub fn seal(
		full_hash_kind: DigestKind,
		flags: u64,
		comp_kind: CodecKind,
		full_data_digest: Vec<u8>,
		index: &Index,
		signatures: &Signatures,
	) -> Vec<u8> {
		let preface = Preface::new(full_data_digest, flags, comp_kind);
		let with_uncomp_checksums = preface.has_uncompressed_checksums();
		let preface_bytes = preface.write_to();
		let index_bytes = index.write_to(with_uncomp_checksums);
		let sig_bytes = signatures.write_to();
		let rest_size = (preface_bytes.len() + index_bytes.len() + sig_bytes.len()) as u64;

		let placeholder_digest = vec![0u8; full_hash_kind.digest_size()];
		let lead = Lead::new(full_hash_kind, placeholder_digest, rest_size);
		let mut to_hash = lead.write_to();
		to_hash.extend_from_slice(&preface_bytes);
		to_hash.extend_from_slice(&index_bytes);
		to_hash.extend_from_slice(&sig_bytes);
		let header_digest = digest::digest(full_hash_kind, &to_hash);

		let sealed_lead = Lead::new(full_hash_kind, header_digest, rest_size);
		let mut out = sealed_lead.write_to();
		out.extend_from_slice(&preface_bytes);
		out.extend_from_slice(&index_bytes);
		out.extend_from_slice(&sig_bytes);
		out
	}

	/// Parses and verifies a complete header, given the entire Lead through
	/// Signatures byte range. Fails with an `Integrity` error on digest
	/// mismatch, or `Decode` on a malformed region.
	pub fn parse_complete(data: &[u8]) -> Result<(Header, usize)> {
		let (lead, lead_len) = Lead::read_from(data)?;
		let rest_end = lead_len + lead.rest_size as usize;
		if data.len() < rest_end {
			return Err(ZchunkError::new(ZchunkErrorKind::Decode, crate::constants::ERROR_HEADER_TRUNCATED));
		}
		let rest = &data[lead_len..rest_end];

		let (preface, preface_len) = Preface::read_from(rest, lead.full_hash_kind)?;
		let (index, index_len) =
			Index::read_from(&rest[preface_len..], preface.has_uncompressed_checksums(), preface.has_dictionary())?;
		let (signatures, sig_len) = Signatures::read_from(&rest[preface_len + index_len..])?;

		if preface_len + index_len + sig_len != rest.len() {
			return Err(ZchunkError::new(ZchunkErrorKind::Decode, crate::constants::ERROR_HEADER_SIZE_MISMATCH));
		}

		let mut to_hash = lead.with_digest_zeroed().write_to();
		to_hash.extend_from_slice(rest);
		let recomputed = digest::digest(lead.full_hash_kind, &to_hash);
		if recomputed != lead.header_digest {
			#[cfg(feature = "log")]
			warn!("header digest mismatch: recomputed value does not match the digest stamped in the Lead");
			return Err(ZchunkError::new(ZchunkErrorKind::Decode, ERROR_HEADER_DIGEST_MISMATCH));
		}

		#[cfg(feature = "log")]
		debug!("parsed header: {} chunks, {} bytes of header region", index.chunks.len(), rest_end);
		Ok((Header { lead, preface, index, signatures }, rest_end))
	}
}

/// Parse progress, exposed so a transport can fetch exactly the bytes the
/// next transition needs instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderParsePhase {
	/// Waiting for enough bytes to parse the Lead.
	NeedLead,
	/// Lead parsed; waiting for the rest of the header region.
	NeedRest,
	/// Every region buffered; digest verification has not run yet.
	Verified,
	/// Verification passed; [`HeaderParser::into_header`] has a result.
	Ready,
}

/// Drives the `NeedLead -> NeedRest -> Verified -> Ready` state machine
/// across however many `advance` calls the transport needs to hand over
/// enough bytes. A single call cascades through every transition the
/// currently buffered bytes allow, so feeding the full header in one call
/// (or the last of several) reaches `Ready` without a trailing no-op call.
pub struct HeaderParser {
	phase: HeaderParsePhase,
	buf: Vec<u8>,
	lead: Option<Lead>,
	header: Option<Header>,
}

impl HeaderParser {
	/// A fresh parser in the `NeedLead` phase.
	pub fn new() -> Self {
		Self { phase: HeaderParsePhase::NeedLead, buf: Vec::new(), lead: None, header: None }
	}

	/// The current phase.
	pub fn phase(&self) -> HeaderParsePhase {
		self.phase
	}

	/// A conservative estimate of how many more bytes to fetch before the
	/// next `advance` call is likely to make progress. Not authoritative:
	/// `advance` may still report the same phase if the estimate was short
	/// (e.g. an unusually long compint), in which case call this again.
	pub fn bytes_needed(&self) -> usize {
		match self.phase {
			HeaderParsePhase::NeedLead => {
				if self.buf.len() <= crate::constants::LEAD_MAGIC.len() {
					crate::constants::LEAD_MAGIC.len() + 1 - self.buf.len()
				} else {
					match DigestKind::from_wire_code(self.buf[crate::constants::LEAD_MAGIC.len()]) {
						Ok(kind) => {
							let min_lead = crate::constants::LEAD_MAGIC.len() + 1 + kind.digest_size() + 1;
							min_lead.saturating_sub(self.buf.len())
						}
						Err(_) => 0,
					}
				}
			}
			HeaderParsePhase::NeedRest => match &self.lead {
				Some(lead) => (lead.encoded_len() + lead.rest_size as usize).saturating_sub(self.buf.len()),
				None => 0,
			},
			HeaderParsePhase::Verified | HeaderParsePhase::Ready => 0,
		}
	}

	/// Appends newly fetched bytes and drives the state machine as far as
	/// the buffered bytes allow, possibly through several phases in one call.
	pub fn advance(&mut self, data: &[u8]) -> Result<HeaderParsePhase> {
		self.buf.extend_from_slice(data);

		loop {
			match self.phase {
				HeaderParsePhase::NeedLead => match Lead::read_from(&self.buf) {
					Ok((lead, _)) => {
						self.lead = Some(lead);
						self.phase = HeaderParsePhase::NeedRest;
					}
					Err(e) => {
						let magic_len = crate::constants::LEAD_MAGIC.len();
						let magic_known_bad =
							self.buf.len() >= magic_len && self.buf[..magic_len] != crate::constants::LEAD_MAGIC;
						if magic_known_bad {
							return Err(e);
						}
						// not enough data buffered yet; stay in NeedLead
						break;
					}
				},
				HeaderParsePhase::NeedRest => {
					let lead = self.lead.clone().expect("NeedRest implies a parsed Lead");
					let rest_end = lead.encoded_len() + lead.rest_size as usize;
					if self.buf.len() >= rest_end {
						self.phase = HeaderParsePhase::Verified;
					} else {
						break;
					}
				}
				HeaderParsePhase::Verified => {
					let (header, consumed) = Header::parse_complete(&self.buf)?;
					self.buf.drain(..consumed);
					self.header = Some(header);
					self.phase = HeaderParsePhase::Ready;
				}
				HeaderParsePhase::Ready => break,
			}
		}

		Ok(self.phase)
	}

	/// The finished header, once `phase() == Ready`.
	pub fn into_header(self) -> Option<Header> {
		self.header
	}
}

impl Default for HeaderParser {
	fn default() -> Self {
		Self::new()
	}
}
