//! The data model: [`Chunk`], its validity state, and the [`Index`] that
//! collects them with a digest-to-position side map for O(1) donor lookup.

// - STD
use std::collections::HashMap;

use crate::digest::DigestKind;

/// A chunk's validity as tracked by the reader and delta engine.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ChunkState {
	/// Verified present and correct.
	Valid,
	/// Not yet attempted.
	Missing,
	/// Attempted and the digest did not match.
	Failed,
}

/// The atomic unit of a zchunk file: one independently compressed,
/// independently verified payload segment.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Chunk {
	/// Digest of the uncompressed bytes under the chunk-hash kind. Empty
	/// only transiently while a chunk is being built by the writer.
	#[cfg_attr(feature = "serde", serde(serialize_with = "crate::hex_ser::serialize"))]
	pub digest: Vec<u8>,
	/// Compressed byte count as it appears on the wire.
	pub comp_length: u64,
	/// Uncompressed byte count.
	pub length: u64,
	/// Byte offset inside the uncompressed logical stream; the prefix sum
	/// of every preceding non-dictionary chunk's `length`.
	pub start: u64,
	/// Current validity.
	pub valid: ChunkState,
	/// Present only when the uncompressed-checksum preface flag is set.
	#[cfg_attr(feature = "serde", serde(serialize_with = "crate::hex_ser::serialize_opt"))]
	pub uncomp_digest: Option<Vec<u8>>,
}

impl Chunk {
	/// Creates a new chunk record with the given digest and sizes, in the
	/// `Missing` state (the caller marks it valid once it verifies).
	pub fn new(digest: Vec<u8>, comp_length: u64, length: u64, start: u64) -> Self {
		Self {
			digest,
			comp_length,
			length,
			start,
			valid: ChunkState::Missing,
			uncomp_digest: None,
		}
	}
}

/// Ordered sequence of chunks plus the index-wide metadata from the Index
/// region: chunk-hash kind, total chunk count, total uncompressed length,
/// and the full-data digest.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Index {
	/// Digest kind applied to each chunk's uncompressed bytes.
	pub chunk_hash_kind: DigestKind,
	/// Every chunk, in on-disk order. `chunks[0]` is the dictionary chunk
	/// when `dictionary_present` is set; absence of a dictionary means no
	/// element at index 0 carries the dictionary role, not a zero-length
	/// one.
	pub chunks: Vec<Chunk>,
	/// Total uncompressed length across all non-dictionary chunks.
	pub total_length: u64,
	/// Digest over the concatenation of all uncompressed chunk payloads
	/// under the full-hash kind. `None` until the writer finalizes or the
	/// reader has consumed every chunk.
	#[cfg_attr(feature = "serde", serde(serialize_with = "crate::hex_ser::serialize_opt"))]
	pub full_data_digest: Option<Vec<u8>>,
	dictionary_present: bool,
	#[cfg_attr(feature = "serde", serde(skip))]
	digest_to_position: HashMap<Vec<u8>, usize>,
}

impl Index {
	/// Creates an empty index for the given chunk-hash kind.
	pub fn new(chunk_hash_kind: DigestKind) -> Self {
		Self {
			chunk_hash_kind,
			chunks: Vec::new(),
			total_length: 0,
			full_data_digest: None,
			dictionary_present: false,
			digest_to_position: HashMap::new(),
		}
	}

	/// Appends a chunk and keeps the digest side-index in sync.
	pub fn push(&mut self, chunk: Chunk) {
		let position = self.chunks.len();
		self.digest_to_position.insert(chunk.digest.clone(), position);
		if !(self.dictionary_present && position == 0) {
			self.total_length += chunk.length;
		}
		self.chunks.push(chunk);
	}

	/// Rebuilds the digest side-index, e.g. after decoding a parsed index
	/// from disk.
	pub fn rebuild_side_index(&mut self) {
		self.digest_to_position.clear();
		for (position, chunk) in self.chunks.iter().enumerate() {
			self.digest_to_position.insert(chunk.digest.clone(), position);
		}
	}

	/// O(1) lookup of a chunk's position by its digest.
	pub fn position_of(&self, digest: &[u8]) -> Option<usize> {
		self.digest_to_position.get(digest).copied()
	}

	/// Total number of chunks, including the dictionary chunk if present.
	pub fn chunk_count(&self) -> usize {
		self.chunks.len()
	}

	/// Whether `chunks[0]` is a dictionary chunk.
	pub fn has_dictionary(&self) -> bool {
		self.dictionary_present
	}

	/// Marks whether index 0 is the dictionary chunk. Must be set before
	/// any `push` call that should count (or not count) towards
	/// `total_length`.
	pub fn set_dictionary_present(&mut self, present: bool) {
		self.dictionary_present = present;
	}

	/// Each chunk's `[start, end)` byte range within the *compressed*
	/// payload region, in index order; this is the prefix sum over
	/// `comp_length`, which the delta engine needs for range planning but
	/// which individual `Chunk` records do not carry (their `start` field
	/// is the uncompressed-stream offset instead).
	pub fn compressed_offsets(&self) -> Vec<(u64, u64)> {
		let mut offset = 0u64;
		let mut out = Vec::with_capacity(self.chunks.len());
		for chunk in &self.chunks {
			out.push((offset, offset + chunk.comp_length));
			offset += chunk.comp_length;
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn push_tracks_digest_positions() {
		let mut index = Index::new(DigestKind::Sha256);
		index.push(Chunk::new(vec![1, 2, 3], 10, 20, 0));
		index.push(Chunk::new(vec![4, 5, 6], 15, 25, 20));
		assert_eq!(index.position_of(&[4, 5, 6]), Some(1));
		assert_eq!(index.position_of(&[9, 9, 9]), None);
		assert_eq!(index.total_length, 45);
	}

	#[test]
	fn dictionary_chunk_excluded_from_total_length() {
		let mut index = Index::new(DigestKind::Sha256);
		index.set_dictionary_present(true);
		index.push(Chunk::new(vec![1], 5, 100, 0));
		index.push(Chunk::new(vec![2], 5, 30, 0));
		assert_eq!(index.total_length, 30);
	}

	#[test]
	fn compressed_offsets_prefix_sum_comp_length() {
		let mut index = Index::new(DigestKind::Sha1);
		index.push(Chunk::new(vec![1], 10, 100, 0));
		index.push(Chunk::new(vec![2], 20, 200, 100));
		let offsets = index.compressed_offsets();
		assert_eq!(offsets, vec![(0, 10), (10, 30)]);
	}
}
