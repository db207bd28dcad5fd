//! Wire serialization for the data-model [`Index`](crate::chunk::Index):
//! `compint(chunk_hash_kind) ‖ compint(chunk_count) ‖ chunk_entry*`, each
//! entry `digest ‖ compint(comp_length) ‖ compint(length) ‖
//! [uncomp_digest if the uncompressed-checksum flag is set]`.

use crate::chunk::{Chunk, Index};
use crate::compint;
use crate::constants::ERROR_HEADER_TRUNCATED;
use crate::digest::DigestKind;
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::Result;

impl Index {
	/// Parses an Index. `has_uncomp_checksums` and `has_dictionary` come
	/// from the Preface's flags, since the Index region carries no flags of
	/// its own. `start` offsets are recomputed from the parsed `length`
	/// fields rather than stored on disk.
	pub fn read_from(data: &[u8], has_uncomp_checksums: bool, has_dictionary: bool) -> Result<(Index, usize)> {
		let mut pos = 0;
		let (kind_code, n) = compint::decode(&data[pos..], data.len() - pos)?;
		pos += n;
		let chunk_hash_kind = DigestKind::from_wire_code(kind_code as u8)?;

		let (count, n) = compint::decode(&data[pos..], data.len() - pos)?;
		pos += n;

		let digest_size = chunk_hash_kind.digest_size();
		let mut index = Index::new(chunk_hash_kind);
		index.set_dictionary_present(has_dictionary);

		for _ in 0..count {
			if pos + digest_size > data.len() {
				return Err(truncated());
			}
			let digest = data[pos..pos + digest_size].to_vec();
			pos += digest_size;

			let (comp_length, n) = compint::decode(&data[pos..], data.len() - pos)?;
			pos += n;
			let (length, n) = compint::decode(&data[pos..], data.len() - pos)?;
			pos += n;

			let mut chunk = Chunk::new(digest, comp_length, length, 0);
			if has_uncomp_checksums {
				if pos + digest_size > data.len() {
					return Err(truncated());
				}
				chunk.uncomp_digest = Some(data[pos..pos + digest_size].to_vec());
				pos += digest_size;
			}
			index.push(chunk);
		}

		recompute_starts(&mut index);
		Ok((index, pos))
	}

	/// Serializes the Index exactly as it appears on disk. `with_uncomp_checksums`
	/// must match the Preface's `has_uncompressed_checksums` flag, since that
	/// flag (not anything in the Index itself) decides whether the
	/// per-chunk uncompressed digest is present.
	pub fn write_to(&self, with_uncomp_checksums: bool) -> Vec<u8> {
		let mut out = Vec::new();
		out.extend(compint::encode(self.chunk_hash_kind.wire_code() as u64));
		out.extend(compint::encode(self.chunks.len() as u64));
		for chunk in &self.chunks {
			out.extend_from_slice(&chunk.digest);
			out.extend(compint::encode(chunk.comp_length));
			out.extend(compint::encode(chunk.length));
			if with_uncomp_checksums {
				let digest = chunk.uncomp_digest.clone().unwrap_or_else(|| vec![0u8; chunk.digest.len()]);
				out.extend_from_slice(&digest);
			}
		}
		out
	}
}

fn truncated() -> ZchunkError {
	ZchunkError::new(ZchunkErrorKind::Decode, ERROR_HEADER_TRUNCATED)
}

fn recompute_starts(index: &mut Index) {
	let has_dictionary = index.has_dictionary();
	let mut offset = 0u64;
	for (position, chunk) in index.chunks.iter_mut().enumerate() {
		chunk.start = offset;
		if !(has_dictionary && position == 0) {
			offset += chunk.length;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_without_uncomp_checksums() {
		let mut index = Index::new(DigestKind::Sha256);
		index.push(Chunk::new(vec![1u8; 32], 10, 100, 0));
		index.push(Chunk::new(vec![2u8; 32], 20, 200, 100));
		let bytes = index.write_to(false);
		let (parsed, consumed) = Index::read_from(&bytes, false, false).unwrap();
		assert_eq!(consumed, bytes.len());
		assert_eq!(parsed.chunks.len(), 2);
		assert_eq!(parsed.chunks[0].start, 0);
		assert_eq!(parsed.chunks[1].start, 100);
		assert_eq!(parsed.total_length, 300);
	}

	#[test]
	fn round_trips_with_uncomp_checksums() {
		let mut index = Index::new(DigestKind::Sha1);
		let mut chunk = Chunk::new(vec![9u8; 20], 5, 50, 0);
		chunk.uncomp_digest = Some(vec![8u8; 20]);
		index.push(chunk);
		let bytes = index.write_to(true);
		let (parsed, _) = Index::read_from(&bytes, true, false).unwrap();
		assert_eq!(parsed.chunks[0].uncomp_digest, Some(vec![8u8; 20]));
	}

	#[test]
	fn dictionary_chunk_excluded_from_starts_and_total() {
		let mut index = Index::new(DigestKind::Sha256);
		index.set_dictionary_present(true);
		index.push(Chunk::new(vec![1u8; 32], 5, 64, 0)); // dictionary
		index.push(Chunk::new(vec![2u8; 32], 10, 100, 0));
		let bytes = index.write_to(false);
		let (parsed, _) = Index::read_from(&bytes, false, true).unwrap();
		assert_eq!(parsed.chunks[0].start, 0);
		assert_eq!(parsed.chunks[1].start, 0);
		assert_eq!(parsed.total_length, 100);
	}
}
