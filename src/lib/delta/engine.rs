//! Diffs a target header against a donor or a partially populated local
//! file, copies matching chunks by digest, plans byte ranges for whatever
//! is still missing, and places incoming bytes (raw or, via
//! [`super::multipart`], multipart) back into the output at the right
//! offset.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::chunk::{ChunkState, Index};
use crate::codec::{Codec, CodecKind};
use crate::digest::{self, DigestKind};
use crate::format::Header;
use crate::Result;

use super::range::{self, RangeSet};

#[cfg(feature = "log")]
use log::debug;

/// Drives one delta/resume pull against a single target. Owns a working
/// copy of the target's index so chunk states can be updated independently
/// of whatever `Reader` parsed the original header.
pub struct DeltaEngine {
    index: Index,
    chunk_hash_kind: DigestKind,
    comp_kind: CodecKind,
}

impl DeltaEngine {
    /// Starts a delta session against `target_header`. Every chunk begins
    /// `Missing` except the dictionary chunk, which the header never needs
    /// to fetch over the wire.
    pub fn new(target_header: &Header) -> Self {
        let mut index = target_header.index.clone();
        if index.has_dictionary() {
            if let Some(chunk) = index.chunks.get_mut(0) {
                chunk.valid = ChunkState::Valid;
            }
        }
        Self { index, chunk_hash_kind: target_header.index.chunk_hash_kind, comp_kind: target_header.preface.comp_kind }
    }

    /// The working index, reflecting every chunk state update so far.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Count of chunks not yet confirmed present.
    pub fn missing_count(&self) -> usize {
        self.index.chunks.iter().filter(|c| c.valid != ChunkState::Valid).count()
    }

    /// For each target chunk not yet valid, looks it up by digest in
    /// `donor_index`; on a hit, copies the donor's compressed bytes into
    /// `output` at the chunk's offset and rehashes to confirm before
    /// marking it valid. A digest hit with mismatched uncompressed length,
    /// or a rehash failure, is treated as a miss and left for
    /// `plan_ranges`.
    pub fn copy_chunks<D: Read + Seek, O: Write + Seek>(
        &mut self,
        donor_index: &Index,
        donor: &mut D,
        donor_payload_start: u64,
        output: &mut O,
        output_payload_start: u64,
    ) -> Result<usize> {
        let target_offsets = self.index.compressed_offsets();
        let donor_offsets = donor_index.compressed_offsets();
        let codec = Codec::new(self.comp_kind);
        let mut copied = 0;

        for position in 0..self.index.chunks.len() {
            if self.index.chunks[position].valid == ChunkState::Valid {
                continue;
            }
            let digest_bytes = self.index.chunks[position].digest.clone();
            let Some(donor_position) = donor_index.position_of(&digest_bytes) else { continue };
            let donor_chunk = &donor_index.chunks[donor_position];
            if donor_chunk.length != self.index.chunks[position].length {
                continue;
            }

            let (d_start, d_end) = donor_offsets[donor_position];
            donor.seek(SeekFrom::Start(donor_payload_start + d_start))?;
            let mut buf = vec![0u8; (d_end - d_start) as usize];
            donor.read_exact(&mut buf)?;

            let expected_len = self.index.chunks[position].length as usize;
            let plain = match codec.decompress_chunk(&buf, expected_len) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if digest::digest(self.chunk_hash_kind, &plain) != digest_bytes {
                continue;
            }

            let (t_start, _t_end) = target_offsets[position];
            output.seek(SeekFrom::Start(output_payload_start + t_start))?;
            output.write_all(&buf)?;

            self.index.chunks[position].valid = ChunkState::Valid;
            copied += 1;
        }

        Ok(copied)
    }

    /// Identical to [`DeltaEngine::copy_chunks`], but scans `local` (e.g. a
    /// previous partial download) as its own donor.
    pub fn copy_chunks_self<L: Read + Seek, O: Write + Seek>(
        &mut self,
        local_index: &Index,
        local: &mut L,
        local_payload_start: u64,
        output: &mut O,
        output_payload_start: u64,
    ) -> Result<usize> {
        self.copy_chunks(local_index, local, local_payload_start, output, output_payload_start)
    }

    /// Groups the compressed-byte ranges of every chunk still missing into
    /// the fewest merged intervals, then splits those into request batches
    /// of at most `max_ranges_per_request` entries.
    pub fn plan_ranges(&self, max_ranges_per_request: usize) -> Vec<RangeSet> {
        let offsets = self.index.compressed_offsets();
        let missing: RangeSet = self
            .index
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, chunk)| chunk.valid != ChunkState::Valid)
            .map(|(position, _)| offsets[position])
            .collect();
        let merged = range::coalesce_adjacent(missing);
        let batches = range::batch(&merged, max_ranges_per_request);
        #[cfg(feature = "log")]
        debug!("planned {} range request(s) covering {} missing chunk(s)", batches.len(), self.missing_count());
        batches
    }

    /// [`DeltaEngine::plan_ranges`] at [`crate::constants::DEFAULT_MAX_RANGES_PER_REQUEST`].
    pub fn plan_ranges_default(&self) -> Vec<RangeSet> {
        self.plan_ranges(crate::constants::DEFAULT_MAX_RANGES_PER_REQUEST)
    }

    /// Writes `bytes` (the payload for `current_range`) into `output` at
    /// the matching offset, then rechecks every not-yet-valid chunk whose
    /// full compressed span now lies within the bytes written so far.
    /// A verified chunk is marked valid; a mismatch zeros that chunk's
    /// region in `output` and leaves it missing for the next
    /// `plan_ranges` call.
    pub fn accept_bytes<O: Read + Write + Seek>(
        &mut self,
        output: &mut O,
        output_payload_start: u64,
        current_range: (u64, u64),
        bytes: &[u8],
    ) -> Result<()> {
        output.seek(SeekFrom::Start(output_payload_start + current_range.0))?;
        output.write_all(bytes)?;

        let offsets = self.index.compressed_offsets();
        let codec = Codec::new(self.comp_kind);

        for position in 0..self.index.chunks.len() {
            if self.index.chunks[position].valid == ChunkState::Valid {
                continue;
            }
            let (start, end) = offsets[position];
            if end > current_range.1 {
                continue;
            }

            let len = (end - start) as usize;
            let mut buf = vec![0u8; len];
            output.seek(SeekFrom::Start(output_payload_start + start))?;
            output.read_exact(&mut buf)?;

            let expected_len = self.index.chunks[position].length as usize;
            let matches = codec
                .decompress_chunk(&buf, expected_len)
                .map(|plain| digest::digest(self.chunk_hash_kind, &plain) == self.index.chunks[position].digest)
                .unwrap_or(false);

            if matches {
                self.index.chunks[position].valid = ChunkState::Valid;
            } else {
                output.seek(SeekFrom::Start(output_payload_start + start))?;
                output.write_all(&vec![0u8; len])?;
                self.index.chunks[position].valid = ChunkState::Missing;
            }
        }

        Ok(())
    }
}
