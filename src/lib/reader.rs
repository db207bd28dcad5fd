//! The read pipeline: parses the header, drives per-chunk decompression,
//! and verifies both per-chunk and whole-file digests as bytes are
//! consumed.

use std::io::{Read, Seek, SeekFrom};

use crate::chunk::ChunkState;
use crate::constants::{ERROR_CHUNK_DIGEST_MISMATCH, ERROR_FULL_DATA_DIGEST_MISMATCH};
use crate::digest::{self, Hasher};
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::format::Header;
use crate::Result;

#[cfg(feature = "log")]
use log::{debug, warn};

/// A read context over a fully buffered header and a seekable payload
/// source. `open` expects the whole file (or at least the whole header
/// region) up front; the delta engine uses [`crate::format::HeaderParser`]
/// directly when it needs to fetch the header incrementally.
pub struct Reader<R: Read + Seek> {
    source: R,
    header: Header,
    payload_start: u64,
    /// Index of the next chunk `read` will return bytes from.
    next_chunk: usize,
    /// Byte offset within the current chunk's *uncompressed* payload.
    offset_in_chunk: usize,
    current_chunk_plain: Option<Vec<u8>>,
    full_hasher: Option<Hasher>,
    /// Set once a dictionary chunk has been loaded; carries the dictionary
    /// bytes so every subsequent chunk decompresses against it.
    codec_override: Option<crate::codec::Codec>,
    poison: Option<ZchunkError>,
}

impl<R: Read + Seek> Reader<R> {
    /// Parses the header from the front of `source`, loads the dictionary
    /// chunk if present, and arms the running full-data digest.
    pub fn open(mut source: R) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let mut header_bytes = Vec::new();
        source.read_to_end(&mut header_bytes)?;
        let (header, header_len) = Header::parse_complete(&header_bytes)?;
        let payload_start = header_len as u64;

        let full_hash_kind = header.lead.full_hash_kind;
        let mut reader = Self {
            source,
            header,
            payload_start,
            next_chunk: 0,
            offset_in_chunk: 0,
            current_chunk_plain: None,
            full_hasher: Some(Hasher::new(full_hash_kind)),
            codec_override: None,
            poison: None,
        };

        if reader.header.index.has_dictionary() {
            reader.load_dictionary_chunk()?;
            reader.next_chunk = 1;
        }
        Ok(reader)
    }

    fn load_dictionary_chunk(&mut self) -> Result<()> {
        let compressed = self.read_chunk_compressed_bytes(0)?;
        let dict_chunk = &self.header.index.chunks[0];
        let codec = self.codec();
        let plain = codec.decompress_chunk(&compressed, dict_chunk.length as usize)?;
        // dictionary chunk's own digest is still checked, same as any other chunk
        let digest = digest::digest(self.header.index.chunk_hash_kind, &plain);
        if digest != dict_chunk.digest {
            return Err(ZchunkError::new(ZchunkErrorKind::Integrity, ERROR_CHUNK_DIGEST_MISMATCH));
        }
        let mut codec_with_dict = codec;
        codec_with_dict.set_dictionary(plain);
        self.codec_override = Some(codec_with_dict);
        Ok(())
    }

    fn codec(&self) -> crate::codec::Codec {
        self.codec_override.clone().unwrap_or_else(|| crate::codec::Codec::new(self.header.preface.comp_kind))
    }

    fn read_chunk_compressed_bytes(&mut self, position: usize) -> Result<Vec<u8>> {
        let offsets = self.header.index.compressed_offsets();
        let (start, end) = offsets[position];
        self.source.seek(SeekFrom::Start(self.payload_start + start))?;
        let mut buf = vec![0u8; (end - start) as usize];
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Returns the next bytes of the logical uncompressed stream, up to
    /// `buf.len()`. Returns `0` at end of stream. On crossing a chunk
    /// boundary the per-chunk digest is finalized and compared to the
    /// stored digest; a mismatch marks the chunk `Failed` and propagates an
    /// `Integrity` error.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_poison()?;
        if self.current_chunk_plain.is_none() {
            match self.advance_chunk()? {
                Some(()) => {}
                None => return Ok(0),
            }
        }

        let plain = self.current_chunk_plain.as_ref().unwrap();
        let remaining = &plain[self.offset_in_chunk..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.offset_in_chunk += n;
        if self.offset_in_chunk >= plain.len() {
            self.current_chunk_plain = None;
            self.offset_in_chunk = 0;
        }
        Ok(n)
    }

    fn advance_chunk(&mut self) -> Result<Option<()>> {
        if self.next_chunk >= self.header.index.chunks.len() {
            return Ok(None);
        }
        let position = self.next_chunk;
        self.next_chunk += 1;

        let compressed = match self.read_chunk_compressed_bytes(position) {
            Ok(c) => c,
            Err(e) => return self.poison_and_return(e),
        };
        let expected_len = self.header.index.chunks[position].length as usize;
        let codec = self.codec();
        let plain = match codec.decompress_chunk(&compressed, expected_len) {
            Ok(p) => p,
            Err(e) => return self.poison_and_return(e),
        };

        let digest = digest::digest(self.header.index.chunk_hash_kind, &plain);
        if digest != self.header.index.chunks[position].digest {
            self.header.index.chunks[position].valid = ChunkState::Failed;
            #[cfg(feature = "log")]
            warn!("chunk {position} failed digest verification, poisoning reader");
            let err = ZchunkError::new(ZchunkErrorKind::Integrity, ERROR_CHUNK_DIGEST_MISMATCH);
            return self.poison_and_return(err);
        }
        self.header.index.chunks[position].valid = ChunkState::Valid;
        if let Some(hasher) = self.full_hasher.as_mut() {
            hasher.update(&plain);
        }
        self.current_chunk_plain = Some(plain);
        self.offset_in_chunk = 0;
        Ok(Some(()))
    }

    /// After full consumption, compares the running full-data digest to the
    /// stored value. Mismatch is fatal.
    pub fn validate_data_digest(&mut self) -> Result<()> {
        self.check_poison()?;
        let hasher = self.full_hasher.take().expect("validate_data_digest called more than once");
        let computed = hasher.finalize();
        if computed != self.header.preface.full_data_digest {
            let err = ZchunkError::new(ZchunkErrorKind::Integrity, ERROR_FULL_DATA_DIGEST_MISMATCH);
            return self.poison_and_return(err);
        }
        Ok(())
    }

    /// Scans every chunk independently, recomputing each digest without
    /// disturbing the sequential `read` cursor. Used by inspection tools.
    pub fn validate_checksums(&mut self) -> Result<()> {
        self.check_poison()?;
        let start = if self.header.index.has_dictionary() { 1 } else { 0 };
        for position in start..self.header.index.chunks.len() {
            let compressed = self.read_chunk_compressed_bytes(position)?;
            let expected_len = self.header.index.chunks[position].length as usize;
            let codec = self.codec();
            let plain = codec.decompress_chunk(&compressed, expected_len)?;
            let digest = digest::digest(self.header.index.chunk_hash_kind, &plain);
            if digest != self.header.index.chunks[position].digest {
                self.header.index.chunks[position].valid = ChunkState::Failed;
                return Err(ZchunkError::new(ZchunkErrorKind::Integrity, ERROR_CHUNK_DIGEST_MISMATCH));
            }
            self.header.index.chunks[position].valid = ChunkState::Valid;
        }
        Ok(())
    }

    /// Given a partially populated local file at `local`, recomputes each
    /// chunk's digest at its declared offset and marks matches as `Valid`,
    /// the rest as `Missing`. Returns `-1` on I/O error reading the local
    /// file itself (as opposed to a chunk whose bytes just don't match), `0`
    /// when at least one chunk still needs fetching, `1` when every chunk is
    /// already valid.
    pub fn find_valid_chunks<L: Read + Seek>(&mut self, local: &mut L) -> i32 {
        let mut any_valid = false;
        let mut all_valid = true;
        let offsets = self.header.index.compressed_offsets();
        let start = if self.header.index.has_dictionary() { 1 } else { 0 };

        for position in start..self.header.index.chunks.len() {
            let (range_start, range_end) = offsets[position];
            let len = (range_end - range_start) as usize;
            let mut buf = vec![0u8; len];
            let read_result =
                local.seek(SeekFrom::Start(self.payload_start + range_start)).and_then(|_| local.read_exact(&mut buf));
            if read_result.is_err() {
                return -1;
            }

            let expected_len = self.header.index.chunks[position].length as usize;
            let codec = self.codec();
            let matches = codec
                .decompress_chunk(&buf, expected_len)
                .map(|plain| digest::digest(self.header.index.chunk_hash_kind, &plain) == self.header.index.chunks[position].digest)
                .unwrap_or(false);

            if matches {
                self.header.index.chunks[position].valid = ChunkState::Valid;
                any_valid = true;
            } else {
                self.header.index.chunks[position].valid = ChunkState::Missing;
                all_valid = false;
            }
        }

        if all_valid {
            1
        } else {
            #[cfg(feature = "log")]
            debug!("chunk scan: {} already valid, resume still needed", if any_valid { "some chunks" } else { "no chunks" });
            0
        }
    }

    /// The parsed header, for inspection (e.g. by the delta engine).
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The payload region's start offset, i.e. the header's total size.
    pub fn payload_start(&self) -> u64 {
        self.payload_start
    }

    fn check_poison(&self) -> Result<()> {
        match &self.poison {
            Some(e) => Err(e.latch()),
            None => Ok(()),
        }
    }

    fn poison_and_return<T>(&mut self, err: ZchunkError) -> Result<T> {
        self.poison = Some(err.latch());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;
    use std::io::Cursor;

    #[test]
    fn read_round_trips_plain_bytes() {
        let mut writer = Writer::new(Vec::new());
        writer.write(b"the quick brown fox").unwrap();
        writer.end_chunk().unwrap();
        let bytes = writer.close().unwrap();

        let mut reader = Reader::open(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"the quick brown fox");
        reader.validate_data_digest().unwrap();
    }

    #[test]
    fn tampered_chunk_fails_digest_check() {
        let mut writer = Writer::new(Vec::new());
        writer.write(b"tamper me please").unwrap();
        writer.end_chunk().unwrap();
        let mut bytes = writer.close().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        // Tampering the very last byte of the file corrupts the compressed
        // payload, not the header, so `open` succeeds and a later `read`
        // must surface an integrity error rather than silently truncating.
        let mut reader = Reader::open(Cursor::new(bytes)).unwrap();
        let mut buf = [0u8; 64];
        let mut saw_error = false;
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(_) => {
                    saw_error = true;
                    break;
                }
            }
        }
        assert!(saw_error, "tampered chunk must be rejected, not silently accepted");
    }
}
