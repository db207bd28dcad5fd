//! The write pipeline: buffers bytes, discovers chunk boundaries, compresses
//! each closed chunk, stages it, and on `close` seals a header over the
//! finished index.

use std::io::Write;

use crate::chunk::{Chunk, ChunkState, Index};
use crate::chunker::{Chunker, ChunkingPolicy};
use crate::codec::{Codec, CodecKind};
use crate::constants::{ERROR_WRITER_CONFIGURE_AFTER_WRITE, PREFACE_FLAG_HAS_DICTIONARY, PREFACE_FLAG_HAS_UNCOMPRESSED_CHECKSUMS};
use crate::digest::{DigestKind, Hasher};
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::format::{Header, Signatures};
use crate::Result;

/// Options a caller sets with [`Writer::configure`] before the first byte
/// is written.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub full_hash_kind: DigestKind,
    pub chunk_hash_kind: DigestKind,
    pub codec: CodecKind,
    pub zstd_level: i32,
    pub manual_chunking: bool,
    pub uncompressed_checksum: bool,
    /// Used only when `manual_chunking` is false. `None` falls back to
    /// content-defined chunking at the default window/bitmask/size bounds.
    pub chunking_policy: Option<ChunkingPolicy>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            full_hash_kind: DigestKind::Sha256,
            chunk_hash_kind: DigestKind::Sha1,
            codec: CodecKind::Zstd,
            zstd_level: crate::constants::DEFAULT_ZSTD_LEVEL,
            manual_chunking: false,
            uncompressed_checksum: false,
            chunking_policy: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Configuring,
    Writing,
    Closed,
}

/// A write context. Generic over the output sink so callers can target a
/// file, an in-memory buffer, or any other `Write`.
pub struct Writer<W: Write> {
    output: W,
    options: WriterOptions,
    state: WriterState,
    codec: Codec,
    chunker: Chunker,
    index: Index,
    scratch: Vec<u8>,
    full_hasher: Hasher,
    uncompressed_offset: u64,
    has_dictionary: bool,
    poison: Option<ZchunkError>,
}

impl<W: Write> Writer<W> {
    /// Opens a writer with default options (SHA-256 full-hash, SHA-1
    /// chunk-hash, Zstd at level 9, content-defined chunking, no dictionary,
    /// no uncompressed checksums).
    pub fn new(output: W) -> Self {
        let options = WriterOptions::default();
        Self::with_options(output, options)
    }

    /// Opens a writer with explicit options.
    pub fn with_options(output: W, options: WriterOptions) -> Self {
        let codec = {
            let mut c = Codec::new(options.codec);
            c.set_level(options.zstd_level);
            c
        };
        let policy = if options.manual_chunking {
            ChunkingPolicy::Manual
        } else {
            options.chunking_policy.clone().unwrap_or_else(ChunkingPolicy::content_defined_default)
        };
        Self {
            full_hasher: Hasher::new(options.full_hash_kind),
            index: Index::new(options.chunk_hash_kind),
            codec,
            chunker: Chunker::new(policy),
            output,
            options,
            state: WriterState::Configuring,
            scratch: Vec::new(),
            uncompressed_offset: 0,
            has_dictionary: false,
            poison: None,
        }
    }

    /// Replaces the active options. Only legal before the first byte is
    /// written; calling it afterward is a `Config` error.
    pub fn configure(&mut self, options: WriterOptions) -> Result<()> {
        self.check_poison()?;
        if self.state != WriterState::Configuring {
            return self.poison_and_return(ZchunkError::new(ZchunkErrorKind::Config, ERROR_WRITER_CONFIGURE_AFTER_WRITE));
        }
        let mut codec = Codec::new(options.codec);
        codec.set_level(options.zstd_level);
        let policy = if options.manual_chunking {
            ChunkingPolicy::Manual
        } else {
            options.chunking_policy.clone().unwrap_or_else(ChunkingPolicy::content_defined_default)
        };
        self.full_hasher = Hasher::new(options.full_hash_kind);
        self.index = Index::new(options.chunk_hash_kind);
        self.codec = codec;
        self.chunker = Chunker::new(policy);
        self.options = options;
        Ok(())
    }

    /// Stages the dictionary as chunk 0. Must be called before any
    /// `write`/`end_chunk` call; subsequent chunks compress referencing it.
    pub fn set_dictionary(&mut self, dictionary: Vec<u8>) -> Result<()> {
        self.check_poison()?;
        if self.state != WriterState::Configuring {
            return self.poison_and_return(ZchunkError::new(
                ZchunkErrorKind::Config,
                "set_dictionary() must be called before the first write",
            ));
        }
        let compressed = match self.codec.compress_chunk(&dictionary) {
            Ok(c) => c,
            Err(e) => return self.poison_and_return(e),
        };
        let digest = crate::digest::digest(self.options.chunk_hash_kind, &dictionary);
        let mut chunk = Chunk::new(digest, compressed.len() as u64, dictionary.len() as u64, 0);
        chunk.valid = ChunkState::Valid;
        self.index.set_dictionary_present(true);
        self.index.push(chunk);
        self.scratch.extend_from_slice(&compressed);
        self.codec.set_dictionary(dictionary);
        self.has_dictionary = true;
        self.state = WriterState::Writing;
        Ok(())
    }

    /// Appends bytes to the current chunk. Triggers compression only when
    /// the chunking policy (or an explicit `end_chunk`) closes a boundary.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_poison()?;
        self.state = WriterState::Writing;
        let closed = self.chunker.push(bytes);
        for chunk_bytes in closed {
            if let Err(e) = self.finalize_chunk(chunk_bytes) {
                return self.poison_and_return(e);
            }
        }
        Ok(())
    }

    /// Finalizes the current chunk. An empty chunk is elided (it is never
    /// staged), except the dictionary chunk, which `set_dictionary` stages
    /// directly.
    pub fn end_chunk(&mut self) -> Result<()> {
        self.check_poison()?;
        if let Some(chunk_bytes) = self.chunker.end_chunk() {
            if let Err(e) = self.finalize_chunk(chunk_bytes) {
                return self.poison_and_return(e);
            }
        }
        Ok(())
    }

    fn finalize_chunk(&mut self, raw: Vec<u8>) -> Result<()> {
        if raw.is_empty() {
            return Ok(());
        }
        let digest = crate::digest::digest(self.options.chunk_hash_kind, &raw);
        let compressed = self.codec.compress_chunk(&raw)?;
        let mut chunk = Chunk::new(digest, compressed.len() as u64, raw.len() as u64, self.uncompressed_offset);
        chunk.valid = ChunkState::Valid;
        self.uncompressed_offset += raw.len() as u64;
        self.full_hasher.update(&raw);
        if self.options.uncompressed_checksum {
            chunk.uncomp_digest = Some(crate::digest::digest(self.options.full_hash_kind, &raw));
        }
        self.index.push(chunk);
        self.scratch.extend_from_slice(&compressed);
        Ok(())
    }

    /// Flushes any open chunk, computes the full-data digest, seals the
    /// header, and emits header followed by staged chunk bytes. After
    /// `close`, the writer is immutable except for inspection via
    /// [`Writer::index`].
    pub fn close(mut self) -> Result<W> {
        self.check_poison()?;
        if let Some(chunk_bytes) = self.chunker.end_chunk() {
            if let Err(e) = self.finalize_chunk(chunk_bytes) {
                return self.poison_and_return(e);
            }
        }

        let mut flags = 0u64;
        if self.options.uncompressed_checksum {
            flags |= PREFACE_FLAG_HAS_UNCOMPRESSED_CHECKSUMS;
        }
        if self.has_dictionary {
            flags |= PREFACE_FLAG_HAS_DICTIONARY;
        }

        let full_hasher = Hasher::new(self.options.full_hash_kind);
        let full_data_digest = std::mem::replace(&mut self.full_hasher, full_hasher).finalize();

        let header_bytes = Header::seal(
            self.options.full_hash_kind,
            flags,
            self.options.codec,
            full_data_digest,
            &self.index,
            &Signatures::empty(),
        );

        self.output.write_all(&header_bytes).map_err(ZchunkError::from)?;
        self.output.write_all(&self.scratch).map_err(ZchunkError::from)?;
        self.state = WriterState::Closed;
        Ok(self.output)
    }

    /// The index built so far; reflects only chunks already closed.
    pub fn index(&self) -> &Index {
        &self.index
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
