//! Chunk-boundary discovery. A single [`Chunker`] drives three policies:
//! manual (boundaries only from explicit `end_chunk` calls), content-defined
//! (a rolling buzhash over the last `window` bytes fires a boundary when its
//! low `bitmask` bits are all zero), and split-string (every occurrence of a
//! literal byte pattern closes the chunk immediately before it). The writer
//! feeds bytes in with [`Chunker::push`] and gets back zero or more finished
//! chunk payloads; whatever is left over stays buffered until the next push
//! or an explicit [`Chunker::end_chunk`].

use crate::constants::{CHUNKER_BUZHASH_BITMASK, CHUNKER_WINDOW_SIZE, DEFAULT_CHUNK_SIZE_MAX, DEFAULT_CHUNK_SIZE_MIN};

/// 256-entry lookup table for the buzhash rolling checksum, one 32-bit
/// rotation seed per possible byte value.
const HASH_TABLE: [u32; 256] = [
    0x458be752, 0xc10748cc, 0xfbbcdbb8, 0x6ded5b68, 0xb10a82b5, 0x20d75648, 0xdfc5665f, 0xa8428801,
    0x7ebf5191, 0x841135c7, 0x65cc53b3, 0x280a597c, 0x16f60255, 0xc78cbc3e, 0x294415f5, 0xb938d494,
    0xec85c4e6, 0xb7d33edc, 0xe549b544, 0xfdeda5aa, 0x882bf287, 0x3116737c, 0x05569956, 0xe8cc1f68,
    0x0806ac5e, 0x22a14443, 0x15297e10, 0x50d090e7, 0x4ba60f6f, 0xefd9f1a7, 0x5c5c885c, 0x82482f93,
    0x9bfd7c64, 0x0b3e7276, 0xf2688e77, 0x8fad8abc, 0xb0509568, 0xf1ada29f, 0xa53efdfe, 0xcb2b1d00,
    0xf2a9e986, 0x6463432b, 0x95094051, 0x5a223ad2, 0x9be8401b, 0x61e579cb, 0x1a556a14, 0x5840fdc2,
    0x9261ddf6, 0xcde002bb, 0x52432bb0, 0xbf17373e, 0x7b7c222f, 0x2955ed16, 0x9f10ca59, 0xe840c4c9,
    0xccabd806, 0x14543f34, 0x1462417a, 0x0d4a1f9c, 0x087ed925, 0xd7f8f24c, 0x7338c425, 0xcf86c8f5,
    0xb19165cd, 0x9891c393, 0x325384ac, 0x0308459d, 0x86141d7e, 0xc922116a, 0xe2ffa6b6, 0x53f52aed,
    0x2cd86197, 0xf5b9f498, 0xbf319c8f, 0xe0411fae, 0x977eb18c, 0xd8770976, 0x9833466a, 0xc674df7f,
    0x8c297d45, 0x8ca48d26, 0xc49ed8e2, 0x7344f874, 0x556f79c7, 0x6b25eaed, 0xa03e2b42, 0xf68f66a4,
    0x8e8b09a2, 0xf2e0e62a, 0x0d3a9806, 0x9729e493, 0x8c72b0fc, 0x160b94f6, 0x450e4d3d, 0x7a320e85,
    0xbef8f0e1, 0x21d73653, 0x4e3d977a, 0x1e7b3929, 0x1cc6c719, 0xbe478d53, 0x8d752809, 0xe6d8c2c6,
    0x275f0892, 0xc8acc273, 0x4cc21580, 0xecc4a617, 0xf5f7be70, 0xe795248a, 0x375a2fe9, 0x425570b6,
    0x8898dcf8, 0xdc2d97c4, 0x0106114b, 0x364dc22f, 0x1e0cad1f, 0xbe63803c, 0x5f69fac2, 0x4d5afa6f,
    0x1bc0dfb5, 0xfb273589, 0x0ea47f7b, 0x3c1c2b50, 0x21b2a932, 0x6b1223fd, 0x2fe706a8, 0xf9bd6ce2,
    0xa268e64e, 0xe987f486, 0x3eacf563, 0x1ca2018c, 0x65e18228, 0x2207360a, 0x57cf1715, 0x34c37d2b,
    0x1f8f3cde, 0x93b657cf, 0x31a019fd, 0xe69eb729, 0x8bca7b9b, 0x4c9d5bed, 0x277ebeaf, 0xe0d8f8ae,
    0xd150821c, 0x31381871, 0xafc3f1b0, 0x927db328, 0xe95effac, 0x305a47bd, 0x426ba35b, 0x1233af3f,
    0x686a5b83, 0x50e072e5, 0xd9d3bb2a, 0x8befc475, 0x487f0de6, 0xc88dff89, 0xbd664d5e, 0x971b5d18,
    0x63b14847, 0xd7d3c1ce, 0x7f583cf3, 0x72cbcb09, 0xc0d0a81c, 0x7fa3429b, 0xe9158a1b, 0x225ea19a,
    0xd8ca9ea3, 0xc763b282, 0xbb0c6341, 0x020b8293, 0xd4cd299d, 0x58cfa7f8, 0x91b4ee53, 0x37e4d140,
    0x95ec764c, 0x30f76b06, 0x5ee68d24, 0x679c8661, 0xa41979c2, 0xf2b61284, 0x4fac1475, 0x0adb49f9,
    0x19727a23, 0x15a7e374, 0xc43a18d5, 0x3fb1aa73, 0x342fc615, 0x924c0793, 0xbee2d7f0, 0x8a279de9,
    0x4aa2d70c, 0xe24dd37f, 0xbe862c0b, 0x177c22c2, 0x5388e5ee, 0xcd8a7510, 0xf901b4fd, 0xdbc13dbc,
    0x6c0bae5b, 0x64efe8c7, 0x48b02079, 0x80331a49, 0xca3d8ae6, 0xf3546190, 0xfed7108b, 0xc49b941b,
    0x32baf4a9, 0xeb833a4a, 0x88a3f1a5, 0x3a91ce0a, 0x3cc27da1, 0x7112e684, 0x4a3096b1, 0x3794574c,
    0xa3c8b6f3, 0x1d213941, 0x6e0a2e00, 0x233479f1, 0x0f4cd82f, 0x6093edd2, 0x5d7d209e, 0x464fe319,
    0xd4dcac9e, 0x0db845cb, 0xfb5e4bc3, 0xe0256ce1, 0x09fb4ed1, 0x0914be1e, 0xa5bdb2c3, 0xc6eb57bb,
    0x30320350, 0x3f397e91, 0xa67791bc, 0x86bc0e2c, 0xefa0a7e2, 0xe9ff7543, 0xe733612c, 0xd185897b,
    0x329e5388, 0x91dd236b, 0x2ecb0d93, 0xf4d82a3d, 0x35b5c03f, 0xe4e606f0, 0x05b21843, 0x37b45964,
    0x5eff22f4, 0x6027f4cc, 0x77178b3c, 0xae507131, 0x7bf7cabc, 0xf9c18d66, 0x593ade65, 0xd95ddf11,
];

/// How a [`Chunker`] decides where one chunk ends and the next begins.
#[derive(Debug, Clone)]
pub enum ChunkingPolicy {
    /// Boundaries only ever come from an explicit `end_chunk` call.
    Manual,
    /// Rolling buzhash over a fixed window; a boundary fires when the low
    /// `bitmask` bits of the checksum are zero, bounded to `[min_size,
    /// max_size]` bytes per chunk.
    ContentDefined { window: usize, bitmask: u32, min_size: usize, max_size: usize },
    /// Every occurrence of `pattern` (after the first byte of the current
    /// chunk) closes the chunk immediately before it; the new chunk begins
    /// with the pattern.
    SplitString { pattern: Vec<u8> },
}

impl ChunkingPolicy {
    /// Content-defined chunking at the default window, bitmask, and size
    /// bounds.
    pub fn content_defined_default() -> Self {
        ChunkingPolicy::ContentDefined {
            window: CHUNKER_WINDOW_SIZE,
            bitmask: CHUNKER_BUZHASH_BITMASK,
            min_size: DEFAULT_CHUNK_SIZE_MIN,
            max_size: DEFAULT_CHUNK_SIZE_MAX,
        }
    }
}

/// A push-based chunk boundary scanner. Bytes accumulate in an internal
/// buffer; `push` returns every chunk the policy can close given what has
/// accumulated so far, leaving the remainder buffered.
#[derive(Debug, Clone)]
pub struct Chunker {
    policy: ChunkingPolicy,
    buf: Vec<u8>,
}

impl Chunker {
    /// Builds a chunker for the given policy with an empty buffer.
    pub fn new(policy: ChunkingPolicy) -> Self {
        Self { policy, buf: Vec::new() }
    }

    /// Appends bytes to the current chunk and returns every chunk the
    /// policy closed as a result, in order. Manual policy never closes a
    /// chunk here; call [`Chunker::end_chunk`] instead.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(bytes);
        match self.policy.clone() {
            ChunkingPolicy::Manual => Vec::new(),
            ChunkingPolicy::ContentDefined { window, bitmask, min_size, max_size } => {
                self.scan_content_defined(window, bitmask, min_size, max_size)
            }
            ChunkingPolicy::SplitString { pattern } => self.scan_split_string(&pattern),
        }
    }

    /// Closes whatever is currently buffered as one chunk, regardless of
    /// policy. Returns `None` if nothing is buffered (an empty chunk is
    /// elided by the caller, per the writer's `end_chunk` contract, except
    /// for an explicit dictionary chunk).
    pub fn end_chunk(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.drain(..).collect())
        }
    }

    /// Whether bytes are buffered that have not yet closed into a chunk.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    fn scan_content_defined(&mut self, window: usize, bitmask: u32, min_size: usize, max_size: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            if self.buf.len() < min_size {
                break;
            }
            let limit = self.buf.len().min(max_size);
            match find_boundary(&self.buf, window, bitmask, min_size, limit) {
                Some(cut) => out.push(self.buf.drain(..cut).collect()),
                None => {
                    if self.buf.len() >= max_size {
                        out.push(self.buf.drain(..max_size).collect());
                    } else {
                        break;
                    }
                }
            }
        }
        out
    }

    fn scan_split_string(&mut self, pattern: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        if pattern.is_empty() {
            return out;
        }
        loop {
            // search from offset 1 so a pattern occurrence that *opens* the
            // current chunk doesn't immediately re-close it
            if self.buf.len() <= 1 {
                break;
            }
            match find_subslice(&self.buf[1..], pattern) {
                Some(rel) => {
                    let cut = 1 + rel;
                    out.push(self.buf.drain(..cut).collect());
                }
                None => break,
            }
        }
        out
    }
}

/// Scans `buf[min_size..limit]` for the first position whose trailing
/// `window`-byte checksum has its low `bitmask` bits all zero, returning the
/// chunk length (exclusive of the triggering byte, matching the reference
/// chunker's boundary convention). `limit` bounds how much of `buf` is
/// considered, letting the caller cap chunk size even before the buzhash
/// finds a hit.
fn find_boundary(buf: &[u8], window: usize, bitmask: u32, min_size: usize, limit: usize) -> Option<usize> {
    if limit <= min_size {
        return None;
    }
    let (first_window_start, first_window_end) = if min_size > window {
        (min_size - window, min_size)
    } else {
        (0, window.min(limit))
    };
    if first_window_end > limit || first_window_end < first_window_start {
        return None;
    }

    let mut win: Vec<u8> = buf[first_window_start..first_window_end].to_vec();
    let mut checksum: u32 = 0;
    for (i, b) in win.iter().enumerate() {
        checksum ^= HASH_TABLE[*b as usize].rotate_left((window - i - 1) as u32);
    }

    let mut idx = 0usize;
    for i in min_size..limit {
        let b = buf[i];
        let out = win[idx];
        win[idx] = b;
        idx = (idx + 1) % window;
        checksum = checksum.rotate_left(1) ^ HASH_TABLE[out as usize].rotate_left(window as u32) ^ HASH_TABLE[b as usize];
        if checksum & bitmask == 0 {
            return Some(i);
        }
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_policy_never_closes_on_push() {
        let mut chunker = Chunker::new(ChunkingPolicy::Manual);
        let closed = chunker.push(b"some bytes of arbitrary content");
        assert!(closed.is_empty());
        assert!(chunker.has_pending());
        let closed = chunker.end_chunk().unwrap();
        assert_eq!(closed, b"some bytes of arbitrary content");
        assert!(chunker.end_chunk().is_none());
    }

    #[test]
    fn content_defined_round_trips_full_input() {
        let mut chunker = Chunker::new(ChunkingPolicy::content_defined_default());
        let input: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        let mut closed = chunker.push(&input);
        if let Some(tail) = chunker.end_chunk() {
            closed.push(tail);
        }
        let total: Vec<u8> = closed.into_iter().flatten().collect();
        assert_eq!(total, input);
    }

    #[test]
    fn content_defined_never_exceeds_max_size() {
        let policy = ChunkingPolicy::ContentDefined { window: 48, bitmask: u32::MAX, min_size: 16, max_size: 256 };
        let mut chunker = Chunker::new(policy);
        let input = vec![7u8; 10_000];
        let mut closed = chunker.push(&input);
        if let Some(tail) = chunker.end_chunk() {
            closed.push(tail);
        }
        for chunk in &closed[..closed.len() - 1] {
            assert_eq!(chunk.len(), 256);
        }
        let total: usize = closed.iter().map(|c| c.len()).sum();
        assert_eq!(total, input.len());
    }

    #[test]
    fn content_defined_is_deterministic_across_push_granularity() {
        let input: Vec<u8> = (0..50_000u32).map(|i| ((i * 31) % 211) as u8).collect();

        let mut whole = Chunker::new(ChunkingPolicy::content_defined_default());
        let mut whole_chunks = whole.push(&input);
        if let Some(tail) = whole.end_chunk() {
            whole_chunks.push(tail);
        }

        let mut byte_at_a_time = Chunker::new(ChunkingPolicy::content_defined_default());
        let mut piecewise_chunks = Vec::new();
        for byte in &input {
            piecewise_chunks.extend(byte_at_a_time.push(std::slice::from_ref(byte)));
        }
        if let Some(tail) = byte_at_a_time.end_chunk() {
            piecewise_chunks.push(tail);
        }

        assert_eq!(whole_chunks, piecewise_chunks);
    }

    #[test]
    fn split_string_cuts_before_each_pattern_occurrence() {
        let mut chunker = Chunker::new(ChunkingPolicy::SplitString { pattern: b"--BOUNDARY--".to_vec() });
        let input = b"first part--BOUNDARY--second part--BOUNDARY--third part".to_vec();
        let mut closed = chunker.push(&input);
        if let Some(tail) = chunker.end_chunk() {
            closed.push(tail);
        }
        assert_eq!(closed.len(), 3);
        assert_eq!(closed[0], b"first part");
        assert_eq!(closed[1], b"--BOUNDARY--second part");
        assert_eq!(closed[2], b"--BOUNDARY--third part");
    }

    #[test]
    fn empty_buffer_end_chunk_is_none() {
        let mut chunker = Chunker::new(ChunkingPolicy::Manual);
        assert!(chunker.end_chunk().is_none());
    }
}
