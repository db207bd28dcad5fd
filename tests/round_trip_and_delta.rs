use std::io::Cursor;

use zchunk::chunk::ChunkState;
use zchunk::delta::DeltaEngine;
use zchunk::format::Header;
use zchunk::transport::RangesSupport;
use zchunk::writer::{Writer, WriterOptions};
use zchunk::{Reader, ZchunkErrorKind};

fn build(chunks: &[&[u8]]) -> Vec<u8> {
    let mut options = WriterOptions::default();
    options.manual_chunking = true;
    let mut writer = Writer::with_options(Vec::new(), options);
    for chunk in chunks {
        writer.write(chunk).unwrap();
        writer.end_chunk().unwrap();
    }
    writer.close().unwrap()
}

#[test]
fn empty_file_closes_and_reads_back_zero_bytes() {
    let writer = Writer::new(Vec::new());
    let bytes = writer.close().unwrap();

    let mut reader = Reader::open(Cursor::new(bytes)).unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(reader.read(&mut buf).unwrap(), 0);
    reader.validate_data_digest().unwrap();
}

#[test]
fn two_independent_writes_of_the_same_input_are_byte_identical() {
    let a = build(&[b"same content", b"across both", b"runs"]);
    let b = build(&[b"same content", b"across both", b"runs"]);
    assert_eq!(a, b);
}

#[test]
fn concatenated_compressed_chunks_equal_the_payload_region() {
    let bytes = build(&[b"alpha", b"beta", b"gamma"]);
    let (header, payload_start) = Header::parse_complete(&bytes).unwrap();

    let total_comp_length: u64 = header.index.chunks.iter().map(|c| c.comp_length).sum();
    assert_eq!(bytes.len() - payload_start, total_comp_length as usize);

    let offsets = header.index.compressed_offsets();
    assert_eq!(offsets.first().unwrap().0, 0);
    assert_eq!(offsets.last().unwrap().1, total_comp_length);
}

#[test]
fn split_string_chunking_produces_the_documented_three_parts() {
    let mut options = WriterOptions::default();
    options.chunking_policy = Some(zchunk::chunker::ChunkingPolicy::SplitString { pattern: b"<BOUNDARY>".to_vec() });
    let mut writer = Writer::with_options(Vec::new(), options);
    writer.write(b"A<BOUNDARY>B<BOUNDARY>C").unwrap();
    writer.end_chunk().unwrap();
    let bytes = writer.close().unwrap();

    let (header, payload_start) = Header::parse_complete(&bytes).unwrap();
    assert_eq!(header.index.chunks.len(), 3);

    let mut reader = Reader::open(Cursor::new(bytes.clone())).unwrap();
    let mut out = Vec::new();
    let mut buf = [0u8; 64];
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, b"A<BOUNDARY>B<BOUNDARY>C");
    let _ = payload_start;
}

#[test]
fn delta_with_one_divergent_chunk_leaves_exactly_that_chunk_missing() {
    let target_bytes = build(&[b"c0", b"c1", b"c2", b"c3"]);
    let donor_bytes = build(&[b"c0", b"c1", b"c3"]);

    let (target_header, _) = Header::parse_complete(&target_bytes).unwrap();
    let (donor_header, donor_payload_start) = Header::parse_complete(&donor_bytes).unwrap();

    let mut engine = DeltaEngine::new(&target_header);
    let mut donor_cursor = Cursor::new(donor_bytes);
    let mut output = Cursor::new(vec![0u8; target_bytes.len()]);

    engine.copy_chunks(&donor_header.index, &mut donor_cursor, donor_payload_start as u64, &mut output, 0).unwrap();

    assert_eq!(engine.missing_count(), 1);
    let missing_position = engine.index().chunks.iter().position(|c| c.valid != ChunkState::Valid).unwrap();
    assert_eq!(missing_position, 2);

    let batches = engine.plan_ranges_default();
    let offsets = engine.index().compressed_offsets();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0], vec![offsets[2]]);
}

#[test]
fn range_unsupported_status_surfaces_a_transport_error_without_touching_flushed_bytes() {
    let mut output = vec![1u8, 2, 3];
    let flushed_before = output.clone();

    let err = RangesSupport::Unsupported.require_supported().unwrap_err();
    assert_eq!(err.kind(), ZchunkErrorKind::Transport);
    // the core never touches the output on this path; only the host's own
    // retry/abort logic decides what happens to bytes already flushed.
    assert_eq!(output, flushed_before);
    output.clear();
}

#[test]
fn tampered_preface_byte_fails_to_open_with_no_chunk_read() {
    let bytes = build(&[b"hello", b"world"]);
    let (header, _payload_start) = Header::parse_complete(&bytes).unwrap();
    let lead_len = header.lead.encoded_len();

    let mut tampered = bytes.clone();
    // flip a byte inside the preface region, just past the Lead.
    tampered[lead_len] ^= 0xff;

    let err = Reader::open(Cursor::new(tampered)).unwrap_err();
    assert_eq!(err.kind(), ZchunkErrorKind::Decode);
}
