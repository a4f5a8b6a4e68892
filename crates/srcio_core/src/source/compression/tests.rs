use srcio_testkit::{ByteWriter, LZMA_DICT_SIZE, lzma_envelope, lzma_envelope_declaring, lzma_raw_stream, pattern_bytes};

use crate::source::SourceError;
use crate::source::compression::{LzmaHeader, MAX_DECOMPRESSED_BYTES, decompress_lump, is_lzma};

fn envelope_from_payload(declared: u32, payload: &[u8]) -> Vec<u8> {
	let mut w = ByteWriter::new();
	w.bytes(b"LZMA").u32(declared).u32(payload.len() as u32).u8(0x5d).u32(LZMA_DICT_SIZE).bytes(payload);
	w.finish()
}

#[test]
fn parses_envelope_properties() {
	let bytes = lzma_envelope(&pattern_bytes(64));
	assert!(is_lzma(&bytes));
	let header = LzmaHeader::parse(&bytes).expect("header");
	assert_eq!(header.actual_size, 64);
	assert_eq!(header.lc_lp_pb(), (3, 0, 2));
	assert_eq!(header.dict_size(), LZMA_DICT_SIZE);
}

#[test]
fn decompresses_to_declared_size() {
	let raw = pattern_bytes(1024);
	let bytes = lzma_envelope(&raw);
	let out = decompress_lump(2, &bytes, MAX_DECOMPRESSED_BYTES).expect("decompress");
	assert_eq!(out.len(), 1024);
	assert_eq!(out, raw);
}

#[test]
fn concatenated_streams_are_joined() {
	let first = pattern_bytes(300);
	let second = vec![7_u8; 200];
	let mut payload = lzma_raw_stream(&first);
	payload.extend_from_slice(&lzma_raw_stream(&second));

	let bytes = envelope_from_payload(500, &payload);
	let out = decompress_lump(9, &bytes, MAX_DECOMPRESSED_BYTES).expect("decompress");
	assert_eq!(&out[..300], first.as_slice());
	assert_eq!(&out[300..], second.as_slice());
}

#[test]
fn garbage_after_first_stream_is_ignored() {
	let raw = pattern_bytes(256);
	let mut payload = lzma_raw_stream(&raw);
	payload.extend_from_slice(&[0xFF; 16]);

	let bytes = envelope_from_payload(256, &payload);
	let out = decompress_lump(9, &bytes, MAX_DECOMPRESSED_BYTES).expect("decompress");
	assert_eq!(out, raw);
}

#[test]
fn output_is_capped_at_declared_size() {
	let raw = pattern_bytes(512);
	let bytes = lzma_envelope_declaring(&raw, 100);
	let out = decompress_lump(4, &bytes, MAX_DECOMPRESSED_BYTES).expect("decompress");
	assert_eq!(out, raw[..100].to_vec());
}

#[test]
fn short_output_is_a_failure() {
	let raw = pattern_bytes(128);
	let bytes = lzma_envelope_declaring(&raw, 4096);
	let err = decompress_lump(4, &bytes, MAX_DECOMPRESSED_BYTES).expect_err("too short");
	assert!(matches!(err, SourceError::DecompressionFailure { lump: 4, .. }));
}

#[test]
fn truncated_payload_is_a_failure() {
	let bytes = lzma_envelope(&pattern_bytes(1024));
	let err = decompress_lump(5, &bytes[..bytes.len() - 3], MAX_DECOMPRESSED_BYTES).expect_err("truncated");
	match err {
		SourceError::DecompressionFailure { lump, reason } => {
			assert_eq!(lump, 5);
			assert!(reason.contains("truncated"), "{reason}");
		}
		other => panic!("unexpected error {other:?}"),
	}
}

#[test]
fn declared_size_above_limit_is_rejected() {
	let bytes = lzma_envelope(&pattern_bytes(2048));
	let err = decompress_lump(6, &bytes, 1024).expect_err("over limit");
	assert!(matches!(err, SourceError::DecompressionFailure { lump: 6, .. }));
}

#[test]
fn wrong_magic_is_a_lump_failure() {
	let mut bytes = lzma_envelope(&pattern_bytes(32));
	bytes[0] = b'X';
	assert!(!is_lzma(&bytes));
	let err = decompress_lump(7, &bytes, MAX_DECOMPRESSED_BYTES).expect_err("bad magic");
	assert!(matches!(err, SourceError::DecompressionFailure { lump: 7, .. }));
}
