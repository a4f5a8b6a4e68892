use crate::source::bytes::Cursor;
use crate::source::{Scalar, SourceError};

#[test]
fn reads_fixed_tuple_in_order() {
	let mut bytes = Vec::new();
	bytes.extend_from_slice(&1.5_f32.to_le_bytes());
	bytes.extend_from_slice(&7_u32.to_le_bytes());
	bytes.extend_from_slice(&(-2_i16).to_le_bytes());

	let mut cursor = Cursor::new(&bytes);
	let values = cursor.read_fixed("fIh").expect("fixed read");
	assert_eq!(values, vec![Scalar::F32(1.5), Scalar::U32(7), Scalar::I16(-2)]);
	assert_eq!(cursor.tell(), 10);
	assert_eq!(cursor.remaining(), 0);
}

#[test]
fn short_fixed_read_consumes_nothing() {
	let bytes = [0_u8; 6];
	let mut cursor = Cursor::new(&bytes);
	let err = cursor.read_fixed("2I").expect_err("needs 8 bytes");
	assert_eq!(err, SourceError::OutOfBounds { at: 0, need: 8, rem: 6 });
	assert_eq!(cursor.tell(), 0);
}

#[test]
fn fixed_ascii_stops_at_nul() {
	let mut bytes = b"models/kleiner".to_vec();
	bytes.resize(64, 0);
	bytes.push(0xAA);

	let mut cursor = Cursor::new(&bytes);
	assert_eq!(cursor.read_fixed_ascii(64).expect("ascii"), "models/kleiner");
	assert_eq!(cursor.read_u8().expect("trailing byte"), 0xAA);
}

#[test]
fn cstring_at_does_not_move_cursor() {
	let bytes = b"\x00\x00abc\x00def\x00";
	let cursor = Cursor::new(bytes);
	assert_eq!(cursor.read_cstring_at(2).expect("string"), "abc");
	assert_eq!(cursor.read_cstring_at(6).expect("string"), "def");
	assert_eq!(cursor.tell(), 0);
}

#[test]
fn cstring_without_terminator_is_out_of_bounds() {
	let cursor = Cursor::new(b"abc");
	assert!(matches!(cursor.read_cstring_at(0), Err(SourceError::OutOfBounds { .. })));
	assert!(matches!(cursor.read_cstring_at(9), Err(SourceError::OutOfBounds { .. })));
}

#[test]
fn relative_cstring_resolves_against_base() {
	let mut bytes = Vec::new();
	bytes.extend_from_slice(&[0_u8; 4]);
	bytes.extend_from_slice(&8_i32.to_le_bytes());
	bytes.extend_from_slice(&0_i32.to_le_bytes());
	bytes.extend_from_slice(b"eyes\0");

	let mut cursor = Cursor::new(&bytes);
	cursor.seek(4).expect("seek");
	assert_eq!(cursor.read_cstring_rel(4).expect("string"), "eyes");
	assert_eq!(cursor.read_cstring_rel(8).expect("empty string"), "");
	assert_eq!(cursor.tell(), 12);
}

#[test]
fn saved_position_restores_on_error() {
	let bytes = [1_u8, 2, 3, 4];
	let mut cursor = Cursor::new(&bytes);
	cursor.skip(1).expect("skip");

	let peek = cursor.with_saved_position(|inner| inner.read_u16()).expect("peek");
	assert_eq!(peek, u16::from_le_bytes([2, 3]));
	assert_eq!(cursor.tell(), 1);

	let err = cursor.with_saved_position(|inner| {
		inner.skip(2)?;
		inner.read_u32()
	});
	assert!(matches!(err, Err(SourceError::OutOfBounds { .. })));
	assert_eq!(cursor.tell(), 1);
}

#[test]
fn seek_allows_end_but_not_past_it() {
	let bytes = [0_u8; 4];
	let mut cursor = Cursor::new(&bytes);
	cursor.seek(4).expect("seek to end");
	assert_eq!(cursor.remaining(), 0);
	assert!(cursor.seek(5).is_err());
	assert_eq!(cursor.tell(), 4);
	assert!(matches!(cursor.read_u8(), Err(SourceError::OutOfBounds { at: 4, need: 1, rem: 0 })));
}
