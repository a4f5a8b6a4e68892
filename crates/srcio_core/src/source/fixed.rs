use crate::source::{Result, SourceError};

/// One scalar produced by a fixed-format read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
	/// `b`
	I8(i8),
	/// `B`
	U8(u8),
	/// `h`
	I16(i16),
	/// `H`
	U16(u16),
	/// `i`
	I32(i32),
	/// `I`
	U32(u32),
	/// `q`
	I64(i64),
	/// `Q`
	U64(u64),
	/// `f`
	F32(f32),
	/// `d`
	F64(f64),
}

impl Scalar {
	/// Widen an integer scalar to `i64`. Floats and out-of-range `u64` return `None`.
	pub fn as_i64(self) -> Option<i64> {
		match self {
			Self::I8(v) => Some(i64::from(v)),
			Self::U8(v) => Some(i64::from(v)),
			Self::I16(v) => Some(i64::from(v)),
			Self::U16(v) => Some(i64::from(v)),
			Self::I32(v) => Some(i64::from(v)),
			Self::U32(v) => Some(i64::from(v)),
			Self::I64(v) => Some(v),
			Self::U64(v) => i64::try_from(v).ok(),
			Self::F32(_) | Self::F64(_) => None,
		}
	}

	/// Convert any scalar to `f64`.
	pub fn as_f64(self) -> f64 {
		match self {
			Self::I8(v) => f64::from(v),
			Self::U8(v) => f64::from(v),
			Self::I16(v) => f64::from(v),
			Self::U16(v) => f64::from(v),
			Self::I32(v) => f64::from(v),
			Self::U32(v) => f64::from(v),
			Self::I64(v) => v as f64,
			Self::U64(v) => v as f64,
			Self::F32(v) => f64::from(v),
			Self::F64(v) => v,
		}
	}
}

/// Element type named by one format code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
	/// Skipped pad byte (`x`), produces no value.
	Pad,
	/// Signed 8-bit.
	I8,
	/// Unsigned 8-bit.
	U8,
	/// Signed 16-bit.
	I16,
	/// Unsigned 16-bit.
	U16,
	/// Signed 32-bit.
	I32,
	/// Unsigned 32-bit.
	U32,
	/// Signed 64-bit.
	I64,
	/// Unsigned 64-bit.
	U64,
	/// 32-bit float.
	F32,
	/// 64-bit float.
	F64,
}

impl ScalarKind {
	fn from_code(code: char) -> Option<Self> {
		Some(match code {
			'x' => Self::Pad,
			'b' => Self::I8,
			'B' => Self::U8,
			'h' => Self::I16,
			'H' => Self::U16,
			'i' => Self::I32,
			'I' => Self::U32,
			'q' => Self::I64,
			'Q' => Self::U64,
			'f' => Self::F32,
			'd' => Self::F64,
			_ => return None,
		})
	}

	/// Encoded width in bytes.
	pub fn size(self) -> usize {
		match self {
			Self::Pad | Self::I8 | Self::U8 => 1,
			Self::I16 | Self::U16 => 2,
			Self::I32 | Self::U32 | Self::F32 => 4,
			Self::I64 | Self::U64 | Self::F64 => 8,
		}
	}

	pub(crate) fn decode(self, raw: &[u8]) -> Option<Scalar> {
		Some(match self {
			Self::Pad => return None,
			Self::I8 => Scalar::I8(i8::from_le_bytes([raw[0]])),
			Self::U8 => Scalar::U8(raw[0]),
			Self::I16 => Scalar::I16(i16::from_le_bytes([raw[0], raw[1]])),
			Self::U16 => Scalar::U16(u16::from_le_bytes([raw[0], raw[1]])),
			Self::I32 => Scalar::I32(i32::from_le_bytes(le4(raw))),
			Self::U32 => Scalar::U32(u32::from_le_bytes(le4(raw))),
			Self::F32 => Scalar::F32(f32::from_le_bytes(le4(raw))),
			Self::I64 => Scalar::I64(i64::from_le_bytes(le8(raw))),
			Self::U64 => Scalar::U64(u64::from_le_bytes(le8(raw))),
			Self::F64 => Scalar::F64(f64::from_le_bytes(le8(raw))),
		})
	}
}

/// Parsed fixed-format spec such as `"3f"`, `"2I"` or `"fI"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedFormat {
	items: Vec<(usize, ScalarKind)>,
	byte_len: usize,
}

impl FixedFormat {
	/// Parse a compact spec: optional decimal repeat count followed by a type code.
	pub fn parse(spec: &str) -> Result<Self> {
		let invalid = || SourceError::InvalidFormatSpec { spec: spec.to_owned() };
		let mut items = Vec::new();
		let mut count: Option<usize> = None;
		let mut byte_len: usize = 0;

		for ch in spec.chars() {
			if ch.is_whitespace() {
				if count.is_some() {
					return Err(invalid());
				}
				continue;
			}
			if let Some(digit) = ch.to_digit(10) {
				let next = count.unwrap_or(0).checked_mul(10).and_then(|value| value.checked_add(digit as usize));
				count = Some(next.ok_or_else(invalid)?);
				continue;
			}

			let kind = ScalarKind::from_code(ch).ok_or_else(invalid)?;
			let repeat = count.take().unwrap_or(1);
			byte_len = repeat
				.checked_mul(kind.size())
				.and_then(|width| byte_len.checked_add(width))
				.ok_or_else(invalid)?;
			items.push((repeat, kind));
		}

		if count.is_some() || items.is_empty() {
			return Err(invalid());
		}
		Ok(Self { items, byte_len })
	}

	/// Total encoded size in bytes.
	pub fn byte_len(&self) -> usize {
		self.byte_len
	}

	/// Number of values produced (pad bytes excluded).
	pub fn value_count(&self) -> usize {
		self.items.iter().filter(|(_, kind)| *kind != ScalarKind::Pad).map(|(count, _)| count).sum()
	}

	pub(crate) fn items(&self) -> &[(usize, ScalarKind)] {
		&self.items
	}
}

fn le4(raw: &[u8]) -> [u8; 4] {
	[raw[0], raw[1], raw[2], raw[3]]
}

fn le8(raw: &[u8]) -> [u8; 8] {
	[raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7]]
}

#[cfg(test)]
mod tests {
	use crate::source::{Cursor, FixedFormat, SourceError};

	#[test]
	fn parses_counts_and_codes() {
		let format = FixedFormat::parse("3f 2I b").expect("spec parses");
		assert_eq!(format.byte_len(), 12 + 8 + 1);
		assert_eq!(format.value_count(), 6);
	}

	#[test]
	fn pad_bytes_take_space_without_values() {
		let format = FixedFormat::parse("4xi").expect("spec parses");
		assert_eq!(format.byte_len(), 8);
		assert_eq!(format.value_count(), 1);
	}

	#[test]
	fn rejects_unknown_code_and_dangling_count() {
		assert!(matches!(FixedFormat::parse("3z"), Err(SourceError::InvalidFormatSpec { .. })));
		assert!(matches!(FixedFormat::parse("2I3"), Err(SourceError::InvalidFormatSpec { .. })));
		assert!(matches!(FixedFormat::parse(""), Err(SourceError::InvalidFormatSpec { .. })));
	}

	#[test]
	fn oversized_counts_are_rejected_before_reading() {
		let spec = "4611686018427387904f";
		assert!(matches!(FixedFormat::parse(spec), Err(SourceError::InvalidFormatSpec { .. })));
		assert!(matches!(FixedFormat::parse("18446744073709551615x1B"), Err(SourceError::InvalidFormatSpec { .. })));

		let bytes = [0_u8; 16];
		let mut cursor = Cursor::new(&bytes);
		let err = cursor.read_fixed(spec).expect_err("spec overflows");
		assert!(matches!(err, SourceError::InvalidFormatSpec { .. }));
		assert_eq!(cursor.tell(), 0);
	}
}
