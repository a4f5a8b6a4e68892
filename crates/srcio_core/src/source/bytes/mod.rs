use glam::{Vec3, Vec4};

use crate::source::fixed::{FixedFormat, Scalar};
use crate::source::{Result, SourceError};

/// Bounded little-endian cursor over an immutable byte slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	/// Return the whole underlying buffer.
	pub fn bytes(&self) -> &'a [u8] {
		self.bytes
	}

	/// Return current byte offset.
	pub fn tell(&self) -> usize {
		self.pos
	}

	/// Return buffer length.
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// Return `true` when the buffer is empty.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Move to an absolute offset. `offset == len` is allowed.
	pub fn seek(&mut self, offset: usize) -> Result<()> {
		if offset > self.bytes.len() {
			return Err(SourceError::OutOfBounds {
				at: offset,
				need: 0,
				rem: 0,
			});
		}
		self.pos = offset;
		Ok(())
	}

	/// Advance by `n` bytes.
	pub fn skip(&mut self, n: usize) -> Result<()> {
		self.read_bytes(n).map(|_| ())
	}

	/// Run `f` and restore the current position afterwards, whether `f` succeeds or fails.
	pub fn with_saved_position<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		let saved = self.pos;
		let out = f(self);
		self.pos = saved;
		out
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(SourceError::OutOfBounds {
				at: self.pos,
				need: n,
				rem: self.remaining(),
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	/// Read a four-byte code.
	pub fn read_code4(&mut self) -> Result<[u8; 4]> {
		self.read_array()
	}

	/// Read a fixed-width ASCII field, truncated at the first NUL.
	pub fn read_fixed_ascii(&mut self, n: usize) -> Result<String> {
		let raw = self.read_bytes(n)?;
		let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
		Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
	}

	/// Read a NUL-terminated string at an absolute offset without moving the cursor.
	pub fn read_cstring_at(&self, offset: usize) -> Result<String> {
		let rem = self.bytes.get(offset..).ok_or(SourceError::OutOfBounds {
			at: offset,
			need: 1,
			rem: 0,
		})?;
		let Some(end) = rem.iter().position(|byte| *byte == 0) else {
			return Err(SourceError::OutOfBounds {
				at: offset,
				need: rem.len() + 1,
				rem: rem.len(),
			});
		};
		Ok(String::from_utf8_lossy(&rem[..end]).into_owned())
	}

	/// Read an `i32` string offset and resolve it relative to `base`.
	///
	/// A zero offset yields an empty string.
	pub fn read_cstring_rel(&mut self, base: usize) -> Result<String> {
		let at = self.pos;
		let offset = self.read_i32()?;
		if offset == 0 {
			return Ok(String::new());
		}

		let target = base as i64 + i64::from(offset);
		let target = usize::try_from(target).map_err(|_| SourceError::OutOfBounds { at, need: 4, rem: 0 })?;
		self.read_cstring_at(target)
	}

	/// Read values described by a fixed-format spec such as `"3f"` or `"2I"`.
	///
	/// Nothing is consumed when the buffer is too short for the whole spec.
	pub fn read_fixed(&mut self, spec: &str) -> Result<Vec<Scalar>> {
		let format = FixedFormat::parse(spec)?;
		self.read_format(&format)
	}

	/// Read values for a pre-parsed fixed format.
	pub fn read_format(&mut self, format: &FixedFormat) -> Result<Vec<Scalar>> {
		let mut raw = self.read_bytes(format.byte_len())?;
		let mut out = Vec::with_capacity(format.value_count());
		for (count, kind) in format.items() {
			for _ in 0..*count {
				let (head, tail) = raw.split_at(kind.size());
				raw = tail;
				if let Some(value) = kind.decode(head) {
					out.push(value);
				}
			}
		}
		Ok(out)
	}

	/// Read `u8`.
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.read_array::<1>()?[0])
	}

	/// Read `i8`.
	pub fn read_i8(&mut self) -> Result<i8> {
		Ok(i8::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `u16`.
	pub fn read_u16(&mut self) -> Result<u16> {
		Ok(u16::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `i16`.
	pub fn read_i16(&mut self) -> Result<i16> {
		Ok(i16::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `u32`.
	pub fn read_u32(&mut self) -> Result<u32> {
		Ok(u32::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `i32`.
	pub fn read_i32(&mut self) -> Result<i32> {
		Ok(i32::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `u64`.
	pub fn read_u64(&mut self) -> Result<u64> {
		Ok(u64::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `i64`.
	pub fn read_i64(&mut self) -> Result<i64> {
		Ok(i64::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `f32`.
	pub fn read_f32(&mut self) -> Result<f32> {
		Ok(f32::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `f64`.
	pub fn read_f64(&mut self) -> Result<f64> {
		Ok(f64::from_le_bytes(self.read_array()?))
	}

	/// Read three `f32` values.
	pub fn read_vec3(&mut self) -> Result<Vec3> {
		Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
	}

	/// Read four `f32` values.
	pub fn read_vec4(&mut self) -> Result<Vec4> {
		Ok(Vec4::new(self.read_f32()?, self.read_f32()?, self.read_f32()?, self.read_f32()?))
	}

	fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let raw = self.read_bytes(N)?;
		let mut out = [0_u8; N];
		out.copy_from_slice(raw);
		Ok(out)
	}
}

#[cfg(test)]
mod tests;
