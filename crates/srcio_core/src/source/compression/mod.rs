use xz2::stream::{Action, Status, Stream};

use crate::source::bytes::Cursor;
use crate::source::{Result, SourceError};

/// Magic at the start of a compressed lump payload.
pub const LZMA_MAGIC: [u8; 4] = *b"LZMA";
/// Envelope header length: magic, two sizes, and the 5-byte property block.
pub const LZMA_HEADER_LEN: usize = 4 + 4 + 4 + 5;
/// Default cap on a single lump's declared decompressed size.
pub const MAX_DECOMPRESSED_BYTES: usize = 256 * 1024 * 1024;

const MIN_DICT_SIZE: u32 = 4096;
/// `.lzma` alone header: the property block and a `u64` uncompressed size.
const ALONE_HEADER_LEN: usize = 5 + 8;
/// Alone-header size meaning "unknown, ends at an end marker or at the input end".
const UNKNOWN_SIZE: u64 = u64::MAX;

/// Storage mode of a lump payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
	/// Payload is stored as-is.
	None,
	/// Payload is an `LZMA` envelope.
	Lzma,
}

impl Compression {
	/// Render compression mode as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Lzma => "lzma",
		}
	}
}

/// Parsed `LZMA` envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaHeader {
	/// Declared decompressed size.
	pub actual_size: u32,
	/// Declared compressed payload size.
	pub lzma_size: u32,
	/// LZMA1 property block: `(pb * 5 + lp) * 9 + lc`, then the dictionary size.
	pub properties: [u8; 5],
}

impl LzmaHeader {
	/// Parse the envelope header at the start of `bytes`.
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		let mut cursor = Cursor::new(bytes);
		let got = cursor.read_code4()?;
		if got != LZMA_MAGIC {
			return Err(SourceError::MagicMismatch { expected: LZMA_MAGIC, got });
		}
		let actual_size = cursor.read_u32()?;
		let lzma_size = cursor.read_u32()?;
		let mut properties = [0_u8; 5];
		properties.copy_from_slice(cursor.read_bytes(5)?);
		Ok(Self {
			actual_size,
			lzma_size,
			properties,
		})
	}

	/// Literal context bits, literal position bits, and position bits.
	pub fn lc_lp_pb(&self) -> (u32, u32, u32) {
		let d = u32::from(self.properties[0]);
		(d % 9, (d / 9) % 5, d / 45)
	}

	/// Dictionary size from the property block.
	pub fn dict_size(&self) -> u32 {
		u32::from_le_bytes([self.properties[1], self.properties[2], self.properties[3], self.properties[4]])
	}
}

/// Return `true` when `bytes` starts with the `LZMA` envelope magic.
pub fn is_lzma(bytes: &[u8]) -> bool {
	bytes.starts_with(&LZMA_MAGIC)
}

/// Expand the `LZMA` envelope of lump `lump` into exactly its declared size.
pub fn decompress_lump(lump: u32, bytes: &[u8], max_decompressed_bytes: usize) -> Result<Vec<u8>> {
	let header = LzmaHeader::parse(bytes).map_err(|err| failure(lump, err.to_string()))?;
	let declared = header.actual_size as usize;
	if declared > max_decompressed_bytes {
		return Err(failure(lump, format!("declared size {declared} exceeds limit {max_decompressed_bytes}")));
	}

	let end = LZMA_HEADER_LEN + header.lzma_size as usize;
	let Some(payload) = bytes.get(LZMA_HEADER_LEN..end) else {
		return Err(failure(
			lump,
			format!("truncated payload: declared {} bytes, {} available", header.lzma_size, bytes.len().saturating_sub(LZMA_HEADER_LEN)),
		));
	};

	let properties = stream_properties(&header).map_err(|reason| failure(lump, reason))?;
	let mut out = Vec::with_capacity(declared);
	let mut offset = 0;
	let mut first = true;
	while offset < payload.len() && out.len() < declared {
		let framed = frame_stream(&properties, &payload[offset..]);
		let mut stream = Stream::new_lzma_decoder(u64::MAX).map_err(|err| failure(lump, err.to_string()))?;
		match drain_stream(&mut stream, &framed, &mut out, declared) {
			Ok(ended) => {
				offset += (stream.total_in() as usize).saturating_sub(ALONE_HEADER_LEN);
				if !ended {
					break;
				}
			}
			Err(err) if first => return Err(failure(lump, err.to_string())),
			Err(err) => {
				tracing::debug!(lump, decoded = out.len(), "ignoring trailing lzma stream: {err}");
				break;
			}
		}
		first = false;
	}

	out.truncate(declared);
	if out.len() != declared {
		return Err(failure(lump, format!("decoded {} bytes, declared {declared}", out.len())));
	}
	Ok(out)
}

/// Validated property block with the dictionary raised to the decoder minimum.
fn stream_properties(header: &LzmaHeader) -> std::result::Result<[u8; 5], String> {
	let (_, _, pb) = header.lc_lp_pb();
	if pb > 4 {
		return Err(format!("invalid lzma properties byte {:#04x}", header.properties[0]));
	}
	let mut properties = header.properties;
	properties[1..].copy_from_slice(&header.dict_size().max(MIN_DICT_SIZE).to_le_bytes());
	Ok(properties)
}

/// Prefix one headerless stream with an alone header of unknown size.
///
/// Output is bounded by the caller's capacity, so a stream without an end marker
/// stops at the declared lump size.
fn frame_stream(properties: &[u8; 5], rest: &[u8]) -> Vec<u8> {
	let mut framed = Vec::with_capacity(ALONE_HEADER_LEN + rest.len());
	framed.extend_from_slice(properties);
	framed.extend_from_slice(&UNKNOWN_SIZE.to_le_bytes());
	framed.extend_from_slice(rest);
	framed
}

/// Decode one framed stream into `out`; returns `true` when it ended with an end marker.
fn drain_stream(stream: &mut Stream, input: &[u8], out: &mut Vec<u8>, cap: usize) -> std::result::Result<bool, xz2::stream::Error> {
	loop {
		let consumed = stream.total_in() as usize;
		let produced = out.len();
		let status = stream.process_vec(&input[consumed..], out, Action::Run)?;
		match status {
			Status::StreamEnd => return Ok(true),
			Status::MemNeeded => return Ok(false),
			Status::Ok | Status::GetCheck => {}
		}
		if out.len() >= cap {
			return Ok(false);
		}
		if stream.total_in() as usize == consumed && out.len() == produced {
			return Ok(false);
		}
	}
}

fn failure(lump: u32, reason: String) -> SourceError {
	SourceError::DecompressionFailure { lump, reason }
}

#[cfg(test)]
mod tests;
