use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors produced while decoding model headers, BSP lumps, geometry, and flex rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
	/// Not enough bytes remained for a requested read.
	#[error("out of bounds read at offset {at}, need {need} bytes, remaining {rem}")]
	OutOfBounds {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// Leading format signature did not match.
	#[error("magic mismatch: expected {expected:?}, got {got:?}")]
	MagicMismatch {
		/// Expected four-byte tag.
		expected: [u8; 4],
		/// Tag found in the buffer.
		got: [u8; 4],
	},
	/// Header-declared file size disagrees with the buffer length.
	#[error("declared size {declared} does not match buffer length {actual}")]
	SizeMismatch {
		/// Size stored in the header.
		declared: u64,
		/// Actual buffer length.
		actual: u64,
	},
	/// Compressed lump could not be expanded to its declared size.
	#[error("decompression failed for lump {lump}: {reason}")]
	DecompressionFailure {
		/// Lump identifier.
		lump: u32,
		/// Human-readable cause.
		reason: String,
	},
	/// No registry entry exists for a lump identifier.
	#[error("no decoder registered for lump {id} (bsp version {version})")]
	UnknownBlock {
		/// Lump identifier.
		id: u32,
		/// Container format version.
		version: u32,
	},
	/// Flex rule bytecode could not be compiled.
	#[error("malformed flex expression at op {op_index}: {reason}")]
	MalformedExpression {
		/// Index of the offending op (or op count for terminal checks).
		op_index: usize,
		/// Human-readable cause.
		reason: String,
	},
	/// Fixed-format read spec is invalid.
	#[error("invalid format spec {spec:?}")]
	InvalidFormatSpec {
		/// Original spec text.
		spec: String,
	},
	/// Format version has no known layout.
	#[error("unsupported {format} version {version}")]
	UnsupportedVersion {
		/// Format label.
		format: &'static str,
		/// Parsed version.
		version: i64,
	},
	/// Geometry table reference pointed outside its table.
	#[error("geometry {table} index {index} out of range (len {len})")]
	GeometryIndexOutOfRange {
		/// Referenced table name.
		table: &'static str,
		/// Offending index.
		index: i64,
		/// Table length.
		len: usize,
	},
	/// Requested lump is absent from the directory.
	#[error("lump {id} not found")]
	LumpNotFound {
		/// Lump identifier.
		id: u32,
	},
	/// Lump decoded to a different shape than the caller asked for.
	#[error("lump {id} decoded as {got}, expected {expected}")]
	UnexpectedLump {
		/// Lump identifier.
		id: u32,
		/// Expected lump kind.
		expected: &'static str,
		/// Actual lump kind.
		got: &'static str,
	},
}
