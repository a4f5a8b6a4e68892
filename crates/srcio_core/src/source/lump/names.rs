use crate::source::bytes::Cursor;
use crate::source::{Result, SourceError};

/// Texture name table resolved from the string-data and string-table lumps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
	names: Vec<String>,
}

impl NameTable {
	/// Resolve every offset in `offsets` against the NUL-separated `data` blob.
	pub fn from_lumps(data: &[u8], offsets: &[i32]) -> Result<Self> {
		let cursor = Cursor::new(data);
		let names = offsets
			.iter()
			.map(|&offset| {
				let at = usize::try_from(offset).map_err(|_| SourceError::GeometryIndexOutOfRange {
					table: "tex_data_string_data",
					index: i64::from(offset),
					len: data.len(),
				})?;
				cursor.read_cstring_at(at)
			})
			.collect::<Result<Vec<_>>>()?;
		Ok(Self { names })
	}

	/// Build from already-resolved names.
	pub fn from_names(names: Vec<String>) -> Self {
		Self { names }
	}

	/// Name at `index`.
	pub fn get(&self, index: usize) -> Option<&str> {
		self.names.get(index).map(String::as_str)
	}

	/// Number of names.
	pub fn len(&self) -> usize {
		self.names.len()
	}

	/// Return `true` when the table is empty.
	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	/// All names in table order.
	pub fn names(&self) -> &[String] {
		&self.names
	}
}
