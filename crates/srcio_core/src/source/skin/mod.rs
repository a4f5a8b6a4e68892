use serde::Serialize;

use crate::source::bytes::Cursor;
use crate::source::header::MdlHeader;
use crate::source::{Result, SourceError};

const TEXTURE_SIZE: usize = 64;
const TEXTURE_PATH_SIZE: usize = 4;
const SKIN_SLOT_SIZE: usize = 2;

/// Material record from a model's texture table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudioTexture {
	/// Material name, relative to one of the search paths.
	pub name: String,
	/// Material flags.
	pub flags: i32,
	/// Nonzero when a mesh references this material.
	pub used: i32,
}

/// Texture, search path, and skin family tables read out of a model buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkinTables {
	/// Material records in table order.
	pub textures: Vec<StudioTexture>,
	/// Directories searched for material names.
	pub search_paths: Vec<String>,
	/// Per family, the texture index bound to each material reference slot.
	pub skin_families: Vec<Vec<u16>>,
}

impl SkinTables {
	/// Material names bound by skin family `family`, one per reference slot.
	pub fn family_materials(&self, family: usize) -> Result<Vec<&str>> {
		let slots = self.skin_families.get(family).ok_or(SourceError::GeometryIndexOutOfRange {
			table: "skin families",
			index: family as i64,
			len: self.skin_families.len(),
		})?;
		slots
			.iter()
			.map(|&slot| {
				self.textures.get(usize::from(slot)).map(|texture| texture.name.as_str()).ok_or(SourceError::GeometryIndexOutOfRange {
					table: "textures",
					index: i64::from(slot),
					len: self.textures.len(),
				})
			})
			.collect()
	}

	/// First reference slot whose binding differs between the default family and any other.
	///
	/// Slots before it are shared by every family. `0` when there is at most one family.
	pub fn first_varying_slot(&self) -> usize {
		let Some((base, rest)) = self.skin_families.split_first() else {
			return 0;
		};
		rest.iter().filter_map(|family| base.iter().zip(family).position(|(a, b)| a != b)).max().unwrap_or(0)
	}
}

/// Read textures, search paths, and skin families referenced by `header`.
pub fn read_skin_tables(bytes: &[u8], header: &MdlHeader) -> Result<SkinTables> {
	let mut cursor = Cursor::new(bytes);

	let textures = header.textures.read_records(&mut cursor, TEXTURE_SIZE, |cursor, base| {
		Ok(StudioTexture {
			name: cursor.read_cstring_rel(base)?,
			flags: cursor.read_i32()?,
			used: cursor.read_i32()?,
		})
	})?;

	let search_paths = header.texture_paths.read_records(&mut cursor, TEXTURE_PATH_SIZE, |cursor, _| cursor.read_cstring_rel(0))?;

	let slots = header.skin_reference_count as usize;
	let skin_families = header.skin_families.read_records(&mut cursor, slots * SKIN_SLOT_SIZE, |cursor, _| {
		(0..slots).map(|_| cursor.read_u16()).collect::<Result<Vec<_>>>()
	})?;

	tracing::debug!(
		textures = textures.len(),
		search_paths = search_paths.len(),
		families = skin_families.len(),
		"read skin tables"
	);
	Ok(SkinTables {
		textures,
		search_paths,
		skin_families,
	})
}
