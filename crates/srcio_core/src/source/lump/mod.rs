use glam::Vec3;
use serde::Serialize;

use crate::source::bytes::Cursor;
use crate::source::compression::Compression;
use crate::source::{Result, SourceError};

mod entities;
mod names;
mod records;

pub use entities::{Entity, parse_entities};
pub use names::NameTable;
pub use records::{Face, LightmapHeader, Model, Plane, TexData, TexInfo};

use records::read_records;

/// Number of descriptor slots in a container directory.
pub const LUMP_COUNT: usize = 64;
/// Encoded size of one standard directory descriptor.
pub const DESCRIPTOR_SIZE: usize = 16;
/// Encoded size of one Raven directory descriptor.
pub const RAVEN_DESCRIPTOR_SIZE: usize = 8;

/// Well-known lump identifiers.
pub mod ids {
	/// Entity key/value text.
	pub const ENTITIES: u32 = 0;
	/// Planes.
	pub const PLANES: u32 = 1;
	/// Texture data.
	pub const TEX_DATA: u32 = 2;
	/// Vertex positions.
	pub const VERTICES: u32 = 3;
	/// Texture projection records.
	pub const TEX_INFO: u32 = 6;
	/// Faces.
	pub const FACES: u32 = 7;
	/// Edges.
	pub const EDGES: u32 = 12;
	/// Signed edge references.
	pub const SURF_EDGES: u32 = 13;
	/// Brush models.
	pub const MODELS: u32 = 14;
	/// Texture name blob.
	pub const TEX_DATA_STRING_DATA: u32 = 43;
	/// Offsets into the texture name blob.
	pub const TEX_DATA_STRING_TABLE: u32 = 44;
	/// Lightmap page headers (container version 29).
	pub const LIGHTMAP_HEADERS: u32 = 0x53;
}

/// Game-specific container dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GameVariant {
	/// Version-first descriptor field order.
	Left4Dead2,
	/// 32-bit edge indices.
	Vindictus,
}

impl GameVariant {
	/// Map a Steam application id to a known variant.
	pub fn from_steam_app_id(app_id: u32) -> Option<Self> {
		match app_id {
			550 => Some(Self::Left4Dead2),
			212_160 => Some(Self::Vindictus),
			_ => None,
		}
	}

	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Left4Dead2 => "left4dead2",
			Self::Vindictus => "vindictus",
		}
	}
}

/// Field order of a directory descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorLayout {
	/// `offset, size, version, decompressed_size`.
	Standard,
	/// `version, offset, size, decompressed_size`.
	VersionFirst,
	/// `offset, size`; every lump is version 0 and stored plain.
	Raven,
}

impl DescriptorLayout {
	/// Descriptor layout used by a variant.
	pub fn for_variant(variant: Option<GameVariant>) -> Self {
		match variant {
			Some(GameVariant::Left4Dead2) => Self::VersionFirst,
			_ => Self::Standard,
		}
	}

	/// Encoded width of one descriptor.
	pub fn descriptor_size(self) -> usize {
		match self {
			Self::Standard | Self::VersionFirst => DESCRIPTOR_SIZE,
			Self::Raven => RAVEN_DESCRIPTOR_SIZE,
		}
	}
}

/// Directory entry locating one lump inside the container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LumpDescriptor {
	/// Lump identifier (slot index).
	pub id: u32,
	/// Absolute byte offset.
	pub offset: u32,
	/// Stored byte size.
	pub size: u32,
	/// Lump format version.
	pub version: u32,
	/// Decompressed size, `0` for plain lumps.
	pub decompressed_size: u32,
}

impl LumpDescriptor {
	/// Parse one descriptor for slot `id`.
	pub fn parse(cursor: &mut Cursor<'_>, id: u32, layout: DescriptorLayout) -> Result<Self> {
		let (version, offset, size, decompressed_size) = match layout {
			DescriptorLayout::Standard => {
				let offset = cursor.read_u32()?;
				let size = cursor.read_u32()?;
				(cursor.read_u32()?, offset, size, cursor.read_u32()?)
			}
			DescriptorLayout::VersionFirst => {
				let version = cursor.read_u32()?;
				(version, cursor.read_u32()?, cursor.read_u32()?, cursor.read_u32()?)
			}
			DescriptorLayout::Raven => {
				let offset = cursor.read_u32()?;
				(0, offset, cursor.read_u32()?, 0)
			}
		};
		Ok(Self {
			id,
			offset,
			size,
			version,
			decompressed_size,
		})
	}

	/// Return `true` when the payload is stored compressed.
	pub fn compressed(&self) -> bool {
		self.decompressed_size != 0
	}

	/// Storage mode of the payload.
	pub fn compression(&self) -> Compression {
		if self.compressed() { Compression::Lzma } else { Compression::None }
	}

	/// Return `true` when the slot holds no bytes.
	pub fn is_empty(&self) -> bool {
		self.size == 0
	}

	/// Stored payload bytes within `file`.
	pub fn slice<'a>(&self, file: &'a [u8]) -> Result<&'a [u8]> {
		let start = self.offset as usize;
		let end = start.checked_add(self.size as usize).ok_or(SourceError::OutOfBounds {
			at: start,
			need: self.size as usize,
			rem: file.len().saturating_sub(start),
		})?;
		file.get(start..end).ok_or(SourceError::OutOfBounds {
			at: start,
			need: self.size as usize,
			rem: file.len().saturating_sub(start),
		})
	}
}

/// Fixed-size ordered descriptor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LumpDirectory {
	entries: Vec<LumpDescriptor>,
}

impl LumpDirectory {
	/// Parse [`LUMP_COUNT`] descriptors starting at the cursor.
	pub fn parse(cursor: &mut Cursor<'_>, layout: DescriptorLayout) -> Result<Self> {
		let mut entries = Vec::with_capacity(LUMP_COUNT);
		for id in 0..LUMP_COUNT as u32 {
			entries.push(LumpDescriptor::parse(cursor, id, layout)?);
		}
		Ok(Self { entries })
	}

	/// Descriptor for `id`.
	pub fn get(&self, id: u32) -> Option<&LumpDescriptor> {
		self.entries.get(id as usize)
	}

	/// All descriptors in slot order.
	pub fn entries(&self) -> &[LumpDescriptor] {
		&self.entries
	}
}

/// Structural capability of decoded lump data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LumpShape {
	/// One structured record.
	Record,
	/// Homogeneous element sequence.
	Elements,
	/// Undecoded bytes.
	Opaque,
}

/// Decoded lump payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LumpData {
	/// Entity blocks.
	Entities(Vec<Entity>),
	/// Planes.
	Planes(Vec<Plane>),
	/// Texture data entries.
	TexData(Vec<TexData>),
	/// Vertex positions.
	Vertices(Vec<Vec3>),
	/// Texture projection records.
	TexInfo(Vec<TexInfo>),
	/// Faces.
	Faces(Vec<Face>),
	/// Vertex index pairs.
	Edges(Vec<[u32; 2]>),
	/// Signed edge references.
	SurfEdges(Vec<i32>),
	/// Brush models.
	Models(Vec<Model>),
	/// Texture name blob.
	StringData(Vec<u8>),
	/// Offsets into the texture name blob.
	StringTable(Vec<i32>),
	/// Lightmap page headers.
	LightmapHeaders(Vec<LightmapHeader>),
	/// Raw bytes for lumps without a registered decoder.
	Opaque(Vec<u8>),
}

impl LumpData {
	/// Stable lowercase kind label.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Entities(_) => "entities",
			Self::Planes(_) => "planes",
			Self::TexData(_) => "tex_data",
			Self::Vertices(_) => "vertices",
			Self::TexInfo(_) => "tex_info",
			Self::Faces(_) => "faces",
			Self::Edges(_) => "edges",
			Self::SurfEdges(_) => "surf_edges",
			Self::Models(_) => "models",
			Self::StringData(_) => "string_data",
			Self::StringTable(_) => "string_table",
			Self::LightmapHeaders(_) => "lightmap_headers",
			Self::Opaque(_) => "opaque",
		}
	}

	/// Structural capability of this payload.
	pub fn shape(&self) -> LumpShape {
		match self {
			Self::Entities(_) | Self::StringData(_) => LumpShape::Record,
			Self::Opaque(_) => LumpShape::Opaque,
			_ => LumpShape::Elements,
		}
	}

	/// Element count for [`LumpShape::Elements`] payloads.
	pub fn element_count(&self) -> Option<usize> {
		let count = match self {
			Self::Planes(v) => v.len(),
			Self::TexData(v) => v.len(),
			Self::Vertices(v) => v.len(),
			Self::TexInfo(v) => v.len(),
			Self::Faces(v) => v.len(),
			Self::Edges(v) => v.len(),
			Self::SurfEdges(v) => v.len(),
			Self::Models(v) => v.len(),
			Self::StringTable(v) => v.len(),
			Self::LightmapHeaders(v) => v.len(),
			Self::Entities(_) | Self::StringData(_) | Self::Opaque(_) => return None,
		};
		Some(count)
	}
}

/// Decode-time context handed to lump decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumpContext {
	/// Lump identifier.
	pub id: u32,
	/// Lump format version from the descriptor.
	pub lump_version: u32,
	/// Container format version.
	pub bsp_version: u32,
	/// Selected game dialect.
	pub variant: Option<GameVariant>,
}

/// Signature of a lump decoder.
pub type LumpDecoder = fn(&mut Cursor<'_>, &LumpContext) -> Result<LumpData>;

pub(crate) fn decode_entities(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	let raw = cursor.read_bytes(cursor.remaining())?;
	Ok(LumpData::Entities(parse_entities(raw)))
}

pub(crate) fn decode_planes(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, Plane::SIZE, Plane::parse).map(LumpData::Planes)
}

pub(crate) fn decode_tex_data(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, TexData::SIZE, TexData::parse).map(LumpData::TexData)
}

pub(crate) fn decode_vertices(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, 12, |c| c.read_vec3()).map(LumpData::Vertices)
}

pub(crate) fn decode_tex_info(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, TexInfo::SIZE, TexInfo::parse).map(LumpData::TexInfo)
}

pub(crate) fn decode_faces(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, Face::SIZE, Face::parse).map(LumpData::Faces)
}

pub(crate) fn decode_edges(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, 4, |c| Ok([u32::from(c.read_u16()?), u32::from(c.read_u16()?)])).map(LumpData::Edges)
}

pub(crate) fn decode_wide_edges(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, 8, |c| Ok([c.read_u32()?, c.read_u32()?])).map(LumpData::Edges)
}

pub(crate) fn decode_surf_edges(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, 4, |c| c.read_i32()).map(LumpData::SurfEdges)
}

pub(crate) fn decode_models(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, Model::SIZE, Model::parse).map(LumpData::Models)
}

pub(crate) fn decode_string_data(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	let raw = cursor.read_bytes(cursor.remaining())?;
	Ok(LumpData::StringData(raw.to_vec()))
}

pub(crate) fn decode_string_table(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, 4, |c| c.read_i32()).map(LumpData::StringTable)
}

pub(crate) fn decode_lightmap_headers(cursor: &mut Cursor<'_>, _ctx: &LumpContext) -> Result<LumpData> {
	read_records(cursor, LightmapHeader::SIZE, LightmapHeader::parse).map(LumpData::LightmapHeaders)
}

#[cfg(test)]
mod tests;
