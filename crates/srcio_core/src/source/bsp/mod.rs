use std::cell::OnceCell;

use glam::Vec3;
use serde::Serialize;

use crate::source::bytes::Cursor;
use crate::source::compression::{MAX_DECOMPRESSED_BYTES, decompress_lump};
use crate::source::geometry::RawGeometry;
use crate::source::lump::{
	DescriptorLayout, Entity, Face, GameVariant, LUMP_COUNT, LumpContext, LumpData, LumpDescriptor, LumpDirectory, Model, NameTable, TexData, TexInfo,
	ids,
};
use crate::source::{LumpRegistry, Result, SourceError};

/// Leading magic of world geometry containers.
pub const BSP_MAGIC: [u8; 4] = *b"VBSP";

/// Container open options.
#[derive(Debug, Clone)]
pub struct BspOptions {
	/// Game dialect; selects descriptor layout and variant-specific decoders.
	pub variant: Option<GameVariant>,
	/// Descriptor layout override; `None` picks the layout from `variant`.
	pub layout: Option<DescriptorLayout>,
	/// Upper bound on any single lump's declared decompressed size.
	pub max_decompressed_bytes: usize,
}

impl Default for BspOptions {
	fn default() -> Self {
		Self {
			variant: None,
			layout: None,
			max_decompressed_bytes: MAX_DECOMPRESSED_BYTES,
		}
	}
}

/// Fixed container header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BspHeader {
	/// Container format version.
	pub version: u32,
	/// Map revision counter.
	pub map_revision: i32,
}

/// Opened container with a lazily decoded, memoized lump cache.
///
/// Each slot is decoded at most once, including failed decodes, so repeated
/// [`BspFile::lump`] calls return the same reference or the same error.
pub struct BspFile<'r> {
	/// Parsed fixed header.
	pub header: BspHeader,
	bytes: Vec<u8>,
	directory: LumpDirectory,
	registry: &'r LumpRegistry,
	options: BspOptions,
	cache: Vec<OnceCell<Result<LumpData>>>,
}

impl<'r> BspFile<'r> {
	/// Parse the header and directory of a container held in memory.
	pub fn from_bytes(bytes: Vec<u8>, registry: &'r LumpRegistry, options: BspOptions) -> Result<Self> {
		let mut cursor = Cursor::new(&bytes);
		let got = cursor.read_code4()?;
		if got != BSP_MAGIC {
			return Err(SourceError::MagicMismatch { expected: BSP_MAGIC, got });
		}
		let version = cursor.read_u32()?;
		let layout = options.layout.unwrap_or_else(|| DescriptorLayout::for_variant(options.variant));
		let directory = LumpDirectory::parse(&mut cursor, layout)?;
		let map_revision = cursor.read_i32()?;

		tracing::debug!(version, map_revision, ?layout, variant = options.variant.map(GameVariant::as_str), "opened bsp container");
		Ok(Self {
			header: BspHeader { version, map_revision },
			bytes,
			directory,
			registry,
			options,
			cache: (0..LUMP_COUNT).map(|_| OnceCell::new()).collect(),
		})
	}

	/// Return the raw container bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Options this container was opened with.
	pub fn options(&self) -> &BspOptions {
		&self.options
	}

	/// All directory descriptors in slot order.
	pub fn descriptors(&self) -> &[LumpDescriptor] {
		self.directory.entries()
	}

	/// Identifiers of slots that hold data.
	pub fn lump_ids(&self) -> impl Iterator<Item = u32> + '_ {
		self.descriptors().iter().filter(|desc| !desc.is_empty()).map(|desc| desc.id)
	}

	/// Decoded lump `id`, decoding on first access.
	pub fn lump(&self, id: u32) -> Result<&LumpData> {
		let slot = self.cache.get(id as usize).ok_or(SourceError::LumpNotFound { id })?;
		slot.get_or_init(|| self.decode_lump(id)).as_ref().map_err(Clone::clone)
	}

	/// Stored payload of lump `id` after decompression, bypassing the registry.
	pub fn lump_bytes(&self, id: u32) -> Result<Vec<u8>> {
		let desc = self.directory.get(id).filter(|desc| !desc.is_empty()).ok_or(SourceError::LumpNotFound { id })?;
		let stored = desc.slice(&self.bytes)?;
		if desc.compressed() {
			decompress_lump(id, stored, self.options.max_decompressed_bytes)
		} else {
			Ok(stored.to_vec())
		}
	}

	fn decode_lump(&self, id: u32) -> Result<LumpData> {
		let desc = self.directory.get(id).copied().unwrap_or_default();
		let payload = self.lump_bytes(id)?;
		let ctx = LumpContext {
			id,
			lump_version: desc.version,
			bsp_version: self.header.version,
			variant: self.options.variant,
		};

		let Some(decoder) = self.registry.lookup(&ctx) else {
			let unknown = SourceError::UnknownBlock { id, version: ctx.bsp_version };
			tracing::debug!(len = payload.len(), "{unknown}; keeping raw bytes");
			return Ok(LumpData::Opaque(payload));
		};

		let mut cursor = Cursor::new(&payload);
		let data = decoder(&mut cursor, &ctx)?;
		tracing::debug!(id, kind = data.kind(), compressed = desc.compressed(), "decoded lump");
		Ok(data)
	}

	/// Entity blocks from lump 0.
	pub fn entities(&self) -> Result<&[Entity]> {
		self.typed(ids::ENTITIES, "entities", |data| match data {
			LumpData::Entities(v) => Some(v.as_slice()),
			_ => None,
		})
	}

	/// Vertex positions.
	pub fn vertices(&self) -> Result<&[Vec3]> {
		self.typed(ids::VERTICES, "vertices", |data| match data {
			LumpData::Vertices(v) => Some(v.as_slice()),
			_ => None,
		})
	}

	/// Edge vertex index pairs.
	pub fn edges(&self) -> Result<&[[u32; 2]]> {
		self.typed(ids::EDGES, "edges", |data| match data {
			LumpData::Edges(v) => Some(v.as_slice()),
			_ => None,
		})
	}

	/// Signed edge references.
	pub fn surf_edges(&self) -> Result<&[i32]> {
		self.typed(ids::SURF_EDGES, "surf_edges", |data| match data {
			LumpData::SurfEdges(v) => Some(v.as_slice()),
			_ => None,
		})
	}

	/// Faces.
	pub fn faces(&self) -> Result<&[Face]> {
		self.typed(ids::FACES, "faces", |data| match data {
			LumpData::Faces(v) => Some(v.as_slice()),
			_ => None,
		})
	}

	/// Texture projection records.
	pub fn tex_infos(&self) -> Result<&[TexInfo]> {
		self.typed(ids::TEX_INFO, "tex_info", |data| match data {
			LumpData::TexInfo(v) => Some(v.as_slice()),
			_ => None,
		})
	}

	/// Texture data entries.
	pub fn tex_datas(&self) -> Result<&[TexData]> {
		self.typed(ids::TEX_DATA, "tex_data", |data| match data {
			LumpData::TexData(v) => Some(v.as_slice()),
			_ => None,
		})
	}

	/// Brush models.
	pub fn models(&self) -> Result<&[Model]> {
		self.typed(ids::MODELS, "models", |data| match data {
			LumpData::Models(v) => Some(v.as_slice()),
			_ => None,
		})
	}

	/// Texture names resolved from the string-data and string-table lumps.
	pub fn name_table(&self) -> Result<NameTable> {
		let data = self.typed(ids::TEX_DATA_STRING_DATA, "string_data", |data| match data {
			LumpData::StringData(v) => Some(v.as_slice()),
			_ => None,
		})?;
		let offsets = self.typed(ids::TEX_DATA_STRING_TABLE, "string_table", |data| match data {
			LumpData::StringTable(v) => Some(v.as_slice()),
			_ => None,
		})?;
		NameTable::from_lumps(data, offsets)
	}

	/// Gather every table the geometry reconstructor reads.
	pub fn raw_geometry(&self) -> Result<RawGeometry> {
		Ok(RawGeometry {
			vertices: self.vertices()?.to_vec(),
			edges: self.edges()?.to_vec(),
			surf_edges: self.surf_edges()?.to_vec(),
			faces: self.faces()?.to_vec(),
			tex_infos: self.tex_infos()?.to_vec(),
			tex_datas: self.tex_datas()?.to_vec(),
			models: self.models()?.to_vec(),
			names: self.name_table()?,
		})
	}

	fn typed<'s, T: ?Sized>(&'s self, id: u32, expected: &'static str, pick: impl FnOnce(&'s LumpData) -> Option<&'s T>) -> Result<&'s T> {
		let data = self.lump(id)?;
		pick(data).ok_or(SourceError::UnexpectedLump {
			id,
			expected,
			got: data.kind(),
		})
	}
}
