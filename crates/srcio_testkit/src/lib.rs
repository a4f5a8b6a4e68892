//! Shared byte-level fixture builders for workspace tests.

use xz2::stream::{Action, LzmaOptions, Status, Stream};

/// Little-endian byte writer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
	bytes: Vec<u8>,
}

impl ByteWriter {
	/// Create an empty writer.
	pub fn new() -> Self {
		Self::default()
	}

	/// Current length in bytes.
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// Return `true` when nothing has been written.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Append raw bytes.
	pub fn bytes(&mut self, raw: &[u8]) -> &mut Self {
		self.bytes.extend_from_slice(raw);
		self
	}

	/// Append `n` zero bytes.
	pub fn zeros(&mut self, n: usize) -> &mut Self {
		self.bytes.resize(self.bytes.len() + n, 0);
		self
	}

	/// Append `u8`.
	pub fn u8(&mut self, value: u8) -> &mut Self {
		self.bytes.push(value);
		self
	}

	/// Append `i8`.
	pub fn i8(&mut self, value: i8) -> &mut Self {
		self.bytes(&value.to_le_bytes())
	}

	/// Append `u16`.
	pub fn u16(&mut self, value: u16) -> &mut Self {
		self.bytes(&value.to_le_bytes())
	}

	/// Append `i16`.
	pub fn i16(&mut self, value: i16) -> &mut Self {
		self.bytes(&value.to_le_bytes())
	}

	/// Append `u32`.
	pub fn u32(&mut self, value: u32) -> &mut Self {
		self.bytes(&value.to_le_bytes())
	}

	/// Append `i32`.
	pub fn i32(&mut self, value: i32) -> &mut Self {
		self.bytes(&value.to_le_bytes())
	}

	/// Append `f32`.
	pub fn f32(&mut self, value: f32) -> &mut Self {
		self.bytes(&value.to_le_bytes())
	}

	/// Append several `f32` values.
	pub fn f32s(&mut self, values: &[f32]) -> &mut Self {
		for value in values {
			self.f32(*value);
		}
		self
	}

	/// Append a fixed-width, NUL-padded ASCII field.
	pub fn ascii(&mut self, text: &str, width: usize) -> &mut Self {
		let raw = text.as_bytes();
		let take = raw.len().min(width);
		self.bytes(&raw[..take]).zeros(width - take)
	}

	/// Append a NUL-terminated string.
	pub fn cstring(&mut self, text: &str) -> &mut Self {
		self.bytes(text.as_bytes()).u8(0)
	}

	/// Overwrite a `u32` at `offset`.
	pub fn patch_u32(&mut self, offset: usize, value: u32) -> &mut Self {
		self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
		self
	}

	/// Pad with zeros to a multiple of `align`.
	pub fn align(&mut self, align: usize) -> &mut Self {
		let rem = self.bytes.len() % align;
		if rem != 0 {
			self.zeros(align - rem);
		}
		self
	}

	/// Finish and return the bytes.
	pub fn finish(&self) -> Vec<u8> {
		self.bytes.clone()
	}
}

/// Golden studio model header writer, one explicit layout per revision family.
#[derive(Debug, Clone)]
pub struct MdlHeaderFixture {
	/// Stored version (36, 44, 48, 49, ...).
	pub version: i32,
	/// Checksum.
	pub checksum: i32,
	/// Model name.
	pub name: String,
	/// Eye position.
	pub eye_position: [f32; 3],
	/// Flags word.
	pub flags: u32,
	/// Bone count/offset.
	pub bones: (u32, u32),
	/// Material count/offset.
	pub textures: (u32, u32),
	/// Material search path count/offset.
	pub texture_paths: (u32, u32),
	/// Material references per skin family.
	pub skin_reference_count: u32,
	/// Skin family count/offset.
	pub skin_families: (u32, u32),
	/// Flex descriptor count/offset.
	pub flex_descs: (u32, u32),
	/// Flex controller count/offset.
	pub flex_controllers: (u32, u32),
	/// Flex rule count/offset.
	pub flex_rules: (u32, u32),
	/// Surface property string (stored after the tail).
	pub surface_prop: String,
	/// Mass.
	pub mass: f32,
	/// Bone flex driver count/offset (v48+).
	pub bone_flex_drivers: (u32, u32),
	/// Insert the `SCAL` padding block into v44 headers.
	pub scal_padding: bool,
	/// Override the declared file size.
	pub declared_file_size: Option<u32>,
	/// Bytes placed directly after the fixed header.
	pub tail: Vec<u8>,
}

impl MdlHeaderFixture {
	/// Defaults for a given version.
	pub fn new(version: i32) -> Self {
		Self {
			version,
			checksum: 0x1234_5678,
			name: "props/crate01.mdl".to_owned(),
			eye_position: [0.0, 0.0, 64.0],
			flags: 1 << 4,
			bones: (1, 0),
			textures: (0, 0),
			texture_paths: (0, 0),
			skin_reference_count: 0,
			skin_families: (0, 0),
			flex_descs: (0, 0),
			flex_controllers: (0, 0),
			flex_rules: (0, 0),
			surface_prop: "wood_crate".to_owned(),
			mass: 35.5,
			bone_flex_drivers: (0, 0),
			scal_padding: false,
			declared_file_size: None,
			tail: Vec::new(),
		}
	}

	/// Byte length of the fixed header for this fixture (where `tail` begins).
	pub fn header_len(&self) -> usize {
		match self.version {
			35..=37 => 388,
			44..=46 => 708 + if self.scal_padding { 20 } else { 0 },
			47 => 656,
			_ => 664,
		}
	}

	/// Serialize the header, tail and strings.
	pub fn build(&self) -> Vec<u8> {
		let header_len = self.header_len();
		let surface_prop_offset = (header_len + self.tail.len()) as i32;

		let mut w = ByteWriter::new();
		w.bytes(b"IDST").i32(self.version).i32(self.checksum).ascii(&self.name, 64);
		let file_size_at = w.len();
		w.u32(0);
		w.f32s(&self.eye_position).zeros(12 * 5);
		w.u32(self.flags);
		pair(&mut w, self.bones);
		w.zeros(8 * 4);

		match self.version {
			35..=37 => {
				w.zeros(16).zeros(12);
				self.material_tables(&mut w);
				w.zeros(8 * 3);
				pair(&mut w, self.flex_descs);
				pair(&mut w, self.flex_controllers);
				pair(&mut w, self.flex_rules);
				w.zeros(8 * 3).i32(surface_prop_offset).zeros(8 + 8).f32(self.mass).u32(0).zeros(9 * 4);
			}
			_ => {
				w.zeros(8);
				self.material_tables(&mut w);
				w.zeros(8 * 2).zeros(12);
				pair(&mut w, self.flex_descs);
				pair(&mut w, self.flex_controllers);
				pair(&mut w, self.flex_rules);
				w.zeros(8 * 3).i32(surface_prop_offset).zeros(8 + 8).f32(self.mass).u32(0);
				w.zeros(8).u32(0).i32(0).zeros(8).zeros(8).zeros(8);
				if (44..=46).contains(&self.version) {
					w.i8(1).i8(0).zeros(2).i32(0);
					if self.scal_padding {
						w.zeros(4).bytes(b"SCAL").zeros(12);
					}
					w.zeros(8).zeros(16).zeros(8).zeros(36).zeros(8).u32(0).f32(0.0).zeros(8).zeros(58 * 4);
				} else {
					w.i8(1).i8(0).i8(2).zeros(1).zeros(4).zeros(8).f32(1.0).zeros(4).zeros(8);
					w.zeros(8).u32(0).f32(0.0).zeros(8);
					if self.version > 47 {
						pair(&mut w, self.bone_flex_drivers);
					}
					w.zeros(56 * 4);
				}
			}
		}

		assert_eq!(w.len(), header_len, "fixture layout drifted");
		w.bytes(&self.tail).cstring(&self.surface_prop);
		let size = self.declared_file_size.unwrap_or(w.len() as u32);
		w.patch_u32(file_size_at, size);
		w.finish()
	}

	fn material_tables(&self, w: &mut ByteWriter) {
		pair(w, self.textures);
		pair(w, self.texture_paths).u32(self.skin_reference_count);
		pair(w, self.skin_families);
	}
}

fn pair(w: &mut ByteWriter, value: (u32, u32)) -> &mut ByteWriter {
	w.u32(value.0).u32(value.1)
}

/// Number of lump slots in a VBSP directory.
pub const LUMP_SLOTS: usize = 64;
/// Byte size of the VBSP header (magic, version, directory, map revision).
pub const BSP_HEADER_LEN: usize = 8 + LUMP_SLOTS * 16 + 4;
/// Byte size of a VBSP header whose directory uses two-word Raven descriptors.
pub const RAVEN_BSP_HEADER_LEN: usize = 8 + LUMP_SLOTS * 8 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectoryLayout {
	Standard,
	VersionFirst,
	Raven,
}

#[derive(Debug, Clone)]
struct LumpSpec {
	id: usize,
	version: i32,
	payload: Vec<u8>,
	decompressed_size: u32,
}

/// VBSP container builder.
#[derive(Debug, Clone)]
pub struct BspBuilder {
	version: i32,
	map_revision: i32,
	layout: DirectoryLayout,
	lumps: Vec<LumpSpec>,
}

impl BspBuilder {
	/// Start a container with the given format version.
	pub fn new(version: i32) -> Self {
		Self {
			version,
			map_revision: 1,
			layout: DirectoryLayout::Standard,
			lumps: Vec::new(),
		}
	}

	/// Use the version-first descriptor field order.
	pub fn l4d2_layout(mut self) -> Self {
		self.layout = DirectoryLayout::VersionFirst;
		self
	}

	/// Write `offset, size` descriptors with no version or compression fields.
	pub fn raven_layout(mut self) -> Self {
		self.layout = DirectoryLayout::Raven;
		self
	}

	/// Add an uncompressed lump.
	pub fn lump(mut self, id: usize, version: i32, payload: Vec<u8>) -> Self {
		self.lumps.push(LumpSpec {
			id,
			version,
			payload,
			decompressed_size: 0,
		});
		self
	}

	/// Add a lump stored inside an LZMA envelope.
	pub fn compressed_lump(mut self, id: usize, version: i32, raw: &[u8]) -> Self {
		self.lumps.push(LumpSpec {
			id,
			version,
			payload: lzma_envelope(raw),
			decompressed_size: raw.len() as u32,
		});
		self
	}

	/// Add a lump with explicit payload and decompressed-size hint.
	pub fn raw_lump(mut self, id: usize, version: i32, payload: Vec<u8>, decompressed_size: u32) -> Self {
		self.lumps.push(LumpSpec {
			id,
			version,
			payload,
			decompressed_size,
		});
		self
	}

	/// Serialize the container.
	pub fn build(&self) -> Vec<u8> {
		let header_len = match self.layout {
			DirectoryLayout::Raven => RAVEN_BSP_HEADER_LEN,
			DirectoryLayout::Standard | DirectoryLayout::VersionFirst => BSP_HEADER_LEN,
		};
		let mut directory = vec![(0_i32, 0_i32, 0_i32, 0_u32); LUMP_SLOTS];
		let mut data = ByteWriter::new();
		for spec in &self.lumps {
			data.align(4);
			let offset = (header_len + data.len()) as i32;
			data.bytes(&spec.payload);
			directory[spec.id] = (offset, spec.payload.len() as i32, spec.version, spec.decompressed_size);
		}

		let mut w = ByteWriter::new();
		w.bytes(b"VBSP").i32(self.version);
		for (offset, size, version, decompressed) in directory {
			match self.layout {
				DirectoryLayout::Standard => w.i32(offset).i32(size).i32(version).u32(decompressed),
				DirectoryLayout::VersionFirst => w.i32(version).i32(offset).i32(size).u32(decompressed),
				DirectoryLayout::Raven => w.i32(offset).i32(size),
			};
		}
		w.i32(self.map_revision);
		w.bytes(&data.finish());
		w.finish()
	}
}

/// Encode vertex positions (lump 3).
pub fn vertex_lump(points: &[[f32; 3]]) -> Vec<u8> {
	let mut w = ByteWriter::new();
	for point in points {
		w.f32s(point);
	}
	w.finish()
}

/// Encode 16-bit edges (lump 12).
pub fn edge_lump(edges: &[[u16; 2]]) -> Vec<u8> {
	let mut w = ByteWriter::new();
	for edge in edges {
		w.u16(edge[0]).u16(edge[1]);
	}
	w.finish()
}

/// Encode `i32` elements (surf-edges, string table).
pub fn i32_lump(values: &[i32]) -> Vec<u8> {
	let mut w = ByteWriter::new();
	for value in values {
		w.i32(*value);
	}
	w.finish()
}

/// Encode one 56-byte face record.
pub fn face_record(first_edge: i32, num_edges: i16, tex_info: i16, disp_info: i16) -> Vec<u8> {
	let mut w = ByteWriter::new();
	w.u16(0).u8(0).u8(0).i32(first_edge).i16(num_edges).i16(tex_info).i16(disp_info).i16(-1);
	w.bytes(&[0, 255, 255, 255]).i32(-1).f32(0.0).zeros(16).i32(-1).u16(0).u16(0).u32(0);
	w.finish()
}

/// Encode one 72-byte tex-info record.
pub fn tex_info_record(texture_vecs: [[f32; 4]; 2], lightmap_vecs: [[f32; 4]; 2], tex_data: i32) -> Vec<u8> {
	let mut w = ByteWriter::new();
	for vec in texture_vecs.iter().chain(lightmap_vecs.iter()) {
		w.f32s(vec);
	}
	w.i32(0).i32(tex_data);
	w.finish()
}

/// Encode one 32-byte tex-data record.
pub fn tex_data_record(name_id: i32, width: i32, height: i32) -> Vec<u8> {
	let mut w = ByteWriter::new();
	w.f32s(&[0.5, 0.5, 0.5]).i32(name_id).i32(width).i32(height).i32(width).i32(height);
	w.finish()
}

/// Encode one 48-byte brush model record.
pub fn model_record(first_face: i32, num_faces: i32) -> Vec<u8> {
	let mut w = ByteWriter::new();
	w.zeros(36).i32(0).i32(first_face).i32(num_faces);
	w.finish()
}

/// Encode texture names as `(string data, string table)` lump payloads.
pub fn string_lumps(names: &[&str]) -> (Vec<u8>, Vec<u8>) {
	let mut data = ByteWriter::new();
	let mut offsets = Vec::with_capacity(names.len());
	for name in names {
		offsets.push(data.len() as i32);
		data.cstring(name);
	}
	(data.finish(), i32_lump(&offsets))
}

/// LZMA1 literal/position parameters used by [`lzma_envelope`].
pub const LZMA_LC: u32 = 3;
/// See [`LZMA_LC`].
pub const LZMA_LP: u32 = 0;
/// See [`LZMA_LC`].
pub const LZMA_PB: u32 = 2;
/// Dictionary size used by [`lzma_envelope`].
pub const LZMA_DICT_SIZE: u32 = 1 << 16;

/// Compress `raw` into an `LZMA` envelope with a declared size of `raw.len()`.
pub fn lzma_envelope(raw: &[u8]) -> Vec<u8> {
	lzma_envelope_declaring(raw, raw.len() as u32)
}

/// Compress `raw` into an `LZMA` envelope with an arbitrary declared size.
pub fn lzma_envelope_declaring(raw: &[u8], declared: u32) -> Vec<u8> {
	let payload = lzma_raw_stream(raw);
	let mut w = ByteWriter::new();
	w.bytes(b"LZMA").u32(declared).u32(payload.len() as u32);
	w.u8(((LZMA_PB * 5 + LZMA_LP) * 9 + LZMA_LC) as u8).u32(LZMA_DICT_SIZE);
	w.bytes(&payload);
	w.finish()
}

/// Length of the `.lzma` alone header the encoder writes ahead of the stream.
const ALONE_HEADER_LEN: usize = 13;

/// Encode `raw` as a headerless LZMA1 stream (with end marker) using the fixture parameters.
pub fn lzma_raw_stream(raw: &[u8]) -> Vec<u8> {
	let mut options = LzmaOptions::new_preset(6).expect("preset 6 is valid");
	options
		.dict_size(LZMA_DICT_SIZE)
		.literal_context_bits(LZMA_LC)
		.literal_position_bits(LZMA_LP)
		.position_bits(LZMA_PB);
	let mut stream = Stream::new_lzma_encoder(&options).expect("lzma alone encoder");

	let mut out = Vec::with_capacity(raw.len() + 64);
	loop {
		let consumed = stream.total_in() as usize;
		let status = stream.process_vec(&raw[consumed..], &mut out, Action::Finish).expect("lzma encode");
		if matches!(status, Status::StreamEnd) {
			break;
		}
		out.reserve(4096);
	}
	out.split_off(ALONE_HEADER_LEN)
}

/// Deterministic, mildly compressible test payload.
pub fn pattern_bytes(len: usize) -> Vec<u8> {
	(0..len).map(|idx| ((idx * 7) % 251) as u8 ^ ((idx / 64) as u8)).collect()
}
