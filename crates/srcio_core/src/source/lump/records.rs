use glam::{Vec3, Vec4};
use serde::Serialize;

use crate::source::Result;
use crate::source::bytes::Cursor;

/// Splitting plane (20 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Plane {
	/// Plane normal.
	pub normal: Vec3,
	/// Distance from origin along the normal.
	pub dist: f32,
	/// Axis classification.
	pub kind: i32,
}

impl Plane {
	/// Encoded record size.
	pub const SIZE: usize = 20;

	pub(crate) fn parse(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			normal: cursor.read_vec3()?,
			dist: cursor.read_f32()?,
			kind: cursor.read_i32()?,
		})
	}
}

/// Texture data entry (32 bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TexData {
	/// Average surface color.
	pub reflectivity: Vec3,
	/// Index into the texture name string table.
	pub name_id: i32,
	/// Texture width in texels.
	pub width: i32,
	/// Texture height in texels.
	pub height: i32,
	/// View width.
	pub view_width: i32,
	/// View height.
	pub view_height: i32,
}

impl TexData {
	/// Encoded record size.
	pub const SIZE: usize = 32;

	pub(crate) fn parse(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			reflectivity: cursor.read_vec3()?,
			name_id: cursor.read_i32()?,
			width: cursor.read_i32()?,
			height: cursor.read_i32()?,
			view_width: cursor.read_i32()?,
			view_height: cursor.read_i32()?,
		})
	}
}

/// Texture projection record (72 bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TexInfo {
	/// Texture-space projection vectors `[s, t]`, each `xyz` plus offset in `w`.
	pub texture_vecs: [Vec4; 2],
	/// Lightmap-space projection vectors `[s, t]`.
	pub lightmap_vecs: [Vec4; 2],
	/// Surface flags.
	pub flags: i32,
	/// Index into the tex-data table.
	pub tex_data: i32,
}

impl TexInfo {
	/// Encoded record size.
	pub const SIZE: usize = 72;

	pub(crate) fn parse(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			texture_vecs: [cursor.read_vec4()?, cursor.read_vec4()?],
			lightmap_vecs: [cursor.read_vec4()?, cursor.read_vec4()?],
			flags: cursor.read_i32()?,
			tex_data: cursor.read_i32()?,
		})
	}
}

/// Polygon face (56 bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Face {
	/// Plane index.
	pub plane: u16,
	/// Non-zero when the face faces opposite its plane.
	pub side: u8,
	/// Non-zero when the face lies on a node.
	pub on_node: u8,
	/// First index into the surf-edge table.
	pub first_edge: i32,
	/// Number of surf-edges.
	pub num_edges: i16,
	/// Tex-info index.
	pub tex_info: i16,
	/// Displacement index, `-1` for plain faces.
	pub disp_info: i16,
	/// Fog volume id.
	pub fog_volume: i16,
	/// Lightmap styles.
	pub styles: [u8; 4],
	/// Lightmap sample offset.
	pub light_offset: i32,
	/// Face area.
	pub area: f32,
	/// Lightmap texture-space minimums.
	pub lightmap_mins: [i32; 2],
	/// Lightmap texture-space size.
	pub lightmap_size: [i32; 2],
	/// Original face index.
	pub orig_face: i32,
	/// Primitive count.
	pub num_prims: u16,
	/// First primitive id.
	pub first_prim: u16,
	/// Smoothing group mask.
	pub smoothing_groups: u32,
}

impl Face {
	/// Encoded record size.
	pub const SIZE: usize = 56;

	/// Return `true` when the face is replaced by a displacement surface.
	pub fn is_displacement(&self) -> bool {
		self.disp_info != -1
	}

	pub(crate) fn parse(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			plane: cursor.read_u16()?,
			side: cursor.read_u8()?,
			on_node: cursor.read_u8()?,
			first_edge: cursor.read_i32()?,
			num_edges: cursor.read_i16()?,
			tex_info: cursor.read_i16()?,
			disp_info: cursor.read_i16()?,
			fog_volume: cursor.read_i16()?,
			styles: [cursor.read_u8()?, cursor.read_u8()?, cursor.read_u8()?, cursor.read_u8()?],
			light_offset: cursor.read_i32()?,
			area: cursor.read_f32()?,
			lightmap_mins: [cursor.read_i32()?, cursor.read_i32()?],
			lightmap_size: [cursor.read_i32()?, cursor.read_i32()?],
			orig_face: cursor.read_i32()?,
			num_prims: cursor.read_u16()?,
			first_prim: cursor.read_u16()?,
			smoothing_groups: cursor.read_u32()?,
		})
	}
}

/// Brush model (48 bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Model {
	/// Bounding box minimum.
	pub mins: Vec3,
	/// Bounding box maximum.
	pub maxs: Vec3,
	/// Origin.
	pub origin: Vec3,
	/// Root BSP node.
	pub head_node: i32,
	/// First face index.
	pub first_face: i32,
	/// Face count.
	pub num_faces: i32,
}

impl Model {
	/// Encoded record size.
	pub const SIZE: usize = 48;

	pub(crate) fn parse(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			mins: cursor.read_vec3()?,
			maxs: cursor.read_vec3()?,
			origin: cursor.read_vec3()?,
			head_node: cursor.read_i32()?,
			first_face: cursor.read_i32()?,
			num_faces: cursor.read_i32()?,
		})
	}
}

/// Lightmap page header (8 bytes, container version 29).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightmapHeader {
	/// Page type.
	pub kind: u32,
	/// Page width.
	pub width: u16,
	/// Page height.
	pub height: u16,
}

impl LightmapHeader {
	/// Encoded record size.
	pub const SIZE: usize = 8;

	pub(crate) fn parse(cursor: &mut Cursor<'_>) -> Result<Self> {
		Ok(Self {
			kind: cursor.read_u32()?,
			width: cursor.read_u16()?,
			height: cursor.read_u16()?,
		})
	}
}

/// Read whole records until fewer than `size` bytes remain.
pub(crate) fn read_records<T>(cursor: &mut Cursor<'_>, size: usize, parse: impl Fn(&mut Cursor<'_>) -> Result<T>) -> Result<Vec<T>> {
	let count = cursor.remaining() / size;
	let mut out = Vec::with_capacity(count);
	for _ in 0..count {
		out.push(parse(cursor)?);
	}
	if cursor.remaining() != 0 {
		tracing::debug!(trailing = cursor.remaining(), record = size, "lump has trailing bytes");
	}
	Ok(out)
}
