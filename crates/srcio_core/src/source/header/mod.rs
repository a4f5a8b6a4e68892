use glam::Vec3;
use serde::Serialize;

use crate::source::bytes::Cursor;
use crate::source::{Result, SourceError};

mod layout;

use layout::{apply_step, layout_for};

/// Leading magic of studio model files.
pub const MDL_MAGIC: [u8; 4] = *b"IDST";

bitflags::bitflags! {
	/// Model-wide flags stored in the studio header.
	#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
	pub struct StudioHdrFlags: u32 {
		/// Hitboxes were generated by the compiler.
		const AUTOGENERATED_HITBOX = 1 << 0;
		/// Uses an environment cubemap.
		const USES_ENV_CUBEMAP = 1 << 1;
		/// Translucent parts render as opaque.
		const FORCE_OPAQUE = 1 << 2;
		/// Translucent parts render in a second pass.
		const TRANSLUCENT_TWOPASS = 1 << 3;
		/// Compiled as a static prop.
		const STATIC_PROP = 1 << 4;
		/// Uses the framebuffer texture.
		const USES_FB_TEXTURE = 1 << 5;
		/// Last LOD is a shadow LOD.
		const HASSHADOWLOD = 1 << 6;
		/// Uses bump mapping.
		const USES_BUMPMAPPING = 1 << 7;
		/// Shadow LOD keeps its own materials.
		const USE_SHADOWLOD_MATERIALS = 1 << 8;
		/// Obsolete bit.
		const OBSOLETE = 1 << 9;
		/// Unused bit.
		const UNUSED = 1 << 10;
		/// Disables forced fade.
		const NO_FORCED_FADE = 1 << 11;
		/// Lengthens phoneme crossfade.
		const FORCE_PHONEME_CROSSFADE = 1 << 12;
		/// Uses constant directional light dot.
		const CONSTANT_DIRECTIONAL_LIGHT_DOT = 1 << 13;
		/// Delta flexes already converted.
		const FLEXES_CONVERTED = 1 << 14;
		/// Built in preview mode.
		const BUILT_IN_PREVIEW_MODE = 1 << 15;
		/// Ambient boost.
		const AMBIENT_BOOST = 1 << 16;
		/// Does not cast shadows.
		const DO_NOT_CAST_SHADOWS = 1 << 17;
		/// Alpha textures cast shadows.
		const CAST_TEXTURE_SHADOWS = 1 << 18;
		/// Subdivision surface.
		const SUBDIVISION_SURFACE = 1 << 19;
		/// Vertex animation uses fixed point scale.
		const VERT_ANIM_FIXED_POINT_SCALE = 1 << 21;
	}
}

/// Header field layout family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeaderRevision {
	/// Versions 35 to 37.
	V36,
	/// Versions 44 to 46.
	V44,
	/// Versions 47 to 49.
	V49,
}

impl HeaderRevision {
	/// Map a stored model version to its layout family.
	pub fn from_version(version: i32) -> Option<Self> {
		match version {
			35..=37 => Some(Self::V36),
			44..=46 => Some(Self::V44),
			47..=49 => Some(Self::V49),
			_ => None,
		}
	}

	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::V36 => "v36",
			Self::V44 => "v44",
			Self::V49 => "v49",
		}
	}
}

/// Count/offset pair referencing a sub-table in the model buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableRef {
	/// Number of records.
	pub count: u32,
	/// Absolute byte offset of the first record.
	pub offset: u32,
}

impl TableRef {
	/// Return `true` when the table holds no records.
	pub fn is_empty(self) -> bool {
		self.count == 0
	}

	/// Read `count` records of `stride` bytes; `read` gets each record start as its base offset.
	pub(crate) fn read_records<T>(
		self,
		cursor: &mut Cursor<'_>,
		stride: usize,
		read: impl Fn(&mut Cursor<'_>, usize) -> Result<T>,
	) -> Result<Vec<T>> {
		let mut out = Vec::with_capacity((self.count as usize).min(cursor.len() / stride.max(1)));
		for idx in 0..self.count as usize {
			let base = self.offset as usize + idx * stride;
			cursor.seek(base)?;
			out.push(read(cursor, base)?);
		}
		Ok(out)
	}
}

/// Normalized studio model header.
///
/// Every revision decodes into this superset record; fields a revision does not store
/// stay at their zero/empty default.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MdlHeader {
	/// Layout family used for decoding.
	pub revision: Option<HeaderRevision>,
	/// Stored model version.
	pub version: i32,
	/// Checksum shared with companion vertex files.
	pub checksum: i32,
	/// Internal model name (64-byte field).
	pub name: String,
	/// Declared file size.
	pub file_size: u32,
	/// Eye position.
	pub eye_position: Vec3,
	/// Illumination position.
	pub illumination_position: Vec3,
	/// Hull minimum.
	pub hull_min: Vec3,
	/// Hull maximum.
	pub hull_max: Vec3,
	/// View bounding box minimum.
	pub view_bbox_min: Vec3,
	/// View bounding box maximum.
	pub view_bbox_max: Vec3,
	/// Model flags.
	pub flags: StudioHdrFlags,
	/// Bone table.
	pub bones: TableRef,
	/// Bone controller table.
	pub bone_controllers: TableRef,
	/// Hitbox set table.
	pub hitbox_sets: TableRef,
	/// Local animation descriptions.
	pub local_animations: TableRef,
	/// Local sequence descriptions.
	pub local_sequences: TableRef,
	/// Activity list version.
	pub activity_list_version: u32,
	/// Non-zero once events are indexed.
	pub events_indexed: u32,
	/// Sequence index flag (v36).
	pub sequences_indexed_flag: u32,
	/// Sequence group table (v36).
	pub sequence_groups: TableRef,
	/// Material table.
	pub textures: TableRef,
	/// Material search path offsets.
	pub texture_paths: TableRef,
	/// Material references per skin family.
	pub skin_reference_count: u32,
	/// Skin family table.
	pub skin_families: TableRef,
	/// Body part table.
	pub body_parts: TableRef,
	/// Attachment table.
	pub local_attachments: TableRef,
	/// Transition table (v36).
	pub transitions: TableRef,
	/// Local node table.
	pub local_nodes: TableRef,
	/// Offset of local node names.
	pub local_node_name_offset: u32,
	/// Flex descriptor (flex name) table.
	pub flex_descs: TableRef,
	/// Flex controller table.
	pub flex_controllers: TableRef,
	/// Flex rule table.
	pub flex_rules: TableRef,
	/// IK chain table.
	pub ik_chains: TableRef,
	/// Mouth table.
	pub mouths: TableRef,
	/// Pose parameter table.
	pub local_pose_parameters: TableRef,
	/// Surface property name.
	pub surface_prop: String,
	/// Offset of the key-value text block.
	pub key_value_offset: u32,
	/// Size of the key-value text block.
	pub key_value_size: u32,
	/// IK auto-play lock table.
	pub local_ik_auto_play_locks: TableRef,
	/// Model mass.
	pub mass: f32,
	/// Contents flags.
	pub contents: u32,
	/// Included model table.
	pub include_models: TableRef,
	/// Runtime pointer slot.
	pub virtual_model_pointer: u32,
	/// Animation block file name.
	pub anim_block_name: String,
	/// Animation block table.
	pub anim_blocks: TableRef,
	/// Runtime pointer slot.
	pub anim_block_model_pointer: u32,
	/// Offset of the bone name lookup table.
	pub bone_table_by_name_offset: u32,
	/// Runtime pointer slot.
	pub vertex_base_pointer: u32,
	/// Runtime pointer slot.
	pub index_base_pointer: u32,
	/// Constant directional light dot.
	pub directional_light_dot: i8,
	/// Root LOD index.
	pub root_lod: i8,
	/// Allowed root LOD count (v49).
	pub allowed_root_lod_count: i8,
	/// Zero-frame cache offset (v44).
	pub zero_frame_cache_offset: i32,
	/// Flex controller UI table.
	pub flex_controller_ui: TableRef,
	/// Vertex animation fixed point scale (v49).
	pub vert_anim_fixed_point_scale: f32,
	/// Offset of the secondary header.
	pub studio_header2_offset: u32,
	/// Source bone transform table.
	pub source_bone_transforms: TableRef,
	/// Illumination position attachment index.
	pub illum_position_attachment_index: u32,
	/// Maximum eye deflection.
	pub max_eye_deflection: f32,
	/// Offset of linear bone data.
	pub linear_bone_offset: u32,
	/// Offset of the long model name.
	pub name_offset: u32,
	/// Bone flex driver table (v49, version above 47).
	pub bone_flex_drivers: TableRef,
}

/// Header validation policy.
#[derive(Debug, Clone, Default)]
pub struct HeaderOptions {
	/// Treat a declared/actual file size disagreement as a hard error.
	pub strict_size: bool,
}

/// Decoded header plus advisory findings.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderReport {
	/// Decoded header.
	pub header: MdlHeader,
	/// Non-fatal findings such as [`SourceError::SizeMismatch`].
	pub advisories: Vec<SourceError>,
}

impl MdlHeader {
	/// Check the magic and map the stored version to a layout family.
	pub fn detect(bytes: &[u8]) -> Result<HeaderRevision> {
		let mut cursor = Cursor::new(bytes);
		expect_magic(&mut cursor)?;
		let version = cursor.read_i32()?;
		HeaderRevision::from_version(version).ok_or(SourceError::UnsupportedVersion {
			format: "mdl",
			version: i64::from(version),
		})
	}

	/// Decode a header using an explicit layout family.
	pub fn decode(bytes: &[u8], revision: HeaderRevision) -> Result<Self> {
		let mut cursor = Cursor::new(bytes);
		expect_magic(&mut cursor)?;

		let mut header = Self {
			revision: Some(revision),
			..Self::default()
		};
		for step in layout_for(revision) {
			apply_step(&mut cursor, &mut header, step)?;
		}
		Ok(header)
	}

	/// Detect, decode, and validate a header under `opt`.
	pub fn decode_checked(bytes: &[u8], opt: &HeaderOptions) -> Result<HeaderReport> {
		let revision = Self::detect(bytes)?;
		let header = Self::decode(bytes, revision)?;

		let mut advisories = Vec::new();
		if let Some(err) = header.size_mismatch(bytes.len()) {
			if opt.strict_size {
				return Err(err);
			}
			tracing::warn!(name = %header.name, "{err}");
			advisories.push(err);
		}

		Ok(HeaderReport { header, advisories })
	}

	/// Compare the declared file size with a buffer length.
	pub fn size_mismatch(&self, actual: usize) -> Option<SourceError> {
		if self.file_size as usize == actual {
			return None;
		}
		Some(SourceError::SizeMismatch {
			declared: u64::from(self.file_size),
			actual: actual as u64,
		})
	}
}

fn expect_magic(cursor: &mut Cursor<'_>) -> Result<()> {
	let got = cursor.read_code4()?;
	if got != MDL_MAGIC {
		return Err(SourceError::MagicMismatch { expected: MDL_MAGIC, got });
	}
	Ok(())
}

#[cfg(test)]
mod tests;
