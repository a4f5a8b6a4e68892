use crate::source::Result;
use crate::source::bytes::Cursor;
use crate::source::header::{HeaderRevision, MdlHeader, StudioHdrFlags, TableRef};

/// Marker some v44 compilers write before padding that precedes the flex UI table.
pub(super) const SCAL_MAGIC: u32 = u32::from_le_bytes(*b"SCAL");

/// One header field, read with its on-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Field {
	Version,
	Checksum,
	Name,
	FileSize,
	EyePosition,
	IlluminationPosition,
	HullMin,
	HullMax,
	ViewBboxMin,
	ViewBboxMax,
	Flags,
	Bones,
	BoneControllers,
	HitboxSets,
	LocalAnimations,
	LocalSequences,
	ActivityListVersion,
	EventsIndexed,
	SequencesIndexedFlag,
	SequenceGroupCount,
	SequenceGroupOffset,
	Textures,
	TexturePaths,
	SkinReferenceCount,
	SkinFamilies,
	BodyParts,
	LocalAttachments,
	Transitions,
	LocalNodes,
	LocalNodeNameOffset,
	FlexDescs,
	FlexControllers,
	FlexRules,
	IkChains,
	Mouths,
	LocalPoseParameters,
	SurfaceProp,
	KeyValueOffset,
	KeyValueSize,
	LocalIkAutoPlayLocks,
	Mass,
	Contents,
	IncludeModels,
	VirtualModelPointer,
	AnimBlockName,
	AnimBlocks,
	AnimBlockModelPointer,
	BoneTableByNameOffset,
	VertexBasePointer,
	IndexBasePointer,
	DirectionalLightDot,
	RootLod,
	AllowedRootLodCount,
	ZeroFrameCacheOffset,
	FlexControllerUi,
	VertAnimFixedPointScale,
	StudioHeader2Offset,
	SourceBoneTransforms,
	IllumPositionAttachmentIndex,
	MaxEyeDeflection,
	LinearBoneOffset,
	NameOffset,
	BoneFlexDrivers,
}

/// One instruction in a revision layout table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Step {
	Read(Field),
	Skip(usize),
	/// Peek the `u32` at `at` bytes ahead; skip `skip` bytes only when it equals `magic`.
	PeekSkip { at: usize, magic: u32, skip: usize },
	/// Read the field only when the stored version is above the threshold.
	IfVersionAbove(i32, Field),
}

use Field::*;
use Step::{IfVersionAbove, PeekSkip, Read, Skip};

const PREFIX: &[Step] = &[
	Read(Version),
	Read(Checksum),
	Read(Name),
	Read(FileSize),
	Read(EyePosition),
	Read(IlluminationPosition),
	Read(HullMin),
	Read(HullMax),
	Read(ViewBboxMin),
	Read(ViewBboxMax),
	Read(Flags),
	Read(Bones),
	Read(BoneControllers),
	Read(HitboxSets),
	Read(LocalAnimations),
	Read(LocalSequences),
];

const V36_BODY: &[Step] = &[
	Skip(16),
	Read(SequencesIndexedFlag),
	Read(SequenceGroupCount),
	Read(SequenceGroupOffset),
	Read(Textures),
	Read(TexturePaths),
	Read(SkinReferenceCount),
	Read(SkinFamilies),
	Read(BodyParts),
	Read(LocalAttachments),
	Read(Transitions),
	Read(FlexDescs),
	Read(FlexControllers),
	Read(FlexRules),
	Read(IkChains),
	Read(Mouths),
	Read(LocalPoseParameters),
	Read(SurfaceProp),
	Read(KeyValueOffset),
	Read(KeyValueSize),
	Read(LocalIkAutoPlayLocks),
	Read(Mass),
	Read(Contents),
	Skip(9 * 4),
];

/// Shared middle section of the v44 and v49 layouts.
const MODERN_BODY: &[Step] = &[
	Read(ActivityListVersion),
	Read(EventsIndexed),
	Read(Textures),
	Read(TexturePaths),
	Read(SkinReferenceCount),
	Read(SkinFamilies),
	Read(BodyParts),
	Read(LocalAttachments),
	Read(LocalNodes),
	Read(LocalNodeNameOffset),
	Read(FlexDescs),
	Read(FlexControllers),
	Read(FlexRules),
	Read(IkChains),
	Read(Mouths),
	Read(LocalPoseParameters),
	Read(SurfaceProp),
	Read(KeyValueOffset),
	Read(KeyValueSize),
	Read(LocalIkAutoPlayLocks),
	Read(Mass),
	Read(Contents),
	Read(IncludeModels),
	Read(VirtualModelPointer),
	Read(AnimBlockName),
	Read(AnimBlocks),
	Read(AnimBlockModelPointer),
	Read(BoneTableByNameOffset),
	Read(VertexBasePointer),
	Read(IndexBasePointer),
	Read(DirectionalLightDot),
	Read(RootLod),
];

const V44_TAIL: &[Step] = &[
	Skip(2),
	Read(ZeroFrameCacheOffset),
	PeekSkip {
		at: 4,
		magic: SCAL_MAGIC,
		skip: 5 * 4,
	},
	Read(FlexControllerUi),
	Skip(4 * 4),
	Read(StudioHeader2Offset),
	Skip(4),
	Skip(9 * 4),
	Read(SourceBoneTransforms),
	Read(IllumPositionAttachmentIndex),
	Read(MaxEyeDeflection),
	Read(LinearBoneOffset),
	Read(NameOffset),
	Skip(58 * 4),
];

const V49_TAIL: &[Step] = &[
	Read(AllowedRootLodCount),
	Skip(1),
	Skip(4),
	Read(FlexControllerUi),
	Read(VertAnimFixedPointScale),
	Skip(4),
	Read(StudioHeader2Offset),
	Skip(4),
	Read(SourceBoneTransforms),
	Read(IllumPositionAttachmentIndex),
	Read(MaxEyeDeflection),
	Read(LinearBoneOffset),
	Read(NameOffset),
	IfVersionAbove(47, BoneFlexDrivers),
	Skip(56 * 4),
];

/// Full step list for a revision.
pub(super) fn layout_for(revision: HeaderRevision) -> impl Iterator<Item = &'static Step> {
	let (body, tail): (&'static [Step], &'static [Step]) = match revision {
		HeaderRevision::V36 => (V36_BODY, &[]),
		HeaderRevision::V44 => (MODERN_BODY, V44_TAIL),
		HeaderRevision::V49 => (MODERN_BODY, V49_TAIL),
	};
	PREFIX.iter().chain(body).chain(tail)
}

pub(super) fn apply_step(cursor: &mut Cursor<'_>, header: &mut MdlHeader, step: &Step) -> Result<()> {
	match *step {
		Read(field) => read_field(cursor, header, field),
		Skip(n) => cursor.skip(n),
		PeekSkip { at, magic, skip } => {
			let peeked = cursor.with_saved_position(|inner| {
				inner.skip(at)?;
				inner.read_u32()
			});
			// A short buffer here is not a layout error; the following reads will report it.
			if peeked.is_ok_and(|value| value == magic) {
				cursor.skip(skip)?;
			}
			Ok(())
		}
		IfVersionAbove(threshold, field) => {
			if header.version > threshold {
				read_field(cursor, header, field)?;
			}
			Ok(())
		}
	}
}

fn read_field(cursor: &mut Cursor<'_>, header: &mut MdlHeader, field: Field) -> Result<()> {
	match field {
		Version => header.version = cursor.read_i32()?,
		Checksum => header.checksum = cursor.read_i32()?,
		Name => header.name = cursor.read_fixed_ascii(64)?,
		FileSize => header.file_size = cursor.read_u32()?,
		EyePosition => header.eye_position = cursor.read_vec3()?,
		IlluminationPosition => header.illumination_position = cursor.read_vec3()?,
		HullMin => header.hull_min = cursor.read_vec3()?,
		HullMax => header.hull_max = cursor.read_vec3()?,
		ViewBboxMin => header.view_bbox_min = cursor.read_vec3()?,
		ViewBboxMax => header.view_bbox_max = cursor.read_vec3()?,
		Flags => header.flags = StudioHdrFlags::from_bits_retain(cursor.read_u32()?),
		Bones => header.bones = read_table(cursor)?,
		BoneControllers => header.bone_controllers = read_table(cursor)?,
		HitboxSets => header.hitbox_sets = read_table(cursor)?,
		LocalAnimations => header.local_animations = read_table(cursor)?,
		LocalSequences => header.local_sequences = read_table(cursor)?,
		ActivityListVersion => header.activity_list_version = cursor.read_u32()?,
		EventsIndexed => header.events_indexed = cursor.read_u32()?,
		SequencesIndexedFlag => header.sequences_indexed_flag = cursor.read_u32()?,
		SequenceGroupCount => header.sequence_groups.count = cursor.read_u32()?,
		SequenceGroupOffset => header.sequence_groups.offset = cursor.read_u32()?,
		Textures => header.textures = read_table(cursor)?,
		TexturePaths => header.texture_paths = read_table(cursor)?,
		SkinReferenceCount => header.skin_reference_count = cursor.read_u32()?,
		SkinFamilies => header.skin_families = read_table(cursor)?,
		BodyParts => header.body_parts = read_table(cursor)?,
		LocalAttachments => header.local_attachments = read_table(cursor)?,
		Transitions => header.transitions = read_table(cursor)?,
		LocalNodes => header.local_nodes = read_table(cursor)?,
		LocalNodeNameOffset => header.local_node_name_offset = cursor.read_u32()?,
		FlexDescs => header.flex_descs = read_table(cursor)?,
		FlexControllers => header.flex_controllers = read_table(cursor)?,
		FlexRules => header.flex_rules = read_table(cursor)?,
		IkChains => header.ik_chains = read_table(cursor)?,
		Mouths => header.mouths = read_table(cursor)?,
		LocalPoseParameters => header.local_pose_parameters = read_table(cursor)?,
		SurfaceProp => header.surface_prop = cursor.read_cstring_rel(0)?,
		KeyValueOffset => header.key_value_offset = cursor.read_u32()?,
		KeyValueSize => header.key_value_size = cursor.read_u32()?,
		LocalIkAutoPlayLocks => header.local_ik_auto_play_locks = read_table(cursor)?,
		Mass => header.mass = cursor.read_f32()?,
		Contents => header.contents = cursor.read_u32()?,
		IncludeModels => header.include_models = read_table(cursor)?,
		VirtualModelPointer => header.virtual_model_pointer = cursor.read_u32()?,
		AnimBlockName => header.anim_block_name = cursor.read_cstring_rel(0)?,
		AnimBlocks => header.anim_blocks = read_table(cursor)?,
		AnimBlockModelPointer => header.anim_block_model_pointer = cursor.read_u32()?,
		BoneTableByNameOffset => header.bone_table_by_name_offset = cursor.read_u32()?,
		VertexBasePointer => header.vertex_base_pointer = cursor.read_u32()?,
		IndexBasePointer => header.index_base_pointer = cursor.read_u32()?,
		DirectionalLightDot => header.directional_light_dot = cursor.read_i8()?,
		RootLod => header.root_lod = cursor.read_i8()?,
		AllowedRootLodCount => header.allowed_root_lod_count = cursor.read_i8()?,
		ZeroFrameCacheOffset => header.zero_frame_cache_offset = cursor.read_i32()?,
		FlexControllerUi => header.flex_controller_ui = read_table(cursor)?,
		VertAnimFixedPointScale => header.vert_anim_fixed_point_scale = cursor.read_f32()?,
		StudioHeader2Offset => header.studio_header2_offset = cursor.read_u32()?,
		SourceBoneTransforms => header.source_bone_transforms = read_table(cursor)?,
		IllumPositionAttachmentIndex => header.illum_position_attachment_index = cursor.read_u32()?,
		MaxEyeDeflection => header.max_eye_deflection = cursor.read_f32()?,
		LinearBoneOffset => header.linear_bone_offset = cursor.read_u32()?,
		NameOffset => header.name_offset = cursor.read_u32()?,
		BoneFlexDrivers => header.bone_flex_drivers = read_table(cursor)?,
	}
	Ok(())
}

fn read_table(cursor: &mut Cursor<'_>) -> Result<TableRef> {
	let count = cursor.read_u32()?;
	let offset = cursor.read_u32()?;
	Ok(TableRef { count, offset })
}

/// Encoded byte width of a revision layout, excluding the magic and any optional padding.
#[cfg(test)]
pub(super) fn fixed_len(revision: HeaderRevision, version: i32) -> usize {
	layout_for(revision)
		.map(|step| match *step {
			Read(field) => field_len(field),
			Skip(n) => n,
			PeekSkip { .. } => 0,
			IfVersionAbove(threshold, field) if version > threshold => field_len(field),
			IfVersionAbove(..) => 0,
		})
		.sum()
}

#[cfg(test)]
fn field_len(field: Field) -> usize {
	match field {
		Name => 64,
		EyePosition | IlluminationPosition | HullMin | HullMax | ViewBboxMin | ViewBboxMax => 12,
		DirectionalLightDot | RootLod | AllowedRootLodCount => 1,
		Bones | BoneControllers | HitboxSets | LocalAnimations | LocalSequences | Textures | TexturePaths | SkinFamilies | BodyParts | LocalAttachments
		| Transitions | LocalNodes | FlexDescs | FlexControllers | FlexRules | IkChains | Mouths | LocalPoseParameters | LocalIkAutoPlayLocks
		| IncludeModels | AnimBlocks | FlexControllerUi | SourceBoneTransforms | BoneFlexDrivers => 8,
		_ => 4,
	}
}
