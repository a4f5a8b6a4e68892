use glam::Vec3;
use srcio_testkit::MdlHeaderFixture;

use crate::source::header::layout::fixed_len;
use crate::source::{HeaderOptions, HeaderRevision, MdlHeader, SourceError, StudioHdrFlags, TableRef};

#[test]
fn layout_tables_match_golden_fixture_sizes() {
	for version in [36, 44, 47, 48, 49] {
		let fixture = MdlHeaderFixture::new(version);
		let revision = HeaderRevision::from_version(version).expect("known version");
		assert_eq!(fixed_len(revision, version) + 4, fixture.header_len(), "version {version}");
	}
}

#[test]
fn decodes_v49_header() {
	let mut fixture = MdlHeaderFixture::new(49);
	fixture.flex_rules = (3, 0x400);
	fixture.bone_flex_drivers = (2, 0x500);
	let bytes = fixture.build();

	let header = MdlHeader::decode(&bytes, HeaderRevision::V49).expect("header decodes");
	assert_eq!(header.revision, Some(HeaderRevision::V49));
	assert_eq!(header.version, 49);
	assert_eq!(header.checksum, 0x1234_5678);
	assert_eq!(header.name, "props/crate01.mdl");
	assert_eq!(header.file_size as usize, bytes.len());
	assert_eq!(header.eye_position, Vec3::new(0.0, 0.0, 64.0));
	assert!(header.flags.contains(StudioHdrFlags::STATIC_PROP));
	assert_eq!(header.bones, TableRef { count: 1, offset: 0 });
	assert_eq!(header.flex_rules, TableRef { count: 3, offset: 0x400 });
	assert_eq!(header.surface_prop, "wood_crate");
	assert_eq!(header.mass, 35.5);
	assert_eq!(header.directional_light_dot, 1);
	assert_eq!(header.allowed_root_lod_count, 2);
	assert_eq!(header.vert_anim_fixed_point_scale, 1.0);
	assert_eq!(header.bone_flex_drivers, TableRef { count: 2, offset: 0x500 });
}

#[test]
fn v47_has_no_bone_flex_driver_pair() {
	let mut fixture = MdlHeaderFixture::new(47);
	fixture.bone_flex_drivers = (9, 9);
	let bytes = fixture.build();

	let header = MdlHeader::decode(&bytes, HeaderRevision::V49).expect("header decodes");
	assert_eq!(header.bone_flex_drivers, TableRef::default());
	assert_eq!(header.surface_prop, "wood_crate");
}

#[test]
fn decodes_v36_header_with_defaults_for_modern_fields() {
	let mut fixture = MdlHeaderFixture::new(36);
	fixture.textures = (4, 0x200);
	let bytes = fixture.build();

	let header = MdlHeader::decode(&bytes, HeaderRevision::V36).expect("header decodes");
	assert_eq!(header.version, 36);
	assert_eq!(header.textures, TableRef { count: 4, offset: 0x200 });
	assert_eq!(header.surface_prop, "wood_crate");
	assert_eq!(header.mass, 35.5);
	assert_eq!(header.include_models, TableRef::default());
	assert_eq!(header.anim_block_name, "");
	assert_eq!(header.bone_flex_drivers, TableRef::default());
}

#[test]
fn v44_skips_scal_padding_only_when_present() {
	for scal_padding in [false, true] {
		let mut fixture = MdlHeaderFixture::new(44);
		fixture.scal_padding = scal_padding;
		let bytes = fixture.build();

		let report = MdlHeader::decode_checked(&bytes, &HeaderOptions::default()).expect("header decodes");
		assert!(report.advisories.is_empty(), "scal={scal_padding}");
		assert_eq!(report.header.revision, Some(HeaderRevision::V44));
		assert_eq!(report.header.surface_prop, "wood_crate");
		assert_eq!(report.header.flex_controller_ui, TableRef::default());
	}
}

#[test]
fn decode_is_idempotent() {
	let bytes = MdlHeaderFixture::new(48).build();
	let first = MdlHeader::decode(&bytes, HeaderRevision::V49).expect("first decode");
	let second = MdlHeader::decode(&bytes, HeaderRevision::V49).expect("second decode");
	assert_eq!(first, second);
}

#[test]
fn rejects_bad_magic() {
	let mut bytes = MdlHeaderFixture::new(49).build();
	bytes[..4].copy_from_slice(b"IDSQ");
	let err = MdlHeader::decode(&bytes, HeaderRevision::V49).expect_err("magic mismatch");
	assert_eq!(
		err,
		SourceError::MagicMismatch {
			expected: *b"IDST",
			got: *b"IDSQ"
		}
	);
}

#[test]
fn truncated_header_is_out_of_bounds() {
	let bytes = MdlHeaderFixture::new(49).build();
	let err = MdlHeader::decode(&bytes[..200], HeaderRevision::V49).expect_err("short buffer");
	assert!(matches!(err, SourceError::OutOfBounds { .. }));
}

#[test]
fn unknown_version_is_unsupported() {
	let bytes = MdlHeaderFixture::new(52).build();
	let err = MdlHeader::detect(&bytes).expect_err("version 52 has no layout");
	assert!(matches!(err, SourceError::UnsupportedVersion { version: 52, .. }));
}

#[test]
fn size_mismatch_is_advisory_unless_strict() {
	let mut fixture = MdlHeaderFixture::new(49);
	fixture.declared_file_size = Some(12);
	let bytes = fixture.build();

	let report = MdlHeader::decode_checked(&bytes, &HeaderOptions::default()).expect("lenient decode");
	assert_eq!(
		report.advisories,
		vec![SourceError::SizeMismatch {
			declared: 12,
			actual: bytes.len() as u64
		}]
	);

	let strict = HeaderOptions { strict_size: true };
	let err = MdlHeader::decode_checked(&bytes, &strict).expect_err("strict decode");
	assert!(matches!(err, SourceError::SizeMismatch { declared: 12, .. }));
}

#[test]
fn header_serializes_to_json() {
	let bytes = MdlHeaderFixture::new(49).build();
	let header = MdlHeader::decode(&bytes, HeaderRevision::V49).expect("header decodes");
	let json = serde_json::to_value(&header).expect("serializes");
	assert_eq!(json["name"], "props/crate01.mdl");
	assert_eq!(json["revision"], "V49");
	assert_eq!(json["eye_position"], serde_json::json!([0.0, 0.0, 64.0]));
}
