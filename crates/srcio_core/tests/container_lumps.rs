#![allow(missing_docs)]

use srcio::source::lump::{Plane, TexData, ids};
use srcio::source::{BspFile, BspOptions, LumpData, LumpRegistry, LumpShape, SourceError};
use srcio_testkit::{BspBuilder, ByteWriter, tex_data_record};

fn plane_lump() -> Vec<u8> {
	let mut w = ByteWriter::new();
	w.f32s(&[0.0, 0.0, 1.0]).f32(64.0).i32(2);
	w.f32s(&[1.0, 0.0, 0.0]).f32(-32.0).i32(0);
	w.finish()
}

fn tex_data_lump(count: usize) -> Vec<u8> {
	(0..count).flat_map(|idx| tex_data_record(idx as i32, 256, 128)).collect()
}

#[test]
fn plain_and_compressed_lumps_decode_side_by_side() {
	let tex_data = tex_data_lump(32);
	assert_eq!(tex_data.len(), 1024);
	let bytes = BspBuilder::new(21)
		.lump(ids::PLANES as usize, 0, plane_lump())
		.compressed_lump(ids::TEX_DATA as usize, 0, &tex_data)
		.build();

	let registry = LumpRegistry::with_defaults();
	let bsp = BspFile::from_bytes(bytes, &registry, BspOptions::default()).expect("container opens");
	assert_eq!(bsp.header.version, 21);
	assert_eq!(bsp.lump_ids().collect::<Vec<_>>(), vec![ids::PLANES, ids::TEX_DATA]);

	let planes = bsp.lump(ids::PLANES).expect("planes decode");
	let LumpData::Planes(planes) = planes else {
		panic!("expected planes, got {}", planes.kind());
	};
	assert_eq!(planes.len(), 2);
	assert_eq!(planes[0].dist, 64.0);
	assert_eq!(planes[1].kind, 0);
	assert_eq!(planes[0].normal, glam::Vec3::Z);

	let first = bsp.lump(ids::TEX_DATA).expect("compressed tex data decodes");
	assert_eq!(first.shape(), LumpShape::Elements);
	assert_eq!(first.element_count(), Some(1024 / TexData::SIZE));
	let LumpData::TexData(entries) = first else {
		panic!("expected tex data, got {}", first.kind());
	};
	assert_eq!(entries[31].name_id, 31);
	assert_eq!(entries[0].width, 256);

	let second = bsp.lump(ids::TEX_DATA).expect("cached");
	assert!(std::ptr::eq(first, second));
	assert_eq!(bsp.lump_bytes(ids::TEX_DATA).expect("raw bytes"), tex_data);
	assert_eq!(Plane::SIZE * 2, bsp.lump_bytes(ids::PLANES).expect("raw bytes").len());
}

#[test]
fn limits_apply_per_container() {
	let bytes = BspBuilder::new(21).compressed_lump(ids::TEX_DATA as usize, 0, &tex_data_lump(32)).build();
	let registry = LumpRegistry::with_defaults();
	let options = BspOptions {
		max_decompressed_bytes: 512,
		..BspOptions::default()
	};
	let bsp = BspFile::from_bytes(bytes, &registry, options).expect("container opens");
	let err = bsp.lump(ids::TEX_DATA).expect_err("declared size exceeds limit");
	assert!(matches!(err, SourceError::DecompressionFailure { lump: ids::TEX_DATA, .. }));
}

#[test]
fn empty_registry_keeps_every_lump_opaque() {
	let bytes = BspBuilder::new(20).lump(ids::PLANES as usize, 0, plane_lump()).build();
	let registry = LumpRegistry::new();
	let bsp = BspFile::from_bytes(bytes, &registry, BspOptions::default()).expect("container opens");
	let data = bsp.lump(ids::PLANES).expect("opaque lump");
	assert_eq!(data.shape(), LumpShape::Opaque);
	assert_eq!(data, &LumpData::Opaque(plane_lump()));
}
