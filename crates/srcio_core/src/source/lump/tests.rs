use srcio_testkit::ByteWriter;

use crate::source::bytes::Cursor;
use crate::source::lump::{
	DescriptorLayout, LumpContext, LumpData, LumpDescriptor, LumpShape, NameTable, decode_edges, decode_entities, decode_faces, decode_tex_info,
	decode_wide_edges, parse_entities,
};
use crate::source::{Compression, SourceError};

fn ctx(id: u32) -> LumpContext {
	LumpContext {
		id,
		lump_version: 0,
		bsp_version: 20,
		variant: None,
	}
}

#[test]
fn descriptor_field_order_follows_layout() {
	let mut w = ByteWriter::new();
	w.i32(100).i32(20).i32(1).u32(0);
	w.i32(2).i32(300).i32(40).u32(512);
	let bytes = w.finish();
	let mut cursor = Cursor::new(&bytes);

	let standard = LumpDescriptor::parse(&mut cursor, 3, DescriptorLayout::Standard).expect("standard");
	assert_eq!((standard.offset, standard.size, standard.version), (100, 20, 1));
	assert!(!standard.compressed());

	let l4d2 = LumpDescriptor::parse(&mut cursor, 4, DescriptorLayout::VersionFirst).expect("version first");
	assert_eq!((l4d2.version, l4d2.offset, l4d2.size, l4d2.decompressed_size), (2, 300, 40, 512));
	assert_eq!(l4d2.compression(), Compression::Lzma);
}

#[test]
fn raven_descriptors_are_two_words() {
	let mut w = ByteWriter::new();
	w.i32(100).i32(20).i32(200).i32(0);
	let bytes = w.finish();
	let mut cursor = Cursor::new(&bytes);

	let first = LumpDescriptor::parse(&mut cursor, 0, DescriptorLayout::Raven).expect("raven");
	assert_eq!((first.offset, first.size, first.version, first.decompressed_size), (100, 20, 0, 0));
	assert_eq!(cursor.tell(), DescriptorLayout::Raven.descriptor_size());

	let second = LumpDescriptor::parse(&mut cursor, 1, DescriptorLayout::Raven).expect("raven");
	assert_eq!((second.offset, second.size), (200, 0));
	assert!(second.is_empty());
	assert_eq!(second.compression(), Compression::None);
}

#[test]
fn descriptor_slice_rejects_out_of_range() {
	let desc = LumpDescriptor {
		id: 1,
		offset: 8,
		size: 16,
		..LumpDescriptor::default()
	};
	let bytes = [0_u8; 20];
	assert!(matches!(desc.slice(&bytes), Err(SourceError::OutOfBounds { at: 8, .. })));
}

#[test]
fn parses_entity_blocks() {
	let text = b"{\n\"classname\" \"worldspawn\"\n\"skyname\" \"sky_day01\"\n}\n{\n\"classname\" \"light\"\n\"OnTrigger\" \"a\"\n\"OnTrigger\" \"b\"\n}\n\0junk";
	let entities = parse_entities(text);
	assert_eq!(entities.len(), 2);
	assert_eq!(entities[0].class_name(), Some("worldspawn"));
	assert_eq!(entities[0].get("skyname"), Some("sky_day01"));
	assert_eq!(entities[1].properties.len(), 3);
	assert_eq!(entities[1].get("OnTrigger"), Some("a"));
}

#[test]
fn entities_lump_is_a_record() {
	let raw = b"{ \"classname\" \"worldspawn\" }\0";
	let mut cursor = Cursor::new(raw);
	let data = decode_entities(&mut cursor, &ctx(0)).expect("entities");
	assert_eq!(data.shape(), LumpShape::Record);
	assert_eq!(data.element_count(), None);
}

#[test]
fn decodes_face_records() {
	let mut w = ByteWriter::new();
	w.u16(5).u8(1).u8(0).i32(12).i16(4).i16(2).i16(-1).i16(0);
	w.bytes(&[0, 255, 255, 255]).i32(-1).f32(64.0).i32(0).i32(0).i32(3).i32(3).i32(9).u16(0).u16(0).u32(1);
	let bytes = w.finish();
	assert_eq!(bytes.len(), 56);

	let mut cursor = Cursor::new(&bytes);
	let LumpData::Faces(faces) = decode_faces(&mut cursor, &ctx(7)).expect("faces") else {
		panic!("expected faces");
	};
	assert_eq!(faces.len(), 1);
	let face = faces[0];
	assert_eq!(face.plane, 5);
	assert_eq!(face.first_edge, 12);
	assert_eq!(face.num_edges, 4);
	assert_eq!(face.tex_info, 2);
	assert!(!face.is_displacement());
	assert_eq!(face.area, 64.0);
	assert_eq!(face.lightmap_size, [3, 3]);
	assert_eq!(face.orig_face, 9);
	assert_eq!(face.smoothing_groups, 1);
}

#[test]
fn decodes_tex_info_vectors() {
	let mut w = ByteWriter::new();
	w.f32s(&[1.0, 0.0, 0.0, 8.0, 0.0, 1.0, 0.0, 0.0]);
	w.f32s(&[0.25, 0.0, 0.0, 0.0, 0.0, 0.25, 0.0, 0.5]);
	w.i32(0).i32(3);
	let bytes = w.finish();

	let mut cursor = Cursor::new(&bytes);
	let LumpData::TexInfo(infos) = decode_tex_info(&mut cursor, &ctx(6)).expect("tex info") else {
		panic!("expected tex info");
	};
	assert_eq!(infos[0].texture_vecs[0].w, 8.0);
	assert_eq!(infos[0].lightmap_vecs[1].w, 0.5);
	assert_eq!(infos[0].tex_data, 3);
}

#[test]
fn edge_width_depends_on_decoder() {
	let mut w = ByteWriter::new();
	w.u16(1).u16(2).u16(3).u16(4);
	let bytes = w.finish();

	let narrow = decode_edges(&mut Cursor::new(&bytes), &ctx(12)).expect("edges");
	assert_eq!(narrow, LumpData::Edges(vec![[1, 2], [3, 4]]));

	let wide = decode_wide_edges(&mut Cursor::new(&bytes), &ctx(12)).expect("edges");
	assert_eq!(wide, LumpData::Edges(vec![[0x0002_0001, 0x0004_0003]]));
	assert_eq!(wide.shape(), LumpShape::Elements);
	assert_eq!(wide.element_count(), Some(1));
}

#[test]
fn name_table_resolves_offsets() {
	let data = b"BRICK/WALL01\0TOOLS/TOOLSNODRAW\0";
	let table = NameTable::from_lumps(data, &[0, 13]).expect("names");
	assert_eq!(table.len(), 2);
	assert_eq!(table.get(0), Some("BRICK/WALL01"));
	assert_eq!(table.get(1), Some("TOOLS/TOOLSNODRAW"));
	assert_eq!(table.get(2), None);

	assert!(NameTable::from_lumps(data, &[-1]).is_err());
	assert!(NameTable::from_lumps(data, &[40]).is_err());
}
