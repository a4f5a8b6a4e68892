use std::collections::{BTreeMap, HashMap};

use glam::{Vec2, Vec3, Vec4};
use serde::Serialize;

use crate::source::lump::{Face, Model, NameTable, TexData, TexInfo};
use crate::source::{Result, SourceError};

mod material;

pub use material::{MaterialResolver, MaterialTable, ResolvedMaterial, strip_patch_suffix};

use material::resolve_with_fallback;

/// Material name used for faces whose texture name is empty.
pub const NO_NAME: &str = "NO_NAME";

/// Tables read by [`reconstruct`], usually gathered with `BspFile::raw_geometry`.
#[derive(Debug, Clone, Default)]
pub struct RawGeometry {
	/// Vertex positions.
	pub vertices: Vec<Vec3>,
	/// Vertex index pairs.
	pub edges: Vec<[u32; 2]>,
	/// Signed edge references; sign selects edge direction.
	pub surf_edges: Vec<i32>,
	/// Faces.
	pub faces: Vec<Face>,
	/// Texture projection records.
	pub tex_infos: Vec<TexInfo>,
	/// Texture data entries.
	pub tex_datas: Vec<TexData>,
	/// Brush models.
	pub models: Vec<Model>,
	/// Texture names indexed by `TexData::name_id`.
	pub names: NameTable,
}

/// Reconstruction knobs.
#[derive(Debug, Clone)]
pub struct ReconstructOptions {
	/// Multiplier applied to output positions after UVs are computed.
	pub world_scale: f32,
	/// Texture size used when tex-data stores a zero width or height.
	pub default_texture_size: u32,
}

impl Default for ReconstructOptions {
	fn default() -> Self {
		Self {
			world_scale: 1.0,
			default_texture_size: 512,
		}
	}
}

/// One output polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshFace {
	/// Indices into [`ReconstructedMesh::positions`].
	pub vertices: Vec<u32>,
	/// Index into [`ReconstructedMesh::materials`].
	pub material: u32,
	/// Texture UV per corner.
	pub uvs: Vec<Vec2>,
	/// Lightmap UV per corner.
	pub lightmap_uvs: Vec<Vec2>,
}

/// Deduplicated, material-partitioned mesh for one brush model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconstructedMesh {
	/// Referenced vertex positions in ascending original order.
	pub positions: Vec<Vec3>,
	/// Kept faces.
	pub faces: Vec<MeshFace>,
	/// Material names with patch suffixes removed.
	pub materials: Vec<String>,
}

struct PendingFace {
	tex_info: usize,
	corners: Vec<u32>,
}

/// Rebuild brush model `model_index` as an indexed polygon mesh.
///
/// Displacement faces and faces whose material resolves with `skip` are dropped.
/// Only vertices referenced by kept faces are emitted, and any out-of-range table
/// reference fails the whole model.
pub fn reconstruct(model_index: usize, raw: &RawGeometry, resolver: &dyn MaterialResolver, opt: &ReconstructOptions) -> Result<ReconstructedMesh> {
	let model = at(&raw.models, "models", i64::try_from(model_index).unwrap_or(i64::MAX))?;
	let first_face = i64::from(model.first_face);

	let mut pending = Vec::new();
	for face_index in first_face..first_face + i64::from(model.num_faces) {
		let face = at(&raw.faces, "faces", face_index)?;
		if face.is_displacement() {
			continue;
		}
		let tex_info = index(&raw.tex_infos, "tex_infos", i64::from(face.tex_info))?;
		pending.push(PendingFace {
			tex_info,
			corners: face_loop(raw, face)?,
		});
	}

	let (materials, slots) = partition_materials(raw, resolver, &pending)?;
	let kept: Vec<(PendingFace, u32)> = pending
		.into_iter()
		.filter_map(|face| slots.get(&face.tex_info).copied().flatten().map(|material| (face, material)))
		.collect();

	let mut referenced: Vec<u32> = kept.iter().flat_map(|(face, _)| face.corners.iter().copied()).collect();
	referenced.sort_unstable();
	referenced.dedup();
	let remap = |original: u32| referenced.binary_search(&original).map(|idx| idx as u32).unwrap_or_default();

	let mut faces = Vec::with_capacity(kept.len());
	for (face, material) in &kept {
		let info = &raw.tex_infos[face.tex_info];
		let data = at(&raw.tex_datas, "tex_datas", i64::from(info.tex_data))?;
		let size = texture_size(data, opt.default_texture_size);

		let mut corners = unique_in_order(&face.corners);
		corners.reverse();

		let points = corners.iter().map(|&v| raw.vertices[v as usize]);
		faces.push(MeshFace {
			uvs: points.clone().map(|p| project(p, info.texture_vecs, size)).collect(),
			lightmap_uvs: points.map(|p| project(p, info.lightmap_vecs, size)).collect(),
			vertices: corners.iter().map(|&v| remap(v)).collect(),
			material: *material,
		});
	}

	let positions = referenced.iter().map(|&v| raw.vertices[v as usize] * opt.world_scale).collect();
	Ok(ReconstructedMesh { positions, faces, materials })
}

/// Original vertex indices around `face`, validated against the vertex table.
fn face_loop(raw: &RawGeometry, face: &Face) -> Result<Vec<u32>> {
	let first = i64::from(face.first_edge);
	let count = i64::from(face.num_edges);
	if count < 0 {
		return Err(SourceError::GeometryIndexOutOfRange {
			table: "surf_edges",
			index: first + count,
			len: raw.surf_edges.len(),
		});
	}

	let mut corners = Vec::with_capacity(count as usize);
	for edge_ref in first..first + count {
		let surf_edge = *at(&raw.surf_edges, "surf_edges", edge_ref)?;
		let edge = at(&raw.edges, "edges", i64::from(surf_edge.unsigned_abs()))?;
		let vertex = if surf_edge > 0 { edge[0] } else { edge[1] };
		index(&raw.vertices, "vertices", i64::from(vertex))?;
		corners.push(vertex);
	}
	Ok(corners)
}

/// Resolve each distinct tex-info (ascending) to a material slot; `None` marks skipped materials.
fn partition_materials(
	raw: &RawGeometry,
	resolver: &dyn MaterialResolver,
	pending: &[PendingFace],
) -> Result<(Vec<String>, BTreeMap<usize, Option<u32>>)> {
	let mut slots: BTreeMap<usize, Option<u32>> = pending.iter().map(|face| (face.tex_info, None)).collect();
	let mut materials = Vec::new();
	let mut by_name: HashMap<String, u32> = HashMap::new();

	for (&tex_info, slot) in slots.iter_mut() {
		let info = &raw.tex_infos[tex_info];
		let data = at(&raw.tex_datas, "tex_datas", i64::from(info.tex_data))?;
		let name = usize::try_from(data.name_id).ok().and_then(|id| raw.names.get(id)).ok_or(SourceError::GeometryIndexOutOfRange {
			table: "names",
			index: i64::from(data.name_id),
			len: raw.names.len(),
		})?;
		let name = if name.is_empty() { NO_NAME } else { name };

		if resolve_with_fallback(resolver, name).is_some_and(|material| material.skip) {
			tracing::debug!(material = name, "skipping faces of excluded material");
			continue;
		}

		let stripped = strip_patch_suffix(name).into_owned();
		let next = materials.len() as u32;
		let material = *by_name.entry(stripped.clone()).or_insert_with(|| {
			materials.push(stripped);
			next
		});
		*slot = Some(material);
	}

	Ok((materials, slots))
}

fn unique_in_order(corners: &[u32]) -> Vec<u32> {
	let mut out = Vec::with_capacity(corners.len());
	for &vertex in corners {
		if !out.contains(&vertex) {
			out.push(vertex);
		}
	}
	out
}

fn texture_size(data: &TexData, fallback: u32) -> Vec2 {
	let pick = |stored: i32| if stored == 0 { fallback as f32 } else { stored as f32 };
	Vec2::new(pick(data.width), pick(data.height))
}

fn project(point: Vec3, vecs: [Vec4; 2], size: Vec2) -> Vec2 {
	let u = (point.dot(vecs[0].truncate()) + vecs[0].w) / size.x;
	let v = (point.dot(vecs[1].truncate()) + vecs[1].w) / size.y;
	Vec2::new(u, 1.0 - v)
}

fn index<T>(table: &[T], name: &'static str, idx: i64) -> Result<usize> {
	usize::try_from(idx)
		.ok()
		.filter(|&i| i < table.len())
		.ok_or(SourceError::GeometryIndexOutOfRange {
			table: name,
			index: idx,
			len: table.len(),
		})
}

fn at<'a, T>(table: &'a [T], name: &'static str, idx: i64) -> Result<&'a T> {
	index(table, name, idx).map(|i| &table[i])
}
