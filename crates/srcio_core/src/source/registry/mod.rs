use std::collections::HashMap;

use crate::source::lump::{self, GameVariant, LumpContext, LumpDecoder, ids};

/// Registration key. `None` fields match any lump version, container version, or variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LumpKey {
	/// Lump identifier.
	pub id: u32,
	/// Lump format version (from the descriptor) this entry is limited to.
	pub lump_version: Option<u32>,
	/// Container version this entry is limited to.
	pub version: Option<u32>,
	/// Game dialect this entry is limited to.
	pub variant: Option<GameVariant>,
}

impl LumpKey {
	/// Key matching `id` in every container.
	pub fn any(id: u32) -> Self {
		Self {
			id,
			lump_version: None,
			version: None,
			variant: None,
		}
	}

	/// Restrict to one lump format version.
	pub fn with_lump_version(mut self, lump_version: u32) -> Self {
		self.lump_version = Some(lump_version);
		self
	}

	/// Restrict to one container version.
	pub fn with_version(mut self, version: u32) -> Self {
		self.version = Some(version);
		self
	}

	/// Restrict to one game dialect.
	pub fn with_variant(mut self, variant: GameVariant) -> Self {
		self.variant = Some(variant);
		self
	}

	fn specificity(&self) -> usize {
		usize::from(self.lump_version.is_some()) + usize::from(self.version.is_some()) + usize::from(self.variant.is_some())
	}
}

/// Table of lump decoders keyed by `(id, lump version, container version, variant)`.
///
/// Lookups prefer the registration that pins the most fields. Among equally specific
/// keys the lump version outranks the container version, which outranks the variant.
#[derive(Debug, Clone, Default)]
pub struct LumpRegistry {
	decoders: HashMap<LumpKey, LumpDecoder>,
}

impl LumpRegistry {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry populated with the built-in decoders.
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry
			.register(LumpKey::any(ids::ENTITIES), lump::decode_entities)
			.register(LumpKey::any(ids::PLANES), lump::decode_planes)
			.register(LumpKey::any(ids::TEX_DATA), lump::decode_tex_data)
			.register(LumpKey::any(ids::VERTICES), lump::decode_vertices)
			.register(LumpKey::any(ids::TEX_INFO), lump::decode_tex_info)
			.register(LumpKey::any(ids::FACES), lump::decode_faces)
			.register(LumpKey::any(ids::EDGES), lump::decode_edges)
			.register(LumpKey::any(ids::EDGES).with_variant(GameVariant::Vindictus), lump::decode_wide_edges)
			.register(LumpKey::any(ids::SURF_EDGES), lump::decode_surf_edges)
			.register(LumpKey::any(ids::MODELS), lump::decode_models)
			.register(LumpKey::any(ids::TEX_DATA_STRING_DATA), lump::decode_string_data)
			.register(LumpKey::any(ids::TEX_DATA_STRING_TABLE), lump::decode_string_table)
			.register(LumpKey::any(ids::LIGHTMAP_HEADERS).with_version(29), lump::decode_lightmap_headers);
		registry
	}

	/// Add or replace the decoder for `key`.
	pub fn register(&mut self, key: LumpKey, decoder: LumpDecoder) -> &mut Self {
		self.decoders.insert(key, decoder);
		self
	}

	/// Most specific decoder for the lump described by `ctx`.
	pub fn lookup(&self, ctx: &LumpContext) -> Option<LumpDecoder> {
		let lump_versions = [Some(ctx.lump_version), None];
		let versions = [Some(ctx.bsp_version), None];
		let variants = [ctx.variant, None];
		let mut keys: Vec<LumpKey> = lump_versions
			.into_iter()
			.flat_map(|lump_version| {
				versions.into_iter().flat_map(move |version| {
					variants.into_iter().map(move |variant| LumpKey {
						id: ctx.id,
						lump_version,
						version,
						variant,
					})
				})
			})
			.collect();
		keys.sort_by_key(|key| std::cmp::Reverse(key.specificity()));
		keys.into_iter().find_map(|key| self.decoders.get(&key).copied())
	}

	/// Number of registrations.
	pub fn len(&self) -> usize {
		self.decoders.len()
	}

	/// Return `true` when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.decoders.is_empty()
	}
}
