use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Cubemap-patched material names carry a `_<x>_<y>_<z>` origin suffix.
static PATCH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_-?\d+_-?\d+_-?\d+.*$").expect("patch suffix pattern compiles"));

/// Material properties the reconstructor cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedMaterial {
	/// Drop every face using this material.
	pub skip: bool,
}

/// Material lookup collaborator.
pub trait MaterialResolver {
	/// Resolve a material by name; `None` when it does not exist.
	fn resolve(&self, name: &str) -> Option<ResolvedMaterial>;
}

impl<F> MaterialResolver for F
where
	F: Fn(&str) -> Option<ResolvedMaterial>,
{
	fn resolve(&self, name: &str) -> Option<ResolvedMaterial> {
		self(name)
	}
}

/// Case-insensitive in-memory material table.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
	entries: HashMap<String, ResolvedMaterial>,
}

impl MaterialTable {
	/// Empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Add or replace a material.
	pub fn insert(&mut self, name: &str, skip: bool) -> &mut Self {
		self.entries.insert(name.to_ascii_lowercase(), ResolvedMaterial { skip });
		self
	}
}

impl MaterialResolver for MaterialTable {
	fn resolve(&self, name: &str) -> Option<ResolvedMaterial> {
		self.entries.get(&name.to_ascii_lowercase()).copied()
	}
}

/// Remove a `_<int>_<int>_<int>...` patch suffix.
pub fn strip_patch_suffix(name: &str) -> Cow<'_, str> {
	PATCH_SUFFIX.replace(name, "")
}

/// Try `name` as stored, then with its patch suffix removed.
pub(super) fn resolve_with_fallback(resolver: &dyn MaterialResolver, name: &str) -> Option<ResolvedMaterial> {
	resolver.resolve(name).or_else(|| {
		let stripped = strip_patch_suffix(name);
		if stripped == name { None } else { resolver.resolve(&stripped) }
	})
}
