use serde::Serialize;

/// One `{ "key" "value" ... }` block from the entity lump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entity {
	/// Key/value pairs in file order. Keys may repeat (entity outputs).
	pub properties: Vec<(String, String)>,
}

impl Entity {
	/// First value stored under `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	/// The `classname` property.
	pub fn class_name(&self) -> Option<&str> {
		self.get("classname")
	}
}

/// Parse entity lump text. Text is NUL-terminated on disk; anything past the NUL is ignored.
pub fn parse_entities(raw: &[u8]) -> Vec<Entity> {
	let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
	let text = String::from_utf8_lossy(&raw[..end]);

	let mut entities = Vec::new();
	let mut current: Option<Entity> = None;
	let mut pending_key: Option<String> = None;
	let mut chars = text.chars().peekable();

	while let Some(ch) = chars.next() {
		match ch {
			'{' => {
				current = Some(Entity::default());
				pending_key = None;
			}
			'}' => {
				if let Some(entity) = current.take() {
					entities.push(entity);
				}
				pending_key = None;
			}
			'"' => {
				let mut token = String::new();
				for next in chars.by_ref() {
					if next == '"' {
						break;
					}
					token.push(next);
				}
				let Some(entity) = current.as_mut() else {
					continue;
				};
				match pending_key.take() {
					Some(key) => entity.properties.push((key, token)),
					None => pending_key = Some(token),
				}
			}
			_ => {}
		}
	}

	if current.is_some() {
		tracing::debug!(parsed = entities.len(), "entity lump ends inside an unterminated block");
	}
	entities
}
