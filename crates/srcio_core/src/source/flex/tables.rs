use serde::Serialize;

use crate::source::Result;
use crate::source::bytes::Cursor;
use crate::source::flex::{FlexNames, FlexOp, FlexRule, FlexRuleSet, compile_rules};
use crate::source::header::MdlHeader;

const FLEX_DESC_SIZE: usize = 4;
const FLEX_CONTROLLER_SIZE: usize = 20;
const FLEX_RULE_SIZE: usize = 12;
const FLEX_OP_SIZE: usize = 8;

/// Flex controller record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlexController {
	/// Controller group ("eyes", "phoneme", ...).
	pub kind: String,
	/// Controller name.
	pub name: String,
	/// Global controller slot, assigned at load time.
	pub local_to_global: i32,
	/// Minimum value.
	pub min: f32,
	/// Maximum value.
	pub max: f32,
}

/// Flex tables read out of a model buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlexTables {
	/// Flex descriptor names.
	pub flex_names: Vec<String>,
	/// Flex controllers.
	pub controllers: Vec<FlexController>,
	/// Undecoded rules.
	pub rules: Vec<FlexRule>,
}

impl FlexTables {
	/// Controller and flex name tables for the compiler.
	pub fn names(&self) -> FlexNames {
		FlexNames {
			controllers: self.controllers.iter().map(|c| c.name.clone()).collect(),
			flexes: self.flex_names.clone(),
		}
	}

	/// Compile every rule against this model's names.
	pub fn compile(&self) -> FlexRuleSet {
		compile_rules(&self.rules, &self.names())
	}
}

/// Read flex descriptors, controllers, and rules referenced by `header`.
pub fn read_flex_tables(bytes: &[u8], header: &MdlHeader) -> Result<FlexTables> {
	let mut cursor = Cursor::new(bytes);

	let flex_names = header.flex_descs.read_records(&mut cursor, FLEX_DESC_SIZE, |cursor, base| cursor.read_cstring_rel(base))?;

	let controllers = header.flex_controllers.read_records(&mut cursor, FLEX_CONTROLLER_SIZE, |cursor, base| {
		Ok(FlexController {
			kind: cursor.read_cstring_rel(base)?,
			name: cursor.read_cstring_rel(base)?,
			local_to_global: cursor.read_i32()?,
			min: cursor.read_f32()?,
			max: cursor.read_f32()?,
		})
	})?;

	let rules = header.flex_rules.read_records(&mut cursor, FLEX_RULE_SIZE, |cursor, base| {
		let flex_index = cursor.read_u32()?;
		let op_count = cursor.read_u32()? as usize;
		let op_offset = cursor.read_i32()?;
		let ops = cursor.with_saved_position(|cursor| {
			cursor.seek(base.saturating_add_signed(op_offset as isize))?;
			let mut ops = Vec::with_capacity(op_count.min(cursor.remaining() / FLEX_OP_SIZE));
			for _ in 0..op_count {
				ops.push(FlexOp {
					code: cursor.read_i32()?,
					operand: cursor.read_u32()?,
				});
			}
			Ok(ops)
		})?;
		Ok(FlexRule { flex_index, ops })
	})?;

	tracing::debug!(
		flexes = flex_names.len(),
		controllers = controllers.len(),
		rules = rules.len(),
		"read flex tables"
	);
	Ok(FlexTables {
		flex_names,
		controllers,
		rules,
	})
}
