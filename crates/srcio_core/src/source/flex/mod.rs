use std::collections::BTreeMap;

use serde::Serialize;

use crate::source::{Result, SourceError};

mod expr;
mod tables;

pub use expr::{Expr, FlexEnv};
pub use tables::{FlexController, FlexTables, read_flex_tables};

/// Flex rule opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlexOpcode {
	/// Push the operand as a float constant.
	Const,
	/// Push a controller value.
	Fetch1,
	/// Push another flex's value.
	Fetch2,
	/// Binary add.
	Add,
	/// Binary subtract.
	Sub,
	/// Binary multiply.
	Mul,
	/// Binary divide.
	Div,
	/// Unary negate.
	Neg,
	/// Exponent (never emitted by the compiler).
	Exp,
	/// Open parenthesis (compiler-internal).
	Open,
	/// Close parenthesis (compiler-internal).
	Close,
	/// Argument separator (compiler-internal).
	Comma,
	/// Binary maximum.
	Max,
	/// Binary minimum.
	Min,
	/// Two-way left-side remap of a controller.
	TwoWay0,
	/// Two-way right-side remap of a controller.
	TwoWay1,
	/// Four-point piecewise-linear remap.
	NWay,
	/// Product of the top N values.
	Combo,
	/// Suppress a value by the top N values.
	Dominate,
	/// Lower eyelid helper.
	DmeLowerEyelid,
	/// Upper eyelid helper.
	DmeUpperEyelid,
}

impl FlexOpcode {
	/// Map a raw op code.
	pub fn from_code(code: i32) -> Option<Self> {
		Some(match code {
			1 => Self::Const,
			2 => Self::Fetch1,
			3 => Self::Fetch2,
			4 => Self::Add,
			5 => Self::Sub,
			6 => Self::Mul,
			7 => Self::Div,
			8 => Self::Neg,
			9 => Self::Exp,
			10 => Self::Open,
			11 => Self::Close,
			12 => Self::Comma,
			13 => Self::Max,
			14 => Self::Min,
			15 => Self::TwoWay0,
			16 => Self::TwoWay1,
			17 => Self::NWay,
			18 => Self::Combo,
			19 => Self::Dominate,
			20 => Self::DmeLowerEyelid,
			21 => Self::DmeUpperEyelid,
			_ => return None,
		})
	}

	/// Raw op code.
	pub fn code(self) -> i32 {
		match self {
			Self::Const => 1,
			Self::Fetch1 => 2,
			Self::Fetch2 => 3,
			Self::Add => 4,
			Self::Sub => 5,
			Self::Mul => 6,
			Self::Div => 7,
			Self::Neg => 8,
			Self::Exp => 9,
			Self::Open => 10,
			Self::Close => 11,
			Self::Comma => 12,
			Self::Max => 13,
			Self::Min => 14,
			Self::TwoWay0 => 15,
			Self::TwoWay1 => 16,
			Self::NWay => 17,
			Self::Combo => 18,
			Self::Dominate => 19,
			Self::DmeLowerEyelid => 20,
			Self::DmeUpperEyelid => 21,
		}
	}
}

/// One encoded flex op: code plus a 32-bit operand read as either an index or a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlexOp {
	/// Raw op code.
	pub code: i32,
	/// Raw operand bits.
	pub operand: u32,
}

impl FlexOp {
	/// Op with an index/count operand.
	pub fn indexed(opcode: FlexOpcode, index: u32) -> Self {
		Self {
			code: opcode.code(),
			operand: index,
		}
	}

	/// `CONST` op pushing `value`.
	pub fn constant(value: f32) -> Self {
		Self {
			code: FlexOpcode::Const.code(),
			operand: value.to_bits(),
		}
	}

	/// Decoded opcode.
	pub fn opcode(&self) -> Option<FlexOpcode> {
		FlexOpcode::from_code(self.code)
	}

	/// Operand as a float.
	pub fn value(&self) -> f32 {
		f32::from_bits(self.operand)
	}

	/// Operand as an index or count.
	pub fn index(&self) -> usize {
		self.operand as usize
	}
}

/// Name tables referenced by flex op operands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlexNames {
	/// Flex controller names.
	pub controllers: Vec<String>,
	/// Flex (descriptor) names.
	pub flexes: Vec<String>,
}

/// Undecoded flex rule: target flex plus its op stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlexRule {
	/// Index of the flex this rule drives.
	pub flex_index: u32,
	/// Op stream.
	pub ops: Vec<FlexOp>,
}

/// A rule that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexRuleFailure {
	/// Target flex index.
	pub flex_index: u32,
	/// Compile error.
	pub error: SourceError,
}

/// Compiled rules keyed by flex name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlexRuleSet {
	/// Expression per flex name.
	pub rules: BTreeMap<String, Expr>,
	/// Rules that failed to compile.
	pub failures: Vec<FlexRuleFailure>,
}

/// Compile every rule; a failing rule is recorded and skipped.
pub fn compile_rules(rules: &[FlexRule], names: &FlexNames) -> FlexRuleSet {
	let mut set = FlexRuleSet::default();
	for rule in rules {
		let compiled = rule_name(rule, names).and_then(|name| Ok((name, compile_rule(&rule.ops, names)?)));
		match compiled {
			Ok((name, expr)) => {
				set.rules.insert(name.to_owned(), expr);
			}
			Err(error) => {
				tracing::warn!(flex_index = rule.flex_index, "skipping flex rule: {error}");
				set.failures.push(FlexRuleFailure {
					flex_index: rule.flex_index,
					error,
				});
			}
		}
	}
	set
}

fn rule_name<'n>(rule: &FlexRule, names: &'n FlexNames) -> Result<&'n str> {
	names
		.flexes
		.get(rule.flex_index as usize)
		.map(String::as_str)
		.ok_or_else(|| malformed(0, format!("rule targets flex {} of {}", rule.flex_index, names.flexes.len())))
}

/// Run the op stream on an expression stack and return the single remaining node.
pub fn compile_rule(ops: &[FlexOp], names: &FlexNames) -> Result<Expr> {
	let mut stack = Stack::default();

	for (at, op) in ops.iter().enumerate() {
		let opcode = op.opcode().ok_or_else(|| malformed(at, format!("unknown opcode {}", op.code)))?;
		stack.at = at;
		let node = match opcode {
			FlexOpcode::Const => Expr::Constant(op.value()),
			FlexOpcode::Fetch1 => Expr::controller(controller_name(names, op.index(), at)?),
			FlexOpcode::Fetch2 => Expr::flex(flex_name(names, op.index(), at)?),
			FlexOpcode::Add => {
				let (left, right) = stack.pop_pair()?;
				left + right
			}
			FlexOpcode::Sub => {
				let (left, right) = stack.pop_pair()?;
				left - right
			}
			FlexOpcode::Mul => {
				let (left, right) = stack.pop_pair()?;
				left * right
			}
			FlexOpcode::Div => {
				let (left, right) = stack.pop_pair()?;
				left / right
			}
			FlexOpcode::Max => {
				let (left, right) = stack.pop_pair()?;
				Expr::max(left, right)
			}
			FlexOpcode::Min => {
				let (left, right) = stack.pop_pair()?;
				Expr::min(left, right)
			}
			FlexOpcode::Neg => -stack.pop()?,
			FlexOpcode::Exp | FlexOpcode::Open | FlexOpcode::Close | FlexOpcode::Comma => {
				return Err(malformed(at, format!("unsupported opcode {opcode:?}")));
			}
			FlexOpcode::TwoWay0 => {
				let ctrl = Expr::controller(controller_name(names, op.index(), at)?);
				Expr::constant(1.0) - unit_clamp(ctrl + Expr::constant(1.0))
			}
			FlexOpcode::TwoWay1 => unit_clamp(Expr::controller(controller_name(names, op.index(), at)?)),
			FlexOpcode::NWay => {
				let selector = match stack.pop()? {
					Expr::Constant(value) => controller_name(names, value as usize, at)?,
					other => return Err(malformed(at, format!("n-way selector must be a constant, got {other}"))),
				};
				let w = stack.pop()?;
				let z = stack.pop()?;
				let y = stack.pop()?;
				let x = stack.pop()?;
				let multiplier = Expr::controller(controller_name(names, op.index(), at)?);
				n_way(Expr::controller(selector), x, y, z, w) * multiplier
			}
			FlexOpcode::Combo => Expr::Combo(stack.pop_n(op.index())?),
			FlexOpcode::Dominate => Expr::Dominate(stack.pop_n(op.index() + 1)?),
			FlexOpcode::DmeLowerEyelid | FlexOpcode::DmeUpperEyelid => {
				stack.pop_n(3)?;
				Expr::constant(1.0)
			}
		};
		stack.items.push(node);
	}

	match stack.items.len() {
		1 => stack.items.pop().ok_or_else(|| malformed(ops.len(), "empty stack".to_owned())),
		n => Err(malformed(ops.len(), format!("expected one value on the stack, found {n}"))),
	}
}

#[derive(Default)]
struct Stack {
	items: Vec<Expr>,
	at: usize,
}

impl Stack {
	fn pop(&mut self) -> Result<Expr> {
		self.items.pop().ok_or_else(|| malformed(self.at, "stack underflow".to_owned()))
	}

	/// Pop right, then left.
	fn pop_pair(&mut self) -> Result<(Expr, Expr)> {
		let right = self.pop()?;
		let left = self.pop()?;
		Ok((left, right))
	}

	/// Pop `n` values, returned deepest first.
	fn pop_n(&mut self, n: usize) -> Result<Vec<Expr>> {
		if n > self.items.len() {
			return Err(malformed(self.at, format!("needs {n} values, stack holds {}", self.items.len())));
		}
		Ok(self.items.split_off(self.items.len() - n))
	}
}

/// `min(max(e, 0), 1)`.
fn unit_clamp(e: Expr) -> Expr {
	Expr::min(Expr::max(e, Expr::constant(0.0)), Expr::constant(1.0))
}

/// `min(1, -min(0, e))`: zero for non-negative `e`, saturating at one from `e <= -1`.
fn step_below(e: Expr) -> Expr {
	Expr::min(Expr::constant(1.0), -Expr::min(Expr::constant(0.0), e))
}

/// Four-point remap of `c`: ramps up over `[x, y]`, holds over `[y, z]`, ramps down over `[z, w]`.
fn n_way(c: Expr, x: Expr, y: Expr, z: Expr, w: Expr) -> Expr {
	let gtx = step_below(x.clone() - c.clone());
	let lty = step_below(c.clone() - y.clone());
	let remap_x = unit_clamp((c.clone() - x.clone()) / (y.clone() - x));
	let gtey = -(step_below(c.clone() - y) - Expr::constant(1.0));
	let ltez = -(step_below(z.clone() - c.clone()) - Expr::constant(1.0));
	let gtz = step_below(z.clone() - c.clone());
	let ltw = step_below(c.clone() - w.clone());
	let remap_z = Expr::constant(1.0) - unit_clamp((c - z.clone()) / (w - z));

	gtx * lty * remap_x + gtey * ltez + gtz * ltw * remap_z
}

fn controller_name(names: &FlexNames, index: usize, at: usize) -> Result<&str> {
	names
		.controllers
		.get(index)
		.map(String::as_str)
		.ok_or_else(|| malformed(at, format!("controller {index} out of range ({})", names.controllers.len())))
}

fn flex_name(names: &FlexNames, index: usize, at: usize) -> Result<&str> {
	names
		.flexes
		.get(index)
		.map(String::as_str)
		.ok_or_else(|| malformed(at, format!("flex {index} out of range ({})", names.flexes.len())))
}

fn malformed(op_index: usize, reason: String) -> SourceError {
	SourceError::MalformedExpression { op_index, reason }
}

#[cfg(test)]
mod tests;
