use std::collections::HashMap;
use std::fmt;
use std::ops;

use serde::Serialize;

/// Flex rule expression tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
	/// Literal value.
	Constant(f32),
	/// Current value of a named flex controller.
	Controller(String),
	/// Current value of another named flex.
	Flex(String),
	/// `a + b`.
	Add(Box<Expr>, Box<Expr>),
	/// `a - b`.
	Sub(Box<Expr>, Box<Expr>),
	/// `a * b`.
	Mul(Box<Expr>, Box<Expr>),
	/// `a / b`.
	Div(Box<Expr>, Box<Expr>),
	/// `max(a, b)`.
	Max(Box<Expr>, Box<Expr>),
	/// `min(a, b)`.
	Min(Box<Expr>, Box<Expr>),
	/// `-a`.
	Neg(Box<Expr>),
	/// Product of all operands; `0` when there are none.
	Combo(Vec<Expr>),
	/// First operand scaled by one minus the product of the rest.
	Dominate(Vec<Expr>),
}

impl Expr {
	/// `Constant(value)`.
	pub fn constant(value: f32) -> Self {
		Self::Constant(value)
	}

	/// `Controller(name)`.
	pub fn controller(name: impl Into<String>) -> Self {
		Self::Controller(name.into())
	}

	/// `Flex(name)`.
	pub fn flex(name: impl Into<String>) -> Self {
		Self::Flex(name.into())
	}

	/// `Max(a, b)`.
	pub fn max(a: Self, b: Self) -> Self {
		Self::Max(Box::new(a), Box::new(b))
	}

	/// `Min(a, b)`.
	pub fn min(a: Self, b: Self) -> Self {
		Self::Min(Box::new(a), Box::new(b))
	}

	/// Evaluate against controller and flex values. Missing names read as zero.
	pub fn evaluate(&self, env: &FlexEnv) -> f32 {
		match self {
			Self::Constant(value) => *value,
			Self::Controller(name) => env.controllers.get(name).copied().unwrap_or(0.0),
			Self::Flex(name) => env.flexes.get(name).copied().unwrap_or(0.0),
			Self::Add(a, b) => a.evaluate(env) + b.evaluate(env),
			Self::Sub(a, b) => a.evaluate(env) - b.evaluate(env),
			Self::Mul(a, b) => a.evaluate(env) * b.evaluate(env),
			Self::Div(a, b) => a.evaluate(env) / b.evaluate(env),
			Self::Max(a, b) => a.evaluate(env).max(b.evaluate(env)),
			Self::Min(a, b) => a.evaluate(env).min(b.evaluate(env)),
			Self::Neg(a) => -a.evaluate(env),
			Self::Combo(items) if items.is_empty() => 0.0,
			Self::Combo(items) => items.iter().map(|item| item.evaluate(env)).product(),
			Self::Dominate(items) => match items.split_first() {
				Some((first, rest)) => {
					let dominators: f32 = rest.iter().map(|item| item.evaluate(env)).product();
					first.evaluate(env) * (1.0 - dominators)
				}
				None => 0.0,
			},
		}
	}
}

macro_rules! binary_op {
	($trait:ident, $method:ident, $variant:ident) => {
		impl ops::$trait for Expr {
			type Output = Expr;

			fn $method(self, rhs: Expr) -> Expr {
				Expr::$variant(Box::new(self), Box::new(rhs))
			}
		}
	};
}

binary_op!(Add, add, Add);
binary_op!(Sub, sub, Sub);
binary_op!(Mul, mul, Mul);
binary_op!(Div, div, Div);

impl ops::Neg for Expr {
	type Output = Expr;

	fn neg(self) -> Expr {
		Expr::Neg(Box::new(self))
	}
}

impl fmt::Display for Expr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Constant(value) => write!(f, "{value}"),
			Self::Controller(name) => write!(f, "%{name}"),
			Self::Flex(name) => write!(f, "{name}"),
			Self::Add(a, b) => write!(f, "({a} + {b})"),
			Self::Sub(a, b) => write!(f, "({a} - {b})"),
			Self::Mul(a, b) => write!(f, "({a} * {b})"),
			Self::Div(a, b) => write!(f, "({a} / {b})"),
			Self::Max(a, b) => write!(f, "max({a}, {b})"),
			Self::Min(a, b) => write!(f, "min({a}, {b})"),
			Self::Neg(a) => write!(f, "-{a}"),
			Self::Combo(items) if items.is_empty() => write!(f, "0"),
			Self::Combo(items) => write_joined(f, items, " * "),
			Self::Dominate(items) => match items.split_first() {
				Some((first, rest)) => {
					write!(f, "({first} * (1 - ")?;
					write_joined(f, rest, " * ")?;
					write!(f, "))")
				}
				None => write!(f, "0"),
			},
		}
	}
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
	write!(f, "(")?;
	for (idx, item) in items.iter().enumerate() {
		if idx > 0 {
			write!(f, "{sep}")?;
		}
		write!(f, "{item}")?;
	}
	write!(f, ")")
}

/// Controller and flex values used by [`Expr::evaluate`].
#[derive(Debug, Clone, Default)]
pub struct FlexEnv {
	/// Controller values by name.
	pub controllers: HashMap<String, f32>,
	/// Flex values by name.
	pub flexes: HashMap<String, f32>,
}

impl FlexEnv {
	/// Empty environment.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set a controller value.
	pub fn set_controller(&mut self, name: &str, value: f32) -> &mut Self {
		self.controllers.insert(name.to_owned(), value);
		self
	}

	/// Set a flex value.
	pub fn set_flex(&mut self, name: &str, value: f32) -> &mut Self {
		self.flexes.insert(name.to_owned(), value);
		self
	}
}
