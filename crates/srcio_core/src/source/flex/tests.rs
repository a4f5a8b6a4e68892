use crate::source::flex::{FlexNames, FlexOp, FlexOpcode, FlexRule, compile_rule, compile_rules};
use crate::source::{Expr, FlexEnv, SourceError};

fn names() -> FlexNames {
	FlexNames {
		controllers: vec!["blink".to_owned(), "smile".to_owned(), "jaw".to_owned()],
		flexes: vec!["f_blink".to_owned(), "f_smile".to_owned(), "f_jaw".to_owned()],
	}
}

fn op(opcode: FlexOpcode, index: u32) -> FlexOp {
	FlexOp::indexed(opcode, index)
}

fn c(value: f32) -> FlexOp {
	FlexOp::constant(value)
}

#[test]
fn opcode_codes_round_trip() {
	for code in 1..=21 {
		let opcode = FlexOpcode::from_code(code).expect("known code");
		assert_eq!(opcode.code(), code);
	}
	assert_eq!(FlexOpcode::from_code(0), None);
	assert_eq!(FlexOpcode::from_code(22), None);
}

#[test]
fn adds_two_constants() {
	let expr = compile_rule(&[c(1.0), c(2.0), op(FlexOpcode::Add, 0)], &names()).expect("compiles");
	assert_eq!(expr, Expr::Constant(1.0) + Expr::Constant(2.0));
	assert_eq!(expr.to_string(), "(1 + 2)");
}

#[test]
fn binary_ops_pop_right_then_left() {
	let expr = compile_rule(&[op(FlexOpcode::Fetch1, 1), c(2.0), op(FlexOpcode::Sub, 0)], &names()).expect("compiles");
	assert_eq!(expr, Expr::controller("smile") - Expr::Constant(2.0));

	let expr = compile_rule(&[op(FlexOpcode::Fetch2, 2), c(4.0), op(FlexOpcode::Div, 0)], &names()).expect("compiles");
	let mut env = FlexEnv::new();
	env.set_flex("f_jaw", 2.0);
	assert_eq!(expr.evaluate(&env), 0.5);
}

#[test]
fn lone_binary_op_underflows() {
	let err = compile_rule(&[op(FlexOpcode::Add, 0)], &names()).expect_err("underflow");
	assert!(matches!(err, SourceError::MalformedExpression { op_index: 0, .. }));
}

#[test]
fn leftover_values_are_malformed() {
	let err = compile_rule(&[c(1.0), c(2.0)], &names()).expect_err("two values");
	assert!(matches!(err, SourceError::MalformedExpression { op_index: 2, .. }));

	let err = compile_rule(&[], &names()).expect_err("empty");
	assert!(matches!(err, SourceError::MalformedExpression { op_index: 0, .. }));
}

#[test]
fn unknown_and_unsupported_opcodes_are_malformed() {
	let unknown = FlexOp { code: 99, operand: 0 };
	let err = compile_rule(&[c(1.0), unknown], &names()).expect_err("unknown");
	assert!(matches!(err, SourceError::MalformedExpression { op_index: 1, .. }));

	let err = compile_rule(&[c(1.0), op(FlexOpcode::Exp, 0)], &names()).expect_err("unsupported");
	assert!(matches!(err, SourceError::MalformedExpression { op_index: 1, .. }));
}

#[test]
fn fetch_out_of_range_is_malformed() {
	let err = compile_rule(&[op(FlexOpcode::Fetch1, 7)], &names()).expect_err("bad controller");
	assert!(matches!(err, SourceError::MalformedExpression { op_index: 0, .. }));
}

#[test]
fn combo_keeps_stream_order() {
	let ops = [op(FlexOpcode::Fetch1, 0), op(FlexOpcode::Fetch1, 1), op(FlexOpcode::Fetch1, 2), op(FlexOpcode::Combo, 3)];
	let expr = compile_rule(&ops, &names()).expect("compiles");
	assert_eq!(
		expr,
		Expr::Combo(vec![Expr::controller("blink"), Expr::controller("smile"), Expr::controller("jaw")])
	);

	let mut env = FlexEnv::new();
	env.set_controller("blink", 0.5).set_controller("smile", 0.5).set_controller("jaw", 0.8);
	assert!((expr.evaluate(&env) - 0.2).abs() < 1e-6);
}

#[test]
fn empty_lists_evaluate_to_zero() {
	let combo = compile_rule(&[op(FlexOpcode::Combo, 0), c(1.0), op(FlexOpcode::Add, 0)], &names()).expect("compiles");
	assert_eq!(combo, Expr::Combo(Vec::new()) + Expr::Constant(1.0));
	assert_eq!(combo.evaluate(&FlexEnv::new()), 1.0);
	assert_eq!(combo.to_string(), "(0 + 1)");

	assert_eq!(Expr::Combo(Vec::new()).evaluate(&FlexEnv::new()), 0.0);
	assert_eq!(Expr::Dominate(Vec::new()).evaluate(&FlexEnv::new()), 0.0);
}

#[test]
fn dominate_pops_one_extra_value() {
	let ops = [op(FlexOpcode::Fetch2, 0), op(FlexOpcode::Fetch1, 1), op(FlexOpcode::Dominate, 1)];
	let expr = compile_rule(&ops, &names()).expect("compiles");
	assert_eq!(expr, Expr::Dominate(vec![Expr::flex("f_blink"), Expr::controller("smile")]));

	let mut env = FlexEnv::new();
	env.set_flex("f_blink", 0.8).set_controller("smile", 0.25);
	assert!((expr.evaluate(&env) - 0.6).abs() < 1e-6);
	assert_eq!(expr.to_string(), "(f_blink * (1 - (%smile)))");
}

#[test]
fn two_way_remaps_clamp_controller() {
	let left = compile_rule(&[op(FlexOpcode::TwoWay0, 0)], &names()).expect("compiles");
	let right = compile_rule(&[op(FlexOpcode::TwoWay1, 0)], &names()).expect("compiles");

	let mut env = FlexEnv::new();
	env.set_controller("blink", -0.25);
	assert_eq!(left.evaluate(&env), 0.25);
	assert_eq!(right.evaluate(&env), 0.0);

	env.set_controller("blink", 0.3);
	assert_eq!(left.evaluate(&env), 0.0);
	assert_eq!(right.evaluate(&env), 0.3);
}

#[test]
fn n_way_holds_between_inner_points() {
	let ops = [c(0.0), c(0.25), c(0.75), c(1.0), c(2.0), op(FlexOpcode::NWay, 1)];
	let expr = compile_rule(&ops, &names()).expect("compiles");
	assert!(matches!(expr, Expr::Mul(_, ref rhs) if **rhs == Expr::controller("smile")));

	let mut env = FlexEnv::new();
	env.set_controller("smile", 0.8).set_controller("jaw", 0.5);
	assert!((expr.evaluate(&env) - 0.8).abs() < 1e-6);

	env.set_controller("jaw", 2.0);
	assert_eq!(expr.evaluate(&env), 0.0);
}

#[test]
fn n_way_selector_must_be_constant() {
	let ops = [c(0.0), c(0.25), c(0.75), c(1.0), op(FlexOpcode::Fetch1, 2), op(FlexOpcode::NWay, 1)];
	let err = compile_rule(&ops, &names()).expect_err("selector");
	assert!(matches!(err, SourceError::MalformedExpression { op_index: 5, .. }));
}

#[test]
fn eyelid_ops_collapse_to_one() {
	for opcode in [FlexOpcode::DmeLowerEyelid, FlexOpcode::DmeUpperEyelid] {
		let expr = compile_rule(&[c(1.0), c(2.0), c(3.0), op(opcode, 0)], &names()).expect("compiles");
		assert_eq!(expr, Expr::Constant(1.0));
	}
}

#[test]
fn compile_rules_isolates_failures() {
	let rules = vec![
		FlexRule {
			flex_index: 0,
			ops: vec![op(FlexOpcode::Fetch1, 0)],
		},
		FlexRule {
			flex_index: 1,
			ops: vec![op(FlexOpcode::Mul, 0)],
		},
		FlexRule {
			flex_index: 9,
			ops: vec![c(1.0)],
		},
		FlexRule {
			flex_index: 0,
			ops: vec![op(FlexOpcode::Fetch1, 2)],
		},
	];
	let set = compile_rules(&rules, &names());
	assert_eq!(set.rules.len(), 1);
	assert_eq!(set.rules["f_blink"], Expr::controller("jaw"));
	assert_eq!(set.failures.len(), 2);
	assert_eq!(set.failures[0].flex_index, 1);
	assert_eq!(set.failures[1].flex_index, 9);
}

#[test]
fn expressions_serialize() {
	let expr = Expr::max(Expr::controller("jaw"), Expr::Constant(0.0));
	let json = serde_json::to_value(&expr).expect("serializes");
	assert_eq!(json, serde_json::json!({ "Max": [{ "Controller": "jaw" }, { "Constant": 0.0 }] }));
}
