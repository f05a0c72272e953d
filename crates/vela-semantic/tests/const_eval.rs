//! End-to-end constant evaluation through parameter binding.

mod common;

use common::*;
use vela_diag::DiagCode;
use vela_semantic::Options;
use vela_syntax::{
    BinaryOp, Expr, FunctionArg, FunctionDecl, Item, ItemKind, LiteralBase, ModuleDecl, ParamDecl,
    Stmt, StmtKind, TypeSyntax, UnaryOp,
};

fn param_module(name: &str, ty: TypeSyntax, init: Expr) -> ModuleDecl {
    ModuleDecl::module(
        "m",
        vec![Item::new(ItemKind::Param(ParamDecl::parameter(
            ty, name, init,
        )))],
    )
}

#[test]
fn int_parameter_folds_addition() {
    // module m; parameter int P = 3 + 4; endmodule
    let comp = single_module(param_module(
        "P",
        TypeSyntax::int(),
        Expr::binary(BinaryOp::Add, Expr::int(3), Expr::int(4)),
    ));
    let scope = top_body_scope(&comp, "m");
    let value = param_value(&comp, scope, "P");
    let v = value.integer().expect("integer");
    assert_eq!(v.to_i64(), Some(7));
    assert_eq!(v.width(), 32);
    assert!(v.is_signed());
}

#[test]
fn division_by_zero_diagnoses_and_marks_errored() {
    // module m; parameter int P = 1 / 0; endmodule
    let mut comp = single_module(param_module(
        "P",
        TypeSyntax::int(),
        Expr::binary(BinaryOp::Divide, Expr::int(1), Expr::int(0)),
    ));
    let scope = top_body_scope(&comp, "m");
    assert!(param_errored(&comp, scope, "P"));
    let value = param_value(&comp, scope, "P");
    assert!(value.integer().expect("integer").has_unknown());
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::DIVIDE_BY_ZERO));
}

#[test]
fn literal_round_trips_width_sign_and_bits() {
    // parameter P = 8'hFF, implicit type.
    let comp = single_module(param_module(
        "P",
        TypeSyntax::implicit(),
        Expr::int_literal(Some(8), false, LiteralBase::Hex, "FF"),
    ));
    let scope = top_body_scope(&comp, "m");
    let v = param_value(&comp, scope, "P");
    let v = v.integer().expect("integer");
    assert_eq!(v.width(), 8);
    assert!(!v.is_signed());
    assert_eq!(v.to_u64(), Some(255));
}

#[test]
fn signed_based_literal_round_trips() {
    // parameter P = 4'sb1010 (negative six).
    let comp = single_module(param_module(
        "P",
        TypeSyntax::implicit(),
        Expr::int_literal(Some(4), true, LiteralBase::Binary, "1010"),
    ));
    let scope = top_body_scope(&comp, "m");
    let v = param_value(&comp, scope, "P");
    let v = v.integer().expect("integer");
    assert_eq!(v.width(), 4);
    assert!(v.is_signed());
    assert_eq!(v.to_i64(), Some(-6));
}

#[test]
fn parameter_chain_folds() {
    // parameter A = 8; parameter B = A - 1;
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "A",
                Expr::int(8),
            ))),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "B",
                Expr::binary(BinaryOp::Subtract, Expr::name("A"), Expr::int(1)),
            ))),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "B"), 7);
}

#[test]
fn conditional_and_comparison_fold() {
    // parameter P = (3 < 4) ? 10 : 20;
    let comp = single_module(param_module(
        "P",
        TypeSyntax::int(),
        Expr::conditional(
            Expr::binary(BinaryOp::LessThan, Expr::int(3), Expr::int(4)),
            Expr::int(10),
            Expr::int(20),
        ),
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 10);
}

#[test]
fn shift_and_bitwise_fold() {
    // parameter P = (1 << 4) | 4'b0011;
    let comp = single_module(param_module(
        "P",
        TypeSyntax::int(),
        Expr::binary(
            BinaryOp::BinaryOr,
            Expr::binary(BinaryOp::LogicalShiftLeft, Expr::int(1), Expr::int(4)),
            Expr::int_literal(Some(4), false, LiteralBase::Binary, "0011"),
        ),
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 19);
}

#[test]
fn concat_and_replication_fold() {
    // parameter P = {2{4'hA}}; // 8'hAA
    let comp = single_module(param_module(
        "P",
        TypeSyntax::implicit(),
        Expr::replication(
            Expr::int(2),
            vec![Expr::int_literal(Some(4), false, LiteralBase::Hex, "A")],
        ),
    ));
    let scope = top_body_scope(&comp, "m");
    let v = param_value(&comp, scope, "P");
    let v = v.integer().expect("integer");
    assert_eq!(v.width(), 8);
    assert_eq!(v.to_u64(), Some(0xAA));
}

#[test]
fn clog2_system_function() {
    let comp = single_module(param_module(
        "P",
        TypeSyntax::int(),
        Expr::system_call("clog2", vec![Expr::int(256)]),
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 8);
}

#[test]
fn bits_of_data_type() {
    // parameter P = $bits(logic [7:0]);
    let comp = single_module(param_module(
        "P",
        TypeSyntax::int(),
        Expr::system_call(
            "bits",
            vec![Expr::new(vela_syntax::ExprKind::DataType(Box::new(
                TypeSyntax::logic_vec(7, 0),
            )))],
        ),
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 8);
}

/// function int f(int n); return n <= 0 ? 0 : f(n - 1) + 1; endfunction
fn recursive_count_fn() -> FunctionDecl {
    FunctionDecl::new(
        "f",
        Some(TypeSyntax::int()),
        vec![FunctionArg::input("n", TypeSyntax::int())],
        vec![Stmt::ret(Some(Expr::conditional(
            Expr::binary(BinaryOp::LessThanEqual, Expr::name("n"), Expr::int(0)),
            Expr::int(0),
            Expr::binary(
                BinaryOp::Add,
                Expr::call(
                    "f",
                    vec![Expr::binary(BinaryOp::Subtract, Expr::name("n"), Expr::int(1))],
                ),
                Expr::int(1),
            ),
        )))],
    )
}

#[test]
fn constant_function_evaluates() {
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Function(recursive_count_fn())),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "P",
                Expr::call("f", vec![Expr::int(5)]),
            ))),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 5);
}

#[test]
fn deep_recursion_hits_depth_budget_without_overflow() {
    // parameter P = f(1_000_000) recurses far past the depth cap.
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Function(recursive_count_fn())),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "P",
                Expr::call("f", vec![Expr::int(1_000_000)]),
            ))),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    assert!(param_errored(&comp, scope, "P"));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::EVAL_DEPTH_LIMIT));
    // The backtrace is bounded by max_constexpr_backtrace plus the
    // trailing elision note.
    let diag = diags
        .iter()
        .find(|d| d.code == DiagCode::EVAL_DEPTH_LIMIT)
        .expect("depth diagnostic");
    assert!(diag.notes.len() <= 11);
}

#[test]
fn runaway_loop_hits_step_budget() {
    // function int f(); int j; for (int i = 0; ; i++) j++; endfunction
    let body = vec![
        Stmt::var("j", TypeSyntax::int(), Some(Expr::int(0))),
        Stmt::new(StmtKind::For {
            init: vec![Stmt::var("i", TypeSyntax::int(), Some(Expr::int(0)))],
            cond: None,
            steps: vec![Expr::unary(UnaryOp::Postincrement, Expr::name("i"))],
            body: Box::new(Stmt::expr(Expr::unary(
                UnaryOp::Postincrement,
                Expr::name("j"),
            ))),
        }),
        Stmt::ret(Some(Expr::name("j"))),
    ];
    let options = Options {
        max_constexpr_steps: 2000,
        ..Options::default()
    };
    let mut comp = compile_with(
        options,
        vec![module_tree(
            0,
            ModuleDecl::module(
                "m",
                vec![
                    Item::new(ItemKind::Function(FunctionDecl::new(
                        "f",
                        Some(TypeSyntax::int()),
                        Vec::new(),
                        body,
                    ))),
                    Item::new(ItemKind::Param(ParamDecl::parameter(
                        TypeSyntax::int(),
                        "P",
                        Expr::call("f", Vec::new()),
                    ))),
                ],
            ),
        )],
    );
    let scope = top_body_scope(&comp, "m");
    assert!(param_errored(&comp, scope, "P"));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::EVAL_STEP_LIMIT));
}

#[test]
fn function_locals_support_compound_assignment() {
    // function int f(int n); int acc = 1; while (n > 0) begin
    //   acc *= n; n -= 1; end return acc; endfunction
    // parameter P = f(5); // 120
    let body = vec![
        Stmt::var("acc", TypeSyntax::int(), Some(Expr::int(1))),
        Stmt::new(StmtKind::While {
            cond: Expr::binary(BinaryOp::GreaterThan, Expr::name("n"), Expr::int(0)),
            body: Box::new(Stmt::block(vec![
                Stmt::expr(Expr::compound_assign(
                    BinaryOp::Multiply,
                    Expr::name("acc"),
                    Expr::name("n"),
                )),
                Stmt::expr(Expr::compound_assign(
                    BinaryOp::Subtract,
                    Expr::name("n"),
                    Expr::int(1),
                )),
            ])),
        }),
        Stmt::ret(Some(Expr::name("acc"))),
    ];
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Function(FunctionDecl::new(
                "f",
                Some(TypeSyntax::int()),
                vec![FunctionArg::input("n", TypeSyntax::int())],
                body,
            ))),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "P",
                Expr::call("f", vec![Expr::int(5)]),
            ))),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 120);
}

#[test]
fn xz_literal_propagates_through_arithmetic() {
    // parameter P = 4'bxx10 + 1 is all-X.
    let mut comp = single_module(param_module(
        "P",
        TypeSyntax::implicit(),
        Expr::binary(
            BinaryOp::Add,
            Expr::int_literal(Some(4), false, LiteralBase::Binary, "xx10"),
            Expr::int(1),
        ),
    ));
    let scope = top_body_scope(&comp, "m");
    let v = param_value(&comp, scope, "P");
    assert!(v.integer().expect("integer").has_unknown());
    // Unknown arithmetic is not an error by itself.
    let diags = comp.get_semantic_diagnostics();
    assert!(!has_code(&diags, DiagCode::NOT_A_CONSTANT));
}

#[test]
fn unbased_unsized_expands_to_target_width() {
    // parameter logic [7:0] P = '1;
    let comp = single_module(param_module(
        "P",
        TypeSyntax::logic_vec(7, 0),
        Expr::unbased(vela_syntax::UnbasedKind::One),
    ));
    let scope = top_body_scope(&comp, "m");
    let v = param_value(&comp, scope, "P");
    assert_eq!(v.integer().expect("integer").to_u64(), Some(0xFF));
}

#[test]
fn min_typ_max_selects_configured_branch() {
    let expr = Expr::new(vela_syntax::ExprKind::MinTypMax {
        min: Box::new(Expr::int(1)),
        typ: Box::new(Expr::int(2)),
        max: Box::new(Expr::int(3)),
    });
    let typ = single_module(param_module("P", TypeSyntax::int(), expr.clone()));
    let scope = top_body_scope(&typ, "m");
    assert_eq!(param_int(&typ, scope, "P"), 2);

    let options = Options {
        min_typ_max: vela_semantic::MinTypMax::Max,
        ..Options::default()
    };
    let max = compile_with(
        options,
        vec![module_tree(0, param_module("P", TypeSyntax::int(), expr))],
    );
    let scope = top_body_scope(&max, "m");
    assert_eq!(param_int(&max, scope, "P"), 3);
}

#[test]
fn part_select_of_parameter_folds() {
    // parameter logic [7:0] A = 8'hA5; parameter P = A[7:4];
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::logic_vec(7, 0),
                "A",
                Expr::int_literal(Some(8), false, LiteralBase::Hex, "A5"),
            ))),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::implicit(),
                "P",
                Expr::range_select(
                    Expr::name("A"),
                    vela_syntax::RangeSelectKind::Simple,
                    Expr::int(7),
                    Expr::int(4),
                ),
            ))),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    let v = param_value(&comp, scope, "P");
    let v = v.integer().expect("integer");
    assert_eq!(v.width(), 4);
    assert_eq!(v.to_u64(), Some(0xA));
}

#[test]
fn out_of_range_select_diagnoses() {
    // parameter logic [3:0] A = 0; parameter P = A[9];
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::logic_vec(3, 0),
                "A",
                Expr::int(0),
            ))),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::implicit(),
                "P",
                Expr::element_select(Expr::name("A"), Expr::int(9)),
            ))),
        ],
    ));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::SELECT_OUT_OF_RANGE));
}
