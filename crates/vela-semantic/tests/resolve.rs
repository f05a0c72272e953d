//! Name resolution: ordering, imports, hierarchy, and user types.

mod common;

use common::*;
use vela_diag::DiagCode;
use vela_semantic::SymbolKind;
use vela_source::{FileId, TextRange};
use vela_syntax::{
    BinaryOp, Declarator, EnumMemberSyntax, Expr, ImportDecl, ImportName, Item, ItemKind,
    ModuleDecl, PackageDecl, ParamDecl, StructFieldSyntax, SyntaxTree, TypeSyntax, TypeSyntaxKind,
    TypedefDecl,
};

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

fn package(name: &str, body: Vec<Item>) -> Item {
    Item::new(ItemKind::Package(PackageDecl {
        name: name.into(),
        name_range: TextRange::default(),
        body,
    }))
}

fn int_param(name: &str, init: Expr) -> Item {
    Item::new(ItemKind::Param(ParamDecl::parameter(
        TypeSyntax::int(),
        name,
        init,
    )))
}

#[test]
fn declared_after_is_invisible() {
    // parameter B = C + 1; parameter C = 2; -- C is not yet visible.
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            int_param(
                "B",
                Expr::binary(BinaryOp::Add, Expr::name("C").with_range(range(10, 11)), Expr::int(1)),
            ),
            int_param("C", Expr::int(2)),
        ],
    ));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::USED_BEFORE_DECLARED));
}

#[test]
fn declared_before_resolves() {
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            int_param("C", Expr::int(2)),
            int_param("B", Expr::binary(BinaryOp::Add, Expr::name("C"), Expr::int(1))),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "B"), 3);
}

#[test]
fn undeclared_identifier_gets_typo_note() {
    // parameter width = 4; parameter P = widht;
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            int_param("width", Expr::int(4)),
            int_param("P", Expr::name("widht").with_range(range(30, 35))),
        ],
    ));
    let diags = comp.get_semantic_diagnostics();
    let diag = diags
        .iter()
        .find(|d| d.code == DiagCode::UNDECLARED_IDENTIFIER)
        .expect("undeclared diagnostic");
    assert!(diag.notes.iter().any(|n| n.message.contains("width")));
}

#[test]
fn typo_correction_respects_budget() {
    let options = vela_semantic::Options {
        typo_correction_limit: 0,
        ..Default::default()
    };
    let mut comp = compile_with(
        options,
        vec![module_tree(
            0,
            ModuleDecl::module(
                "m",
                vec![
                    int_param("width", Expr::int(4)),
                    int_param("P", Expr::name("widht").with_range(range(30, 35))),
                ],
            ),
        )],
    );
    let diags = comp.get_semantic_diagnostics();
    let diag = diags
        .iter()
        .find(|d| d.code == DiagCode::UNDECLARED_IDENTIFIER)
        .expect("undeclared diagnostic");
    assert!(diag.notes.is_empty());
}

#[test]
fn explicit_import_resolves_package_member() {
    // package pkg; parameter W = 8; endpackage
    // module m; import pkg::W; parameter P = W; endmodule
    let tree = SyntaxTree::new(
        FileId(0),
        vec![
            package("pkg", vec![int_param("W", Expr::int(8))]),
            Item::new(ItemKind::Module(ModuleDecl::module(
                "m",
                vec![
                    Item::new(ItemKind::Import(ImportDecl {
                        package: "pkg".into(),
                        name: ImportName::Explicit("W".into()),
                    })),
                    int_param("P", Expr::name("W")),
                ],
            ))),
        ],
    );
    let comp = compile(vec![tree]);
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 8);
}

#[test]
fn wildcard_import_resolves_package_member() {
    let tree = SyntaxTree::new(
        FileId(0),
        vec![
            package("pkg", vec![int_param("W", Expr::int(16))]),
            Item::new(ItemKind::Module(ModuleDecl::module(
                "m",
                vec![
                    Item::new(ItemKind::Import(ImportDecl {
                        package: "pkg".into(),
                        name: ImportName::Wildcard,
                    })),
                    int_param("P", Expr::name("W")),
                ],
            ))),
        ],
    );
    let comp = compile(vec![tree]);
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 16);
}

#[test]
fn ambiguous_wildcard_imports_diagnose() {
    // Two wildcard imports provide `W`.
    let tree = SyntaxTree::new(
        FileId(0),
        vec![
            package("pkg1", vec![int_param("W", Expr::int(1))]),
            package("pkg2", vec![int_param("W", Expr::int(2))]),
            Item::new(ItemKind::Module(ModuleDecl::module(
                "m",
                vec![
                    Item::new(ItemKind::Import(ImportDecl {
                        package: "pkg1".into(),
                        name: ImportName::Wildcard,
                    })),
                    Item::new(ItemKind::Import(ImportDecl {
                        package: "pkg2".into(),
                        name: ImportName::Wildcard,
                    })),
                    int_param("P", Expr::name("W").with_range(range(50, 51))),
                ],
            ))),
        ],
    );
    let mut comp = compile(vec![tree]);
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::AMBIGUOUS_WILDCARD_IMPORT));
}

#[test]
fn local_declaration_shadows_wildcard_import() {
    let tree = SyntaxTree::new(
        FileId(0),
        vec![
            package("pkg", vec![int_param("W", Expr::int(1))]),
            Item::new(ItemKind::Module(ModuleDecl::module(
                "m",
                vec![
                    Item::new(ItemKind::Import(ImportDecl {
                        package: "pkg".into(),
                        name: ImportName::Wildcard,
                    })),
                    int_param("W", Expr::int(42)),
                    int_param("P", Expr::name("W")),
                ],
            ))),
        ],
    );
    let comp = compile(vec![tree]);
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 42);
}

#[test]
fn package_scoped_reference_resolves() {
    // parameter P = pkg::W;
    let tree = SyntaxTree::new(
        FileId(0),
        vec![
            package("pkg", vec![int_param("W", Expr::int(9))]),
            Item::new(ItemKind::Module(ModuleDecl::module(
                "m",
                vec![int_param("P", Expr::scoped("pkg", "W"))],
            ))),
        ],
    );
    let comp = compile(vec![tree]);
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 9);
}

#[test]
fn hierarchical_name_rejected_in_constant_context() {
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![int_param(
            "P",
            Expr::hier_name(&["a", "b", "c"]).with_range(range(20, 25)),
        )],
    ));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(
        &diags,
        DiagCode::HIERARCHICAL_NOT_ALLOWED_IN_CONSTANT
    ));
}

#[test]
fn typedef_resolves_as_type() {
    // typedef logic [7:0] byte_t; parameter byte_t P = 255;
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Typedef(TypedefDecl {
                name: "byte_t".into(),
                name_range: TextRange::default(),
                ty: TypeSyntax::logic_vec(7, 0),
            })),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::named("byte_t"),
                "P",
                Expr::int(255),
            ))),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    let v = param_value(&comp, scope, "P");
    let v = v.integer().expect("integer");
    assert_eq!(v.width(), 8);
    assert_eq!(v.to_u64(), Some(255));
}

#[test]
fn value_used_as_type_diagnoses() {
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            int_param("W", Expr::int(4)),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::named("W").with_range(range(40, 41)),
                "P",
                Expr::int(1),
            ))),
        ],
    ));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::NOT_A_TYPE));
}

#[test]
fn enum_members_are_visible_in_scope() {
    // typedef enum { A, B = 5, C } mode_t; parameter P = C;
    let members = vec![
        EnumMemberSyntax::new("A", None),
        EnumMemberSyntax::new("B", Some(Expr::int(5))),
        EnumMemberSyntax::new("C", None),
    ];
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Typedef(TypedefDecl {
                name: "mode_t".into(),
                name_range: TextRange::default(),
                ty: TypeSyntax::new(TypeSyntaxKind::Enum {
                    base: None,
                    members,
                }),
            })),
            int_param("P", Expr::name("C")),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 6);
}

#[test]
fn enum_methods_fold() {
    // parameter P = C.num() via a method call on an enum value.
    let members = vec![
        EnumMemberSyntax::new("A", None),
        EnumMemberSyntax::new("B", None),
        EnumMemberSyntax::new("C", None),
    ];
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Typedef(TypedefDecl {
                name: "mode_t".into(),
                name_range: TextRange::default(),
                ty: TypeSyntax::new(TypeSyntaxKind::Enum {
                    base: None,
                    members,
                }),
            })),
            int_param("P", Expr::method_call(Expr::name("A"), "num", Vec::new())),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 3);
}

#[test]
fn struct_member_access_folds() {
    // typedef struct packed { logic [7:0] hi; logic [7:0] lo; } pair_t;
    // parameter pair_t P = '{8'h12, 8'h34}; parameter Q = P.hi;
    let fields = vec![
        StructFieldSyntax::new("hi", TypeSyntax::logic_vec(7, 0)),
        StructFieldSyntax::new("lo", TypeSyntax::logic_vec(7, 0)),
    ];
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Typedef(TypedefDecl {
                name: "pair_t".into(),
                name_range: TextRange::default(),
                ty: TypeSyntax::new(TypeSyntaxKind::Struct {
                    packed: true,
                    signed: None,
                    is_union: false,
                    fields,
                }),
            })),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::named("pair_t"),
                "P",
                Expr::new(vela_syntax::ExprKind::SimplePattern(vec![
                    Expr::int_literal(Some(8), false, vela_syntax::LiteralBase::Hex, "12"),
                    Expr::int_literal(Some(8), false, vela_syntax::LiteralBase::Hex, "34"),
                ])),
            ))),
            int_param("Q", Expr::member(Expr::name("P"), "hi")),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "Q"), 0x12);
}

#[test]
fn duplicate_members_diagnose() {
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Param(ParamDecl {
                is_local: false,
                is_port: false,
                ty: TypeSyntax::int(),
                declarators: vec![
                    Declarator::new("P", Some(Expr::int(1))).with_name_range(range(5, 6))
                ],
            })),
            Item::new(ItemKind::Param(ParamDecl {
                is_local: false,
                is_port: false,
                ty: TypeSyntax::int(),
                declarators: vec![
                    Declarator::new("P", Some(Expr::int(2))).with_name_range(range(20, 21))
                ],
            })),
        ],
    ));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::DUPLICATE_MEMBER));
}

#[test]
fn variable_read_in_constant_context_diagnoses() {
    // module m; logic [3:0] a; initial a = 4'bxx10;
    // parameter P = a; -- the store binds, the read does not fold.
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Var(vela_syntax::VarDecl {
                ty: TypeSyntax::logic_vec(3, 0),
                declarators: vec![Declarator::new("a", None)],
            })),
            Item::new(ItemKind::Initial(vela_syntax::InitialBlock {
                body: vec![vela_syntax::Stmt::expr(Expr::assign(
                    Expr::name("a"),
                    Expr::int_literal(Some(4), false, vela_syntax::LiteralBase::Binary, "xx10"),
                ))],
            })),
            int_param("P", Expr::name("a").with_range(range(60, 61))),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    assert!(param_errored(&comp, scope, "P"));
    let diags = comp.get_semantic_diagnostics();
    // The lvalue store itself is fine; only the constant read errors.
    assert!(!has_code(&diags, DiagCode::NOT_AN_LVALUE));
    assert!(has_code(&diags, DiagCode::NOT_A_CONSTANT));
}

#[test]
fn assignment_to_parameter_is_not_an_lvalue() {
    // initial P = 1; where P is a parameter.
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            int_param("P", Expr::int(1)),
            Item::new(ItemKind::Initial(vela_syntax::InitialBlock {
                body: vec![vela_syntax::Stmt::expr(Expr::assign(
                    Expr::name("P"),
                    Expr::int(2),
                ))],
            })),
        ],
    ));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::NOT_AN_LVALUE));
}

#[test]
fn generate_block_scope_is_queryable() {
    // if (1) begin : g parameter int P = 3; end
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![Item::new(ItemKind::GenerateIf(vela_syntax::GenerateIf {
            condition: Expr::int(1),
            then_block: vela_syntax::GenerateBlock::named(
                "g",
                vec![int_param("P", Expr::int(3))],
            ),
            else_block: None,
        }))],
    ));
    let scope = top_body_scope(&comp, "m");
    let block = member(&comp, scope, "g");
    let SymbolKind::GenerateBlock { scope: block_scope } = comp.symbol(block).kind else {
        panic!("expected a generate block");
    };
    assert_eq!(param_int(&comp, block_scope, "P"), 3);
}
