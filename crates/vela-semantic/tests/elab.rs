//! Elaboration: top selection, instances, caching, overrides,
//! generate expansion, bind directives, and DPI checks.

mod common;

use common::*;
use vela_diag::DiagCode;
use vela_semantic::{Options, SymbolKind};
use vela_source::{FileId, LibraryName, TextRange};
use vela_syntax::{
    BindDirective, BindTarget, ConfigDecl, Declarator, DefparamDecl, DpiExport, Expr,
    FunctionDecl, GenerateFor, GenvarDecl, InstantiationDecl, Item, ItemKind, ModuleDecl,
    ParamAssignment, ParamDecl, SyntaxTree, TypeSyntax,
};

fn int_param(name: &str, init: Expr) -> Item {
    Item::new(ItemKind::Param(ParamDecl::parameter(
        TypeSyntax::int(),
        name,
        init,
    )))
}

fn int_param_port(name: &str, init: Expr) -> ParamDecl {
    ParamDecl {
        is_local: false,
        is_port: true,
        ty: TypeSyntax::int(),
        declarators: vec![Declarator::new(name, Some(init))],
    }
}

fn instance(module: &str, name: &str) -> Item {
    Item::new(ItemKind::Instance(InstantiationDecl::simple(module, name)))
}

#[test]
fn never_instantiated_modules_become_tops() {
    let tree = SyntaxTree::new(
        FileId(0),
        vec![
            Item::new(ItemKind::Module(ModuleDecl::module(
                "leaf",
                vec![int_param("P", Expr::int(1))],
            ))),
            Item::new(ItemKind::Module(ModuleDecl::module(
                "top",
                vec![instance("leaf", "u0")],
            ))),
        ],
    );
    let comp = compile(vec![tree]);
    let root = comp.root_scope();
    assert!(comp.lookup_member(root, "top").is_some());
    assert!(comp.lookup_member(root, "leaf").is_none());
}

#[test]
fn explicit_top_list_overrides_auto_selection() {
    let tree = SyntaxTree::new(
        FileId(0),
        vec![
            Item::new(ItemKind::Module(ModuleDecl::module("a", Vec::new()))),
            Item::new(ItemKind::Module(ModuleDecl::module("b", Vec::new()))),
        ],
    );
    let options = Options {
        top_modules: vec!["b".into()],
        ..Options::default()
    };
    let comp = compile_with(options, vec![tree]);
    let root = comp.root_scope();
    assert!(comp.lookup_member(root, "b").is_some());
    assert!(comp.lookup_member(root, "a").is_none());
}

#[test]
fn unknown_top_module_diagnoses() {
    let options = Options {
        top_modules: vec!["missing".into()],
        ..Options::default()
    };
    let mut comp = compile_with(
        options,
        vec![module_tree(0, ModuleDecl::module("m", Vec::new()))],
    );
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::UNKNOWN_TOP_MODULE));
}

#[test]
fn config_design_statement_selects_tops() {
    // config cfg1; design frob; endconfig, with top_modules = {"cfg1"}.
    let tree = SyntaxTree::new(
        FileId(0),
        vec![
            Item::new(ItemKind::Config(ConfigDecl {
                name: "cfg1".into(),
                name_range: TextRange::default(),
                design_cells: vec!["frob".into()],
            })),
            Item::new(ItemKind::Module(ModuleDecl::module("frob", Vec::new()))),
            Item::new(ItemKind::Module(ModuleDecl::module("bar", Vec::new()))),
        ],
    );
    let options = Options {
        top_modules: vec!["cfg1".into()],
        ..Options::default()
    };
    let comp = compile_with(options, vec![tree]);
    let root = comp.root_scope();
    assert_eq!(comp.scope(root).members.len(), 1);
    assert!(comp.lookup_member(root, "frob").is_some());
}

#[test]
fn library_order_picks_among_same_name_definitions() {
    // `mod` exists in lib1 (X=1) and lib2 (X=2); `top` instantiates it.
    let lib1 = module_tree(0, ModuleDecl::module("mod", vec![int_param("X", Expr::int(1))]))
        .with_library(LibraryName::new("lib1"));
    let lib2 = module_tree(1, ModuleDecl::module("mod", vec![int_param("X", Expr::int(2))]))
        .with_library(LibraryName::new("lib2"));
    let top = module_tree(2, ModuleDecl::module("top", vec![instance("mod", "m")]));

    // Default ordering: first-seen library wins.
    let comp = compile(vec![lib1.clone(), lib2.clone(), top.clone()]);
    let top_scope = top_body_scope(&comp, "top");
    let m = member(&comp, top_scope, "m");
    let m_scope = body_scope(&comp, m);
    assert_eq!(param_int(&comp, m_scope, "X"), 1);

    // Explicit ordering flips the winner.
    let options = Options {
        library_order: vec![LibraryName::new("lib2"), LibraryName::new("lib1")],
        ..Options::default()
    };
    let comp = compile_with(options, vec![lib1, lib2, top]);
    let top_scope = top_body_scope(&comp, "top");
    let m = member(&comp, top_scope, "m");
    let m_scope = body_scope(&comp, m);
    assert_eq!(param_int(&comp, m_scope, "X"), 2);
}

#[test]
fn parameter_port_overrides_apply_per_instance() {
    // module sub #(parameter int W = 4); endmodule
    // module top; sub #(.W(8)) u8(); sub u4(); endmodule
    let sub = ModuleDecl {
        param_ports: vec![int_param_port("W", Expr::int(4))],
        ..ModuleDecl::module("sub", Vec::new())
    };
    let mut with_override = InstantiationDecl::simple("sub", "u8");
    with_override.param_assignments.push(ParamAssignment {
        name: Some("W".into()),
        value: Expr::int(8),
        range: TextRange::default(),
    });
    let top = ModuleDecl::module(
        "top",
        vec![
            Item::new(ItemKind::Instance(with_override)),
            instance("sub", "u4"),
        ],
    );
    let comp = compile(vec![
        module_tree(0, sub),
        module_tree(1, top),
    ]);
    let top_scope = top_body_scope(&comp, "top");
    let u8_scope = body_scope(&comp, member(&comp, top_scope, "u8"));
    let u4_scope = body_scope(&comp, member(&comp, top_scope, "u4"));
    assert_eq!(param_int(&comp, u8_scope, "W"), 8);
    assert_eq!(param_int(&comp, u4_scope, "W"), 4);

    let u8_sym = member(&comp, u8_scope, "W");
    let SymbolKind::Parameter(info) = &comp.symbol(u8_sym).kind else {
        panic!("parameter");
    };
    assert!(info.overridden);
}

#[test]
fn identical_instances_share_a_body() {
    let sub = ModuleDecl::module("sub", vec![int_param("P", Expr::int(1))]);
    let top = ModuleDecl::module(
        "top",
        vec![instance("sub", "u0"), instance("sub", "u1")],
    );
    let comp = compile(vec![module_tree(0, sub), module_tree(1, top)]);
    let top_scope = top_body_scope(&comp, "top");
    let u0 = member(&comp, top_scope, "u0");
    let u1 = member(&comp, top_scope, "u1");
    let (SymbolKind::Instance { body: b0, .. }, SymbolKind::Instance { body: b1, .. }) =
        (&comp.symbol(u0).kind, &comp.symbol(u1).kind)
    else {
        panic!("instances");
    };
    assert_eq!(b0, b1);
    assert_eq!(comp.get_parent_instances(*b0).len(), 2);
}

#[test]
fn differing_parameters_get_distinct_bodies() {
    let sub = ModuleDecl {
        param_ports: vec![int_param_port("W", Expr::int(4))],
        ..ModuleDecl::module("sub", Vec::new())
    };
    let mut narrow = InstantiationDecl::simple("sub", "u4");
    narrow.param_assignments.push(ParamAssignment {
        name: Some("W".into()),
        value: Expr::int(4),
        range: TextRange::default(),
    });
    let mut wide = InstantiationDecl::simple("sub", "u8");
    wide.param_assignments.push(ParamAssignment {
        name: Some("W".into()),
        value: Expr::int(8),
        range: TextRange::default(),
    });
    let top = ModuleDecl::module(
        "top",
        vec![
            Item::new(ItemKind::Instance(narrow)),
            Item::new(ItemKind::Instance(wide)),
        ],
    );
    let comp = compile(vec![module_tree(0, sub), module_tree(1, top)]);
    let top_scope = top_body_scope(&comp, "top");
    let (SymbolKind::Instance { body: b0, .. }, SymbolKind::Instance { body: b1, .. }) = (
        &comp.symbol(member(&comp, top_scope, "u4")).kind,
        &comp.symbol(member(&comp, top_scope, "u8")).kind,
    ) else {
        panic!("instances");
    };
    assert_ne!(b0, b1);
}

#[test]
fn caching_can_be_disabled() {
    let sub = ModuleDecl::module("sub", Vec::new());
    let top = ModuleDecl::module(
        "top",
        vec![instance("sub", "u0"), instance("sub", "u1")],
    );
    let options = Options {
        disable_instance_caching: true,
        ..Options::default()
    };
    let comp = compile_with(options, vec![module_tree(0, sub), module_tree(1, top)]);
    let top_scope = top_body_scope(&comp, "top");
    let (SymbolKind::Instance { body: b0, .. }, SymbolKind::Instance { body: b1, .. }) = (
        &comp.symbol(member(&comp, top_scope, "u0")).kind,
        &comp.symbol(member(&comp, top_scope, "u1")).kind,
    ) else {
        panic!("instances");
    };
    assert_ne!(b0, b1);
}

#[test]
fn recursive_instantiation_hits_depth_limit() {
    // module loop; loop inner(); endmodule
    let decl = ModuleDecl::module("looped", vec![instance("looped", "inner")]);
    let options = Options {
        max_instance_depth: 16,
        top_modules: vec!["looped".into()],
        ..Options::default()
    };
    let mut comp = compile_with(options, vec![module_tree(0, decl)]);
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::MAX_INSTANCE_DEPTH_EXCEEDED));
}

#[test]
fn command_line_override_reaches_top_parameters() {
    let decl = ModuleDecl {
        param_ports: vec![int_param_port("P", Expr::int(3))],
        ..ModuleDecl::module("m", Vec::new())
    };
    let options = Options {
        param_overrides: vec!["P=7".into()],
        ..Options::default()
    };
    let comp = compile_with(options, vec![module_tree(0, decl)]);
    let scope = top_body_scope(&comp, "m");
    assert_eq!(param_int(&comp, scope, "P"), 7);
}

#[test]
fn defparam_overrides_nested_parameter() {
    // module sub; parameter int P = 1; endmodule
    // module top; sub m1(); defparam m1.P = 5; endmodule
    let sub = ModuleDecl::module("sub", vec![int_param("P", Expr::int(1))]);
    let top = ModuleDecl::module(
        "top",
        vec![
            instance("sub", "m1"),
            Item::new(ItemKind::Defparam(DefparamDecl {
                path: vec!["m1".into(), "P".into()],
                path_range: TextRange::default(),
                value: Expr::int(5),
            })),
        ],
    );
    let comp = compile(vec![module_tree(0, sub), module_tree(1, top)]);
    let top_scope = top_body_scope(&comp, "top");
    let m1_scope = body_scope(&comp, member(&comp, top_scope, "m1"));
    assert_eq!(param_int(&comp, m1_scope, "P"), 5);
}

#[test]
fn generate_for_expands_iterations() {
    // for (genvar i = 0; i < 3; i = i + 1) begin : g
    //   parameter int P = i * 10; end
    let r#gen = GenerateFor {
        genvar: "i".into(),
        genvar_range: TextRange::default(),
        init: Expr::int(0),
        condition: Expr::binary(vela_syntax::BinaryOp::LessThan, Expr::name("i"), Expr::int(3)),
        step: Expr::assign(
            Expr::name("i"),
            Expr::binary(vela_syntax::BinaryOp::Add, Expr::name("i"), Expr::int(1)),
        ),
        body: vela_syntax::GenerateBlock::named(
            "g",
            vec![int_param(
                "P",
                Expr::binary(vela_syntax::BinaryOp::Multiply, Expr::name("i"), Expr::int(10)),
            )],
        ),
    };
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Genvar(GenvarDecl {
                names: vec![("i".into(), TextRange::default())],
            })),
            Item::new(ItemKind::GenerateFor(r#gen)),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    for i in 0..3 {
        let block = member(&comp, scope, &format!("g[{i}]"));
        let SymbolKind::GenerateBlock { scope: block_scope } = comp.symbol(block).kind else {
            panic!("generate block");
        };
        assert_eq!(param_int(&comp, block_scope, "P"), i * 10);
    }
    assert!(comp.lookup_member(scope, "g[3]").is_none());
}

#[test]
fn runaway_generate_loop_hits_step_limit() {
    // for (genvar i = 0; i >= 0; i = i + 0) ...
    let r#gen = GenerateFor {
        genvar: "i".into(),
        genvar_range: TextRange::default(),
        init: Expr::int(0),
        condition: Expr::binary(
            vela_syntax::BinaryOp::GreaterThanEqual,
            Expr::name("i"),
            Expr::int(0),
        ),
        step: Expr::assign(Expr::name("i"), Expr::name("i")),
        body: vela_syntax::GenerateBlock::named("g", Vec::new()),
    };
    let options = Options {
        max_generate_steps: 50,
        ..Options::default()
    };
    let mut comp = compile_with(
        options,
        vec![module_tree(
            0,
            ModuleDecl::module("m", vec![Item::new(ItemKind::GenerateFor(r#gen))]),
        )],
    );
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::MAX_GENERATE_STEPS_EXCEEDED));
}

#[test]
fn bind_directive_inserts_instance_into_target() {
    // bind sub: a monitor instance appears in every body of sub.
    let sub = ModuleDecl::module("sub", Vec::new());
    let monitor = ModuleDecl::module("monitor", vec![int_param("P", Expr::int(1))]);
    let top = ModuleDecl::module("top", vec![instance("sub", "u0")]);
    let bind = Item::new(ItemKind::Bind(BindDirective {
        target: BindTarget::Definition("sub".into()),
        instantiation: InstantiationDecl::simple("monitor", "mon"),
    }));
    let comp = compile(vec![
        module_tree(0, sub),
        module_tree(1, monitor),
        SyntaxTree::new(FileId(2), vec![Item::new(ItemKind::Module(top)), bind]),
    ]);
    let top_scope = top_body_scope(&comp, "top");
    let sub_scope = body_scope(&comp, member(&comp, top_scope, "u0"));
    let mon = member(&comp, sub_scope, "mon");
    assert!(matches!(
        comp.symbol(mon).kind,
        SymbolKind::Instance { .. }
    ));
}

#[test]
fn path_bind_directive_targets_one_instance() {
    let sub = ModuleDecl::module("sub", Vec::new());
    let monitor = ModuleDecl::module("monitor", Vec::new());
    let top = ModuleDecl::module(
        "top",
        vec![instance("sub", "u0"), instance("sub", "u1")],
    );
    let bind = Item::new(ItemKind::Bind(BindDirective {
        target: BindTarget::Path(vec!["top".into(), "u0".into()]),
        instantiation: InstantiationDecl::simple("monitor", "mon"),
    }));
    let comp = compile(vec![
        module_tree(0, sub),
        module_tree(1, monitor),
        SyntaxTree::new(FileId(2), vec![Item::new(ItemKind::Module(top)), bind]),
    ]);
    let top_scope = top_body_scope(&comp, "top");
    let u0_scope = body_scope(&comp, member(&comp, top_scope, "u0"));
    assert!(comp.lookup_member(u0_scope, "mon").is_some());
}

#[test]
fn dpi_export_of_missing_subroutine_diagnoses() {
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![Item::new(ItemKind::DpiExport(DpiExport {
            spec: "DPI-C".into(),
            name: "ghost".into(),
            name_range: TextRange::default(),
        }))],
    ));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::DPI_EXPORT_UNKNOWN_SUBROUTINE));
}

#[test]
fn dpi_export_of_an_import_diagnoses() {
    let mut import = FunctionDecl::new("ffi", Some(TypeSyntax::int()), Vec::new(), Vec::new());
    import.dpi_import = Some("DPI-C".into());
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Function(import)),
            Item::new(ItemKind::DpiExport(DpiExport {
                spec: "DPI-C".into(),
                name: "ffi".into(),
                name_range: TextRange::default(),
            })),
        ],
    ));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::DPI_EXPORT_SIGNATURE_MISMATCH));
}

#[test]
fn unknown_module_instantiation_diagnoses() {
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![instance("does_not_exist", "u0")],
    ));
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::UNKNOWN_DEFINITION));
}

#[test]
fn error_limit_short_circuits_with_final_report() {
    let mut items = Vec::new();
    for i in 0..8 {
        let name = format!("P{i}");
        let missing = format!("missing{i}");
        items.push(Item::new(ItemKind::Param(ParamDecl::parameter(
            TypeSyntax::int(),
            &name,
            Expr::name(&missing).with_range(TextRange::new((i * 10).into(), (i * 10 + 5).into())),
        ))));
    }
    let options = Options {
        error_limit: 3,
        ..Options::default()
    };
    let mut comp = compile_with(
        options,
        vec![module_tree(0, ModuleDecl::module("m", items))],
    );
    let diags = comp.get_semantic_diagnostics();
    assert!(has_code(&diags, DiagCode::TOO_MANY_ERRORS));
    let undeclared = diags
        .iter()
        .filter(|d| d.code == DiagCode::UNDECLARED_IDENTIFIER)
        .count();
    assert!(undeclared < 8, "elaboration should have stopped early");
}
