//! Whole-compilation invariants: determinism, finalization, and type
//! interning.

mod common;

use common::*;
use vela_semantic::{Compilation, Options, ScopeId, SymbolKind, Type};
use vela_source::FileId;
use vela_syntax::{
    BinaryOp, Expr, InstantiationDecl, Item, ItemKind, ModuleDecl, ParamDecl, SyntaxTree,
    TypeSyntax,
};

fn sample_design() -> Vec<SyntaxTree> {
    let sub = ModuleDecl::module(
        "sub",
        vec![Item::new(ItemKind::Param(ParamDecl::parameter(
            TypeSyntax::int(),
            "P",
            Expr::binary(BinaryOp::Multiply, Expr::int(6), Expr::int(7)),
        )))],
    );
    let top = ModuleDecl::module(
        "top",
        vec![
            Item::new(ItemKind::Instance(InstantiationDecl::simple("sub", "u0"))),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "Q",
                Expr::name("missing"),
            ))),
        ],
    );
    vec![module_tree(0, sub), module_tree(1, top)]
}

/// Collect (name, kind discriminant) pairs for a scope subtree.
fn shape(comp: &Compilation, scope: ScopeId, out: &mut Vec<String>) {
    for &member in &comp.scope(scope).members {
        let sym = comp.symbol(member);
        out.push(format!("{} {:?}", sym.name, std::mem::discriminant(&sym.kind)));
        let inner = match &sym.kind {
            SymbolKind::Instance { body, .. } => comp.symbol(*body).kind.owned_scope(),
            other => other.owned_scope(),
        };
        if let Some(inner) = inner {
            shape(comp, inner, out);
        }
    }
}

#[test]
fn repeated_elaboration_is_deterministic() {
    let mut first = compile(sample_design());
    let mut second = compile(sample_design());

    assert_eq!(
        first.get_semantic_diagnostics(),
        second.get_semantic_diagnostics()
    );

    let mut shape_a = Vec::new();
    let mut shape_b = Vec::new();
    shape(&first, first.root_scope(), &mut shape_a);
    shape(&second, second.root_scope(), &mut shape_b);
    assert_eq!(shape_a, shape_b);
}

#[test]
fn add_syntax_tree_fails_after_finalization() {
    let mut comp = compile(vec![module_tree(0, ModuleDecl::module("m", Vec::new()))]);
    assert!(comp.is_finalized());
    let extra = SyntaxTree::new(FileId(9), Vec::new());
    assert!(comp.add_syntax_tree(extra).is_err());
}

#[test]
fn symbol_count_is_stable_after_finalization() {
    let mut comp = compile(vec![module_tree(0, ModuleDecl::module("m", Vec::new()))]);
    let count_before = comp.scope(comp.root_scope()).members.len();
    let _ = comp.get_root();
    let _ = comp.get_semantic_diagnostics();
    assert_eq!(comp.scope(comp.root_scope()).members.len(), count_before);
}

#[test]
fn type_interning_follows_structural_keys() {
    let mut comp = Compilation::new(Options::default());
    let a = comp.get_type(Type::PackedInteger {
        width: 8,
        signed: false,
        four_state: true,
        bounds: None,
    });
    let b = comp.get_type(Type::PackedInteger {
        width: 8,
        signed: false,
        four_state: true,
        bounds: None,
    });
    let c = comp.get_type(Type::PackedInteger {
        width: 9,
        signed: false,
        four_state: true,
        bounds: None,
    });
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn builtin_types_are_canonical() {
    let mut comp = Compilation::new(Options::default());
    let int = comp.get_type(Type::PackedInteger {
        width: 32,
        signed: true,
        four_state: false,
        bounds: None,
    });
    assert_eq!(int, comp.types().int_type());
}

#[test]
fn finalized_compilation_does_not_intern_new_types() {
    let mut comp = compile(vec![module_tree(0, ModuleDecl::module("m", Vec::new()))]);
    let novel = comp.get_type(Type::PackedInteger {
        width: 12345,
        signed: false,
        four_state: true,
        bounds: None,
    });
    assert_eq!(novel, comp.types().error_type());
}

#[test]
fn symbol_indices_increase_in_declaration_order() {
    let comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "A",
                Expr::int(1),
            ))),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "B",
                Expr::int(2),
            ))),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "C",
                Expr::int(3),
            ))),
        ],
    ));
    let scope = top_body_scope(&comp, "m");
    let indices: Vec<_> = comp
        .scope(scope)
        .members
        .iter()
        .map(|&m| comp.symbol(m).index)
        .collect();
    let mut sorted = indices.clone();
    sorted.sort();
    assert_eq!(indices, sorted);
    assert!(
        comp.symbol(member(&comp, scope, "A")).index
            < comp.symbol(member(&comp, scope, "B")).index
    );
}

#[test]
fn diagnostics_are_ordered_by_offset_within_a_file() {
    use vela_source::TextRange;
    let mut comp = single_module(ModuleDecl::module(
        "m",
        vec![
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "A",
                Expr::name("later").with_range(TextRange::new(90.into(), 95.into())),
            ))),
            Item::new(ItemKind::Param(ParamDecl::parameter(
                TypeSyntax::int(),
                "B",
                Expr::name("earlier").with_range(TextRange::new(10.into(), 17.into())),
            ))),
        ],
    ));
    let diags = comp.get_semantic_diagnostics();
    let offsets: Vec<u32> = diags
        .iter()
        .filter(|d| d.span.file == FileId(0))
        .map(|d| d.span.range.start().into())
        .collect();
    let mut sorted = offsets.clone();
    sorted.sort();
    assert_eq!(offsets, sorted);
}
