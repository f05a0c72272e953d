//! Shared fixture helpers: build syntax trees through the
//! `vela-syntax` constructors (the parser is an external
//! collaborator) and compile them.

#![allow(dead_code)]

use vela_diag::{DiagCode, Diagnostic};
use vela_semantic::{
    Compilation, ConstantValue, Options, ScopeId, SymbolId, SymbolKind,
};
use vela_source::FileId;
use vela_syntax::{Item, ItemKind, ModuleDecl, SyntaxTree};

pub fn compile(trees: Vec<SyntaxTree>) -> Compilation {
    compile_with(Options::default(), trees)
}

pub fn compile_with(options: Options, trees: Vec<SyntaxTree>) -> Compilation {
    let mut comp = Compilation::new(options);
    for tree in trees {
        comp.add_syntax_tree(tree).expect("tree accepted");
    }
    comp.get_root();
    comp
}

pub fn module_tree(file: u32, decl: ModuleDecl) -> SyntaxTree {
    SyntaxTree::new(FileId(file), vec![Item::new(ItemKind::Module(decl))])
}

pub fn single_module(decl: ModuleDecl) -> Compilation {
    compile(vec![module_tree(0, decl)])
}

/// The top instance with the given name under the root.
pub fn top_instance(comp: &Compilation, name: &str) -> SymbolId {
    comp.lookup_member(comp.root_scope(), name)
        .expect("top instance exists")
}

/// The body scope behind an instance symbol.
pub fn body_scope(comp: &Compilation, instance: SymbolId) -> ScopeId {
    let SymbolKind::Instance { body, .. } = comp.symbol(instance).kind else {
        panic!("not an instance");
    };
    let SymbolKind::InstanceBody { scope, .. } = comp.symbol(body).kind else {
        panic!("not an instance body");
    };
    scope
}

pub fn top_body_scope(comp: &Compilation, name: &str) -> ScopeId {
    let instance = top_instance(comp, name);
    body_scope(comp, instance)
}

pub fn member(comp: &Compilation, scope: ScopeId, name: &str) -> SymbolId {
    comp.lookup_member(scope, name)
        .unwrap_or_else(|| panic!("member `{name}` exists"))
}

pub fn param_value(comp: &Compilation, scope: ScopeId, name: &str) -> ConstantValue {
    let sym = member(comp, scope, name);
    let SymbolKind::Parameter(info) = &comp.symbol(sym).kind else {
        panic!("`{name}` is not a parameter");
    };
    info.value.clone().expect("parameter has a value")
}

pub fn param_int(comp: &Compilation, scope: ScopeId, name: &str) -> i64 {
    param_value(comp, scope, name)
        .integer()
        .expect("integer parameter")
        .to_i64()
        .expect("fully known value")
}

pub fn param_errored(comp: &Compilation, scope: ScopeId, name: &str) -> bool {
    let sym = member(comp, scope, name);
    let SymbolKind::Parameter(info) = &comp.symbol(sym).kind else {
        panic!("`{name}` is not a parameter");
    };
    info.errored
}

pub fn has_code(diags: &[Diagnostic], code: DiagCode) -> bool {
    diags.iter().any(|d| d.code == code)
}

pub fn codes(diags: &[Diagnostic]) -> Vec<DiagCode> {
    diags.iter().map(|d| d.code).collect()
}
