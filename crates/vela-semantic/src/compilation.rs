//! The compilation context: owner of all arenas and intern tables,
//! driver of elaboration, and the publication point for the root
//! symbol and diagnostics.
//!
//! A compilation moves through `Building -> Finalizing -> Finalized`.
//! Mutating entry points guard on the state; after finalization the
//! object is read-only and safe to share.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use smol_str::SmolStr;
use vela_arena::{Arena, Idx};
use vela_diag::{DiagCode, Diagnostic, Diagnostics};
use vela_source::{FileId, LibraryName, Span};
use vela_syntax::{
    BindTarget, DefinitionKind, Expr, Item, ItemKind, ModuleDecl, SyntaxTree, TypeSyntax,
};

use crate::bind;
use crate::expr::Expression;
use crate::scope::{Scope, ScopeId};
use crate::stmt::Statement;
use crate::symbols::{
    Definition, DefinitionId, ParamSig, ParameterInfo, Symbol, SymbolId, SymbolIndex, SymbolKind,
};
use crate::system::{MethodReceiver, SystemSubroutine};
use crate::types::{TypeId, TypeTable};
use crate::value::ConstantValue;

/// Which set of `min:typ:max` expressions to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinTypMax {
    Min,
    #[default]
    Typ,
    Max,
}

/// Options controlling compilation behavior. The driver normalizes
/// command-line flags into these fields before handing them over.
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum depth of nested module instances, to detect infinite
    /// recursion.
    pub max_instance_depth: u32,
    /// Maximum steps when expanding a single generate construct.
    pub max_generate_steps: u32,
    /// Maximum nesting of constant function calls.
    pub max_constexpr_depth: u32,
    /// Maximum evaluation steps for a single constant expression.
    pub max_constexpr_steps: u32,
    /// Call frames shown in constant-evaluation backtraces.
    pub max_constexpr_backtrace: u32,
    /// Fixed-point iterations for defparam resolution.
    pub max_defparam_steps: u32,
    /// Errors before elaboration short-circuits.
    pub error_limit: u32,
    /// Typo-correction attempts before giving up.
    pub typo_correction_limit: u32,
    pub min_typ_max: MinTypMax,
    /// Suppress errors that need an elaborated design.
    pub lint_mode: bool,
    pub suppress_unused: bool,
    /// Give every instance its own body.
    pub disable_instance_caching: bool,
    /// Explicit top modules; a name may designate a config block.
    pub top_modules: Vec<SmolStr>,
    /// `path=value` parameter overrides.
    pub param_overrides: Vec<String>,
    /// Library precedence for same-name definitions; empty means
    /// first-seen order.
    pub library_order: Vec<LibraryName>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_instance_depth: 512,
            max_generate_steps: 65535,
            max_constexpr_depth: 256,
            max_constexpr_steps: 100_000,
            max_constexpr_backtrace: 10,
            max_defparam_steps: 128,
            error_limit: 64,
            typo_correction_limit: 32,
            min_typ_max: MinTypMax::default(),
            lint_mode: false,
            suppress_unused: true,
            disable_instance_caching: false,
            top_modules: Vec::new(),
            param_overrides: Vec::new(),
            library_order: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Building,
    Finalizing,
    Finalized,
}

/// Parameters to override at and below one point of the hierarchy,
/// assembled from defparams and command-line overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamOverrideNode {
    pub overrides: HashMap<SmolStr, ConstantValue>,
    pub children: HashMap<SmolStr, ParamOverrideNode>,
}

impl ParamOverrideNode {
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.children.is_empty()
    }

    fn insert_path(&mut self, path: &[SmolStr], value: ConstantValue) {
        match path {
            [] => {}
            [param] => {
                self.overrides.insert(param.clone(), value);
            }
            [head, rest @ ..] => {
                self.children
                    .entry(head.clone())
                    .or_default()
                    .insert_path(rest, value);
            }
        }
    }
}

/// Declaration pieces held between scope population and binding.
#[derive(Debug)]
pub(crate) enum Pending {
    Param {
        ty: TypeSyntax,
        init: Option<Expr>,
        override_value: Option<ConstantValue>,
    },
    Var {
        ty: TypeSyntax,
        dims: Vec<vela_syntax::DimensionSyntax>,
        init: Option<Expr>,
    },
    Net {
        ty: TypeSyntax,
        init: Option<Expr>,
    },
    Typedef {
        ty: TypeSyntax,
    },
    Function {
        decl: Arc<vela_syntax::FunctionDecl>,
    },
}

/// Error returned when mutating a finalized compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyFinalized;

impl std::fmt::Display for AlreadyFinalized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "compilation has already been finalized")
    }
}

impl std::error::Error for AlreadyFinalized {}

pub struct Compilation {
    options: Options,
    state: State,
    pub(crate) types: TypeTable,
    symbols: Arena<Symbol>,
    scopes: Arena<Scope>,
    pub(crate) diags: Diagnostics,

    trees: Vec<SyntaxTree>,
    unit_scopes: Vec<ScopeId>,

    definitions: Vec<Definition>,
    definition_map: HashMap<(SmolStr, ScopeId), DefinitionId>,
    /// Top-level definitions per name, in registration order, with
    /// their library tags for `library_order` selection.
    top_definitions: HashMap<SmolStr, Vec<DefinitionId>>,
    /// First-seen order of libraries, the default precedence.
    libraries_seen: Vec<LibraryName>,

    packages: HashMap<SmolStr, SymbolId>,
    configs: HashMap<SmolStr, Vec<SmolStr>>,
    std_package: SymbolId,
    std_scope: ScopeId,

    /// Module names instantiated anywhere, collected syntactically;
    /// used for automatic top-module selection.
    instantiated_names: HashSet<SmolStr>,

    pub(crate) pending: HashMap<SymbolId, Pending>,

    system_subroutines: HashMap<SmolStr, Box<dyn SystemSubroutine>>,
    system_methods: HashMap<(MethodReceiver, SmolStr), Box<dyn SystemSubroutine>>,

    param_overrides: ParamOverrideNode,

    bind_directives: Vec<(Arc<vela_syntax::BindDirective>, FileId)>,
    binds_by_def: HashMap<SmolStr, Vec<u32>>,
    binds_by_path: Vec<(Vec<SmolStr>, u32)>,
    seen_bind_directives: HashSet<u32>,
    /// (directive, body) pairs already applied, enforcing exactly-once.
    applied_binds: HashSet<(u32, SymbolId)>,

    instance_cache: HashMap<crate::elab::InstanceCacheKey, SymbolId>,
    /// Bodies shared by more than one instance.
    body_instances: HashMap<SymbolId, Vec<SymbolId>>,

    dpi_imports: Vec<SymbolId>,
    dpi_exports: Vec<(vela_syntax::DpiExport, ScopeId, FileId)>,

    /// Bound procedural trees retained for the design tree.
    pub(crate) continuous_assigns: Vec<(SymbolId, Expression)>,
    pub(crate) initial_blocks: Vec<(SymbolId, Statement)>,

    /// `(* ... *)` attribute symbols keyed by the symbol they
    /// annotate.
    attribute_map: HashMap<SymbolId, Vec<SymbolId>>,

    typo_corrections: u32,
    too_many_errors: bool,

    /// Command-line overrides alone; defparams must not shadow them.
    cli_overrides: ParamOverrideNode,
    /// Defparam values gathered during one speculative elaboration,
    /// as (absolute path, value).
    pub(crate) collected_defparams: Vec<(Vec<SmolStr>, ConstantValue)>,
    /// Hierarchical path of the instance currently elaborating.
    pub(crate) current_path: Vec<SmolStr>,
    /// Definitions that produced at least one body.
    pub(crate) elaborated_defs: HashSet<DefinitionId>,
    /// Instance depth of the body currently elaborating.
    pub(crate) current_depth: u32,

    root: Option<SymbolId>,
    root_symbol: SymbolId,
    root_scope: ScopeId,

    cached_parse_diags: Option<Vec<Diagnostic>>,
    cached_semantic_diags: Option<Vec<Diagnostic>>,
}

impl Compilation {
    pub fn new(options: Options) -> Self {
        let types = TypeTable::new();
        let mut symbols = Arena::new();
        let mut scopes = Arena::new();

        let root_scope = scopes.alloc(Scope::new(None));
        let root = symbols.alloc(Symbol {
            kind: SymbolKind::Root { scope: root_scope },
            name: SmolStr::new("$root"),
            parent: None,
            index: SymbolIndex(0),
            span: Span::detached(FileId(0)),
        });
        scopes.get_mut(root_scope).owner = Some(root);

        // The built-in std package; reachable as the final step of
        // the lookup chain.
        let std_scope = scopes.alloc(Scope::new(None));
        let std_package = symbols.alloc(Symbol {
            kind: SymbolKind::Package { scope: std_scope },
            name: SmolStr::new("std"),
            parent: None,
            index: SymbolIndex(0),
            span: Span::detached(FileId(0)),
        });
        scopes.get_mut(std_scope).owner = Some(std_package);

        let mut packages = HashMap::new();
        packages.insert(SmolStr::new("std"), std_package);

        let mut comp = Self {
            options,
            state: State::Building,
            types,
            symbols,
            scopes,
            diags: Diagnostics::new(),
            trees: Vec::new(),
            unit_scopes: Vec::new(),
            definitions: Vec::new(),
            definition_map: HashMap::new(),
            top_definitions: HashMap::new(),
            libraries_seen: Vec::new(),
            packages,
            configs: HashMap::new(),
            std_package,
            std_scope,
            instantiated_names: HashSet::new(),
            pending: HashMap::new(),
            system_subroutines: HashMap::new(),
            system_methods: HashMap::new(),
            param_overrides: ParamOverrideNode::default(),
            bind_directives: Vec::new(),
            binds_by_def: HashMap::new(),
            binds_by_path: Vec::new(),
            seen_bind_directives: HashSet::new(),
            applied_binds: HashSet::new(),
            instance_cache: HashMap::new(),
            body_instances: HashMap::new(),
            dpi_imports: Vec::new(),
            dpi_exports: Vec::new(),
            continuous_assigns: Vec::new(),
            initial_blocks: Vec::new(),
            attribute_map: HashMap::new(),
            typo_corrections: 0,
            too_many_errors: false,
            cli_overrides: ParamOverrideNode::default(),
            collected_defparams: Vec::new(),
            current_path: Vec::new(),
            elaborated_defs: HashSet::new(),
            current_depth: 0,
            root: None,
            root_symbol: root,
            root_scope,
            cached_parse_diags: None,
            cached_semantic_diags: None,
        };
        crate::system::register_builtins(&mut comp);
        comp
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_finalized(&self) -> bool {
        self.state == State::Finalized
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Canonicalize a structural key and return the interned id.
    /// After finalization only existing types resolve; a novel key
    /// yields the error type rather than mutating the table.
    pub fn get_type(&mut self, ty: crate::types::Type) -> TypeId {
        if self.is_finalized() {
            return self
                .types
                .try_get(&ty)
                .unwrap_or_else(|| self.types.error_type());
        }
        self.types.intern(ty)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.symbols.get(id)
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        self.symbols.get_mut(id)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        self.scopes.get(id)
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        self.scopes.get_mut(id)
    }

    pub fn root_scope(&self) -> ScopeId {
        self.root_scope
    }

    pub fn definition(&self, id: DefinitionId) -> &Definition {
        &self.definitions[id.0 as usize]
    }

    pub fn package(&self, name: &str) -> Option<SymbolId> {
        self.packages.get(name).copied()
    }

    pub(crate) fn package_scope(&self, name: &str) -> Option<ScopeId> {
        let sym = self.packages.get(name)?;
        self.symbol(*sym).kind.owned_scope()
    }

    pub(crate) fn std_package_scope(&self) -> ScopeId {
        self.std_scope
    }

    /// Cooperatively abort a long-running elaboration by poisoning
    /// the diagnostics channel; traversals check the flag at their
    /// step increments.
    pub fn cancel(&mut self) {
        self.diags.poison();
    }

    pub(crate) fn take_typo_budget(&mut self) -> bool {
        if self.typo_corrections < self.options.typo_correction_limit {
            self.typo_corrections += 1;
            true
        } else {
            false
        }
    }

    /// Extension point: register a `$name` system subroutine.
    pub fn register_system_subroutine(&mut self, subroutine: Box<dyn SystemSubroutine>) {
        self.system_subroutines
            .insert(SmolStr::new(subroutine.name()), subroutine);
    }

    /// Extension point: register a built-in method on a type family.
    pub fn register_system_method(
        &mut self,
        receiver: MethodReceiver,
        method: Box<dyn SystemSubroutine>,
    ) {
        self.system_methods
            .insert((receiver, SmolStr::new(method.name())), method);
    }

    pub(crate) fn system_subroutine(&self, name: &str) -> Option<&dyn SystemSubroutine> {
        self.system_subroutines.get(name).map(|b| b.as_ref())
    }

    pub(crate) fn system_method(
        &self,
        receiver: MethodReceiver,
        name: &str,
    ) -> Option<&dyn SystemSubroutine> {
        self.system_methods
            .get(&(receiver, SmolStr::new(name)))
            .map(|b| b.as_ref())
    }

    // ------------------------------------------------------------------
    // Tree intake and definition registration
    // ------------------------------------------------------------------

    /// Append a parsed tree. Fails once the design is finalized.
    pub fn add_syntax_tree(&mut self, tree: SyntaxTree) -> Result<(), AlreadyFinalized> {
        if self.state != State::Building {
            return Err(AlreadyFinalized);
        }

        // One compilation unit per tree.
        let unit_scope = self.scopes.alloc(Scope::new(None));
        let unit = self.symbols.alloc(Symbol {
            kind: SymbolKind::CompilationUnit { scope: unit_scope },
            name: SmolStr::new("$unit"),
            parent: None,
            index: SymbolIndex(0),
            span: Span::detached(tree.file),
        });
        self.scopes.get_mut(unit_scope).owner = Some(unit);
        self.unit_scopes.push(unit_scope);

        if let Some(lib) = &tree.source_library
            && !self.libraries_seen.contains(lib)
        {
            self.libraries_seen.push(lib.clone());
        }

        let file = tree.file;
        let library = tree.source_library.clone();
        for item in &tree.members {
            self.register_root_item(item, unit_scope, file, &library);
        }
        self.collect_instantiated_names(&tree.members);
        self.collect_bind_directives(&tree.members, file);

        self.trees.push(tree);
        self.cached_parse_diags = None;
        Ok(())
    }

    fn register_root_item(
        &mut self,
        item: &Item,
        unit_scope: ScopeId,
        file: FileId,
        library: &Option<LibraryName>,
    ) {
        match &item.kind {
            ItemKind::Module(decl) => {
                let def_id = self.create_definition(unit_scope, decl, file, library, item.range);
                let def = &self.definitions[def_id.0 as usize];
                let name = def.name.clone();
                self.top_definitions.entry(name).or_default().push(def_id);
            }
            ItemKind::Package(decl) => {
                let pkg_scope = self.scopes.alloc(Scope::new(Some(unit_scope)));
                let index = self.scopes.get_mut(unit_scope).next_index();
                let pkg = self.symbols.alloc(Symbol {
                    kind: SymbolKind::Package { scope: pkg_scope },
                    name: decl.name.clone(),
                    parent: Some(unit_scope),
                    index,
                    span: Span::new(file, decl.name_range),
                });
                self.scopes.get_mut(pkg_scope).owner = Some(pkg);
                self.insert_member(unit_scope, pkg);
                self.packages.insert(decl.name.clone(), pkg);
                for member in &decl.body {
                    self.populate_item(pkg_scope, member, file);
                }
            }
            ItemKind::Config(decl) => {
                self.configs
                    .insert(decl.name.clone(), decl.design_cells.clone());
            }
            _ => {
                // Everything else is a compilation-unit member.
                self.populate_item(unit_scope, item, file);
            }
        }
    }

    /// Create a definition under the given scope; nested definitions
    /// shadow outer ones with the same name.
    pub(crate) fn create_definition(
        &mut self,
        scope: ScopeId,
        decl: &ModuleDecl,
        file: FileId,
        library: &Option<LibraryName>,
        range: vela_source::TextRange,
    ) -> DefinitionId {
        let key = (decl.name.clone(), scope);
        if let Some(&existing) = self.definition_map.get(&key) {
            // Same-name definitions in the same scope collide unless
            // they came from different libraries.
            if self.definitions[existing.0 as usize].library == *library {
                self.diags.add(Diagnostic::error(
                    DiagCode::DUPLICATE_DEFINITION,
                    Span::new(file, decl.name_range),
                    format!("duplicate definition of `{}`", decl.name),
                ));
                return existing;
            }
        }

        let param_sig = decl
            .param_ports
            .iter()
            .flat_map(|p| {
                p.declarators.iter().map(move |d| ParamSig {
                    name: d.name.clone(),
                    is_local: p.is_local,
                    has_default: d.init.is_some(),
                })
            })
            .collect();

        let id = DefinitionId(self.definitions.len() as u32);
        self.definitions.push(Definition {
            name: decl.name.clone(),
            kind: decl.kind,
            syntax: Arc::new(decl.clone()),
            scope,
            library: library.clone(),
            file,
            span: Span::new(file, range),
            default_nettype: decl.default_nettype,
            timescale: decl.timescale.clone(),
            param_sig,
        });
        self.definition_map.insert(key, id);
        id
    }

    /// Nested-first definition lookup, then the top-level table with
    /// library precedence.
    pub fn get_definition(&self, name: &str, mut scope: ScopeId) -> Option<DefinitionId> {
        loop {
            let s = self.scope(scope);
            let is_unit = s.owner.is_some_and(|o| {
                matches!(self.symbol(o).kind, SymbolKind::CompilationUnit { .. })
            });
            if is_unit {
                // Unit-scope definitions live in the top-level table,
                // where library precedence applies.
                break;
            }
            if let Some(&id) = self.definition_map.get(&(SmolStr::new(name), scope)) {
                return Some(id);
            }
            match s.parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        self.get_top_definition(name)
    }

    /// Top-level lookup honoring `library_order` (or first-seen
    /// library order by default).
    pub fn get_top_definition(&self, name: &str) -> Option<DefinitionId> {
        let candidates = self.top_definitions.get(name)?;
        let order: &[LibraryName] = if self.options.library_order.is_empty() {
            &self.libraries_seen
        } else {
            &self.options.library_order
        };
        for lib in order {
            if let Some(&id) = candidates
                .iter()
                .find(|&&id| self.definition(id).library.as_ref() == Some(lib))
            {
                return Some(id);
            }
        }
        // Untagged definitions come after ordered libraries.
        candidates
            .iter()
            .copied()
            .find(|&id| self.definition(id).library.is_none())
            .or_else(|| candidates.first().copied())
    }

    fn collect_instantiated_names(&mut self, items: &[Item]) {
        for item in items {
            match &item.kind {
                ItemKind::Instance(inst) => {
                    self.instantiated_names.insert(inst.module_name.clone());
                }
                ItemKind::Module(decl) => self.collect_instantiated_names(&decl.body),
                ItemKind::Package(decl) => self.collect_instantiated_names(&decl.body),
                ItemKind::GenerateIf(r#gen) => {
                    self.collect_instantiated_names(&r#gen.then_block.items);
                    if let Some(else_block) = &r#gen.else_block {
                        self.collect_instantiated_names(&else_block.items);
                    }
                }
                ItemKind::GenerateFor(r#gen) => self.collect_instantiated_names(&r#gen.body.items),
                ItemKind::GenerateBlock(block) => self.collect_instantiated_names(&block.items),
                _ => {}
            }
        }
    }

    fn collect_bind_directives(&mut self, items: &[Item], file: FileId) {
        for item in items {
            match &item.kind {
                ItemKind::Bind(bind) => {
                    let id = self.bind_directives.len() as u32;
                    self.bind_directives.push((Arc::new(bind.clone()), file));
                    match &bind.target {
                        BindTarget::Definition(name) => {
                            self.binds_by_def.entry(name.clone()).or_default().push(id);
                        }
                        BindTarget::Path(path) => {
                            self.binds_by_path.push((path.clone(), id));
                        }
                    }
                    self.instantiated_names
                        .insert(bind.instantiation.module_name.clone());
                }
                ItemKind::Module(decl) => self.collect_bind_directives(&decl.body, file),
                ItemKind::GenerateIf(r#gen) => {
                    self.collect_bind_directives(&r#gen.then_block.items, file);
                    if let Some(else_block) = &r#gen.else_block {
                        self.collect_bind_directives(&else_block.items, file);
                    }
                }
                ItemKind::GenerateFor(r#gen) => {
                    self.collect_bind_directives(&r#gen.body.items, file);
                }
                ItemKind::GenerateBlock(block) => {
                    self.collect_bind_directives(&block.items, file);
                }
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // Scope population (pass A) and member insertion
    // ------------------------------------------------------------------

    /// Insert an already-allocated symbol into a scope's member list,
    /// keeping the list ordered by index and the name map current.
    pub(crate) fn insert_member(&mut self, scope: ScopeId, symbol: SymbolId) {
        let index = self.symbol(symbol).index;
        let name = self.symbol(symbol).name.clone();
        let span = self.symbol(symbol).span;

        let pos = {
            let s = self.scopes.get(scope);
            s.members
                .iter()
                .rposition(|&m| self.symbols.get(m).index <= index)
                .map(|p| p + 1)
                .unwrap_or(0)
        };
        self.scopes.get_mut(scope).members.insert(pos, symbol);

        if !name.is_empty() {
            let duplicate = match &mut self.scopes.get_mut(scope).name_map {
                Some(map) => {
                    if map.contains_key(&name) {
                        true
                    } else {
                        map.insert(name.clone(), symbol);
                        false
                    }
                }
                None => false,
            };
            if duplicate {
                self.diags.add(Diagnostic::error(
                    DiagCode::DUPLICATE_MEMBER,
                    span,
                    format!("`{name}` is already declared in this scope"),
                ));
            }
        }
    }

    /// Find a direct member by name, building the lazy name map on
    /// first use.
    pub(crate) fn find_member(&mut self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        if self.scope(scope).name_map.is_none() {
            self.build_name_map(scope);
        }
        self.scope(scope).name_map.as_ref()?.get(name).copied()
    }

    /// Read-only member lookup; falls back to a linear scan when the
    /// lazy name map has not been built (finalization builds all of
    /// them).
    pub fn lookup_member(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        if let Some(map) = &self.scope(scope).name_map {
            return map.get(name).copied();
        }
        self.scope(scope)
            .members
            .iter()
            .copied()
            .find(|&m| self.symbol(m).name == name)
    }

    fn build_name_map(&mut self, scope: ScopeId) {
        let members: Vec<SymbolId> = self.scope(scope).members.clone();
        let mut map = HashMap::new();
        let mut duplicates = Vec::new();
        for member in members {
            let sym = self.symbol(member);
            if sym.name.is_empty() {
                continue;
            }
            if let Some(&first) = map.get(&sym.name) {
                if first != member {
                    duplicates.push((sym.name.clone(), sym.span));
                }
            } else {
                map.insert(sym.name.clone(), member);
            }
        }
        self.scopes.get_mut(scope).name_map = Some(map);
        for (name, span) in duplicates {
            self.diags.add(Diagnostic::error(
                DiagCode::DUPLICATE_MEMBER,
                span,
                format!("`{name}` is already declared in this scope"),
            ));
        }
    }

    /// Allocate a symbol at the next index of `scope` and insert it.
    pub(crate) fn add_symbol(
        &mut self,
        scope: ScopeId,
        kind: SymbolKind,
        name: SmolStr,
        span: Span,
    ) -> SymbolId {
        let index = self.scopes.get_mut(scope).next_index();
        self.add_symbol_at(scope, kind, name, span, index)
    }

    /// Allocate a symbol at a specific slot; used when realizing
    /// deferred members and injecting enum values.
    pub(crate) fn add_symbol_at(
        &mut self,
        scope: ScopeId,
        kind: SymbolKind,
        name: SmolStr,
        span: Span,
        index: SymbolIndex,
    ) -> SymbolId {
        let id = self.symbols.alloc(Symbol {
            kind,
            name,
            parent: Some(scope),
            index,
            span,
        });
        self.insert_member(scope, id);
        id
    }

    /// Pass A: create symbols for a scope member, deferring the
    /// constructs whose elaboration needs the full scope.
    pub(crate) fn populate_item(&mut self, scope: ScopeId, item: &Item, file: FileId) {
        let first_new = self.symbols.len() as u32;
        self.populate_item_inner(scope, item, file);
        if !item.attributes.is_empty() {
            self.attach_attributes(first_new, item, file);
        }
    }

    /// Attach the item's attributes to every symbol it introduced.
    /// Attribute values are literal constants per the language.
    fn attach_attributes(&mut self, first_new: u32, item: &Item, file: FileId) {
        let mut attrs = Vec::new();
        for spec in &item.attributes {
            let value = match &spec.value {
                None => Some(ConstantValue::Integer(crate::value::LogicInt::from_i64(
                    32, true, 1,
                ))),
                Some(expr) => fold_attribute_value(expr),
            };
            let attr = self.symbols.alloc(Symbol {
                kind: SymbolKind::Attribute { value },
                name: spec.name.clone(),
                parent: None,
                index: SymbolIndex(0),
                span: Span::new(file, spec.range),
            });
            attrs.push(attr);
        }
        for raw in first_new..self.symbols.len() as u32 {
            let target: SymbolId = Idx::from_raw(raw);
            if matches!(self.symbol(target).kind, SymbolKind::Attribute { .. }) {
                continue;
            }
            self.attribute_map.insert(target, attrs.clone());
        }
    }

    /// Attributes attached to a symbol, declaration order.
    pub fn get_attributes(&self, symbol: SymbolId) -> &[SymbolId] {
        self.attribute_map
            .get(&symbol)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn populate_item_inner(&mut self, scope: ScopeId, item: &Item, file: FileId) {
        match &item.kind {
            ItemKind::Param(decl) => {
                for d in &decl.declarators {
                    let index = self.scopes.get_mut(scope).next_index();
                    let sym = self.add_symbol_at(
                        scope,
                        SymbolKind::Parameter(ParameterInfo {
                            ty: self.types.error_type(),
                            is_local: decl.is_local,
                            is_port: decl.is_port,
                            overridden: false,
                            initializer: None,
                            value: None,
                            errored: false,
                        }),
                        d.name.clone(),
                        Span::new(file, d.name_range),
                        index,
                    );
                    self.pending.insert(
                        sym,
                        Pending::Param {
                            ty: decl.ty.clone(),
                            init: d.init.clone(),
                            override_value: None,
                        },
                    );
                }
            }
            ItemKind::Var(decl) => {
                for d in &decl.declarators {
                    let index = self.scopes.get_mut(scope).next_index();
                    let sym = self.add_symbol_at(
                        scope,
                        SymbolKind::Variable(crate::symbols::VariableInfo {
                            ty: self.types.error_type(),
                            initializer: None,
                        }),
                        d.name.clone(),
                        Span::new(file, d.name_range),
                        index,
                    );
                    self.pending.insert(
                        sym,
                        Pending::Var {
                            ty: decl.ty.clone(),
                            dims: d.unpacked_dims.clone(),
                            init: d.init.clone(),
                        },
                    );
                }
            }
            ItemKind::Net(decl) => {
                for d in &decl.declarators {
                    let index = self.scopes.get_mut(scope).next_index();
                    let sym = self.add_symbol_at(
                        scope,
                        SymbolKind::Net(crate::symbols::NetInfo {
                            ty: self.types.error_type(),
                            net_kind: decl.net_kind,
                        }),
                        d.name.clone(),
                        Span::new(file, d.name_range),
                        index,
                    );
                    self.pending.insert(
                        sym,
                        Pending::Net {
                            ty: decl.ty.clone(),
                            init: d.init.clone(),
                        },
                    );
                }
            }
            ItemKind::Typedef(decl) => {
                let sym = self.add_symbol(
                    scope,
                    SymbolKind::TypeAlias {
                        target: self.types.error_type(),
                    },
                    decl.name.clone(),
                    Span::new(file, decl.name_range),
                );
                self.pending
                    .insert(sym, Pending::Typedef { ty: decl.ty.clone() });
            }
            ItemKind::Function(decl) => {
                let fn_scope = self.scopes.alloc(Scope::new(Some(scope)));
                let sym = self.add_symbol(
                    scope,
                    SymbolKind::Subroutine(crate::symbols::SubroutineInfo {
                        args: Vec::new(),
                        return_ty: self.types.error_type(),
                        body: None,
                        scope: fn_scope,
                        dpi_import: decl.dpi_import.clone(),
                    }),
                    decl.name.clone(),
                    Span::new(file, decl.name_range),
                );
                self.scopes.get_mut(fn_scope).owner = Some(sym);
                if decl.dpi_import.is_some() {
                    self.dpi_imports.push(sym);
                }
                self.pending.insert(
                    sym,
                    Pending::Function {
                        decl: Arc::new(decl.clone()),
                    },
                );
            }
            ItemKind::DpiExport(export) => {
                self.dpi_exports.push((export.clone(), scope, file));
            }
            ItemKind::Import(decl) => {
                let (kind, name) = match &decl.name {
                    vela_syntax::ImportName::Wildcard => (
                        SymbolKind::WildcardImport {
                            package: decl.package.clone(),
                        },
                        SmolStr::default(),
                    ),
                    vela_syntax::ImportName::Explicit(member) => (
                        SymbolKind::ExplicitImport {
                            package: decl.package.clone(),
                            member: member.clone(),
                        },
                        member.clone(),
                    ),
                };
                let is_wildcard = name.is_empty();
                let sym = self.add_symbol(scope, kind, name, Span::new(file, item.range));
                if is_wildcard {
                    self.scopes.get_mut(scope).wildcard_imports.push(sym);
                }
            }
            ItemKind::Genvar(decl) => {
                for (name, range) in &decl.names {
                    self.add_symbol(
                        scope,
                        SymbolKind::Genvar,
                        name.clone(),
                        Span::new(file, *range),
                    );
                }
            }
            ItemKind::Class(decl) => {
                self.add_symbol(
                    scope,
                    SymbolKind::GenericClass,
                    decl.name.clone(),
                    Span::new(file, decl.name_range),
                );
            }
            ItemKind::Module(decl) => {
                // A nested definition: registered, not instantiated.
                let library = None;
                self.create_definition(scope, decl, file, &library, item.range);
            }
            ItemKind::Instance(_)
            | ItemKind::GenerateIf(_)
            | ItemKind::GenerateFor(_)
            | ItemKind::GenerateBlock(_)
            | ItemKind::Defparam(_)
            | ItemKind::ContinuousAssign(_)
            | ItemKind::Initial(_) => {
                let index = self.scopes.get_mut(scope).next_index();
                self.scopes
                    .get_mut(scope)
                    .defer(Arc::new(item.clone()), index, file);
            }
            ItemKind::Bind(_) => {
                // Collected globally at tree intake.
            }
            ItemKind::Package(_) | ItemKind::Config(_) => {
                // Only valid at the root; the parser reports these.
            }
        }
    }

    // ------------------------------------------------------------------
    // Elaboration driver
    // ------------------------------------------------------------------

    /// The root of the design. The first call elaborates everything
    /// and finalizes the compilation; later calls return the cache.
    pub fn get_root(&mut self) -> SymbolId {
        if let Some(root) = self.root {
            return root;
        }
        debug_assert!(
            self.state == State::Building,
            "reentrant elaboration"
        );
        self.state = State::Finalizing;

        self.parse_param_overrides();
        self.bind_package_and_unit_members();

        let tops = self.select_top_modules();

        // Defparams need a fixed point: each speculative elaboration
        // may move override values, which may change which defparams
        // are even reachable.
        if self.defparams_present() {
            self.resolve_defparams(&tops);
        }

        self.elaborate_tops(&tops);
        self.apply_remaining_binds();
        self.check_dpi_exports();
        self.finish_elaboration();

        self.state = State::Finalized;
        self.root = Some(self.root_symbol);
        self.root_symbol
    }

    fn bind_package_and_unit_members(&mut self) {
        let mut packages: Vec<SymbolId> = self.packages.values().copied().collect();
        packages.sort_by(|a, b| self.symbol(*a).name.cmp(&self.symbol(*b).name));
        for pkg in packages {
            if let Some(scope) = self.symbol(pkg).kind.owned_scope() {
                bind::bind_scope_members(self, scope);
            }
        }
        let units = self.unit_scopes.clone();
        for unit in units {
            bind::bind_scope_members(self, unit);
        }
    }

    fn parse_param_overrides(&mut self) {
        let specs = self.options.param_overrides.clone();
        for spec in specs {
            let Some((path, value)) = spec.split_once('=') else {
                self.diags.add(Diagnostic::error(
                    DiagCode::UNKNOWN_PARAM_OVERRIDE,
                    Span::detached(FileId(0)),
                    format!("malformed parameter override `{spec}`"),
                ));
                continue;
            };
            let Ok(value) = value.trim().parse::<i64>() else {
                self.diags.add(Diagnostic::error(
                    DiagCode::UNKNOWN_PARAM_OVERRIDE,
                    Span::detached(FileId(0)),
                    format!("cannot parse override value in `{spec}`"),
                ));
                continue;
            };
            let parts: Vec<SmolStr> = path.trim().split('.').map(SmolStr::new).collect();
            let value = ConstantValue::Integer(crate::value::LogicInt::from_i64(32, true, value));
            self.cli_overrides.insert_path(&parts, value.clone());
            self.param_overrides.insert_path(&parts, value);
        }
    }

    /// Either the configured top list (resolving config blocks to
    /// their design cells) or every never-instantiated module.
    fn select_top_modules(&mut self) -> Vec<DefinitionId> {
        let mut tops = Vec::new();
        if !self.options.top_modules.is_empty() {
            let requested = self.options.top_modules.clone();
            for name in requested {
                if let Some(cells) = self.configs.get(&name).cloned() {
                    for cell in cells {
                        match self.get_top_definition(&cell) {
                            Some(def) => tops.push(def),
                            None => {
                                self.diags.add(Diagnostic::error(
                                    DiagCode::UNKNOWN_TOP_MODULE,
                                    Span::detached(FileId(0)),
                                    format!("unknown design cell `{cell}` in config `{name}`"),
                                ));
                            }
                        }
                    }
                } else if let Some(def) = self.get_top_definition(&name) {
                    tops.push(def);
                } else {
                    self.diags.add(Diagnostic::error(
                        DiagCode::UNKNOWN_TOP_MODULE,
                        Span::detached(FileId(0)),
                        format!("unknown top module `{name}`"),
                    ));
                }
            }
        } else {
            // Deterministic order: registration order of definitions.
            for (idx, def) in self.definitions.iter().enumerate() {
                let is_top_level = self.scope(def.scope).parent.is_none()
                    && self.scope(def.scope).owner.is_none_or(|o| {
                        matches!(self.symbol(o).kind, SymbolKind::CompilationUnit { .. })
                    });
                if def.kind == DefinitionKind::Module
                    && is_top_level
                    && !self.instantiated_names.contains(&def.name)
                {
                    let id = DefinitionId(idx as u32);
                    // Among same-name definitions, only the one the
                    // library order selects becomes a top.
                    if self.get_top_definition(&def.name) == Some(id) {
                        tops.push(id);
                    }
                }
            }
        }
        if tops.is_empty() && !self.options.lint_mode {
            self.diags.add(Diagnostic::warning(
                DiagCode::NO_TOP_MODULES,
                Span::detached(FileId(0)),
                "no top-level modules found in design",
            ));
        }
        tops
    }

    fn defparams_present(&self) -> bool {
        fn scan(items: &[Item]) -> bool {
            items.iter().any(|item| match &item.kind {
                ItemKind::Defparam(_) => true,
                ItemKind::Module(decl) => scan(&decl.body),
                ItemKind::GenerateIf(r#gen) => {
                    scan(&r#gen.then_block.items)
                        || r#gen.else_block.as_ref().is_some_and(|b| scan(&b.items))
                }
                ItemKind::GenerateFor(r#gen) => scan(&r#gen.body.items),
                ItemKind::GenerateBlock(block) => scan(&block.items),
                _ => false,
            })
        }
        self.trees.iter().any(|t| scan(&t.members))
    }

    /// Iterate speculative elaborations until the override tree stops
    /// moving, bounded by `max_defparam_steps`.
    fn resolve_defparams(&mut self, tops: &[DefinitionId]) {
        let max_steps = self.options.max_defparam_steps;
        let mut converged = false;
        for _ in 0..max_steps {
            let before = self.param_overrides.clone();
            self.elaborate_tops(tops);
            let collected = std::mem::take(&mut self.collected_defparams);
            let mut next = before.clone();
            for (path, value) in collected {
                // Command-line overrides win over defparams.
                if !self.cli_override_covers(&path) {
                    next.insert_path(&path, value);
                }
            }
            self.reset_design();
            if next == self.param_overrides {
                converged = true;
                break;
            }
            self.param_overrides = next;
        }
        if !converged && max_steps > 0 {
            self.diags.add(Diagnostic::error(
                DiagCode::DEFPARAM_UNRESOLVED,
                Span::detached(FileId(0)),
                format!(
                    "defparam values did not converge after {max_steps} iterations; \
                     using the last set"
                ),
            ));
        }
    }

    fn cli_override_covers(&self, path: &[SmolStr]) -> bool {
        let mut node = &self.cli_overrides;
        for part in &path[..path.len().saturating_sub(1)] {
            match node.children.get(part) {
                Some(child) => node = child,
                None => return false,
            }
        }
        path.last()
            .is_some_and(|leaf| node.overrides.contains_key(leaf))
    }

    /// Discard a speculative design so elaboration can run again.
    /// Arena storage is retained (entities live until the compilation
    /// is dropped); only the root's membership resets.
    fn reset_design(&mut self) {
        let root_scope = self.root_scope;
        let s = self.scopes.get_mut(root_scope);
        s.members.clear();
        s.name_map = None;
        self.instance_cache.clear();
        self.body_instances.clear();
        self.applied_binds.clear();
        self.seen_bind_directives.clear();
        self.continuous_assigns.clear();
        self.initial_blocks.clear();
    }

    fn elaborate_tops(&mut self, tops: &[DefinitionId]) {
        for &def in tops {
            if self.hit_error_limit() {
                break;
            }
            let name = self.definition(def).name.clone();
            let file = self.definition(def).file;
            let overrides = self.param_overrides.children.get(&name).cloned();
            let top_overrides = merge_override_roots(overrides, &self.param_overrides);
            self.create_instance(self.root_scope, def, &name, &[], top_overrides, &[], 0, file);
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics queries
    // ------------------------------------------------------------------

    /// Diagnostics from lexing/preprocessing/parsing, passed through
    /// from the syntax trees.
    pub fn get_parse_diagnostics(&mut self) -> Vec<Diagnostic> {
        if let Some(cached) = &self.cached_parse_diags {
            return cached.clone();
        }
        let mut sink = Diagnostics::new();
        for tree in &self.trees {
            sink.extend(tree.parse_diags.iter().cloned());
        }
        let sorted = sink.sorted();
        self.cached_parse_diags = Some(sorted.clone());
        sorted
    }

    /// Semantic diagnostics; forces elaboration.
    pub fn get_semantic_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.get_root();
        if let Some(cached) = &self.cached_semantic_diags {
            return cached.clone();
        }
        let sorted = self.diags.sorted();
        self.cached_semantic_diags = Some(sorted.clone());
        sorted
    }

    pub fn get_all_diagnostics(&mut self) -> Vec<Diagnostic> {
        let mut all = self.get_parse_diagnostics();
        all.extend(self.get_semantic_diagnostics());
        all
    }

    // ------------------------------------------------------------------
    // Accessors used by the elaboration internals
    // ------------------------------------------------------------------

    pub(crate) fn alloc_scope(&mut self, scope: Scope) -> ScopeId {
        self.scopes.alloc(scope)
    }

    pub(crate) fn scope_next_index(&mut self, scope: ScopeId) -> SymbolIndex {
        self.scopes.get_mut(scope).next_index()
    }

    /// Allocate an instance-body symbol owning `scope`. The body is
    /// not a member of any scope; instances point at it.
    pub(crate) fn alloc_body_symbol(
        &mut self,
        scope: ScopeId,
        definition: DefinitionId,
        name: SmolStr,
        span: Span,
    ) -> SymbolId {
        let body = self.symbols.alloc(Symbol {
            kind: SymbolKind::InstanceBody { scope, definition },
            name,
            parent: None,
            index: SymbolIndex(0),
            span,
        });
        self.scopes.get_mut(scope).owner = Some(body);
        body
    }

    pub(crate) fn instance_cache_get(
        &self,
        key: &crate::elab::InstanceCacheKey,
    ) -> Option<&SymbolId> {
        self.instance_cache.get(key)
    }

    pub(crate) fn instance_cache_insert(
        &mut self,
        key: crate::elab::InstanceCacheKey,
        body: SymbolId,
    ) {
        self.instance_cache.insert(key, body);
    }

    pub(crate) fn note_body_instance(&mut self, body: SymbolId, instance: SymbolId) {
        self.body_instances.entry(body).or_default().push(instance);
    }

    /// All instances sharing the given body.
    pub fn get_parent_instances(&self, body: SymbolId) -> &[SymbolId] {
        self.body_instances
            .get(&body)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn has_binds_for(&self, def_name: &str) -> bool {
        self.binds_by_def.contains_key(def_name)
    }

    /// Path-targeted binds can land in any body, so their presence
    /// disables body sharing outright.
    pub(crate) fn has_path_binds(&self) -> bool {
        !self.binds_by_path.is_empty()
    }

    pub(crate) fn binds_by_def_get(&self, def_name: &str) -> Option<&[u32]> {
        self.binds_by_def.get(def_name).map(|v| v.as_slice())
    }

    pub(crate) fn binds_by_path_clone(&self) -> Vec<(Vec<SmolStr>, u32)> {
        self.binds_by_path.clone()
    }

    pub(crate) fn bind_directive(&self, id: u32) -> (&Arc<vela_syntax::BindDirective>, FileId) {
        let (directive, file) = &self.bind_directives[id as usize];
        (directive, *file)
    }

    /// Record one application; false when this (directive, body) pair
    /// was already applied.
    pub(crate) fn note_bind_applied(&mut self, id: u32, body: SymbolId) -> bool {
        self.seen_bind_directives.insert(id);
        self.applied_binds.insert((id, body))
    }

    pub(crate) fn applied_bind_count(&self) -> usize {
        self.applied_binds.len()
    }

    pub(crate) fn dpi_exports_clone(
        &self,
    ) -> Vec<(vela_syntax::DpiExport, ScopeId, FileId)> {
        self.dpi_exports.clone()
    }

    /// Subroutines registered as DPI imports.
    pub fn dpi_imported_subroutines(&self) -> &[SymbolId] {
        &self.dpi_imports
    }

    pub(crate) fn hit_error_limit(&self) -> bool {
        self.too_many_errors
            || self.diags.is_poisoned()
            || self.diags.error_count() >= self.options.error_limit as usize
    }

    fn finish_elaboration(&mut self) {
        if self.diags.error_count() >= self.options.error_limit as usize {
            self.too_many_errors = true;
            self.diags.add(Diagnostic::error(
                DiagCode::TOO_MANY_ERRORS,
                Span::detached(FileId(0)),
                format!(
                    "too many errors emitted, stopping now (limit {})",
                    self.options.error_limit
                ),
            ));
        }
        if !self.options.suppress_unused {
            self.warn_unused_definitions();
        }
        // Materialize every lazy name map so post-finalize readers
        // never need mutation.
        let all_scopes: Vec<ScopeId> = self.scopes.iter().map(|(id, _)| id).collect();
        for scope in all_scopes {
            if self.scope(scope).name_map.is_none() {
                self.build_name_map(scope);
            }
        }
    }

    fn warn_unused_definitions(&mut self) {
        let mut unused = Vec::new();
        for (idx, def) in self.definitions.iter().enumerate() {
            let id = DefinitionId(idx as u32);
            if def.kind != DefinitionKind::Module {
                continue;
            }
            if !self.instantiated_names.contains(&def.name) && !self.elaborated_defs.contains(&id) {
                unused.push((def.name.clone(), def.span));
            }
        }
        for (name, span) in unused {
            self.diags.add(Diagnostic::warning(
                DiagCode::UNKNOWN_DEFINITION,
                span,
                format!("definition `{name}` is never instantiated"),
            ));
        }
    }
}

/// The top-level override node for a top instance: bare `name=value`
/// overrides at the root apply to every top module, and a child node
/// keyed by the top's name nests below it.
fn merge_override_roots(
    child: Option<ParamOverrideNode>,
    root: &ParamOverrideNode,
) -> Option<ParamOverrideNode> {
    match child {
        Some(mut node) => {
            for (k, v) in &root.overrides {
                node.overrides.entry(k.clone()).or_insert_with(|| v.clone());
            }
            Some(node)
        }
        None if !root.overrides.is_empty() => Some(ParamOverrideNode {
            overrides: root.overrides.clone(),
            children: HashMap::new(),
        }),
        None => None,
    }
}

/// Attribute values are restricted to literal constants; anything
/// else stays unvalued.
fn fold_attribute_value(expr: &Expr) -> Option<ConstantValue> {
    match &expr.kind {
        vela_syntax::ExprKind::IntLiteral(lit) => crate::value::LogicInt::parse_literal(
            lit.width,
            lit.signed,
            lit.base,
            &lit.digits,
        )
        .map(ConstantValue::Integer),
        vela_syntax::ExprKind::StringLiteral(s) => Some(ConstantValue::Str(s.clone())),
        vela_syntax::ExprKind::RealLiteral(v) => Some(ConstantValue::Real(*v)),
        _ => None,
    }
}
