//! Semantic entities. Every named thing in the design is a [`Symbol`]
//! allocated in the compilation's arena and addressed by [`SymbolId`];
//! back-references (symbol to scope to symbol) are handle lookups.

use smol_str::SmolStr;
use vela_arena::Idx;
use vela_source::Span;
use vela_syntax::DefinitionKind;

use crate::expr::Expression;
use crate::scope::ScopeId;
use crate::stmt::Statement;
use crate::types::TypeId;
use crate::value::{ConstantValue, LogicInt};

pub type SymbolId = Idx<Symbol>;

/// Position of a symbol within its parent scope. Assigned in
/// declaration order and never changed; members realized from one
/// deferred slot share that slot's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolIndex(pub u32);

#[derive(Debug)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Empty for anonymous entities (unnamed generate blocks).
    pub name: SmolStr,
    pub parent: Option<ScopeId>,
    pub index: SymbolIndex,
    pub span: Span,
}

#[derive(Debug)]
pub enum SymbolKind {
    /// The root of the design; members are the top-level instances.
    Root { scope: ScopeId },
    /// One per added syntax tree.
    CompilationUnit { scope: ScopeId },
    Package { scope: ScopeId },
    /// A use-site reference to an elaborated body. Multiple instances
    /// may share a body when caching applies.
    Instance {
        body: SymbolId,
        definition: DefinitionId,
    },
    /// The elaborated contents of a definition under one parameter
    /// binding.
    InstanceBody {
        scope: ScopeId,
        definition: DefinitionId,
    },
    Parameter(ParameterInfo),
    Variable(VariableInfo),
    Net(NetInfo),
    /// An enum member, injected into the scope enclosing the enum.
    EnumValue { ty: TypeId, value: LogicInt },
    Subroutine(SubroutineInfo),
    TypeAlias { target: TypeId },
    /// The genvar declaration itself; each generate iteration binds
    /// the loop value as a localparam inside the block.
    Genvar,
    GenerateBlock { scope: ScopeId },
    /// Shell for generic class declarations; specialization is not
    /// modeled.
    GenericClass,
    Attribute { value: Option<ConstantValue> },
    WildcardImport { package: SmolStr },
    ExplicitImport { package: SmolStr, member: SmolStr },
}

impl SymbolKind {
    /// The scope this symbol contains, if it is a scope owner.
    pub fn owned_scope(&self) -> Option<ScopeId> {
        match self {
            SymbolKind::Root { scope }
            | SymbolKind::CompilationUnit { scope }
            | SymbolKind::Package { scope }
            | SymbolKind::InstanceBody { scope, .. }
            | SymbolKind::GenerateBlock { scope } => Some(*scope),
            SymbolKind::Subroutine(info) => Some(info.scope),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ParameterInfo {
    pub ty: TypeId,
    pub is_local: bool,
    pub is_port: bool,
    /// Set when an override (instantiation assignment, defparam, or
    /// command line) replaced the default.
    pub overridden: bool,
    pub initializer: Option<Box<Expression>>,
    pub value: Option<ConstantValue>,
    /// The value failed to evaluate; `value` holds the error shape
    /// (all-X) and downstream use stays quiet.
    pub errored: bool,
}

#[derive(Debug)]
pub struct VariableInfo {
    pub ty: TypeId,
    pub initializer: Option<Box<Expression>>,
}

#[derive(Debug)]
pub struct NetInfo {
    pub ty: TypeId,
    pub net_kind: vela_syntax::NetKind,
}

#[derive(Debug)]
pub struct SubroutineInfo {
    /// Argument symbols, in declaration order; they live in `scope`.
    pub args: Vec<SymbolId>,
    pub return_ty: TypeId,
    /// The body block; `None` until bound, and permanently `None` for
    /// DPI imports.
    pub body: Option<Statement>,
    pub scope: ScopeId,
    pub dpi_import: Option<SmolStr>,
}

/// Handle into the compilation's definition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(pub u32);

/// The template from which instances are produced.
#[derive(Debug)]
pub struct Definition {
    pub name: SmolStr,
    pub kind: DefinitionKind,
    pub syntax: std::sync::Arc<vela_syntax::ModuleDecl>,
    /// The scope the definition was declared in.
    pub scope: ScopeId,
    pub library: Option<vela_source::LibraryName>,
    pub file: vela_source::FileId,
    pub span: Span,
    pub default_nettype: Option<vela_syntax::NetKind>,
    pub timescale: Option<SmolStr>,
    /// Parameter signature: names of the `#(...)` port-list entries,
    /// with defaults noted, in declaration order.
    pub param_sig: Vec<ParamSig>,
}

#[derive(Debug, Clone)]
pub struct ParamSig {
    pub name: SmolStr,
    pub is_local: bool,
    pub has_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_index_orders() {
        assert!(SymbolIndex(1) < SymbolIndex(2));
        assert_eq!(SymbolIndex(3), SymbolIndex(3));
    }

    #[test]
    fn non_scope_kinds_own_no_scope() {
        assert!(SymbolKind::Genvar.owned_scope().is_none());
        assert!(SymbolKind::GenericClass.owned_scope().is_none());
    }
}
