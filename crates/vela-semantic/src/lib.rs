//! Semantic elaboration and constant evaluation.
//!
//! [`Compilation`] owns every semantic entity: feed it syntax trees
//! with [`Compilation::add_syntax_tree`], then call
//! [`Compilation::get_root`] to elaborate the design. The first call
//! finalizes the compilation; afterwards it is read-only.

mod bind;
mod compilation;
mod elab;
mod eval;
mod expr;
mod lookup;
mod scope;
mod stmt;
mod symbols;
mod system;
mod types;
mod value;

pub use compilation::{AlreadyFinalized, Compilation, MinTypMax, Options, ParamOverrideNode};
pub use expr::{CallInfo, Expression, ExpressionKind};
pub use lookup::{LookupFlags, LookupLocation, LookupResult, Selector};
pub use scope::{DeferredMember, Scope, ScopeId};
pub use stmt::{CaseItem, Statement, StatementKind};
pub use symbols::{
    Definition, DefinitionId, NetInfo, ParamSig, ParameterInfo, SubroutineInfo, Symbol, SymbolId,
    SymbolIndex, SymbolKind, VariableInfo,
};
pub use system::{MethodReceiver, SystemSubroutine};
pub use types::{
    ArrayDim, FieldInfo, FloatKind, IntegralInfo, ScalarKind, Type, TypeId, TypeTable,
};
pub use value::{ConstantValue, Logic, LogicInt};
