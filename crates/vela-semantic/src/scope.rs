//! Lexical scopes.
//!
//! A scope keeps its members in declaration order, a lazily built
//! name map, and two sidebands: deferred members (syntax whose
//! elaboration waits until the scope is first fully examined) and
//! wildcard imports. Deferred realization is idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use smol_str::SmolStr;
use vela_arena::Idx;
use vela_source::FileId;
use vela_syntax::Item;

use crate::symbols::{SymbolId, SymbolIndex};

pub type ScopeId = Idx<Scope>;

/// A syntax fragment whose members appear at `index` once realized:
/// generate constructs, instantiations, and procedural items.
#[derive(Debug, Clone)]
pub struct DeferredMember {
    pub syntax: Arc<Item>,
    pub index: SymbolIndex,
    pub file: FileId,
}

#[derive(Debug, Default)]
pub struct Scope {
    /// The symbol whose role is to contain this scope; `None` only
    /// for the root.
    pub owner: Option<SymbolId>,
    pub parent: Option<ScopeId>,
    /// Members ordered by `SymbolIndex`; realized deferred members
    /// are spliced in at their slot.
    pub members: Vec<SymbolId>,
    /// Built on first name query, invalidated never: insertion keeps
    /// it current.
    pub name_map: Option<HashMap<SmolStr, SymbolId>>,
    pub deferred: Vec<DeferredMember>,
    /// Wildcard import symbols declared in this scope.
    pub wildcard_imports: Vec<SymbolId>,
    /// Deferred members have been elaborated.
    pub realized: bool,
    next_index: u32,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    /// Claim the next declaration slot.
    pub fn next_index(&mut self) -> SymbolIndex {
        let index = SymbolIndex(self.next_index);
        self.next_index += 1;
        index
    }

    pub fn end_index(&self) -> SymbolIndex {
        SymbolIndex(self.next_index)
    }

    pub fn defer(&mut self, syntax: Arc<Item>, index: SymbolIndex, file: FileId) {
        self.deferred.push(DeferredMember {
            syntax,
            index,
            file,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_monotonic() {
        let mut scope = Scope::new(None);
        let a = scope.next_index();
        let b = scope.next_index();
        assert!(a < b);
        assert_eq!(scope.end_index(), SymbolIndex(2));
    }

    #[test]
    fn new_scope_is_unrealized_and_empty() {
        let scope = Scope::new(None);
        assert!(!scope.realized);
        assert!(scope.members.is_empty());
        assert!(scope.name_map.is_none());
    }
}
