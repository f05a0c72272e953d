//! Name lookup.
//!
//! Precedence, stopping at the first match:
//! 1. direct members of the current scope visible at the location,
//! 2. members of enclosing scopes, outward,
//! 3. explicit imports (members of their declaring scope),
//! 4. wildcard imports visible at the location,
//! 5. the top-level definition table (consulted by the instantiation
//!    path through `Compilation::get_definition`),
//! 6. the built-in `std` package.
//!
//! Hierarchical names resolve the head through the same chain, then
//! descend member by member; when the walk reaches a value symbol the
//! remaining parts are appended as selectors for the binder to
//! re-apply.

use std::cmp::Ordering;

use smallvec::SmallVec;
use smol_str::SmolStr;
use vela_diag::{DiagCode, Diagnostic};
use vela_source::Span;

use crate::compilation::Compilation;
use crate::scope::ScopeId;
use crate::symbols::{SymbolId, SymbolKind};

/// Additional modifiers for a lookup operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LookupFlags(u32);

impl LookupFlags {
    pub const NONE: Self = Self(0);
    /// Constant context: hierarchical paths are forbidden.
    pub const CONSTANT: Self = Self(1);
    /// The result must be a type.
    pub const TYPE: Self = Self(2);
    /// Drop the declared-before-use restriction.
    pub const ALLOW_DECLARED_AFTER: Self = Self(4);
    /// Don't search wildcard imports.
    pub const DISALLOW_WILDCARD_IMPORT: Self = Self(8);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// An ordered position within a scope, used for visibility checks.
///
/// Total order: within one scope by index; otherwise by walking to a
/// common ancestor. The `min` and `max` sentinels compare strictly
/// before and after any real location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupLocation {
    pub scope: Option<ScopeId>,
    pub index: u32,
}

impl LookupLocation {
    pub const MIN: Self = Self {
        scope: None,
        index: 0,
    };
    pub const MAX: Self = Self {
        scope: None,
        index: u32::MAX,
    };

    pub fn new(scope: ScopeId, index: u32) -> Self {
        Self {
            scope: Some(scope),
            index,
        }
    }

    /// Just before the given symbol in its parent scope.
    pub fn before(comp: &Compilation, symbol: SymbolId) -> Self {
        let sym = comp.symbol(symbol);
        Self {
            scope: sym.parent,
            index: sym.index.0,
        }
    }

    /// Just after the given symbol in its parent scope.
    pub fn after(comp: &Compilation, symbol: SymbolId) -> Self {
        let sym = comp.symbol(symbol);
        Self {
            scope: sym.parent,
            index: sym.index.0.saturating_add(1),
        }
    }

    /// Total order over locations; sentinels first/last, otherwise by
    /// position along the path from the root.
    pub fn compare(self, other: Self, comp: &Compilation) -> Ordering {
        match (self.scope, other.scope) {
            (None, None) => self.index.cmp(&other.index),
            (None, Some(_)) => {
                if self.index == 0 {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (Some(_), None) => {
                if other.index == 0 {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (Some(a), Some(b)) if a == b => self.index.cmp(&other.index),
            (Some(a), Some(b)) => {
                let pa = root_path(comp, a, self.index);
                let pb = root_path(comp, b, other.index);
                pa.cmp(&pb)
            }
        }
    }
}

/// Indices along the path from the root to (scope, index); used for
/// cross-scope location comparison.
fn root_path(comp: &Compilation, scope: ScopeId, index: u32) -> Vec<u32> {
    let mut path = vec![index];
    let mut current = Some(scope);
    while let Some(sid) = current {
        let s = comp.scope(sid);
        if let Some(owner) = s.owner {
            path.push(comp.symbol(owner).index.0);
        }
        current = s.parent;
    }
    path.reverse();
    path
}

/// A selection step captured during hierarchical resolution, to be
/// re-applied by the binder once the head binds to a value.
#[derive(Debug, Clone)]
pub enum Selector {
    /// An element select captured as syntax.
    Element(vela_syntax::Expr),
    Member { name: SmolStr, span: Span },
}

/// The outcome of one lookup.
#[derive(Debug, Default)]
pub struct LookupResult {
    pub found: Option<SymbolId>,
    pub was_imported: bool,
    pub is_hierarchical: bool,
    /// An ambiguous or broken import was involved; the caller should
    /// not pile further errors on top.
    pub saw_bad_import: bool,
    pub selectors: SmallVec<[Selector; 4]>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LookupResult {
    pub fn has_error(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error()) || self.saw_bad_import
    }

    fn not_found() -> Self {
        Self::default()
    }
}

/// Whether a symbol declared at `index` is visible from a location
/// with index `limit`: declared-after names are invisible.
fn visible_at(index: u32, limit: u32) -> bool {
    index <= limit
}

/// Resolve a simple (non-hierarchical) name.
pub fn lookup_name(
    comp: &mut Compilation,
    scope: ScopeId,
    location: LookupLocation,
    name: &str,
    flags: LookupFlags,
    span: Span,
) -> LookupResult {
    let mut result = LookupResult::not_found();

    // Steps 1-3: direct members (explicit imports are members of
    // their declaring scope), walking outward.
    let mut declared_later: Option<SymbolId> = None;
    let mut current = Some(scope);
    let mut limit = if location.scope == Some(scope) {
        location.index
    } else {
        u32::MAX
    };
    while let Some(sid) = current {
        if let Some(found) = comp.find_member(sid, name) {
            let sym_index = comp.symbol(found).index.0;
            if flags.contains(LookupFlags::ALLOW_DECLARED_AFTER) || visible_at(sym_index, limit) {
                return resolve_found(comp, found, flags, span, &mut result)
                    .unwrap_or(result);
            }
            // Declared later in this scope; keep walking outward, an
            // outer declaration may legitimately satisfy the name.
            declared_later.get_or_insert(found);
        }
        let s = comp.scope(sid);
        limit = match s.owner {
            Some(owner) => comp.symbol(owner).index.0.saturating_add(1),
            None => u32::MAX,
        };
        current = s.parent;
    }

    // Step 4: wildcard imports, innermost scope first.
    if !flags.contains(LookupFlags::DISALLOW_WILDCARD_IMPORT)
        && let Some(mut wildcard) = lookup_via_wildcards(comp, scope, location, name, span)
    {
        if let Some(found) = wildcard.found {
            wildcard.was_imported = true;
            if let Some(done) = resolve_found(comp, found, flags, span, &mut wildcard) {
                return done;
            }
        }
        return wildcard;
    }

    // Step 6: the built-in std package.
    let std_pkg = comp.std_package_scope();
    if let Some(found) = comp.find_member(std_pkg, name) {
        if let Some(done) = resolve_found(comp, found, flags, span, &mut result) {
            return done;
        }
        return result;
    }

    // A declaration exists but only after the use site.
    if let Some(later) = declared_later {
        let decl_span = comp.symbol(later).span;
        let diag = Diagnostic::error(
            DiagCode::USED_BEFORE_DECLARED,
            span,
            format!("`{name}` is used before its declaration"),
        )
        .with_note("declared here", Some(decl_span));
        result.diagnostics.push(diag);
        return result;
    }

    // Nothing matched; try typo correction within its budget.
    let mut diag = Diagnostic::error(
        DiagCode::UNDECLARED_IDENTIFIER,
        span,
        format!("use of undeclared identifier `{name}`"),
    );
    if comp.take_typo_budget()
        && let Some(suggestion) = best_typo_candidate(comp, scope, name)
    {
        diag.add_note(format!("did you mean `{suggestion}`?"), None);
    }
    result.diagnostics.push(diag);
    result
}

/// Chase import indirections and check kind constraints. Returns the
/// finished result when the lookup is decided.
fn resolve_found(
    comp: &mut Compilation,
    found: SymbolId,
    flags: LookupFlags,
    span: Span,
    result: &mut LookupResult,
) -> Option<LookupResult> {
    // An explicit import re-exports a package member under its own
    // name.
    if let SymbolKind::ExplicitImport { package, member } = &comp.symbol(found).kind {
        let package = package.clone();
        let member = member.clone();
        let Some(pkg_scope) = comp.package_scope(&package) else {
            result.saw_bad_import = true;
            result.diagnostics.push(Diagnostic::error(
                DiagCode::UNKNOWN_PACKAGE,
                span,
                format!("unknown package `{package}`"),
            ));
            return Some(std::mem::take(result));
        };
        let Some(target) = comp.find_member(pkg_scope, &member) else {
            result.saw_bad_import = true;
            result.diagnostics.push(Diagnostic::error(
                DiagCode::UNKNOWN_MEMBER,
                span,
                format!("package `{package}` has no member `{member}`"),
            ));
            return Some(std::mem::take(result));
        };
        result.found = Some(target);
        result.was_imported = true;
        return check_kind(comp, flags, span, result);
    }

    result.found = Some(found);
    check_kind(comp, flags, span, result)
}

fn check_kind(
    comp: &Compilation,
    flags: LookupFlags,
    span: Span,
    result: &mut LookupResult,
) -> Option<LookupResult> {
    let Some(found) = result.found else {
        return Some(std::mem::take(result));
    };
    let sym = comp.symbol(found);
    let is_type = matches!(
        sym.kind,
        SymbolKind::TypeAlias { .. } | SymbolKind::GenericClass
    );
    if flags.contains(LookupFlags::TYPE) && !is_type {
        result.diagnostics.push(Diagnostic::error(
            DiagCode::NOT_A_TYPE,
            span,
            format!("`{}` is not a type", sym.name),
        ));
    }
    Some(std::mem::take(result))
}

fn lookup_via_wildcards(
    comp: &mut Compilation,
    scope: ScopeId,
    location: LookupLocation,
    name: &str,
    span: Span,
) -> Option<LookupResult> {
    let mut current = Some(scope);
    let mut limit = if location.scope == Some(scope) {
        location.index
    } else {
        u32::MAX
    };
    while let Some(sid) = current {
        let imports: Vec<SymbolId> = comp
            .scope(sid)
            .wildcard_imports
            .iter()
            .copied()
            .filter(|&imp| visible_at(comp.symbol(imp).index.0, limit))
            .collect();

        let mut found: Option<(SymbolId, SmolStr)> = None;
        let mut ambiguous: Vec<SmolStr> = Vec::new();
        for imp in imports {
            let SymbolKind::WildcardImport { package } = &comp.symbol(imp).kind else {
                continue;
            };
            let package = package.clone();
            let Some(pkg_scope) = comp.package_scope(&package) else {
                continue;
            };
            if let Some(target) = comp.find_member(pkg_scope, name) {
                match &found {
                    Some((existing, first_pkg)) if *existing != target => {
                        if ambiguous.is_empty() {
                            ambiguous.push(first_pkg.clone());
                        }
                        ambiguous.push(package);
                    }
                    Some(_) => {}
                    None => found = Some((target, package)),
                }
            }
        }

        if !ambiguous.is_empty() {
            let mut result = LookupResult::not_found();
            result.saw_bad_import = true;
            result.diagnostics.push(Diagnostic::error(
                DiagCode::AMBIGUOUS_WILDCARD_IMPORT,
                span,
                format!(
                    "`{name}` is ambiguous: imported via wildcards from {}",
                    ambiguous
                        .iter()
                        .map(|p| format!("`{p}`"))
                        .collect::<Vec<_>>()
                        .join(" and ")
                ),
            ));
            return Some(result);
        }
        if let Some((target, _)) = found {
            let mut result = LookupResult::not_found();
            result.found = Some(target);
            return Some(result);
        }

        let s = comp.scope(sid);
        limit = match s.owner {
            Some(owner) => comp.symbol(owner).index.0.saturating_add(1),
            None => u32::MAX,
        };
        current = s.parent;
    }
    None
}

/// Resolve a dotted path. The head goes through the normal chain;
/// descent follows owned scopes until it reaches a value, after which
/// the rest of the path is handed back as member selectors.
pub fn lookup_hierarchical(
    comp: &mut Compilation,
    scope: ScopeId,
    location: LookupLocation,
    parts: &[SmolStr],
    flags: LookupFlags,
    span: Span,
) -> LookupResult {
    debug_assert!(parts.len() >= 2);

    if flags.contains(LookupFlags::CONSTANT) {
        let mut result = LookupResult::not_found();
        result.diagnostics.push(Diagnostic::error(
            DiagCode::HIERARCHICAL_NOT_ALLOWED_IN_CONSTANT,
            span,
            "hierarchical names are not allowed in constant expressions",
        ));
        return result;
    }

    let mut result = lookup_name(comp, scope, location, &parts[0], flags, span);
    let Some(mut current) = result.found else {
        return result;
    };

    for (i, part) in parts.iter().enumerate().skip(1) {
        let current_sym = comp.symbol(current);
        match current_sym.kind.owned_scope().or_else(|| {
            // An instance forwards to its body's scope.
            if let SymbolKind::Instance { body, .. } = current_sym.kind {
                comp.symbol(body).kind.owned_scope()
            } else {
                None
            }
        }) {
            Some(inner) => {
                result.is_hierarchical = true;
                match comp.find_member(inner, part) {
                    Some(next) => current = next,
                    None => {
                        let name = comp.symbol(current).name.clone();
                        result.found = None;
                        result.diagnostics.push(Diagnostic::error(
                            DiagCode::UNKNOWN_MEMBER,
                            span,
                            format!("`{name}` has no member `{part}`"),
                        ));
                        return result;
                    }
                }
            }
            None => {
                let is_value = matches!(
                    current_sym.kind,
                    SymbolKind::Parameter(_)
                        | SymbolKind::Variable(_)
                        | SymbolKind::Net(_)
                        | SymbolKind::EnumValue { .. }
                );
                if is_value {
                    // Hand the remaining parts back as selectors.
                    for rest in &parts[i..] {
                        result.selectors.push(Selector::Member {
                            name: rest.clone(),
                            span,
                        });
                    }
                    result.found = Some(current);
                    return result;
                }
                let name = comp.symbol(current).name.clone();
                result.found = None;
                result.diagnostics.push(Diagnostic::error(
                    DiagCode::NOT_A_HIERARCHICAL_SCOPE,
                    span,
                    format!("cannot resolve `{part}` through `{name}`: not a scope"),
                ));
                return result;
            }
        }
    }

    result.found = Some(current);
    result
}

/// Bounded Damerau-Levenshtein distance used for typo suggestions.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev2: Vec<usize>;
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur: Vec<usize> = vec![0; b.len() + 1];
    let mut older: Vec<usize> = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                cur[j] = cur[j].min(older[j - 2] + 1);
            }
        }
        prev2 = std::mem::replace(&mut older, prev);
        prev = std::mem::replace(&mut cur, prev2);
    }
    prev[b.len()]
}

/// Closest visible name within a distance proportionate to length.
fn best_typo_candidate(comp: &mut Compilation, scope: ScopeId, name: &str) -> Option<SmolStr> {
    let threshold = (name.len() / 3).max(1);
    let mut best: Option<(usize, SmolStr)> = None;
    let mut current = Some(scope);
    while let Some(sid) = current {
        let members: Vec<SmolStr> = comp
            .scope(sid)
            .members
            .iter()
            .map(|&m| comp.symbol(m).name.clone())
            .collect();
        for candidate in members {
            if candidate.is_empty() || candidate == name {
                continue;
            }
            let dist = edit_distance(name, &candidate);
            if dist <= threshold && best.as_ref().is_none_or(|(d, _)| dist < *d) {
                best = Some((dist, candidate));
            }
        }
        current = comp.scope(sid).parent;
    }
    best.map(|(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_contain_their_union() {
        let f = LookupFlags::CONSTANT.union(LookupFlags::TYPE);
        assert!(f.contains(LookupFlags::CONSTANT));
        assert!(f.contains(LookupFlags::TYPE));
        assert!(!f.contains(LookupFlags::ALLOW_DECLARED_AFTER));
    }

    #[test]
    fn visibility_rule_matches_declared_before() {
        assert!(visible_at(3, 5));
        assert!(visible_at(5, 5));
        assert!(!visible_at(6, 5));
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("width", "width"), 0);
        assert_eq!(edit_distance("width", "widht"), 1);
        assert_eq!(edit_distance("count", "cont"), 1);
        assert_eq!(edit_distance("abc", "xyz"), 3);
    }
}
