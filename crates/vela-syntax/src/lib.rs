//! The parser-facing syntax contract.
//!
//! Lexing, preprocessing, and parsing happen outside this workspace;
//! the parser hands the semantic layer one [`SyntaxTree`] per source
//! buffer. These nodes are plain owned data, documented by the kinds
//! the binder consumes.

mod expr;
mod item;
mod stmt;
mod ty;

pub use expr::{
    Callee, CastTarget, Expr, ExprKind, IntLiteral, LiteralBase, PatternKey, RangeSelectKind,
    UnbasedKind,
};
pub use expr::{BinaryOp, UnaryOp};
pub use item::{
    ArgDirection, AttributeSpec, BindDirective, BindTarget, ClassDecl, ConfigDecl,
    ContinuousAssign, Declarator, DefinitionKind, DefparamDecl, DpiExport, FunctionArg,
    FunctionDecl, GenerateBlock, GenerateFor, GenerateIf, GenvarDecl, ImportDecl, ImportName,
    InitialBlock, InstanceSyntax, InstantiationDecl, Item, ItemKind, ModuleDecl, NetDecl, NetKind,
    PackageDecl, ParamAssignment, ParamDecl, PortConnection, PortDecl, PortDirection, TypedefDecl,
    VarDecl,
};
pub use stmt::{CaseItemSyntax, LocalVarSyntax, Stmt, StmtKind};
pub use ty::{
    DimensionSyntax, EnumMemberSyntax, FloatKind, PredefinedKind, RangeSyntax, ScalarKind,
    StructFieldSyntax, TypeSyntax, TypeSyntaxKind,
};

use vela_diag::Diagnostic;
use vela_source::{FileId, LibraryName};

/// One parsed source buffer: the root items, any parse-time
/// diagnostics, and the source library the buffer belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub file: FileId,
    pub members: Vec<Item>,
    pub parse_diags: Vec<Diagnostic>,
    pub source_library: Option<LibraryName>,
}

impl SyntaxTree {
    pub fn new(file: FileId, members: Vec<Item>) -> Self {
        Self {
            file,
            members,
            parse_diags: Vec::new(),
            source_library: None,
        }
    }

    #[must_use]
    pub fn with_library(mut self, library: LibraryName) -> Self {
        self.source_library = Some(library);
        self
    }

    #[must_use]
    pub fn with_parse_diags(mut self, diags: Vec<Diagnostic>) -> Self {
        self.parse_diags = diags;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_defaults_to_no_library() {
        let tree = SyntaxTree::new(FileId(0), Vec::new());
        assert!(tree.source_library.is_none());
        assert!(tree.parse_diags.is_empty());
    }

    #[test]
    fn with_library_tags_the_tree() {
        let tree =
            SyntaxTree::new(FileId(0), Vec::new()).with_library(LibraryName::new("lib1"));
        assert_eq!(tree.source_library, Some(LibraryName::new("lib1")));
    }
}
