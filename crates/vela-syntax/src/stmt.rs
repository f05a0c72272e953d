use smol_str::SmolStr;
use vela_source::TextRange;

use crate::expr::Expr;
use crate::ty::{DimensionSyntax, TypeSyntax};

/// A statement inside a subroutine or procedural block.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: TextRange,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            range: TextRange::default(),
        }
    }

    #[must_use]
    pub fn with_range(mut self, range: TextRange) -> Self {
        self.range = range;
        self
    }

    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(expr))
    }

    pub fn block(stmts: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Block { stmts })
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(value))
    }

    pub fn if_else(cond: Expr, then_stmt: Stmt, else_stmt: Option<Stmt>) -> Self {
        Self::new(StmtKind::If {
            cond,
            then_stmt: Box::new(then_stmt),
            else_stmt: else_stmt.map(Box::new),
        })
    }

    pub fn var(name: &str, ty: TypeSyntax, init: Option<Expr>) -> Self {
        Self::new(StmtKind::VarDecl(LocalVarSyntax {
            name: SmolStr::new(name),
            name_range: TextRange::default(),
            ty,
            unpacked_dims: Vec::new(),
            init,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block {
        stmts: Vec<Stmt>,
    },
    VarDecl(LocalVarSyntax),
    Expr(Expr),
    If {
        cond: Expr,
        then_stmt: Box<Stmt>,
        else_stmt: Option<Box<Stmt>>,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        steps: Vec<Expr>,
        body: Box<Stmt>,
    },
    Repeat {
        count: Expr,
        body: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Case {
        selector: Expr,
        items: Vec<CaseItemSyntax>,
    },
}

/// A function-local variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarSyntax {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub ty: TypeSyntax,
    pub unpacked_dims: Vec<DimensionSyntax>,
    pub init: Option<Expr>,
}

/// One arm of a case statement; empty `exprs` marks the default arm.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseItemSyntax {
    pub exprs: Vec<Expr>,
    pub body: Stmt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_helper_wraps_statements() {
        let s = Stmt::block(vec![Stmt::ret(Some(Expr::int(1)))]);
        match s.kind {
            StmtKind::Block { ref stmts } => assert_eq!(stmts.len(), 1),
            _ => panic!("expected Block"),
        }
    }

    #[test]
    fn default_case_arm_has_no_exprs() {
        let arm = CaseItemSyntax {
            exprs: Vec::new(),
            body: Stmt::ret(None),
        };
        assert!(arm.exprs.is_empty());
    }
}
