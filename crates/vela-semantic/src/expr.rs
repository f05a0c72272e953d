//! The bound (typed) expression tree.
//!
//! Every node carries the shared header: a kind tag, a non-null
//! interned type, an optional folded constant, and the source range
//! it came from. Visitors dispatch on the tag.

use smol_str::SmolStr;
use vela_source::Span;
use vela_syntax::{BinaryOp, RangeSelectKind, UnaryOp};

use crate::symbols::SymbolId;
use crate::types::TypeId;
use crate::value::{ConstantValue, Logic, LogicInt};

#[derive(Debug)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub ty: TypeId,
    /// Filled by constant folding; `None` for non-constant trees.
    pub constant: Option<ConstantValue>,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: TypeId, span: Span) -> Self {
        Self {
            kind,
            ty,
            constant: None,
            span,
        }
    }

    /// Wrap a bad subtree; the error type silently absorbs further
    /// operations so one mistake does not cascade.
    pub fn invalid(error_type: TypeId, span: Span, inner: Option<Expression>) -> Self {
        Self::new(
            ExpressionKind::Invalid(inner.map(Box::new)),
            error_type,
            span,
        )
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, ExpressionKind::Invalid(_))
    }
}

#[derive(Debug)]
pub enum ExpressionKind {
    Invalid(Option<Box<Expression>>),
    IntegerLiteral(LogicInt),
    RealLiteral(f64),
    StringLiteral(SmolStr),
    NullLiteral,
    UnboundedLiteral,
    /// `'0`/`'1`/`'x`/`'z` before context sizing; propagation widens
    /// the node's type and the fill bit replicates.
    UnbasedUnsizedLiteral(Logic),
    NamedValue {
        symbol: SymbolId,
        /// Reached through a hierarchical path; such references are
        /// rejected in constant contexts.
        hierarchical: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Conditional {
        cond: Box<Expression>,
        then_expr: Box<Expression>,
        else_expr: Box<Expression>,
    },
    Assignment {
        /// `Some` for compound assignment.
        op: Option<BinaryOp>,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Concat {
        operands: Vec<Expression>,
    },
    Replication {
        count: Box<Expression>,
        operands: Vec<Expression>,
    },
    ElementSelect {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    RangeSelect {
        base: Box<Expression>,
        kind: RangeSelectKind,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    MemberAccess {
        base: Box<Expression>,
        name: SmolStr,
        /// Position of the field in the struct/union field list.
        field_index: u32,
    },
    Call(CallInfo),
    /// Implicit or explicit conversion to this node's type.
    Conversion {
        operand: Box<Expression>,
    },
    /// A data type in expression position; the type IS the payload.
    DataType,
    SimplePattern {
        elements: Vec<Expression>,
    },
    /// Normalized to target order during binding: element `i` matches
    /// field/element `i` of the target type.
    StructuredPattern {
        elements: Vec<Expression>,
    },
    ReplicatedPattern {
        count: Box<Expression>,
        operands: Vec<Expression>,
    },
}

#[derive(Debug)]
pub enum CallInfo {
    User {
        subroutine: SymbolId,
        args: Vec<Expression>,
    },
    System {
        name: SmolStr,
        args: Vec<Expression>,
    },
    Method {
        base: Box<Expression>,
        name: SmolStr,
        args: Vec<Expression>,
    },
}
