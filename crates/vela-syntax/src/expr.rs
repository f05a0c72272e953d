use smol_str::SmolStr;
use vela_source::TextRange;

use crate::ty::TypeSyntax;

/// An expression as produced by the parser.
///
/// The binder consumes exactly these kinds; anything it does not
/// recognize becomes an `Invalid` bound expression with a diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: TextRange,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
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

    /// Integer literal in decoded form; `digits` has underscores
    /// stripped and may contain x/z/? characters for based forms.
    pub fn int_literal(width: Option<u32>, signed: bool, base: LiteralBase, digits: &str) -> Self {
        Self::new(ExprKind::IntLiteral(IntLiteral {
            width,
            signed,
            base,
            digits: SmolStr::new(digits),
        }))
    }

    /// Unsized decimal literal, e.g. `42`. Negative values become a
    /// unary minus over the magnitude, the way a parser would emit
    /// them.
    pub fn int(value: i64) -> Self {
        let literal = Self::int_literal(
            None,
            true,
            LiteralBase::Decimal,
            &value.unsigned_abs().to_string(),
        );
        if value < 0 {
            Self::unary(UnaryOp::Minus, literal)
        } else {
            literal
        }
    }

    pub fn name(name: &str) -> Self {
        Self::new(ExprKind::Name(SmolStr::new(name)))
    }

    pub fn hier_name(parts: &[&str]) -> Self {
        Self::new(ExprKind::HierName(
            parts.iter().map(|p| SmolStr::new(p)).collect(),
        ))
    }

    pub fn scoped(package: &str, name: &str) -> Self {
        Self::new(ExprKind::Scoped {
            package: SmolStr::new(package),
            name: SmolStr::new(name),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn conditional(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Self::new(ExprKind::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    pub fn assign(lhs: Expr, rhs: Expr) -> Self {
        Self::new(ExprKind::Assignment {
            op: None,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn compound_assign(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(ExprKind::Assignment {
            op: Some(op),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: Callee::Name(SmolStr::new(name)),
            args,
        })
    }

    pub fn system_call(name: &str, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: Callee::System(SmolStr::new(name)),
            args,
        })
    }

    pub fn method_call(base: Expr, name: &str, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: Callee::Method {
                base: Box::new(base),
                name: SmolStr::new(name),
            },
            args,
        })
    }

    pub fn element_select(base: Expr, index: Expr) -> Self {
        Self::new(ExprKind::ElementSelect {
            base: Box::new(base),
            index: Box::new(index),
        })
    }

    pub fn range_select(base: Expr, kind: RangeSelectKind, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::RangeSelect {
            base: Box::new(base),
            kind,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn member(base: Expr, name: &str) -> Self {
        Self::new(ExprKind::Member {
            base: Box::new(base),
            name: SmolStr::new(name),
        })
    }

    pub fn concat(operands: Vec<Expr>) -> Self {
        Self::new(ExprKind::Concat(operands))
    }

    pub fn replication(count: Expr, operands: Vec<Expr>) -> Self {
        Self::new(ExprKind::Replication {
            count: Box::new(count),
            operands,
        })
    }

    pub fn string(text: &str) -> Self {
        Self::new(ExprKind::StringLiteral(SmolStr::new(text)))
    }

    pub fn real(value: f64) -> Self {
        Self::new(ExprKind::RealLiteral(value))
    }

    pub fn unbased(kind: UnbasedKind) -> Self {
        Self::new(ExprKind::UnbasedUnsized(kind))
    }

    pub fn type_cast(target: TypeSyntax, operand: Expr) -> Self {
        Self::new(ExprKind::Cast {
            target: CastTarget::Type(Box::new(target)),
            operand: Box::new(operand),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLiteral(IntLiteral),
    UnbasedUnsized(UnbasedKind),
    RealLiteral(f64),
    StringLiteral(SmolStr),
    Null,
    /// `$` in queue/range positions.
    Unbounded,
    Name(SmolStr),
    /// Pure dotted identifier chain `a.b.c`; the binder resolves the
    /// head and re-applies the remainder as selectors.
    HierName(Vec<SmolStr>),
    /// `pkg::name`.
    Scoped {
        package: SmolStr,
        name: SmolStr,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Assignment {
        /// `Some` for compound forms (`+=` carries `BinaryOp::Add`).
        op: Option<BinaryOp>,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Concat(Vec<Expr>),
    Replication {
        count: Box<Expr>,
        operands: Vec<Expr>,
    },
    ElementSelect {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    RangeSelect {
        base: Box<Expr>,
        kind: RangeSelectKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Member {
        base: Box<Expr>,
        name: SmolStr,
    },
    Call {
        callee: Callee,
        args: Vec<Expr>,
    },
    Cast {
        target: CastTarget,
        operand: Box<Expr>,
    },
    MinTypMax {
        min: Box<Expr>,
        typ: Box<Expr>,
        max: Box<Expr>,
    },
    SimplePattern(Vec<Expr>),
    StructuredPattern(Vec<(PatternKey, Expr)>),
    ReplicatedPattern {
        count: Box<Expr>,
        operands: Vec<Expr>,
    },
    /// A data type in expression position, e.g. `$bits(int)`.
    DataType(Box<TypeSyntax>),
}

/// Decoded numeric literal: size prefix, sign marker, base, and raw
/// digit text (underscores stripped; x/z/? digits preserved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLiteral {
    pub width: Option<u32>,
    pub signed: bool,
    pub base: LiteralBase,
    pub digits: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralBase {
    Decimal,
    Hex,
    Octal,
    Binary,
}

impl LiteralBase {
    pub fn radix(self) -> u32 {
        match self {
            Self::Decimal => 10,
            Self::Hex => 16,
            Self::Octal => 8,
            Self::Binary => 2,
        }
    }

    /// Bits contributed per digit; decimal literals with x/z are
    /// restricted to a single digit by the language.
    pub fn bits_per_digit(self) -> u32 {
        match self {
            Self::Decimal => 0,
            Self::Hex => 4,
            Self::Octal => 3,
            Self::Binary => 1,
        }
    }
}

/// `'0`, `'1`, `'x`, `'z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbasedKind {
    Zero,
    One,
    X,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitwiseNot,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNand,
    BitwiseNor,
    BitwiseXnor,
    LogicalNot,
    Preincrement,
    Predecrement,
    Postincrement,
    Postdecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Power,
    BinaryAnd,
    BinaryOr,
    BinaryXor,
    BinaryXnor,
    Equality,
    Inequality,
    CaseEquality,
    CaseInequality,
    WildcardEquality,
    WildcardInequality,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    LogicalAnd,
    LogicalOr,
    LogicalImplication,
    LogicalEquivalence,
    LogicalShiftLeft,
    LogicalShiftRight,
    ArithmeticShiftLeft,
    ArithmeticShiftRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelectKind {
    /// `[msb:lsb]`
    Simple,
    /// `[base +: width]`
    IndexedUp,
    /// `[base -: width]`
    IndexedDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Name(SmolStr),
    /// `$`-prefixed system subroutine name, without the `$`.
    System(SmolStr),
    Method { base: Box<Expr>, name: SmolStr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKey {
    Field(SmolStr),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CastTarget {
    Type(Box<TypeSyntax>),
    Size(Box<Expr>),
    Signed(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_helper_builds_unsized_decimal() {
        let e = Expr::int(42);
        match e.kind {
            ExprKind::IntLiteral(ref lit) => {
                assert_eq!(lit.width, None);
                assert!(lit.signed);
                assert_eq!(lit.base, LiteralBase::Decimal);
                assert_eq!(lit.digits, "42");
            }
            _ => panic!("expected IntLiteral"),
        }
    }

    #[test]
    fn base_radix_values() {
        assert_eq!(LiteralBase::Hex.radix(), 16);
        assert_eq!(LiteralBase::Binary.bits_per_digit(), 1);
        assert_eq!(LiteralBase::Hex.bits_per_digit(), 4);
    }

    #[test]
    fn binary_helper_nests_operands() {
        let e = Expr::binary(BinaryOp::Add, Expr::int(3), Expr::int(4));
        match e.kind {
            ExprKind::Binary { op, .. } => assert_eq!(op, BinaryOp::Add),
            _ => panic!("expected Binary"),
        }
    }
}
