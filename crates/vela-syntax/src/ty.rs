use smol_str::SmolStr;
use vela_source::TextRange;

use crate::expr::Expr;

/// A data type as written in source.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSyntax {
    pub kind: TypeSyntaxKind,
    pub range: TextRange,
}

impl TypeSyntax {
    pub fn new(kind: TypeSyntaxKind) -> Self {
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

    pub fn logic() -> Self {
        Self::new(TypeSyntaxKind::Scalar {
            kind: ScalarKind::Logic,
            signed: None,
            packed_dims: Vec::new(),
        })
    }

    pub fn logic_vec(msb: i64, lsb: i64) -> Self {
        Self::new(TypeSyntaxKind::Scalar {
            kind: ScalarKind::Logic,
            signed: None,
            packed_dims: vec![RangeSyntax::constant(msb, lsb)],
        })
    }

    pub fn bit() -> Self {
        Self::new(TypeSyntaxKind::Scalar {
            kind: ScalarKind::Bit,
            signed: None,
            packed_dims: Vec::new(),
        })
    }

    pub fn int() -> Self {
        Self::new(TypeSyntaxKind::Predefined {
            kind: PredefinedKind::Int,
            signed: None,
        })
    }

    pub fn integer() -> Self {
        Self::new(TypeSyntaxKind::Predefined {
            kind: PredefinedKind::Integer,
            signed: None,
        })
    }

    pub fn named(name: &str) -> Self {
        Self::new(TypeSyntaxKind::Named {
            path: vec![SmolStr::new(name)],
        })
    }

    pub fn implicit() -> Self {
        Self::new(TypeSyntaxKind::Implicit {
            signed: None,
            packed_dims: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSyntaxKind {
    /// `bit` / `logic` / `reg`, with optional signing and packed dims.
    Scalar {
        kind: ScalarKind,
        signed: Option<bool>,
        packed_dims: Vec<RangeSyntax>,
    },
    /// Predefined integer keywords; width and four-statedness are
    /// implied by the keyword.
    Predefined {
        kind: PredefinedKind,
        signed: Option<bool>,
    },
    Floating(FloatKind),
    Str,
    CHandle,
    Event,
    Void,
    /// Typedef or package-scoped type reference. A one-element path is
    /// a plain name; two elements are `pkg::name`.
    Named { path: Vec<SmolStr> },
    Enum {
        base: Option<Box<TypeSyntax>>,
        members: Vec<EnumMemberSyntax>,
    },
    Struct {
        packed: bool,
        signed: Option<bool>,
        is_union: bool,
        fields: Vec<StructFieldSyntax>,
    },
    /// Parameter/net declarations without an explicit type keyword.
    Implicit {
        signed: Option<bool>,
        packed_dims: Vec<RangeSyntax>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bit,
    Logic,
    Reg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedKind {
    Byte,
    ShortInt,
    Int,
    LongInt,
    Integer,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    Real,
    ShortReal,
    RealTime,
}

/// `[msb:lsb]` with constant expressions for the bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSyntax {
    pub msb: Expr,
    pub lsb: Expr,
    pub range: TextRange,
}

impl RangeSyntax {
    pub fn new(msb: Expr, lsb: Expr) -> Self {
        Self {
            msb,
            lsb,
            range: TextRange::default(),
        }
    }

    pub fn constant(msb: i64, lsb: i64) -> Self {
        Self::new(Expr::int(msb), Expr::int(lsb))
    }
}

/// An unpacked dimension: `[msb:lsb]` or `[size]`.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionSyntax {
    Range(RangeSyntax),
    Size(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberSyntax {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub init: Option<Expr>,
}

impl EnumMemberSyntax {
    pub fn new(name: &str, init: Option<Expr>) -> Self {
        Self {
            name: SmolStr::new(name),
            name_range: TextRange::default(),
            init,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructFieldSyntax {
    pub name: SmolStr,
    pub name_range: TextRange,
    pub ty: TypeSyntax,
}

impl StructFieldSyntax {
    pub fn new(name: &str, ty: TypeSyntax) -> Self {
        Self {
            name: SmolStr::new(name),
            name_range: TextRange::default(),
            ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logic_vec_builds_one_packed_dim() {
        let ty = TypeSyntax::logic_vec(7, 0);
        match ty.kind {
            TypeSyntaxKind::Scalar {
                kind, packed_dims, ..
            } => {
                assert_eq!(kind, ScalarKind::Logic);
                assert_eq!(packed_dims.len(), 1);
            }
            _ => panic!("expected Scalar"),
        }
    }

    #[test]
    fn named_path_single_element() {
        let ty = TypeSyntax::named("word_t");
        match ty.kind {
            TypeSyntaxKind::Named { ref path } => assert_eq!(path[0], "word_t"),
            _ => panic!("expected Named"),
        }
    }
}
