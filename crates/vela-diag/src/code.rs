use core::fmt;

/// Identity code for a diagnostic, composed of a namespace and a number.
///
/// Namespace strings use dotted hierarchy (e.g. `"vela.lookup"`).
/// Numbers are unique within a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode {
    pub namespace: &'static str,
    pub number: u32,
}

impl DiagCode {
    // Name resolution.
    pub const UNDECLARED_IDENTIFIER: Self = Self {
        namespace: "vela.lookup",
        number: 1,
    };
    pub const USED_BEFORE_DECLARED: Self = Self {
        namespace: "vela.lookup",
        number: 2,
    };
    pub const AMBIGUOUS_WILDCARD_IMPORT: Self = Self {
        namespace: "vela.lookup",
        number: 3,
    };
    pub const NOT_A_HIERARCHICAL_SCOPE: Self = Self {
        namespace: "vela.lookup",
        number: 4,
    };
    pub const HIERARCHICAL_NOT_ALLOWED_IN_CONSTANT: Self = Self {
        namespace: "vela.lookup",
        number: 5,
    };
    pub const TYPO_SUGGESTION: Self = Self {
        namespace: "vela.lookup",
        number: 6,
    };
    pub const NOT_A_TYPE: Self = Self {
        namespace: "vela.lookup",
        number: 7,
    };
    pub const NOT_A_VALUE: Self = Self {
        namespace: "vela.lookup",
        number: 8,
    };
    pub const UNKNOWN_PACKAGE: Self = Self {
        namespace: "vela.lookup",
        number: 9,
    };
    pub const UNKNOWN_MEMBER: Self = Self {
        namespace: "vela.lookup",
        number: 10,
    };

    // Types and conversions.
    pub const BAD_CONVERSION: Self = Self {
        namespace: "vela.type",
        number: 1,
    };
    pub const WIDTH_TRUNCATION: Self = Self {
        namespace: "vela.type",
        number: 2,
    };
    pub const WIDTH_EXPANSION: Self = Self {
        namespace: "vela.type",
        number: 3,
    };
    pub const BAD_ASSIGNMENT: Self = Self {
        namespace: "vela.type",
        number: 4,
    };
    pub const INVALID_SELECT_BASE: Self = Self {
        namespace: "vela.type",
        number: 5,
    };
    pub const BAD_SELECT_BOUNDS: Self = Self {
        namespace: "vela.type",
        number: 6,
    };
    pub const UNKNOWN_FIELD: Self = Self {
        namespace: "vela.type",
        number: 7,
    };
    pub const WRONG_PATTERN_COUNT: Self = Self {
        namespace: "vela.type",
        number: 8,
    };

    // Expression binding.
    pub const BAD_UNARY_OPERAND: Self = Self {
        namespace: "vela.expr",
        number: 1,
    };
    pub const BAD_BINARY_OPERANDS: Self = Self {
        namespace: "vela.expr",
        number: 2,
    };
    pub const NOT_AN_LVALUE: Self = Self {
        namespace: "vela.expr",
        number: 3,
    };
    pub const UNKNOWN_SYNTAX: Self = Self {
        namespace: "vela.expr",
        number: 4,
    };
    pub const UNKNOWN_SYSTEM_SUBROUTINE: Self = Self {
        namespace: "vela.expr",
        number: 5,
    };
    pub const WRONG_ARGUMENT_COUNT: Self = Self {
        namespace: "vela.expr",
        number: 6,
    };
    pub const NOT_CALLABLE: Self = Self {
        namespace: "vela.expr",
        number: 7,
    };

    // Elaboration.
    pub const MAX_INSTANCE_DEPTH_EXCEEDED: Self = Self {
        namespace: "vela.elab",
        number: 1,
    };
    pub const MAX_GENERATE_STEPS_EXCEEDED: Self = Self {
        namespace: "vela.elab",
        number: 2,
    };
    pub const DEFPARAM_UNRESOLVED: Self = Self {
        namespace: "vela.elab",
        number: 3,
    };
    pub const UNKNOWN_PARAM_OVERRIDE: Self = Self {
        namespace: "vela.elab",
        number: 4,
    };
    pub const DUPLICATE_DEFINITION: Self = Self {
        namespace: "vela.elab",
        number: 5,
    };
    pub const UNKNOWN_DEFINITION: Self = Self {
        namespace: "vela.elab",
        number: 6,
    };
    pub const NO_TOP_MODULES: Self = Self {
        namespace: "vela.elab",
        number: 7,
    };
    pub const UNKNOWN_TOP_MODULE: Self = Self {
        namespace: "vela.elab",
        number: 8,
    };
    pub const ALREADY_FINALIZED: Self = Self {
        namespace: "vela.elab",
        number: 9,
    };
    pub const BIND_APPLIED_TWICE: Self = Self {
        namespace: "vela.elab",
        number: 10,
    };
    pub const DPI_EXPORT_UNKNOWN_SUBROUTINE: Self = Self {
        namespace: "vela.elab",
        number: 11,
    };
    pub const DPI_EXPORT_SIGNATURE_MISMATCH: Self = Self {
        namespace: "vela.elab",
        number: 12,
    };
    pub const TOO_MANY_ERRORS: Self = Self {
        namespace: "vela.elab",
        number: 13,
    };
    pub const DUPLICATE_MEMBER: Self = Self {
        namespace: "vela.elab",
        number: 14,
    };
    pub const GENVAR_NOT_CONSTANT: Self = Self {
        namespace: "vela.elab",
        number: 15,
    };
    pub const PARAMETER_WITHOUT_VALUE: Self = Self {
        namespace: "vela.elab",
        number: 16,
    };

    // Constant evaluation.
    pub const EVAL_STEP_LIMIT: Self = Self {
        namespace: "vela.eval",
        number: 1,
    };
    pub const EVAL_DEPTH_LIMIT: Self = Self {
        namespace: "vela.eval",
        number: 2,
    };
    pub const DIVIDE_BY_ZERO: Self = Self {
        namespace: "vela.eval",
        number: 3,
    };
    pub const SELECT_OUT_OF_RANGE: Self = Self {
        namespace: "vela.eval",
        number: 4,
    };
    pub const NOT_A_CONSTANT: Self = Self {
        namespace: "vela.eval",
        number: 5,
    };
    pub const CONST_EVAL_BACKTRACE: Self = Self {
        namespace: "vela.eval",
        number: 6,
    };
    pub const CONST_EVAL_FAILED: Self = Self {
        namespace: "vela.eval",
        number: 7,
    };

    // Internal precondition violations. Fatal; surfaced with a marker.
    pub const INTERNAL_ERROR: Self = Self {
        namespace: "vela.internal",
        number: 1,
    };
}

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.namespace, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_namespace_and_number() {
        assert_eq!(
            DiagCode::UNDECLARED_IDENTIFIER.to_string(),
            "vela.lookup[1]"
        );
        assert_eq!(DiagCode::EVAL_STEP_LIMIT.to_string(), "vela.eval[1]");
    }

    #[test]
    fn codes_compare_by_identity() {
        assert_eq!(DiagCode::DIVIDE_BY_ZERO, DiagCode::DIVIDE_BY_ZERO);
        assert_ne!(DiagCode::DIVIDE_BY_ZERO, DiagCode::EVAL_STEP_LIMIT);
    }
}
