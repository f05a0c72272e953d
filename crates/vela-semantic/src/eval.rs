//! The compile-time interpreter.
//!
//! Evaluation is a depth-first walk over the bound expression tree
//! with an explicit [`EvalContext`] threaded through: a frame stack
//! for call locals, a step counter bounded by `max_constexpr_steps`,
//! and a depth counter bounded by `max_constexpr_depth`. Failures
//! record diagnostics and surface as `ConstantValue::Bad`; division
//! by zero diagnoses but continues with all-X.

use std::collections::HashMap;

use smol_str::SmolStr;
use vela_diag::{DiagCode, Diagnostic};
use vela_source::Span;
use vela_syntax::{BinaryOp, RangeSelectKind, UnaryOp};

use crate::compilation::Compilation;
use crate::expr::{CallInfo, Expression, ExpressionKind};
use crate::stmt::{Statement, StatementKind};
use crate::symbols::{SymbolId, SymbolKind};
use crate::types::{Type, TypeId};
use crate::value::{ConstantValue, Logic, LogicInt};

/// Whether the surrounding context demands a constant or is just
/// attempting a speculative fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EvalMode {
    Required,
    TryFold,
}

struct Frame {
    locals: HashMap<SymbolId, ConstantValue>,
}

/// Statement execution outcome.
enum Flow {
    Normal,
    Return(Option<ConstantValue>),
    Break,
    Continue,
}

pub(crate) struct EvalContext<'a> {
    comp: &'a Compilation,
    mode: EvalMode,
    steps: u32,
    depth: u32,
    frames: Vec<Frame>,
    call_stack: Vec<(SmolStr, Span)>,
    diags: Vec<Diagnostic>,
    /// Set once a budget diagnostic has been issued, so the unwind
    /// does not repeat it.
    budget_blown: bool,
    failed: bool,
}

impl<'a> EvalContext<'a> {
    pub(crate) fn new(comp: &'a Compilation, mode: EvalMode) -> Self {
        Self {
            comp,
            mode,
            steps: 0,
            depth: 0,
            frames: Vec::new(),
            call_stack: Vec::new(),
            diags: Vec::new(),
            budget_blown: false,
            failed: false,
        }
    }

    fn error(&mut self, code: DiagCode, span: Span, message: impl Into<String>) {
        self.failed = true;
        if self.mode == EvalMode::Required {
            let mut diag = Diagnostic::error(code, span, message);
            self.attach_backtrace(&mut diag);
            self.diags.push(diag);
        }
    }

    /// Attach the constant-call stack, bounded by the configured
    /// backtrace limit.
    fn attach_backtrace(&self, diag: &mut Diagnostic) {
        let limit = self.comp.options().max_constexpr_backtrace as usize;
        let total = self.call_stack.len();
        for (name, span) in self.call_stack.iter().rev().take(limit) {
            diag.add_note(format!("in call to `{name}`"), Some(*span));
        }
        if total > limit {
            diag.add_note(format!("... and {} more frames", total - limit), None);
        }
    }

    /// Count one evaluation step; diagnoses once when the budget runs
    /// out. The poisoned diagnostics channel aborts cooperatively
    /// from here as well.
    fn step(&mut self, span: Span) -> Option<()> {
        if self.budget_blown || self.comp.diags.is_poisoned() {
            return None;
        }
        self.steps += 1;
        if self.steps > self.comp.options().max_constexpr_steps {
            self.budget_blown = true;
            self.error(
                DiagCode::EVAL_STEP_LIMIT,
                span,
                format!(
                    "constant expression evaluation exceeded the limit of {} steps",
                    self.comp.options().max_constexpr_steps
                ),
            );
            return None;
        }
        Some(())
    }

    /// A built-in could not produce a value at compile time.
    pub(crate) fn note_system_failure(&mut self, name: &str, span: Span) {
        self.error(
            DiagCode::NOT_A_CONSTANT,
            span,
            format!("`{name}` could not be evaluated at compile time"),
        );
    }

    fn locals(&mut self) -> Option<&mut HashMap<SymbolId, ConstantValue>> {
        self.frames.last_mut().map(|f| &mut f.locals)
    }

    fn local_value(&self, symbol: SymbolId) -> Option<&ConstantValue> {
        self.frames.last()?.locals.get(&symbol)
    }

    // ------------------------------------------------------------------
    // Expression evaluation
    // ------------------------------------------------------------------

    pub(crate) fn eval(&mut self, expr: &Expression) -> Option<ConstantValue> {
        self.step(expr.span)?;
        match &expr.kind {
            ExpressionKind::Invalid(_) => None,
            ExpressionKind::IntegerLiteral(v) => Some(ConstantValue::Integer(v.clone())),
            ExpressionKind::RealLiteral(v) => Some(ConstantValue::Real(*v)),
            ExpressionKind::StringLiteral(s) => Some(ConstantValue::Str(s.clone())),
            ExpressionKind::NullLiteral => Some(ConstantValue::NullHandle),
            ExpressionKind::UnboundedLiteral => Some(ConstantValue::Unbounded),
            ExpressionKind::UnbasedUnsizedLiteral(_) | ExpressionKind::DataType => {
                expr.constant.clone().or(Some(ConstantValue::Bad))
            }
            ExpressionKind::NamedValue {
                symbol,
                hierarchical,
            } => self.eval_named(*symbol, *hierarchical, expr.span),
            ExpressionKind::Unary { op, operand } => self.eval_unary(*op, operand, expr),
            ExpressionKind::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, expr),
            ExpressionKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => self.eval_conditional(cond, then_expr, else_expr, expr),
            ExpressionKind::Assignment { op, lhs, rhs } => {
                self.eval_assignment(*op, lhs, rhs, expr)
            }
            ExpressionKind::Concat { operands } => self.eval_concat(operands, expr),
            ExpressionKind::Replication { count: _, operands } => {
                // Operand list was already expanded to the full
                // element sequence during binding for patterns; for
                // vector replication the bound width tells the count.
                self.eval_concat_repeated(operands, expr)
            }
            ExpressionKind::ElementSelect { base, index } => {
                self.eval_element_select(base, index, expr)
            }
            ExpressionKind::RangeSelect {
                base,
                kind,
                left,
                right,
            } => self.eval_range_select(base, *kind, left, right, expr),
            ExpressionKind::MemberAccess {
                base,
                name,
                field_index,
            } => self.eval_member_access(base, name, *field_index, expr),
            ExpressionKind::Call(call) => self.eval_call(call, expr),
            ExpressionKind::Conversion { operand } => {
                let value = self.eval(operand)?;
                Some(self.convert(value, operand.ty, expr.ty, expr.span))
            }
            ExpressionKind::SimplePattern { elements }
            | ExpressionKind::StructuredPattern { elements } => {
                self.eval_pattern(elements, expr)
            }
            ExpressionKind::ReplicatedPattern { count: _, operands } => {
                self.eval_pattern(operands, expr)
            }
        }
    }

    fn eval_named(
        &mut self,
        symbol: SymbolId,
        hierarchical: bool,
        span: Span,
    ) -> Option<ConstantValue> {
        if hierarchical && self.mode == EvalMode::Required {
            self.error(
                DiagCode::HIERARCHICAL_NOT_ALLOWED_IN_CONSTANT,
                span,
                "hierarchical references cannot appear in constant expressions",
            );
            return None;
        }
        if let Some(local) = self.local_value(symbol) {
            return Some(local.clone());
        }
        let sym = self.comp.symbol(symbol);
        match &sym.kind {
            SymbolKind::Parameter(info) => match &info.value {
                Some(value) => Some(value.clone()),
                None => {
                    self.error(
                        DiagCode::NOT_A_CONSTANT,
                        span,
                        format!("parameter `{}` is used before its value is computed", sym.name),
                    );
                    None
                }
            },
            SymbolKind::EnumValue { value, .. } => {
                Some(ConstantValue::Integer(value.clone()))
            }
            SymbolKind::Variable(_) | SymbolKind::Net(_) => {
                self.error(
                    DiagCode::NOT_A_CONSTANT,
                    span,
                    format!("`{}` is not a constant", sym.name),
                );
                None
            }
            _ => {
                self.error(
                    DiagCode::NOT_A_CONSTANT,
                    span,
                    format!("`{}` cannot be used in a constant expression", sym.name),
                );
                None
            }
        }
    }

    fn int_operand(&mut self, expr: &Expression) -> Option<LogicInt> {
        let value = self.eval(expr)?;
        self.as_integer(value, expr.ty)
    }

    /// Flatten a value to its packed integer form, concatenating
    /// aggregate members where the type is packed.
    fn as_integer(&mut self, value: ConstantValue, ty: TypeId) -> Option<LogicInt> {
        match value {
            ConstantValue::Integer(v) => Some(v),
            ConstantValue::Fields(fields) => {
                let (Type::PackedStruct { fields: infos } | Type::PackedUnion { fields: infos }) =
                    self.comp.types.get(ty)
                else {
                    return None;
                };
                let infos = infos.clone();
                let mut acc: Option<LogicInt> = None;
                for ((_, value), info) in fields.into_iter().zip(infos) {
                    let piece = self.as_integer(value, info.ty)?;
                    acc = Some(match acc {
                        Some(prev) => prev.concat(&piece),
                        None => piece,
                    });
                }
                acc
            }
            ConstantValue::Str(s) => {
                let width = (s.len().max(1) * 8) as u32;
                let mut v = LogicInt::zero(width);
                for (i, byte) in s.bytes().rev().enumerate() {
                    for bit in 0..8 {
                        if byte & (1 << bit) != 0 {
                            v.set_bit((i * 8) as u32 + bit, Logic::One);
                        }
                    }
                }
                Some(v)
            }
            _ => None,
        }
    }

    fn eval_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expression,
        expr: &Expression,
    ) -> Option<ConstantValue> {
        use UnaryOp::*;
        if matches!(op, Preincrement | Predecrement | Postincrement | Postdecrement) {
            return self.eval_incdec(op, operand, expr);
        }

        if self.comp.types.is_floating(operand.ty) {
            let value = self.eval(operand)?;
            let ConstantValue::Real(v) = value else {
                return None;
            };
            return match op {
                Plus => Some(ConstantValue::Real(v)),
                Minus => Some(ConstantValue::Real(-v)),
                LogicalNot => Some(ConstantValue::Integer(LogicInt::from_u64(
                    1,
                    u64::from(v == 0.0),
                ))),
                _ => None,
            };
        }

        let v = self.int_operand(operand)?;
        let result = match op {
            Plus => v,
            Minus => v.neg(),
            BitwiseNot => v.not(),
            BitwiseAnd => LogicInt::filled(1, v.reduce_and()),
            BitwiseNand => LogicInt::filled(1, logic_not(v.reduce_and())),
            BitwiseOr => LogicInt::filled(1, v.reduce_or()),
            BitwiseNor => LogicInt::filled(1, logic_not(v.reduce_or())),
            BitwiseXor => LogicInt::filled(1, v.reduce_xor()),
            BitwiseXnor => LogicInt::filled(1, logic_not(v.reduce_xor())),
            LogicalNot => LogicInt::filled(1, logic_not(v.truthy())),
            Preincrement | Predecrement | Postincrement | Postdecrement => unreachable!(),
        };
        Some(ConstantValue::Integer(result))
    }

    fn eval_incdec(
        &mut self,
        op: UnaryOp,
        operand: &Expression,
        expr: &Expression,
    ) -> Option<ConstantValue> {
        let lvalue = self.eval_lvalue(operand)?;
        let old = self.int_operand(operand)?;
        let one = LogicInt::from_i64(old.width().max(1), old.is_signed(), 1);
        let new = match op {
            UnaryOp::Preincrement | UnaryOp::Postincrement => old.add(&one),
            _ => old.sub(&one),
        };
        self.store(&lvalue, ConstantValue::Integer(new.clone()), expr.span)?;
        let result = match op {
            UnaryOp::Preincrement | UnaryOp::Predecrement => new,
            _ => old,
        };
        Some(ConstantValue::Integer(result))
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
        expr: &Expression,
    ) -> Option<ConstantValue> {
        use BinaryOp::*;

        // Logical operators short-circuit; an unknown left side still
        // needs the right to merge.
        if matches!(op, LogicalAnd | LogicalOr | LogicalImplication | LogicalEquivalence) {
            return self.eval_logical(op, lhs, rhs);
        }

        if self.comp.types.is_floating(expr.ty)
            || (self.comp.types.is_floating(lhs.ty)
                && matches!(op, Equality | Inequality | LessThan | LessThanEqual | GreaterThan
                    | GreaterThanEqual))
        {
            return self.eval_real_binary(op, lhs, rhs);
        }

        if lhs.ty == self.comp.types.string_type() {
            return self.eval_string_binary(op, lhs, rhs);
        }

        let a = self.int_operand(lhs)?;
        let b = self.int_operand(rhs)?;

        let result = match op {
            Add => a.add(&b),
            Subtract => a.sub(&b),
            Multiply => a.mul(&b),
            Divide => match a.div(&b) {
                Some(v) => v,
                None => {
                    self.error(
                        DiagCode::DIVIDE_BY_ZERO,
                        expr.span,
                        "division by zero in constant expression",
                    );
                    LogicInt::all_x(a.width())
                }
            },
            Mod => match a.rem(&b) {
                Some(v) => v,
                None => {
                    self.error(
                        DiagCode::DIVIDE_BY_ZERO,
                        expr.span,
                        "modulo by zero in constant expression",
                    );
                    LogicInt::all_x(a.width())
                }
            },
            Power => a.pow(&b),
            BinaryAnd => a.and(&b),
            BinaryOr => a.or(&b),
            BinaryXor => a.xor(&b),
            BinaryXnor => a.xnor(&b),
            LogicalShiftLeft | ArithmeticShiftLeft => a.shl(&b),
            LogicalShiftRight => a.lshr(&b),
            ArithmeticShiftRight => a.ashr(&b),
            Equality => LogicInt::filled(1, a.eq_logic(&b)),
            Inequality => LogicInt::filled(1, logic_not(a.eq_logic(&b))),
            CaseEquality => LogicInt::from_u64(1, u64::from(a.case_eq(&b))),
            CaseInequality => LogicInt::from_u64(1, u64::from(!a.case_eq(&b))),
            WildcardEquality => LogicInt::filled(1, a.wildcard_eq(&b)),
            WildcardInequality => LogicInt::filled(1, logic_not(a.wildcard_eq(&b))),
            LessThan | LessThanEqual | GreaterThan | GreaterThanEqual => {
                match a.compare(&b) {
                    None => LogicInt::all_x(1),
                    Some(ord) => {
                        let truth = match op {
                            LessThan => ord.is_lt(),
                            LessThanEqual => ord.is_le(),
                            GreaterThan => ord.is_gt(),
                            _ => ord.is_ge(),
                        };
                        LogicInt::from_u64(1, u64::from(truth))
                    }
                }
            }
            LogicalAnd | LogicalOr | LogicalImplication | LogicalEquivalence => unreachable!(),
        };
        Some(ConstantValue::Integer(result))
    }

    fn eval_logical(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Option<ConstantValue> {
        let a = self.eval(lhs)?.truthy();
        let short = match (op, a) {
            (BinaryOp::LogicalAnd, Logic::Zero) => Some(Logic::Zero),
            (BinaryOp::LogicalOr, Logic::One) => Some(Logic::One),
            (BinaryOp::LogicalImplication, Logic::Zero) => Some(Logic::One),
            _ => None,
        };
        if let Some(result) = short {
            return Some(ConstantValue::Integer(LogicInt::filled(1, result)));
        }
        let b = self.eval(rhs)?.truthy();
        let result = match op {
            BinaryOp::LogicalAnd => logic_and(a, b),
            BinaryOp::LogicalOr => logic_or(a, b),
            BinaryOp::LogicalImplication => logic_or(logic_not(a), b),
            _ => {
                // Equivalence: true when both sides agree.
                match (a, b) {
                    (Logic::X | Logic::Z, _) | (_, Logic::X | Logic::Z) => Logic::X,
                    (a, b) => Logic::from_bool(a == b),
                }
            }
        };
        Some(ConstantValue::Integer(LogicInt::filled(1, result)))
    }

    fn eval_real_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Option<ConstantValue> {
        let a = self.real_operand(lhs)?;
        let b = self.real_operand(rhs)?;
        use BinaryOp::*;
        let result = match op {
            Add => ConstantValue::Real(a + b),
            Subtract => ConstantValue::Real(a - b),
            Multiply => ConstantValue::Real(a * b),
            Divide => ConstantValue::Real(a / b),
            Power => ConstantValue::Real(a.powf(b)),
            Equality => bool_value(a == b),
            Inequality => bool_value(a != b),
            LessThan => bool_value(a < b),
            LessThanEqual => bool_value(a <= b),
            GreaterThan => bool_value(a > b),
            GreaterThanEqual => bool_value(a >= b),
            _ => return None,
        };
        Some(result)
    }

    fn real_operand(&mut self, expr: &Expression) -> Option<f64> {
        match self.eval(expr)? {
            ConstantValue::Real(v) => Some(v),
            ConstantValue::ShortReal(v) => Some(f64::from(v)),
            ConstantValue::Integer(v) => Some(v.to_real()),
            _ => None,
        }
    }

    fn eval_string_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Option<ConstantValue> {
        let (ConstantValue::Str(a), ConstantValue::Str(b)) =
            (self.eval(lhs)?, self.eval(rhs)?)
        else {
            return None;
        };
        use BinaryOp::*;
        let result = match op {
            Equality | CaseEquality => a == b,
            Inequality | CaseInequality => a != b,
            LessThan => a < b,
            LessThanEqual => a <= b,
            GreaterThan => a > b,
            GreaterThanEqual => a >= b,
            _ => return None,
        };
        Some(bool_value(result))
    }

    fn eval_conditional(
        &mut self,
        cond: &Expression,
        then_expr: &Expression,
        else_expr: &Expression,
        expr: &Expression,
    ) -> Option<ConstantValue> {
        match self.eval(cond)?.truthy() {
            Logic::One => self.eval(then_expr),
            Logic::Zero => self.eval(else_expr),
            _ => {
                // Unknown selector: merge both arms, X where they
                // disagree.
                let a = self.eval(then_expr)?;
                let b = self.eval(else_expr)?;
                if a == b {
                    return Some(a);
                }
                match (
                    self.as_integer(a, then_expr.ty),
                    self.as_integer(b, else_expr.ty),
                ) {
                    (Some(a), Some(b)) if a.width() == b.width() => {
                        let mut merged = LogicInt::all_x(a.width());
                        for i in 0..a.width() {
                            let (ba, bb) = (a.bit(i), b.bit(i));
                            if ba == bb && !ba.is_unknown() {
                                merged.set_bit(i, ba);
                            }
                        }
                        Some(ConstantValue::Integer(merged))
                    }
                    _ => {
                        let width =
                            self.comp.types.bit_width(expr.ty).unwrap_or(1);
                        Some(ConstantValue::Integer(LogicInt::all_x(width)))
                    }
                }
            }
        }
    }

    fn eval_assignment(
        &mut self,
        op: Option<BinaryOp>,
        lhs: &Expression,
        rhs: &Expression,
        expr: &Expression,
    ) -> Option<ConstantValue> {
        let lvalue = self.eval_lvalue(lhs)?;
        let value = match op {
            None => {
                let v = self.eval(rhs)?;
                self.convert(v, rhs.ty, lhs.ty, expr.span)
            }
            Some(op) => {
                let a = self.int_operand(lhs)?;
                let b = self.int_operand(rhs)?;
                let b = b.convert(a.width(), a.is_signed());
                let result = match op {
                    BinaryOp::Add => a.add(&b),
                    BinaryOp::Subtract => a.sub(&b),
                    BinaryOp::Multiply => a.mul(&b),
                    BinaryOp::Divide => match a.div(&b) {
                        Some(v) => v,
                        None => {
                            self.error(
                                DiagCode::DIVIDE_BY_ZERO,
                                expr.span,
                                "division by zero in constant expression",
                            );
                            LogicInt::all_x(a.width())
                        }
                    },
                    BinaryOp::Mod => match a.rem(&b) {
                        Some(v) => v,
                        None => {
                            self.error(
                                DiagCode::DIVIDE_BY_ZERO,
                                expr.span,
                                "modulo by zero in constant expression",
                            );
                            LogicInt::all_x(a.width())
                        }
                    },
                    BinaryOp::BinaryAnd => a.and(&b),
                    BinaryOp::BinaryOr => a.or(&b),
                    BinaryOp::BinaryXor => a.xor(&b),
                    BinaryOp::LogicalShiftLeft | BinaryOp::ArithmeticShiftLeft => a.shl(&b),
                    BinaryOp::LogicalShiftRight => a.lshr(&b),
                    BinaryOp::ArithmeticShiftRight => a.ashr(&b),
                    _ => return None,
                };
                ConstantValue::Integer(result)
            }
        };
        self.store(&lvalue, value.clone(), expr.span)?;
        Some(value)
    }

    fn eval_concat(
        &mut self,
        operands: &[Expression],
        expr: &Expression,
    ) -> Option<ConstantValue> {
        if expr.ty == self.comp.types.string_type() {
            let mut s = String::new();
            for operand in operands {
                let ConstantValue::Str(piece) = self.eval(operand)? else {
                    return None;
                };
                s.push_str(&piece);
            }
            return Some(ConstantValue::Str(SmolStr::new(s)));
        }
        let mut acc: Option<LogicInt> = None;
        for operand in operands {
            let piece = self.int_operand(operand)?;
            acc = Some(match acc {
                Some(prev) => prev.concat(&piece),
                None => piece,
            });
        }
        Some(ConstantValue::Integer(acc?))
    }

    /// Vector replication: the result width on the expression tells
    /// how many copies of the operand list to emit.
    fn eval_concat_repeated(
        &mut self,
        operands: &[Expression],
        expr: &Expression,
    ) -> Option<ConstantValue> {
        let mut unit: Option<LogicInt> = None;
        for operand in operands {
            let piece = self.int_operand(operand)?;
            unit = Some(match unit {
                Some(prev) => prev.concat(&piece),
                None => piece,
            });
        }
        let unit = unit?;
        let total = self.comp.types.bit_width(expr.ty)?;
        let copies = if unit.width() == 0 { 0 } else { total / unit.width() };
        let mut acc = unit.clone();
        for _ in 1..copies {
            acc = acc.concat(&unit);
        }
        Some(ConstantValue::Integer(acc))
    }

    fn eval_element_select(
        &mut self,
        base: &Expression,
        index: &Expression,
        expr: &Expression,
    ) -> Option<ConstantValue> {
        let base_value = self.eval(base)?;
        let idx = self.int_operand(index)?;
        let Some(idx) = idx.to_i64() else {
            let width = self.comp.types.bit_width(expr.ty).unwrap_or(1);
            return Some(ConstantValue::Integer(LogicInt::all_x(width)));
        };

        match self.comp.types.get(base.ty) {
            Type::UnpackedArray { dims, .. } => {
                let Some(dim) = dims.first().copied() else {
                    return None;
                };
                let ConstantValue::Elements(elements) = base_value else {
                    return None;
                };
                let offset = (idx - i64::from(dim.msb)).unsigned_abs() as usize;
                let in_range = idx >= i64::from(dim.msb.min(dim.lsb))
                    && idx <= i64::from(dim.msb.max(dim.lsb));
                if !in_range || offset >= elements.len() {
                    self.error(
                        DiagCode::SELECT_OUT_OF_RANGE,
                        expr.span,
                        format!("index {idx} is out of bounds for the array"),
                    );
                    return None;
                }
                Some(elements[offset].clone())
            }
            Type::Str => {
                let ConstantValue::Str(s) = base_value else {
                    return None;
                };
                let byte = usize::try_from(idx)
                    .ok()
                    .and_then(|i| s.as_bytes().get(i).copied())
                    .unwrap_or(0);
                Some(ConstantValue::Integer(LogicInt::from_u64(8, u64::from(byte))))
            }
            _ => {
                let v = self.as_integer(base_value, base.ty)?;
                let (msb, lsb) = self
                    .comp
                    .types
                    .packed_bounds(base.ty)
                    .unwrap_or((v.width() as i32 - 1, 0));
                let pos = if msb >= lsb { idx - i64::from(lsb) } else { i64::from(lsb) - idx };
                if pos < 0 || pos >= i64::from(v.width()) {
                    self.error(
                        DiagCode::SELECT_OUT_OF_RANGE,
                        expr.span,
                        format!("bit index {idx} is out of range"),
                    );
                    return Some(ConstantValue::Integer(LogicInt::all_x(1)));
                }
                Some(ConstantValue::Integer(LogicInt::filled(
                    1,
                    v.bit(pos as u32),
                )))
            }
        }
    }

    fn eval_range_select(
        &mut self,
        base: &Expression,
        kind: RangeSelectKind,
        left: &Expression,
        right: &Expression,
        expr: &Expression,
    ) -> Option<ConstantValue> {
        let v = self.int_operand(base)?;
        let l = self.int_operand(left)?.to_i64()?;
        let r = self.int_operand(right)?.to_i64()?;
        let width = self.comp.types.bit_width(expr.ty)?;
        let (msb, lsb) = self
            .comp
            .types
            .packed_bounds(base.ty)
            .unwrap_or((v.width() as i32 - 1, 0));

        // Normalize the low index of the selection in declared
        // coordinates.
        let low_index = match kind {
            RangeSelectKind::Simple => l.min(r),
            RangeSelectKind::IndexedUp => l,
            RangeSelectKind::IndexedDown => l - i64::from(width) + 1,
        };
        let pos = if msb >= lsb {
            low_index - i64::from(lsb)
        } else {
            i64::from(lsb) - (low_index + i64::from(width) - 1)
        };
        if pos < 0 || pos + i64::from(width) > i64::from(v.width()) {
            self.error(
                DiagCode::SELECT_OUT_OF_RANGE,
                expr.span,
                "part-select is out of range",
            );
            return Some(ConstantValue::Integer(LogicInt::all_x(width)));
        }
        Some(ConstantValue::Integer(v.extract(pos, width)))
    }

    fn eval_member_access(
        &mut self,
        base: &Expression,
        name: &str,
        field_index: u32,
        expr: &Expression,
    ) -> Option<ConstantValue> {
        let base_value = self.eval(base)?;
        if let ConstantValue::Fields(fields) = &base_value {
            if let Some((_, value)) = fields.iter().find(|(n, _)| n.as_str() == name) {
                return Some(value.clone());
            }
        }
        // Packed representation: extract the field's bit range.
        let fields = match self.comp.types.get(base.ty) {
            Type::PackedStruct { fields } => fields.clone(),
            Type::PackedUnion { fields } => {
                let v = self.as_integer(base_value, base.ty)?;
                let fields = fields.clone();
                let width = self
                    .comp
                    .types
                    .bit_width(fields.get(field_index as usize)?.ty)?;
                return Some(ConstantValue::Integer(v.extract(0, width)));
            }
            _ => return None,
        };
        let v = self.as_integer(base_value, base.ty)?;
        // Later fields occupy lower bits; the first field is most
        // significant.
        let mut offset = 0u32;
        for field in fields.iter().skip(field_index as usize + 1) {
            offset += self.comp.types.bit_width(field.ty)?;
        }
        let width = self.comp.types.bit_width(expr.ty)?;
        Some(ConstantValue::Integer(v.extract(i64::from(offset), width)))
    }

    fn eval_pattern(
        &mut self,
        elements: &[Expression],
        expr: &Expression,
    ) -> Option<ConstantValue> {
        match self.comp.types.get(expr.ty) {
            Type::UnpackedArray { .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element)?);
                }
                Some(ConstantValue::Elements(values))
            }
            Type::PackedStruct { fields } | Type::PackedUnion { fields } => {
                let names: Vec<SmolStr> = fields.iter().map(|f| f.name.clone()).collect();
                let mut values = Vec::with_capacity(elements.len());
                for (element, name) in elements.iter().zip(names) {
                    values.push((name, self.eval(element)?));
                }
                Some(ConstantValue::Fields(values))
            }
            _ => None,
        }
    }

    fn eval_call(&mut self, call: &CallInfo, expr: &Expression) -> Option<ConstantValue> {
        match call {
            CallInfo::System { name, args } => {
                crate::system::eval_system_call(self.comp, self, name, args, expr)
            }
            CallInfo::Method { base, name, args } => {
                crate::system::eval_method_call(self.comp, self, base, name, args, expr)
            }
            CallInfo::User { subroutine, args } => self.eval_user_call(*subroutine, args, expr),
        }
    }

    fn eval_user_call(
        &mut self,
        subroutine: SymbolId,
        args: &[Expression],
        expr: &Expression,
    ) -> Option<ConstantValue> {
        let sym = self.comp.symbol(subroutine);
        let SymbolKind::Subroutine(info) = &sym.kind else {
            return None;
        };
        let name = sym.name.clone();

        if info.dpi_import.is_some() {
            self.error(
                DiagCode::NOT_A_CONSTANT,
                expr.span,
                format!("DPI import `{name}` cannot be called at compile time"),
            );
            return None;
        }
        let Some(body) = &info.body else {
            self.error(
                DiagCode::NOT_A_CONSTANT,
                expr.span,
                format!("`{name}` has no body available for constant evaluation"),
            );
            return None;
        };

        self.depth += 1;
        if self.depth > self.comp.options().max_constexpr_depth {
            self.error(
                DiagCode::EVAL_DEPTH_LIMIT,
                expr.span,
                format!(
                    "constant function calls exceeded the depth limit of {}",
                    self.comp.options().max_constexpr_depth
                ),
            );
            self.depth -= 1;
            return None;
        }

        // Evaluate actuals in the caller's frame, then populate the
        // callee's locals.
        let mut locals = HashMap::new();
        for (i, &arg_sym) in info.args.iter().enumerate() {
            let value = match args.get(i) {
                Some(actual) => self.eval(actual)?,
                None => {
                    let SymbolKind::Variable(vinfo) = &self.comp.symbol(arg_sym).kind else {
                        return None;
                    };
                    match &vinfo.initializer {
                        Some(default) => self.eval(default)?,
                        None => return None,
                    }
                }
            };
            locals.insert(arg_sym, value);
        }

        self.frames.push(Frame { locals });
        self.call_stack.push((name, expr.span));
        let flow = self.exec(body);
        self.call_stack.pop();
        self.frames.pop();
        self.depth -= 1;

        match flow? {
            Flow::Return(Some(value)) => Some(value),
            Flow::Return(None) | Flow::Normal | Flow::Break | Flow::Continue => {
                let SymbolKind::Subroutine(info) = &self.comp.symbol(subroutine).kind else {
                    return None;
                };
                Some(self.comp.types.default_value(info.return_ty))
            }
        }
    }

    // ------------------------------------------------------------------
    // Statement execution
    // ------------------------------------------------------------------

    fn exec(&mut self, stmt: &Statement) -> Option<Flow> {
        self.step(stmt.span)?;
        match &stmt.kind {
            StatementKind::Invalid => None,
            StatementKind::Block(stmts) => {
                for s in stmts {
                    match self.exec(s)? {
                        Flow::Normal => {}
                        other => return Some(other),
                    }
                }
                Some(Flow::Normal)
            }
            StatementKind::VarDecl {
                symbol,
                initializer,
            } => {
                let value = match initializer {
                    Some(init) => self.eval(init)?,
                    None => {
                        let ty = match &self.comp.symbol(*symbol).kind {
                            SymbolKind::Variable(info) => info.ty,
                            _ => return None,
                        };
                        self.comp.types.default_value(ty)
                    }
                };
                self.locals()?.insert(*symbol, value);
                Some(Flow::Normal)
            }
            StatementKind::Expr(expr) => {
                self.eval(expr)?;
                Some(Flow::Normal)
            }
            StatementKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => match self.eval(cond)?.truthy() {
                Logic::One => self.exec(then_stmt),
                _ => match else_stmt {
                    Some(s) => self.exec(s),
                    None => Some(Flow::Normal),
                },
            },
            StatementKind::For {
                init,
                cond,
                steps,
                body,
            } => {
                for s in init {
                    match self.exec(s)? {
                        Flow::Normal => {}
                        other => return Some(other),
                    }
                }
                loop {
                    if let Some(cond) = cond
                        && self.eval(cond)?.truthy() != Logic::One
                    {
                        break;
                    }
                    match self.exec(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Some(ret),
                    }
                    for step in steps {
                        self.eval(step)?;
                    }
                }
                Some(Flow::Normal)
            }
            StatementKind::Repeat { count, body } => {
                let n = self
                    .eval(count)?
                    .into_integer()
                    .and_then(|v| v.to_i64())
                    .unwrap_or(0);
                for _ in 0..n.max(0) {
                    match self.exec(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Some(ret),
                    }
                }
                Some(Flow::Normal)
            }
            StatementKind::While { cond, body } => {
                while self.eval(cond)?.truthy() == Logic::One {
                    match self.exec(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Some(ret),
                    }
                }
                Some(Flow::Normal)
            }
            StatementKind::Return(value) => {
                let value = match value {
                    Some(v) => Some(self.eval(v)?),
                    None => None,
                };
                Some(Flow::Return(value))
            }
            StatementKind::Break => Some(Flow::Break),
            StatementKind::Continue => Some(Flow::Continue),
            StatementKind::Case { selector, items } => {
                let sel = self.int_operand(selector)?;
                let mut default: Option<&Statement> = None;
                for item in items {
                    if item.matches.is_empty() {
                        default = Some(&item.body);
                        continue;
                    }
                    for matcher in &item.matches {
                        let m = self.int_operand(matcher)?;
                        if sel.case_eq(&m.convert(sel.width(), sel.is_signed())) {
                            return self.exec(&item.body);
                        }
                    }
                }
                match default {
                    Some(body) => self.exec(body),
                    None => Some(Flow::Normal),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // LValues and stores
    // ------------------------------------------------------------------

    fn eval_lvalue(&mut self, expr: &Expression) -> Option<LValue> {
        match &expr.kind {
            ExpressionKind::NamedValue { symbol, .. } => {
                if self.local_value(*symbol).is_none() {
                    self.error(
                        DiagCode::NOT_A_CONSTANT,
                        expr.span,
                        format!(
                            "cannot assign to `{}` in a constant expression",
                            self.comp.symbol(*symbol).name
                        ),
                    );
                    return None;
                }
                Some(LValue {
                    symbol: *symbol,
                    path: Vec::new(),
                })
            }
            ExpressionKind::ElementSelect { base, index } => {
                let mut lvalue = self.eval_lvalue(base)?;
                let idx = self.int_operand(index)?.to_i64()?;
                lvalue.path.push(PathEntry::Index {
                    index: idx,
                    base_ty: base.ty,
                });
                Some(lvalue)
            }
            ExpressionKind::RangeSelect {
                base, kind, left, right, ..
            } => {
                let mut lvalue = self.eval_lvalue(base)?;
                let l = self.int_operand(left)?.to_i64()?;
                let r = self.int_operand(right)?.to_i64()?;
                let width = self.comp.types.bit_width(expr.ty)?;
                lvalue.path.push(PathEntry::Range {
                    kind: *kind,
                    left: l,
                    right: r,
                    width,
                    base_ty: base.ty,
                });
                Some(lvalue)
            }
            ExpressionKind::MemberAccess {
                base, field_index, ..
            } => {
                let mut lvalue = self.eval_lvalue(base)?;
                lvalue.path.push(PathEntry::Member {
                    field_index: *field_index,
                    base_ty: base.ty,
                });
                Some(lvalue)
            }
            _ => {
                self.error(
                    DiagCode::NOT_A_CONSTANT,
                    expr.span,
                    "expression is not assignable in a constant context",
                );
                None
            }
        }
    }

    /// Store through an lvalue path, preserving untouched bits and
    /// letting X/Z flow into the written range.
    fn store(&mut self, lvalue: &LValue, value: ConstantValue, span: Span) -> Option<()> {
        let current = self.local_value(lvalue.symbol).cloned();
        let Some(current) = current else {
            self.error(
                DiagCode::NOT_A_CONSTANT,
                span,
                "assignment target is not a constant local",
            );
            return None;
        };
        let updated = self.store_path(current, &lvalue.path, value, span)?;
        self.locals()?.insert(lvalue.symbol, updated);
        Some(())
    }

    fn store_path(
        &mut self,
        current: ConstantValue,
        path: &[PathEntry],
        value: ConstantValue,
        span: Span,
    ) -> Option<ConstantValue> {
        let Some((entry, rest)) = path.split_first() else {
            return Some(value);
        };
        match entry {
            PathEntry::Index { index, base_ty } => {
                match self.comp.types.get(*base_ty) {
                    Type::UnpackedArray { dims, .. } => {
                        let dim = dims.first().copied()?;
                        let ConstantValue::Elements(mut elements) = current else {
                            return None;
                        };
                        let offset = (index - i64::from(dim.msb)).unsigned_abs() as usize;
                        if offset >= elements.len() {
                            self.error(
                                DiagCode::SELECT_OUT_OF_RANGE,
                                span,
                                format!("index {index} is out of bounds for the array"),
                            );
                            return None;
                        }
                        let inner = elements[offset].clone();
                        elements[offset] = self.store_path(inner, rest, value, span)?;
                        Some(ConstantValue::Elements(elements))
                    }
                    _ => {
                        let mut v = self.as_integer(current, *base_ty)?;
                        let (msb, lsb) = self
                            .comp
                            .types
                            .packed_bounds(*base_ty)
                            .unwrap_or((v.width() as i32 - 1, 0));
                        let pos = if msb >= lsb {
                            index - i64::from(lsb)
                        } else {
                            i64::from(lsb) - index
                        };
                        if pos < 0 || pos >= i64::from(v.width()) {
                            self.error(
                                DiagCode::SELECT_OUT_OF_RANGE,
                                span,
                                format!("bit index {index} is out of range"),
                            );
                            return None;
                        }
                        let bit = value
                            .integer()
                            .map(|b| b.bit(0))
                            .unwrap_or(Logic::X);
                        v.set_bit(pos as u32, bit);
                        Some(ConstantValue::Integer(v))
                    }
                }
            }
            PathEntry::Range {
                kind,
                left,
                right,
                width,
                base_ty,
            } => {
                let mut v = self.as_integer(current, *base_ty)?;
                let (msb, lsb) = self
                    .comp
                    .types
                    .packed_bounds(*base_ty)
                    .unwrap_or((v.width() as i32 - 1, 0));
                let low_index = match kind {
                    RangeSelectKind::Simple => (*left).min(*right),
                    RangeSelectKind::IndexedUp => *left,
                    RangeSelectKind::IndexedDown => *left - i64::from(*width) + 1,
                };
                let pos = if msb >= lsb {
                    low_index - i64::from(lsb)
                } else {
                    i64::from(lsb) - (low_index + i64::from(*width) - 1)
                };
                if pos < 0 || pos + i64::from(*width) > i64::from(v.width()) {
                    self.error(
                        DiagCode::SELECT_OUT_OF_RANGE,
                        span,
                        "part-select store is out of range",
                    );
                    return None;
                }
                let piece = value.integer().cloned().unwrap_or(LogicInt::all_x(*width));
                for i in 0..*width {
                    v.set_bit(pos as u32 + i, piece.bit(i));
                }
                Some(ConstantValue::Integer(v))
            }
            PathEntry::Member {
                field_index,
                base_ty,
            } => {
                if let ConstantValue::Fields(mut fields) = current {
                    let slot = fields.get_mut(*field_index as usize)?;
                    let inner = slot.1.clone();
                    slot.1 = self.store_path(inner, rest, value, span)?;
                    return Some(ConstantValue::Fields(fields));
                }
                let fields = match self.comp.types.get(*base_ty) {
                    Type::PackedStruct { fields } => fields.clone(),
                    _ => return None,
                };
                let mut v = self.as_integer(current, *base_ty)?;
                let mut offset = 0u32;
                for field in fields.iter().skip(*field_index as usize + 1) {
                    offset += self.comp.types.bit_width(field.ty)?;
                }
                let width = self
                    .comp
                    .types
                    .bit_width(fields.get(*field_index as usize)?.ty)?;
                let piece = value.integer().cloned().unwrap_or(LogicInt::all_x(width));
                for i in 0..width {
                    v.set_bit(offset + i, piece.bit(i));
                }
                Some(ConstantValue::Integer(v))
            }
        }
    }

    // ------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------

    fn convert(
        &mut self,
        value: ConstantValue,
        from: TypeId,
        to: TypeId,
        span: Span,
    ) -> ConstantValue {
        if from == to {
            return value;
        }
        if let Some(info) = self.comp.types.integral_info(to) {
            if self.comp.types.is_floating(from) {
                let v = match &value {
                    ConstantValue::Real(v) => *v,
                    ConstantValue::ShortReal(v) => f64::from(*v),
                    _ => return ConstantValue::Bad,
                };
                // Round to nearest, ties away from zero.
                return ConstantValue::Integer(LogicInt::from_i64(
                    info.width,
                    info.signed,
                    v.round() as i64,
                ));
            }
            return match self.as_integer(value, from) {
                Some(v) => ConstantValue::Integer(v.convert(info.width, info.signed)),
                None => {
                    self.error(
                        DiagCode::NOT_A_CONSTANT,
                        span,
                        "value cannot be converted to an integral constant",
                    );
                    ConstantValue::Bad
                }
            };
        }
        if self.comp.types.is_floating(to) {
            return match value {
                ConstantValue::Integer(v) => ConstantValue::Real(v.to_real()),
                ConstantValue::Real(_) | ConstantValue::ShortReal(_) => value,
                _ => ConstantValue::Bad,
            };
        }
        if to == self.comp.types.string_type() {
            return match value {
                ConstantValue::Str(_) => value,
                ConstantValue::Integer(v) => {
                    let mut bytes = Vec::new();
                    let mut i = v.width();
                    while i >= 8 {
                        i -= 8;
                        let byte = v.extract(i64::from(i), 8).to_u64().unwrap_or(0) as u8;
                        if byte != 0 {
                            bytes.push(byte);
                        }
                    }
                    ConstantValue::Str(SmolStr::new(String::from_utf8_lossy(&bytes)))
                }
                _ => ConstantValue::Bad,
            };
        }
        value
    }
}

/// An lvalue handle: a base symbol plus the selector path that a
/// store re-applies.
pub(crate) struct LValue {
    symbol: SymbolId,
    path: Vec<PathEntry>,
}

enum PathEntry {
    Index {
        index: i64,
        base_ty: TypeId,
    },
    Range {
        kind: RangeSelectKind,
        left: i64,
        right: i64,
        width: u32,
        base_ty: TypeId,
    },
    Member {
        field_index: u32,
        base_ty: TypeId,
    },
}

fn logic_not(l: Logic) -> Logic {
    match l {
        Logic::Zero => Logic::One,
        Logic::One => Logic::Zero,
        _ => Logic::X,
    }
}

fn logic_and(a: Logic, b: Logic) -> Logic {
    match (a, b) {
        (Logic::Zero, _) | (_, Logic::Zero) => Logic::Zero,
        (Logic::One, Logic::One) => Logic::One,
        _ => Logic::X,
    }
}

fn logic_or(a: Logic, b: Logic) -> Logic {
    match (a, b) {
        (Logic::One, _) | (_, Logic::One) => Logic::One,
        (Logic::Zero, Logic::Zero) => Logic::Zero,
        _ => Logic::X,
    }
}

fn bool_value(b: bool) -> ConstantValue {
    ConstantValue::Integer(LogicInt::from_u64(1, u64::from(b)))
}

/// Structural precondition: every symbol the expression references
/// must be constant-eligible. Runs before evaluation so the report
/// points at the offending reference, not a failed fold.
pub(crate) fn verify_constant(comp: &Compilation, expr: &Expression) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    verify_walk(comp, expr, &mut diags);
    diags
}

fn verify_walk(comp: &Compilation, expr: &Expression, diags: &mut Vec<Diagnostic>) {
    if let ExpressionKind::NamedValue { symbol, .. } = &expr.kind {
        let sym = comp.symbol(*symbol);
        if matches!(sym.kind, SymbolKind::Variable(_) | SymbolKind::Net(_)) {
            diags.push(Diagnostic::error(
                DiagCode::NOT_A_CONSTANT,
                expr.span,
                format!("`{}` is not a constant", sym.name),
            ));
        }
    }
    for_each_child(expr, &mut |child| verify_walk(comp, child, diags));
}

fn for_each_child(expr: &Expression, f: &mut dyn FnMut(&Expression)) {
    match &expr.kind {
        ExpressionKind::Invalid(inner) => {
            if let Some(inner) = inner {
                f(inner);
            }
        }
        ExpressionKind::Unary { operand, .. } | ExpressionKind::Conversion { operand } => {
            f(operand)
        }
        ExpressionKind::Binary { lhs, rhs, .. } | ExpressionKind::Assignment { lhs, rhs, .. } => {
            f(lhs);
            f(rhs);
        }
        ExpressionKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            f(cond);
            f(then_expr);
            f(else_expr);
        }
        ExpressionKind::Concat { operands }
        | ExpressionKind::SimplePattern { elements: operands }
        | ExpressionKind::StructuredPattern { elements: operands } => {
            for operand in operands {
                f(operand);
            }
        }
        ExpressionKind::Replication { count, operands }
        | ExpressionKind::ReplicatedPattern { count, operands } => {
            f(count);
            for operand in operands {
                f(operand);
            }
        }
        ExpressionKind::ElementSelect { base, index } => {
            f(base);
            f(index);
        }
        ExpressionKind::RangeSelect {
            base, left, right, ..
        } => {
            f(base);
            f(left);
            f(right);
        }
        ExpressionKind::MemberAccess { base, .. } => f(base),
        ExpressionKind::Call(call) => match call {
            CallInfo::User { args, .. } | CallInfo::System { args, .. } => {
                for arg in args {
                    f(arg);
                }
            }
            CallInfo::Method { base, args, .. } => {
                f(base);
                for arg in args {
                    f(arg);
                }
            }
        },
        _ => {}
    }
}

/// Evaluate in required-constant mode, recording diagnostics on the
/// compilation. Returns `Bad` when evaluation fails outright.
pub(crate) fn evaluate_required(comp: &mut Compilation, expr: &Expression) -> ConstantValue {
    evaluate_with_errors(comp, expr).0
}

/// Like [`evaluate_required`], but also reports whether any error was
/// raised along the way (division by zero still produces a value).
pub(crate) fn evaluate_with_errors(
    comp: &mut Compilation,
    expr: &Expression,
) -> (ConstantValue, bool) {
    if expr.is_invalid() {
        return (ConstantValue::Bad, true);
    }
    let precheck = verify_constant(comp, expr);
    if !precheck.is_empty() {
        comp.diags.extend(precheck);
        return (ConstantValue::Bad, true);
    }
    let (value, diags, failed) = {
        let mut ctx = EvalContext::new(comp, EvalMode::Required);
        let value = ctx.eval(expr).unwrap_or(ConstantValue::Bad);
        (value, std::mem::take(&mut ctx.diags), ctx.failed)
    };
    comp.diags.extend(diags);
    (value, failed)
}

/// Speculative fold: no diagnostics, `None` on anything non-constant.
pub(crate) fn try_fold(comp: &Compilation, expr: &Expression) -> Option<ConstantValue> {
    if !verify_constant(comp, expr).is_empty() {
        return None;
    }
    let mut ctx = EvalContext::new(comp, EvalMode::TryFold);
    ctx.eval(expr)
}

#[cfg(test)]
mod tests {
    use vela_source::FileId;

    use super::*;
    use crate::compilation::Options;

    fn literal(comp: &Compilation, value: i64) -> Expression {
        let ty = comp.types.int_type();
        let mut e = Expression::new(
            ExpressionKind::IntegerLiteral(LogicInt::from_i64(32, true, value)),
            ty,
            Span::detached(FileId(0)),
        );
        e.constant = Some(ConstantValue::Integer(LogicInt::from_i64(32, true, value)));
        e
    }

    #[test]
    fn logic_helpers_follow_the_truth_tables() {
        assert_eq!(logic_not(Logic::Zero), Logic::One);
        assert_eq!(logic_not(Logic::Z), Logic::X);
        assert_eq!(logic_and(Logic::Zero, Logic::X), Logic::Zero);
        assert_eq!(logic_and(Logic::One, Logic::X), Logic::X);
        assert_eq!(logic_or(Logic::One, Logic::X), Logic::One);
        assert_eq!(logic_or(Logic::Zero, Logic::X), Logic::X);
    }

    #[test]
    fn binary_fold_over_literals() {
        let comp = Compilation::new(Options::default());
        let ty = comp.types.int_type();
        let lhs = literal(&comp, 6);
        let rhs = literal(&comp, 7);
        let expr = Expression::new(
            ExpressionKind::Binary {
                op: BinaryOp::Multiply,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            Span::detached(FileId(0)),
        );
        let value = try_fold(&comp, &expr).expect("folds");
        assert_eq!(value.integer().and_then(|v| v.to_i64()), Some(42));
    }

    #[test]
    fn step_budget_stops_evaluation() {
        let options = Options {
            max_constexpr_steps: 2,
            ..Options::default()
        };
        let mut comp = Compilation::new(options);
        let ty = comp.types.int_type();
        let lhs = literal(&comp, 1);
        let rhs = literal(&comp, 2);
        let expr = Expression::new(
            ExpressionKind::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            Span::detached(FileId(0)),
        );
        let (value, errored) = evaluate_with_errors(&mut comp, &expr);
        assert!(value.is_bad());
        assert!(errored);
        assert!(
            comp.diags
                .iter()
                .any(|d| d.code == DiagCode::EVAL_STEP_LIMIT)
        );
    }

    #[test]
    fn try_fold_division_by_zero_is_silent_all_x() {
        let comp = Compilation::new(Options::default());
        let ty = comp.types.int_type();
        let lhs = literal(&comp, 1);
        let rhs = literal(&comp, 0);
        let expr = Expression::new(
            ExpressionKind::Binary {
                op: BinaryOp::Divide,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
            Span::detached(FileId(0)),
        );
        // The fold yields the all-X shape without recording anything.
        let value = try_fold(&comp, &expr).expect("still produces a value");
        assert!(value.integer().expect("integer").has_unknown());
        assert!(comp.diags.is_empty());
    }
}
