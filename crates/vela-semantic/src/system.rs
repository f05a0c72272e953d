//! System subroutines and type-family methods.
//!
//! Built-ins register at compilation construction; tools can extend
//! the set through `register_system_subroutine` and
//! `register_system_method`.

use smol_str::SmolStr;
use vela_diag::{DiagCode, Diagnostic};
use vela_source::Span;

use crate::compilation::Compilation;
use crate::eval::EvalContext;
use crate::expr::Expression;
use crate::types::{Type, TypeId};
use crate::value::{ConstantValue, LogicInt};

/// The type family a system method attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodReceiver {
    Enum,
}

/// A `$name` subroutine or built-in method. `check_args` types the
/// call during binding; `eval` interprets it.
pub trait SystemSubroutine: Send + Sync {
    fn name(&self) -> &str;

    /// Validate arguments and produce the call's result type.
    fn check_args(&self, comp: &mut Compilation, args: &[Expression], span: Span) -> TypeId;

    /// Compute the call's value from evaluated arguments. `args` are
    /// the bound argument expressions, `values` their values (`Bad`
    /// for type arguments).
    fn eval(
        &self,
        comp: &Compilation,
        args: &[Expression],
        values: &[ConstantValue],
    ) -> ConstantValue;
}

pub(crate) fn check_system_call(
    comp: &mut Compilation,
    name: &str,
    args: &[Expression],
    span: Span,
) -> TypeId {
    match name {
        "clog2" | "bits" | "size" | "increment" => {
            if args.len() != 1 {
                wrong_args(comp, name, 1, args.len(), span);
                return comp.types.error_type();
            }
            comp.types.int_type()
        }
        "signed" | "unsigned" => {
            if args.len() != 1 {
                wrong_args(comp, name, 1, args.len(), span);
                return comp.types.error_type();
            }
            match comp.types.integral_info(args[0].ty) {
                Some(info) => {
                    comp.types
                        .packed(info.width, name == "signed", info.four_state)
                }
                None => {
                    comp.diags.add(Diagnostic::error(
                        DiagCode::BAD_CONVERSION,
                        span,
                        format!("${name} needs an integral argument"),
                    ));
                    comp.types.error_type()
                }
            }
        }
        _ => comp.types.int_type(),
    }
}

fn wrong_args(comp: &mut Compilation, name: &str, expected: usize, got: usize, span: Span) {
    comp.diags.add(Diagnostic::error(
        DiagCode::WRONG_ARGUMENT_COUNT,
        span,
        format!("${name} expects {expected} argument(s), got {got}"),
    ));
}

/// Evaluate a `$name` call; arguments are evaluated here so that
/// type-form arguments (`$bits(int)`) skip value evaluation.
pub(crate) fn eval_system_call(
    comp: &Compilation,
    ctx: &mut EvalContext<'_>,
    name: &str,
    args: &[Expression],
    expr: &Expression,
) -> Option<ConstantValue> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        if matches!(arg.kind, crate::expr::ExpressionKind::DataType) {
            values.push(ConstantValue::Bad);
        } else {
            values.push(ctx.eval(arg)?);
        }
    }
    let subroutine = comp.system_subroutine(name)?;
    let result = subroutine.eval(comp, args, &values);
    if result.is_bad() {
        ctx.note_system_failure(name, expr.span);
        return None;
    }
    Some(result)
}

pub(crate) fn check_method_call(
    comp: &mut Compilation,
    base: &Expression,
    name: &str,
    args: &[Expression],
    span: Span,
) -> TypeId {
    if let Type::Enum { .. } = comp.types.get(base.ty) {
        if comp.system_method(MethodReceiver::Enum, name).is_some() {
            if !args.is_empty() {
                wrong_args(comp, name, 0, args.len(), span);
            }
            return match name {
                "num" => comp.types.int_type(),
                _ => base.ty,
            };
        }
    }
    comp.diags.add(Diagnostic::error(
        DiagCode::NOT_CALLABLE,
        span,
        format!(
            "no method `{name}` on type {}",
            comp.types.display(base.ty)
        ),
    ));
    comp.types.error_type()
}

pub(crate) fn eval_method_call(
    comp: &Compilation,
    ctx: &mut EvalContext<'_>,
    base: &Expression,
    name: &str,
    _args: &[Expression],
    expr: &Expression,
) -> Option<ConstantValue> {
    let Type::Enum { members, .. } = comp.types.get(base.ty) else {
        return None;
    };
    let result = match name {
        "first" => members.first().map(|(_, v)| ConstantValue::Integer(v.clone())),
        "last" => members.last().map(|(_, v)| ConstantValue::Integer(v.clone())),
        "num" => Some(ConstantValue::Integer(LogicInt::from_i64(
            32,
            true,
            members.len() as i64,
        ))),
        _ => None,
    };
    if result.is_none() {
        ctx.note_system_failure(name, expr.span);
    }
    result
}

/// Install the built-in subroutine and method set.
pub(crate) fn register_builtins(comp: &mut Compilation) {
    comp.register_system_subroutine(Box::new(Clog2));
    comp.register_system_subroutine(Box::new(Bits));
    comp.register_system_subroutine(Box::new(SignCast { signed: true }));
    comp.register_system_subroutine(Box::new(SignCast { signed: false }));
    comp.register_system_subroutine(Box::new(ArrayQuery { increment: false }));
    comp.register_system_subroutine(Box::new(ArrayQuery { increment: true }));
    comp.register_system_method(MethodReceiver::Enum, Box::new(EnumMethod("first")));
    comp.register_system_method(MethodReceiver::Enum, Box::new(EnumMethod("last")));
    comp.register_system_method(MethodReceiver::Enum, Box::new(EnumMethod("num")));
}

struct Clog2;

impl SystemSubroutine for Clog2 {
    fn name(&self) -> &str {
        "clog2"
    }

    fn check_args(&self, comp: &mut Compilation, args: &[Expression], span: Span) -> TypeId {
        check_system_call(comp, "clog2", args, span)
    }

    fn eval(
        &self,
        _comp: &Compilation,
        _args: &[Expression],
        values: &[ConstantValue],
    ) -> ConstantValue {
        let Some(v) = values.first().and_then(|v| v.integer()) else {
            return ConstantValue::Bad;
        };
        let Some(n) = v.to_i64() else {
            return ConstantValue::Integer(LogicInt::all_x(32).as_signed(true));
        };
        if n < 0 {
            return ConstantValue::Bad;
        }
        let result = if n <= 1 {
            0
        } else {
            64 - i64::from(((n - 1) as u64).leading_zeros())
        };
        ConstantValue::Integer(LogicInt::from_i64(32, true, result))
    }
}

struct Bits;

impl SystemSubroutine for Bits {
    fn name(&self) -> &str {
        "bits"
    }

    fn check_args(&self, comp: &mut Compilation, args: &[Expression], span: Span) -> TypeId {
        check_system_call(comp, "bits", args, span)
    }

    fn eval(
        &self,
        comp: &Compilation,
        args: &[Expression],
        _values: &[ConstantValue],
    ) -> ConstantValue {
        // Both the value form and the data-type form report the
        // argument's type width.
        let Some(arg) = args.first() else {
            return ConstantValue::Bad;
        };
        match total_bits(comp, arg.ty) {
            Some(width) => ConstantValue::Integer(LogicInt::from_i64(32, true, width as i64)),
            None => ConstantValue::Bad,
        }
    }
}

/// Bit count of a type, including unpacked array expansion.
fn total_bits(comp: &Compilation, ty: TypeId) -> Option<u64> {
    match comp.types.get(ty) {
        Type::UnpackedArray { elem, dims } => {
            let mut total = total_bits(comp, *elem)?;
            for dim in dims {
                total = total.checked_mul(dim.size())?;
            }
            Some(total)
        }
        _ => comp.types.bit_width(ty).map(u64::from),
    }
}

struct SignCast {
    signed: bool,
}

impl SystemSubroutine for SignCast {
    fn name(&self) -> &str {
        if self.signed { "signed" } else { "unsigned" }
    }

    fn check_args(&self, comp: &mut Compilation, args: &[Expression], span: Span) -> TypeId {
        check_system_call(comp, self.name(), args, span)
    }

    fn eval(
        &self,
        _comp: &Compilation,
        _args: &[Expression],
        values: &[ConstantValue],
    ) -> ConstantValue {
        match values.first().and_then(|v| v.integer()) {
            Some(v) => ConstantValue::Integer(v.as_signed(self.signed)),
            None => ConstantValue::Bad,
        }
    }
}

/// `$size` / `$increment` over fixed-size arrays and packed vectors.
struct ArrayQuery {
    increment: bool,
}

impl SystemSubroutine for ArrayQuery {
    fn name(&self) -> &str {
        if self.increment { "increment" } else { "size" }
    }

    fn check_args(&self, comp: &mut Compilation, args: &[Expression], span: Span) -> TypeId {
        check_system_call(comp, self.name(), args, span)
    }

    fn eval(
        &self,
        comp: &Compilation,
        args: &[Expression],
        _values: &[ConstantValue],
    ) -> ConstantValue {
        let Some(arg) = args.first() else {
            return ConstantValue::Bad;
        };
        let (msb, lsb) = match comp.types.get(arg.ty) {
            Type::UnpackedArray { dims, .. } => match dims.first() {
                Some(dim) => (i64::from(dim.msb), i64::from(dim.lsb)),
                None => return ConstantValue::Bad,
            },
            _ => match comp.types.packed_bounds(arg.ty) {
                Some((msb, lsb)) => (i64::from(msb), i64::from(lsb)),
                None => return ConstantValue::Bad,
            },
        };
        let result = if self.increment {
            if msb >= lsb { 1 } else { -1 }
        } else {
            (msb - lsb).abs() + 1
        };
        ConstantValue::Integer(LogicInt::from_i64(32, true, result))
    }
}

struct EnumMethod(&'static str);

impl SystemSubroutine for EnumMethod {
    fn name(&self) -> &str {
        self.0
    }

    fn check_args(&self, comp: &mut Compilation, _args: &[Expression], _span: Span) -> TypeId {
        comp.types.int_type()
    }

    fn eval(
        &self,
        _comp: &Compilation,
        _args: &[Expression],
        _values: &[ConstantValue],
    ) -> ConstantValue {
        // Enum methods evaluate through `eval_method_call`, which has
        // the receiver type in hand.
        ConstantValue::Bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::Options;

    fn int_value(v: i64) -> ConstantValue {
        ConstantValue::Integer(LogicInt::from_i64(32, true, v))
    }

    #[test]
    fn clog2_values() {
        let comp = Compilation::new(Options::default());
        let cases = [(0, 0), (1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (256, 8)];
        for (input, expected) in cases {
            let result = Clog2.eval(&comp, &[], &[int_value(input)]);
            assert_eq!(
                result.integer().and_then(|v| v.to_i64()),
                Some(expected),
                "$clog2({input})"
            );
        }
    }

    #[test]
    fn clog2_rejects_negative() {
        let comp = Compilation::new(Options::default());
        assert!(Clog2.eval(&comp, &[], &[int_value(-1)]).is_bad());
    }

    #[test]
    fn clog2_of_unknown_is_unknown() {
        let comp = Compilation::new(Options::default());
        let result = Clog2.eval(
            &comp,
            &[],
            &[ConstantValue::Integer(LogicInt::all_x(32))],
        );
        assert!(result.integer().expect("integer").has_unknown());
    }

    #[test]
    fn sign_cast_retags() {
        let comp = Compilation::new(Options::default());
        let v = ConstantValue::Integer(LogicInt::from_i64(8, false, 255));
        let result = SignCast { signed: true }.eval(&comp, &[], &[v]);
        assert_eq!(result.integer().and_then(|v| v.to_i64()), Some(-1));
    }
}
