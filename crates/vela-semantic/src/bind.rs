//! The expression binder: syntax-directed creation of typed
//! expression trees, context-type propagation, implicit conversions,
//! and lvalue analysis.
//!
//! Binding is two-pass in shape: creation computes self-determined
//! types bottom-up, then a context type flows back down. Operators
//! whose result width depends on their operands (arithmetic, bitwise)
//! propagate the merged width to both sides; shifts, logical, and
//! comparison operators keep their operands self-determined.

use smol_str::SmolStr;
use vela_diag::{DiagCode, Diagnostic};
use vela_source::{FileId, Span, TextRange};
use vela_syntax::{
    BinaryOp, Callee, CastTarget, DimensionSyntax, Expr, ExprKind, PatternKey, RangeSelectKind,
    Stmt, StmtKind, TypeSyntax, TypeSyntaxKind, UnaryOp, UnbasedKind,
};

use crate::compilation::{Compilation, MinTypMax, Pending};
use crate::eval;
use crate::expr::{CallInfo, Expression, ExpressionKind};
use crate::lookup::{self, LookupFlags, LookupLocation, Selector};
use crate::scope::ScopeId;
use crate::stmt::{CaseItem, Statement, StatementKind};
use crate::symbols::{SymbolId, SymbolIndex, SymbolKind, VariableInfo};
use crate::types::{ArrayDim, FieldInfo, IntegralInfo, Type, TypeId};
use crate::value::{ConstantValue, Logic, LogicInt};

/// Where and how an expression is being bound.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BindContext {
    pub scope: ScopeId,
    pub location: LookupLocation,
    pub flags: LookupFlags,
    pub file: FileId,
    /// Return type of the enclosing subroutine, for `return` binding.
    pub subroutine_return: Option<TypeId>,
}

impl BindContext {
    pub fn new(scope: ScopeId, location: LookupLocation, flags: LookupFlags, file: FileId) -> Self {
        Self {
            scope,
            location,
            flags,
            file,
            subroutine_return: None,
        }
    }

    #[must_use]
    pub fn with_return(mut self, ty: TypeId) -> Self {
        self.subroutine_return = Some(ty);
        self
    }

    fn span(&self, range: TextRange) -> Span {
        Span::new(self.file, range)
    }
}

// ----------------------------------------------------------------------
// Pass B: binding scope members in declaration order
// ----------------------------------------------------------------------

/// Resolve types and initializers for every member of a scope, in
/// index order. Parameters evaluate on the spot so later members can
/// fold against them.
pub(crate) fn bind_scope_members(comp: &mut Compilation, scope: ScopeId) {
    let members: Vec<SymbolId> = comp.scope(scope).members.clone();
    for member in members {
        if comp.hit_error_limit() {
            return;
        }
        bind_member(comp, scope, member);
    }
}

fn bind_member(comp: &mut Compilation, scope: ScopeId, member: SymbolId) {
    let Some(pending) = comp.pending.remove(&member) else {
        return;
    };
    let span = comp.symbol(member).span;
    let index = comp.symbol(member).index;
    let ctx = BindContext::new(
        scope,
        LookupLocation::new(scope, index.0),
        LookupFlags::NONE,
        span.file,
    );

    match pending {
        Pending::Typedef { ty } => {
            let target = bind_type(comp, &ctx, &ty);
            if let SymbolKind::TypeAlias { target: slot } = &mut comp.symbol_mut(member).kind {
                *slot = target;
            }
        }
        Pending::Param {
            ty,
            init,
            override_value,
        } => {
            bind_parameter(comp, &ctx, member, &ty, init, override_value, span);
        }
        Pending::Var { ty, dims, init } => {
            let base = bind_type(comp, &ctx, &ty);
            let full = bind_unpacked_dims(comp, &ctx, base, &dims);
            let initializer = init.map(|i| {
                Box::new(bind_expression_with_target(comp, &ctx, &i, full))
            });
            if let SymbolKind::Variable(info) = &mut comp.symbol_mut(member).kind {
                info.ty = full;
                info.initializer = initializer;
            }
        }
        Pending::Net { ty, init } => {
            let bound = bind_type(comp, &ctx, &ty);
            if let Some(i) = init {
                bind_expression_with_target(comp, &ctx, &i, bound);
            }
            if let SymbolKind::Net(info) = &mut comp.symbol_mut(member).kind {
                info.ty = bound;
            }
        }
        Pending::Function { decl } => {
            bind_subroutine(comp, &ctx, member, &decl);
        }
    }
}

fn bind_parameter(
    comp: &mut Compilation,
    ctx: &BindContext,
    member: SymbolId,
    ty: &TypeSyntax,
    init: Option<Expr>,
    override_value: Option<ConstantValue>,
    span: Span,
) {
    let implicit = matches!(
        &ty.kind,
        TypeSyntaxKind::Implicit { packed_dims, .. } if packed_dims.is_empty()
    );
    let declared = if implicit {
        None
    } else {
        Some(bind_type(comp, ctx, ty))
    };

    let constant_ctx = BindContext {
        flags: ctx.flags.union(LookupFlags::CONSTANT),
        ..*ctx
    };

    let (ty, value, errored, initializer) = if let Some(override_value) = override_value {
        // Overridden: the default initializer is not even bound.
        let ty = declared.unwrap_or_else(|| type_of_value(comp, &override_value));
        let value = convert_value(comp, override_value, ty);
        set_overridden(comp, member);
        (ty, Some(value), false, None)
    } else if let Some(init) = init {
        let bound = match declared {
            Some(target) => bind_expression_with_target(comp, &constant_ctx, &init, target),
            None => bind_expression(comp, &constant_ctx, &init),
        };
        let ty = declared.unwrap_or(bound.ty);
        let (value, errored) = eval::evaluate_with_errors(comp, &bound);
        let value = if value.is_bad() {
            // Keep the error shape: all-X at the parameter's width.
            comp.types.default_error_value(ty)
        } else {
            convert_value(comp, value, ty)
        };
        (ty, Some(value), errored, Some(Box::new(bound)))
    } else {
        comp.diags.add(Diagnostic::error(
            DiagCode::PARAMETER_WITHOUT_VALUE,
            span,
            format!(
                "parameter `{}` has no default and no override value",
                comp.symbol(member).name
            ),
        ));
        let ty = declared.unwrap_or_else(|| comp.types.int_type());
        (ty, None, true, None)
    };

    if let SymbolKind::Parameter(info) = &mut comp.symbol_mut(member).kind {
        info.ty = ty;
        info.value = value;
        info.errored = errored;
        info.initializer = initializer;
    }
}

fn set_overridden(comp: &mut Compilation, member: SymbolId) {
    if let SymbolKind::Parameter(info) = &mut comp.symbol_mut(member).kind {
        info.overridden = true;
    }
}

fn bind_subroutine(
    comp: &mut Compilation,
    ctx: &BindContext,
    member: SymbolId,
    decl: &vela_syntax::FunctionDecl,
) {
    let fn_scope = match &comp.symbol(member).kind {
        SymbolKind::Subroutine(info) => info.scope,
        _ => return,
    };
    let return_ty = match &decl.return_ty {
        Some(ty) => bind_type(comp, ctx, ty),
        None => comp.types.void_type(),
    };

    let body_ctx = BindContext::new(
        fn_scope,
        LookupLocation::MAX,
        LookupFlags::NONE,
        ctx.file,
    )
    .with_return(return_ty);

    let mut args = Vec::new();
    for arg in &decl.args {
        let arg_ty = bind_type(comp, &body_ctx, &arg.ty);
        let default = arg
            .default
            .as_ref()
            .map(|d| Box::new(bind_expression_with_target(comp, ctx, d, arg_ty)));
        let sym = comp.add_symbol(
            fn_scope,
            SymbolKind::Variable(VariableInfo {
                ty: arg_ty,
                initializer: default,
            }),
            arg.name.clone(),
            Span::new(ctx.file, arg.name_range),
        );
        args.push(sym);
    }

    // Publish the signature before binding the body so recursive
    // calls see the finished argument list and return type.
    if let SymbolKind::Subroutine(info) = &mut comp.symbol_mut(member).kind {
        info.args = args;
        info.return_ty = return_ty;
    }

    let body = if decl.dpi_import.is_some() {
        None
    } else {
        let stmts: Vec<Statement> = decl
            .body
            .iter()
            .map(|s| bind_statement(comp, &body_ctx, s))
            .collect();
        Some(Statement::new(
            StatementKind::Block(stmts),
            Span::new(ctx.file, decl.name_range),
        ))
    };

    if let SymbolKind::Subroutine(info) = &mut comp.symbol_mut(member).kind {
        info.body = body;
    }
}

// ----------------------------------------------------------------------
// Types
// ----------------------------------------------------------------------

/// Resolve a type as written to its canonical interned id.
pub(crate) fn bind_type(comp: &mut Compilation, ctx: &BindContext, ty: &TypeSyntax) -> TypeId {
    let span = ctx.span(ty.range);
    match &ty.kind {
        TypeSyntaxKind::Scalar {
            kind,
            signed,
            packed_dims,
        } => {
            let four_state = match kind {
                vela_syntax::ScalarKind::Bit => false,
                vela_syntax::ScalarKind::Logic | vela_syntax::ScalarKind::Reg => true,
            };
            let signed = signed.unwrap_or(false);
            if packed_dims.is_empty() {
                let kind = match kind {
                    vela_syntax::ScalarKind::Bit => crate::types::ScalarKind::Bit,
                    vela_syntax::ScalarKind::Logic => crate::types::ScalarKind::Logic,
                    vela_syntax::ScalarKind::Reg => crate::types::ScalarKind::Reg,
                };
                return comp.types.intern(Type::Scalar { kind, signed });
            }
            bind_packed_dims(comp, ctx, packed_dims, signed, four_state)
        }
        TypeSyntaxKind::Implicit { signed, packed_dims } => {
            let signed = signed.unwrap_or(false);
            if packed_dims.is_empty() {
                return comp.types.logic_type();
            }
            bind_packed_dims(comp, ctx, packed_dims, signed, true)
        }
        TypeSyntaxKind::Predefined { kind, signed } => {
            let base = match kind {
                vela_syntax::PredefinedKind::Byte => comp.types.byte_type(),
                vela_syntax::PredefinedKind::ShortInt => comp.types.shortint_type(),
                vela_syntax::PredefinedKind::Int => comp.types.int_type(),
                vela_syntax::PredefinedKind::LongInt => comp.types.longint_type(),
                vela_syntax::PredefinedKind::Integer => comp.types.integer_type(),
                vela_syntax::PredefinedKind::Time => comp.types.time_type(),
            };
            match signed {
                None => base,
                Some(signed) => {
                    let info = comp
                        .types
                        .integral_info(base)
                        .unwrap_or(IntegralInfo {
                            width: 32,
                            signed: true,
                            four_state: false,
                        });
                    if info.signed == *signed {
                        base
                    } else {
                        comp.types.packed(info.width, *signed, info.four_state)
                    }
                }
            }
        }
        TypeSyntaxKind::Floating(kind) => match kind {
            vela_syntax::FloatKind::Real => comp.types.real_type(),
            vela_syntax::FloatKind::ShortReal => comp.types.shortreal_type(),
            vela_syntax::FloatKind::RealTime => comp.types.realtime_type(),
        },
        TypeSyntaxKind::Str => comp.types.string_type(),
        TypeSyntaxKind::CHandle => comp.types.chandle_type(),
        TypeSyntaxKind::Event => comp.types.event_type(),
        TypeSyntaxKind::Void => comp.types.void_type(),
        TypeSyntaxKind::Named { path } => bind_named_type(comp, ctx, path, span),
        TypeSyntaxKind::Enum { base, members } => bind_enum_type(comp, ctx, base, members, span),
        TypeSyntaxKind::Struct {
            packed,
            is_union,
            fields,
            ..
        } => bind_struct_type(comp, ctx, *packed, *is_union, fields, span),
    }
}

fn bind_packed_dims(
    comp: &mut Compilation,
    ctx: &BindContext,
    dims: &[vela_syntax::RangeSyntax],
    signed: bool,
    four_state: bool,
) -> TypeId {
    let mut width = 1u32;
    let mut bounds = None;
    for (i, dim) in dims.iter().enumerate() {
        let msb = require_constant_i64(comp, ctx, &dim.msb);
        let lsb = require_constant_i64(comp, ctx, &dim.lsb);
        let (Some(msb), Some(lsb)) = (msb, lsb) else {
            return comp.types.error_type();
        };
        let dim_width = (msb - lsb).unsigned_abs() + 1;
        let Some(w) = u32::try_from(dim_width)
            .ok()
            .and_then(|w| width.checked_mul(w))
        else {
            comp.diags.add(Diagnostic::error(
                DiagCode::BAD_SELECT_BOUNDS,
                ctx.span(dim.range),
                "packed dimension is too large",
            ));
            return comp.types.error_type();
        };
        width = w;
        if i == 0 && dims.len() == 1 {
            let canonical = lsb == 0 && msb >= 0;
            if !canonical {
                bounds = Some((msb as i32, lsb as i32));
            }
        }
    }
    comp.types.intern(Type::PackedInteger {
        width,
        signed,
        four_state,
        bounds,
    })
}

pub(crate) fn bind_unpacked_dims(
    comp: &mut Compilation,
    ctx: &BindContext,
    elem: TypeId,
    dims: &[DimensionSyntax],
) -> TypeId {
    if dims.is_empty() {
        return elem;
    }
    let mut bound = Vec::new();
    for dim in dims {
        match dim {
            DimensionSyntax::Range(r) => {
                let msb = require_constant_i64(comp, ctx, &r.msb);
                let lsb = require_constant_i64(comp, ctx, &r.lsb);
                let (Some(msb), Some(lsb)) = (msb, lsb) else {
                    return comp.types.error_type();
                };
                bound.push(ArrayDim {
                    msb: msb as i32,
                    lsb: lsb as i32,
                });
            }
            DimensionSyntax::Size(size) => {
                let Some(n) = require_constant_i64(comp, ctx, size) else {
                    return comp.types.error_type();
                };
                if n <= 0 {
                    comp.diags.add(Diagnostic::error(
                        DiagCode::BAD_SELECT_BOUNDS,
                        ctx.span(size.range),
                        "array size must be positive",
                    ));
                    return comp.types.error_type();
                }
                bound.push(ArrayDim {
                    msb: 0,
                    lsb: (n - 1) as i32,
                });
            }
        }
    }
    comp.types.intern(Type::UnpackedArray {
        elem,
        dims: bound,
    })
}

fn bind_named_type(
    comp: &mut Compilation,
    ctx: &BindContext,
    path: &[SmolStr],
    span: Span,
) -> TypeId {
    let result = match path {
        [name] => lookup::lookup_name(
            comp,
            ctx.scope,
            ctx.location,
            name,
            ctx.flags.union(LookupFlags::TYPE),
            span,
        ),
        [package, name] => {
            let Some(pkg_scope) = comp.package_scope(package) else {
                comp.diags.add(Diagnostic::error(
                    DiagCode::UNKNOWN_PACKAGE,
                    span,
                    format!("unknown package `{package}`"),
                ));
                return comp.types.error_type();
            };
            let mut result = lookup::LookupResult::default();
            result.found = comp.find_member(pkg_scope, name);
            if result.found.is_none() {
                result.diagnostics.push(Diagnostic::error(
                    DiagCode::UNKNOWN_MEMBER,
                    span,
                    format!("package `{package}` has no member `{name}`"),
                ));
            }
            result
        }
        _ => {
            comp.diags.add(Diagnostic::error(
                DiagCode::NOT_A_TYPE,
                span,
                "unsupported type path",
            ));
            return comp.types.error_type();
        }
    };

    let diags: Vec<Diagnostic> = result.diagnostics.clone();
    comp.diags.extend(diags);
    let Some(found) = result.found else {
        return comp.types.error_type();
    };
    if let SymbolKind::TypeAlias { target } = comp.symbol(found).kind {
        return target;
    }
    let name = comp.symbol(found).name.clone();
    comp.diags.add(Diagnostic::error(
        DiagCode::NOT_A_TYPE,
        span,
        format!("`{name}` is not a type"),
    ));
    comp.types.error_type()
}

fn bind_enum_type(
    comp: &mut Compilation,
    ctx: &BindContext,
    base: &Option<Box<TypeSyntax>>,
    members: &[vela_syntax::EnumMemberSyntax],
    span: Span,
) -> TypeId {
    let base_ty = match base {
        Some(b) => bind_type(comp, ctx, b.as_ref()),
        None => comp.types.int_type(),
    };
    let Some(info) = comp.types.integral_info(base_ty) else {
        comp.diags.add(Diagnostic::error(
            DiagCode::NOT_A_TYPE,
            span,
            "enum base type must be integral",
        ));
        return comp.types.error_type();
    };

    let constant_ctx = BindContext {
        flags: ctx.flags.union(LookupFlags::CONSTANT),
        ..*ctx
    };
    let mut values: Vec<(SmolStr, LogicInt)> = Vec::new();
    let mut next = LogicInt::from_i64(info.width, info.signed, 0);
    for member in members {
        let value = match &member.init {
            Some(init) => {
                let bound = bind_expression_with_target(comp, &constant_ctx, init, base_ty);
                match eval::evaluate_required(comp, &bound).into_integer() {
                    Some(v) => v.convert(info.width, info.signed),
                    None => next.clone(),
                }
            }
            None => next.clone(),
        };
        next = value.add(&LogicInt::from_i64(info.width, info.signed, 1));
        values.push((member.name.clone(), value));
    }

    let unique_id = comp.types.next_enum_id();
    let enum_ty = comp.types.intern(Type::Enum {
        base: base_ty,
        members: values.clone(),
        unique_id,
    });

    // Enum members become value symbols of the enclosing scope, at
    // the declaring item's slot.
    let slot = SymbolIndex(ctx.location.index);
    for (name, value) in values {
        comp.add_symbol_at(
            ctx.scope,
            SymbolKind::EnumValue {
                ty: enum_ty,
                value,
            },
            name,
            span,
            slot,
        );
    }
    enum_ty
}

fn bind_struct_type(
    comp: &mut Compilation,
    ctx: &BindContext,
    packed: bool,
    is_union: bool,
    fields: &[vela_syntax::StructFieldSyntax],
    span: Span,
) -> TypeId {
    if !packed {
        comp.diags.add(Diagnostic::error(
            DiagCode::NOT_A_TYPE,
            span,
            "only packed structs and unions are supported",
        ));
        return comp.types.error_type();
    }
    let mut infos = Vec::new();
    for field in fields {
        let ty = bind_type(comp, ctx, &field.ty);
        if comp.types.integral_info(ty).is_none() && !comp.types.is_error(ty) {
            comp.diags.add(Diagnostic::error(
                DiagCode::NOT_A_TYPE,
                Span::new(ctx.file, field.name_range),
                format!("packed field `{}` must have an integral type", field.name),
            ));
            return comp.types.error_type();
        }
        infos.push(FieldInfo {
            name: field.name.clone(),
            ty,
        });
    }
    if is_union {
        comp.types.intern(Type::PackedUnion { fields: infos })
    } else {
        comp.types.intern(Type::PackedStruct { fields: infos })
    }
}

// ----------------------------------------------------------------------
// Expressions
// ----------------------------------------------------------------------

/// Bind an expression with self-determined typing.
pub(crate) fn bind_expression(comp: &mut Compilation, ctx: &BindContext, expr: &Expr) -> Expression {
    create(comp, ctx, expr)
}

/// Bind an expression in a position of the given type; the target
/// drives pattern binding, literal sizing, and implicit conversion.
pub(crate) fn bind_expression_with_target(
    comp: &mut Compilation,
    ctx: &BindContext,
    expr: &Expr,
    target: TypeId,
) -> Expression {
    let span = ctx.span(expr.range);
    match &expr.kind {
        ExprKind::SimplePattern(elements) => {
            bind_pattern(comp, ctx, PatternShape::Simple(elements), target, span)
        }
        ExprKind::StructuredPattern(entries) => {
            bind_pattern(comp, ctx, PatternShape::Structured(entries), target, span)
        }
        ExprKind::ReplicatedPattern { count, operands } => {
            bind_pattern(comp, ctx, PatternShape::Replicated(count, operands), target, span)
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            let cond = create(comp, ctx, cond);
            let then_expr = bind_expression_with_target(comp, ctx, then_expr, target);
            let else_expr = bind_expression_with_target(comp, ctx, else_expr, target);
            Expression::new(
                ExpressionKind::Conditional {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                target,
                span,
            )
        }
        _ => {
            let bound = create(comp, ctx, expr);
            convert_assignment(comp, bound, target, span)
        }
    }
}

fn invalid(comp: &Compilation, span: Span, inner: Option<Expression>) -> Expression {
    Expression::invalid(comp.types.error_type(), span, inner)
}

/// Create a node, then fold it speculatively: transient evaluation
/// results stick to the node, failed attempts are simply discarded.
fn create(comp: &mut Compilation, ctx: &BindContext, expr: &Expr) -> Expression {
    let mut bound = create_inner(comp, ctx, expr);
    if bound.constant.is_none()
        && matches!(
            bound.kind,
            ExpressionKind::Unary { .. }
                | ExpressionKind::Binary { .. }
                | ExpressionKind::Conditional { .. }
                | ExpressionKind::Conversion { .. }
                | ExpressionKind::Concat { .. }
        )
    {
        bound.constant = eval::try_fold(comp, &bound);
    }
    bound
}

fn create_inner(comp: &mut Compilation, ctx: &BindContext, expr: &Expr) -> Expression {
    let span = ctx.span(expr.range);
    match &expr.kind {
        ExprKind::IntLiteral(lit) => {
            match LogicInt::parse_literal(lit.width, lit.signed, lit.base, &lit.digits) {
                Some(value) => {
                    let ty = comp.types.packed(
                        value.width(),
                        value.is_signed(),
                        value.has_unknown(),
                    );
                    let mut e =
                        Expression::new(ExpressionKind::IntegerLiteral(value.clone()), ty, span);
                    e.constant = Some(ConstantValue::Integer(value));
                    e
                }
                None => {
                    comp.diags.add(Diagnostic::error(
                        DiagCode::UNKNOWN_SYNTAX,
                        span,
                        "malformed integer literal",
                    ));
                    invalid(comp, span, None)
                }
            }
        }
        ExprKind::UnbasedUnsized(kind) => {
            let bit = match kind {
                UnbasedKind::Zero => Logic::Zero,
                UnbasedKind::One => Logic::One,
                UnbasedKind::X => Logic::X,
                UnbasedKind::Z => Logic::Z,
            };
            let ty = comp.types.packed(1, false, bit.is_unknown());
            let mut e = Expression::new(ExpressionKind::UnbasedUnsizedLiteral(bit), ty, span);
            e.constant = Some(ConstantValue::Integer(LogicInt::filled(1, bit)));
            e
        }
        ExprKind::RealLiteral(v) => {
            let mut e = Expression::new(
                ExpressionKind::RealLiteral(*v),
                comp.types.real_type(),
                span,
            );
            e.constant = Some(ConstantValue::Real(*v));
            e
        }
        ExprKind::StringLiteral(s) => {
            let mut e = Expression::new(
                ExpressionKind::StringLiteral(s.clone()),
                comp.types.string_type(),
                span,
            );
            e.constant = Some(ConstantValue::Str(s.clone()));
            e
        }
        ExprKind::Null => {
            let mut e =
                Expression::new(ExpressionKind::NullLiteral, comp.types.null_type(), span);
            e.constant = Some(ConstantValue::NullHandle);
            e
        }
        ExprKind::Unbounded => {
            let mut e = Expression::new(
                ExpressionKind::UnboundedLiteral,
                comp.types.unbounded_type(),
                span,
            );
            e.constant = Some(ConstantValue::Unbounded);
            e
        }
        ExprKind::Name(name) => {
            let result =
                lookup::lookup_name(comp, ctx.scope, ctx.location, name, ctx.flags, span);
            finish_name(comp, ctx, result, span)
        }
        ExprKind::Scoped { package, name } => {
            let mut result = lookup::LookupResult::default();
            match comp.package_scope(package) {
                Some(pkg_scope) => {
                    result.found = comp.find_member(pkg_scope, name);
                    result.was_imported = true;
                    if result.found.is_none() {
                        result.diagnostics.push(Diagnostic::error(
                            DiagCode::UNKNOWN_MEMBER,
                            span,
                            format!("package `{package}` has no member `{name}`"),
                        ));
                    }
                }
                None => {
                    result.diagnostics.push(Diagnostic::error(
                        DiagCode::UNKNOWN_PACKAGE,
                        span,
                        format!("unknown package `{package}`"),
                    ));
                }
            }
            finish_name(comp, ctx, result, span)
        }
        ExprKind::HierName(parts) => {
            let result = lookup::lookup_hierarchical(
                comp,
                ctx.scope,
                ctx.location,
                parts,
                ctx.flags,
                span,
            );
            finish_name(comp, ctx, result, span)
        }
        ExprKind::Unary { op, operand } => bind_unary(comp, ctx, *op, operand, span),
        ExprKind::Binary { op, lhs, rhs } => bind_binary(comp, ctx, *op, lhs, rhs, span),
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => bind_conditional(comp, ctx, cond, then_expr, else_expr, span),
        ExprKind::Assignment { op, lhs, rhs } => {
            bind_assignment(comp, ctx, *op, lhs, rhs, span)
        }
        ExprKind::Concat(operands) => bind_concat(comp, ctx, operands, span),
        ExprKind::Replication { count, operands } => {
            bind_replication(comp, ctx, count, operands, span)
        }
        ExprKind::ElementSelect { base, index } => {
            let base = create(comp, ctx, base);
            bind_element_select(comp, ctx, base, index, span)
        }
        ExprKind::RangeSelect {
            base,
            kind,
            left,
            right,
        } => {
            let base = create(comp, ctx, base);
            bind_range_select(comp, ctx, base, *kind, left, right, span)
        }
        ExprKind::Member { base, name } => {
            let base = create(comp, ctx, base);
            bind_member_access(comp, base, name, span)
        }
        ExprKind::Call { callee, args } => bind_call(comp, ctx, callee, args, span),
        ExprKind::Cast { target, operand } => bind_cast(comp, ctx, target, operand, span),
        ExprKind::MinTypMax { min, typ, max } => {
            let chosen = match comp.options().min_typ_max {
                MinTypMax::Min => min,
                MinTypMax::Typ => typ,
                MinTypMax::Max => max,
            };
            create(comp, ctx, chosen)
        }
        ExprKind::DataType(ty) => {
            let bound = bind_type(comp, ctx, ty.as_ref());
            Expression::new(ExpressionKind::DataType, bound, span)
        }
        ExprKind::SimplePattern(_)
        | ExprKind::StructuredPattern(_)
        | ExprKind::ReplicatedPattern { .. } => {
            comp.diags.add(Diagnostic::error(
                DiagCode::BAD_CONVERSION,
                span,
                "assignment pattern requires a target type",
            ));
            invalid(comp, span, None)
        }
    }
}

/// Turn a lookup result into a named-value expression, re-applying
/// any selectors the hierarchical walk handed back.
fn finish_name(
    comp: &mut Compilation,
    ctx: &BindContext,
    result: lookup::LookupResult,
    span: Span,
) -> Expression {
    let diags: Vec<Diagnostic> = result.diagnostics.clone();
    comp.diags.extend(diags);
    let Some(found) = result.found else {
        return invalid(comp, span, None);
    };

    let value_info = match &comp.symbol(found).kind {
        SymbolKind::Parameter(info) => Some((info.ty, info.value.clone())),
        SymbolKind::EnumValue { ty, value } => {
            Some((*ty, Some(ConstantValue::Integer(value.clone()))))
        }
        SymbolKind::Variable(info) => Some((info.ty, None)),
        SymbolKind::Net(info) => Some((info.ty, None)),
        _ => None,
    };
    let Some((ty, constant)) = value_info else {
        let name = comp.symbol(found).name.clone();
        comp.diags.add(Diagnostic::error(
            DiagCode::NOT_A_VALUE,
            span,
            format!("`{name}` does not name a value"),
        ));
        return invalid(comp, span, None);
    };

    let mut bound = Expression::new(
        ExpressionKind::NamedValue {
            symbol: found,
            hierarchical: result.is_hierarchical,
        },
        ty,
        span,
    );
    bound.constant = constant;

    // Selectors left over from hierarchical resolution re-apply as
    // member accesses / element selects on the value.
    for selector in result.selectors {
        bound = match selector {
            Selector::Member { name, span } => bind_member_access(comp, bound, &name, span),
            Selector::Element(index) => bind_element_select(comp, ctx, bound, &index, span),
        };
    }
    bound
}

fn bind_unary(
    comp: &mut Compilation,
    ctx: &BindContext,
    op: UnaryOp,
    operand_syntax: &Expr,
    span: Span,
) -> Expression {
    let operand = create(comp, ctx, operand_syntax);
    if operand.is_invalid() {
        return invalid(comp, span, Some(operand));
    }

    match op {
        UnaryOp::Plus | UnaryOp::Minus | UnaryOp::BitwiseNot => {
            if comp.types.is_floating(operand.ty) {
                if op == UnaryOp::BitwiseNot {
                    return bad_unary(comp, operand, span);
                }
                let ty = operand.ty;
                return unary_expr(op, operand, ty, span);
            }
            let Some(info) = comp.types.integral_info(operand.ty) else {
                return bad_unary(comp, operand, span);
            };
            let ty = comp.types.packed(info.width, info.signed, info.four_state);
            unary_expr(op, operand, ty, span)
        }
        UnaryOp::BitwiseAnd
        | UnaryOp::BitwiseOr
        | UnaryOp::BitwiseXor
        | UnaryOp::BitwiseNand
        | UnaryOp::BitwiseNor
        | UnaryOp::BitwiseXnor => {
            let Some(info) = comp.types.integral_info(operand.ty) else {
                return bad_unary(comp, operand, span);
            };
            let ty = comp.types.packed(1, false, info.four_state);
            unary_expr(op, operand, ty, span)
        }
        UnaryOp::LogicalNot => {
            if !comp.types.is_numeric(operand.ty) {
                return bad_unary(comp, operand, span);
            }
            let ty = comp.types.logic_type();
            unary_expr(op, operand, ty, span)
        }
        UnaryOp::Preincrement
        | UnaryOp::Predecrement
        | UnaryOp::Postincrement
        | UnaryOp::Postdecrement => {
            if !is_lvalue(comp, &operand) {
                comp.diags.add(Diagnostic::error(
                    DiagCode::NOT_AN_LVALUE,
                    span,
                    "increment/decrement target is not assignable",
                ));
                return invalid(comp, span, Some(operand));
            }
            let ty = operand.ty;
            unary_expr(op, operand, ty, span)
        }
    }
}

fn unary_expr(op: UnaryOp, operand: Expression, ty: TypeId, span: Span) -> Expression {
    Expression::new(
        ExpressionKind::Unary {
            op,
            operand: Box::new(operand),
        },
        ty,
        span,
    )
}

fn bad_unary(comp: &mut Compilation, operand: Expression, span: Span) -> Expression {
    comp.diags.add(Diagnostic::error(
        DiagCode::BAD_UNARY_OPERAND,
        span,
        format!(
            "invalid operand type {} for unary operator",
            comp.types.display(operand.ty)
        ),
    ));
    invalid(comp, span, Some(operand))
}

/// Operator categories per the propagation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpCategory {
    /// Operands and result size to the merged width: arithmetic and
    /// bitwise binary operators.
    ContextBoth,
    /// Result takes the left operand's width; the right side is
    /// self-determined: shifts and power.
    ShiftLike,
    /// Operands size to each other, result is one bit.
    Comparison,
    /// Exact comparison; result is one two-state bit.
    CaseComparison,
    /// Operands self-determined, result is one bit.
    Logical,
}

fn op_category(op: BinaryOp) -> OpCategory {
    use BinaryOp::*;
    match op {
        Add | Subtract | Multiply | Divide | Mod | BinaryAnd | BinaryOr | BinaryXor
        | BinaryXnor => OpCategory::ContextBoth,
        Power | LogicalShiftLeft | LogicalShiftRight | ArithmeticShiftLeft
        | ArithmeticShiftRight => OpCategory::ShiftLike,
        Equality | Inequality | WildcardEquality | WildcardInequality | LessThan
        | LessThanEqual | GreaterThan | GreaterThanEqual => OpCategory::Comparison,
        CaseEquality | CaseInequality => OpCategory::CaseComparison,
        LogicalAnd | LogicalOr | LogicalImplication | LogicalEquivalence => OpCategory::Logical,
    }
}

fn bind_binary(
    comp: &mut Compilation,
    ctx: &BindContext,
    op: BinaryOp,
    lhs_syntax: &Expr,
    rhs_syntax: &Expr,
    span: Span,
) -> Expression {
    let lhs = create(comp, ctx, lhs_syntax);
    let rhs = create(comp, ctx, rhs_syntax);
    if lhs.is_invalid() || rhs.is_invalid() {
        return invalid(comp, span, None);
    }

    let lhs_real = comp.types.is_floating(lhs.ty);
    let rhs_real = comp.types.is_floating(rhs.ty);
    let category = op_category(op);

    // Real operands: arithmetic and comparisons work on reals; the
    // bit-level operators do not.
    if lhs_real || rhs_real {
        let allowed = matches!(
            op,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Power
                | BinaryOp::Equality
                | BinaryOp::Inequality
                | BinaryOp::LessThan
                | BinaryOp::LessThanEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanEqual
                | BinaryOp::LogicalAnd
                | BinaryOp::LogicalOr
        );
        if !allowed || !comp.types.is_numeric(lhs.ty) || !comp.types.is_numeric(rhs.ty) {
            return bad_binary(comp, lhs, rhs, span);
        }
        let real = comp.types.real_type();
        let lhs = convert_assignment(comp, lhs, real, span);
        let rhs = convert_assignment(comp, rhs, real, span);
        let result = if matches!(category, OpCategory::Comparison | OpCategory::Logical) {
            comp.types.bit_type()
        } else {
            real
        };
        return binary_expr(op, lhs, rhs, result, span);
    }

    // String comparisons.
    if lhs.ty == comp.types.string_type() && rhs.ty == comp.types.string_type() {
        if matches!(category, OpCategory::Comparison | OpCategory::CaseComparison) {
            let result = comp.types.bit_type();
            return binary_expr(op, lhs, rhs, result, span);
        }
        return bad_binary(comp, lhs, rhs, span);
    }

    let (Some(li), Some(ri)) = (
        comp.types.integral_info(lhs.ty),
        comp.types.integral_info(rhs.ty),
    ) else {
        return bad_binary(comp, lhs, rhs, span);
    };

    match category {
        OpCategory::ContextBoth => {
            let width = li.width.max(ri.width);
            let signed = li.signed && ri.signed;
            let four_state = li.four_state || ri.four_state;
            let common = comp.types.packed(width, signed, four_state);
            let lhs = coerce_integral(comp, lhs, width, signed, span);
            let rhs = coerce_integral(comp, rhs, width, signed, span);
            binary_expr(op, lhs, rhs, common, span)
        }
        OpCategory::ShiftLike => {
            let four_state = li.four_state || ri.four_state;
            let result = comp.types.packed(li.width, li.signed, four_state);
            binary_expr(op, lhs, rhs, result, span)
        }
        OpCategory::Comparison => {
            let width = li.width.max(ri.width);
            let signed = li.signed && ri.signed;
            let lhs = coerce_integral(comp, lhs, width, signed, span);
            let rhs = coerce_integral(comp, rhs, width, signed, span);
            let result = comp.types.logic_type();
            binary_expr(op, lhs, rhs, result, span)
        }
        OpCategory::CaseComparison => {
            let width = li.width.max(ri.width);
            let signed = li.signed && ri.signed;
            let lhs = coerce_integral(comp, lhs, width, signed, span);
            let rhs = coerce_integral(comp, rhs, width, signed, span);
            let result = comp.types.bit_type();
            binary_expr(op, lhs, rhs, result, span)
        }
        OpCategory::Logical => {
            if !comp.types.is_numeric(lhs.ty) || !comp.types.is_numeric(rhs.ty) {
                return bad_binary(comp, lhs, rhs, span);
            }
            let result = comp.types.logic_type();
            binary_expr(op, lhs, rhs, result, span)
        }
    }
}

fn binary_expr(
    op: BinaryOp,
    lhs: Expression,
    rhs: Expression,
    ty: TypeId,
    span: Span,
) -> Expression {
    Expression::new(
        ExpressionKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
        span,
    )
}

fn bad_binary(
    comp: &mut Compilation,
    lhs: Expression,
    rhs: Expression,
    span: Span,
) -> Expression {
    comp.diags.add(Diagnostic::error(
        DiagCode::BAD_BINARY_OPERANDS,
        span,
        format!(
            "invalid operand types {} and {} for binary operator",
            comp.types.display(lhs.ty),
            comp.types.display(rhs.ty)
        ),
    ));
    invalid(comp, span, None)
}

fn bind_conditional(
    comp: &mut Compilation,
    ctx: &BindContext,
    cond: &Expr,
    then_expr: &Expr,
    else_expr: &Expr,
    span: Span,
) -> Expression {
    let cond = create(comp, ctx, cond);
    let then_expr = create(comp, ctx, then_expr);
    let else_expr = create(comp, ctx, else_expr);
    if then_expr.is_invalid() || else_expr.is_invalid() {
        return invalid(comp, span, None);
    }

    let ty = if then_expr.ty == else_expr.ty {
        then_expr.ty
    } else if let (Some(a), Some(b)) = (
        comp.types.integral_info(then_expr.ty),
        comp.types.integral_info(else_expr.ty),
    ) {
        comp.types.packed(
            a.width.max(b.width),
            a.signed && b.signed,
            a.four_state || b.four_state,
        )
    } else if comp.types.is_numeric(then_expr.ty) && comp.types.is_numeric(else_expr.ty) {
        comp.types.real_type()
    } else {
        comp.diags.add(Diagnostic::error(
            DiagCode::BAD_CONVERSION,
            span,
            format!(
                "conditional arms have incompatible types {} and {}",
                comp.types.display(then_expr.ty),
                comp.types.display(else_expr.ty)
            ),
        ));
        return invalid(comp, span, None);
    };

    let then_expr = convert_assignment(comp, then_expr, ty, span);
    let else_expr = convert_assignment(comp, else_expr, ty, span);
    Expression::new(
        ExpressionKind::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        },
        ty,
        span,
    )
}

fn bind_assignment(
    comp: &mut Compilation,
    ctx: &BindContext,
    op: Option<BinaryOp>,
    lhs_syntax: &Expr,
    rhs_syntax: &Expr,
    span: Span,
) -> Expression {
    let lhs = create(comp, ctx, lhs_syntax);
    if lhs.is_invalid() {
        return invalid(comp, span, Some(lhs));
    }
    if !is_lvalue(comp, &lhs) {
        comp.diags.add(Diagnostic::error(
            DiagCode::NOT_AN_LVALUE,
            span,
            "left side of assignment is not assignable",
        ));
        return invalid(comp, span, Some(lhs));
    }

    // Compound assignments keep a self-determined right side; simple
    // assignments convert to the target type.
    let rhs = match op {
        Some(_) => create(comp, ctx, rhs_syntax),
        None => bind_expression_with_target(comp, ctx, rhs_syntax, lhs.ty),
    };
    let ty = lhs.ty;
    Expression::new(
        ExpressionKind::Assignment {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
        span,
    )
}

fn bind_concat(
    comp: &mut Compilation,
    ctx: &BindContext,
    operands: &[Expr],
    span: Span,
) -> Expression {
    let mut bound = Vec::new();
    let mut width = 0u32;
    let mut four_state = false;
    let mut all_strings = true;
    for operand in operands {
        let e = create(comp, ctx, operand);
        if e.is_invalid() {
            return invalid(comp, span, Some(e));
        }
        if e.ty != comp.types.string_type() {
            all_strings = false;
        }
        bound.push(e);
    }

    if all_strings && !bound.is_empty() {
        let ty = comp.types.string_type();
        return Expression::new(ExpressionKind::Concat { operands: bound }, ty, span);
    }

    for e in &bound {
        let Some(info) = comp.types.integral_info(e.ty) else {
            comp.diags.add(Diagnostic::error(
                DiagCode::BAD_BINARY_OPERANDS,
                e.span,
                format!(
                    "concatenation operand must be integral, not {}",
                    comp.types.display(e.ty)
                ),
            ));
            return invalid(comp, span, None);
        };
        width = width.saturating_add(info.width);
        four_state |= info.four_state;
    }
    let ty = comp.types.packed(width.max(1), false, four_state);
    Expression::new(ExpressionKind::Concat { operands: bound }, ty, span)
}

fn bind_replication(
    comp: &mut Compilation,
    ctx: &BindContext,
    count_syntax: &Expr,
    operands: &[Expr],
    span: Span,
) -> Expression {
    let Some(count) = require_constant_i64(comp, ctx, count_syntax) else {
        return invalid(comp, span, None);
    };
    if count < 0 {
        comp.diags.add(Diagnostic::error(
            DiagCode::BAD_SELECT_BOUNDS,
            ctx.span(count_syntax.range),
            "replication count cannot be negative",
        ));
        return invalid(comp, span, None);
    }
    let inner = bind_concat(comp, ctx, operands, span);
    if inner.is_invalid() {
        return inner;
    }
    let Some(info) = comp.types.integral_info(inner.ty) else {
        return invalid(comp, span, Some(inner));
    };
    let width = info.width.saturating_mul(count as u32).max(1);
    let ty = comp.types.packed(width, false, info.four_state);
    let count_expr = create(comp, ctx, count_syntax);
    let operands = match inner.kind {
        ExpressionKind::Concat { operands } => operands,
        _ => vec![inner],
    };
    Expression::new(
        ExpressionKind::Replication {
            count: Box::new(count_expr),
            operands,
        },
        ty,
        span,
    )
}

fn bind_element_select(
    comp: &mut Compilation,
    ctx: &BindContext,
    base: Expression,
    index_syntax: &Expr,
    span: Span,
) -> Expression {
    if base.is_invalid() {
        return invalid(comp, span, Some(base));
    }
    let index = create(comp, ctx, index_syntax);
    let elem_ty = match comp.types.get(base.ty) {
        Type::UnpackedArray { elem, dims } => {
            if dims.len() > 1 {
                let elem = *elem;
                let rest: Vec<ArrayDim> = dims[1..].to_vec();
                comp.types.intern(Type::UnpackedArray { elem, dims: rest })
            } else {
                *elem
            }
        }
        Type::Scalar { .. } | Type::PackedInteger { .. } | Type::Enum { .. }
        | Type::PackedStruct { .. } | Type::PackedUnion { .. } => {
            let four_state = comp.types.is_four_state(base.ty);
            comp.types.packed(1, false, four_state)
        }
        Type::Str => comp.types.byte_type(),
        _ => {
            comp.diags.add(Diagnostic::error(
                DiagCode::INVALID_SELECT_BASE,
                span,
                format!(
                    "cannot index a value of type {}",
                    comp.types.display(base.ty)
                ),
            ));
            return invalid(comp, span, Some(base));
        }
    };
    Expression::new(
        ExpressionKind::ElementSelect {
            base: Box::new(base),
            index: Box::new(index),
        },
        elem_ty,
        span,
    )
}

fn bind_range_select(
    comp: &mut Compilation,
    ctx: &BindContext,
    base: Expression,
    kind: RangeSelectKind,
    left_syntax: &Expr,
    right_syntax: &Expr,
    span: Span,
) -> Expression {
    if base.is_invalid() {
        return invalid(comp, span, Some(base));
    }
    let Some(info) = comp.types.integral_info(base.ty) else {
        comp.diags.add(Diagnostic::error(
            DiagCode::INVALID_SELECT_BASE,
            span,
            format!(
                "cannot part-select a value of type {}",
                comp.types.display(base.ty)
            ),
        ));
        return invalid(comp, span, Some(base));
    };

    let width = match kind {
        RangeSelectKind::Simple => {
            let left = require_constant_i64(comp, ctx, left_syntax);
            let right = require_constant_i64(comp, ctx, right_syntax);
            let (Some(l), Some(r)) = (left, right) else {
                return invalid(comp, span, Some(base));
            };
            (l - r).unsigned_abs() + 1
        }
        RangeSelectKind::IndexedUp | RangeSelectKind::IndexedDown => {
            let Some(w) = require_constant_i64(comp, ctx, right_syntax) else {
                return invalid(comp, span, Some(base));
            };
            if w <= 0 {
                comp.diags.add(Diagnostic::error(
                    DiagCode::BAD_SELECT_BOUNDS,
                    ctx.span(right_syntax.range),
                    "part-select width must be positive",
                ));
                return invalid(comp, span, Some(base));
            }
            w as u64
        }
    };
    let Ok(width) = u32::try_from(width) else {
        comp.diags.add(Diagnostic::error(
            DiagCode::BAD_SELECT_BOUNDS,
            span,
            "part-select is too wide",
        ));
        return invalid(comp, span, Some(base));
    };

    let left = create(comp, ctx, left_syntax);
    let right = create(comp, ctx, right_syntax);
    let ty = comp.types.packed(width, false, info.four_state);
    Expression::new(
        ExpressionKind::RangeSelect {
            base: Box::new(base),
            kind,
            left: Box::new(left),
            right: Box::new(right),
        },
        ty,
        span,
    )
}

fn bind_member_access(
    comp: &mut Compilation,
    base: Expression,
    name: &str,
    span: Span,
) -> Expression {
    if base.is_invalid() {
        return invalid(comp, span, Some(base));
    }
    let fields = match comp.types.get(base.ty) {
        Type::PackedStruct { fields } | Type::PackedUnion { fields } => fields.clone(),
        _ => {
            comp.diags.add(Diagnostic::error(
                DiagCode::UNKNOWN_FIELD,
                span,
                format!(
                    "type {} has no members to access",
                    comp.types.display(base.ty)
                ),
            ));
            return invalid(comp, span, Some(base));
        }
    };
    let Some((field_index, field)) = fields
        .iter()
        .enumerate()
        .find(|(_, f)| f.name.as_str() == name)
    else {
        comp.diags.add(Diagnostic::error(
            DiagCode::UNKNOWN_FIELD,
            span,
            format!(
                "no field `{name}` in type {}",
                comp.types.display(base.ty)
            ),
        ));
        return invalid(comp, span, Some(base));
    };
    let ty = field.ty;
    Expression::new(
        ExpressionKind::MemberAccess {
            base: Box::new(base),
            name: SmolStr::new(name),
            field_index: field_index as u32,
        },
        ty,
        span,
    )
}

fn bind_call(
    comp: &mut Compilation,
    ctx: &BindContext,
    callee: &Callee,
    args: &[Expr],
    span: Span,
) -> Expression {
    match callee {
        Callee::System(name) => {
            if comp.system_subroutine(name).is_none() {
                comp.diags.add(Diagnostic::error(
                    DiagCode::UNKNOWN_SYSTEM_SUBROUTINE,
                    span,
                    format!("unknown system subroutine `${name}`"),
                ));
                return invalid(comp, span, None);
            }
            let bound: Vec<Expression> = args.iter().map(|a| create(comp, ctx, a)).collect();
            let ty = crate::system::check_system_call(comp, name, &bound, span);
            Expression::new(
                ExpressionKind::Call(CallInfo::System {
                    name: name.clone(),
                    args: bound,
                }),
                ty,
                span,
            )
        }
        Callee::Name(name) => {
            let result = lookup::lookup_name(
                comp,
                ctx.scope,
                ctx.location,
                name,
                ctx.flags.union(LookupFlags::ALLOW_DECLARED_AFTER),
                span,
            );
            let diags: Vec<Diagnostic> = result.diagnostics.clone();
            comp.diags.extend(diags);
            let Some(found) = result.found else {
                return invalid(comp, span, None);
            };
            let signature = match &comp.symbol(found).kind {
                SymbolKind::Subroutine(info) => Some((info.args.clone(), info.return_ty)),
                _ => None,
            };
            let Some((arg_syms, return_ty)) = signature else {
                comp.diags.add(Diagnostic::error(
                    DiagCode::NOT_CALLABLE,
                    span,
                    format!("`{name}` is not a subroutine"),
                ));
                return invalid(comp, span, None);
            };

            if args.len() > arg_syms.len() {
                comp.diags.add(Diagnostic::error(
                    DiagCode::WRONG_ARGUMENT_COUNT,
                    span,
                    format!(
                        "`{name}` expects {} arguments, got {}",
                        arg_syms.len(),
                        args.len()
                    ),
                ));
                return invalid(comp, span, None);
            }

            let mut bound = Vec::new();
            for (i, arg_sym) in arg_syms.iter().enumerate() {
                let (arg_ty, has_default) = match &comp.symbol(*arg_sym).kind {
                    SymbolKind::Variable(info) => (info.ty, info.initializer.is_some()),
                    _ => (comp.types.error_type(), false),
                };
                match args.get(i) {
                    Some(a) => {
                        bound.push(bind_expression_with_target(comp, ctx, a, arg_ty));
                    }
                    None if has_default => {}
                    None => {
                        comp.diags.add(Diagnostic::error(
                            DiagCode::WRONG_ARGUMENT_COUNT,
                            span,
                            format!(
                                "missing argument {} in call to `{name}`",
                                i + 1
                            ),
                        ));
                        return invalid(comp, span, None);
                    }
                }
            }

            Expression::new(
                ExpressionKind::Call(CallInfo::User {
                    subroutine: found,
                    args: bound,
                }),
                return_ty,
                span,
            )
        }
        Callee::Method { base, name } => {
            let base = create(comp, ctx, base);
            if base.is_invalid() {
                return invalid(comp, span, Some(base));
            }
            let bound: Vec<Expression> = args.iter().map(|a| create(comp, ctx, a)).collect();
            let ty =
                crate::system::check_method_call(comp, &base, name, &bound, span);
            Expression::new(
                ExpressionKind::Call(CallInfo::Method {
                    base: Box::new(base),
                    name: name.clone(),
                    args: bound,
                }),
                ty,
                span,
            )
        }
    }
}

fn bind_cast(
    comp: &mut Compilation,
    ctx: &BindContext,
    target: &CastTarget,
    operand_syntax: &Expr,
    span: Span,
) -> Expression {
    let operand = create(comp, ctx, operand_syntax);
    if operand.is_invalid() {
        return invalid(comp, span, Some(operand));
    }
    match target {
        CastTarget::Type(ty) => {
            let target_ty = bind_type(comp, ctx, ty);
            conversion(operand, target_ty, span)
        }
        CastTarget::Size(size) => {
            let Some(width) = require_constant_i64(comp, ctx, size) else {
                return invalid(comp, span, Some(operand));
            };
            if width <= 0 {
                comp.diags.add(Diagnostic::error(
                    DiagCode::BAD_SELECT_BOUNDS,
                    ctx.span(size.range),
                    "size cast width must be positive",
                ));
                return invalid(comp, span, Some(operand));
            }
            let Some(info) = comp.types.integral_info(operand.ty) else {
                comp.diags.add(Diagnostic::error(
                    DiagCode::BAD_CONVERSION,
                    span,
                    "size cast operand must be integral",
                ));
                return invalid(comp, span, Some(operand));
            };
            let ty = comp
                .types
                .packed(width as u32, info.signed, info.four_state);
            conversion(operand, ty, span)
        }
        CastTarget::Signed(signed) => {
            let Some(info) = comp.types.integral_info(operand.ty) else {
                comp.diags.add(Diagnostic::error(
                    DiagCode::BAD_CONVERSION,
                    span,
                    "signedness cast operand must be integral",
                ));
                return invalid(comp, span, Some(operand));
            };
            let ty = comp.types.packed(info.width, *signed, info.four_state);
            conversion(operand, ty, span)
        }
    }
}

// ----------------------------------------------------------------------
// Assignment patterns
// ----------------------------------------------------------------------

enum PatternShape<'a> {
    Simple(&'a [Expr]),
    Structured(&'a [(PatternKey, Expr)]),
    Replicated(&'a Expr, &'a [Expr]),
}

fn bind_pattern(
    comp: &mut Compilation,
    ctx: &BindContext,
    shape: PatternShape<'_>,
    target: TypeId,
    span: Span,
) -> Expression {
    match comp.types.get(target).clone() {
        Type::UnpackedArray { elem, dims } => {
            bind_pattern_for_array(comp, ctx, shape, target, elem, &dims, span)
        }
        Type::PackedStruct { fields } | Type::PackedUnion { fields } => {
            bind_pattern_for_struct(comp, ctx, shape, target, &fields, span)
        }
        _ => {
            comp.diags.add(Diagnostic::error(
                DiagCode::BAD_CONVERSION,
                span,
                format!(
                    "assignment pattern cannot target type {}",
                    comp.types.display(target)
                ),
            ));
            invalid(comp, span, None)
        }
    }
}

fn bind_pattern_for_array(
    comp: &mut Compilation,
    ctx: &BindContext,
    shape: PatternShape<'_>,
    target: TypeId,
    elem: TypeId,
    dims: &[ArrayDim],
    span: Span,
) -> Expression {
    let elem_ty = if dims.len() > 1 {
        let rest = dims[1..].to_vec();
        comp.types.intern(Type::UnpackedArray { elem, dims: rest })
    } else {
        elem
    };
    let expected = dims.first().map(|d| d.size()).unwrap_or(0) as usize;

    match shape {
        PatternShape::Simple(elements) => {
            if elements.len() != expected {
                comp.diags.add(Diagnostic::error(
                    DiagCode::WRONG_PATTERN_COUNT,
                    span,
                    format!(
                        "pattern has {} elements but the array needs {expected}",
                        elements.len()
                    ),
                ));
                return invalid(comp, span, None);
            }
            let bound: Vec<Expression> = elements
                .iter()
                .map(|e| bind_expression_with_target(comp, ctx, e, elem_ty))
                .collect();
            Expression::new(ExpressionKind::SimplePattern { elements: bound }, target, span)
        }
        PatternShape::Structured(entries) => {
            // Arrays accept only a `default:` key; it fills every
            // element.
            let Some((_, default_expr)) = entries
                .iter()
                .find(|(k, _)| matches!(k, PatternKey::Default))
            else {
                comp.diags.add(Diagnostic::error(
                    DiagCode::WRONG_PATTERN_COUNT,
                    span,
                    "array pattern needs positional elements or a default",
                ));
                return invalid(comp, span, None);
            };
            let mut elements = Vec::with_capacity(expected);
            for _ in 0..expected {
                elements.push(bind_expression_with_target(comp, ctx, default_expr, elem_ty));
            }
            Expression::new(
                ExpressionKind::StructuredPattern { elements },
                target,
                span,
            )
        }
        PatternShape::Replicated(count, operands) => {
            let Some(count) = require_constant_i64(comp, ctx, count) else {
                return invalid(comp, span, None);
            };
            let total = operands.len().saturating_mul(count.max(0) as usize);
            if total != expected {
                comp.diags.add(Diagnostic::error(
                    DiagCode::WRONG_PATTERN_COUNT,
                    span,
                    format!(
                        "replicated pattern covers {total} elements but the array needs {expected}"
                    ),
                ));
                return invalid(comp, span, None);
            }
            let mut elements = Vec::with_capacity(total);
            for _ in 0..count.max(0) {
                for operand in operands {
                    elements.push(bind_expression_with_target(comp, ctx, operand, elem_ty));
                }
            }
            let count_expr = create(comp, ctx, &Expr::int(count));
            Expression::new(
                ExpressionKind::ReplicatedPattern {
                    count: Box::new(count_expr),
                    operands: elements,
                },
                target,
                span,
            )
        }
    }
}

fn bind_pattern_for_struct(
    comp: &mut Compilation,
    ctx: &BindContext,
    shape: PatternShape<'_>,
    target: TypeId,
    fields: &[FieldInfo],
    span: Span,
) -> Expression {
    match shape {
        PatternShape::Simple(elements) => {
            if elements.len() != fields.len() {
                comp.diags.add(Diagnostic::error(
                    DiagCode::WRONG_PATTERN_COUNT,
                    span,
                    format!(
                        "pattern has {} elements but the struct has {} fields",
                        elements.len(),
                        fields.len()
                    ),
                ));
                return invalid(comp, span, None);
            }
            let bound: Vec<Expression> = elements
                .iter()
                .zip(fields)
                .map(|(e, f)| bind_expression_with_target(comp, ctx, e, f.ty))
                .collect();
            Expression::new(ExpressionKind::SimplePattern { elements: bound }, target, span)
        }
        PatternShape::Structured(entries) => {
            let mut bound: Vec<Option<Expression>> = Vec::new();
            bound.resize_with(fields.len(), || None);
            let mut default_syntax: Option<&Expr> = None;
            for (key, value) in entries {
                match key {
                    PatternKey::Default => default_syntax = Some(value),
                    PatternKey::Field(name) => {
                        match fields.iter().position(|f| &f.name == name) {
                            Some(i) => {
                                let ty = fields[i].ty;
                                bound[i] =
                                    Some(bind_expression_with_target(comp, ctx, value, ty));
                            }
                            None => {
                                comp.diags.add(Diagnostic::error(
                                    DiagCode::UNKNOWN_FIELD,
                                    span,
                                    format!(
                                        "no field `{name}` in type {}",
                                        comp.types.display(target)
                                    ),
                                ));
                            }
                        }
                    }
                }
            }
            let mut elements = Vec::with_capacity(fields.len());
            for (i, slot) in bound.into_iter().enumerate() {
                match slot {
                    Some(e) => elements.push(e),
                    None => match default_syntax {
                        Some(d) => {
                            let ty = fields[i].ty;
                            elements.push(bind_expression_with_target(comp, ctx, d, ty));
                        }
                        None => {
                            comp.diags.add(Diagnostic::error(
                                DiagCode::WRONG_PATTERN_COUNT,
                                span,
                                format!(
                                    "field `{}` is not covered by the pattern",
                                    fields[i].name
                                ),
                            ));
                            return invalid(comp, span, None);
                        }
                    },
                }
            }
            Expression::new(
                ExpressionKind::StructuredPattern { elements },
                target,
                span,
            )
        }
        PatternShape::Replicated(..) => {
            comp.diags.add(Diagnostic::error(
                DiagCode::BAD_CONVERSION,
                span,
                "replication patterns cannot target a struct",
            ));
            invalid(comp, span, None)
        }
    }
}

// ----------------------------------------------------------------------
// Conversion and lvalues
// ----------------------------------------------------------------------

fn conversion(operand: Expression, target: TypeId, span: Span) -> Expression {
    Expression::new(
        ExpressionKind::Conversion {
            operand: Box::new(operand),
        },
        target,
        span,
    )
}

/// Implicit conversion for a value of type S appearing in a position
/// of type T.
pub(crate) fn convert_assignment(
    comp: &mut Compilation,
    expr: Expression,
    target: TypeId,
    span: Span,
) -> Expression {
    if expr.ty == target || comp.types.is_error(target) || expr.is_invalid() {
        return expr;
    }

    // Unbased unsized literals stretch to the target width in place.
    if let ExpressionKind::UnbasedUnsizedLiteral(bit) = &expr.kind
        && let Some(info) = comp.types.integral_info(target)
    {
        let value = LogicInt::filled(info.width, *bit).as_signed(info.signed);
        let mut e = Expression::new(
            ExpressionKind::UnbasedUnsizedLiteral(*bit),
            target,
            expr.span,
        );
        e.constant = Some(ConstantValue::Integer(value));
        return e;
    }

    let src_integral = comp.types.is_integral(expr.ty);
    let dst_integral = comp.types.is_integral(target);

    if src_integral && dst_integral {
        let src_w = comp.types.bit_width(expr.ty).unwrap_or(0);
        let dst_w = comp.types.bit_width(target).unwrap_or(0);
        if dst_w < src_w && !matches!(expr.kind, ExpressionKind::IntegerLiteral(_)) {
            comp.diags.add(Diagnostic::warning(
                DiagCode::WIDTH_TRUNCATION,
                span,
                format!("implicit conversion truncates from {src_w} to {dst_w} bits"),
            ));
        }
        return conversion(expr, target, span);
    }

    let src_real = comp.types.is_floating(expr.ty);
    let dst_real = comp.types.is_floating(target);
    if (src_integral || src_real) && (dst_integral || dst_real) {
        return conversion(expr, target, span);
    }

    // String literals are implicitly string-capable in integral
    // positions and vice versa.
    let string = comp.types.string_type();
    if (expr.ty == string && dst_integral)
        || (src_integral && target == string)
    {
        return conversion(expr, target, span);
    }

    comp.diags.add(Diagnostic::error(
        DiagCode::BAD_CONVERSION,
        span,
        format!(
            "cannot implicitly convert {} to {}",
            comp.types.display(expr.ty),
            comp.types.display(target)
        ),
    ));
    invalid(comp, span, Some(expr))
}

/// Width/sign propagation into an operand of a context-determined
/// operator.
fn coerce_integral(
    comp: &mut Compilation,
    expr: Expression,
    width: u32,
    signed: bool,
    span: Span,
) -> Expression {
    let Some(info) = comp.types.integral_info(expr.ty) else {
        return expr;
    };
    if info.width == width && info.signed == signed {
        return expr;
    }
    let target = comp.types.packed(width, signed, info.four_state);
    if let ExpressionKind::UnbasedUnsizedLiteral(_) = &expr.kind {
        return convert_assignment(comp, expr, target, span);
    }
    conversion(expr, target, span)
}

/// An expression is assignable when it is a named mutable value, a
/// select or member of one, or a concatenation of them.
pub(crate) fn is_lvalue(comp: &Compilation, expr: &Expression) -> bool {
    match &expr.kind {
        ExpressionKind::NamedValue { symbol, .. } => matches!(
            comp.symbol(*symbol).kind,
            SymbolKind::Variable(_) | SymbolKind::Net(_)
        ),
        ExpressionKind::ElementSelect { base, .. }
        | ExpressionKind::RangeSelect { base, .. }
        | ExpressionKind::MemberAccess { base, .. } => is_lvalue(comp, base),
        ExpressionKind::Concat { operands } => {
            !operands.is_empty() && operands.iter().all(|o| is_lvalue(comp, o))
        }
        _ => false,
    }
}

/// Bind and fold a bound-to-be-constant expression to an i64.
fn require_constant_i64(
    comp: &mut Compilation,
    ctx: &BindContext,
    expr: &Expr,
) -> Option<i64> {
    let constant_ctx = BindContext {
        flags: ctx.flags.union(LookupFlags::CONSTANT),
        ..*ctx
    };
    let bound = create(comp, &constant_ctx, expr);
    if bound.is_invalid() {
        return None;
    }
    let value = eval::evaluate_required(comp, &bound);
    match value.into_integer().and_then(|v| v.to_i64()) {
        Some(v) => Some(v),
        None => {
            comp.diags.add(Diagnostic::error(
                DiagCode::NOT_A_CONSTANT,
                ctx.span(expr.range),
                "expression must be a known integral constant",
            ));
            None
        }
    }
}

/// Resize/retag a constant to a type, for parameter overrides.
pub(crate) fn convert_value(
    comp: &Compilation,
    value: ConstantValue,
    target: TypeId,
) -> ConstantValue {
    match (&value, comp.types.integral_info(target)) {
        (ConstantValue::Integer(v), Some(info)) => {
            ConstantValue::Integer(v.convert(info.width, info.signed))
        }
        (ConstantValue::Real(v), None) if comp.types.is_floating(target) => {
            ConstantValue::Real(*v)
        }
        (ConstantValue::Real(v), Some(info)) => ConstantValue::Integer(
            LogicInt::from_i64(info.width, info.signed, *v as i64),
        ),
        _ => value,
    }
}

/// The self-determined type a raw constant would have.
fn type_of_value(comp: &mut Compilation, value: &ConstantValue) -> TypeId {
    match value {
        ConstantValue::Integer(v) => {
            comp.types.packed(v.width(), v.is_signed(), v.has_unknown())
        }
        ConstantValue::Real(_) => comp.types.real_type(),
        ConstantValue::ShortReal(_) => comp.types.shortreal_type(),
        ConstantValue::Str(_) => comp.types.string_type(),
        ConstantValue::NullHandle => comp.types.null_type(),
        ConstantValue::Unbounded => comp.types.unbounded_type(),
        ConstantValue::Event => comp.types.event_type(),
        _ => comp.types.error_type(),
    }
}

// ----------------------------------------------------------------------
// Statements
// ----------------------------------------------------------------------

pub(crate) fn bind_statement(
    comp: &mut Compilation,
    ctx: &BindContext,
    stmt: &Stmt,
) -> Statement {
    let span = ctx.span(stmt.range);
    match &stmt.kind {
        StmtKind::Block { stmts } => {
            let bound = stmts.iter().map(|s| bind_statement(comp, ctx, s)).collect();
            Statement::new(StatementKind::Block(bound), span)
        }
        StmtKind::VarDecl(decl) => {
            let ty = bind_type(comp, ctx, &decl.ty);
            let full = bind_unpacked_dims(comp, ctx, ty, &decl.unpacked_dims);
            let symbol = comp.add_symbol(
                ctx.scope,
                SymbolKind::Variable(VariableInfo {
                    ty: full,
                    initializer: None,
                }),
                decl.name.clone(),
                Span::new(ctx.file, decl.name_range),
            );
            let initializer = decl
                .init
                .as_ref()
                .map(|i| bind_expression_with_target(comp, ctx, i, full));
            Statement::new(
                StatementKind::VarDecl {
                    symbol,
                    initializer,
                },
                span,
            )
        }
        StmtKind::Expr(expr) => {
            let bound = bind_expression(comp, ctx, expr);
            if bound.is_invalid() {
                return Statement::new(StatementKind::Invalid, span);
            }
            Statement::new(StatementKind::Expr(bound), span)
        }
        StmtKind::If {
            cond,
            then_stmt,
            else_stmt,
        } => {
            let cond = bind_expression(comp, ctx, cond);
            let then_stmt = Box::new(bind_statement(comp, ctx, then_stmt));
            let else_stmt = else_stmt
                .as_ref()
                .map(|s| Box::new(bind_statement(comp, ctx, s)));
            Statement::new(
                StatementKind::If {
                    cond,
                    then_stmt,
                    else_stmt,
                },
                span,
            )
        }
        StmtKind::For {
            init,
            cond,
            steps,
            body,
        } => {
            let init = init.iter().map(|s| bind_statement(comp, ctx, s)).collect();
            let cond = cond.as_ref().map(|c| bind_expression(comp, ctx, c));
            let steps = steps.iter().map(|s| bind_expression(comp, ctx, s)).collect();
            let body = Box::new(bind_statement(comp, ctx, body));
            Statement::new(
                StatementKind::For {
                    init,
                    cond,
                    steps,
                    body,
                },
                span,
            )
        }
        StmtKind::Repeat { count, body } => {
            let count = bind_expression(comp, ctx, count);
            let body = Box::new(bind_statement(comp, ctx, body));
            Statement::new(StatementKind::Repeat { count, body }, span)
        }
        StmtKind::While { cond, body } => {
            let cond = bind_expression(comp, ctx, cond);
            let body = Box::new(bind_statement(comp, ctx, body));
            Statement::new(StatementKind::While { cond, body }, span)
        }
        StmtKind::Return(value) => {
            let value = match (value, ctx.subroutine_return) {
                (Some(v), Some(ret)) => Some(bind_expression_with_target(comp, ctx, v, ret)),
                (Some(v), None) => Some(bind_expression(comp, ctx, v)),
                (None, _) => None,
            };
            Statement::new(StatementKind::Return(value), span)
        }
        StmtKind::Break => Statement::new(StatementKind::Break, span),
        StmtKind::Continue => Statement::new(StatementKind::Continue, span),
        StmtKind::Case { selector, items } => bind_case(comp, ctx, selector, items, span),
    }
}

/// Case binding is a single cross-determined pass: the selector and
/// every arm expression size against each other.
fn bind_case(
    comp: &mut Compilation,
    ctx: &BindContext,
    selector_syntax: &Expr,
    items: &[vela_syntax::CaseItemSyntax],
    span: Span,
) -> Statement {
    let selector = bind_expression(comp, ctx, selector_syntax);
    let mut arm_exprs: Vec<Vec<Expression>> = Vec::new();
    let mut width = comp.types.bit_width(selector.ty).unwrap_or(1);
    let mut signed = comp.types.is_signed(selector.ty);

    for item in items {
        let bound: Vec<Expression> = item
            .exprs
            .iter()
            .map(|e| bind_expression(comp, ctx, e))
            .collect();
        for e in &bound {
            if let Some(info) = comp.types.integral_info(e.ty) {
                width = width.max(info.width);
                signed = signed && info.signed;
            }
        }
        arm_exprs.push(bound);
    }

    let selector = coerce_integral(comp, selector, width, signed, span);
    let mut case_items = Vec::new();
    for (item, bound) in items.iter().zip(arm_exprs) {
        let matches: Vec<Expression> = bound
            .into_iter()
            .map(|e| coerce_integral(comp, e, width, signed, span))
            .collect();
        let body = bind_statement(comp, ctx, &item.body);
        case_items.push(CaseItem { matches, body });
    }
    Statement::new(
        StatementKind::Case {
            selector,
            items: case_items,
        },
        span,
    )
}
