//! Instance elaboration: turning definitions into bodies, expanding
//! generate constructs, applying bind directives, and checking DPI
//! exports. These are the driver internals behind `get_root`.

use std::collections::HashMap;
use std::sync::Arc;

use smol_str::SmolStr;
use vela_diag::{DiagCode, Diagnostic};
use vela_source::{FileId, Span};
use vela_syntax::{
    Expr, ExprKind, GenerateBlock, ItemKind, ParamAssignment, PortConnection, UnaryOp,
};

use crate::bind::{self, BindContext};
use crate::compilation::{Compilation, ParamOverrideNode, Pending};
use crate::eval;
use crate::lookup::{LookupFlags, LookupLocation};
use crate::scope::{DeferredMember, Scope, ScopeId};
use crate::symbols::{DefinitionId, ParameterInfo, SymbolId, SymbolIndex, SymbolKind};
use crate::value::{ConstantValue, Logic, LogicInt};

/// Instance-body cache key: definition, parameter values in rendered
/// form, and the port-connection shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct InstanceCacheKey {
    pub definition: DefinitionId,
    pub params: Vec<(SmolStr, String)>,
    pub ports: Vec<Option<SmolStr>>,
}

impl Compilation {
    /// Create one instance of a definition in `parent_scope`.
    ///
    /// `at` pins the symbol to a deferred slot; `None` claims the
    /// next index. Returns the instance symbol unless the depth
    /// limit cut elaboration short.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create_instance(
        &mut self,
        parent_scope: ScopeId,
        def: DefinitionId,
        instance_name: &str,
        param_assignments: &[ParamAssignment],
        override_node: Option<ParamOverrideNode>,
        connections: &[PortConnection],
        depth: u32,
        file: FileId,
    ) -> Option<SymbolId> {
        self.create_instance_at(
            parent_scope,
            None,
            def,
            instance_name,
            param_assignments,
            override_node,
            connections,
            depth,
            file,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create_instance_at(
        &mut self,
        parent_scope: ScopeId,
        at: Option<SymbolIndex>,
        def: DefinitionId,
        instance_name: &str,
        param_assignments: &[ParamAssignment],
        override_node: Option<ParamOverrideNode>,
        connections: &[PortConnection],
        depth: u32,
        file: FileId,
    ) -> Option<SymbolId> {
        let def_span = self.definition(def).span;
        if depth > self.options().max_instance_depth {
            self.diags.add(Diagnostic::error(
                DiagCode::MAX_INSTANCE_DEPTH_EXCEEDED,
                def_span,
                format!(
                    "instance recursion exceeds the maximum depth of {}",
                    self.options().max_instance_depth
                ),
            ));
            return None;
        }
        if self.hit_error_limit() {
            return None;
        }

        let param_values = self.evaluate_param_assignments(
            parent_scope,
            def,
            param_assignments,
            &override_node,
            file,
        );

        // Port connections bind in the parent context; only their
        // shape participates in the cache key.
        let location = at
            .map(|i| LookupLocation::new(parent_scope, i.0))
            .unwrap_or(LookupLocation::MAX);
        for conn in connections {
            if let Some(expr) = &conn.expr {
                let ctx = BindContext::new(parent_scope, location, LookupFlags::NONE, file);
                bind::bind_expression(self, &ctx, expr);
            }
        }

        let def_name = self.definition(def).name.clone();
        let cacheable = !self.options().disable_instance_caching
            && override_node.as_ref().is_none_or(ParamOverrideNode::is_empty)
            && !self.has_binds_for(&def_name)
            && !self.has_path_binds();

        let key = InstanceCacheKey {
            definition: def,
            params: param_values
                .iter()
                .map(|(n, v)| (n.clone(), v.to_string()))
                .collect(),
            ports: connections.iter().map(|c| c.name.clone()).collect(),
        };

        let body = if cacheable {
            if let Some(&cached) = self.instance_cache_get(&key) {
                cached
            } else {
                let body =
                    self.elaborate_body(def, instance_name, &param_values, &override_node, depth);
                self.instance_cache_insert(key, body);
                body
            }
        } else {
            self.elaborate_body(def, instance_name, &param_values, &override_node, depth)
        };

        let span = self.definition(def).span;
        let kind = SymbolKind::Instance {
            body,
            definition: def,
        };
        let name = SmolStr::new(instance_name);
        let instance = match at {
            Some(index) => self.add_symbol_at(parent_scope, kind, name, span, index),
            None => self.add_symbol(parent_scope, kind, name, span),
        };
        self.note_body_instance(body, instance);
        Some(instance)
    }

    /// Evaluate `#(...)` assignments in the parent context and merge
    /// in hierarchical overrides (which win).
    fn evaluate_param_assignments(
        &mut self,
        parent_scope: ScopeId,
        def: DefinitionId,
        assignments: &[ParamAssignment],
        override_node: &Option<ParamOverrideNode>,
        file: FileId,
    ) -> Vec<(SmolStr, ConstantValue)> {
        let sig = self.definition(def).param_sig.clone();
        let mut values: Vec<(SmolStr, ConstantValue)> = Vec::new();

        let mut positional = sig.iter().filter(|p| !p.is_local);
        for assignment in assignments {
            let target = match &assignment.name {
                Some(name) => {
                    if let Some(p) = sig.iter().find(|p| &p.name == name && !p.is_local) {
                        Some(p.name.clone())
                    } else {
                        self.diags.add(Diagnostic::error(
                            DiagCode::UNKNOWN_PARAM_OVERRIDE,
                            Span::new(file, assignment.range),
                            format!(
                                "`{}` has no overridable parameter `{name}`",
                                self.definition(def).name
                            ),
                        ));
                        None
                    }
                }
                None => positional.next().map(|p| p.name.clone()),
            };
            let Some(target) = target else { continue };

            let ctx =
                BindContext::new(parent_scope, LookupLocation::MAX, LookupFlags::CONSTANT, file);
            let bound = bind::bind_expression(self, &ctx, &assignment.value);
            let value = eval::evaluate_required(self, &bound);
            values.retain(|(n, _)| n != &target);
            values.push((target, value));
        }

        if let Some(node) = override_node {
            for (name, value) in &node.overrides {
                if sig.iter().any(|p| &p.name == name) {
                    values.retain(|(n, _)| n != name);
                    values.push((name.clone(), value.clone()));
                }
            }
        }

        values.sort_by(|(a, _), (b, _)| a.cmp(b));
        values
    }

    /// Elaborate the contents of a definition under one parameter
    /// binding: populate, bind, realize, then apply definition-
    /// targeted bind directives.
    fn elaborate_body(
        &mut self,
        def: DefinitionId,
        instance_name: &str,
        param_values: &[(SmolStr, ConstantValue)],
        override_node: &Option<ParamOverrideNode>,
        depth: u32,
    ) -> SymbolId {
        let definition = self.definition(def);
        let syntax = Arc::clone(&definition.syntax);
        let lexical_parent = definition.scope;
        let file = definition.file;
        let span = definition.span;
        let name = definition.name.clone();

        let body_scope = self.alloc_scope(Scope::new(Some(lexical_parent)));
        let body = self.alloc_body_symbol(body_scope, def, name, span);

        self.current_path.push(SmolStr::new(instance_name));
        let saved_depth = self.current_depth;
        self.current_depth = depth;

        // Pass A: parameter ports first, then ports, then body items.
        let value_map: HashMap<&SmolStr, &ConstantValue> =
            param_values.iter().map(|(n, v)| (n, v)).collect();
        for param in &syntax.param_ports {
            for d in &param.declarators {
                let index = self.scope_next_index(body_scope);
                let sym = self.add_symbol_at(
                    body_scope,
                    SymbolKind::Parameter(ParameterInfo {
                        ty: self.types.error_type(),
                        is_local: param.is_local,
                        is_port: true,
                        overridden: false,
                        initializer: None,
                        value: None,
                        errored: false,
                    }),
                    d.name.clone(),
                    Span::new(file, d.name_range),
                    index,
                );
                let override_value = if param.is_local {
                    None
                } else {
                    value_map.get(&d.name).map(|v| (*v).clone())
                };
                self.pending.insert(
                    sym,
                    Pending::Param {
                        ty: param.ty.clone(),
                        init: d.init.clone(),
                        override_value,
                    },
                );
            }
        }
        for port in &syntax.ports {
            let index = self.scope_next_index(body_scope);
            let sym = self.add_symbol_at(
                body_scope,
                SymbolKind::Variable(crate::symbols::VariableInfo {
                    ty: self.types.error_type(),
                    initializer: None,
                }),
                port.name.clone(),
                Span::new(file, port.name_range),
                index,
            );
            self.pending.insert(
                sym,
                Pending::Var {
                    ty: port.ty.clone(),
                    dims: Vec::new(),
                    init: None,
                },
            );
        }
        for item in &syntax.body {
            self.populate_item(body_scope, item, file);
        }

        // Body parameters (non-port) can also be overridden by the
        // hierarchy tree.
        if let Some(node) = override_node {
            self.stage_body_overrides(body_scope, node);
        }

        // Pass B: bind members in declaration order.
        bind::bind_scope_members(self, body_scope);

        // Pass C: realize deferred members.
        self.realize_scope(body_scope, override_node, depth);

        // Definition-targeted bind directives insert into every body
        // of the target.
        self.apply_def_binds(def, body, depth);

        self.elaborated_defs.insert(def);
        self.current_depth = saved_depth;
        self.current_path.pop();
        body
    }

    /// Route override-tree values at this level into pending body
    /// parameters that were not parameter ports.
    fn stage_body_overrides(&mut self, body_scope: ScopeId, node: &ParamOverrideNode) {
        if node.overrides.is_empty() {
            return;
        }
        let members: Vec<SymbolId> = self.scope(body_scope).members.clone();
        for member in members {
            let name = self.symbol(member).name.clone();
            let Some(value) = node.overrides.get(&name) else {
                continue;
            };
            if let Some(Pending::Param {
                override_value, ..
            }) = self.pending.get_mut(&member)
                && override_value.is_none()
            {
                *override_value = Some(value.clone());
            }
        }
    }

    /// Realize deferred members of a scope: instantiations, generate
    /// constructs, defparams, and procedural items. Idempotent.
    pub(crate) fn realize_scope(
        &mut self,
        scope: ScopeId,
        override_node: &Option<ParamOverrideNode>,
        depth: u32,
    ) {
        if self.scope(scope).realized {
            return;
        }
        self.scope_mut(scope).realized = true;
        let deferred = std::mem::take(&mut self.scope_mut(scope).deferred);
        for member in deferred {
            if self.hit_error_limit() {
                return;
            }
            self.realize_deferred(scope, &member, override_node, depth);
        }
    }

    fn realize_deferred(
        &mut self,
        scope: ScopeId,
        member: &DeferredMember,
        override_node: &Option<ParamOverrideNode>,
        depth: u32,
    ) {
        let file = member.file;
        let index = member.index;
        let location = LookupLocation::new(scope, index.0);
        match &member.syntax.kind {
            ItemKind::Instance(inst) => {
                let Some(def) = self.get_definition(&inst.module_name, scope) else {
                    self.diags.add(Diagnostic::error(
                        DiagCode::UNKNOWN_DEFINITION,
                        Span::new(file, inst.module_name_range),
                        format!("unknown module `{}`", inst.module_name),
                    ));
                    return;
                };
                for instance in &inst.instances {
                    let child_node = override_node
                        .as_ref()
                        .and_then(|n| n.children.get(&instance.name).cloned());
                    self.create_instance_at(
                        scope,
                        Some(index),
                        def,
                        &instance.name,
                        &inst.param_assignments,
                        child_node,
                        &instance.connections,
                        depth + 1,
                        file,
                    );
                }
            }
            ItemKind::GenerateIf(r#gen) => {
                let cond = self.eval_generate_const(scope, location, &r#gen.condition, file);
                let taken = match cond.map(|v| v.truthy()) {
                    Some(Logic::One) => Some(&r#gen.then_block),
                    Some(_) => r#gen.else_block.as_ref(),
                    None => None,
                };
                if let Some(block) = taken {
                    self.expand_generate_block(scope, index, block, None, override_node, depth, file);
                }
            }
            ItemKind::GenerateFor(r#gen) => {
                self.expand_generate_for(scope, index, r#gen, override_node, depth, file);
            }
            ItemKind::GenerateBlock(block) => {
                self.expand_generate_block(scope, index, block, None, override_node, depth, file);
            }
            ItemKind::Defparam(dp) => {
                let ctx = BindContext::new(scope, location, LookupFlags::CONSTANT, file);
                let bound = bind::bind_expression(self, &ctx, &dp.value);
                let value = eval::evaluate_required(self, &bound);
                if !value.is_bad() {
                    let mut path = self.current_path.clone();
                    path.extend(dp.path.iter().cloned());
                    self.collected_defparams.push((path, value));
                }
            }
            ItemKind::ContinuousAssign(assign) => {
                let ctx = BindContext::new(scope, location, LookupFlags::NONE, file);
                let syntax = Expr::assign(assign.lhs.clone(), assign.rhs.clone());
                let bound = bind::bind_expression(self, &ctx, &syntax);
                if let Some(owner) = self.scope(scope).owner {
                    self.continuous_assigns.push((owner, bound));
                }
            }
            ItemKind::Initial(block) => {
                let block_scope = self.alloc_scope(Scope::new(Some(scope)));
                let ctx =
                    BindContext::new(block_scope, LookupLocation::MAX, LookupFlags::NONE, file);
                let stmts: Vec<_> = block
                    .body
                    .iter()
                    .map(|s| bind::bind_statement(self, &ctx, s))
                    .collect();
                let stmt = crate::stmt::Statement::new(
                    crate::stmt::StatementKind::Block(stmts),
                    Span::new(file, member.syntax.range),
                );
                if let Some(owner) = self.scope(scope).owner {
                    self.initial_blocks.push((owner, stmt));
                }
            }
            _ => {}
        }
    }

    fn eval_generate_const(
        &mut self,
        scope: ScopeId,
        location: LookupLocation,
        expr: &Expr,
        file: FileId,
    ) -> Option<ConstantValue> {
        let ctx = BindContext::new(scope, location, LookupFlags::CONSTANT, file);
        let bound = bind::bind_expression(self, &ctx, expr);
        let value = eval::evaluate_required(self, &bound);
        if value.is_bad() {
            return None;
        }
        if value.truthy() == Logic::X {
            self.diags.add(Diagnostic::error(
                DiagCode::NOT_A_CONSTANT,
                Span::new(file, expr.range),
                "generate condition value is unknown",
            ));
            return None;
        }
        Some(value)
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_generate_block(
        &mut self,
        scope: ScopeId,
        index: SymbolIndex,
        block: &GenerateBlock,
        genvar: Option<(&SmolStr, &LogicInt)>,
        override_node: &Option<ParamOverrideNode>,
        depth: u32,
        file: FileId,
    ) {
        let base = block
            .name
            .clone()
            .unwrap_or_else(|| SmolStr::new("genblk"));
        let name = match genvar {
            Some((_, value)) => SmolStr::new(format!(
                "{base}[{}]",
                value.to_i64().unwrap_or_default()
            )),
            None => base,
        };

        let block_scope = self.alloc_scope(Scope::new(Some(scope)));
        let block_sym = self.add_symbol_at(
            scope,
            SymbolKind::GenerateBlock { scope: block_scope },
            name,
            Span::detached(file),
            index,
        );
        self.scope_mut(block_scope).owner = Some(block_sym);

        // The loop variable becomes a localparam inside the block,
        // already fully bound.
        if let Some((gv_name, gv_value)) = genvar {
            let gv_index = self.scope_next_index(block_scope);
            self.add_symbol_at(
                block_scope,
                SymbolKind::Parameter(ParameterInfo {
                    ty: self.types.int_type(),
                    is_local: true,
                    is_port: false,
                    overridden: false,
                    initializer: None,
                    value: Some(ConstantValue::Integer(gv_value.clone())),
                    errored: false,
                }),
                gv_name.clone(),
                Span::detached(file),
                gv_index,
            );
        }

        for item in &block.items {
            self.populate_item(block_scope, item, file);
        }
        bind::bind_scope_members(self, block_scope);
        self.realize_scope(block_scope, override_node, depth);
    }

    fn expand_generate_for(
        &mut self,
        scope: ScopeId,
        index: SymbolIndex,
        r#gen: &vela_syntax::GenerateFor,
        override_node: &Option<ParamOverrideNode>,
        depth: u32,
        file: FileId,
    ) {
        let location = LookupLocation::new(scope, index.0);
        let Some(init) = self.eval_generate_const(scope, location, &r#gen.init, file) else {
            return;
        };
        let Some(mut current) = init.into_integer() else {
            self.diags.add(Diagnostic::error(
                DiagCode::GENVAR_NOT_CONSTANT,
                Span::new(file, r#gen.genvar_range),
                "genvar initializer must be an integral constant",
            ));
            return;
        };

        let max_steps = self.options().max_generate_steps;
        let mut steps = 0u32;
        loop {
            if steps >= max_steps {
                self.diags.add(Diagnostic::error(
                    DiagCode::MAX_GENERATE_STEPS_EXCEEDED,
                    Span::new(file, r#gen.genvar_range),
                    format!(
                        "generate loop exceeds the maximum of {max_steps} steps"
                    ),
                ));
                return;
            }
            steps += 1;

            match self.eval_genvar_expr(scope, &r#gen.condition, &r#gen.genvar, &current, file) {
                Some(cond) if cond.truthy() == Logic::One => {}
                Some(_) => break,
                None => return,
            }

            self.expand_generate_block(
                scope,
                index,
                &r#gen.body,
                Some((&r#gen.genvar, &current)),
                override_node,
                depth,
                file,
            );

            match self.step_genvar(scope, r#gen, &current, file) {
                Some(next) => current = next,
                None => return,
            }
        }
    }

    /// Evaluate an expression with the genvar temporarily bound as a
    /// localparam in a throwaway scope.
    fn eval_genvar_expr(
        &mut self,
        scope: ScopeId,
        expr: &Expr,
        genvar: &SmolStr,
        value: &LogicInt,
        file: FileId,
    ) -> Option<ConstantValue> {
        let temp_scope = self.alloc_scope(Scope::new(Some(scope)));
        let index = self.scope_next_index(temp_scope);
        self.add_symbol_at(
            temp_scope,
            SymbolKind::Parameter(ParameterInfo {
                ty: self.types.int_type(),
                is_local: true,
                is_port: false,
                overridden: false,
                initializer: None,
                value: Some(ConstantValue::Integer(value.clone())),
                errored: false,
            }),
            genvar.clone(),
            Span::detached(file),
            index,
        );
        let ctx = BindContext::new(temp_scope, LookupLocation::MAX, LookupFlags::CONSTANT, file);
        let bound = bind::bind_expression(self, &ctx, expr);
        let result = eval::evaluate_required(self, &bound);
        if result.is_bad() { None } else { Some(result) }
    }

    /// Apply the loop step: `i = <expr>` or `i++`/`i--` in either
    /// position.
    fn step_genvar(
        &mut self,
        scope: ScopeId,
        r#gen: &vela_syntax::GenerateFor,
        current: &LogicInt,
        file: FileId,
    ) -> Option<LogicInt> {
        let one = LogicInt::from_i64(32, true, 1);
        match &r#gen.step.kind {
            ExprKind::Assignment { op: None, lhs, rhs }
                if matches!(&lhs.kind, ExprKind::Name(n) if n == &r#gen.genvar) =>
            {
                self.eval_genvar_expr(scope, rhs, &r#gen.genvar, current, file)?
                    .into_integer()
            }
            ExprKind::Assignment {
                op: Some(op),
                lhs,
                rhs,
            } if matches!(&lhs.kind, ExprKind::Name(n) if n == &r#gen.genvar) => {
                let combined = Expr::binary(
                    *op,
                    Expr::name(r#gen.genvar.as_str()),
                    (**rhs).clone(),
                );
                self.eval_genvar_expr(scope, &combined, &r#gen.genvar, current, file)?
                    .into_integer()
            }
            ExprKind::Unary { op, operand }
                if matches!(&operand.kind, ExprKind::Name(n) if n == &r#gen.genvar) =>
            {
                match op {
                    UnaryOp::Preincrement | UnaryOp::Postincrement => Some(current.add(&one)),
                    UnaryOp::Predecrement | UnaryOp::Postdecrement => Some(current.sub(&one)),
                    _ => {
                        self.bad_genvar_step(file, r#gen);
                        None
                    }
                }
            }
            _ => {
                self.bad_genvar_step(file, r#gen);
                None
            }
        }
    }

    fn bad_genvar_step(&mut self, file: FileId, r#gen: &vela_syntax::GenerateFor) {
        self.diags.add(Diagnostic::error(
            DiagCode::GENVAR_NOT_CONSTANT,
            Span::new(file, r#gen.genvar_range),
            format!("cannot compute the loop step for genvar `{}`", r#gen.genvar),
        ));
    }

    // ------------------------------------------------------------------
    // Bind directives
    // ------------------------------------------------------------------

    /// Apply definition-targeted directives to a freshly elaborated
    /// body. Each (directive, body) pair applies exactly once.
    fn apply_def_binds(&mut self, def: DefinitionId, body: SymbolId, depth: u32) {
        let def_name = self.definition(def).name.clone();
        let directive_ids = match self.binds_by_def_get(&def_name) {
            Some(ids) => ids.to_vec(),
            None => return,
        };
        let Some(body_scope) = self.symbol(body).kind.owned_scope() else {
            return;
        };
        for id in directive_ids {
            if !self.note_bind_applied(id, body) {
                self.diags.add(Diagnostic::error(
                    DiagCode::BIND_APPLIED_TWICE,
                    self.symbol(body).span,
                    "bind directive applied more than once to the same target",
                ));
                continue;
            }
            let (directive, file) = self.bind_directive(id);
            let inst = directive.instantiation.clone();
            self.instantiate_bind(body_scope, &inst, depth, file);
        }
    }

    /// Repeatedly apply path-targeted directives until no new
    /// applications occur; bodies created by binds may themselves be
    /// bind targets.
    pub(crate) fn apply_remaining_binds(&mut self) {
        loop {
            let before = self.applied_bind_count();
            let path_binds = self.binds_by_path_clone();
            for (path, id) in path_binds {
                let Some(target) = self.resolve_instance_path(&path) else {
                    let (directive, file) = self.bind_directive(id);
                    let inst_name = directive.instantiation.module_name.clone();
                    self.diags.add(Diagnostic::error(
                        DiagCode::UNKNOWN_DEFINITION,
                        Span::detached(file),
                        format!(
                            "bind target `{}` not found for `{inst_name}`",
                            path.join(".")
                        ),
                    ));
                    continue;
                };
                let SymbolKind::Instance { body, .. } = self.symbol(target).kind else {
                    continue;
                };
                if !self.note_bind_applied(id, body) {
                    continue;
                }
                let Some(body_scope) = self.symbol(body).kind.owned_scope() else {
                    continue;
                };
                let (directive, file) = self.bind_directive(id);
                let inst = directive.instantiation.clone();
                let depth = self.current_depth;
                self.instantiate_bind(body_scope, &inst, depth, file);
            }
            if self.applied_bind_count() == before {
                break;
            }
        }
    }

    fn instantiate_bind(
        &mut self,
        target_scope: ScopeId,
        inst: &vela_syntax::InstantiationDecl,
        depth: u32,
        file: FileId,
    ) {
        let Some(def) = self.get_definition(&inst.module_name, target_scope) else {
            self.diags.add(Diagnostic::error(
                DiagCode::UNKNOWN_DEFINITION,
                Span::new(file, inst.module_name_range),
                format!("unknown module `{}` in bind directive", inst.module_name),
            ));
            return;
        };
        for instance in &inst.instances {
            self.create_instance(
                target_scope,
                def,
                &instance.name,
                &inst.param_assignments,
                None,
                &instance.connections,
                depth + 1,
                file,
            );
        }
    }

    /// Walk `a.b.c` through the elaborated design from the root.
    fn resolve_instance_path(&mut self, path: &[SmolStr]) -> Option<SymbolId> {
        let mut scope = self.root_scope();
        let mut current: Option<SymbolId> = None;
        for part in path {
            let found = self.find_member(scope, part)?;
            match self.symbol(found).kind {
                SymbolKind::Instance { body, .. } => {
                    scope = self.symbol(body).kind.owned_scope()?;
                }
                _ => {
                    scope = self.symbol(found).kind.owned_scope()?;
                }
            }
            current = Some(found);
        }
        current
    }

    // ------------------------------------------------------------------
    // DPI
    // ------------------------------------------------------------------

    /// Exported subroutines must exist and must not themselves be DPI
    /// imports.
    pub(crate) fn check_dpi_exports(&mut self) {
        let exports = self.dpi_exports_clone();
        for (export, scope, file) in exports {
            let span = Span::new(file, export.name_range);
            let Some(found) = self.find_member(scope, &export.name) else {
                self.diags.add(Diagnostic::error(
                    DiagCode::DPI_EXPORT_UNKNOWN_SUBROUTINE,
                    span,
                    format!("exported subroutine `{}` does not exist", export.name),
                ));
                continue;
            };
            match &self.symbol(found).kind {
                SymbolKind::Subroutine(info) => {
                    if info.dpi_import.is_some() {
                        self.diags.add(Diagnostic::error(
                            DiagCode::DPI_EXPORT_SIGNATURE_MISMATCH,
                            span,
                            format!(
                                "`{}` is a DPI import and cannot also be exported",
                                export.name
                            ),
                        ));
                    }
                }
                _ => {
                    self.diags.add(Diagnostic::error(
                        DiagCode::DPI_EXPORT_SIGNATURE_MISMATCH,
                        span,
                        format!("`{}` is not a subroutine", export.name),
                    ));
                }
            }
        }
    }
}

