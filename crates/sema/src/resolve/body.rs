//! Resolution of contract members and function bodies.

use super::Resolver;
use crate::{
    hir::{ContractId, EventId, FunctionId, VarKind, VariableId},
    scope::{DeclKind, ScopeId, ScopeTree},
};
use sable_ast::{
    ast::{self, DataLocation, FunctionKind, Visibility},
    visit::{self, Visit},
};
use sable_data_structures::map::FxHashSet;
use sable_interface::diagnostics::ErrorKind;
use std::{convert::Infallible, ops::ControlFlow};

impl Resolver<'_> {
    /// Resolves the base contract names of `id`.
    pub(crate) fn resolve_bases(&mut self, id: ContractId) {
        let ast = self.asts.contracts[id];
        let scope = self.hir.contract(id).scope;
        // Base names are resolved outside of the contract.
        let outer = self.scopes.scope(scope).parent.unwrap_or(scope);
        let mut bases = Vec::with_capacity(ast.bases.len());
        for base in &ast.bases {
            let Ok(decl) = self.resolve_path_unique(&base.name, outer) else { continue };
            match self.decl_kind(decl) {
                DeclKind::Contract(base_id) if self.hir.contract(base_id).is_library() => {
                    let msg = "Libraries cannot be inherited from.";
                    self.dcx.err(ErrorKind::TypeError, msg).span(base.span()).emit();
                }
                DeclKind::Contract(base_id) => bases.push(base_id),
                _ => {
                    let msg = "Contract expected.";
                    self.dcx.err(ErrorKind::TypeError, msg).span(base.span()).emit();
                }
            }
        }
        trace!(contract = %self.hir.contract(id).name, ?bases, "resolved bases");
        self.hir.contracts[id].bases = bases;
    }

    /// Resolves the types and bodies of the members of `id`, then computes whether the contract
    /// is fully implemented.
    #[instrument(level = "debug", skip_all, fields(contract = %self.hir.contract(id).name))]
    pub(crate) fn resolve_contract(&mut self, id: ContractId) {
        let contract = self.hir.contract(id);
        let scope = contract.scope;
        let (variables, structs, events, functions) = (
            contract.variables.clone(),
            contract.structs.clone(),
            contract.events.clone(),
            contract.functions.clone(),
        );

        for strukt in structs {
            let span = self.hir.strukt(strukt).name.span;
            let _ = self.struct_type(strukt, span);
        }
        for var in variables {
            self.resolve_state_variable(Some(id), var, scope);
        }
        for event in events {
            self.resolve_event(event);
        }
        for function in functions {
            self.resolve_function(function);
        }

        let fully_implemented = self.is_fully_implemented(id);
        self.hir.contracts[id].fully_implemented = fully_implemented;
    }

    /// Resolves the items declared outside of contracts.
    #[instrument(level = "debug", skip_all)]
    pub(crate) fn resolve_free_items(&mut self) {
        for id in self.hir.structs.indices() {
            if self.hir.strukt(id).contract.is_none() {
                let span = self.hir.strukt(id).name.span;
                let _ = self.struct_type(id, span);
            }
        }
        for id in self.hir.variables.indices() {
            let var = self.hir.variable(id);
            if var.contract.is_none() && var.kind == VarKind::State {
                let scope = self.source_scope(var.source);
                self.resolve_state_variable(None, id, scope);
            }
        }
        for id in self.hir.events.indices() {
            if self.hir.event(id).contract.is_none() {
                self.resolve_event(id);
            }
        }
        for id in self.hir.functions.indices() {
            if self.hir.function(id).contract.is_none() {
                self.resolve_function(id);
            }
        }
    }

    fn resolve_state_variable(
        &mut self,
        contract: Option<ContractId>,
        var: VariableId,
        scope: ScopeId,
    ) {
        let _ = self.resolve_variable_type(var, scope, DataLocation::Storage);
        let ast = self.asts.variables[var];
        if let Some(init) = ast.initializer.as_deref() {
            BodyResolver::new(self, contract, scope).resolve_expr(init);
        }
    }

    fn resolve_event(&mut self, id: EventId) {
        let event = self.hir.event(id);
        let scope = event.scope;
        for param in event.parameters.clone() {
            let _ = self.resolve_variable_type(param, scope, DataLocation::Memory);
        }
    }

    /// Resolves the signature, modifier invocations and body of a function.
    fn resolve_function(&mut self, id: FunctionId) {
        let function = self.hir.function(id);
        let (scope, contract) = (function.scope, function.contract);
        let param_location = if function.visibility == Visibility::External {
            DataLocation::Calldata
        } else {
            DataLocation::Memory
        };
        let (parameters, returns) = (function.parameters.clone(), function.returns.clone());
        for param in parameters {
            let _ = self.resolve_variable_type(param, scope, param_location);
        }
        for ret in returns {
            let _ = self.resolve_variable_type(ret, scope, DataLocation::Memory);
        }

        let ast = self.asts.functions[id];
        let mut body = BodyResolver::new(self, contract, scope);
        for modifier in &ast.header.modifiers {
            body.resolve_modifier_invocation(ast.kind, modifier);
        }
        if let Some(block) = &ast.body {
            let _ = body.visit_block(block);
        }
    }

    /// Returns `true` if `id` can be deployed: it is a contract or a library, and the most
    /// derived definition of every function in its hierarchy has a body.
    fn is_fully_implemented(&self, id: ContractId) -> bool {
        let contract = self.hir.contract(id);
        if !matches!(contract.kind, ast::ContractKind::Contract | ast::ContractKind::Library) {
            return false;
        }
        let mut seen = FxHashSet::default();
        for &base in &contract.linearized_bases {
            for &function in &self.hir.contract(base).functions {
                let f = self.hir.function(function);
                if f.kind == FunctionKind::Constructor {
                    continue;
                }
                if seen.insert(self.override_key(function)) && !f.implemented {
                    trace!(function = f.name_str(), "unimplemented function");
                    return false;
                }
            }
        }
        true
    }

    /// Returns the key under which a function overrides the functions of its bases.
    pub(crate) fn override_key(&self, id: FunctionId) -> String {
        let f = self.hir.function(id);
        let params: Vec<_> = f
            .parameters
            .iter()
            .map(|&param| match &self.hir.variable(param).ty {
                Some(ty) => ty.signature_type_name(),
                None => "?".into(),
            })
            .collect();
        format!("{}:{}({})", f.kind, f.name_str(), params.join(","))
    }
}

/// Resolves the identifiers of expressions and statements against the scope tree.
///
/// Block scopes are re-entered in the order they were created while collecting declarations.
struct BodyResolver<'r, 'a> {
    resolver: &'r mut Resolver<'a>,
    contract: Option<ContractId>,
    /// The entered scopes, with the index of the next child scope to enter.
    scopes: Vec<(ScopeId, usize)>,
}

impl<'r, 'a> BodyResolver<'r, 'a> {
    fn new(
        resolver: &'r mut Resolver<'a>,
        contract: Option<ContractId>,
        scope: ScopeId,
    ) -> Self {
        Self { resolver, contract, scopes: vec![(scope, 0)] }
    }

    fn scope(&self) -> ScopeId {
        self.scopes.last().map_or(ScopeTree::GLOBAL, |&(scope, _)| scope)
    }

    fn enter_child_scope(&mut self) {
        let Some((scope, next)) = self.scopes.last_mut() else { return };
        let child = self.resolver.scopes.scope(*scope).children.get(*next).copied();
        *next += 1;
        debug_assert!(child.is_some(), "block scope was not collected");
        let child = child.unwrap_or(*scope);
        self.scopes.push((child, 0));
    }

    fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    fn resolve_expr(&mut self, expr: &ast::Expr) {
        let _ = self.visit_expr(expr);
    }

    fn resolve_modifier_invocation(&mut self, kind: FunctionKind, modifier: &ast::Modifier) {
        let resolver = &*self.resolver;
        let ok = match resolver.resolve_path(&modifier.name, self.scope()) {
            Ok(&[decl]) => match resolver.decl_kind(decl) {
                DeclKind::Modifier(_) => true,
                DeclKind::Contract(base) => {
                    kind == FunctionKind::Constructor
                        && self.contract.is_some_and(|c| {
                            let bases = &resolver.hir.contract(c).linearized_bases;
                            bases.get(1..).is_some_and(|bases| bases.contains(&base))
                        })
                }
                _ => false,
            },
            _ => false,
        };
        if !ok {
            let msg = "Referenced declaration is neither modifier nor base class.";
            resolver.dcx.err(ErrorKind::DeclarationError, msg).span(modifier.span()).emit();
        }
        for arg in &modifier.arguments {
            self.resolve_expr(arg);
        }
    }

    fn check_type(&mut self, ty: &ast::Type) {
        let scope = self.scope();
        let _ = self.resolver.lower_type(ty, scope, DataLocation::Memory);
    }
}

impl<'ast> Visit<'ast> for BodyResolver<'_, '_> {
    type BreakValue = Infallible;

    fn visit_block(&mut self, block: &'ast ast::Block) -> ControlFlow<Self::BreakValue> {
        self.enter_child_scope();
        for stmt in &block.stmts {
            self.visit_stmt(stmt)?;
        }
        self.exit_scope();
        ControlFlow::Continue(())
    }

    fn visit_stmt(&mut self, stmt: &'ast ast::Stmt) -> ControlFlow<Self::BreakValue> {
        match &stmt.kind {
            ast::StmtKind::For { .. } => {
                self.enter_child_scope();
                visit::walk_stmt(self, stmt)?;
                self.exit_scope();
                ControlFlow::Continue(())
            }
            ast::StmtKind::Emit(path, args) => {
                let resolver = &*self.resolver;
                match resolver.resolve_path(path, self.scope()) {
                    Ok(decls) => {
                        let is_event = |&d: &_| matches!(resolver.decl_kind(d), DeclKind::Event(_));
                        if !decls.iter().all(is_event) {
                            let msg = "Expression has to be an event invocation.";
                            resolver.dcx.err(ErrorKind::TypeError, msg).span(path.span()).emit();
                        }
                    }
                    Err(_) => {
                        let msg = "Undeclared identifier.";
                        resolver.dcx.err(ErrorKind::DeclarationError, msg).span(path.span()).emit();
                    }
                }
                for arg in args {
                    self.visit_expr(arg)?;
                }
                ControlFlow::Continue(())
            }
            _ => visit::walk_stmt(self, stmt),
        }
    }

    fn visit_variable_definition(
        &mut self,
        var: &'ast ast::VariableDefinition,
    ) -> ControlFlow<Self::BreakValue> {
        self.check_type(&var.ty);
        if let Some(init) = &var.initializer {
            self.visit_expr(init)?;
        }
        ControlFlow::Continue(())
    }

    fn visit_expr(&mut self, expr: &'ast ast::Expr) -> ControlFlow<Self::BreakValue> {
        match &expr.kind {
            ast::ExprKind::Ident(ident) => {
                let scope = self.scope();
                if self.resolver.scopes.lookup(scope, ident.as_str(), Some(ident.span)).is_empty() {
                    trace!(name = ident.as_str(), ?scope, "undeclared identifier");
                    let msg = "Undeclared identifier.";
                    self.resolver.dcx.err(ErrorKind::DeclarationError, msg).span(ident.span).emit();
                }
                ControlFlow::Continue(())
            }
            // Member names need type information and are not resolved here.
            ast::ExprKind::Member(base, _) => self.visit_expr(base),
            ast::ExprKind::New(ty) => {
                if let ast::TypeKind::Custom(path) = &ty.kind {
                    let scope = self.scope();
                    let Ok(decl) = self.resolver.resolve_path_unique(path, scope) else {
                        return ControlFlow::Continue(());
                    };
                    match self.resolver.decl_kind(decl) {
                        DeclKind::Contract(target) => {
                            if let Some(contract) = self.contract {
                                self.resolver.record_creation(contract, target, expr.span);
                            }
                        }
                        _ => {
                            let msg = "Contract or array type expected.";
                            self.resolver.dcx.err(ErrorKind::TypeError, msg).span(ty.span).emit();
                        }
                    }
                } else {
                    self.check_type(ty);
                }
                ControlFlow::Continue(())
            }
            ast::ExprKind::Type(ty) => {
                self.check_type(ty);
                ControlFlow::Continue(())
            }
            _ => visit::walk_expr(self, expr),
        }
    }
}
