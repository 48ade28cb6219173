//! Declaration registration and import binding.

use super::Resolver;
use crate::{
    hir::{self, ContractId, VarKind, VariableId},
    scope::{DeclKind, ScopeId, ScopeKind, ScopeTree},
};
use sable_ast::ast;
use sable_interface::{SourceId, Span, diagnostics::ErrorKind};

impl<'a> Resolver<'a> {
    /// Creates a scope for every source and registers its declarations, recursively.
    #[instrument(level = "debug", skip_all)]
    pub(crate) fn collect_declarations(&mut self, order: &[SourceId]) {
        let sources = self.sources;
        for &id in order {
            let Some(ast) = &sources[id].ast else { continue };
            let _span = debug_span!("collect_source", name = %sources[id].name).entered();
            let scope = self.scopes.new_scope(ScopeKind::Source(id), ScopeTree::GLOBAL);
            for item in &ast.items {
                self.collect_item(id, None, scope, item);
            }
        }
        debug!(
            contracts = self.hir.contracts.len(),
            functions = self.hir.functions.len(),
            scopes = self.scopes.len(),
            "collected declarations"
        );
    }

    fn collect_item(
        &mut self,
        source: SourceId,
        contract: Option<ContractId>,
        scope: ScopeId,
        item: &'a ast::Item,
    ) {
        match &item.kind {
            ast::ItemKind::Pragma(_) | ast::ItemKind::Import(_) => {}
            ast::ItemKind::Contract(c) => self.collect_contract(source, scope, item, c),
            ast::ItemKind::Function(f) => self.collect_function(source, contract, scope, item, f),
            ast::ItemKind::Variable(var) => {
                let id = self.new_variable(source, contract, VarKind::State, var);
                self.declare_variable(scope, id, var);
            }
            ast::ItemKind::Struct(s) => {
                let id = self.hir.structs.next_idx();
                let inner = self.scopes.new_scope(ScopeKind::Struct(id), scope);
                let fields = s
                    .fields
                    .iter()
                    .map(|field| {
                        let var = self.new_variable(source, contract, VarKind::StructField, field);
                        self.declare_variable(inner, var, field);
                        var
                    })
                    .collect();
                self.hir.structs.push(hir::Struct {
                    source,
                    contract,
                    span: item.span,
                    name: s.name.clone(),
                    scope: inner,
                    fields,
                });
                self.asts.structs.push(s);
                self.declare(scope, &s.name, DeclKind::Struct(id));
                if let Some(c) = contract {
                    self.hir.contracts[c].structs.push(id);
                }
            }
            ast::ItemKind::Enum(e) => {
                let id = self.hir.enums.next_idx();
                let inner = self.scopes.new_scope(ScopeKind::Enum(id), scope);
                for (i, variant) in e.variants.iter().enumerate() {
                    self.declare(inner, variant, DeclKind::EnumMember(id, i as u32));
                }
                self.hir.enums.push(hir::Enum {
                    source,
                    contract,
                    span: item.span,
                    name: e.name.clone(),
                    scope: inner,
                    variants: e.variants.clone(),
                });
                self.declare(scope, &e.name, DeclKind::Enum(id));
                if let Some(c) = contract {
                    self.hir.contracts[c].enums.push(id);
                }
            }
            ast::ItemKind::Event(e) => {
                let id = self.hir.events.next_idx();
                let inner = self.scopes.new_scope(ScopeKind::Event(id), scope);
                let parameters = e
                    .parameters
                    .iter()
                    .map(|param| {
                        let var = self.new_variable(source, contract, VarKind::EventParam, param);
                        self.declare_variable(inner, var, param);
                        var
                    })
                    .collect();
                self.hir.events.push(hir::Event {
                    source,
                    contract,
                    span: item.span,
                    name: e.name.clone(),
                    docs: item.docs.clone(),
                    scope: inner,
                    parameters,
                    anonymous: e.anonymous,
                });
                self.asts.events.push(e);
                self.declare(scope, &e.name, DeclKind::Event(id));
                if let Some(c) = contract {
                    self.hir.contracts[c].events.push(id);
                }
            }
        }
    }

    fn collect_contract(
        &mut self,
        source: SourceId,
        scope: ScopeId,
        item: &'a ast::Item,
        contract: &'a ast::ItemContract,
    ) {
        let id = self.hir.contracts.next_idx();
        let inner = self.scopes.new_scope(ScopeKind::Contract(id), scope);
        self.hir.contracts.push(hir::Contract {
            source,
            span: item.span,
            name: contract.name.clone(),
            kind: contract.kind,
            docs: item.docs.clone(),
            scope: inner,

            // Set during resolution.
            bases: Vec::new(),
            linearized_bases: Vec::new(),
            functions: Vec::new(),
            variables: Vec::new(),
            structs: Vec::new(),
            enums: Vec::new(),
            events: Vec::new(),
            ctor: None,
            fallback: None,
            dependencies: Default::default(),
            fully_implemented: false,
        });
        self.asts.contracts.push(contract);
        self.declare(scope, &contract.name, DeclKind::Contract(id));

        for member in &contract.body {
            match &member.kind {
                ast::ItemKind::Pragma(_)
                | ast::ItemKind::Import(_)
                | ast::ItemKind::Contract(_) => {
                    let msg = format!("{} not allowed in a contract.", member.description());
                    self.dcx.err(ErrorKind::SyntaxError, msg).span(member.span).emit();
                }
                ast::ItemKind::Variable(_) => {
                    let var = self.hir.variables.next_idx();
                    self.collect_item(source, Some(id), inner, member);
                    self.hir.contracts[id].variables.push(var);
                }
                _ => self.collect_item(source, Some(id), inner, member),
            }
        }
    }

    fn collect_function(
        &mut self,
        source: SourceId,
        contract: Option<ContractId>,
        scope: ScopeId,
        item: &'a ast::Item,
        func: &'a ast::ItemFunction,
    ) {
        let id = self.hir.functions.next_idx();
        let kind = if func.kind.is_modifier() {
            ScopeKind::Modifier(id)
        } else {
            ScopeKind::Function(id)
        };
        let inner = self.scopes.new_scope(kind, scope);
        let header = &func.header;
        let parameters = self.collect_parameters(
            source,
            contract,
            inner,
            &header.parameters,
            VarKind::FunctionParam,
        );
        let returns = self.collect_parameters(
            source,
            contract,
            inner,
            &header.returns,
            VarKind::FunctionReturn,
        );
        let visibility = header.visibility.unwrap_or(match func.kind {
            ast::FunctionKind::Fallback => ast::Visibility::External,
            ast::FunctionKind::Modifier => ast::Visibility::Internal,
            _ => ast::Visibility::Public,
        });
        self.hir.functions.push(hir::Function {
            source,
            contract,
            span: item.span,
            name: header.name.clone(),
            kind: func.kind,
            visibility,
            state_mutability: header.state_mutability,
            virtual_: header.virtual_,
            docs: item.docs.clone(),
            scope: inner,
            parameters,
            returns,
            implemented: func.body.is_some(),
        });
        self.asts.functions.push(func);

        if let Some(name) = &header.name {
            let decl = if func.kind.is_modifier() {
                DeclKind::Modifier(id)
            } else {
                DeclKind::Function(id)
            };
            self.declare(scope, name, decl);
        }
        if let Some(body) = &func.body {
            self.collect_block(inner, body);
        }

        let Some(c) = contract else { return };
        self.hir.contracts[c].functions.push(id);
        let (slot, what) = match func.kind {
            ast::FunctionKind::Constructor => (&mut self.hir.contracts[c].ctor, "constructor"),
            ast::FunctionKind::Fallback => {
                (&mut self.hir.contracts[c].fallback, "fallback function")
            }
            _ => return,
        };
        if let Some(previous) = *slot {
            let previous = self.hir.functions[previous].span;
            self.dcx
                .err(ErrorKind::DeclarationError, format!("Only one {what} is allowed."))
                .span(item.span)
                .span_note(previous, "Another declaration is here:")
                .emit();
        } else {
            *slot = Some(id);
        }
    }

    fn collect_parameters(
        &mut self,
        source: SourceId,
        contract: Option<ContractId>,
        scope: ScopeId,
        params: &'a [ast::VariableDefinition],
        kind: VarKind,
    ) -> Vec<VariableId> {
        params
            .iter()
            .map(|param| {
                let id = self.new_variable(source, contract, kind, param);
                self.declare_variable(scope, id, param);
                id
            })
            .collect()
    }

    /// Creates a block scope and registers the local variables declared in it.
    fn collect_block(&mut self, parent: ScopeId, block: &ast::Block) {
        let scope = self.scopes.new_scope(ScopeKind::Block, parent);
        for stmt in &block.stmts {
            self.collect_stmt(scope, stmt);
        }
    }

    fn collect_stmt(&mut self, scope: ScopeId, stmt: &ast::Stmt) {
        match &stmt.kind {
            ast::StmtKind::DeclSingle(var, _) => self.declare_local(scope, var),
            ast::StmtKind::DeclMulti(vars, _) => {
                for var in vars.iter().flatten() {
                    self.declare_local(scope, var);
                }
            }
            ast::StmtKind::Block(block) | ast::StmtKind::DoWhile(block, _) => {
                self.collect_block(scope, block)
            }
            ast::StmtKind::For { init, body, .. } => {
                let scope = self.scopes.new_scope(ScopeKind::Block, scope);
                if let Some(init) = init {
                    self.collect_stmt(scope, init);
                }
                self.collect_stmt(scope, body);
            }
            ast::StmtKind::If(_, then, else_) => {
                self.collect_stmt(scope, then);
                if let Some(else_) = else_ {
                    self.collect_stmt(scope, else_);
                }
            }
            ast::StmtKind::While(_, body) => self.collect_stmt(scope, body),
            ast::StmtKind::Break
            | ast::StmtKind::Continue
            | ast::StmtKind::Emit(..)
            | ast::StmtKind::Expr(_)
            | ast::StmtKind::Return(_)
            | ast::StmtKind::Placeholder => {}
        }
    }

    fn declare_local(&mut self, scope: ScopeId, var: &ast::VariableDefinition) {
        if let Some(name) = &var.name {
            self.declare(scope, name, DeclKind::LocalVariable);
        }
    }

    fn new_variable(
        &mut self,
        source: SourceId,
        contract: Option<ContractId>,
        kind: VarKind,
        var: &'a ast::VariableDefinition,
    ) -> VariableId {
        self.asts.variables.push(var);
        self.hir.variables.push(hir::Variable {
            source,
            contract,
            span: var.span,
            name: var.name.clone(),
            kind,
            ty: None,
            data_location: var.data_location,
            visibility: var.visibility,
            mutability: var.mutability,
            indexed: var.indexed,
        })
    }

    fn declare_variable(&mut self, scope: ScopeId, id: VariableId, var: &ast::VariableDefinition) {
        if let Some(name) = &var.name {
            self.declare(scope, name, DeclKind::Variable(id));
        }
    }

    fn declare(&mut self, scope: ScopeId, name: &ast::Ident, kind: DeclKind) {
        let _ = self.scopes.declare(self.dcx, scope, name.as_str(), name.span, kind);
    }

    /// Makes the declarations of imported sources visible in the importing sources.
    #[instrument(level = "debug", skip_all)]
    pub(crate) fn perform_imports(&mut self, order: &[SourceId]) {
        let sources = self.sources;
        for &id in order {
            let source = &sources[id];
            let Some(ast) = &source.ast else { continue };
            let scope = self.source_scope(id);
            for (span, import) in ast.imports() {
                // Imports that failed to load were already reported.
                let Some(&(_, target)) = source.imports.iter().find(|(s, _)| *s == span) else {
                    continue;
                };
                let Some(target_scope) = self.scopes.source_scope(target) else { continue };
                trace!(from = %source.name, to = %sources[target].name, "binding import");
                self.bind_import(scope, target, target_scope, span, import);
            }
        }
    }

    fn bind_import(
        &mut self,
        scope: ScopeId,
        target: SourceId,
        target_scope: ScopeId,
        span: Span,
        import: &ast::ImportDirective,
    ) {
        match &import.items {
            ast::ImportItems::Plain(Some(alias)) | ast::ImportItems::Glob(Some(alias)) => {
                self.declare(scope, alias, DeclKind::Namespace(target));
            }
            ast::ImportItems::Plain(None) | ast::ImportItems::Glob(None) => {
                let decls: Vec<_> = self
                    .scopes
                    .scope(target_scope)
                    .declarations
                    .values()
                    .flatten()
                    .copied()
                    .collect();
                for decl in decls {
                    let _ = self.scopes.insert(self.dcx, scope, decl, span);
                }
            }
            ast::ImportItems::Aliases(aliases) => {
                for (symbol, alias) in aliases {
                    let decls = self.scopes.resolve_local(target_scope, symbol.as_str()).to_vec();
                    if decls.is_empty() {
                        let msg = format!(
                            "Declaration \"{symbol}\" not found in \"{path}\" \
                             (referenced as \"{name}\").",
                            symbol = symbol.as_str(),
                            path = import.path.value,
                            name = alias.as_ref().unwrap_or(symbol).as_str(),
                        );
                        self.dcx.err(ErrorKind::DeclarationError, msg).span(symbol.span).emit();
                        continue;
                    }
                    let name = alias.as_ref().unwrap_or(symbol);
                    for decl in decls {
                        let _ =
                            self.scopes.insert_as(self.dcx, scope, name.as_str(), decl, name.span);
                    }
                }
            }
        }
    }

    /// Declares `this` and `super` in the scope of `contract`.
    pub(crate) fn declare_this_super(&mut self, contract: ContractId) {
        let scope = self.hir.contract(contract).scope;
        let _ = self.scopes.declare(self.dcx, scope, "this", Span::DUMMY, DeclKind::This(contract));
        let _ =
            self.scopes.declare(self.dcx, scope, "super", Span::DUMMY, DeclKind::Super(contract));
    }
}
