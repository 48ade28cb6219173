//! Declaration registration, import binding, and name and type resolution.
//!
//! The [`Resolver`] builds the [`Hir`] and the [`ScopeTree`] from the syntax trees of the sources
//! in processing order. Function bodies are only resolved, not lowered.

use crate::{
    hir::{ContractId, EventId, FunctionId, Hir, StructId, VariableId},
    parse::Sources,
    scope::{DeclId, DeclKind, ScopeId, ScopeTree},
    ty::Ty,
};
use sable_ast::ast;
use sable_data_structures::{
    index::IndexVec,
    map::{FxHashMap, FxHashSet},
};
use sable_interface::{
    SourceId, Span,
    diagnostics::{DiagCtxt, ErrorGuaranteed, ErrorKind},
};

mod body;
mod collect;
mod types;

/// Syntax tree nodes of the HIR entities, for the passes that need more than the HIR holds.
pub(crate) struct AstMap<'a> {
    pub(crate) contracts: IndexVec<ContractId, &'a ast::ItemContract>,
    pub(crate) functions: IndexVec<FunctionId, &'a ast::ItemFunction>,
    pub(crate) variables: IndexVec<VariableId, &'a ast::VariableDefinition>,
    pub(crate) structs: IndexVec<StructId, &'a ast::ItemStruct>,
    pub(crate) events: IndexVec<EventId, &'a ast::ItemEvent>,
}

/// State of the lazily computed struct types.
enum StructState {
    /// The field types are being computed; requesting the struct again means it is recursive.
    InProgress,
    Done(Option<Ty>),
}

pub(crate) struct Resolver<'a> {
    pub(crate) dcx: &'a DiagCtxt,
    pub(crate) sources: &'a Sources,
    pub(crate) hir: Hir,
    pub(crate) scopes: ScopeTree,
    pub(crate) asts: AstMap<'a>,

    struct_types: FxHashMap<StructId, StructState>,
    /// `new` expressions in the functions of each contract.
    creations: FxHashMap<ContractId, Vec<(ContractId, Span)>>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(dcx: &'a DiagCtxt, sources: &'a Sources) -> Self {
        Self {
            dcx,
            sources,
            hir: Hir::new(),
            scopes: ScopeTree::new(),
            asts: AstMap {
                contracts: IndexVec::new(),
                functions: IndexVec::new(),
                variables: IndexVec::new(),
                structs: IndexVec::new(),
                events: IndexVec::new(),
            },
            struct_types: FxHashMap::default(),
            creations: FxHashMap::default(),
        }
    }

    pub(crate) fn finish(self) -> (Hir, ScopeTree) {
        (self.hir, self.scopes)
    }

    /// Resolves a path from `scope`: the first segment is looked up outwards, the following ones
    /// as members of contracts and import namespaces.
    pub(crate) fn resolve_path(
        &self,
        path: &ast::Path,
        scope: ScopeId,
    ) -> Result<&[DeclId], ResolveError> {
        let first = path.first();
        let mut decls = self.scopes.lookup(scope, first.as_str(), Some(first.span));
        for segment in &path.segments()[1..] {
            let [decl] = decls else { return Err(ResolveError::NotFound) };
            let inner = match self.scopes.decl(*decl).kind {
                DeclKind::Contract(id) => self.hir.contract(id).scope,
                DeclKind::Namespace(source) => {
                    self.scopes.source_scope(source).ok_or(ResolveError::NotFound)?
                }
                _ => return Err(ResolveError::NotFound),
            };
            decls = self.scopes.resolve_local(inner, segment.as_str());
        }
        if decls.is_empty() { Err(ResolveError::NotFound) } else { Ok(decls) }
    }

    /// Resolves a path that must refer to a single declaration, reporting failures.
    pub(crate) fn resolve_path_unique(
        &self,
        path: &ast::Path,
        scope: ScopeId,
    ) -> Result<DeclId, ErrorGuaranteed> {
        match self.resolve_path(path, scope) {
            Ok(&[decl]) => Ok(decl),
            Ok(_) | Err(ResolveError::NotFound) => Err(self
                .dcx
                .err(ErrorKind::DeclarationError, "Identifier not found or not unique.")
                .span(path.span())
                .emit()),
        }
    }

    /// Returns the declaration kind of `decl`.
    #[inline]
    pub(crate) fn decl_kind(&self, decl: DeclId) -> DeclKind {
        self.scopes.decl(decl).kind
    }

    /// Records a `new` expression targeting `target` in `contract`.
    pub(crate) fn record_creation(&mut self, contract: ContractId, target: ContractId, span: Span) {
        self.creations.entry(contract).or_default().push((target, span));
    }

    /// Computes the contracts every contract needs to be compiled: its bases, the contracts it
    /// creates, and the dependencies of its bases.
    #[instrument(level = "debug", skip_all)]
    pub(crate) fn compute_dependencies(&mut self) {
        for id in self.hir.contract_ids() {
            let contract = self.hir.contract(id);
            let mut deps = contract.dependencies.clone();
            for &base in contract.linearized_bases.iter().skip(1) {
                deps.insert(base);
                deps.extend(self.hir.contract(base).dependencies.iter().copied());
            }
            for &(target, _) in self.creations.get(&id).map_or(&[][..], Vec::as_slice) {
                deps.insert(target);
            }
            self.hir.contracts[id].dependencies = deps;
        }
    }

    /// Reports `new` expressions creating the contract itself, a contract deriving from it, or a
    /// contract that in turn needs this one.
    #[instrument(level = "debug", skip_all)]
    pub(crate) fn check_creation_cycles(&self) {
        for id in self.hir.contract_ids() {
            let Some(creations) = self.creations.get(&id) else { continue };
            for &(target, span) in creations {
                if self.depends_on(target, id) {
                    let msg = "Circular reference for contract creation (cannot create instance \
                               of derived or same contract).";
                    self.dcx.err(ErrorKind::TypeError, msg).span(span).emit();
                }
            }
        }
    }

    /// Returns `true` if compiling `from` requires `to`, or if they are the same contract.
    fn depends_on(&self, from: ContractId, to: ContractId) -> bool {
        let mut stack = vec![from];
        let mut seen = FxHashSet::default();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.hir.contract(id).dependencies.iter().copied());
            }
        }
        false
    }

    /// Reports libraries sharing a name, which would make link references ambiguous.
    #[instrument(level = "debug", skip_all)]
    pub(crate) fn check_library_names(&self) {
        let mut libraries = FxHashMap::<&str, ContractId>::default();
        for id in self.hir.contract_ids() {
            let contract = self.hir.contract(id);
            if !contract.is_library() {
                continue;
            }
            if let Some(&previous) = libraries.get(contract.name.as_str()) {
                let msg = format!(
                    "Library \"{}\" declared twice (will create ambiguities during linking).",
                    contract.name
                );
                self.dcx
                    .err(ErrorKind::DeclarationError, msg)
                    .span(contract.name.span)
                    .span_note(
                        self.hir.contract(previous).name.span,
                        "The other declaration is here:",
                    )
                    .emit();
            } else {
                libraries.insert(contract.name.as_str(), id);
            }
        }
    }

    /// Returns the scope of the source `id`.
    pub(crate) fn source_scope(&self, id: SourceId) -> ScopeId {
        self.scopes.source_scope(id).unwrap_or(ScopeTree::GLOBAL)
    }
}

/// A path that could not be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResolveError {
    NotFound,
}
