//! Performs the [C3 linearization algorithm] on contracts, in processing order, and makes the
//! inherited declarations visible in the derived contracts.
//!
//! See also: <https://docs.soliditylang.org/en/latest/contracts.html#multiple-inheritance-and-linearization>
//!
//! [C3 linearization algorithm]: https://en.wikipedia.org/wiki/C3_linearization

use crate::{
    hir::{ContractId, VarKind},
    resolve::Resolver,
    scope::DeclKind,
};
use sable_ast::ast::Visibility;
use sable_interface::diagnostics::ErrorKind;
use std::{collections::VecDeque, fmt};

impl Resolver<'_> {
    /// Linearizes the inheritance graph of `id` and imports the declarations of its bases.
    ///
    /// Bases must have been linearized before.
    pub(crate) fn linearize_contract(&mut self, id: ContractId, linearizer: &mut C3Linearizer) {
        let _guard = debug_span!("linearize_contract", contract = %self.hir.contract(id).name)
            .entered();
        let contract = self.hir.contract(id);
        linearizer.reset();
        for &base in &contract.bases {
            linearizer.insert(base);
            let base_bases = &self.hir.contract(base).linearized_bases;
            if base_bases.is_empty() {
                let msg = "Definition of base has to precede definition of derived contract";
                self.dcx.err(ErrorKind::DeclarationError, msg).span(contract.name.span).emit();
                continue;
            }
            linearizer.insert_bases(base_bases);
        }
        linearizer.insert(id);

        let Some(linearized) = linearizer.merge() else {
            let msg = "Linearization of inheritance graph impossible";
            self.dcx.err(ErrorKind::DeclarationError, msg).span(contract.name.span).emit();
            return;
        };
        trace!(?linearized, "linearized bases");
        self.hir.contracts[id].linearized_bases = linearized.to_vec();
        self.import_inherited_scopes(id);
    }

    /// Makes the declarations of the bases of `id` that are visible in derived contracts visible
    /// in `id`'s scope. Bases are processed from the most derived one.
    fn import_inherited_scopes(&mut self, id: ContractId) {
        let _guard = debug_span!("import_inherited_scopes").entered();
        let scope = self.hir.contract(id).scope;
        let bases = self.hir.contract(id).linearized_bases.clone();
        for &base in &bases[1..] {
            let base_scope = self.hir.contract(base).scope;
            let inherited: Vec<_> = self
                .scopes
                .scope(base_scope)
                .declarations
                .iter()
                .flat_map(|(name, decls)| decls.iter().map(move |&decl| (name.clone(), decl)))
                .filter(|&(_, decl)| {
                    let decl = self.scopes.decl(decl);
                    decl.scope == base_scope && self.is_visible_in_derived_contracts(decl.kind)
                })
                .collect();

            for (name, decl) in inherited {
                let Err(conflict) = self.scopes.try_insert(scope, &name, decl) else { continue };
                match (self.decl_kind(decl), self.decl_kind(conflict)) {
                    // Overridden modifiers.
                    (DeclKind::Modifier(_), DeclKind::Modifier(_)) => continue,
                    // Public state variables can override functions.
                    (DeclKind::Function(_), DeclKind::Variable(var))
                        if self.hir.variable(var).is_public_state_variable() =>
                    {
                        continue;
                    }
                    _ => {}
                }
                let span = self.scopes.decl(decl).span;
                self.scopes.report_clash(self.dcx, span, conflict);
            }
        }
    }

    fn is_visible_in_derived_contracts(&self, kind: DeclKind) -> bool {
        match kind {
            DeclKind::Function(f) | DeclKind::Modifier(f) => {
                self.hir.function(f).visibility != Visibility::Private
            }
            DeclKind::Variable(var) => {
                let var = self.hir.variable(var);
                var.kind == VarKind::State && var.visibility != Some(Visibility::Private)
            }
            DeclKind::Struct(_) | DeclKind::Enum(_) | DeclKind::Event(_) => true,
            DeclKind::Magic(_)
            | DeclKind::Contract(_)
            | DeclKind::LocalVariable
            | DeclKind::EnumMember(..)
            | DeclKind::This(_)
            | DeclKind::Super(_)
            | DeclKind::Namespace(_) => false,
        }
    }
}

/// The C3 merge of a contract's own bases list with the linearizations of its bases.
///
/// Reused across contracts to avoid reallocating the lists.
pub(crate) struct C3Linearizer<T = ContractId> {
    to_merge: VecDeque<VecDeque<T>>,
    result: Vec<T>,
}

impl<T: Copy + Eq + fmt::Debug> C3Linearizer<T> {
    pub(crate) fn new() -> Self {
        Self { to_merge: VecDeque::new(), result: Vec::with_capacity(16) }
    }

    /// Starts a new linearization.
    pub(crate) fn reset(&mut self) {
        self.to_merge.clear();
        self.to_merge.push_back(VecDeque::new());
        self.result.clear();
    }

    /// Prepends `id` to the list of direct bases. Bases are inserted from left to right, then
    /// the contract itself.
    pub(crate) fn insert(&mut self, id: T) {
        if let Some(list) = self.to_merge.back_mut() {
            list.push_front(id);
        }
    }

    /// Adds the linearization of a base.
    pub(crate) fn insert_bases(&mut self, ids: &[T]) {
        self.to_merge.push_front(ids.iter().copied().collect());
    }

    /// Merges the lists. Returns `None` if no consistent order exists.
    pub(crate) fn merge(&mut self) -> Option<&[T]> {
        self.to_merge.retain(|list| !list.is_empty());
        while !self.to_merge.is_empty() {
            let candidate = self.next_candidate()?;
            self.result.push(candidate);
            self.to_merge.retain_mut(|list| {
                list.retain(|&c| c != candidate);
                !list.is_empty()
            });
        }
        Some(&self.result)
    }

    /// Returns the first list head that does not appear in the tail of any list.
    fn next_candidate(&self) -> Option<T> {
        self.to_merge
            .iter()
            .filter_map(|list| list.front().copied())
            .find(|&candidate| self.appears_only_at_head(candidate))
    }

    fn appears_only_at_head(&self, candidate: T) -> bool {
        self.to_merge.iter().all(|list| !list.iter().skip(1).any(|&c| c == candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linearize(bases: &[(&'static str, &[&'static str])]) -> Vec<Option<Vec<&'static str>>> {
        let mut known: Vec<(&str, Vec<&str>)> = Vec::new();
        let mut linearizer = C3Linearizer::new();
        let mut results = Vec::new();
        for &(name, direct) in bases {
            linearizer.reset();
            for &base in direct {
                linearizer.insert(base);
                let (_, lin) = known.iter().find(|(n, _)| *n == base).unwrap();
                linearizer.insert_bases(lin);
            }
            linearizer.insert(name);
            let result = linearizer.merge().map(<[_]>::to_vec);
            known.push((name, result.clone().unwrap_or_default()));
            results.push(result);
        }
        results
    }

    #[test]
    fn single_inheritance() {
        let r = linearize(&[("A", &[]), ("B", &["A"]), ("C", &["B"])]);
        assert_eq!(r[2].as_deref(), Some(&["C", "B", "A"][..]));
    }

    #[test]
    fn diamond() {
        // Bases are listed from the most base-like to the most derived.
        let r = linearize(&[("A", &[]), ("B", &["A"]), ("C", &["A"]), ("D", &["B", "C"])]);
        assert_eq!(r[3].as_deref(), Some(&["D", "C", "B", "A"][..]));
    }

    #[test]
    fn inconsistent() {
        let r = linearize(&[("A", &[]), ("B", &["A"]), ("C", &["B", "A"])]);
        assert_eq!(r[2], None);
        let r = linearize(&[("A", &[]), ("B", &["A"]), ("C", &["A", "B"])]);
        assert_eq!(r[2].as_deref(), Some(&["C", "B", "A"][..]));
    }
}
