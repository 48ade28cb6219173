//! Static analysis of resolved contracts.
//!
//! This pass detects:
//! - Non-constant state variables in libraries
//! - Function bodies in interfaces
//! - Return values declared on constructors

use crate::hir::{self, Hir};
use sable_interface::diagnostics::{DiagCtxt, ErrorKind};

pub(super) struct StaticAnalyzer<'a> {
    dcx: &'a DiagCtxt,
    hir: &'a Hir,
}

impl<'a> StaticAnalyzer<'a> {
    pub(super) fn new(dcx: &'a DiagCtxt, hir: &'a Hir) -> Self {
        Self { dcx, hir }
    }

    pub(super) fn check(&self) {
        for contract in self.hir.contracts.iter() {
            self.check_contract(contract);
        }
    }

    fn check_contract(&self, contract: &hir::Contract) {
        if contract.is_library() {
            for &var in &contract.variables {
                let var = self.hir.variable(var);
                if !var.is_constant() {
                    let msg = "Library cannot have non-constant state variables";
                    self.dcx.err(ErrorKind::TypeError, msg).span(var.span).emit();
                }
            }
        }

        for &f in &contract.functions {
            let function = self.hir.function(f);
            if contract.is_interface() && function.implemented {
                let msg = "Functions in interfaces cannot have an implementation.";
                self.dcx.err(ErrorKind::TypeError, msg).span(function.span).emit();
            }
            if function.kind.is_constructor() && !function.returns.is_empty() {
                let msg = "Non-empty \"returns\" directive for constructor.";
                self.dcx.err(ErrorKind::TypeError, msg).span(function.span).emit();
            }
        }
    }
}
