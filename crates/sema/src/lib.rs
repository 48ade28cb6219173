//! Semantic analysis: source ordering, declaration scopes, inheritance linearization, name and
//! type resolution, semantic passes, and the documentation and interface of contracts.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(test, allow(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use sable_interface::diagnostics::DiagCtxt;

// Convenience re-exports.
pub use sable_ast::ast;
pub use sable_interface as interface;

mod parse;
pub use parse::{ParsingContext, Source, Sources};

pub mod abi;
pub mod hir;
pub mod natspec;
pub mod passes;
pub mod scope;
pub mod ty;

mod linearize;
mod resolve;

use hir::Hir;
use linearize::C3Linearizer;
use resolve::Resolver;
use scope::ScopeTree;

/// The result of analyzing the parsed sources of a compilation.
#[derive(Debug)]
pub struct Analysis {
    pub hir: Hir,
    pub scopes: ScopeTree,
    /// The processing order of the sources.
    pub order: Vec<sable_interface::SourceId>,
}

/// Analyzes the parsed sources: runs the syntax and docstring checkers, registers declarations,
/// binds imports, linearizes and resolves every contract, then runs the static analyzer if no
/// error was reported so far.
///
/// Errors are emitted to `dcx`; the returned analysis holds whatever could be resolved.
#[instrument(level = "debug", skip_all)]
pub fn analyze(sources: &Sources, dcx: &DiagCtxt, version: &semver::Version) -> Analysis {
    let order = sources.topo_order();
    debug!(?order, "processing order");

    for &id in &order {
        if let Some(ast) = &sources.source(id).ast {
            passes::check_syntax(dcx, ast, version);
        }
    }
    for &id in &order {
        if let Some(ast) = &sources.source(id).ast {
            passes::check_docstrings(dcx, ast);
        }
    }

    let mut resolver = Resolver::new(dcx, sources);
    resolver.collect_declarations(&order);
    resolver.perform_imports(&order);

    let mut linearizer = C3Linearizer::new();
    for id in resolver.hir.contract_ids() {
        let _guard = debug_span!("contract", name = %resolver.hir.contract(id).name).entered();
        resolver.declare_this_super(id);
        resolver.resolve_bases(id);
        resolver.linearize_contract(id, &mut linearizer);
        resolver.resolve_contract(id);
    }
    resolver.resolve_free_items();
    resolver.compute_dependencies();
    resolver.check_creation_cycles();
    resolver.check_library_names();

    let (hir, scopes) = resolver.finish();
    if dcx.has_errors().is_ok() {
        passes::analyze_statically(dcx, &hir);
    }
    Analysis { hir, scopes, order }
}
