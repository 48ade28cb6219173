//! Semantic passes run around name resolution.
//!
//! The syntax and docstring checkers only need the syntax tree and run before declarations are
//! registered; the static analyzer runs on the resolved HIR.

use crate::hir::Hir;
use sable_ast::ast;
use sable_interface::diagnostics::DiagCtxt;

mod docstring;
mod static_analyzer;
mod syntax;

pub use syntax::version_matches;

/// Runs the syntax checker on a source.
#[instrument(name = "syntax_check", level = "debug", skip_all)]
pub fn check_syntax(dcx: &DiagCtxt, ast: &ast::SourceUnit, version: &semver::Version) {
    syntax::SyntaxChecker::new(dcx, version).check(ast);
}

/// Runs the docstring checker on a source.
#[instrument(name = "docstring_check", level = "debug", skip_all)]
pub fn check_docstrings(dcx: &DiagCtxt, ast: &ast::SourceUnit) {
    docstring::DocStringChecker::new(dcx).check(ast);
}

/// Runs the static analyzer on every contract.
#[instrument(name = "static_analysis", level = "debug", skip_all)]
pub fn analyze_statically(dcx: &DiagCtxt, hir: &Hir) {
    static_analyzer::StaticAnalyzer::new(dcx, hir).check();
}
