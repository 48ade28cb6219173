use sable_ast::{
    ast::{self, Stmt, StmtKind},
    visit::{self, Visit},
};
use sable_interface::{
    Span,
    diagnostics::{DiagCtxt, ErrorKind},
};
use semver::{Version, VersionReq};
use std::{convert::Infallible, ops::ControlFlow};

/// Structural rules the grammar does not enforce.
pub(super) struct SyntaxChecker<'a> {
    dcx: &'a DiagCtxt,
    version: &'a Version,
    span: Span,
    in_loop_depth: u32,
    in_modifier: bool,
}

impl<'a> SyntaxChecker<'a> {
    pub(super) fn new(dcx: &'a DiagCtxt, version: &'a Version) -> Self {
        Self { dcx, version, span: Span::DUMMY, in_loop_depth: 0, in_modifier: false }
    }

    pub(super) fn check(mut self, ast: &ast::SourceUnit) {
        let ControlFlow::Continue(()) = self.visit_source_unit(ast);
    }

    fn err(&self, msg: &str, span: Span) {
        self.dcx.err(ErrorKind::SyntaxError, msg).span(span).emit();
    }
}

impl<'ast> Visit<'ast> for SyntaxChecker<'_> {
    type BreakValue = Infallible;

    fn visit_item(&mut self, item: &'ast ast::Item) -> ControlFlow<Self::BreakValue> {
        self.span = item.span;
        visit::walk_item(self, item)
    }

    fn visit_pragma_directive(
        &mut self,
        pragma: &'ast ast::PragmaDirective,
    ) -> ControlFlow<Self::BreakValue> {
        match pragma {
            ast::PragmaDirective::Version(name, req) if name.as_str() == "solidity" => {
                match version_matches(&req.value, self.version) {
                    Some(true) => {}
                    Some(false) => {
                        let msg = format!(
                            "Source file requires different compiler version (current compiler \
                             is {}) - note that nightly builds are considered to be strictly less \
                             than the released version",
                            self.version
                        );
                        self.err(&msg, self.span);
                    }
                    None => self.err("Found version pragma, but failed to parse it.", req.span),
                }
            }
            ast::PragmaDirective::Custom(name, value) => {
                let value = value.as_ref().map(ast::Ident::as_str);
                match (name.as_str(), value) {
                    ("abicoder", Some("v1" | "v2"))
                    | ("experimental", Some("ABIEncoderV2" | "SMTChecker")) => {}
                    _ => self.err("Unknown pragma.", self.span),
                }
            }
            ast::PragmaDirective::Version(..) => self.err("Unknown pragma.", self.span),
        }
        ControlFlow::Continue(())
    }

    fn visit_item_function(
        &mut self,
        function: &'ast ast::ItemFunction,
    ) -> ControlFlow<Self::BreakValue> {
        self.in_modifier = function.kind.is_modifier();
        let r = visit::walk_item_function(self, function);
        self.in_modifier = false;
        r
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) -> ControlFlow<Self::BreakValue> {
        let Stmt { kind, span } = stmt;
        match kind {
            StmtKind::While(..) | StmtKind::DoWhile(..) | StmtKind::For { .. } => {
                self.in_loop_depth += 1;
                let r = visit::walk_stmt(self, stmt);
                self.in_loop_depth -= 1;
                return r;
            }
            StmtKind::Break if self.in_loop_depth == 0 => {
                self.err("\"break\" has to be in a \"for\" or \"while\" loop.", *span);
            }
            StmtKind::Continue if self.in_loop_depth == 0 => {
                self.err("\"continue\" has to be in a \"for\" or \"while\" loop.", *span);
            }
            StmtKind::Placeholder if !self.in_modifier => {
                self.err("The \"_\" placeholder can only be used in modifiers.", *span);
            }
            _ => {}
        }
        visit::walk_stmt(self, stmt)
    }

    // Expressions contain no statements.
    fn visit_expr(&mut self, _expr: &'ast ast::Expr) -> ControlFlow<Self::BreakValue> {
        ControlFlow::Continue(())
    }
}

/// Returns whether `version` satisfies a `pragma solidity` requirement, or `None` if the
/// requirement can't be parsed.
///
/// Comparators are separated by whitespace, alternatives by `||`. A bare version is an exact
/// requirement.
pub fn version_matches(req: &str, version: &Version) -> Option<bool> {
    let mut matched = false;
    for alternative in req.split("||") {
        let comparators: Vec<_> = alternative
            .split_whitespace()
            .map(|c| {
                if c.starts_with(|ch: char| ch.is_ascii_digit()) {
                    format!("={c}")
                } else {
                    c.to_string()
                }
            })
            .collect();
        if comparators.is_empty() {
            return None;
        }
        let req = VersionReq::parse(&comparators.join(", ")).ok()?;
        matched |= req.matches(version);
    }
    Some(matched)
}
