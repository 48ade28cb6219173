use crate::ast::SourceUnit;
use sable_interface::{Result, SourceId, diagnostics::DiagCtxt};

/// Turns the text of one source into a syntax tree.
///
/// Syntax errors are emitted to `dcx` as [`ParseError`]s; the parser returns `Err` if it could not
/// produce a tree at all.
///
/// Spans in the returned tree must refer to `source`.
///
/// [`ParseError`]: sable_interface::diagnostics::ErrorKind::ParseError
pub trait SourceParser {
    /// Parses the source `name` with content `text`.
    fn parse_source(
        &mut self,
        source: SourceId,
        name: &str,
        text: &str,
        dcx: &DiagCtxt,
    ) -> Result<SourceUnit>;
}

impl<F> SourceParser for F
where
    F: FnMut(SourceId, &str, &str, &DiagCtxt) -> Result<SourceUnit>,
{
    fn parse_source(
        &mut self,
        source: SourceId,
        name: &str,
        text: &str,
        dcx: &DiagCtxt,
    ) -> Result<SourceUnit> {
        self(source, name, text, dcx)
    }
}
