use super::{DiagBuilder, Diagnostic, EmissionGuarantee, ErrorGuaranteed, ErrorKind, Level};
use sable_data_structures::map::{FxBuildHasher, FxHashSet};
use std::{cell::RefCell, hash::BuildHasher};

/// Collects the errors and warnings of a compilation.
///
/// Diagnostics are not printed: the owner of the context retrieves them with
/// [`diagnostics`](Self::diagnostics) once a stage has finished.
#[derive(Debug, Default)]
pub struct DiagCtxt {
    inner: RefCell<DiagCtxtInner>,
}

#[derive(Debug)]
struct DiagCtxtInner {
    diagnostics: Vec<Diagnostic>,

    /// The number of errors that have been emitted, including duplicates.
    err_count: usize,
    warn_count: usize,

    /// This set contains a hash of every diagnostic that has been emitted by this `DiagCtxt`.
    /// These hashes are used to avoid recording the same error twice.
    emitted_diagnostics: FxHashSet<u64>,

    can_emit_warnings: bool,
}

impl Default for DiagCtxtInner {
    fn default() -> Self {
        Self {
            diagnostics: Vec::new(),
            err_count: 0,
            warn_count: 0,
            emitted_diagnostics: FxHashSet::default(),
            can_emit_warnings: true,
        }
    }
}

impl DiagCtxt {
    /// Creates a new, empty `DiagCtxt`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables emitting warnings.
    pub fn disable_warnings(mut self) -> Self {
        self.inner.get_mut().can_emit_warnings = false;
        self
    }

    /// Emits the given diagnostic with this context.
    ///
    /// Returns a guarantee if the diagnostic is an error.
    pub fn emit_diagnostic(&self, diagnostic: Diagnostic) -> Option<ErrorGuaranteed> {
        self.inner.borrow_mut().emit_diagnostic(diagnostic)
    }

    /// Returns the number of errors that have been emitted, including duplicates.
    #[inline]
    pub fn err_count(&self) -> usize {
        self.inner.borrow().err_count
    }

    /// Returns the number of warnings that have been emitted, including duplicates.
    #[inline]
    pub fn warn_count(&self) -> usize {
        self.inner.borrow().warn_count
    }

    /// Returns `Err` if any errors have been emitted.
    pub fn has_errors(&self) -> Result<(), ErrorGuaranteed> {
        if self.inner.borrow().err_count > 0 {
            Err(ErrorGuaranteed::new_unchecked())
        } else {
            Ok(())
        }
    }

    /// Returns a copy of every recorded diagnostic, in emission order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.borrow().diagnostics.clone()
    }

    /// Forgets every recorded diagnostic.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        let can_emit_warnings = inner.can_emit_warnings;
        *inner = DiagCtxtInner { can_emit_warnings, ..Default::default() };
    }
}

/// Diagnostic constructors.
impl DiagCtxt {
    /// Creates a builder for a diagnostic of the given `kind` and `level`.
    pub fn diag<G: EmissionGuarantee>(
        &self,
        kind: ErrorKind,
        level: Level,
        msg: impl Into<String>,
    ) -> DiagBuilder<'_, G> {
        let mut diagnostic = Diagnostic::new(kind, msg);
        diagnostic.level = level;
        DiagBuilder::new(self, diagnostic)
    }

    /// Creates an error builder of the given `kind`.
    pub fn err(&self, kind: ErrorKind, msg: impl Into<String>) -> DiagBuilder<'_, ErrorGuaranteed> {
        self.diag(kind, Level::Error, msg)
    }

    /// Creates a builder at the `Warning` level with the given `msg`.
    ///
    /// Attempting to `.emit()` the builder will only emit if `can_emit_warnings` is `true`.
    pub fn warn(&self, msg: impl Into<String>) -> DiagBuilder<'_, ()> {
        self.diag(ErrorKind::Warning, Level::Warning, msg)
    }
}

impl DiagCtxtInner {
    fn emit_diagnostic(&mut self, diagnostic: Diagnostic) -> Option<ErrorGuaranteed> {
        if diagnostic.level == Level::Warning && !self.can_emit_warnings {
            return None;
        }

        let is_error = diagnostic.is_error();
        trace!(kind = %diagnostic.kind, message = %diagnostic.message, "emitting diagnostic");
        let hash = FxBuildHasher.hash_one(&diagnostic);
        if self.emitted_diagnostics.insert(hash) {
            self.diagnostics.push(diagnostic);
        }

        if is_error {
            self.err_count += 1;
            Some(ErrorGuaranteed::new_unchecked())
        } else {
            self.warn_count += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SourceId, Span};

    #[test]
    fn counts_and_dedup() {
        let dcx = DiagCtxt::new();
        assert!(dcx.has_errors().is_ok());

        let span = Span::new(SourceId::new(0), 3, 7);
        let _guar: ErrorGuaranteed =
            dcx.err(ErrorKind::DeclarationError, "Identifier already declared.").span(span).emit();
        let _ =
            dcx.err(ErrorKind::DeclarationError, "Identifier already declared.").span(span).emit();
        dcx.warn("unused").emit();

        assert_eq!(dcx.err_count(), 2);
        assert_eq!(dcx.warn_count(), 1);
        assert!(dcx.has_errors().is_err());

        let diags = dcx.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].kind(), ErrorKind::DeclarationError);
        assert_eq!(diags[0].primary_span(), Some(span));
        assert_eq!(diags[0].to_string(), "DeclarationError: Identifier already declared.");
        assert_eq!(diags[1].kind(), ErrorKind::Warning);
        assert!(!diags[1].is_error());

        dcx.reset();
        assert!(dcx.diagnostics().is_empty());
        assert!(dcx.has_errors().is_ok());
    }

    #[test]
    fn secondary_locations() {
        let dcx = DiagCtxt::new();
        let first = Span::new(SourceId::new(0), 0, 1);
        let second = Span::new(SourceId::new(0), 10, 11);
        let _ = dcx
            .err(ErrorKind::DeclarationError, "Identifier already declared.")
            .span(second)
            .span_note(first, "The previous declaration is here:")
            .note("without location")
            .emit();
        let diags = dcx.diagnostics();
        let secondary: Vec<_> = diags[0].secondary_spans().collect();
        assert_eq!(secondary, [(first, "The previous declaration is here:")]);
        assert_eq!(diags[0].children.len(), 2);
    }

    #[test]
    fn disabled_warnings() {
        let dcx = DiagCtxt::new().disable_warnings();
        dcx.warn("ignored").emit();
        assert_eq!(dcx.warn_count(), 0);
        assert!(dcx.diagnostics().is_empty());
    }

    #[test]
    #[should_panic = "error was constructed but not emitted"]
    fn unemitted_panics() {
        let dcx = DiagCtxt::new();
        let _builder = dcx.err(ErrorKind::TypeError, "forgotten");
    }

    #[test]
    fn cancel() {
        let dcx = DiagCtxt::new();
        dcx.err(ErrorKind::TypeError, "cancelled").cancel();
        assert_eq!(dcx.err_count(), 0);
    }
}
