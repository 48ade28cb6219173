use super::{DiagCtxt, Diagnostic, ErrorGuaranteed};
use crate::Span;
use std::{fmt, marker::PhantomData};

/// What [`DiagBuilder::emit`] returns: [`ErrorGuaranteed`] for errors, `()` for warnings.
pub trait EmissionGuarantee: Sized {
    /// Emits `diagnostic` to `dcx`.
    fn emit_producing_guarantee(dcx: &DiagCtxt, diagnostic: Diagnostic) -> Self;
}

impl EmissionGuarantee for ErrorGuaranteed {
    fn emit_producing_guarantee(dcx: &DiagCtxt, diagnostic: Diagnostic) -> Self {
        assert!(
            diagnostic.is_error(),
            "emitted non-error ({:?}) diagnostic from `DiagBuilder<ErrorGuaranteed>`",
            diagnostic.level,
        );
        match dcx.emit_diagnostic(diagnostic) {
            Some(guar) => guar,
            None => unreachable!("error diagnostic did not produce a guarantee"),
        }
    }
}

impl EmissionGuarantee for () {
    fn emit_producing_guarantee(dcx: &DiagCtxt, diagnostic: Diagnostic) -> Self {
        let _ = dcx.emit_diagnostic(diagnostic);
    }
}

/// A diagnostic under construction, created by [`DiagCtxt::err`] or [`DiagCtxt::warn`].
///
/// Dropping a builder that was neither emitted nor cancelled panics.
#[must_use = "diagnostics must be emitted or cancelled"]
pub struct DiagBuilder<'a, G: EmissionGuarantee> {
    dcx: &'a DiagCtxt,
    /// `None` once emitted or cancelled.
    diagnostic: Option<Box<Diagnostic>>,
    _marker: PhantomData<G>,
}

impl<G: EmissionGuarantee> fmt::Debug for DiagBuilder<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.diagnostic.fmt(f)
    }
}

impl<G: EmissionGuarantee> Drop for DiagBuilder<'_, G> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        if let Some(diagnostic) = self.diagnostic.take() {
            panic!("error was constructed but not emitted: {diagnostic}");
        }
    }
}

impl<'a, G: EmissionGuarantee> DiagBuilder<'a, G> {
    pub(crate) fn new(dcx: &'a DiagCtxt, diagnostic: Diagnostic) -> Self {
        Self { dcx, diagnostic: Some(Box::new(diagnostic)), _marker: PhantomData }
    }

    /// Records the diagnostic in the context.
    pub fn emit(mut self) -> G {
        let diagnostic = self.take();
        G::emit_producing_guarantee(self.dcx, diagnostic)
    }

    /// Discards the diagnostic.
    #[inline]
    pub fn cancel(mut self) {
        let _ = self.take();
    }

    fn take(&mut self) -> Diagnostic {
        match self.diagnostic.take() {
            Some(diagnostic) => *diagnostic,
            None => unreachable!("diagnostic consumed twice"),
        }
    }

    fn diagnostic_mut(&mut self) -> &mut Diagnostic {
        match &mut self.diagnostic {
            Some(diagnostic) => diagnostic,
            None => unreachable!("diagnostic already consumed"),
        }
    }
}

/// Forwards methods to [`Diagnostic`].
macro_rules! forward {
    (
        $(
            $(#[$attrs:meta])*
            $vis:vis fn $n:ident($($name:ident: $ty:ty),* $(,)?);
        )*
    ) => {
        $(
            $(#[$attrs])*
            #[doc = concat!("See [`Diagnostic::", stringify!($n), "()`].")]
            $vis fn $n(mut self, $($name: $ty),*) -> Self {
                self.diagnostic_mut().$n($($name),*);
                self
            }
        )*
    };
}

/// Forwarded methods to [`Diagnostic`].
impl<G: EmissionGuarantee> DiagBuilder<'_, G> {
    forward! {
        pub fn span(span: Span);
        pub fn note(msg: impl Into<String>);
        pub fn span_note(span: Span, msg: impl Into<String>);
    }
}
