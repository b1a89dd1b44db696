//! Error adapter for converting NetweaveError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI. Document and
//! compile errors point at the offending element in the XML they were read
//! from; everything else renders as a plain message.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceSpan};

use netweave::{CompileError, NetweaveError, element::ElementRef, span::Span};
use netweave_parser::error::{DocumentError, ErrorCode};

/// A located error: document or compile errors with their source text.
enum Located<'a> {
    Document(&'a DocumentError),
    Compile(&'a CompileError),
}

/// Adapter for errors that can point into a document.
pub struct DiagnosticAdapter<'a> {
    error: Located<'a>,
    /// Source code for displaying snippets
    src: &'a str,
}

impl<'a> DiagnosticAdapter<'a> {
    /// Adapt a document error read from `src`.
    pub fn document(err: &'a DocumentError, src: &'a str) -> Self {
        Self {
            error: Located::Document(err),
            src,
        }
    }

    /// Adapt a compile error raised for the document `src`.
    pub fn compile(err: &'a CompileError, src: &'a str) -> Self {
        Self {
            error: Located::Compile(err),
            src,
        }
    }

    fn error_code(&self) -> ErrorCode {
        match self.error {
            Located::Document(err) => err.code(),
            Located::Compile(err) => err.code(),
        }
    }

    fn primary_span(&self) -> Option<Span> {
        match self.error {
            Located::Document(err) => err.span(),
            Located::Compile(err) => err.element().and_then(ElementRef::span),
        }
    }

    fn label_text(&self) -> &'static str {
        match self.error {
            Located::Document(err) => err.label(),
            Located::Compile(err) => err.label(),
        }
    }
}

impl fmt::Debug for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("DiagnosticAdapter");
        match self.error {
            Located::Document(err) => debug.field("document", err),
            Located::Compile(err) => debug.field("compile", err),
        };
        debug.finish()
    }
}

impl fmt::Display for DiagnosticAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error {
            Located::Document(err) => fmt::Display::fmt(err, f),
            Located::Compile(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for DiagnosticAdapter<'_> {}

impl MietteDiagnostic for DiagnosticAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.error_code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self.error {
            Located::Document(err) => err.help().map(|h| Box::new(h) as Box<dyn fmt::Display>),
            Located::Compile(err) => err.help().map(|h| Box::new(h) as Box<dyn fmt::Display>),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        if self.src.is_empty() {
            return None;
        }
        Some(&self.src as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if self.src.is_empty() {
            return None;
        }
        let span = self.primary_span()?;
        let label = LabeledSpan::new_primary_with_span(
            Some(self.label_text().to_string()),
            span_to_miette(span),
        );
        Some(Box::new(std::iter::once(label)))
    }
}

/// Adapter for [`NetweaveError`] variants without a document location.
pub struct ErrorAdapter<'a>(pub &'a NetweaveError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            NetweaveError::Io(_) => "netweave::io",
            NetweaveError::Config(_) => "netweave::config",
            NetweaveError::Document { .. } | NetweaveError::Compile { .. } => return None,
        };
        Some(Box::new(code))
    }
}

/// A reportable error that can be rendered by miette.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// An error pointing into a document.
    Diagnostic(DiagnosticAdapter<'a>),
    /// A simple error without source location.
    Error(ErrorAdapter<'a>),
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reportable::Diagnostic(d) => fmt::Display::fmt(d, f),
            Reportable::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reportable::Diagnostic(_) => None,
            Reportable::Error(e) => e.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.code(),
            Reportable::Error(e) => e.code(),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Reportable::Diagnostic(d) => d.help(),
            Reportable::Error(e) => e.help(),
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Reportable::Diagnostic(d) => d.source_code(),
            Reportable::Error(e) => e.source_code(),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Reportable::Diagnostic(d) => d.labels(),
            Reportable::Error(e) => e.labels(),
        }
    }
}

fn span_to_miette(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

/// Convert a [`NetweaveError`] into a list of reportable errors.
///
/// Compilation stops at the first violation, so there is one report per
/// error.
pub fn to_reportables(err: &NetweaveError) -> Vec<Reportable<'_>> {
    let reportable = match err {
        NetweaveError::Document { err, src } => {
            Reportable::Diagnostic(DiagnosticAdapter::document(err, src))
        }
        NetweaveError::Compile { err, src } => {
            Reportable::Diagnostic(DiagnosticAdapter::compile(err, src))
        }
        NetweaveError::Io(_) | NetweaveError::Config(_) => Reportable::Error(ErrorAdapter(err)),
    };
    vec![reportable]
}
