//! Error types for Netweave operations.
//!
//! Compilation stages fail with a [`CompileError`] naming the offending
//! element. [`NetweaveError`] is what the public API returns: it wraps stage
//! errors together with the source text they point into, so a caller can
//! render the span.

use std::io;

use thiserror::Error;

use netweave_core::element::ElementRef;
use netweave_parser::error::{DocumentError, ErrorCode};

/// A structural or topological violation found while compiling a diagram.
///
/// Every violation is fatal; compilation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("containment of {element} loops back on itself")]
    CyclicContainment { element: ElementRef },

    #[error("{message}")]
    Topology {
        element: Option<ElementRef>,
        message: String,
    },

    #[error("link {link} is missing required port {port}")]
    MissingRequiredPort { link: ElementRef, port: usize },

    #[error("link {link} has more than one port {number}")]
    DuplicatePort {
        link: ElementRef,
        port: ElementRef,
        number: usize,
    },

    #[error("port {port} of link {link} does not end at a node")]
    DanglingPort { link: ElementRef, port: ElementRef },

    #[error("interface {interface}: {detail}")]
    InterfaceNodeCountMismatch { interface: ElementRef, detail: String },

    #[error("interfaces joined by {connector} expose different keys: {detail}")]
    InterfaceKeyMismatch { connector: ElementRef, detail: String },

    #[error("key `{key}` of interface {interface} is bound to more than one non-Ground node")]
    AmbiguousInterfaceBinding { interface: ElementRef, key: String },

    #[error("sub-network drawing `{drawing}` of {instance} is itself a super-network")]
    NestedSuperNetwork { instance: ElementRef, drawing: String },

    #[error("sub-network drawing `{drawing}` of {instance} was not found")]
    MissingSourceDrawing { instance: ElementRef, drawing: String },
}

impl CompileError {
    /// Shorthand for a [`CompileError::Topology`] error.
    pub fn topology(element: Option<ElementRef>, message: impl Into<String>) -> Self {
        Self::Topology {
            element,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::CyclicContainment { .. } => ErrorCode::E100,
            CompileError::Topology { .. } => ErrorCode::E101,
            CompileError::MissingRequiredPort { .. } => ErrorCode::E200,
            CompileError::DuplicatePort { .. } => ErrorCode::E201,
            CompileError::DanglingPort { .. } => ErrorCode::E202,
            CompileError::InterfaceNodeCountMismatch { .. } => ErrorCode::E300,
            CompileError::InterfaceKeyMismatch { .. } => ErrorCode::E301,
            CompileError::AmbiguousInterfaceBinding { .. } => ErrorCode::E302,
            CompileError::NestedSuperNetwork { .. } => ErrorCode::E303,
            CompileError::MissingSourceDrawing { .. } => ErrorCode::E304,
        }
    }

    /// The element the error points at.
    pub fn element(&self) -> Option<&ElementRef> {
        match self {
            CompileError::Topology { element, .. } => element.as_ref(),
            CompileError::CyclicContainment { element } => Some(element),
            CompileError::MissingRequiredPort { link, .. } => Some(link),
            CompileError::DuplicatePort { port, .. } | CompileError::DanglingPort { port, .. } => {
                Some(port)
            }
            CompileError::InterfaceNodeCountMismatch { interface, .. }
            | CompileError::AmbiguousInterfaceBinding { interface, .. } => Some(interface),
            CompileError::InterfaceKeyMismatch { connector, .. } => Some(connector),
            CompileError::NestedSuperNetwork { instance, .. }
            | CompileError::MissingSourceDrawing { instance, .. } => Some(instance),
        }
    }

    /// Label text for the highlighted element.
    pub fn label(&self) -> &'static str {
        match self {
            CompileError::CyclicContainment { .. } => "part of a containment cycle",
            CompileError::Topology { .. } => "here",
            CompileError::MissingRequiredPort { .. } => "link declared here",
            CompileError::DuplicatePort { .. } => "second port with this number",
            CompileError::DanglingPort { .. } => "port edge",
            CompileError::InterfaceNodeCountMismatch { .. }
            | CompileError::AmbiguousInterfaceBinding { .. } => "interface",
            CompileError::InterfaceKeyMismatch { .. } => "connector",
            CompileError::NestedSuperNetwork { .. } | CompileError::MissingSourceDrawing { .. } => {
                "sub-network instance"
            }
        }
    }

    pub fn help(&self) -> Option<&'static str> {
        match self {
            CompileError::CyclicContainment { .. } => {
                Some("an element cannot be placed inside one of its own descendants")
            }
            CompileError::MissingRequiredPort { .. } => {
                Some("draw a port edge labelled with the missing number from the link to a node")
            }
            CompileError::DuplicatePort { .. } => {
                Some("each port number may be used once per link inside the network")
            }
            CompileError::DanglingPort { .. } => {
                Some("connect the other end of the port to a node, reference or ground")
            }
            CompileError::InterfaceNodeCountMismatch { .. } => {
                Some("re-import the sub-networks so their interface records are current")
            }
            CompileError::InterfaceKeyMismatch { .. } => {
                Some("connected interfaces must expose the same set of keys")
            }
            CompileError::AmbiguousInterfaceBinding { .. } => {
                Some("make the copy on the side that owns the link port a Ground node")
            }
            CompileError::NestedSuperNetwork { .. } => {
                Some("super-networks can only be assembled from sub-networks")
            }
            CompileError::MissingSourceDrawing { .. } => {
                Some("check the `drawing` field of the instance")
            }
            CompileError::Topology { .. } => None,
        }
    }
}

/// The main error type for Netweave operations.
#[derive(Debug, Error)]
pub enum NetweaveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Document { err: DocumentError, src: String },

    #[error("{err}")]
    Compile { err: CompileError, src: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NetweaveError {
    /// Create a new `Document` error with the associated source text.
    pub fn new_document_error(err: DocumentError, src: impl Into<String>) -> Self {
        Self::Document {
            err,
            src: src.into(),
        }
    }

    /// Create a new `Compile` error with the associated source text.
    pub fn new_compile_error(err: CompileError, src: impl Into<String>) -> Self {
        Self::Compile {
            err,
            src: src.into(),
        }
    }

    /// Attach `src` to a `Compile` error that does not carry source text yet.
    pub fn with_source(self, source: &str) -> Self {
        match self {
            Self::Compile { err, src } if src.is_empty() => Self::new_compile_error(err, source),
            other => other,
        }
    }
}

impl From<CompileError> for NetweaveError {
    fn from(err: CompileError) -> Self {
        Self::new_compile_error(err, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netweave_core::identifier::Id;

    fn link() -> ElementRef {
        ElementRef::new(Id::new("error-link"), "R1", None)
    }

    #[test]
    fn test_codes() {
        let err = CompileError::MissingRequiredPort { link: link(), port: 1 };
        assert_eq!(err.code(), ErrorCode::E200);
        assert_eq!(err.to_string(), "link `R1` (error-link) is missing required port 1");
        assert_eq!(err.element(), Some(&link()));
        assert!(err.help().is_some());

        let topology = CompileError::topology(None, "network has no numbered nodes");
        assert_eq!(topology.code(), ErrorCode::E101);
        assert_eq!(topology.element(), None);
    }

    #[test]
    fn test_with_source_fills_empty_only() {
        let err: NetweaveError = CompileError::topology(None, "bad").into();
        match err.with_source("<xml/>") {
            NetweaveError::Compile { src, .. } => assert_eq!(src, "<xml/>"),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = NetweaveError::new_compile_error(CompileError::topology(None, "bad"), "first");
        match err.with_source("second") {
            NetweaveError::Compile { src, .. } => assert_eq!(src, "first"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
