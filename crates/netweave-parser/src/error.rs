//! Errors raised while reading a diagram document.
//!
//! Every [`DocumentError`] maps to an [`ErrorCode`] and, where the offending
//! XML node is known, carries the [`Span`](netweave_core::span::Span) of that
//! node so callers can point at it in the source text.
//!
//! [`ErrorCode`] covers the whole compiler, not just the reader, so that later
//! stages report codes from one shared table.

mod document_error;
mod error_code;

pub use document_error::DocumentError;
pub use error_code::ErrorCode;

/// A type alias for `Result<T, DocumentError>`.
pub type Result<T> = std::result::Result<T, DocumentError>;
