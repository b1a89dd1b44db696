//! Netweave Parser
//!
//! Reads diagram documents into the [`netweave_core::diagram::Diagram`]
//! arena. It includes:
//!
//! - **Document reader**: uncompressed draw.io-style XML ([`document`] module)
//! - **Field keys**: the `c##.<name>` / `i##.<name>` convention ([`field_key`] module)
//! - **Records**: interface records stored as fields ([`record`] module)
//! - **Errors**: document errors and the shared error code table ([`error`] module)
//!
//! # Example
//!
//! ```
//! use netweave_parser::parse_document;
//!
//! let source = r#"<mxGraphModel><root><mxCell id="0"/></root></mxGraphModel>"#;
//! let diagram = parse_document(source).unwrap();
//! assert_eq!(diagram.len(), 2);
//! ```

pub mod document;
pub mod error;
pub mod field_key;
pub mod record;

pub use document::parse_document;
