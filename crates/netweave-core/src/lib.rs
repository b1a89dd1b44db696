//! Netweave Core Types and Definitions
//!
//! This crate provides the foundational types shared by every stage of the
//! Netweave diagram-to-network compiler. It includes:
//!
//! - **Identifiers**: String-interned element identities ([`identifier::Id`])
//! - **Spans**: Byte ranges into the source document ([`span::Span`])
//! - **Elements**: The typed diagram object model ([`element`] module)
//! - **Diagram**: The indexed element arena ([`diagram::Diagram`])
//! - **Library**: Shape-library master records ([`library`] module)
//! - **Network**: The resolved, serializable output model ([`network`] module)

pub mod diagram;
pub mod element;
pub mod identifier;
pub mod library;
pub mod network;
pub mod span;
