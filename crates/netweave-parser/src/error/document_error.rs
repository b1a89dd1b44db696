use thiserror::Error;

use netweave_core::span::Span;

use crate::error::ErrorCode;

/// A malformed diagram document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("malformed XML: {message}")]
    Xml { message: String, span: Option<Span> },

    #[error("diagram `{name}` holds compressed content")]
    CompressedContent { name: String, span: Span },

    #[error("no diagram model found in document")]
    MissingModel,

    #[error("cell has no identity")]
    MissingIdentity { span: Span },

    #[error("identity `{id}` is used by more than one cell")]
    DuplicateIdentity { id: String, span: Span },

    #[error("edge `{id}` has neither a source nor a target")]
    EdgeWithoutEndpoints { id: String, span: Span },

    #[error("cell `{id}` refers to unknown {attribute} `{reference}`")]
    UnknownReference {
        id: String,
        attribute: &'static str,
        reference: String,
        span: Span,
    },

    #[error("cell `{id}` has unknown {kind} subtype `{subtype}`")]
    UnknownSubtype {
        id: String,
        kind: String,
        subtype: String,
        span: Span,
    },

    #[error("cell `{id}` has unknown type `{kind}`")]
    UnknownKind { id: String, kind: String, span: Span },

    #[error("cell `{id}` has an invalid `{field}` field: {message}")]
    InvalidRecord {
        id: String,
        field: String,
        message: String,
        span: Span,
    },
}

impl DocumentError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DocumentError::Xml { .. } => ErrorCode::E001,
            DocumentError::CompressedContent { .. } => ErrorCode::E002,
            DocumentError::MissingIdentity { .. } => ErrorCode::E003,
            DocumentError::DuplicateIdentity { .. } => ErrorCode::E004,
            DocumentError::EdgeWithoutEndpoints { .. } => ErrorCode::E005,
            DocumentError::UnknownReference { .. } => ErrorCode::E006,
            DocumentError::UnknownSubtype { .. } | DocumentError::UnknownKind { .. } => {
                ErrorCode::E007
            }
            DocumentError::InvalidRecord { .. } => ErrorCode::E008,
            DocumentError::MissingModel => ErrorCode::E009,
        }
    }

    /// Location of the offending node in the source text, if known.
    pub fn span(&self) -> Option<Span> {
        match self {
            DocumentError::Xml { span, .. } => *span,
            DocumentError::MissingModel => None,
            DocumentError::CompressedContent { span, .. }
            | DocumentError::MissingIdentity { span }
            | DocumentError::DuplicateIdentity { span, .. }
            | DocumentError::EdgeWithoutEndpoints { span, .. }
            | DocumentError::UnknownReference { span, .. }
            | DocumentError::UnknownSubtype { span, .. }
            | DocumentError::UnknownKind { span, .. }
            | DocumentError::InvalidRecord { span, .. } => Some(*span),
        }
    }

    /// Label text for the highlighted span.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentError::Xml { .. } => "syntax error here",
            DocumentError::CompressedContent { .. } => "encoded content",
            DocumentError::MissingModel => "",
            DocumentError::MissingIdentity { .. } => "cell without `id`",
            DocumentError::DuplicateIdentity { .. } => "duplicate definition",
            DocumentError::EdgeWithoutEndpoints { .. } => "unconnected edge",
            DocumentError::UnknownReference { .. } => "dangling reference",
            DocumentError::UnknownSubtype { .. } | DocumentError::UnknownKind { .. } => {
                "unknown tag"
            }
            DocumentError::InvalidRecord { .. } => "invalid field",
        }
    }

    pub fn help(&self) -> Option<String> {
        match self {
            DocumentError::CompressedContent { .. } => Some(
                "save the drawing uncompressed, or decode it (base64, raw deflate, URL escaping) first"
                    .to_string(),
            ),
            DocumentError::EdgeWithoutEndpoints { .. } => {
                Some("attach at least one end of the edge to a shape".to_string())
            }
            DocumentError::UnknownSubtype { kind, .. } if kind == "Node" => {
                Some("node subtypes are Basic, Fluid, Ground and Reference".to_string())
            }
            DocumentError::UnknownSubtype { kind, .. } if kind == "Network" => Some(
                "network subtypes are Sub, Super, Subnet-Interface, Connector and Super-Port"
                    .to_string(),
            ),
            DocumentError::InvalidRecord { .. } => Some(
                "connections are `link,port,key,m0 m1 ...` entries separated by `;`".to_string(),
            ),
            _ => None,
        }
    }
}
