//! Error codes for Netweave diagnostics.
//!
//! Error codes are organized by stage:
//! - `E0xx` - Document errors
//! - `E1xx` - Containment and topology errors
//! - `E2xx` - Port-map errors
//! - `E3xx` - Super-network assembly errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Document Errors (E0xx)
    // =========================================================================
    /// Malformed XML.
    ///
    /// The document is not well-formed XML.
    E001,

    /// Compressed diagram content.
    ///
    /// A `<diagram>` element carries encoded text instead of an inline
    /// `<mxGraphModel>`. It must be decoded before compiling.
    E002,

    /// Missing identity.
    ///
    /// A diagram cell has no `id` attribute.
    E003,

    /// Duplicate identity.
    ///
    /// Two cells share the same `id`.
    E004,

    /// Edge without endpoints.
    ///
    /// An edge cell has neither a `source` nor a `target`.
    E005,

    /// Unknown reference.
    ///
    /// A `parent`, `source` or `target` attribute names a cell that does not
    /// exist.
    E006,

    /// Unknown element type.
    ///
    /// The domain tag of a cell names a type or subtype that is not known.
    E007,

    /// Invalid record field.
    ///
    /// An interface record or super-port field could not be parsed.
    E008,

    /// Missing diagram model.
    ///
    /// The document contains no `<mxGraphModel>`.
    E009,

    // =========================================================================
    // Containment and Topology Errors (E1xx)
    // =========================================================================
    /// Cyclic containment.
    ///
    /// A parent chain revisits an element before reaching the document root.
    E100,

    /// Invalid network topology.
    ///
    /// The network container, its nodes or its links violate a structural rule.
    E101,

    // =========================================================================
    // Port-Map Errors (E2xx)
    // =========================================================================
    /// Missing required port.
    ///
    /// A link declares a port as required but no port edge with that number
    /// is attached.
    E200,

    /// Duplicate port.
    ///
    /// Two port edges with the same number on one link resolve into the same
    /// scope.
    E201,

    /// Dangling port.
    ///
    /// A port edge does not end at a node.
    E202,

    // =========================================================================
    // Assembly Errors (E3xx)
    // =========================================================================
    /// Interface node count mismatch.
    ///
    /// Two connected interfaces expose a different number of nodes, or a
    /// recorded node count is stale.
    E300,

    /// Interface key mismatch.
    ///
    /// Two connected interfaces expose different key sets.
    E301,

    /// Ambiguous interface binding.
    ///
    /// More than one non-ground node of an interface carries the same key.
    E302,

    /// Nested super-network.
    ///
    /// A sub-network drawing itself contains a super-network.
    E303,

    /// Missing source drawing.
    ///
    /// The drawing referenced by a sub-network instance could not be found.
    E304,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Document errors
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            ErrorCode::E006 => "E006",
            ErrorCode::E007 => "E007",
            ErrorCode::E008 => "E008",
            ErrorCode::E009 => "E009",
            // Containment and topology errors
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            // Port-map errors
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            // Assembly errors
            ErrorCode::E300 => "E300",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            // Document errors
            ErrorCode::E001 => "malformed XML",
            ErrorCode::E002 => "compressed diagram content",
            ErrorCode::E003 => "missing identity",
            ErrorCode::E004 => "duplicate identity",
            ErrorCode::E005 => "edge without endpoints",
            ErrorCode::E006 => "unknown reference",
            ErrorCode::E007 => "unknown element type",
            ErrorCode::E008 => "invalid record field",
            ErrorCode::E009 => "missing diagram model",
            // Containment and topology errors
            ErrorCode::E100 => "cyclic containment",
            ErrorCode::E101 => "invalid network topology",
            // Port-map errors
            ErrorCode::E200 => "missing required port",
            ErrorCode::E201 => "duplicate port",
            ErrorCode::E202 => "dangling port",
            // Assembly errors
            ErrorCode::E300 => "interface node count mismatch",
            ErrorCode::E301 => "interface key mismatch",
            ErrorCode::E302 => "ambiguous interface binding",
            ErrorCode::E303 => "nested super-network",
            ErrorCode::E304 => "missing source drawing",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
