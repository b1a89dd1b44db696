//! Diagram element types.
//!
//! Every object of a diagram document (vertex, edge, container, layer) becomes
//! one [`Element`]. The loosely-typed domain tag carried by the document is
//! resolved once, at ingestion, into an [`ElementKind`] so that later passes
//! match on variants instead of re-reading tag strings.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{diagram::ElementIndex, identifier::Id, span::Span};

/// Named data fields of an element, in document order.
///
/// Positional config and input data use the `c##.<name>` / `i##.<name>` key
/// convention; any other key is free-form.
pub type Fields = IndexMap<String, String>;

/// Name of the field carrying an interface node's matching key.
pub const KEY_FIELD: &str = "Key";

/// Physical domain of nodes and links. A network never mixes the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Basic,
    Fluid,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Basic => write!(f, "basic"),
            Domain::Fluid => write!(f, "fluid"),
        }
    }
}

/// Subtype of a Node element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Basic,
    Fluid,
    /// Unnumbered boundary node; port slots bound to it resolve to `-1`.
    Ground,
    /// Alias of an existing numbered node, matched by label.
    Reference,
}

impl NodeKind {
    /// Returns `true` for node kinds that take part in the `0..N-1` numbering.
    pub fn is_numbered(&self) -> bool {
        matches!(self, NodeKind::Basic | NodeKind::Fluid)
    }

    /// Returns the physical domain of a numbered node kind.
    pub fn domain(&self) -> Option<Domain> {
        match self {
            NodeKind::Basic => Some(Domain::Basic),
            NodeKind::Fluid => Some(Domain::Fluid),
            NodeKind::Ground | NodeKind::Reference => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Basic => "Basic",
            NodeKind::Fluid => "Fluid",
            NodeKind::Ground => "Ground",
            NodeKind::Reference => "Reference",
        }
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Basic" => Ok(NodeKind::Basic),
            "Fluid" => Ok(NodeKind::Fluid),
            "Ground" => Ok(NodeKind::Ground),
            "Reference" => Ok(NodeKind::Reference),
            _ => Err(format!("unknown node subtype `{s}`")),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape-library identity of a Link or Spotter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeType {
    subtype: Id,
    class: Option<Id>,
    variant: Option<Id>,
}

impl ShapeType {
    pub fn new(subtype: Id) -> Self {
        Self {
            subtype,
            class: None,
            variant: None,
        }
    }

    /// Attach the implementation class (and optional variant) of the shape.
    pub fn with_class(mut self, class: Id, variant: Option<Id>) -> Self {
        self.class = Some(class);
        self.variant = variant;
        self
    }

    pub fn subtype(&self) -> Id {
        self.subtype
    }

    pub fn class(&self) -> Option<Id> {
        self.class
    }

    pub fn variant(&self) -> Option<Id> {
        self.variant
    }
}

/// Kind of a network container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkKind {
    /// A standalone network, or one sub-network instance inside a super-network.
    Sub,
    /// A network assembled from sub-network instances.
    Super,
}

/// One link port bound to a keyed interface node, as recorded on the interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    link: String,
    port: usize,
    key: String,
    port_map: Vec<i64>,
}

impl Connection {
    pub fn new(
        link: impl Into<String>,
        port: usize,
        key: impl Into<String>,
        port_map: Vec<i64>,
    ) -> Self {
        Self {
            link: link.into(),
            port,
            key: key.into(),
            port_map,
        }
    }

    /// Label of the link owning the port.
    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn port(&self) -> usize {
        self.port
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The link's resolved port map inside its own sub-network.
    pub fn port_map(&self) -> &[i64] {
        &self.port_map
    }
}

/// Connections and node-count snapshot recorded on a sub-network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceRecord {
    node_count: usize,
    connections: Vec<Connection>,
}

impl InterfaceRecord {
    pub fn new(node_count: usize, connections: Vec<Connection>) -> Self {
        Self {
            node_count,
            connections,
        }
    }

    /// Number of numbered nodes the sub-network had when this record was made.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
}

/// Payload of a sub-network interface container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interface {
    record: Option<InterfaceRecord>,
    duplicate_of: Option<ElementIndex>,
}

impl Interface {
    pub fn new(record: Option<InterfaceRecord>) -> Self {
        Self {
            record,
            duplicate_of: None,
        }
    }

    /// Mark this interface as a copy of an already imported one.
    pub fn set_duplicate_of(&mut self, canonical: ElementIndex) {
        self.duplicate_of = Some(canonical);
    }

    pub fn record(&self) -> Option<&InterfaceRecord> {
        self.record.as_ref()
    }

    pub fn set_record(&mut self, record: InterfaceRecord) {
        self.record = Some(record);
    }

    /// The canonical interface this one duplicates, if any.
    pub fn duplicate_of(&self) -> Option<ElementIndex> {
        self.duplicate_of
    }
}

/// A cross-sub-network port binding produced during super-network assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SuperPort {
    instance: String,
    link: String,
    port: usize,
    node: u32,
}

impl SuperPort {
    pub fn new(instance: impl Into<String>, link: impl Into<String>, port: usize, node: u32) -> Self {
        Self {
            instance: instance.into(),
            link: link.into(),
            port,
            node,
        }
    }

    /// Label of the sub-network instance owning the link.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn port(&self) -> usize {
        self.port
    }

    /// Super-network number of the node the port is bound to.
    pub fn node(&self) -> u32 {
        self.node
    }
}

/// Semantic role of an element, resolved from its domain tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// The synthetic document root every parent chain ends at.
    Root,
    Node(NodeKind),
    Link(ShapeType),
    Port,
    Spotter(ShapeType),
    Network(NetworkKind),
    Interface(Interface),
    /// Edge joining two sub-network interfaces in a super-network.
    Connector,
    SuperPort(SuperPort),
    /// Untagged drawing object (layer, decoration, free text).
    Plain,
}

impl ElementKind {
    /// Short role name used in log records and diagnostics.
    pub fn role_name(&self) -> &'static str {
        match self {
            ElementKind::Root => "root",
            ElementKind::Node(_) => "node",
            ElementKind::Link(_) => "link",
            ElementKind::Port => "port",
            ElementKind::Spotter(_) => "spotter",
            ElementKind::Network(NetworkKind::Sub) => "sub-network",
            ElementKind::Network(NetworkKind::Super) => "super-network",
            ElementKind::Interface(_) => "interface",
            ElementKind::Connector => "connector",
            ElementKind::SuperPort(_) => "super-port",
            ElementKind::Plain => "plain",
        }
    }

    /// Returns `true` for kinds that are always drawn as edges.
    pub fn is_edge_kind(&self) -> bool {
        matches!(self, ElementKind::Port | ElementKind::Connector)
    }
}

/// Human-readable pointer to an element, carried by diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    id: Id,
    label: String,
    span: Option<Span>,
}

impl ElementRef {
    pub fn new(id: Id, label: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            id,
            label: label.into(),
            span,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "element `{}`", self.id)
        } else {
            write!(f, "`{}` ({})", self.label, self.id)
        }
    }
}

/// One object of the diagram document.
#[derive(Debug, Clone)]
pub struct Element {
    id: Id,
    label: String,
    kind: ElementKind,
    parent: Option<ElementIndex>,
    source: Option<ElementIndex>,
    target: Option<ElementIndex>,
    fields: Fields,
    span: Option<Span>,
}

impl Element {
    /// Create a parentless element with an empty label and no fields.
    pub fn new(id: Id, kind: ElementKind) -> Self {
        Self {
            id,
            label: String::new(),
            kind,
            parent: None,
            source: None,
            target: None,
            fields: Fields::new(),
            span: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_parent(mut self, parent: ElementIndex) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_endpoints(
        mut self,
        source: Option<ElementIndex>,
        target: Option<ElementIndex>,
    ) -> Self {
        self.source = source;
        self.target = target;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ElementKind {
        &mut self.kind
    }

    pub fn parent(&self) -> Option<ElementIndex> {
        self.parent
    }

    pub fn source(&self) -> Option<ElementIndex> {
        self.source
    }

    pub fn target(&self) -> Option<ElementIndex> {
        self.target
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// Look up a field value by key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The interface matching key of a node, if it carries one.
    pub fn key(&self) -> Option<&str> {
        self.field(KEY_FIELD)
    }

    /// Returns the node subtype if this element is a node.
    pub fn node_kind(&self) -> Option<NodeKind> {
        match self.kind {
            ElementKind::Node(kind) => Some(kind),
            _ => None,
        }
    }

    /// Returns `true` for Basic and Fluid nodes.
    pub fn is_numbered_node(&self) -> bool {
        self.node_kind().is_some_and(|kind| kind.is_numbered())
    }

    /// Returns `true` if the element is drawn as an edge.
    pub fn is_edge(&self) -> bool {
        self.kind.is_edge_kind() || self.source.is_some() || self.target.is_some()
    }

    /// Parse the label as an integer (node numbers, port indices).
    pub fn label_number(&self) -> Option<i64> {
        self.label.trim().parse().ok()
    }

    /// Returns `true` if either endpoint is `index`.
    pub fn touches(&self, index: ElementIndex) -> bool {
        self.source == Some(index) || self.target == Some(index)
    }

    /// Given one endpoint, return the other one.
    pub fn other_end(&self, index: ElementIndex) -> Option<ElementIndex> {
        if self.source == Some(index) {
            self.target
        } else if self.target == Some(index) {
            self.source
        } else {
            None
        }
    }

    /// A diagnostic pointer to this element.
    pub fn element_ref(&self) -> ElementRef {
        ElementRef::new(self.id, self.label.clone(), self.span)
    }

    pub fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn set_parent(&mut self, parent: Option<ElementIndex>) {
        self.parent = parent;
    }

    pub fn set_endpoints(&mut self, source: Option<ElementIndex>, target: Option<ElementIndex>) {
        self.source = source;
        self.target = target;
    }

    pub fn set_span(&mut self, span: Option<Span>) {
        self.span = span;
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.role_name(), self.element_ref())
    }
}
