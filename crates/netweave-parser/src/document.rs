//! Reader for draw.io-style diagram documents.
//!
//! The accepted layout is
//!
//! ```xml
//! <mxfile>
//!   <diagram name="Page-1">
//!     <mxGraphModel>
//!       <root>
//!         <mxCell id="0"/>
//!         <object id="n1" label="1">
//!           <tag type="Node" subtype="Basic"/>
//!           <mxCell parent="net" vertex="1"/>
//!         </object>
//!         ...
//!       </root>
//!     </mxGraphModel>
//!   </diagram>
//! </mxfile>
//! ```
//!
//! or a bare `<mxGraphModel>`. Children of `<root>` are `mxCell`, `object` or
//! `UserObject` nodes. An `object` carries its identity, label and data
//! fields as attributes, its geometry and references on an inner `mxCell`,
//! and its domain tag on an inner `<tag>`. Cells without a tag are plain
//! drawing objects.
//!
//! Reading happens in two passes: every cell is first placed in the arena,
//! then `parent`, `source` and `target` references are resolved to indices.

use log::{debug, info, trace};
use roxmltree::Node;

use netweave_core::{
    diagram::{Diagram, DiagramError, ElementIndex},
    element::{
        Element, ElementKind, Fields, Interface, NetworkKind, NodeKind, ShapeType, SuperPort,
    },
    identifier::Id,
    span::Span,
};

use crate::{
    error::{DocumentError, Result},
    record::{
        self, CONNECTIONS_FIELD, INSTANCE_FIELD, LINK_FIELD, NODE_COUNT_FIELD, NODE_FIELD,
        PORT_FIELD,
    },
};

/// Name of the child node carrying the domain tag of an object.
pub const TAG_NODE: &str = "tag";

/// Object attributes that are not data fields.
const RESERVED_ATTRIBUTES: &[&str] = &["id", "label", "placeholders", "tooltip"];

/// Network subtypes.
const SUB: &str = "Sub";
const SUPER: &str = "Super";
const SUBNET_INTERFACE: &str = "Subnet-Interface";
const CONNECTOR: &str = "Connector";
const SUPER_PORT: &str = "Super-Port";

/// A cell read from the document, before references are resolved.
struct RawCell<'a> {
    element: Element,
    parent: Option<&'a str>,
    source: Option<&'a str>,
    target: Option<&'a str>,
}

/// Read a diagram document into a [`Diagram`].
///
/// # Errors
///
/// Returns a [`DocumentError`] if the XML is malformed, the content is
/// compressed, or any cell is structurally invalid.
pub fn parse_document(source: &str) -> Result<Diagram> {
    let document = roxmltree::Document::parse(source).map_err(|err| xml_error(source, &err))?;
    let cell_root = find_cell_root(document.root_element())?;

    let cells = cell_root
        .children()
        .filter(Node::is_element)
        .filter_map(|node| read_cell(node).transpose())
        .collect::<Result<Vec<_>>>()?;
    debug!(cells = cells.len(); "Read diagram cells");

    let mut diagram = Diagram::new();
    let mut placed = Vec::with_capacity(cells.len());
    for cell in cells {
        let span = cell.element.span().unwrap_or_default();
        let idx = diagram.insert(cell.element).map_err(|err| match err {
            DiagramError::DuplicateIdentity(id) => DocumentError::DuplicateIdentity {
                id: id.to_string(),
                span,
            },
        })?;
        placed.push((idx, cell.parent, cell.source, cell.target, span));
    }

    for (idx, parent, source, target, span) in placed {
        let parent = resolve(&diagram, idx, "parent", parent, span)?;
        let source = resolve(&diagram, idx, "source", source, span)?;
        let target = resolve(&diagram, idx, "target", target, span)?;

        if let Some(element) = diagram.get_mut(idx) {
            if let Some(parent) = parent {
                element.set_parent(Some(parent));
            }
            element.set_endpoints(source, target);
        }
    }

    info!(elements = diagram.len() - 1; "Diagram document read");
    Ok(diagram)
}

fn resolve(
    diagram: &Diagram,
    idx: ElementIndex,
    attribute: &'static str,
    reference: Option<&str>,
    span: Span,
) -> Result<Option<ElementIndex>> {
    let Some(reference) = reference else {
        return Ok(None);
    };
    diagram
        .find(Id::new(reference))
        .map(Some)
        .ok_or_else(|| DocumentError::UnknownReference {
            id: diagram[idx].id().to_string(),
            attribute,
            reference: reference.to_string(),
            span,
        })
}

/// Locate the `<root>` node holding the cells.
fn find_cell_root<'a, 'input>(top: Node<'a, 'input>) -> Result<Node<'a, 'input>> {
    let model = match top.tag_name().name() {
        "mxGraphModel" => top,
        "mxfile" => {
            let mut pages = top
                .children()
                .filter(|node| node.has_tag_name("diagram"));
            let page = pages.next().ok_or(DocumentError::MissingModel)?;
            if pages.next().is_some() {
                debug!("Document has several pages, reading the first");
            }

            match child(page, "mxGraphModel") {
                Some(model) => model,
                None if page.text().is_some_and(|text| !text.trim().is_empty()) => {
                    return Err(DocumentError::CompressedContent {
                        name: page.attribute("name").unwrap_or_default().to_string(),
                        span: Span::new(page.range()),
                    });
                }
                None => return Err(DocumentError::MissingModel),
            }
        }
        _ => return Err(DocumentError::MissingModel),
    };

    child(model, "root").ok_or(DocumentError::MissingModel)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(name))
}

/// Read one child of `<root>`. Unknown node names are skipped.
fn read_cell<'a, 'input>(node: Node<'a, 'input>) -> Result<Option<RawCell<'a>>> {
    let span = Span::new(node.range());
    let (cell, label, fields, tag) = match node.tag_name().name() {
        "mxCell" => (node, node.attribute("value").unwrap_or_default(), Fields::new(), None),
        "object" | "UserObject" => {
            let fields = node
                .attributes()
                .filter(|attr| !RESERVED_ATTRIBUTES.contains(&attr.name()))
                .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                .collect();
            // An object without an inner mxCell still has identity and fields.
            let cell = child(node, "mxCell").unwrap_or(node);
            (
                cell,
                node.attribute("label").unwrap_or_default(),
                fields,
                child(node, TAG_NODE),
            )
        }
        other => {
            trace!(node = other; "Skipping unknown node");
            return Ok(None);
        }
    };

    let id = node
        .attribute("id")
        .ok_or(DocumentError::MissingIdentity { span })?;
    let kind = match tag {
        Some(tag) => resolve_kind(id, tag, &fields, span)?,
        None => ElementKind::Plain,
    };

    let source = cell.attribute("source");
    let target = cell.attribute("target");
    let is_edge = cell.attribute("edge") == Some("1") || kind.is_edge_kind();
    if is_edge && source.is_none() && target.is_none() {
        return Err(DocumentError::EdgeWithoutEndpoints {
            id: id.to_string(),
            span,
        });
    }

    let element = Element::new(Id::new(id), kind)
        .with_label(label)
        .with_fields(fields)
        .with_span(Some(span));
    Ok(Some(RawCell {
        element,
        parent: cell.attribute("parent"),
        source,
        target,
    }))
}

/// Resolve a `<tag type subtype class variant/>` node into an element kind.
fn resolve_kind(id: &str, tag: Node<'_, '_>, fields: &Fields, span: Span) -> Result<ElementKind> {
    let kind = tag.attribute("type").unwrap_or_default();
    let subtype = tag.attribute("subtype").unwrap_or_default();
    let unknown_subtype = || DocumentError::UnknownSubtype {
        id: id.to_string(),
        kind: kind.to_string(),
        subtype: subtype.to_string(),
        span,
    };

    let shape = || -> Result<ShapeType> {
        if subtype.is_empty() {
            return Err(unknown_subtype());
        }
        let shape = ShapeType::new(Id::new(subtype));
        Ok(match tag.attribute("class") {
            Some(class) => shape.with_class(Id::new(class), tag.attribute("variant").map(Id::new)),
            None => shape,
        })
    };

    match kind {
        "Node" => subtype
            .parse::<NodeKind>()
            .map(ElementKind::Node)
            .map_err(|_| unknown_subtype()),
        "Link" => shape().map(ElementKind::Link),
        "Spotter" => shape().map(ElementKind::Spotter),
        "Port" => Ok(ElementKind::Port),
        "Network" => match subtype {
            SUB => Ok(ElementKind::Network(NetworkKind::Sub)),
            SUPER => Ok(ElementKind::Network(NetworkKind::Super)),
            SUBNET_INTERFACE => read_interface(id, fields, span).map(ElementKind::Interface),
            CONNECTOR => Ok(ElementKind::Connector),
            SUPER_PORT => read_super_port(id, fields, span).map(ElementKind::SuperPort),
            _ => Err(unknown_subtype()),
        },
        _ => Err(DocumentError::UnknownKind {
            id: id.to_string(),
            kind: kind.to_string(),
            span,
        }),
    }
}

fn read_interface(id: &str, fields: &Fields, span: Span) -> Result<Interface> {
    let record = record::parse_interface_record(
        fields.get(NODE_COUNT_FIELD).map(String::as_str),
        fields.get(CONNECTIONS_FIELD).map(String::as_str),
    )
    .map_err(|(field, message)| DocumentError::InvalidRecord {
        id: id.to_string(),
        field: field.to_string(),
        message,
        span,
    })?;
    Ok(Interface::new(record))
}

fn read_super_port(id: &str, fields: &Fields, span: Span) -> Result<SuperPort> {
    let invalid = |field: &str, message: String| DocumentError::InvalidRecord {
        id: id.to_string(),
        field: field.to_string(),
        message,
        span,
    };
    let text = |field: &str| {
        fields
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| invalid(field, "missing".to_string()))
    };

    let instance = text(INSTANCE_FIELD)?;
    let link = text(LINK_FIELD)?;
    let port = text(PORT_FIELD)?
        .trim()
        .parse::<usize>()
        .map_err(|err| invalid(PORT_FIELD, err.to_string()))?;
    let node = text(NODE_FIELD)?
        .trim()
        .parse::<u32>()
        .map_err(|err| invalid(NODE_FIELD, err.to_string()))?;
    Ok(SuperPort::new(instance, link, port, node))
}

/// Convert a roxmltree error into a [`DocumentError`] pointing at the byte
/// offset of the reported row and column.
fn xml_error(source: &str, err: &roxmltree::Error) -> DocumentError {
    let pos = err.pos();
    let offset = source
        .split_inclusive('\n')
        .take(pos.row.saturating_sub(1) as usize)
        .map(str::len)
        .sum::<usize>();
    let line = &source[offset..];
    let column = line
        .char_indices()
        .nth(pos.col.saturating_sub(1) as usize)
        .map_or(line.len(), |(byte, _)| byte);
    let start = offset + column;

    DocumentError::Xml {
        message: err.to_string(),
        span: Some(Span::new(start..(start + 1).min(source.len()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(cells: &str) -> String {
        format!(
            r#"<mxfile><diagram name="Page-1"><mxGraphModel><root>
<mxCell id="0"/>
<mxCell id="1" parent="0"/>
{cells}
</root></mxGraphModel></diagram></mxfile>"#
        )
    }

    #[test]
    fn test_reads_objects_and_references() {
        let source = wrap(
            r#"<object id="doc-net" label="Circuit"><tag type="Network" subtype="Sub"/><mxCell parent="1" vertex="1"/></object>
<object id="doc-n1" label="1"><tag type="Node" subtype="Basic"/><mxCell parent="doc-net" vertex="1"/></object>
<object id="doc-r1" label="R1" c00.Resistance="10"><tag type="Link" subtype="Resistor" class="Resistor"/><mxCell parent="doc-net" vertex="1"/></object>
<object id="doc-p0" label="0"><tag type="Port"/><mxCell parent="doc-net" edge="1" source="doc-r1" target="doc-n1"/></object>"#,
        );
        let diagram = parse_document(&source).unwrap();

        let net = diagram.find(Id::new("doc-net")).unwrap();
        let node = diagram.find(Id::new("doc-n1")).unwrap();
        let link = diagram.find(Id::new("doc-r1")).unwrap();
        let port = diagram.find(Id::new("doc-p0")).unwrap();

        assert_eq!(*diagram[net].kind(), ElementKind::Network(NetworkKind::Sub));
        assert_eq!(diagram[node].parent(), Some(net));
        assert_eq!(diagram[node].node_kind(), Some(NodeKind::Basic));
        assert_eq!(diagram[link].field("c00.Resistance"), Some("10"));
        assert_eq!(diagram[link].label(), "R1");
        match diagram[link].kind() {
            ElementKind::Link(shape) => {
                assert_eq!(shape.subtype(), "Resistor");
                assert_eq!(shape.class(), Some(Id::new("Resistor")));
            }
            other => panic!("expected a link, got {other:?}"),
        }
        assert_eq!(diagram[port].source(), Some(link));
        assert_eq!(diagram[port].target(), Some(node));
        assert!(diagram[port].span().is_some());
    }

    #[test]
    fn test_bare_model_and_parentless_cells() {
        let source = r#"<mxGraphModel><root><mxCell id="doc-bare" value="note"/></root></mxGraphModel>"#;
        let diagram = parse_document(source).unwrap();
        let idx = diagram.find(Id::new("doc-bare")).unwrap();
        assert_eq!(diagram[idx].parent(), Some(diagram.root()));
        assert_eq!(*diagram[idx].kind(), ElementKind::Plain);
        assert_eq!(diagram[idx].label(), "note");
    }

    #[test]
    fn test_compressed_content_rejected() {
        let source = r#"<mxfile><diagram name="Page-1">7ZZNb9swDIZ/jY8FbDlpsmPTtdsGDCiQw85qRFtCZdGQmDrZrx9lyV9rDrsMWA+2BfF9HlOkROXrx/3hxZGy+glDZOqXTN7/Psrzr2UX4XVF3V3Q9btRk7q/Rg3Tgwb1w=</diagram></mxfile>"#;
        let err = parse_document(source).unwrap_err();
        assert!(matches!(err, DocumentError::CompressedContent { ref name, .. } if name == "Page-1"));
    }

    #[test]
    fn test_edge_without_endpoints() {
        let source = wrap(r#"<object id="doc-loose" label="0"><tag type="Port"/><mxCell parent="1" edge="1"/></object>"#);
        let err = parse_document(&source).unwrap_err();
        assert!(matches!(err, DocumentError::EdgeWithoutEndpoints { ref id, .. } if id == "doc-loose"));
    }

    #[test]
    fn test_missing_identity() {
        let source = wrap(r#"<mxCell value="anonymous" parent="1"/>"#);
        let err = parse_document(&source).unwrap_err();
        assert!(matches!(err, DocumentError::MissingIdentity { .. }));
    }

    #[test]
    fn test_duplicate_identity() {
        let source = wrap(r#"<mxCell id="doc-twice" parent="1"/><mxCell id="doc-twice" parent="1"/>"#);
        let err = parse_document(&source).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateIdentity { ref id, .. } if id == "doc-twice"));
    }

    #[test]
    fn test_unknown_reference() {
        let source = wrap(r#"<mxCell id="doc-orphan" parent="nowhere"/>"#);
        let err = parse_document(&source).unwrap_err();
        match err {
            DocumentError::UnknownReference {
                attribute,
                reference,
                ..
            } => {
                assert_eq!(attribute, "parent");
                assert_eq!(reference, "nowhere");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_subtype() {
        let source = wrap(r#"<object id="doc-cap" label="1"><tag type="Node" subtype="Capacitor"/><mxCell parent="1"/></object>"#);
        let err = parse_document(&source).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownSubtype { ref subtype, .. } if subtype == "Capacitor"));

        let source = wrap(r#"<object id="doc-odd"><tag type="Gizmo"/><mxCell parent="1"/></object>"#);
        let err = parse_document(&source).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownKind { .. }));
    }

    #[test]
    fn test_interface_record_and_super_port() {
        let source = wrap(
            r#"<object id="doc-if" label="A" nodeCount="3" connections="R1,0,inlet,0 1"><tag type="Network" subtype="Subnet-Interface"/><mxCell parent="1"/></object>
<object id="doc-sp" instance="Left" link="R1" port="0" node="4"><tag type="Network" subtype="Super-Port"/><mxCell parent="1"/></object>"#,
        );
        let diagram = parse_document(&source).unwrap();

        let interface = diagram.find(Id::new("doc-if")).unwrap();
        match diagram[interface].kind() {
            ElementKind::Interface(interface) => {
                let record = interface.record().unwrap();
                assert_eq!(record.node_count(), 3);
                assert_eq!(record.connections()[0].key(), "inlet");
            }
            other => panic!("expected an interface, got {other:?}"),
        }

        let port = diagram.find(Id::new("doc-sp")).unwrap();
        assert_eq!(
            *diagram[port].kind(),
            ElementKind::SuperPort(SuperPort::new("Left", "R1", 0, 4))
        );
    }

    #[test]
    fn test_invalid_record() {
        let source = wrap(
            r#"<object id="doc-badif" label="A" nodeCount="x"><tag type="Network" subtype="Subnet-Interface"/><mxCell parent="1"/></object>"#,
        );
        let err = parse_document(&source).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidRecord { ref field, .. } if field == NODE_COUNT_FIELD));
    }

    #[test]
    fn test_malformed_xml_has_span() {
        let source = "<mxGraphModel><root>\n<mxCell id=\"a\"></root>";
        let err = parse_document(source).unwrap_err();
        assert!(matches!(err, DocumentError::Xml { span: Some(_), .. }));
    }
}
