//! Diagram builders shared by unit tests.

use netweave_core::{
    diagram::{Diagram, ElementIndex},
    element::{
        Domain, Element, ElementKind, Interface, KEY_FIELD, NetworkKind, NodeKind, ShapeType,
    },
    identifier::Id,
    library::{MasterCatalog, MasterKind, MasterRecord},
};

/// Shape library used across unit tests.
pub fn library() -> MasterCatalog {
    MasterCatalog::from_records(vec![
        MasterRecord::new(MasterKind::Link, "Resistor")
            .with_class("Resistor", None)
            .with_domain(Domain::Basic)
            .with_ports(2, [0, 1])
            .with_field("c00.Resistance", "1.0")
            .with_field("i00.Current", "0"),
        MasterRecord::new(MasterKind::Link, "Source")
            .with_domain(Domain::Basic)
            .with_ports(1, [0])
            .with_variable_ports(),
        MasterRecord::new(MasterKind::Link, "Jumper")
            .with_domain(Domain::Basic)
            .with_ports(2, [0])
            .with_plug_ports([1]),
        MasterRecord::new(MasterKind::Link, "Pipe")
            .with_domain(Domain::Fluid)
            .with_ports(2, []),
        MasterRecord::new(MasterKind::Spotter, "Gauge").with_field("c00.Scale", "1"),
    ])
    .expect("test library is valid")
}

/// Builds a diagram holding one Network/Sub container.
pub struct Fixture {
    pub diagram: Diagram,
    pub network: ElementIndex,
    prefix: String,
    counter: usize,
}

impl Fixture {
    pub fn new(prefix: &str) -> Self {
        let mut diagram = Diagram::new();
        let network = diagram
            .insert(
                Element::new(
                    Id::new(&format!("{prefix}-net")),
                    ElementKind::Network(NetworkKind::Sub),
                )
                .with_label(prefix),
            )
            .expect("fresh identity");
        Self {
            diagram,
            network,
            prefix: prefix.to_string(),
            counter: 0,
        }
    }

    fn next_id(&mut self) -> Id {
        self.counter += 1;
        Id::new(&format!("{}-{}", self.prefix, self.counter))
    }

    pub fn add(&mut self, element: Element) -> ElementIndex {
        self.diagram.insert(element).expect("fresh identity")
    }

    pub fn node(&mut self, label: &str) -> ElementIndex {
        self.node_of(NodeKind::Basic, label)
    }

    pub fn node_of(&mut self, kind: NodeKind, label: &str) -> ElementIndex {
        let id = self.next_id();
        let network = self.network;
        self.add(
            Element::new(id, ElementKind::Node(kind))
                .with_label(label)
                .with_parent(network),
        )
    }

    pub fn link(&mut self, label: &str, subtype: &str) -> ElementIndex {
        let id = self.next_id();
        let network = self.network;
        self.add(
            Element::new(id, ElementKind::Link(ShapeType::new(Id::new(subtype))))
                .with_label(label)
                .with_parent(network),
        )
    }

    pub fn spotter(&mut self, label: &str, subtype: &str) -> ElementIndex {
        let id = self.next_id();
        let network = self.network;
        self.add(
            Element::new(id, ElementKind::Spotter(ShapeType::new(Id::new(subtype))))
                .with_label(label)
                .with_parent(network),
        )
    }

    pub fn port(&mut self, link: ElementIndex, node: ElementIndex, number: usize) -> ElementIndex {
        let id = self.next_id();
        let network = self.network;
        self.add(
            Element::new(id, ElementKind::Port)
                .with_label(number.to_string())
                .with_parent(network)
                .with_endpoints(Some(link), Some(node)),
        )
    }

    pub fn interface(&mut self, label: &str) -> ElementIndex {
        let id = self.next_id();
        let network = self.network;
        self.add(
            Element::new(id, ElementKind::Interface(Interface::new(None)))
                .with_label(label)
                .with_parent(network),
        )
    }

    /// Add a keyed copy node to an interface.
    pub fn interface_node(
        &mut self,
        interface: ElementIndex,
        kind: NodeKind,
        label: &str,
        key: &str,
    ) -> ElementIndex {
        let id = self.next_id();
        self.add(
            Element::new(id, ElementKind::Node(kind))
                .with_label(label)
                .with_parent(interface)
                .with_field(KEY_FIELD, key),
        )
    }

    /// Add another, empty, network container at the document root.
    pub fn second_network(&mut self, id: &str) -> ElementIndex {
        self.add(Element::new(Id::new(id), ElementKind::Network(NetworkKind::Sub)))
    }
}
