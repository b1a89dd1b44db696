//! Cross-instance port stitching.
//!
//! A connector joins two interfaces of different sub-network instances. Every
//! link port recorded on one interface is bound to the node with the same key
//! on the other interface, which becomes a super-port of the assembled
//! network. For every key at most one of the two interfaces may hold a
//! non-Ground node; the other side's copy is Ground and carries the recorded
//! connections.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexSet;
use log::{debug, warn};

use netweave_core::{
    diagram::{Diagram, ElementIndex},
    element::{Element, ElementKind, InterfaceRecord, NetworkKind, NodeKind, SuperPort},
};
use netweave_parser::record::{INSTANCE_FIELD, LINK_FIELD, NODE_FIELD, PORT_FIELD};

use super::{duplicates::canonical_interface, identity::IdGenerator};
use crate::{containment::ContainmentResolver, error::CompileError};

/// Placement of one instance in the super-network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePlacement {
    pub name: String,
    pub offset: usize,
    pub node_count: usize,
}

/// Outcome of stitching.
#[derive(Debug, Clone, Default)]
pub struct Stitching {
    pub super_ports: Vec<SuperPort>,
    /// Old super-ports whose connector no longer joins two interfaces.
    pub orphaned: usize,
    /// Old super-ports discarded before regeneration, orphans included.
    pub discarded: usize,
}

/// One end of a connector.
struct Side {
    interface: ElementIndex,
    instance: ElementIndex,
    nodes: Vec<ElementIndex>,
}

/// Discard previous super-ports and generate new ones for every connector
/// inside `super_network`.
///
/// # Errors
///
/// Fails when joined interfaces disagree on node count or keys, when a key
/// has a non-Ground node on both sides (or twice on one side), or when an
/// interface lies outside every instance.
pub fn stitch(
    diagram: &mut Diagram,
    super_network: ElementIndex,
    placements: &HashMap<ElementIndex, InstancePlacement>,
    generator: &mut IdGenerator,
) -> Result<Stitching, CompileError> {
    let connectors: Vec<ElementIndex> = ContainmentResolver::new(diagram)
        .descendants(super_network)
        .into_iter()
        .filter(|idx| matches!(diagram[*idx].kind(), ElementKind::Connector))
        .collect();

    let mut stitching = Stitching::default();
    let old = diagram.select(|element| matches!(element.kind(), ElementKind::SuperPort(_)));
    for port in old {
        let connected = diagram[port]
            .parent()
            .is_some_and(|parent| joins_interfaces(diagram, parent));
        if !connected {
            stitching.orphaned += 1;
        }
        stitching.discarded += 1;
        diagram.remove(port);
    }
    if stitching.orphaned > 0 {
        warn!(count = stitching.orphaned; "Discarded orphaned super-ports");
    }

    let mut ports = IndexSet::new();
    for connector in connectors {
        if !joins_interfaces(diagram, connector) {
            warn!(
                connector:% = diagram[connector].element_ref();
                "Connector does not join two interfaces, skipping"
            );
            continue;
        }
        let (Some(source), Some(target)) = (diagram[connector].source(), diagram[connector].target())
        else {
            continue;
        };

        let a = side(diagram, source)?;
        let b = side(diagram, target)?;
        check_compatible(diagram, connector, &a, &b, placements)?;

        let mut generated = Vec::new();
        for (from, to) in [(&a, &b), (&b, &a)] {
            let Some(record) = interface_record(diagram, from.interface) else {
                continue;
            };
            let instance = placements
                .get(&from.instance)
                .map(|placement| placement.name.clone())
                .unwrap_or_default();
            let bindings = key_bindings(diagram, to);

            for connection in record.connections() {
                let Some(node) = bindings.get(connection.key()) else {
                    continue;
                };
                let Some(number) = diagram[*node]
                    .label_number()
                    .and_then(|number| u32::try_from(number).ok())
                else {
                    continue;
                };
                generated.push(SuperPort::new(
                    instance.as_str(),
                    connection.link(),
                    connection.port(),
                    number,
                ));
            }
        }

        for super_port in generated {
            if ports.insert(super_port.clone()) {
                insert_super_port(diagram, connector, super_port, generator)?;
            }
        }
    }

    stitching.super_ports = ports.into_iter().collect();
    debug!(
        super_ports = stitching.super_ports.len(),
        discarded = stitching.discarded;
        "Super-ports stitched"
    );
    Ok(stitching)
}

fn joins_interfaces(diagram: &Diagram, connector: ElementIndex) -> bool {
    let Some(element) = diagram.get(connector) else {
        return false;
    };
    let is_interface = |end: Option<ElementIndex>| {
        end.and_then(|end| diagram.get(end))
            .is_some_and(|end| matches!(end.kind(), ElementKind::Interface(_)))
    };
    matches!(element.kind(), ElementKind::Connector)
        && is_interface(element.source())
        && is_interface(element.target())
}

/// The connector end at `interface`, read through its canonical copy when it
/// is a marked duplicate.
fn side(diagram: &Diagram, interface: ElementIndex) -> Result<Side, CompileError> {
    let interface = canonical_interface(diagram, interface);
    let instance = ContainmentResolver::new(diagram)
        .nearest_ancestor(interface, |element, _| {
            matches!(element.kind(), ElementKind::Network(NetworkKind::Sub))
        })?
        .ok_or_else(|| {
            CompileError::topology(
                Some(diagram[interface].element_ref()),
                format!(
                    "interface {} is not inside a sub-network instance",
                    diagram[interface].element_ref()
                ),
            )
        })?;
    let nodes = diagram
        .children(interface)
        .filter(|child| diagram[*child].node_kind().is_some())
        .collect();
    Ok(Side {
        interface,
        instance,
        nodes,
    })
}

fn interface_record(diagram: &Diagram, interface: ElementIndex) -> Option<&InterfaceRecord> {
    match diagram[interface].kind() {
        ElementKind::Interface(payload) => payload.record(),
        _ => None,
    }
}

fn check_compatible(
    diagram: &Diagram,
    connector: ElementIndex,
    a: &Side,
    b: &Side,
    placements: &HashMap<ElementIndex, InstancePlacement>,
) -> Result<(), CompileError> {
    let name = |side: &Side| diagram[side.interface].element_ref();

    if a.nodes.len() != b.nodes.len() {
        return Err(CompileError::InterfaceNodeCountMismatch {
            interface: name(b),
            detail: format!(
                "has {} nodes but {} has {}",
                b.nodes.len(),
                name(a),
                a.nodes.len()
            ),
        });
    }

    let keys = |side: &Side| -> BTreeSet<String> {
        side.nodes
            .iter()
            .filter_map(|node| diagram[*node].key())
            .map(str::to_string)
            .collect()
    };
    let (keys_a, keys_b) = (keys(a), keys(b));
    if keys_a != keys_b {
        let list = |keys: &BTreeSet<String>| keys.iter().cloned().collect::<Vec<_>>().join(", ");
        return Err(CompileError::InterfaceKeyMismatch {
            connector: diagram[connector].element_ref(),
            detail: format!(
                "{} has [{}], {} has [{}]",
                name(a),
                list(&keys_a),
                name(b),
                list(&keys_b)
            ),
        });
    }

    let mut bound: HashMap<&str, usize> = HashMap::new();
    for side in [a, b] {
        for &node in &side.nodes {
            let element = &diagram[node];
            if element.node_kind() == Some(NodeKind::Ground) {
                continue;
            }
            let Some(key) = element.key() else {
                continue;
            };
            let count = bound.entry(key).or_default();
            *count += 1;
            if *count > 1 {
                return Err(CompileError::AmbiguousInterfaceBinding {
                    interface: name(side),
                    key: key.to_string(),
                });
            }
        }
    }

    for side in [a, b] {
        let (Some(record), Some(placement)) = (
            interface_record(diagram, side.interface),
            placements.get(&side.instance),
        ) else {
            continue;
        };
        if record.node_count() != placement.node_count {
            return Err(CompileError::InterfaceNodeCountMismatch {
                interface: name(side),
                detail: format!(
                    "recorded node count {} differs from the {} nodes of instance `{}`",
                    record.node_count(),
                    placement.node_count,
                    placement.name
                ),
            });
        }
    }
    Ok(())
}

/// Keyed non-Ground nodes of one side.
///
/// Keys are unique here once [`check_compatible`] has passed.
fn key_bindings<'d>(diagram: &'d Diagram, side: &Side) -> HashMap<&'d str, ElementIndex> {
    side.nodes
        .iter()
        .filter(|node| diagram[**node].node_kind() != Some(NodeKind::Ground))
        .filter_map(|&node| diagram[node].key().map(|key| (key, node)))
        .collect()
}

fn insert_super_port(
    diagram: &mut Diagram,
    connector: ElementIndex,
    super_port: SuperPort,
    generator: &mut IdGenerator,
) -> Result<ElementIndex, CompileError> {
    let element = Element::new(generator.fresh(), ElementKind::SuperPort(super_port.clone()))
        .with_label(format!(
            "{}.{}:{}",
            super_port.instance(),
            super_port.link(),
            super_port.port()
        ))
        .with_parent(connector)
        .with_field(INSTANCE_FIELD, super_port.instance())
        .with_field(LINK_FIELD, super_port.link())
        .with_field(PORT_FIELD, super_port.port().to_string())
        .with_field(NODE_FIELD, super_port.node().to_string());
    diagram.insert(element).map_err(|err| {
        CompileError::topology(Some(diagram[connector].element_ref()), err.to_string())
    })
}
