//! Recording sub-network interfaces.
//!
//! After port maps are resolved, each interface container of a sub-network
//! remembers how many numbered nodes the sub-network has and which link
//! ports are wired to its keyed nodes. A super-network reads these records to
//! stitch instances together without recompiling them.

use log::debug;

use netweave_core::{
    diagram::Diagram,
    element::{Connection, ElementKind, InterfaceRecord},
    network::InterfaceEntry,
};
use netweave_parser::record::{CONNECTIONS_FIELD, NODE_COUNT_FIELD, format_connections};

use crate::{port_map::PortMaps, topology::Topology};

/// Store an [`InterfaceRecord`] on every interface of `topology`.
///
/// The record is written both to the element kind and to the `nodeCount` and
/// `connections` fields, so it survives a save of the diagram.
pub fn record_interfaces(
    diagram: &mut Diagram,
    topology: &Topology,
    port_maps: &PortMaps,
) -> Vec<InterfaceEntry> {
    let mut entries = Vec::with_capacity(topology.interfaces.len());

    for &interface in &topology.interfaces {
        let connections: Vec<Connection> = port_maps
            .bindings
            .iter()
            .filter(|binding| binding.interface == interface)
            .filter_map(|binding| {
                let key = diagram[binding.node].key()?;
                Some(Connection::new(
                    diagram[binding.link].label(),
                    binding.port,
                    key,
                    port_maps.numbers(binding.link),
                ))
            })
            .collect();
        let record = InterfaceRecord::new(topology.node_count(), connections);

        let Some(element) = diagram.get_mut(interface) else {
            continue;
        };
        debug!(
            interface = element.label(),
            connections = record.connections().len();
            "Recording interface"
        );
        element
            .fields_mut()
            .insert(NODE_COUNT_FIELD.to_string(), record.node_count().to_string());
        element.fields_mut().insert(
            CONNECTIONS_FIELD.to_string(),
            format_connections(record.connections()),
        );
        if let ElementKind::Interface(payload) = element.kind_mut() {
            payload.set_record(record.clone());
        }

        entries.push(InterfaceEntry {
            name: element.label().to_string(),
            record,
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{port_map::PortMapBuilder, test_support::*, topology::TopologyExtractor};
    use netweave_core::element::NodeKind;
    use netweave_parser::record::parse_connections;

    #[test]
    fn test_record_interface_connections() {
        let mut fixture = Fixture::new("iface-rec");
        let a = fixture.node("4");
        let b = fixture.node("9");
        let interface = fixture.interface("East");
        let copy = fixture.interface_node(interface, NodeKind::Basic, "9", "outlet");
        fixture.interface_node(interface, NodeKind::Ground, "", "drain");
        let r1 = fixture.link("R1", "Resistor");
        fixture.port(r1, a, 0);
        fixture.port(r1, b, 1);
        let r2 = fixture.link("R2", "Resistor");
        fixture.port(r2, a, 0);
        fixture.port(r2, copy, 1);

        let library = library();
        let topology = TopologyExtractor::new(&library)
            .extract(&mut fixture.diagram, fixture.network)
            .unwrap();
        let maps = PortMapBuilder::new(&fixture.diagram, &topology, &library)
            .build()
            .unwrap();
        let entries = record_interfaces(&mut fixture.diagram, &topology, &maps);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "East");
        assert_eq!(entries[0].record.node_count(), 2);
        assert_eq!(
            entries[0].record.connections(),
            &[Connection::new("R2", 1, "outlet", vec![0, 1])]
        );

        let element = &fixture.diagram[interface];
        assert_eq!(element.field(NODE_COUNT_FIELD), Some("2"));
        let stored = parse_connections(element.field(CONNECTIONS_FIELD).unwrap()).unwrap();
        assert_eq!(stored, entries[0].record.connections());
        match element.kind() {
            ElementKind::Interface(payload) => {
                assert_eq!(payload.record(), Some(&entries[0].record));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
