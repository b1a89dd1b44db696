//! Sub-network compilation pipeline.
//!
//! Runs the stages in order on one scope of a diagram: containment check,
//! topology extraction, port maps, reconciliation and interface records,
//! then lowers the result into a serializable [`Network`].

use log::info;

use netweave_core::{
    diagram::{Diagram, ElementIndex},
    element::{Element, ElementKind, ShapeType},
    library::ShapeLibrary,
    network::{LinkRecord, Network, NodeRecord, SpotterRecord},
};

use crate::{
    config::CompileConfig,
    containment::ContainmentResolver,
    error::CompileError,
    interface::record_interfaces,
    port_map::PortMapBuilder,
    reconcile::{Reconciliation, reconcile},
    topology::{Topology, TopologyExtractor},
};

/// Maintenance performed on the diagram while compiling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub reconciliation: Reconciliation,
    pub pruned_grounds: usize,
}

/// A compiled sub-network.
#[derive(Debug, Clone)]
pub struct CompiledNetwork {
    pub network: Network,
    pub topology: Topology,
    pub report: CompileReport,
}

/// Compile the single network found in `scope`.
///
/// # Errors
///
/// Returns the first [`CompileError`] any stage reports.
pub fn compile_network(
    diagram: &mut Diagram,
    scope: ElementIndex,
    library: &dyn ShapeLibrary,
    config: &CompileConfig,
) -> Result<CompiledNetwork, CompileError> {
    ContainmentResolver::new(diagram).validate()?;

    let topology = TopologyExtractor::new(library)
        .with_prune_grounds(config.prune_grounds())
        .extract(diagram, scope)?;
    let port_maps = PortMapBuilder::new(diagram, &topology, library).build()?;

    let reconciliation = if config.reconcile() {
        let shapes: Vec<ElementIndex> = topology
            .links
            .iter()
            .chain(&topology.spotters)
            .copied()
            .collect();
        reconcile(diagram, &shapes, library)
    } else {
        Reconciliation::default()
    };

    let interfaces = record_interfaces(diagram, &topology, &port_maps);

    let network_element = &diagram[topology.network];
    let name = display_name(network_element);
    info!(
        network = name.as_str(),
        nodes = topology.node_count(),
        links = port_maps.links.len();
        "Network compiled"
    );

    let nodes = topology
        .nodes
        .iter()
        .zip(0u32..)
        .map(|(idx, number)| NodeRecord {
            number,
            fields: diagram[*idx].fields().clone(),
        })
        .collect();

    let links = port_maps
        .links
        .iter()
        .filter_map(|resolved| {
            let element = &diagram[resolved.link];
            let ElementKind::Link(shape) = element.kind() else {
                return None;
            };
            let (subtype, class, variant) = shape_names(shape);
            Some(LinkRecord {
                name: element.label().to_string(),
                subtype,
                class,
                variant,
                port_map: resolved.port_map.clone(),
                fields: element.fields().clone(),
            })
        })
        .collect();

    let spotters = topology
        .spotters
        .iter()
        .filter_map(|idx| {
            let element = &diagram[*idx];
            let ElementKind::Spotter(shape) = element.kind() else {
                return None;
            };
            let (subtype, class, _) = shape_names(shape);
            Some(SpotterRecord {
                name: element.label().to_string(),
                subtype,
                class,
                fields: element.fields().clone(),
            })
        })
        .collect();

    let network = Network {
        name,
        domain: topology.domain,
        nodes,
        links,
        spotters,
        socket_lists: port_maps.socket_lists,
        interfaces,
    };
    let report = CompileReport {
        reconciliation,
        pruned_grounds: topology.pruned_grounds,
    };

    Ok(CompiledNetwork {
        network,
        topology,
        report,
    })
}

/// The label of an element, or its identity when unlabelled.
pub(crate) fn display_name(element: &Element) -> String {
    if element.label().is_empty() {
        element.id().to_string()
    } else {
        element.label().to_string()
    }
}

fn shape_names(shape: &ShapeType) -> (String, Option<String>, Option<String>) {
    (
        shape.subtype().to_string(),
        shape.class().map(|class| class.to_string()),
        shape.variant().map(|variant| variant.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use netweave_core::{element::NodeKind, network::PortTarget};

    fn divider(prefix: &str) -> Fixture {
        let mut fixture = Fixture::new(prefix);
        let top = fixture.node("1");
        let mid = fixture.node("2");
        let ground = fixture.node_of(NodeKind::Ground, "");
        fixture.node_of(NodeKind::Ground, "");
        let r1 = fixture.link("R1", "Resistor");
        fixture.port(r1, top, 0);
        fixture.port(r1, mid, 1);
        let r2 = fixture.link("R2", "Resistor");
        fixture.port(r2, mid, 0);
        fixture.port(r2, ground, 1);
        fixture.spotter("G1", "Gauge");
        fixture
    }

    #[test]
    fn test_compile_divider() {
        let mut fixture = divider("compile-divider");
        let library = library();
        let compiled = compile_network(
            &mut fixture.diagram,
            fixture.network,
            &library,
            &CompileConfig::default(),
        )
        .unwrap();

        let network = &compiled.network;
        assert_eq!(network.name, "compile-divider");
        assert_eq!(network.node_count(), 2);
        assert_eq!(
            network.link("R2").unwrap().port_map,
            vec![PortTarget::Node(1), PortTarget::Ground]
        );
        assert_eq!(network.link("R1").unwrap().class.as_deref(), None);
        assert_eq!(
            network.link("R1").unwrap().fields.get("c00.Resistance").map(String::as_str),
            Some("1.0")
        );
        assert_eq!(network.spotters.len(), 1);
        assert_eq!(compiled.report.pruned_grounds, 1);
        assert_eq!(compiled.report.reconciliation.reports.len(), 3);
    }

    #[test]
    fn test_compile_without_maintenance() {
        let mut fixture = divider("compile-plain");
        let library = library();
        let compiled = compile_network(
            &mut fixture.diagram,
            fixture.network,
            &library,
            &CompileConfig::new(false, false),
        )
        .unwrap();

        assert_eq!(compiled.report, CompileReport::default());
        assert!(compiled.network.link("R1").unwrap().fields.is_empty());
    }

    #[test]
    fn test_compile_reports_cycles_first() {
        let mut fixture = divider("compile-cycle");
        let group = fixture.add(Element::new(
            netweave_core::identifier::Id::new("compile-cycle-group"),
            ElementKind::Plain,
        ));
        fixture
            .diagram
            .get_mut(group)
            .unwrap()
            .set_parent(Some(group));

        let library = library();
        let err = compile_network(
            &mut fixture.diagram,
            fixture.network,
            &library,
            &CompileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::CyclicContainment { .. }));
    }
}
