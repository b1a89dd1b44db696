//! Per-link port maps.
//!
//! A link's port map lists, for every port slot, the node that slot is wired
//! to. Slots nobody drew a port for default to Ground. Jumper links (masters
//! with plug ports) have their plug slots re-pointed at synthesized socket
//! lists and are initialized after every other link.

use std::collections::BTreeSet;

use log::{debug, trace};

use netweave_core::{
    diagram::{Diagram, ElementIndex},
    element::NodeKind,
    library::{MasterRecord, ShapeLibrary},
    network::{PortTarget, SocketList},
};

use crate::{error::CompileError, topology::Topology};

/// Which part of the network a port binding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Main,
    Interface(ElementIndex),
}

/// A link with its resolved port map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub link: ElementIndex,
    pub port_map: Vec<PortTarget>,
}

/// A port drawn to a keyed interface copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceBinding {
    pub link: ElementIndex,
    pub port: usize,
    pub node: ElementIndex,
    pub interface: ElementIndex,
}

/// Port maps of every link of a network.
#[derive(Debug, Clone, Default)]
pub struct PortMaps {
    /// Links in initialization order.
    pub links: Vec<ResolvedLink>,
    pub socket_lists: Vec<SocketList>,
    pub bindings: Vec<InterfaceBinding>,
}

impl PortMaps {
    pub fn get(&self, link: ElementIndex) -> Option<&ResolvedLink> {
        self.links.iter().find(|resolved| resolved.link == link)
    }

    /// Port map of `link` as node numbers. Socket-list slots report the node
    /// their plug was drawn to.
    pub fn numbers(&self, link: ElementIndex) -> Vec<i64> {
        let Some(resolved) = self.get(link) else {
            return Vec::new();
        };
        resolved
            .port_map
            .iter()
            .map(|target| match target {
                PortTarget::SocketList(name) => self
                    .socket_lists
                    .iter()
                    .find(|socket| &socket.name == name)
                    .and_then(|socket| socket.node.number())
                    .unwrap_or(PortTarget::GROUND_NUMBER),
                other => other.number().unwrap_or(PortTarget::GROUND_NUMBER),
            })
            .collect()
    }
}

/// Resolves port maps for the links of an extracted topology.
pub struct PortMapBuilder<'a> {
    diagram: &'a Diagram,
    topology: &'a Topology,
    library: &'a dyn ShapeLibrary,
}

impl<'a> PortMapBuilder<'a> {
    pub fn new(diagram: &'a Diagram, topology: &'a Topology, library: &'a dyn ShapeLibrary) -> Self {
        Self {
            diagram,
            topology,
            library,
        }
    }

    /// Resolve every link.
    ///
    /// # Errors
    ///
    /// Fails on the first link with a missing required port, a duplicate or
    /// dangling port, or a port number outside the map.
    pub fn build(&self) -> Result<PortMaps, CompileError> {
        let mut maps = PortMaps::default();
        let mut jumpers = Vec::new();

        for &link in &self.topology.links {
            let element = &self.diagram[link];
            let master = self.library.master_for_element(element).ok_or_else(|| {
                CompileError::topology(
                    Some(element.element_ref()),
                    format!("link {} has no shape-library master", element.element_ref()),
                )
            })?;

            let mut resolved = self.resolve_link(link, master, &mut maps.bindings)?;
            if master.plug_ports().is_empty() {
                maps.links.push(resolved);
            } else {
                self.plug_sockets(&mut resolved, master, &mut maps.socket_lists);
                jumpers.push(resolved);
            }
        }
        maps.links.extend(jumpers);

        debug!(
            links = maps.links.len(),
            socket_lists = maps.socket_lists.len(),
            bindings = maps.bindings.len();
            "Port maps resolved"
        );
        Ok(maps)
    }

    fn resolve_link(
        &self,
        link: ElementIndex,
        master: &MasterRecord,
        bindings: &mut Vec<InterfaceBinding>,
    ) -> Result<ResolvedLink, CompileError> {
        let link_ref = self.diagram[link].element_ref();

        let mut drawn = Vec::new();
        for &port in &self.topology.ports {
            let edge = &self.diagram[port];
            if !edge.touches(link) {
                continue;
            }
            let number = edge
                .label_number()
                .and_then(|number| usize::try_from(number).ok())
                .ok_or_else(|| {
                    CompileError::topology(
                        Some(edge.element_ref()),
                        format!("port label `{}` is not a port number", edge.label()),
                    )
                })?;
            let end = edge
                .other_end(link)
                .filter(|end| *end != link && self.is_network_node(*end))
                .ok_or_else(|| CompileError::DanglingPort {
                    link: link_ref.clone(),
                    port: edge.element_ref(),
                })?;
            drawn.push((number, port, end));
        }

        let found: BTreeSet<usize> = drawn.iter().map(|(number, ..)| *number).collect();
        if let Some(missing) = master
            .required_ports()
            .iter()
            .find(|required| !found.contains(required))
        {
            return Err(CompileError::MissingRequiredPort {
                link: link_ref,
                port: *missing,
            });
        }

        let size = master.ports().max(found.len());
        let mut port_map = vec![PortTarget::Ground; size];
        let mut bound: Vec<Option<Scope>> = vec![None; size];

        for (number, port, end) in drawn {
            if number >= size {
                return Err(CompileError::topology(
                    Some(self.diagram[port].element_ref()),
                    format!("port {number} is outside the {size} ports of link {link_ref}"),
                ));
            }

            let interface = self.topology.interface_of(end);
            let scope = interface.map_or(Scope::Main, Scope::Interface);
            match interface {
                Some(interface) if self.diagram[end].key().is_some() => {
                    bindings.push(InterfaceBinding {
                        link,
                        port: number,
                        node: end,
                        interface,
                    });
                }
                _ => {}
            }

            let target = self.node_target(end)?;
            match bound[number] {
                None => {
                    port_map[number] = target;
                    bound[number] = Some(scope);
                }
                Some(existing) if existing == scope => {
                    return Err(CompileError::DuplicatePort {
                        link: link_ref,
                        port: self.diagram[port].element_ref(),
                        number,
                    });
                }
                Some(Scope::Interface(_)) if scope == Scope::Main => {
                    port_map[number] = target;
                    bound[number] = Some(scope);
                }
                Some(_) => {
                    trace!(link = link_ref.label(), port = number; "Keeping earlier binding");
                }
            }
        }

        Ok(ResolvedLink { link, port_map })
    }

    /// Whether `node` is a node, reference, ground or interface copy of the
    /// extracted network.
    fn is_network_node(&self, node: ElementIndex) -> bool {
        let topology = self.topology;
        topology.nodes.contains(&node)
            || topology.references.contains(&node)
            || topology.grounds.contains(&node)
            || topology.interface_of(node).is_some()
    }

    /// What a port ending at `node` binds its slot to.
    fn node_target(&self, node: ElementIndex) -> Result<PortTarget, CompileError> {
        let element = &self.diagram[node];
        if element.node_kind() == Some(NodeKind::Ground) {
            return Ok(PortTarget::Ground);
        }
        element
            .label_number()
            .and_then(|number| u32::try_from(number).ok())
            .map(PortTarget::Node)
            .ok_or_else(|| {
                CompileError::topology(
                    Some(element.element_ref()),
                    format!("node label `{}` is not a node number", element.label()),
                )
            })
    }

    /// Point every plug slot of a jumper link at its own socket list.
    fn plug_sockets(
        &self,
        resolved: &mut ResolvedLink,
        master: &MasterRecord,
        socket_lists: &mut Vec<SocketList>,
    ) {
        let label = self.diagram[resolved.link].label().to_string();
        for &port in master.plug_ports() {
            let Some(slot) = resolved.port_map.get_mut(port) else {
                continue;
            };
            let name = format!("{label}_plug{port}");
            let node = std::mem::replace(slot, PortTarget::SocketList(name.clone()));
            socket_lists.push(SocketList {
                name,
                link: label.clone(),
                port,
                node,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_support::*, topology::TopologyExtractor};
    use netweave_core::{
        element::{Element, ElementKind},
        identifier::Id,
    };

    fn resolve(fixture: &mut Fixture) -> Result<PortMaps, CompileError> {
        let library = library();
        let topology = TopologyExtractor::new(&library).extract(&mut fixture.diagram, fixture.network)?;
        PortMapBuilder::new(&fixture.diagram, &topology, &library).build()
    }

    #[test]
    fn test_port_order_does_not_matter() {
        let mut fixture = Fixture::new("pm-order");
        let a = fixture.node("0");
        let b = fixture.node("1");
        let r1 = fixture.link("R1", "Resistor");
        fixture.port(r1, b, 1);
        fixture.port(r1, a, 0);

        let maps = resolve(&mut fixture).unwrap();
        assert_eq!(
            maps.get(r1).unwrap().port_map,
            vec![PortTarget::Node(0), PortTarget::Node(1)]
        );
    }

    #[test]
    fn test_missing_required_port() {
        let mut fixture = Fixture::new("pm-missing");
        let a = fixture.node("0");
        let r1 = fixture.link("R1", "Resistor");
        fixture.port(r1, a, 0);

        let err = resolve(&mut fixture).unwrap_err();
        assert!(matches!(err, CompileError::MissingRequiredPort { port: 1, .. }));
    }

    #[test]
    fn test_variable_arity_sizes_to_found_ports() {
        let mut fixture = Fixture::new("pm-variable");
        let a = fixture.node("0");
        let b = fixture.node("1");
        let ground = fixture.node_of(NodeKind::Ground, "");
        let s1 = fixture.link("S1", "Source");
        fixture.port(s1, a, 0);
        fixture.port(s1, b, 1);
        fixture.port(s1, ground, 2);

        let maps = resolve(&mut fixture).unwrap();
        assert_eq!(
            maps.get(s1).unwrap().port_map,
            vec![PortTarget::Node(0), PortTarget::Node(1), PortTarget::Ground]
        );
        assert_eq!(maps.numbers(s1), vec![0, 1, -1]);
    }

    #[test]
    fn test_port_outside_map() {
        let mut fixture = Fixture::new("pm-outside");
        let a = fixture.node("0");
        let b = fixture.node("1");
        let r1 = fixture.link("R1", "Resistor");
        fixture.port(r1, a, 0);
        fixture.port(r1, b, 1);
        fixture.port(r1, b, 5);

        let err = resolve(&mut fixture).unwrap_err();
        assert_eq!(
            err.to_string(),
            "port 5 is outside the 3 ports of link `R1` (pm-outside-3)"
        );
    }

    #[test]
    fn test_duplicate_port_in_same_scope() {
        let mut fixture = Fixture::new("pm-dup");
        let a = fixture.node("0");
        let b = fixture.node("1");
        let r1 = fixture.link("R1", "Resistor");
        fixture.port(r1, a, 0);
        fixture.port(r1, b, 1);
        fixture.port(r1, a, 1);

        let err = resolve(&mut fixture).unwrap_err();
        assert!(matches!(err, CompileError::DuplicatePort { number: 1, .. }));
    }

    #[test]
    fn test_main_scope_wins_over_interface_copy() {
        let mut fixture = Fixture::new("pm-scope");
        let a = fixture.node("0");
        let b = fixture.node("1");
        let interface = fixture.interface("East");
        let copy = fixture.interface_node(interface, NodeKind::Basic, "0", "east");
        let r1 = fixture.link("R1", "Resistor");
        fixture.port(r1, copy, 1);
        fixture.port(r1, a, 0);
        fixture.port(r1, b, 1);

        let maps = resolve(&mut fixture).unwrap();
        assert_eq!(
            maps.get(r1).unwrap().port_map,
            vec![PortTarget::Node(0), PortTarget::Node(1)]
        );
        assert_eq!(
            maps.bindings,
            vec![InterfaceBinding {
                link: r1,
                port: 1,
                node: copy,
                interface,
            }]
        );
    }

    #[test]
    fn test_dangling_port() {
        let mut fixture = Fixture::new("pm-dangling");
        let a = fixture.node("0");
        let b = fixture.node("1");
        let r1 = fixture.link("R1", "Resistor");
        let r2 = fixture.link("R2", "Resistor");
        fixture.port(r1, a, 0);
        fixture.port(r1, r2, 1);
        fixture.port(r2, a, 0);
        fixture.port(r2, b, 1);

        let err = resolve(&mut fixture).unwrap_err();
        assert!(matches!(err, CompileError::DanglingPort { .. }));
    }

    #[test]
    fn test_port_to_node_of_another_network_is_dangling() {
        let mut fixture = Fixture::new("pm-foreign");
        let a = fixture.node("0");
        let other = fixture.second_network("pm-foreign-other");
        let foreign = fixture.add(
            Element::new(Id::new("pm-foreign-node"), ElementKind::Node(NodeKind::Basic))
                .with_label("7")
                .with_parent(other),
        );
        let r1 = fixture.link("R1", "Resistor");
        fixture.port(r1, a, 0);
        let stray = fixture.port(r1, foreign, 1);

        let err = resolve(&mut fixture).unwrap_err();
        match err {
            CompileError::DanglingPort { port, .. } => {
                assert_eq!(port, fixture.diagram[stray].element_ref());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_jumper_plugs_socket_list_and_moves_last() {
        let mut fixture = Fixture::new("pm-jumper");
        let a = fixture.node("0");
        let b = fixture.node("1");
        let j1 = fixture.link("J1", "Jumper");
        let r1 = fixture.link("R1", "Resistor");
        fixture.port(j1, a, 0);
        fixture.port(j1, b, 1);
        fixture.port(r1, a, 0);
        fixture.port(r1, b, 1);

        let maps = resolve(&mut fixture).unwrap();
        let order: Vec<ElementIndex> = maps.links.iter().map(|resolved| resolved.link).collect();
        assert_eq!(order, vec![r1, j1]);
        assert_eq!(
            maps.get(j1).unwrap().port_map,
            vec![
                PortTarget::Node(0),
                PortTarget::SocketList("J1_plug1".to_string())
            ]
        );
        assert_eq!(
            maps.socket_lists,
            vec![SocketList {
                name: "J1_plug1".to_string(),
                link: "J1".to_string(),
                port: 1,
                node: PortTarget::Node(1),
            }]
        );
        assert_eq!(maps.numbers(j1), vec![0, 1]);
    }
}
