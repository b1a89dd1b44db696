//! Topology extraction.
//!
//! Finds the network container of a scope, buckets its contents by role,
//! validates the structural rules a network must satisfy, and renumbers the
//! numbered nodes to a contiguous `0..N-1` range.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use netweave_core::{
    diagram::{Diagram, ElementIndex},
    element::{Domain, Element, ElementKind, NetworkKind, NodeKind},
    library::ShapeLibrary,
};

use crate::{containment::ContainmentResolver, error::CompileError};

/// The elements of one network, bucketed by role.
#[derive(Debug, Clone)]
pub struct Topology {
    /// The Network/Sub container.
    pub network: ElementIndex,
    pub domain: Domain,
    /// Numbered nodes, ordered by their new number.
    pub nodes: Vec<ElementIndex>,
    pub references: Vec<ElementIndex>,
    /// Ground nodes of the main network that survived pruning.
    pub grounds: Vec<ElementIndex>,
    pub links: Vec<ElementIndex>,
    pub ports: Vec<ElementIndex>,
    pub spotters: Vec<ElementIndex>,
    pub interfaces: Vec<ElementIndex>,
    /// Nodes inside interface containers, with the interface owning each.
    pub interface_nodes: Vec<(ElementIndex, ElementIndex)>,
    /// Number of unconnected Ground nodes removed.
    pub pruned_grounds: usize,
}

impl Topology {
    /// Number of numbered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The interface containing `node`, if `node` is an interface copy.
    pub fn interface_of(&self, node: ElementIndex) -> Option<ElementIndex> {
        self.interface_nodes
            .iter()
            .find(|(copy, _)| *copy == node)
            .map(|(_, interface)| *interface)
    }
}

/// Extracts and validates the network found in a scope.
pub struct TopologyExtractor<'a> {
    library: &'a dyn ShapeLibrary,
    prune_grounds: bool,
}

impl<'a> TopologyExtractor<'a> {
    pub fn new(library: &'a dyn ShapeLibrary) -> Self {
        Self {
            library,
            prune_grounds: true,
        }
    }

    /// Whether unconnected Ground nodes are removed from the diagram.
    pub fn with_prune_grounds(mut self, prune_grounds: bool) -> Self {
        self.prune_grounds = prune_grounds;
        self
    }

    /// Extract the network contained in `scope`.
    ///
    /// On success the numbered nodes, references and interface copies carry
    /// their new numbers as labels.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Topology`] for any structural violation and
    /// [`CompileError::CyclicContainment`] for a looping parent chain.
    pub fn extract(
        &self,
        diagram: &mut Diagram,
        scope: ElementIndex,
    ) -> Result<Topology, CompileError> {
        let mut topology = self.collect(diagram, scope)?;
        let network_ref = diagram[topology.network].element_ref();
        info!(network = network_ref.label(); "Extracting topology");

        if topology.nodes.is_empty() {
            return Err(CompileError::topology(
                Some(network_ref),
                "network has no numbered nodes",
            ));
        }
        if topology.links.is_empty() {
            return Err(CompileError::topology(Some(network_ref), "network has no links"));
        }
        if topology.ports.is_empty() {
            return Err(CompileError::topology(Some(network_ref), "network has no ports"));
        }

        topology.domain = self.check_domains(diagram, &topology)?;
        self.renumber(diagram, &mut topology)?;
        if self.prune_grounds {
            topology.pruned_grounds = prune_grounds(diagram, &mut topology);
        }

        debug!(
            nodes = topology.nodes.len(),
            links = topology.links.len(),
            ports = topology.ports.len(),
            interfaces = topology.interfaces.len(),
            pruned_grounds = topology.pruned_grounds;
            "Topology extracted"
        );
        Ok(topology)
    }

    /// Locate the network container and bucket its contents.
    fn collect(&self, diagram: &Diagram, scope: ElementIndex) -> Result<Topology, CompileError> {
        let resolver = ContainmentResolver::new(diagram);
        let is_sub = |element: &Element| {
            matches!(element.kind(), ElementKind::Network(NetworkKind::Sub))
        };

        let mut containers: Vec<ElementIndex> = diagram
            .get(scope)
            .filter(|element| is_sub(*element))
            .map(|_| scope)
            .into_iter()
            .collect();
        containers.extend(
            resolver
                .descendants(scope)
                .into_iter()
                .filter(|idx| is_sub(&diagram[*idx])),
        );

        let network = match containers.as_slice() {
            [network] => *network,
            [] => {
                return Err(CompileError::topology(
                    diagram.get(scope).map(Element::element_ref),
                    "no network container found",
                ));
            }
            [_, second, ..] => {
                return Err(CompileError::topology(
                    Some(diagram[*second].element_ref()),
                    format!("found {} network containers, expected one", containers.len()),
                ));
            }
        };

        let mut topology = Topology {
            network,
            domain: Domain::Basic,
            nodes: Vec::new(),
            references: Vec::new(),
            grounds: Vec::new(),
            links: Vec::new(),
            ports: Vec::new(),
            spotters: Vec::new(),
            interfaces: Vec::new(),
            interface_nodes: Vec::new(),
            pruned_grounds: 0,
        };

        let members = resolver.descendants(network);
        for &idx in &members {
            let element = &diagram[idx];
            match element.kind() {
                ElementKind::Node(kind) => {
                    let interface = resolver.nearest_ancestor(idx, |ancestor, _| {
                        matches!(ancestor.kind(), ElementKind::Interface(_))
                    })?;
                    match (interface, kind) {
                        (Some(interface), _) => topology.interface_nodes.push((idx, interface)),
                        (None, NodeKind::Basic | NodeKind::Fluid) => topology.nodes.push(idx),
                        (None, NodeKind::Reference) => topology.references.push(idx),
                        (None, NodeKind::Ground) => topology.grounds.push(idx),
                    }
                }
                ElementKind::Link(_) => topology.links.push(idx),
                ElementKind::Port => topology.ports.push(idx),
                ElementKind::Spotter(_) => topology.spotters.push(idx),
                ElementKind::Interface(_) => topology.interfaces.push(idx),
                _ => {}
            }
        }

        // Port edges are often parented to a layer rather than the network;
        // any port touching one of our links belongs to the network too.
        let links: HashSet<ElementIndex> = topology.links.iter().copied().collect();
        let known: HashSet<ElementIndex> = topology.ports.iter().copied().collect();
        let extra = diagram.select(|element| {
            matches!(element.kind(), ElementKind::Port)
                && [element.source(), element.target()]
                    .into_iter()
                    .flatten()
                    .any(|end| links.contains(&end))
        });
        topology
            .ports
            .extend(extra.into_iter().filter(|idx| !known.contains(idx)));
        topology.ports.sort();

        Ok(topology)
    }

    /// Nodes and links must agree on one physical domain.
    fn check_domains(&self, diagram: &Diagram, topology: &Topology) -> Result<Domain, CompileError> {
        let network_ref = || diagram[topology.network].element_ref();

        let node_domains: HashSet<Domain> = topology
            .nodes
            .iter()
            .chain(topology.interface_nodes.iter().map(|(node, _)| node))
            .filter_map(|idx| diagram[*idx].node_kind().and_then(|kind| kind.domain()))
            .collect();
        if node_domains.len() > 1 {
            return Err(CompileError::topology(
                Some(network_ref()),
                "network mixes Basic and Fluid nodes",
            ));
        }
        let node_domain = node_domains.into_iter().next().unwrap_or(Domain::Basic);

        let mut link_domain: Option<(Domain, ElementIndex)> = None;
        for &idx in &topology.links {
            let link = &diagram[idx];
            let master = self.library.master_for_element(link).ok_or_else(|| {
                CompileError::topology(
                    Some(link.element_ref()),
                    format!("link {} has no shape-library master", link.element_ref()),
                )
            })?;
            let Some(domain) = master.domain() else {
                continue;
            };
            match link_domain {
                Some((seen, _)) if seen != domain => {
                    return Err(CompileError::topology(
                        Some(link.element_ref()),
                        "network mixes Basic and Fluid links",
                    ));
                }
                Some(_) => {}
                None => link_domain = Some((domain, idx)),
            }
        }

        match link_domain {
            Some((domain, idx)) if domain != node_domain => Err(CompileError::topology(
                Some(diagram[idx].element_ref()),
                format!("{domain} links cannot connect {node_domain} nodes"),
            )),
            _ => Ok(node_domain),
        }
    }

    /// Reassign numbered nodes to `0..N-1` in label order, and move
    /// references and interface copies along with them.
    fn renumber(&self, diagram: &mut Diagram, topology: &mut Topology) -> Result<(), CompileError> {
        let mut numbered = Vec::with_capacity(topology.nodes.len());
        let mut seen = HashMap::new();
        for &idx in &topology.nodes {
            let node = &diagram[idx];
            let label = node.label_number().ok_or_else(|| {
                CompileError::topology(
                    Some(node.element_ref()),
                    format!("node label `{}` is not an integer", node.label()),
                )
            })?;
            if let Some(first) = seen.insert(label, idx) {
                return Err(CompileError::topology(
                    Some(node.element_ref()),
                    format!(
                        "node number {label} is used twice (also by {})",
                        diagram[first].element_ref()
                    ),
                ));
            }
            numbered.push((label, idx));
        }
        numbered.sort();

        let renumbering: HashMap<i64, usize> = numbered
            .iter()
            .enumerate()
            .map(|(new, (old, _))| (*old, new))
            .collect();

        let aliases: Vec<ElementIndex> = topology
            .references
            .iter()
            .copied()
            .chain(
                topology
                    .interface_nodes
                    .iter()
                    .filter(|(node, _)| diagram[*node].node_kind() != Some(NodeKind::Ground))
                    .map(|(node, _)| *node),
            )
            .collect();
        let mut alias_numbers = Vec::with_capacity(aliases.len());
        for idx in aliases {
            let alias = &diagram[idx];
            let new = alias
                .label_number()
                .and_then(|old| renumbering.get(&old).copied())
                .ok_or_else(|| {
                    CompileError::topology(
                        Some(alias.element_ref()),
                        format!("`{}` does not name a numbered node", alias.label()),
                    )
                })?;
            alias_numbers.push((idx, new));
        }

        for (new, (_, idx)) in numbered.iter().enumerate() {
            if let Some(node) = diagram.get_mut(*idx) {
                node.set_label(new.to_string());
            }
        }
        for (idx, new) in alias_numbers {
            if let Some(alias) = diagram.get_mut(idx) {
                alias.set_label(new.to_string());
            }
        }

        topology.nodes = numbered.into_iter().map(|(_, idx)| idx).collect();
        Ok(())
    }
}

/// Remove main-network Ground nodes with no port attached.
fn prune_grounds(diagram: &mut Diagram, topology: &mut Topology) -> usize {
    let ports = &topology.ports;
    let (kept, unconnected): (Vec<_>, Vec<_>) = topology
        .grounds
        .iter()
        .copied()
        .partition(|ground| ports.iter().any(|port| diagram[*port].touches(*ground)));

    for ground in &unconnected {
        debug!(ground:% = diagram[*ground].element_ref(); "Pruning unconnected ground");
        diagram.remove(*ground);
    }
    topology.grounds = kept;
    unconnected.len()
}
