//! Super-network assembly.
//!
//! A super-network document holds one Network/Super container with several
//! Network/Sub instances inside it. Each instance names a sub-network drawing
//! in its `drawing` field and embeds a copy of that drawing's content (or
//! only its interfaces). Connectors between interfaces of different
//! instances describe how the sub-networks are wired together.
//!
//! Assembly walks the instances in document order, assigns each a contiguous
//! block of super-network node numbers, refreshes or re-offsets the embedded
//! content, and finally regenerates the super-ports that stitch the
//! instances together.

mod duplicates;
mod identity;
mod super_ports;

pub use duplicates::{InterfaceSignature, canonical_interface, distinct_interfaces, mark_duplicates};
pub use identity::{ID_LENGTH, IdGenerator, IdSubstitution};
pub use super_ports::{InstancePlacement, Stitching, stitch};

use std::collections::HashMap;

use log::{debug, info, warn};

use netweave_core::{
    diagram::{Diagram, ElementIndex},
    element::{ElementKind, NetworkKind, NodeKind},
    library::ShapeLibrary,
    network::{SubnetInstance, SuperNetwork},
};
use netweave_parser::record::NODE_COUNT_FIELD;

use crate::{
    compile::{CompiledNetwork, compile_network, display_name},
    config::{AssemblyConfig, CompileConfig},
    containment::ContainmentResolver,
    error::{CompileError, NetweaveError},
    source::{Drawing, DrawingSource},
};

/// Instance field naming the sub-network drawing.
pub const DRAWING_FIELD: &str = "drawing";
/// Instance field recording the first node number of the instance.
pub const NODE_OFFSET_FIELD: &str = "nodeOffset";

/// Maintenance performed while assembling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Instances re-imported from their drawing.
    pub refreshed: Vec<String>,
    /// Instances whose embedded content was reused.
    pub reused: Vec<String>,
    pub duplicate_interfaces: usize,
    pub orphaned_super_ports: usize,
    /// Field changes made while compiling refreshed drawings.
    pub reconciled_fields: usize,
}

/// An assembled super-network.
#[derive(Debug, Clone)]
pub struct AssembledNetwork {
    pub network: SuperNetwork,
    pub report: AssemblyReport,
}

/// Assembles the super-network of a document.
pub struct SuperNetworkAssembler<'a> {
    library: &'a dyn ShapeLibrary,
    compile: &'a CompileConfig,
    assembly: &'a AssemblyConfig,
}

impl<'a> SuperNetworkAssembler<'a> {
    pub fn new(
        library: &'a dyn ShapeLibrary,
        compile: &'a CompileConfig,
        assembly: &'a AssemblyConfig,
    ) -> Self {
        Self {
            library,
            compile,
            assembly,
        }
    }

    /// Assemble the super-network found in `diagram`.
    ///
    /// Sub-network drawings are loaded through `source`. Errors inside a
    /// loaded drawing carry that drawing's text; errors in `diagram` itself
    /// carry none.
    ///
    /// # Errors
    ///
    /// Returns [`NetweaveError::Compile`] for any assembly violation and
    /// whatever `source` reports while loading.
    pub fn assemble(
        &self,
        diagram: &mut Diagram,
        source: &dyn DrawingSource,
    ) -> Result<AssembledNetwork, NetweaveError> {
        ContainmentResolver::new(diagram).validate()?;
        let super_network = find_super_network(diagram)?;
        let name = display_name(&diagram[super_network]);
        info!(network = name.as_str(); "Assembling super-network");

        let mut generator = IdGenerator::new(self.assembly.seed());
        let mut report = AssemblyReport::default();
        let mut placements = HashMap::new();
        let mut subnets = Vec::new();
        let mut offset = 0;

        for instance in find_instances(diagram, super_network)? {
            let instance_name = display_name(&diagram[instance]);
            let drawing = diagram[instance].field(DRAWING_FIELD).map(str::to_string);
            let embedded = diagram.children(instance).next().is_some();

            let node_count = match drawing.as_deref() {
                Some(reference) if self.assembly.refresh() || !embedded => {
                    let count = self.refresh(
                        diagram,
                        instance,
                        reference,
                        offset,
                        source,
                        &mut generator,
                        &mut report,
                    )?;
                    report.refreshed.push(instance_name.clone());
                    count
                }
                _ => {
                    let count = reuse(diagram, instance, offset)?;
                    report.reused.push(instance_name.clone());
                    count
                }
            };

            if let Some(element) = diagram.get_mut(instance) {
                let fields = element.fields_mut();
                fields.insert(NODE_OFFSET_FIELD.to_string(), offset.to_string());
                fields.insert(NODE_COUNT_FIELD.to_string(), node_count.to_string());
            }
            debug!(
                instance = instance_name.as_str(),
                offset = offset,
                node_count = node_count;
                "Instance placed"
            );

            let interfaces: Vec<ElementIndex> = ContainmentResolver::new(diagram)
                .descendants(instance)
                .into_iter()
                .filter(|idx| matches!(diagram[*idx].kind(), ElementKind::Interface(_)))
                .collect();
            report.duplicate_interfaces += mark_duplicates(diagram, &interfaces).len();
            placements.insert(
                instance,
                InstancePlacement {
                    name: instance_name.clone(),
                    offset,
                    node_count,
                },
            );
            subnets.push(SubnetInstance {
                name: instance_name,
                drawing,
                offset,
                node_count,
            });
            offset += node_count;
        }

        let stitching = stitch(diagram, super_network, &placements, &mut generator)?;
        report.orphaned_super_ports = stitching.orphaned;

        info!(
            network = name.as_str(),
            subnets = subnets.len(),
            nodes = offset,
            super_ports = stitching.super_ports.len();
            "Super-network assembled"
        );
        Ok(AssembledNetwork {
            network: SuperNetwork {
                name,
                node_count: offset,
                subnets,
                super_ports: stitching.super_ports,
            },
            report,
        })
    }

    /// Re-import `instance` from its drawing. Returns its node count.
    #[allow(clippy::too_many_arguments)]
    fn refresh(
        &self,
        diagram: &mut Diagram,
        instance: ElementIndex,
        reference: &str,
        offset: usize,
        source: &dyn DrawingSource,
        generator: &mut IdGenerator,
        report: &mut AssemblyReport,
    ) -> Result<usize, NetweaveError> {
        let instance_ref = diagram[instance].element_ref();
        let Some(mut drawing) = source.load(reference)? else {
            return Err(CompileError::MissingSourceDrawing {
                instance: instance_ref,
                drawing: reference.to_string(),
            }
            .into());
        };
        let nested = drawing
            .diagram
            .iter()
            .any(|(_, element)| matches!(element.kind(), ElementKind::Network(NetworkKind::Super)));
        if nested {
            return Err(CompileError::NestedSuperNetwork {
                instance: instance_ref,
                drawing: reference.to_string(),
            }
            .into());
        }

        debug!(instance = instance_ref.label(), drawing = reference; "Compiling sub-network drawing");
        let scope = drawing.diagram.root();
        let compiled = compile_network(&mut drawing.diagram, scope, self.library, self.compile)
            .map_err(|err| NetweaveError::new_compile_error(err, drawing.source.clone()))?;
        report.reconciled_fields += compiled.report.reconciliation.change_count();

        let rebinds = connector_bindings(diagram, instance);
        let stale: Vec<ElementIndex> = diagram.children(instance).collect();
        let removed: usize = stale
            .into_iter()
            .map(|child| diagram.remove_subtree(child))
            .sum();
        debug!(instance = instance_ref.label(), removed = removed; "Discarded embedded content");

        let interfaces = distinct_interfaces(&drawing.diagram, &compiled.topology.interfaces);
        let skipped = compiled.topology.interfaces.len() - interfaces.len();
        if skipped > 0 {
            debug!(instance = instance_ref.label(), skipped = skipped; "Skipped duplicate interfaces");
        }
        report.duplicate_interfaces += skipped;

        let substitution = import(
            diagram,
            instance,
            &drawing,
            &compiled,
            &interfaces,
            offset,
            generator,
        )?;
        debug!(instance = instance_ref.label(), identities = substitution.len(); "Imported sub-network");
        rebind_connectors(diagram, instance, rebinds);

        Ok(compiled.topology.node_count())
    }
}

/// The single Network/Super container of the document.
fn find_super_network(diagram: &Diagram) -> Result<ElementIndex, CompileError> {
    let found =
        diagram.select(|element| matches!(element.kind(), ElementKind::Network(NetworkKind::Super)));
    match found.as_slice() {
        [network] => Ok(*network),
        [] => Err(CompileError::topology(None, "no super-network container found")),
        [_, second, ..] => Err(CompileError::topology(
            Some(diagram[*second].element_ref()),
            format!("found {} super-network containers, expected one", found.len()),
        )),
    }
}

/// Network/Sub containers whose nearest enclosing network is `super_network`.
fn find_instances(
    diagram: &Diagram,
    super_network: ElementIndex,
) -> Result<Vec<ElementIndex>, CompileError> {
    let resolver = ContainmentResolver::new(diagram);
    let mut instances = Vec::new();
    for idx in resolver.descendants(super_network) {
        if !matches!(diagram[idx].kind(), ElementKind::Network(NetworkKind::Sub)) {
            continue;
        }
        let enclosing = resolver.nearest_ancestor(idx, |element, _| {
            matches!(element.kind(), ElementKind::Network(_))
        })?;
        if enclosing == Some(super_network) {
            instances.push(idx);
        }
    }
    Ok(instances)
}

/// Shift the labels of numbered nodes, references and interface copies.
fn shift_labels(diagram: &mut Diagram, members: &[ElementIndex], delta: i64) {
    for &idx in members {
        let Some(element) = diagram.get_mut(idx) else {
            continue;
        };
        if matches!(element.node_kind(), None | Some(NodeKind::Ground)) {
            continue;
        }
        if let Some(number) = element.label_number() {
            element.set_label((number + delta).to_string());
        }
    }
}

/// Reuse the embedded content of `instance`, moving it to `offset`.
/// Returns its node count.
fn reuse(diagram: &mut Diagram, instance: ElementIndex, offset: usize) -> Result<usize, CompileError> {
    let members = ContainmentResolver::new(diagram).descendants(instance);
    let element = &diagram[instance];
    let number_field = |key: &str| -> Result<Option<i64>, CompileError> {
        element
            .field(key)
            .map(|text| {
                text.trim().parse::<i64>().map_err(|_| {
                    CompileError::topology(
                        Some(element.element_ref()),
                        format!("`{key}` of {} is not a number: `{text}`", element.element_ref()),
                    )
                })
            })
            .transpose()
    };

    let recorded_offset = number_field(NODE_OFFSET_FIELD)?.unwrap_or(0);
    let node_count = match number_field(NODE_COUNT_FIELD)? {
        Some(count) => usize::try_from(count).map_err(|_| {
            CompileError::topology(
                Some(element.element_ref()),
                format!(
                    "`{NODE_COUNT_FIELD}` of {} is negative: `{count}`",
                    element.element_ref()
                ),
            )
        })?,
        None => members
            .iter()
            .filter(|idx| diagram[**idx].is_numbered_node())
            .count(),
    };
    if members.is_empty() {
        warn!(instance:% = element.element_ref(); "Instance has no embedded content and no drawing");
    }

    let delta = offset as i64 - recorded_offset;
    if delta != 0 {
        shift_labels(diagram, &members, delta);
    }
    Ok(node_count)
}

/// A connector end attached to an interface of the instance being replaced.
struct ConnectorBinding {
    connector: ElementIndex,
    is_source: bool,
    interface_label: String,
}

fn connector_bindings(diagram: &Diagram, instance: ElementIndex) -> Vec<ConnectorBinding> {
    let mut bindings = Vec::new();
    for interface in ContainmentResolver::new(diagram).descendants(instance) {
        if !matches!(diagram[interface].kind(), ElementKind::Interface(_)) {
            continue;
        }
        let label = diagram[interface].label();
        for edge in diagram.edges_touching(interface) {
            let connector = &diagram[edge];
            if !matches!(connector.kind(), ElementKind::Connector) {
                continue;
            }
            if connector.source() == Some(interface) {
                bindings.push(ConnectorBinding {
                    connector: edge,
                    is_source: true,
                    interface_label: label.to_string(),
                });
            }
            if connector.target() == Some(interface) {
                bindings.push(ConnectorBinding {
                    connector: edge,
                    is_source: false,
                    interface_label: label.to_string(),
                });
            }
        }
    }
    bindings
}

/// Point connectors at the freshly imported interface with the same label.
fn rebind_connectors(diagram: &mut Diagram, instance: ElementIndex, bindings: Vec<ConnectorBinding>) {
    let interfaces: Vec<ElementIndex> = ContainmentResolver::new(diagram)
        .descendants(instance)
        .into_iter()
        .filter(|idx| matches!(diagram[*idx].kind(), ElementKind::Interface(_)))
        .collect();

    for binding in bindings {
        let Some(interface) = interfaces
            .iter()
            .copied()
            .find(|idx| diagram[*idx].label() == binding.interface_label)
        else {
            warn!(
                interface = binding.interface_label.as_str();
                "Interface disappeared from the sub-network, connector left unbound"
            );
            continue;
        };
        if let Some(connector) = diagram.get_mut(binding.connector) {
            let (source, target) = if binding.is_source {
                (Some(interface), connector.target())
            } else {
                (connector.source(), Some(interface))
            };
            connector.set_endpoints(source, target);
        }
    }
}

/// Copy a compiled drawing under `instance`.
///
/// When the drawing has interfaces only `interfaces` (and their contents)
/// are copied; otherwise the whole network content is, together with every
/// port of its links.
fn import(
    diagram: &mut Diagram,
    instance: ElementIndex,
    drawing: &Drawing,
    compiled: &CompiledNetwork,
    interfaces: &[ElementIndex],
    offset: usize,
    generator: &mut IdGenerator,
) -> Result<IdSubstitution, CompileError> {
    let resolver = ContainmentResolver::new(&drawing.diagram);
    let mut members: Vec<ElementIndex> = if compiled.topology.interfaces.is_empty() {
        let mut members = resolver.descendants(compiled.topology.network);
        members.extend(&compiled.topology.ports);
        members
    } else {
        interfaces
            .iter()
            .flat_map(|interface| {
                std::iter::once(*interface).chain(resolver.descendants(*interface))
            })
            .collect()
    };
    members.sort();
    members.dedup();

    let instance_ref = diagram[instance].element_ref();
    let mut substitution = IdSubstitution::new();
    let mut copies: HashMap<ElementIndex, ElementIndex> = HashMap::with_capacity(members.len());
    for &original in &members {
        let mut copy = drawing.diagram[original].clone();
        copy.set_id(substitution.substitute(copy.id(), generator));
        copy.set_parent(Some(instance));
        copy.set_endpoints(None, None);
        copy.set_span(None);
        let idx = diagram
            .insert(copy)
            .map_err(|err| CompileError::topology(Some(instance_ref.clone()), err.to_string()))?;
        copies.insert(original, idx);
    }

    for (&original, &copy) in &copies {
        let element = &drawing.diagram[original];
        let parent = element.parent().and_then(|parent| copies.get(&parent).copied());
        let source = element.source().and_then(|end| copies.get(&end).copied());
        let target = element.target().and_then(|end| copies.get(&end).copied());
        let broken_edge = (element.source().is_some() && source.is_none())
            || (element.target().is_some() && target.is_none());
        if broken_edge {
            diagram.remove(copy);
            continue;
        }
        if let Some(imported) = diagram.get_mut(copy) {
            imported.set_parent(Some(parent.unwrap_or(instance)));
            imported.set_endpoints(source, target);
        }
    }

    let imported: Vec<ElementIndex> = copies.into_values().collect();
    shift_labels(diagram, &imported, offset as i64);
    Ok(substitution)
}
