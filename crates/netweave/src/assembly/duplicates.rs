//! Duplicate interface detection.
//!
//! Two interface containers are duplicates when they carry the same label,
//! the same number of children, and the same `(Key, subtype, label)` triples
//! for their nodes, in any order. Port and link connections are not
//! compared.

use log::debug;

use netweave_core::{
    diagram::{Diagram, ElementIndex},
    element::ElementKind,
};

/// What two interfaces must share to be duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSignature {
    label: String,
    children: usize,
    members: Vec<(String, String, String)>,
}

impl InterfaceSignature {
    /// Signature of the interface container at `interface`.
    pub fn of(diagram: &Diagram, interface: ElementIndex) -> Self {
        let mut children = 0;
        let mut members = Vec::new();
        for child in diagram.children(interface) {
            children += 1;
            let element = &diagram[child];
            if let Some(kind) = element.node_kind() {
                members.push((
                    element.key().unwrap_or_default().to_string(),
                    kind.to_string(),
                    element.label().to_string(),
                ));
            }
        }
        members.sort();

        Self {
            label: diagram
                .get(interface)
                .map(|element| element.label().to_string())
                .unwrap_or_default(),
            children,
            members,
        }
    }
}

/// Pair every interface in `interfaces` that duplicates an earlier one with
/// the first interface of its signature.
fn find_duplicates(
    diagram: &Diagram,
    interfaces: &[ElementIndex],
) -> Vec<(ElementIndex, ElementIndex)> {
    let mut canonical: Vec<(InterfaceSignature, ElementIndex)> = Vec::new();
    let mut duplicates = Vec::new();

    for &interface in interfaces {
        let signature = InterfaceSignature::of(diagram, interface);
        match canonical.iter().find(|(seen, _)| *seen == signature) {
            Some((_, first)) => duplicates.push((interface, *first)),
            None => canonical.push((signature, interface)),
        }
    }
    duplicates
}

/// Interfaces of `interfaces` that do not duplicate an earlier one, in order.
pub fn distinct_interfaces(diagram: &Diagram, interfaces: &[ElementIndex]) -> Vec<ElementIndex> {
    let duplicates = find_duplicates(diagram, interfaces);
    interfaces
        .iter()
        .copied()
        .filter(|interface| !duplicates.iter().any(|(duplicate, _)| duplicate == interface))
        .collect()
}

/// Mark every interface in `interfaces` that duplicates an earlier one.
///
/// Returns `(duplicate, canonical)` pairs. The first interface of each
/// signature is canonical.
pub fn mark_duplicates(
    diagram: &mut Diagram,
    interfaces: &[ElementIndex],
) -> Vec<(ElementIndex, ElementIndex)> {
    let duplicates = find_duplicates(diagram, interfaces);
    for &(duplicate, first) in &duplicates {
        if let Some(ElementKind::Interface(payload)) =
            diagram.get_mut(duplicate).map(|element| element.kind_mut())
        {
            payload.set_duplicate_of(first);
        }
        debug!(duplicate:% = duplicate, canonical:% = first; "Duplicate interface");
    }
    duplicates
}

/// The interface that `interface` stands for: its canonical copy when it is
/// a marked duplicate, itself otherwise.
pub fn canonical_interface(diagram: &Diagram, interface: ElementIndex) -> ElementIndex {
    match diagram.get(interface).map(|element| element.kind()) {
        Some(ElementKind::Interface(payload)) => payload
            .duplicate_of()
            .filter(|canonical| diagram.get(*canonical).is_some())
            .unwrap_or(interface),
        _ => interface,
    }
}
