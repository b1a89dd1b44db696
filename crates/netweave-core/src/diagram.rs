//! The diagram arena.
//!
//! A [`Diagram`] stores every [`Element`] of a document in one indexed arena.
//! Containment and edge endpoints are arena indices ([`ElementIndex`]) rather
//! than identity strings, so traversals never re-resolve identities. Removed
//! elements leave a tombstone, which keeps every other index stable.
//!
//! Index `0` is always the synthetic document root: every parent chain ends
//! there.

use std::{collections::HashMap, fmt, ops::Index};

use thiserror::Error;

use crate::{
    element::{Element, ElementKind},
    identifier::Id,
};

/// Identity of the synthetic root element.
pub const ROOT_ID: &str = "__netweave_root__";

/// Position of an element in the diagram arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementIndex(usize);

impl ElementIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised while mutating the arena.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiagramError {
    #[error("identity `{0}` is used by more than one element")]
    DuplicateIdentity(Id),
}

/// Flat, indexed collection of the elements of one diagram document.
#[derive(Debug, Clone)]
pub struct Diagram {
    elements: Vec<Option<Element>>,
    by_id: HashMap<Id, ElementIndex>,
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagram {
    /// Create a diagram holding only the synthetic root.
    pub fn new() -> Self {
        let root_id = Id::new(ROOT_ID);
        let mut by_id = HashMap::new();
        by_id.insert(root_id, ElementIndex(0));
        Self {
            elements: vec![Some(Element::new(root_id, ElementKind::Root))],
            by_id,
        }
    }

    /// Index of the synthetic document root.
    pub fn root(&self) -> ElementIndex {
        ElementIndex(0)
    }

    /// Append an element to the arena.
    ///
    /// An element without a parent is attached to the synthetic root.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::DuplicateIdentity`] if another live element
    /// already owns the identity.
    pub fn insert(&mut self, mut element: Element) -> Result<ElementIndex, DiagramError> {
        if self.by_id.contains_key(&element.id()) {
            return Err(DiagramError::DuplicateIdentity(element.id()));
        }
        if element.parent().is_none() {
            element.set_parent(Some(self.root()));
        }

        let idx = ElementIndex(self.elements.len());
        self.by_id.insert(element.id(), idx);
        self.elements.push(Some(element));
        Ok(idx)
    }

    /// Returns the live element at `idx`.
    pub fn get(&self, idx: ElementIndex) -> Option<&Element> {
        self.elements.get(idx.0).and_then(Option::as_ref)
    }

    /// Returns the live element at `idx` mutably.
    pub fn get_mut(&mut self, idx: ElementIndex) -> Option<&mut Element> {
        self.elements.get_mut(idx.0).and_then(Option::as_mut)
    }

    /// Look up an element index by identity.
    pub fn find(&self, id: Id) -> Option<ElementIndex> {
        self.by_id.get(&id).copied()
    }

    /// Number of live elements, the synthetic root included.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if the diagram holds nothing but the synthetic root.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Upper bound (exclusive) of every index ever handed out.
    pub fn capacity_bound(&self) -> usize {
        self.elements.len()
    }

    /// Iterate over live elements in document order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementIndex, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .filter_map(|(i, element)| element.as_ref().map(|element| (ElementIndex(i), element)))
    }

    /// Indices of live elements matching `predicate`, in document order.
    pub fn select(&self, predicate: impl Fn(&Element) -> bool) -> Vec<ElementIndex> {
        self.iter()
            .filter(|(_, element)| predicate(element))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Direct children of `parent`, in document order.
    pub fn children(&self, parent: ElementIndex) -> impl Iterator<Item = ElementIndex> + '_ {
        self.iter()
            .filter(move |(idx, element)| *idx != parent && element.parent() == Some(parent))
            .map(|(idx, _)| idx)
    }

    /// Edge elements with `idx` as one of their endpoints, in document order.
    pub fn edges_touching(&self, idx: ElementIndex) -> impl Iterator<Item = ElementIndex> + '_ {
        self.iter()
            .filter(move |(_, element)| element.touches(idx))
            .map(|(edge, _)| edge)
    }

    /// Give the element at `idx` a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::DuplicateIdentity`] if `id` is already taken.
    pub fn rename(&mut self, idx: ElementIndex, id: Id) -> Result<(), DiagramError> {
        if self.by_id.get(&id).is_some_and(|owner| *owner != idx) {
            return Err(DiagramError::DuplicateIdentity(id));
        }
        if let Some(element) = self.elements.get_mut(idx.0).and_then(Option::as_mut) {
            self.by_id.remove(&element.id());
            element.set_id(id);
            self.by_id.insert(id, idx);
        }
        Ok(())
    }

    /// Remove one element, leaving a tombstone.
    ///
    /// Endpoints of other elements that pointed at the removed one are cleared.
    /// Children are not touched; use [`Diagram::remove_subtree`] for that.
    /// The synthetic root cannot be removed.
    pub fn remove(&mut self, idx: ElementIndex) -> Option<Element> {
        if idx == self.root() {
            return None;
        }
        let removed = self.elements.get_mut(idx.0).and_then(Option::take)?;
        self.by_id.remove(&removed.id());

        for element in self.elements.iter_mut().flatten() {
            if element.touches(idx) {
                let source = element.source().filter(|source| *source != idx);
                let target = element.target().filter(|target| *target != idx);
                element.set_endpoints(source, target);
            }
        }
        Some(removed)
    }

    /// Remove `idx` and everything contained in it. Returns the number of
    /// elements removed.
    pub fn remove_subtree(&mut self, idx: ElementIndex) -> usize {
        if idx == self.root() || self.get(idx).is_none() {
            return 0;
        }

        let mut doomed = vec![false; self.elements.len()];
        doomed[idx.0] = true;
        // Parents may follow their children in document order; sweep to a fixpoint.
        loop {
            let mut grew = false;
            for (child, element) in self.iter() {
                if doomed[child.0] {
                    continue;
                }
                if element.parent().is_some_and(|parent| doomed[parent.0]) {
                    doomed[child.0] = true;
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let targets: Vec<ElementIndex> = doomed
            .iter()
            .enumerate()
            .filter(|(_, doomed)| **doomed)
            .map(|(i, _)| ElementIndex(i))
            .collect();
        targets
            .into_iter()
            .filter_map(|idx| self.remove(idx))
            .count()
    }
}

impl Index<ElementIndex> for Diagram {
    type Output = Element;

    /// # Panics
    ///
    /// Panics if `idx` was never handed out or the element was removed.
    fn index(&self, idx: ElementIndex) -> &Self::Output {
        self.get(idx)
            .unwrap_or_else(|| panic!("element {idx} does not exist"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::NodeKind;

    fn node(id: &str) -> Element {
        Element::new(Id::new(id), ElementKind::Node(NodeKind::Basic))
    }

    #[test]
    fn test_new_has_root() {
        let diagram = Diagram::new();
        assert_eq!(diagram.len(), 1);
        assert!(diagram.is_empty());
        assert_eq!(*diagram[diagram.root()].kind(), ElementKind::Root);
        assert_eq!(diagram[diagram.root()].parent(), None);
    }

    #[test]
    fn test_insert_attaches_to_root() {
        let mut diagram = Diagram::new();
        let idx = diagram.insert(node("diagram-n1")).unwrap();

        assert_eq!(diagram[idx].parent(), Some(diagram.root()));
        assert_eq!(diagram.find(Id::new("diagram-n1")), Some(idx));
        assert_eq!(diagram.len(), 2);
    }

    #[test]
    fn test_insert_duplicate_identity() {
        let mut diagram = Diagram::new();
        diagram.insert(node("diagram-dup")).unwrap();
        let err = diagram.insert(node("diagram-dup")).unwrap_err();
        assert_eq!(err, DiagramError::DuplicateIdentity(Id::new("diagram-dup")));
    }

    #[test]
    fn test_children_and_edges() {
        let mut diagram = Diagram::new();
        let group = diagram
            .insert(Element::new(Id::new("diagram-g"), ElementKind::Plain))
            .unwrap();
        let a = diagram.insert(node("diagram-a").with_parent(group)).unwrap();
        let b = diagram.insert(node("diagram-b").with_parent(group)).unwrap();
        let edge = diagram
            .insert(Element::new(Id::new("diagram-e"), ElementKind::Port).with_endpoints(Some(a), Some(b)))
            .unwrap();

        assert_eq!(diagram.children(group).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(diagram.edges_touching(a).collect::<Vec<_>>(), vec![edge]);
        assert_eq!(diagram.select(|e| e.is_edge()), vec![edge]);
    }

    #[test]
    fn test_remove_clears_endpoints() {
        let mut diagram = Diagram::new();
        let a = diagram.insert(node("diagram-ra")).unwrap();
        let b = diagram.insert(node("diagram-rb")).unwrap();
        let edge = diagram
            .insert(Element::new(Id::new("diagram-re"), ElementKind::Port).with_endpoints(Some(a), Some(b)))
            .unwrap();

        let removed = diagram.remove(a).expect("element should exist");
        assert_eq!(removed.id(), "diagram-ra");
        assert!(diagram.get(a).is_none());
        assert_eq!(diagram.find(Id::new("diagram-ra")), None);
        assert_eq!(diagram[edge].source(), None);
        assert_eq!(diagram[edge].target(), Some(b));
    }

    #[test]
    fn test_remove_subtree() {
        let mut diagram = Diagram::new();
        let outer = diagram
            .insert(Element::new(Id::new("diagram-outer"), ElementKind::Plain))
            .unwrap();
        let inner = diagram
            .insert(Element::new(Id::new("diagram-inner"), ElementKind::Plain).with_parent(outer))
            .unwrap();
        diagram.insert(node("diagram-leaf").with_parent(inner)).unwrap();
        let keep = diagram.insert(node("diagram-keep")).unwrap();

        assert_eq!(diagram.remove_subtree(outer), 3);
        assert_eq!(diagram.len(), 2);
        assert!(diagram.get(keep).is_some());
        assert_eq!(diagram.remove_subtree(diagram.root()), 0);
    }

    #[test]
    fn test_rename() {
        let mut diagram = Diagram::new();
        let a = diagram.insert(node("diagram-old")).unwrap();
        diagram.insert(node("diagram-taken")).unwrap();

        diagram.rename(a, Id::new("diagram-new")).unwrap();
        assert_eq!(diagram.find(Id::new("diagram-new")), Some(a));
        assert_eq!(diagram.find(Id::new("diagram-old")), None);
        assert!(diagram.rename(a, Id::new("diagram-taken")).is_err());
    }
}
