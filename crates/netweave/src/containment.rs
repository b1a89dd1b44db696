//! Containment queries over the diagram arena.
//!
//! Parent links form a tree rooted at the synthetic document root, unless
//! the document is broken and some chain loops. Every query here detects
//! such loops instead of spinning forever.

use log::trace;
use petgraph::{
    algo::toposort,
    graph::{DiGraph, NodeIndex},
    visit::{Dfs, Walker},
};

use netweave_core::{
    diagram::{Diagram, ElementIndex},
    element::Element,
};

use crate::error::CompileError;

/// Answers descendant and ancestor questions for one diagram.
pub struct ContainmentResolver<'a> {
    diagram: &'a Diagram,
}

impl<'a> ContainmentResolver<'a> {
    pub fn new(diagram: &'a Diagram) -> Self {
        Self { diagram }
    }

    /// Returns `true` if `container` is a strict ancestor of `element`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::CyclicContainment`] if the parent chain of
    /// `element` revisits an element before reaching the root.
    pub fn is_descendant(
        &self,
        element: ElementIndex,
        container: ElementIndex,
    ) -> Result<bool, CompileError> {
        Ok(self
            .nearest_ancestor(element, |_, idx| idx == container)?
            .is_some())
    }

    /// The closest strict ancestor of `element` matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::CyclicContainment`] on a looping parent chain.
    pub fn nearest_ancestor(
        &self,
        element: ElementIndex,
        predicate: impl Fn(&Element, ElementIndex) -> bool,
    ) -> Result<Option<ElementIndex>, CompileError> {
        let mut visited = vec![false; self.diagram.capacity_bound()];
        let mut current = self.diagram.get(element).and_then(Element::parent);

        while let Some(idx) = current {
            let Some(ancestor) = self.diagram.get(idx) else {
                return Ok(None);
            };
            if predicate(ancestor, idx) {
                return Ok(Some(idx));
            }
            if idx == self.diagram.root() {
                return Ok(None);
            }
            if std::mem::replace(&mut visited[idx.index()], true) {
                return Err(CompileError::CyclicContainment {
                    element: ancestor.element_ref(),
                });
            }
            current = ancestor.parent();
        }
        Ok(None)
    }

    /// Every element contained in `container`, directly or not, in document
    /// order. `container` itself is excluded.
    pub fn descendants(&self, container: ElementIndex) -> Vec<ElementIndex> {
        let (graph, nodes) = self.containment_graph();
        let Some(start) = nodes.get(container.index()).copied().flatten() else {
            return Vec::new();
        };

        let mut found: Vec<ElementIndex> = Dfs::new(&graph, start)
            .iter(&graph)
            .map(|node| graph[node])
            .filter(|idx| *idx != container)
            .collect();
        found.sort();
        trace!(container:% = container, count = found.len(); "Collected descendants");
        found
    }

    /// Check the whole document for containment cycles.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::CyclicContainment`] naming one element of the
    /// first cycle found.
    pub fn validate(&self) -> Result<(), CompileError> {
        let (graph, _) = self.containment_graph();
        toposort(&graph, None).map(|_| ()).map_err(|cycle| {
            let idx = graph[cycle.node_id()];
            CompileError::CyclicContainment {
                element: self.diagram[idx].element_ref(),
            }
        })
    }

    /// Parent-to-child graph of all live elements, plus the arena-index to
    /// graph-node mapping.
    fn containment_graph(&self) -> (DiGraph<ElementIndex, ()>, Vec<Option<NodeIndex>>) {
        let mut graph = DiGraph::new();
        let mut nodes = vec![None; self.diagram.capacity_bound()];
        for (idx, _) in self.diagram.iter() {
            nodes[idx.index()] = Some(graph.add_node(idx));
        }
        for (idx, element) in self.diagram.iter() {
            let parent = element
                .parent()
                .and_then(|parent| nodes.get(parent.index()).copied().flatten());
            if let (Some(parent), Some(child)) = (parent, nodes[idx.index()]) {
                graph.add_edge(parent, child, ());
            }
        }
        (graph, nodes)
    }
}
