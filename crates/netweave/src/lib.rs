//! Netweave - compiles network diagrams into resolved network models.
//!
//! A network diagram is drawn by hand: nodes, links between them, port edges
//! from links to nodes, and containers grouping everything into networks.
//! Netweave recovers a well-formed network from such a drawing: it checks the
//! containment hierarchy, renumbers nodes, resolves every link's port map,
//! repairs drifted data fields against the shape library, and assembles
//! super-networks out of several sub-network drawings.
//!
//! # Pipeline
//!
//! - [`containment`] - Descendant and ancestor queries with cycle detection.
//! - [`topology`] - Network container lookup, role buckets, node renumbering.
//! - [`port_map`] - Per-link port maps, Ground defaults, jumper socket lists.
//! - [`reconcile`] - Field drift repair against master records.
//! - [`interface`] - Sub-network interface records.
//! - [`assembly`] - Super-network assembly and super-port stitching.

pub mod assembly;
pub mod compile;
pub mod config;
pub mod containment;
pub mod interface;
pub mod port_map;
pub mod reconcile;
pub mod source;
pub mod topology;

mod error;

#[cfg(test)]
mod test_support;

pub use netweave_core::{diagram, element, identifier, library, network, span};

pub use assembly::{AssembledNetwork, AssemblyReport};
pub use compile::{CompileReport, CompiledNetwork};
pub use error::{CompileError, NetweaveError};

use log::{debug, info, trace};

use netweave_core::{
    diagram::Diagram,
    element::{ElementKind, NetworkKind},
    library::ShapeLibrary,
};

use assembly::SuperNetworkAssembler;
use config::AppConfig;
use source::DrawingSource;

/// Result of building a document: a sub-network or a super-network.
#[derive(Debug, Clone)]
pub enum CompiledModel {
    Sub(CompiledNetwork),
    Super(AssembledNetwork),
}

/// Entry point for compiling network diagrams.
///
/// Holds the configuration and the shape library every stage consults.
///
/// # Examples
///
/// ```rust
/// use netweave::{
///     NetworkCompiler,
///     config::AppConfig,
///     library::{MasterCatalog, MasterKind, MasterRecord},
/// };
///
/// let library = MasterCatalog::from_records(vec![
///     MasterRecord::new(MasterKind::Link, "Resistor").with_ports(2, [0, 1]),
/// ])
/// .expect("valid catalog");
///
/// let source = r#"<mxGraphModel><root>
///   <object id="net" label="Divider"><tag type="Network" subtype="Sub"/></object>
///   <object id="a" label="1"><tag type="Node" subtype="Basic"/><mxCell parent="net"/></object>
///   <object id="b" label="2"><tag type="Node" subtype="Basic"/><mxCell parent="net"/></object>
///   <object id="r" label="R1"><tag type="Link" subtype="Resistor"/><mxCell parent="net"/></object>
///   <object id="p0" label="0"><tag type="Port"/><mxCell parent="net" edge="1" source="r" target="a"/></object>
///   <object id="p1" label="1"><tag type="Port"/><mxCell parent="net" edge="1" source="r" target="b"/></object>
/// </root></mxGraphModel>"#;
///
/// let compiler = NetworkCompiler::new(AppConfig::default(), &library);
/// let mut diagram = compiler.parse(source).expect("Failed to parse");
/// let compiled = compiler.compile(&mut diagram).expect("Failed to compile");
/// assert_eq!(compiled.network.node_count(), 2);
/// ```
pub struct NetworkCompiler<'a> {
    config: AppConfig,
    library: &'a dyn ShapeLibrary,
}

impl<'a> NetworkCompiler<'a> {
    /// Create a compiler with the given configuration and shape library.
    pub fn new(config: AppConfig, library: &'a dyn ShapeLibrary) -> Self {
        Self { config, library }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse a diagram document.
    ///
    /// # Errors
    ///
    /// Returns [`NetweaveError::Document`] carrying `source` if the document
    /// is malformed.
    pub fn parse(&self, source: &str) -> Result<Diagram, NetweaveError> {
        info!("Parsing diagram document");
        let diagram = netweave_parser::parse_document(source)
            .map_err(|err| NetweaveError::new_document_error(err, source))?;
        debug!(elements = diagram.len(); "Document parsed successfully");
        Ok(diagram)
    }

    /// Compile the single sub-network of `diagram`.
    ///
    /// The diagram is updated in place: nodes are renumbered, unconnected
    /// grounds pruned, fields reconciled and interfaces recorded.
    ///
    /// # Errors
    ///
    /// Returns [`NetweaveError::Compile`] for the first violation found. The
    /// error carries no source text; see [`NetweaveError::with_source`].
    pub fn compile(&self, diagram: &mut Diagram) -> Result<CompiledNetwork, NetweaveError> {
        let scope = diagram.root();
        let compiled =
            compile::compile_network(diagram, scope, self.library, self.config.compile())?;
        trace!(network:? = compiled.network; "Compiled network");
        Ok(compiled)
    }

    /// Assemble the super-network of `diagram`, loading sub-network drawings
    /// through `source`.
    ///
    /// # Errors
    ///
    /// Returns the first assembly violation, or an error from `source`.
    pub fn assemble(
        &self,
        diagram: &mut Diagram,
        source: &dyn DrawingSource,
    ) -> Result<AssembledNetwork, NetweaveError> {
        SuperNetworkAssembler::new(self.library, self.config.compile(), self.config.assembly())
            .assemble(diagram, source)
    }

    /// Compile or assemble `diagram`, depending on whether it holds a
    /// Network/Super container.
    ///
    /// # Errors
    ///
    /// See [`NetworkCompiler::compile`] and [`NetworkCompiler::assemble`].
    pub fn build(
        &self,
        diagram: &mut Diagram,
        source: &dyn DrawingSource,
    ) -> Result<CompiledModel, NetweaveError> {
        let is_super = diagram
            .iter()
            .any(|(_, element)| matches!(element.kind(), ElementKind::Network(NetworkKind::Super)));
        if is_super {
            self.assemble(diagram, source).map(CompiledModel::Super)
        } else {
            self.compile(diagram).map(CompiledModel::Sub)
        }
    }

    /// Parse and build a document in one step.
    ///
    /// Compile errors found in the document itself carry `text` as their
    /// source.
    ///
    /// # Errors
    ///
    /// See [`NetworkCompiler::parse`] and [`NetworkCompiler::build`].
    pub fn build_source(
        &self,
        text: &str,
        source: &dyn DrawingSource,
    ) -> Result<(Diagram, CompiledModel), NetweaveError> {
        let mut diagram = self.parse(text)?;
        let model = self
            .build(&mut diagram, source)
            .map_err(|err| err.with_source(text))?;
        Ok((diagram, model))
    }
}
