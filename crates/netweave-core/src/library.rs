//! Shape-library master records.
//!
//! Every Link and Spotter shape is an instance of a *master* defined in a
//! shape library. The master declares the port layout of the shape and the
//! canonical set of positional data fields its instances should carry. The
//! compiler only ever asks one question of a library, "give me the master for
//! this shape", which is captured by the [`ShapeLibrary`] trait.
//!
//! [`MasterCatalog`] is the bundled implementation, loaded from TOML:
//!
//! ```toml
//! [[master]]
//! type = "Link"
//! subtype = "Resistor"
//! class = "Resistor"
//! domain = "basic"
//! ports = 2
//! required-ports = [0, 1]
//!
//! [master.fields]
//! "c00.Resistance" = "1.0"
//! ```

use std::{collections::HashMap, fmt};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::element::{Domain, Element, ElementKind, ShapeType};

/// Which family of shapes a master belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum MasterKind {
    Link,
    Spotter,
}

impl fmt::Display for MasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasterKind::Link => write!(f, "Link"),
            MasterKind::Spotter => write!(f, "Spotter"),
        }
    }
}

/// Canonical definition of a Link or Spotter shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MasterRecord {
    #[serde(rename = "type")]
    kind: MasterKind,
    subtype: String,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    variant: Option<String>,
    #[serde(default)]
    domain: Option<Domain>,
    /// Declared port count. For variable-arity links this is the minimum.
    #[serde(default)]
    ports: usize,
    #[serde(default)]
    required_ports: Vec<usize>,
    #[serde(default)]
    variable_ports: bool,
    /// Ports that plug into a socket list instead of a node (jumper links).
    #[serde(default)]
    plug_ports: Vec<usize>,
    /// Positional field keys (`c##.<name>` / `i##.<name>`) and their defaults.
    #[serde(default)]
    fields: IndexMap<String, String>,
}

impl MasterRecord {
    pub fn new(kind: MasterKind, subtype: impl Into<String>) -> Self {
        Self {
            kind,
            subtype: subtype.into(),
            class: None,
            variant: None,
            domain: None,
            ports: 0,
            required_ports: Vec::new(),
            variable_ports: false,
            plug_ports: Vec::new(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>, variant: Option<&str>) -> Self {
        self.class = Some(class.into());
        self.variant = variant.map(str::to_string);
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Set the declared port count and the ports that must be connected.
    pub fn with_ports(mut self, ports: usize, required: impl IntoIterator<Item = usize>) -> Self {
        self.ports = ports;
        self.required_ports = required.into_iter().collect();
        self
    }

    pub fn with_variable_ports(mut self) -> Self {
        self.variable_ports = true;
        self
    }

    pub fn with_plug_ports(mut self, plugs: impl IntoIterator<Item = usize>) -> Self {
        self.plug_ports = plugs.into_iter().collect();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, default: impl Into<String>) -> Self {
        self.fields.insert(key.into(), default.into());
        self
    }

    pub fn kind(&self) -> MasterKind {
        self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    pub fn domain(&self) -> Option<Domain> {
        self.domain
    }

    pub fn ports(&self) -> usize {
        self.ports
    }

    pub fn required_ports(&self) -> &[usize] {
        &self.required_ports
    }

    pub fn variable_ports(&self) -> bool {
        self.variable_ports
    }

    pub fn plug_ports(&self) -> &[usize] {
        &self.plug_ports
    }

    pub fn is_plug_port(&self, port: usize) -> bool {
        self.plug_ports.contains(&port)
    }

    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.fields
    }
}

/// Source of master records.
pub trait ShapeLibrary {
    /// Look up a master by shape family and subtype name.
    fn master_for(&self, kind: MasterKind, subtype: &str) -> Option<&MasterRecord>;

    /// Look up a master by implementation class and variant.
    fn master_for_class(&self, class: &str, variant: Option<&str>) -> Option<&MasterRecord>;

    /// Resolve the master of a shape: by class when the shape names one, else
    /// by subtype.
    fn master_for_shape(&self, kind: MasterKind, shape: &ShapeType) -> Option<&MasterRecord> {
        let variant = shape.variant().map(|variant| variant.as_string());
        shape
            .class()
            .and_then(|class| self.master_for_class(&class.as_string(), variant.as_deref()))
            .or_else(|| self.master_for(kind, &shape.subtype().as_string()))
    }

    /// Resolve the master of a Link or Spotter element. Other kinds have none.
    fn master_for_element(&self, element: &Element) -> Option<&MasterRecord> {
        match element.kind() {
            ElementKind::Link(shape) => self.master_for_shape(MasterKind::Link, shape),
            ElementKind::Spotter(shape) => self.master_for_shape(MasterKind::Spotter, shape),
            _ => None,
        }
    }
}

/// Errors raised while building a [`MasterCatalog`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("master `{kind} {subtype}` is defined more than once")]
    DuplicateMaster { kind: MasterKind, subtype: String },
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    master: Vec<MasterRecord>,
}

/// In-memory shape library.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "CatalogFile")]
pub struct MasterCatalog {
    masters: Vec<MasterRecord>,
    by_subtype: HashMap<(MasterKind, String), usize>,
    by_class: HashMap<(String, Option<String>), usize>,
}

impl MasterCatalog {
    /// Build a catalog from a list of records.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateMaster`] if two records share a kind
    /// and subtype.
    pub fn from_records(records: Vec<MasterRecord>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for record in records {
            catalog.insert(record)?;
        }
        Ok(catalog)
    }

    /// Add one record.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateMaster`] if the kind and subtype are
    /// already taken.
    pub fn insert(&mut self, record: MasterRecord) -> Result<(), CatalogError> {
        let key = (record.kind, record.subtype.clone());
        if self.by_subtype.contains_key(&key) {
            return Err(CatalogError::DuplicateMaster {
                kind: record.kind,
                subtype: record.subtype,
            });
        }

        let idx = self.masters.len();
        self.by_subtype.insert(key, idx);
        if let Some(class) = &record.class {
            // First definition of a class wins.
            self.by_class
                .entry((class.clone(), record.variant.clone()))
                .or_insert(idx);
        }
        self.masters.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.masters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MasterRecord> {
        self.masters.iter()
    }
}

impl TryFrom<CatalogFile> for MasterCatalog {
    type Error = CatalogError;

    fn try_from(file: CatalogFile) -> Result<Self, Self::Error> {
        Self::from_records(file.master)
    }
}

impl ShapeLibrary for MasterCatalog {
    fn master_for(&self, kind: MasterKind, subtype: &str) -> Option<&MasterRecord> {
        self.by_subtype
            .get(&(kind, subtype.to_string()))
            .map(|idx| &self.masters[*idx])
    }

    fn master_for_class(&self, class: &str, variant: Option<&str>) -> Option<&MasterRecord> {
        self.by_class
            .get(&(class.to_string(), variant.map(str::to_string)))
            .map(|idx| &self.masters[*idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Id;

    const CATALOG: &str = r#"
[[master]]
type = "Link"
subtype = "Resistor"
class = "Resistor"
domain = "basic"
ports = 2
required-ports = [0, 1]

[master.fields]
"c00.Resistance" = "1.0"
"i00.Current" = "0"

[[master]]
type = "Link"
subtype = "Jumper"
domain = "basic"
ports = 2
plug-ports = [1]

[[master]]
type = "Spotter"
subtype = "Gauge"
"#;

    #[test]
    fn test_catalog_from_toml() {
        let catalog: MasterCatalog = toml::from_str(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);

        let resistor = catalog.master_for(MasterKind::Link, "Resistor").unwrap();
        assert_eq!(resistor.domain(), Some(Domain::Basic));
        assert_eq!(resistor.ports(), 2);
        assert_eq!(resistor.required_ports(), &[0, 1]);
        assert_eq!(
            resistor.fields().keys().collect::<Vec<_>>(),
            vec!["c00.Resistance", "i00.Current"]
        );

        let jumper = catalog.master_for(MasterKind::Link, "Jumper").unwrap();
        assert!(jumper.is_plug_port(1));
        assert!(!jumper.is_plug_port(0));

        assert!(catalog.master_for(MasterKind::Spotter, "Gauge").is_some());
        assert!(catalog.master_for(MasterKind::Link, "Gauge").is_none());
    }

    #[test]
    fn test_duplicate_master_rejected() {
        let records = vec![
            MasterRecord::new(MasterKind::Link, "Pipe"),
            MasterRecord::new(MasterKind::Link, "Pipe"),
        ];
        let err = MasterCatalog::from_records(records).unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateMaster {
                kind: MasterKind::Link,
                subtype: "Pipe".to_string()
            }
        );
    }

    #[test]
    fn test_master_for_shape_prefers_class() {
        let catalog = MasterCatalog::from_records(vec![
            MasterRecord::new(MasterKind::Link, "Valve"),
            MasterRecord::new(MasterKind::Link, "CheckValve").with_class("Valve", Some("check")),
        ])
        .unwrap();

        let by_class = ShapeType::new(Id::new("Valve")).with_class(Id::new("Valve"), Some(Id::new("check")));
        assert_eq!(
            catalog
                .master_for_shape(MasterKind::Link, &by_class)
                .map(MasterRecord::subtype),
            Some("CheckValve")
        );

        let by_subtype = ShapeType::new(Id::new("Valve"));
        assert_eq!(
            catalog
                .master_for_shape(MasterKind::Link, &by_subtype)
                .map(MasterRecord::subtype),
            Some("Valve")
        );
    }

    #[test]
    fn test_master_for_element() {
        let catalog =
            MasterCatalog::from_records(vec![MasterRecord::new(MasterKind::Spotter, "Probe")]).unwrap();
        let spotter = Element::new(
            Id::new("library-spotter"),
            ElementKind::Spotter(ShapeType::new(Id::new("Probe"))),
        );
        let plain = Element::new(Id::new("library-plain"), ElementKind::Plain);

        assert!(catalog.master_for_element(&spotter).is_some());
        assert!(catalog.master_for_element(&plain).is_none());
    }
}
