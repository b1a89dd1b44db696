//! Resolved network model.
//!
//! These types are the output of compilation: plain, serializable data that an
//! external renderer turns into simulation source code. Nothing in here points
//! back into the diagram.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::element::{Domain, Fields, InterfaceRecord, SuperPort};

/// What one port slot of a link is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortTarget {
    /// A numbered node of the network.
    Node(u32),
    /// The ground boundary.
    Ground,
    /// A synthesized socket list (jumper plug ports).
    SocketList(String),
}

impl PortTarget {
    /// Number written for a Ground slot.
    pub const GROUND_NUMBER: i64 = -1;

    /// The node number of the slot, with Ground as `-1`. Socket lists have none.
    pub fn number(&self) -> Option<i64> {
        match self {
            PortTarget::Node(node) => Some(i64::from(*node)),
            PortTarget::Ground => Some(Self::GROUND_NUMBER),
            PortTarget::SocketList(_) => None,
        }
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, PortTarget::Ground)
    }
}

impl fmt::Display for PortTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortTarget::Node(node) => write!(f, "{node}"),
            PortTarget::Ground => write!(f, "{}", Self::GROUND_NUMBER),
            PortTarget::SocketList(name) => f.write_str(name),
        }
    }
}

impl Serialize for PortTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PortTarget::Node(node) => serializer.serialize_u32(*node),
            PortTarget::Ground => serializer.serialize_i64(Self::GROUND_NUMBER),
            PortTarget::SocketList(name) => serializer.serialize_str(name),
        }
    }
}

/// A numbered node of a resolved network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    pub number: u32,
    pub fields: Fields,
}

/// A link with its resolved port map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub name: String,
    pub subtype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub port_map: Vec<PortTarget>,
    pub fields: Fields,
}

/// A spotter (measurement shape) and its data fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotterRecord {
    pub name: String,
    pub subtype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub fields: Fields,
}

/// Socket list synthesized for a jumper plug port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketList {
    pub name: String,
    /// Label of the jumper link owning the plug.
    pub link: String,
    pub port: usize,
    /// Node the plug was drawn to.
    pub node: PortTarget,
}

/// Recorded boundary of a sub-network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceEntry {
    pub name: String,
    #[serde(flatten)]
    pub record: InterfaceRecord,
}

/// A compiled sub-network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub name: String,
    pub domain: Domain,
    pub nodes: Vec<NodeRecord>,
    /// Links in initialization order; jumper links come last.
    pub links: Vec<LinkRecord>,
    pub spotters: Vec<SpotterRecord>,
    pub socket_lists: Vec<SocketList>,
    pub interfaces: Vec<InterfaceEntry>,
}

impl Network {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link(&self, name: &str) -> Option<&LinkRecord> {
        self.links.iter().find(|link| link.name == name)
    }
}

/// One sub-network instance placed in a super-network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetInstance {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawing: Option<String>,
    /// First super-network node number owned by this instance.
    pub offset: usize,
    pub node_count: usize,
}

/// A super-network assembled from sub-network instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuperNetwork {
    pub name: String,
    pub node_count: usize,
    pub subnets: Vec<SubnetInstance>,
    pub super_ports: Vec<SuperPort>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_target_number() {
        assert_eq!(PortTarget::Node(4).number(), Some(4));
        assert_eq!(PortTarget::Ground.number(), Some(-1));
        assert_eq!(PortTarget::SocketList("J1_plug1".to_string()).number(), None);
        assert!(PortTarget::Ground.is_ground());
    }

    #[test]
    fn test_port_map_serializes_mixed() {
        #[derive(Serialize)]
        struct Wrapper {
            port_map: Vec<PortTarget>,
        }

        let wrapper = Wrapper {
            port_map: vec![
                PortTarget::Node(2),
                PortTarget::Ground,
                PortTarget::SocketList("J1_plug2".to_string()),
            ],
        };
        let text = toml::to_string(&wrapper).unwrap();
        assert_eq!(text.trim(), r#"port_map = [2, -1, "J1_plug2"]"#);
    }
}
