//! Declarative block definitions, as loaded from JSON.
//!
//! ```json
//! {
//!   "nodes": [{"name": "in", "network": "term", "edges": ["north-center"]}],
//!   "ports": [{"name": "out", "network": "term",
//!              "directions": ["direct-out"], "faces": ["south"]}],
//!   "connect": {"mode": "dynamic", "networks": ["term"]}
//! }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Edge, Face, NetworkType, Scope};
use crate::{Error, Result};

/// Static description of one voxel type's nodes and port options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDefinition {
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub ports: Vec<PortOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect: Option<ConnectOptions>,
}

impl BlockDefinition {
    /// Parses and validates a definition document.
    pub fn from_json(json: &str) -> Result<Self> {
        let definition: BlockDefinition = serde_json::from_str(json)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Checks names, parents and port faces. Edge collisions are only known
    /// once dynamic bits are applied, so the template build checks those.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let declared = self
            .nodes
            .iter()
            .map(|node| node.name.as_str())
            .chain(self.ports.iter().map(|port| port.name.as_str()));
        for name in declared {
            if !name.is_empty() && !names.insert(name) {
                return Err(Error::Config(format!("duplicate node name '{name}'")));
            }
        }

        let parents = self
            .nodes
            .iter()
            .filter_map(|node| node.parent.as_deref())
            .chain(self.ports.iter().filter_map(|port| port.parent.as_deref()));
        for parent in parents {
            if !names.contains(parent) {
                return Err(Error::Config(format!("unknown parent node '{parent}'")));
            }
        }

        let mut faces = HashSet::new();
        for port in &self.ports {
            for face in &port.faces {
                if !faces.insert(*face) {
                    return Err(Error::Config(format!(
                        "face {face} is claimed by more than one port option"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The port option bound to `face`, if any.
    pub fn port_for_face(&self, face: Face) -> Option<(usize, &PortOption)> {
        self.ports
            .iter()
            .enumerate()
            .find(|(_, port)| port.faces.contains(&face))
    }

    pub fn connect_mode(&self) -> Option<ConnectMode> {
        self.connect.as_ref().map(|connect| connect.mode)
    }
}

/// One node of a block definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default = "default_node_network")]
    pub network: NetworkType,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default = "default_source_scope")]
    pub source_scope: Scope,
}

fn default_node_network() -> NetworkType {
    NetworkType::Scope
}

fn default_source_scope() -> Scope {
    Scope::Function
}

impl NodeDefinition {
    pub fn new(network: NetworkType, edges: impl IntoIterator<Item = Edge>) -> Self {
        Self {
            name: String::new(),
            parent: None,
            network,
            edges: edges.into_iter().collect(),
            source_scope: Scope::Function,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Traffic direction of a port decoration. Encoded in 3 bits per face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortDirection {
    #[default]
    None = 0,
    DirectIn = 1,
    DirectOut = 2,
    PassthroughIn = 3,
    PassthroughOut = 4,
}

impl PortDirection {
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Decodes a 3-bit field. Unused values read as `None`.
    pub fn from_bits(bits: u32) -> PortDirection {
        match bits {
            1 => PortDirection::DirectIn,
            2 => PortDirection::DirectOut,
            3 => PortDirection::PassthroughIn,
            4 => PortDirection::PassthroughOut,
            _ => PortDirection::None,
        }
    }
}

/// A port slot a host voxel offers on one or more faces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub network: NetworkType,
    #[serde(default)]
    pub directions: Vec<PortDirection>,
    #[serde(default)]
    pub faces: Vec<Face>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryOptions>,
}

/// Inventory attached to a port option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryOptions {
    #[serde(default)]
    pub require_term: bool,
    #[serde(default)]
    pub require_constructor: bool,
    #[serde(default)]
    pub require_function: bool,
    #[serde(default = "default_max_slot_stack_size")]
    pub max_slot_stack_size: u32,
}

fn default_max_slot_stack_size() -> u32 {
    999_999
}

impl Default for InventoryOptions {
    fn default() -> Self {
        Self {
            require_term: false,
            require_constructor: false,
            require_function: false,
            max_slot_stack_size: default_max_slot_stack_size(),
        }
    }
}

/// Whether a connectable voxel's edges are fixed by its definition or
/// rewritten as neighbors come and go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectMode {
    #[default]
    Fixed,
    Dynamic,
}

/// Auto-connect behavior of a voxel type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    #[serde(default)]
    pub mode: ConnectMode,
    #[serde(default)]
    pub single_connect: bool,
    /// Drop an edge when the neighbor across it stops reciprocating.
    #[serde(default)]
    pub disconnect_on_neighbor_change: bool,
    /// Ask connectable neighbors to drop their edges towards a broken voxel.
    #[serde(default = "default_true")]
    pub disconnect_on_break: bool,
    #[serde(default = "default_connect_networks")]
    pub networks: Vec<NetworkType>,
}

fn default_true() -> bool {
    true
}

fn default_connect_networks() -> Vec<NetworkType> {
    vec![NetworkType::Term]
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            mode: ConnectMode::Fixed,
            single_connect: false,
            disconnect_on_neighbor_change: false,
            disconnect_on_break: true,
            networks: default_connect_networks(),
        }
    }
}
