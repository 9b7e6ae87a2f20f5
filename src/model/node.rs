//! Runtime node state.

use serde::{Deserialize, Serialize};

use super::coord::Coordinate;
use super::edge::Edge;
use super::network::Scope;

/// Distance of a node that no root reaches.
pub const INF_DISTANCE: u32 = u32::MAX;

/// Address of one node: a voxel plus the index into its node array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodePos {
    pub coord: Coordinate,
    pub index: usize,
}

impl NodePos {
    pub const fn new(coord: Coordinate, index: usize) -> Self {
        Self { coord, index }
    }
}

impl std::fmt::Display for NodePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.coord, self.index)
    }
}

/// Mutable state of one node. Pure value: it never knows where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Root this node resolves to, `None` when unreachable from any root.
    #[serde(default)]
    pub source: Option<NodePos>,
    #[serde(default)]
    pub scope: Scope,
    /// Edge of this node leading one hop closer to the source.
    #[serde(default)]
    pub parent: Option<Edge>,
    #[serde(default = "default_distance")]
    pub distance: u32,
}

fn default_distance() -> u32 {
    INF_DISTANCE
}

impl Default for Node {
    fn default() -> Self {
        Self {
            source: None,
            scope: Scope::None,
            parent: None,
            distance: INF_DISTANCE,
        }
    }
}

impl Node {
    /// State of a root node at `pos`.
    pub fn root(pos: NodePos, scope: Scope) -> Self {
        Self {
            source: Some(pos),
            scope,
            parent: None,
            distance: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    pub fn has_inf_distance(&self) -> bool {
        self.distance == INF_DISTANCE
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.source {
            Some(source) => write!(f, "source={source} scope={}", self.scope.code())?,
            None => write!(f, "source=unset scope={}", self.scope.code())?,
        }
        if let Some(parent) = self.parent {
            write!(f, " parent={parent}")?;
        }
        if !self.has_inf_distance() {
            write!(f, " distance={}", self.distance)?;
        }
        Ok(())
    }
}
