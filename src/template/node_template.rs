//! Immutable shape of one node inside a block template.

use smallvec::SmallVec;

use crate::model::{Edge, NetworkType, Node, Scope};

/// Static shape of one node: its layer, its edges and whether it is a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTemplate {
    /// Index into the owning block's node array.
    pub id: usize,
    pub name: String,
    pub network: NetworkType,
    pub edges: SmallVec<[Edge; 4]>,
    pub is_source: bool,
    /// Scope handed out when this node is a root.
    pub source_scope: Scope,
    pub parent_id: Option<usize>,
    pub child_ids: SmallVec<[usize; 2]>,
}

impl NodeTemplate {
    pub(crate) fn new(id: usize, name: String, network: NetworkType) -> Self {
        Self {
            id,
            name,
            network,
            edges: SmallVec::new(),
            is_source: false,
            source_scope: Scope::Function,
            parent_id: None,
            child_ids: SmallVec::new(),
        }
    }

    /// Appends an edge unless already present. `Edge::Source` marks a root.
    pub(crate) fn push_edge(&mut self, edge: Edge) {
        if self.edges.contains(&edge) {
            return;
        }
        if edge == Edge::Source {
            self.is_source = true;
        }
        self.edges.push(edge);
    }

    pub fn has_edge(&self, edge: Edge) -> bool {
        self.edges.contains(&edge)
    }

    /// Edges that lead to a neighbor voxel.
    pub fn face_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().copied().filter(|edge| edge.is_face_center())
    }

    /// Scope of this node given the current node array.
    pub fn scope(&self, nodes: &[Node]) -> Scope {
        if self.is_source {
            self.source_scope
        } else {
            nodes.get(self.id).map(|node| node.scope).unwrap_or_default()
        }
    }
}
