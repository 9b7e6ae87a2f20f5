//! Parsed node layout of one fully resolved voxel configuration.

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{trace, warn};

use super::definition::{BlockDefinition, ConnectMode, PortDirection};
use super::node_template::NodeTemplate;
use super::persist::PersistedNodes;
use crate::model::{Coordinate, Edge, Face, NetworkType, Node, NodePos};
use crate::network::propagation;
use crate::storage::NodeAccessor;
use crate::{Error, PlacementFailure, Result};

/// Per-voxel configuration bits that select a template variant on top of
/// the static definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicBits {
    /// Port direction of every face, 3 bits per face in face index order.
    pub occupied_ports: u32,
    /// Face-center edges added to node 0, one bit per face.
    pub connect_faces: u8,
}

impl DynamicBits {
    pub const NONE: DynamicBits = DynamicBits {
        occupied_ports: 0,
        connect_faces: 0,
    };

    pub const BITS_PER_FACE: u32 = 3;
    const PORT_MASK: u32 = (1 << Self::BITS_PER_FACE) - 1;

    pub fn port_direction(&self, face: Face) -> PortDirection {
        let shift = face.index() as u32 * Self::BITS_PER_FACE;
        PortDirection::from_bits((self.occupied_ports >> shift) & Self::PORT_MASK)
    }

    /// Adds a port direction on `face`. Existing bits of the face are kept.
    pub fn with_port(mut self, face: Face, direction: PortDirection) -> Self {
        self.occupied_ports |= direction.bits() << (face.index() as u32 * Self::BITS_PER_FACE);
        self
    }

    pub fn with_connect_face(mut self, face: Face) -> Self {
        self.connect_faces |= face.flag();
        self
    }

    pub fn without_connect_face(mut self, face: Face) -> Self {
        self.connect_faces &= !face.flag();
        self
    }

    pub fn has_connect_face(&self, face: Face) -> bool {
        self.connect_faces & face.flag() != 0
    }
}

/// How a voxel type takes part in auto-connection, resolved once at parse
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connectivity {
    NotConnectable,
    /// Edges come from the definition; pairing only depends on neighbors.
    Fixed,
    /// Node 0 gains and loses face-center edges at runtime.
    Dynamic { directions: u8 },
}

/// Immutable node layout for one `(definition, dynamic bits)` pair.
#[derive(Debug)]
pub struct BlockNodeTemplate {
    definition: Arc<BlockDefinition>,
    bits: DynamicBits,
    nodes: Vec<NodeTemplate>,
    index: HashMap<(NetworkType, Edge), usize>,
    connectivity: Connectivity,
}

impl BlockNodeTemplate {
    /// Builds the layout. Port options contribute one node each; connect
    /// faces add edges to node 0.
    pub fn build(definition: Arc<BlockDefinition>, bits: DynamicBits) -> Result<Self> {
        let mut nodes: Vec<NodeTemplate> = Vec::with_capacity(definition.nodes.len() + definition.ports.len());
        let mut parents: Vec<Option<String>> = Vec::with_capacity(nodes.capacity());

        for (id, node_def) in definition.nodes.iter().enumerate() {
            let mut node = NodeTemplate::new(id, node_def.name.clone(), node_def.network);
            node.source_scope = node_def.source_scope;
            for edge in &node_def.edges {
                node.push_edge(*edge);
            }
            nodes.push(node);
            parents.push(node_def.parent.clone());
        }

        for port in &definition.ports {
            let mut node = NodeTemplate::new(nodes.len(), port.name.clone(), NetworkType::Placeholder);
            for face in &port.faces {
                match bits.port_direction(*face) {
                    PortDirection::DirectIn => {
                        node.network = port.network;
                        node.push_edge(Edge::face_center(*face));
                        break;
                    }
                    PortDirection::DirectOut => {
                        node.network = port.network;
                        node.push_edge(Edge::face_center(*face));
                        node.push_edge(Edge::Source);
                        break;
                    }
                    _ => {}
                }
            }
            nodes.push(node);
            parents.push(port.parent.clone());
        }

        if bits.connect_faces != 0 {
            if nodes.is_empty() {
                nodes.push(NodeTemplate::new(0, "default".into(), NetworkType::Scope));
                parents.push(None);
            }
            for face in Face::ALL {
                if bits.has_connect_face(face) {
                    nodes[0].push_edge(Edge::face_center(face));
                }
            }
        }

        for id in 0..nodes.len() {
            let Some(parent) = parents[id].as_deref() else {
                continue;
            };
            let parent_id = nodes
                .iter()
                .position(|node| node.name == parent)
                .ok_or_else(|| Error::Config(format!("unknown parent node '{parent}'")))?;
            nodes[id].parent_id = Some(parent_id);
            nodes[parent_id].child_ids.push(id);
        }

        let mut index = HashMap::new();
        for node in &nodes {
            for edge in &node.edges {
                if index.insert((node.network, *edge), node.id).is_some() {
                    return Err(Error::Config(format!(
                        "more than one {} node owns edge {edge}",
                        node.network
                    )));
                }
            }
        }

        let connectivity = match definition.connect_mode() {
            None => Connectivity::NotConnectable,
            Some(ConnectMode::Fixed) => Connectivity::Fixed,
            Some(ConnectMode::Dynamic) => Connectivity::Dynamic {
                directions: bits.connect_faces,
            },
        };

        Ok(Self {
            definition,
            bits,
            nodes,
            index,
            connectivity,
        })
    }

    pub fn definition(&self) -> &Arc<BlockDefinition> {
        &self.definition
    }

    pub fn bits(&self) -> DynamicBits {
        self.bits
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[NodeTemplate] {
        &self.nodes
    }

    pub fn node_template(&self, id: usize) -> Option<&NodeTemplate> {
        self.nodes.get(id)
    }

    /// The node owning `edge` on `network`, if any.
    pub fn get_node_template(&self, network: NetworkType, edge: Edge) -> Option<&NodeTemplate> {
        self.index.get(&(network, edge)).map(|&id| &self.nodes[id])
    }

    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name == name)
    }

    pub fn contains_network(&self, network: NetworkType) -> bool {
        self.nodes.iter().any(|node| node.network == network)
    }

    /// Number of distinct networks that pair across `face` with `neighbor`,
    /// which sits on the other side of that face.
    pub fn pairable_network_count(&self, face: Face, neighbor: &BlockNodeTemplate) -> usize {
        let mut used = 0u32;
        for &(network, edge) in self.index.keys() {
            if edge.face() != Some(face) {
                continue;
            }
            let Some(opposite) = edge.opposite() else {
                continue;
            };
            if neighbor.index.contains_key(&(network, opposite)) {
                used |= network.flag();
            }
        }
        used.count_ones() as usize
    }

    /// Fresh node array with every root already resolved to itself.
    pub fn create_nodes(&self, coord: Coordinate) -> Vec<Node> {
        let mut nodes = vec![Node::default(); self.count()];
        self.set_source_scope(coord, &mut nodes);
        nodes
    }

    /// Resets root nodes to their own position and scope.
    pub fn set_source_scope(&self, coord: Coordinate, nodes: &mut [Node]) {
        for template in self.nodes.iter().filter(|node| node.is_source) {
            if let Some(node) = nodes.get_mut(template.id) {
                *node = Node::root(NodePos::new(coord, template.id), template.source_scope);
            }
        }
    }

    /// Read-only dry run of `on_placed`: refuses when any node would touch
    /// two different sources.
    pub fn can_place<A>(&self, accessor: &A, coord: Coordinate) -> std::result::Result<(), PlacementFailure>
    where
        A: NodeAccessor + ?Sized,
    {
        for template in &self.nodes {
            let mut source = template.is_source.then(|| NodePos::new(coord, template.id));
            for edge in template.face_edges() {
                let Some((_, neighbor)) = accessor.neighbor(coord, template.network, edge) else {
                    continue;
                };
                let Some(neighbor_source) = neighbor.source else {
                    continue;
                };
                match source {
                    None => source = Some(neighbor_source),
                    Some(existing) if existing != neighbor_source => {
                        trace!(%coord, %existing, %neighbor_source, "placement would merge sources");
                        return Err(PlacementFailure::ConflictingSources);
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Connects the freshly stored nodes at `coord` to their neighbors and
    /// propagates. Returns whether this voxel's node key changed.
    pub fn on_placed<A>(&self, accessor: &mut A, coord: Coordinate) -> bool
    where
        A: NodeAccessor + ?Sized,
    {
        let before = self.current_key(accessor, coord);
        let indices: Vec<usize> = (0..self.count()).collect();
        propagation::attach(accessor, coord, &indices);
        before != self.current_key(accessor, coord)
    }

    /// Re-derives the neighbors of nodes that were just removed from
    /// `coord`. The block must already be gone from the accessor.
    pub fn on_removed<A>(&self, accessor: &mut A, coord: Coordinate, nodes: &[Node])
    where
        A: NodeAccessor + ?Sized,
    {
        let connected = self
            .nodes
            .iter()
            .filter(|template| nodes.get(template.id).is_some_and(Node::is_connected))
            .map(|template| template.id);
        let starts = self.linked_neighbors(accessor, coord, connected);
        propagation::settle(accessor, starts);
    }

    /// Neighbor nodes that reciprocate an edge of any of `ids`.
    pub(crate) fn linked_neighbors<A>(
        &self,
        accessor: &A,
        coord: Coordinate,
        ids: impl IntoIterator<Item = usize>,
    ) -> Vec<NodePos>
    where
        A: NodeAccessor + ?Sized,
    {
        let mut linked = Vec::new();
        for id in ids {
            let Some(template) = self.nodes.get(id) else {
                continue;
            };
            for edge in template.face_edges() {
                if let Some((pos, _)) = accessor.neighbor(coord, template.network, edge) {
                    linked.push(pos);
                }
            }
        }
        linked
    }

    /// Folds every node's scope and connectedness into one key. A change in
    /// key means the voxel must be redrawn.
    pub fn node_key(&self, nodes: &[Node]) -> u64 {
        self.nodes.iter().fold(0u64, |key, template| {
            let node = nodes.get(template.id).copied().unwrap_or_default();
            let bits = (template.scope(nodes).bits() << 1) | u64::from(node.is_connected());
            key.rotate_left(4) ^ bits
        })
    }

    fn current_key<A>(&self, accessor: &A, coord: Coordinate) -> u64
    where
        A: NodeAccessor + ?Sized,
    {
        accessor
            .get_block(coord)
            .map(|(_, nodes)| self.node_key(nodes))
            .unwrap_or_default()
    }

    /// Serializable snapshot of a node array. `None` for empty layouts.
    pub fn to_persisted(&self, network: &str, nodes: &[Node]) -> Option<PersistedNodes> {
        if self.nodes.is_empty() {
            return None;
        }
        let saved = self
            .nodes
            .iter()
            .map(|template| nodes.get(template.id).copied().unwrap_or_default())
            .collect();
        Some(PersistedNodes {
            network: network.to_string(),
            nodes: saved,
        })
    }

    /// Restores `nodes` from a snapshot. Returns true when the caller must
    /// redraw: the array was resized, nothing was saved, or a value changed.
    pub fn from_persisted(
        &self,
        coord: Coordinate,
        persisted: Option<&PersistedNodes>,
        nodes: &mut Vec<Node>,
    ) -> bool {
        let mut refresh = false;
        if nodes.len() != self.count() {
            refresh = true;
            *nodes = vec![Node::default(); self.count()];
        }
        let Some(persisted) = persisted else {
            self.set_source_scope(coord, nodes);
            return true;
        };
        if persisted.nodes.len() != self.count() {
            warn!(
                %coord,
                saved = persisted.nodes.len(),
                expected = self.count(),
                "persisted node count disagrees with template"
            );
            refresh = true;
        }
        for (node, saved) in nodes.iter_mut().zip(&persisted.nodes) {
            refresh |= *node != *saved;
            *node = *saved;
        }
        self.set_source_scope(coord, nodes);
        refresh
    }

    /// Node ids of this template that declare a parent, paired with it.
    pub fn parent_links(&self) -> SmallVec<[(usize, usize); 4]> {
        self.nodes
            .iter()
            .filter_map(|node| node.parent_id.map(|parent| (node.id, parent)))
            .collect()
    }
}
