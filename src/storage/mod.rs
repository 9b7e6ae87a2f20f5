//! # Node Accessor
//!
//! The contract between the network engine and whatever stores per-voxel
//! data. The engine never touches voxel storage any other way.
//!
//! ## Implementations
//!
//! | Accessor | Module | Description |
//! |----------|--------|-------------|
//! | `MemoryNodeAccessor` | `memory` | HashMap-backed, for tests and embedding |

pub mod memory;

use std::sync::Arc;

use crate::connect::PortState;
use crate::model::{Coordinate, Edge, Face, NetworkType, Node, NodePos};
use crate::template::{BlockNodeTemplate, NodeTemplate, PortDirection};

pub use memory::{ChangeEvent, MemoryNodeAccessor};

// ============================================================================
// NodeAccessor Trait
// ============================================================================

/// Read/write access to the node arrays of placed voxels.
///
/// One accessor serves one manager: a voxel holds a single template and
/// node array per accessor. Only `get_block`, `set_node`, `put_block` and
/// `take_block` are required; the hooks default to no-ops.
pub trait NodeAccessor {
    // ========================================================================
    // Required
    // ========================================================================

    /// Template and node array of the voxel at `coord`.
    fn get_block(&self, coord: Coordinate) -> Option<(&Arc<BlockNodeTemplate>, &[Node])>;

    /// Overwrites one node. Writes to missing voxels or indices are ignored.
    fn set_node(&mut self, coord: Coordinate, index: usize, node: Node);

    /// Stores a voxel, replacing whatever was there.
    fn put_block(&mut self, coord: Coordinate, template: Arc<BlockNodeTemplate>, nodes: Vec<Node>);

    /// Removes a voxel, handing back its template and nodes.
    fn take_block(&mut self, coord: Coordinate) -> Option<(Arc<BlockNodeTemplate>, Vec<Node>)>;

    // ========================================================================
    // Host hooks
    // ========================================================================

    /// The voxel's node key changed and it needs to be redrawn.
    fn key_changed(&mut self, _coord: Coordinate) {}

    /// The active inventory port of the voxel changed.
    fn inventory_changed(&mut self, _coord: Coordinate) {}

    /// Attaches a decoration to a face. Returns false when the face is
    /// already decorated.
    fn set_decor(&mut self, _coord: Coordinate, _face: Face, _direction: PortDirection) -> bool {
        true
    }

    /// Port bookkeeping of a port-accepting voxel. `None` means the voxel
    /// does not accept ports.
    fn port_state(&self, _coord: Coordinate) -> Option<PortState> {
        None
    }

    fn set_port_state(&mut self, _coord: Coordinate, _state: PortState) {}

    // ========================================================================
    // Provided lookups
    // ========================================================================

    fn get_template(&self, coord: Coordinate) -> Option<&Arc<BlockNodeTemplate>> {
        self.get_block(coord).map(|(template, _)| template)
    }

    fn get_node(&self, coord: Coordinate, index: usize) -> Option<Node> {
        self.get_block(coord)
            .and_then(|(_, nodes)| nodes.get(index).copied())
    }

    /// The node at `coord` that owns `edge` on `network`.
    fn get_node_by_edge(
        &self,
        coord: Coordinate,
        network: NetworkType,
        edge: Edge,
    ) -> Option<(&NodeTemplate, Node)> {
        let (template, nodes) = self.get_block(coord)?;
        let node_template = template.get_node_template(network, edge)?;
        let node = nodes.get(node_template.id).copied().unwrap_or_default();
        Some((node_template, node))
    }

    /// The node across `edge` from `coord` that reciprocates it, if any.
    fn neighbor(&self, coord: Coordinate, network: NetworkType, edge: Edge) -> Option<(NodePos, Node)> {
        let face = edge.face()?;
        let opposite = edge.opposite()?;
        let neighbor_coord = coord.offset(face);
        let (template, node) = self.get_node_by_edge(neighbor_coord, network, opposite)?;
        Some((NodePos::new(neighbor_coord, template.id), node))
    }
}
