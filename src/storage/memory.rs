//! In-memory node accessor.
//!
//! This is the reference implementation of `NodeAccessor`. Voxels live in a
//! plain `HashMap`; every write is recorded as a `ChangeEvent` so callers can
//! observe what an edit touched.
//!
//! ## Limitations
//!
//! - **Single writer**: no interior locking, mutation needs `&mut self`.
//! - **Unbounded event log**: call `drain_events()` to release it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::connect::PortState;
use crate::model::{Coordinate, Face, Node, NodePos};
use crate::network::NetworkManager;
use crate::template::{BlockNodeTemplate, PortDirection};
use crate::{Error, Result};
use super::NodeAccessor;

// ============================================================================
// Events
// ============================================================================

/// Something observable that happened to the stored voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    BlockPlaced(Coordinate),
    BlockRemoved(Coordinate),
    NodeChanged(NodePos),
    KeyChanged(Coordinate),
    InventoryChanged(Coordinate),
}

// ============================================================================
// MemoryNodeAccessor
// ============================================================================

struct BlockEntry {
    template: Arc<BlockNodeTemplate>,
    nodes: Vec<Node>,
}

/// HashMap-backed voxel store.
#[derive(Default)]
pub struct MemoryNodeAccessor {
    blocks: HashMap<Coordinate, BlockEntry>,
    decors: HashMap<(Coordinate, Face), PortDirection>,
    ports: HashMap<Coordinate, PortState>,
    events: Vec<ChangeEvent>,
}

impl MemoryNodeAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        self.blocks.contains_key(&coord)
    }

    /// Occupied coordinates in ascending order.
    pub fn coords(&self) -> Vec<Coordinate> {
        let mut coords: Vec<_> = self.blocks.keys().copied().collect();
        coords.sort();
        coords
    }

    pub fn nodes(&self, coord: Coordinate) -> Option<&[Node]> {
        self.blocks.get(&coord).map(|entry| entry.nodes.as_slice())
    }

    pub fn node(&self, coord: Coordinate, index: usize) -> Option<Node> {
        self.get_node(coord, index)
    }

    /// Source of a node, `None` when the node is missing or unset.
    pub fn source(&self, coord: Coordinate, index: usize) -> Option<NodePos> {
        self.node(coord, index).and_then(|node| node.source)
    }

    /// Marks a voxel as a port host so `place_port` can reach it.
    pub fn enable_ports(&mut self, coord: Coordinate) {
        self.ports.entry(coord).or_default();
    }

    pub fn decor(&self, coord: Coordinate, face: Face) -> Option<PortDirection> {
        self.decors.get(&(coord, face)).copied()
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Lays out voxels from a top-down character map.
    ///
    /// The first character maps to `top_left`; moving right is east (+x),
    /// each new line is one step south (+z). Characters resolve through
    /// `legend`: `Some(template)` places it, `None` removes whatever is
    /// there. A character missing from the legend is a `Config` error.
    pub fn set_schematic(
        &mut self,
        manager: &NetworkManager,
        top_left: Coordinate,
        legend: &[(char, Option<Arc<BlockNodeTemplate>>)],
        schematic: &str,
    ) -> Result<()> {
        let mut pos = top_left;
        for c in schematic.chars() {
            match c {
                '\r' => continue,
                '\n' => {
                    pos.z += 1;
                    pos.x = top_left.x;
                    continue;
                }
                _ => {}
            }
            let (_, block) = legend
                .iter()
                .find(|(key, _)| *key == c)
                .ok_or_else(|| Error::Config(format!("schematic character '{c}' has no legend entry")))?;
            match block {
                Some(template) => manager.place_block(self, pos, template.clone())?,
                None => {
                    manager.break_block(self, pos);
                }
            }
            pos.x += 1;
        }
        Ok(())
    }
}

impl NodeAccessor for MemoryNodeAccessor {
    fn get_block(&self, coord: Coordinate) -> Option<(&Arc<BlockNodeTemplate>, &[Node])> {
        self.blocks
            .get(&coord)
            .map(|entry| (&entry.template, entry.nodes.as_slice()))
    }

    fn set_node(&mut self, coord: Coordinate, index: usize, node: Node) {
        let Some(slot) = self
            .blocks
            .get_mut(&coord)
            .and_then(|entry| entry.nodes.get_mut(index))
        else {
            return;
        };
        if *slot != node {
            *slot = node;
            self.events.push(ChangeEvent::NodeChanged(NodePos::new(coord, index)));
        }
    }

    fn put_block(&mut self, coord: Coordinate, template: Arc<BlockNodeTemplate>, nodes: Vec<Node>) {
        self.blocks.insert(coord, BlockEntry { template, nodes });
        self.events.push(ChangeEvent::BlockPlaced(coord));
    }

    fn take_block(&mut self, coord: Coordinate) -> Option<(Arc<BlockNodeTemplate>, Vec<Node>)> {
        let entry = self.blocks.remove(&coord)?;
        self.decors.retain(|(decor_coord, _), _| *decor_coord != coord);
        self.ports.remove(&coord);
        self.events.push(ChangeEvent::BlockRemoved(coord));
        Some((entry.template, entry.nodes))
    }

    fn key_changed(&mut self, coord: Coordinate) {
        self.events.push(ChangeEvent::KeyChanged(coord));
    }

    fn inventory_changed(&mut self, coord: Coordinate) {
        self.events.push(ChangeEvent::InventoryChanged(coord));
    }

    fn set_decor(&mut self, coord: Coordinate, face: Face, direction: PortDirection) -> bool {
        if self.decors.contains_key(&(coord, face)) {
            return false;
        }
        self.decors.insert((coord, face), direction);
        true
    }

    fn port_state(&self, coord: Coordinate) -> Option<PortState> {
        if !self.blocks.contains_key(&coord) {
            return None;
        }
        self.ports.get(&coord).copied()
    }

    fn set_port_state(&mut self, coord: Coordinate, state: PortState) {
        self.ports.insert(coord, state);
    }
}
