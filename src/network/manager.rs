//! The network manager: template arena plus graph queries and edits.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::config::{ManagerConfig, Side};
use super::propagation;
use crate::model::{Coordinate, Edge, Face, NetworkType, Node, NodePos};
use crate::storage::NodeAccessor;
use crate::template::{BlockDefinition, BlockNodeTemplate, DynamicBits, PersistedNodes};
use crate::{Error, Result};

// ============================================================================
// Pair state
// ============================================================================

/// How well a candidate template would connect across one face. Ordered
/// from worst to best.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PairState {
    #[default]
    Unpaired,
    Paired,
    PairedWithSource,
}

// ============================================================================
// Template arena
// ============================================================================

/// Structural cache key: definition content plus dynamic bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TemplateKey {
    definition: Arc<BlockDefinition>,
    bits: DynamicBits,
}

#[derive(Default)]
struct TemplateArena {
    templates: Vec<Arc<BlockNodeTemplate>>,
    by_key: HashMap<TemplateKey, usize>,
}

// ============================================================================
// NetworkManager
// ============================================================================

/// Owns the parsed templates of one world session and runs every graph
/// operation against a caller-supplied `NodeAccessor`.
///
/// Templates are never evicted; dropping the manager drops the arena.
pub struct NetworkManager {
    config: ManagerConfig,
    arena: RwLock<TemplateArena>,
}

impl Default for NetworkManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl std::fmt::Debug for NetworkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkManager")
            .field("config", &self.config)
            .field("templates", &self.template_count())
            .finish()
    }
}

impl NetworkManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            arena: RwLock::new(TemplateArena::default()),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Tag used for persisted node arrays.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_authority(&self) -> bool {
        self.config.side == Side::Authority
    }

    // ========================================================================
    // Template parsing
    // ========================================================================

    /// Memoized parse. Equal definitions with equal bits always return the
    /// same shared instance.
    pub fn parse_block_node_template(
        &self,
        definition: &Arc<BlockDefinition>,
        bits: DynamicBits,
    ) -> Result<Arc<BlockNodeTemplate>> {
        let key = TemplateKey {
            definition: definition.clone(),
            bits,
        };
        {
            let arena = self.arena.read();
            if let Some(&slot) = arena.by_key.get(&key) {
                trace!(slot, ?bits, "template cache hit");
                return Ok(arena.templates[slot].clone());
            }
        }

        definition.validate()?;
        let template = Arc::new(BlockNodeTemplate::build(definition.clone(), bits)?);

        let mut arena = self.arena.write();
        if let Some(&slot) = arena.by_key.get(&key) {
            return Ok(arena.templates[slot].clone());
        }
        let slot = arena.templates.len();
        arena.templates.push(template.clone());
        arena.by_key.insert(key, slot);
        debug!(
            manager = %self.config.name,
            slot,
            nodes = template.count(),
            ?bits,
            "parsed block node template"
        );
        Ok(template)
    }

    /// Parses a definition document, then the template for `bits`.
    pub fn parse_json(&self, json: &str, bits: DynamicBits) -> Result<Arc<BlockNodeTemplate>> {
        let definition = Arc::new(BlockDefinition::from_json(json)?);
        self.parse_block_node_template(&definition, bits)
    }

    /// The same definition with different bits. Used when a voxel's ports
    /// or connect faces change.
    pub fn reparse(&self, template: &BlockNodeTemplate, bits: DynamicBits) -> Result<Arc<BlockNodeTemplate>> {
        self.parse_block_node_template(template.definition(), bits)
    }

    pub fn template_count(&self) -> usize {
        self.arena.read().templates.len()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Source of the node at `coord` that reciprocates `edge`, where `edge`
    /// is the edge a querying neighbor would use to reach `coord`.
    ///
    /// `None` means there is no compatible node at all; `Some(None)` is a
    /// compatible node whose source is unset.
    pub fn get_source<A>(
        &self,
        accessor: &A,
        coord: Coordinate,
        network: NetworkType,
        edge: Edge,
    ) -> Option<Option<NodePos>>
    where
        A: NodeAccessor + ?Sized,
    {
        let opposite = edge.opposite()?;
        accessor
            .get_node_by_edge(coord, network, opposite)
            .map(|(_, node)| node.source)
    }

    pub fn is_block_in_network<A>(&self, accessor: &A, coord: Coordinate, network: NetworkType) -> bool
    where
        A: NodeAccessor + ?Sized,
    {
        accessor
            .get_template(coord)
            .is_some_and(|template| template.contains_network(network))
    }

    /// How each candidate would pair with the neighbor across `face` if it
    /// were placed at `coord`. One entry per candidate, in input order.
    pub fn pair_state<A>(
        &self,
        accessor: &A,
        candidates: &[Arc<BlockNodeTemplate>],
        coord: Coordinate,
        face: Face,
    ) -> Vec<PairState>
    where
        A: NodeAccessor + ?Sized,
    {
        candidates
            .iter()
            .map(|candidate| {
                let mut state = PairState::Unpaired;
                for node in candidate.nodes() {
                    for edge in node.face_edges().filter(|edge| edge.face() == Some(face)) {
                        if let Some((_, neighbor)) = accessor.neighbor(coord, node.network, edge) {
                            let paired = if neighbor.is_connected() {
                                PairState::PairedWithSource
                            } else {
                                PairState::Paired
                            };
                            state = state.max(paired);
                        }
                    }
                }
                state
            })
            .collect()
    }

    /// Clears candidates that pair no network with the neighbor across
    /// `face`, or fewer networks than the best candidate.
    pub fn remove_unpaired<A>(
        &self,
        accessor: &A,
        candidates: &mut [Option<Arc<BlockNodeTemplate>>],
        coord: Coordinate,
        face: Face,
    ) where
        A: NodeAccessor + ?Sized,
    {
        let Some(neighbor) = accessor.get_template(coord.offset(face)) else {
            candidates.iter_mut().for_each(|slot| *slot = None);
            return;
        };
        let mut max = 1;
        for i in 0..candidates.len() {
            let Some(candidate) = &candidates[i] else {
                continue;
            };
            let pairable = candidate.pairable_network_count(face, neighbor);
            if pairable < max {
                candidates[i] = None;
            } else if pairable > max {
                max = pairable;
                candidates[..i].iter_mut().for_each(|slot| *slot = None);
            }
        }
    }

    /// Neighbor nodes whose parent edge points back at `pos`.
    pub fn downstream<A>(&self, accessor: &A, pos: NodePos) -> Vec<NodePos>
    where
        A: NodeAccessor + ?Sized,
    {
        let Some(node_template) = accessor
            .get_template(pos.coord)
            .and_then(|template| template.node_template(pos.index))
        else {
            return Vec::new();
        };
        node_template
            .face_edges()
            .filter_map(|edge| {
                let (neighbor_pos, neighbor) = accessor.neighbor(pos.coord, node_template.network, edge)?;
                (neighbor.parent == edge.opposite()).then_some(neighbor_pos)
            })
            .collect()
    }

    /// Walks the tree hanging off the source at `root`, depth first, each
    /// node before its children and siblings in `downstream` order.
    ///
    /// Empty when `root` is not a source. Nodes are listed once even when
    /// parent edges loop.
    pub fn emit<A>(&self, accessor: &A, root: NodePos) -> Vec<NodePos>
    where
        A: NodeAccessor + ?Sized,
    {
        let is_root = accessor
            .get_node(root.coord, root.index)
            .is_some_and(|node| node.source == Some(root));
        if !is_root {
            return Vec::new();
        }

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(pos) = stack.pop() {
            if !seen.insert(pos) {
                continue;
            }
            order.push(pos);
            let children = self.downstream(accessor, pos);
            stack.extend(children.into_iter().rev().filter(|child| {
                accessor
                    .get_node(child.coord, child.index)
                    .is_some_and(|node| node.source == Some(root))
            }));
        }
        trace!(%root, emitted = order.len(), "emitted tree");
        order
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Writes one node through the accessor.
    pub fn set_node<A>(&self, accessor: &mut A, coord: Coordinate, index: usize, node: Node)
    where
        A: NodeAccessor + ?Sized,
    {
        trace!(%coord, index, %node, "set node");
        accessor.set_node(coord, index, node);
    }

    /// Places a voxel and connects it.
    ///
    /// An occupied coordinate is broken first. When the placement is
    /// refused the previous voxel is put back.
    pub fn place_block<A>(&self, accessor: &mut A, coord: Coordinate, template: Arc<BlockNodeTemplate>) -> Result<()>
    where
        A: NodeAccessor + ?Sized,
    {
        let previous = self.break_block(accessor, coord);
        if self.is_authority() {
            if let Err(failure) = template.can_place(accessor, coord) {
                debug!(%coord, code = failure.code(), "placement refused");
                if let Some((old, _)) = previous {
                    self.install(accessor, coord, old);
                }
                return Err(failure.into());
            }
        }
        self.install(accessor, coord, template);
        Ok(())
    }

    fn install<A>(&self, accessor: &mut A, coord: Coordinate, template: Arc<BlockNodeTemplate>)
    where
        A: NodeAccessor + ?Sized,
    {
        let nodes = template.create_nodes(coord);
        accessor.put_block(coord, template.clone(), nodes);
        if self.is_authority() && template.on_placed(accessor, coord) {
            accessor.key_changed(coord);
        }
    }

    /// Removes a voxel and re-derives everything that depended on it.
    pub fn break_block<A>(&self, accessor: &mut A, coord: Coordinate) -> Option<(Arc<BlockNodeTemplate>, Vec<Node>)>
    where
        A: NodeAccessor + ?Sized,
    {
        let (template, nodes) = accessor.take_block(coord)?;
        if self.is_authority() {
            template.on_removed(accessor, coord, &nodes);
        }
        Some((template, nodes))
    }

    /// Replaces the template of a placed voxel. Nodes `indices` are treated
    /// as removed, reset and placed again; other nodes keep their state.
    /// Returns whether the voxel's node key changed.
    pub fn swap_template<A>(
        &self,
        accessor: &mut A,
        coord: Coordinate,
        template: Arc<BlockNodeTemplate>,
        indices: &[usize],
    ) -> Result<bool>
    where
        A: NodeAccessor + ?Sized,
    {
        let (old, mut nodes) = accessor
            .get_block(coord)
            .map(|(template, nodes)| (template.clone(), nodes.to_vec()))
            .ok_or_else(|| Error::NotFound(format!("no block at {coord}")))?;
        let before = old.node_key(&nodes);
        let mut starts = old.linked_neighbors(accessor, coord, indices.iter().copied());

        nodes.resize(template.count(), Node::default());
        for &index in indices {
            if let Some(node) = nodes.get_mut(index) {
                *node = Node::default();
            }
        }
        template.set_source_scope(coord, &mut nodes);
        accessor.put_block(coord, template.clone(), nodes);

        if self.is_authority() {
            starts.extend(
                indices
                    .iter()
                    .filter(|&&index| index < template.count())
                    .map(|&index| NodePos::new(coord, index)),
            );
            let changed = propagation::settle(accessor, starts);
            trace!(%coord, changed, "swapped template");
        }

        let after = accessor
            .get_block(coord)
            .map(|(_, nodes)| template.node_key(nodes))
            .unwrap_or_default();
        let key_changed = before != after;
        if key_changed {
            accessor.key_changed(coord);
        }
        Ok(key_changed)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Snapshot of the voxel's node array, tagged with this manager's name.
    pub fn save_nodes<A>(&self, accessor: &A, coord: Coordinate) -> Option<PersistedNodes>
    where
        A: NodeAccessor + ?Sized,
    {
        let (template, nodes) = accessor.get_block(coord)?;
        template.to_persisted(&self.config.name, nodes)
    }

    /// Restores a voxel from a snapshot without propagating. A snapshot
    /// written by another manager is ignored. Returns whether the voxel
    /// needs a redraw.
    pub fn load_nodes<A>(
        &self,
        accessor: &mut A,
        coord: Coordinate,
        template: Arc<BlockNodeTemplate>,
        persisted: Option<&PersistedNodes>,
    ) -> bool
    where
        A: NodeAccessor + ?Sized,
    {
        let persisted = persisted.filter(|saved| {
            let ours = saved.network == self.config.name;
            if !ours {
                warn!(%coord, found = %saved.network, expected = %self.config.name, "ignoring nodes saved by another network");
            }
            ours
        });
        let mut nodes = accessor
            .get_block(coord)
            .map(|(_, nodes)| nodes.to_vec())
            .unwrap_or_default();
        let refresh = template.from_persisted(coord, persisted, &mut nodes);
        accessor.put_block(coord, template, nodes);
        if refresh {
            accessor.key_changed(coord);
        }
        refresh
    }
}
