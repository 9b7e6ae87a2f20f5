//! Source propagation over the node graph.
//!
//! Two walks keep every node's source consistent:
//!
//! - `propagate` spreads set sources outward from changed nodes. It only
//!   fills unset neighbors and shortens paths within the same source, so
//!   it is monotone and stops at a fixed point.
//! - `settle` recomputes whole components from their surviving roots. It
//!   runs after anything that can cut a path (removal, edge loss).
//!
//! Both walks are breadth first with a visited check; cycles are fine.

use std::collections::{HashMap, HashSet, VecDeque};

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::model::{Coordinate, Edge, NetworkType, Node, NodePos, Scope};
use crate::storage::NodeAccessor;

/// Template facts about one placed node, copied out of the accessor.
struct Shape {
    network: NetworkType,
    edges: SmallVec<[Edge; 4]>,
    is_source: bool,
    source_scope: Scope,
    node: Node,
}

fn shape<A>(accessor: &A, pos: NodePos) -> Option<Shape>
where
    A: NodeAccessor + ?Sized,
{
    let (template, nodes) = accessor.get_block(pos.coord)?;
    let node_template = template.node_template(pos.index)?;
    Some(Shape {
        network: node_template.network,
        edges: node_template.face_edges().collect(),
        is_source: node_template.is_source,
        source_scope: node_template.source_scope,
        node: nodes.get(pos.index).copied().unwrap_or_default(),
    })
}

fn write<A>(accessor: &mut A, pos: NodePos, node: Node)
where
    A: NodeAccessor + ?Sized,
{
    trace!(%pos, %node, "set node");
    accessor.set_node(pos.coord, pos.index, node);
}

/// State a neighbor reached through `edge` of `from` would take.
fn derived(from: &Node, edge: Edge) -> Node {
    Node {
        source: from.source,
        scope: from.scope,
        parent: edge.opposite(),
        distance: from.distance.saturating_add(1),
    }
}

/// Spreads sources from `seeds` until nothing changes. Returns the number
/// of node writes.
///
/// A neighbor already holding a different source is left alone: such a
/// meeting should have been refused before the connecting edge formed.
pub fn propagate<A>(accessor: &mut A, seeds: impl IntoIterator<Item = NodePos>) -> usize
where
    A: NodeAccessor + ?Sized,
{
    let mut queue: VecDeque<NodePos> = seeds.into_iter().collect();
    let mut changed = 0;
    while let Some(pos) = queue.pop_front() {
        let Some(current) = shape(accessor, pos) else {
            continue;
        };
        let Some(source) = current.node.source else {
            continue;
        };
        for edge in current.edges {
            let Some((neighbor_pos, neighbor)) = accessor.neighbor(pos.coord, current.network, edge) else {
                continue;
            };
            let mut candidate = derived(&current.node, edge);
            match neighbor.source {
                None => {}
                Some(existing) if existing == source => {
                    if neighbor.distance <= candidate.distance {
                        if neighbor.scope == candidate.scope {
                            continue;
                        }
                        candidate.parent = neighbor.parent;
                        candidate.distance = neighbor.distance;
                    }
                }
                Some(existing) => {
                    warn!(
                        from = %pos,
                        to = %neighbor_pos,
                        %source,
                        %existing,
                        "propagation met a foreign source"
                    );
                    continue;
                }
            }
            write(accessor, neighbor_pos, candidate);
            changed += 1;
            queue.push_back(neighbor_pos);
        }
    }
    changed
}

/// Connects nodes `indices` of the voxel at `coord` to their neighbors.
///
/// Unset non-root nodes adopt the closest sourced neighbor, then everything
/// spreads outward. Returns the number of node writes.
pub fn attach<A>(accessor: &mut A, coord: Coordinate, indices: &[usize]) -> usize
where
    A: NodeAccessor + ?Sized,
{
    let mut changed = 0;
    let mut seeds = Vec::with_capacity(indices.len());
    for &index in indices {
        let pos = NodePos::new(coord, index);
        let Some(current) = shape(accessor, pos) else {
            continue;
        };
        seeds.push(pos);
        if current.is_source || current.node.is_connected() {
            continue;
        }

        let mut best: Option<(Edge, Node)> = None;
        for &edge in &current.edges {
            let Some((_, neighbor)) = accessor.neighbor(coord, current.network, edge) else {
                continue;
            };
            if !neighbor.is_connected() {
                continue;
            }
            if let Some((_, chosen)) = &best {
                if chosen.source != neighbor.source {
                    warn!(%pos, "node touches two different sources");
                }
                if chosen.distance <= neighbor.distance {
                    continue;
                }
            }
            best = Some((edge, neighbor));
        }

        if let Some((edge, neighbor)) = best {
            let node = Node {
                source: neighbor.source,
                scope: neighbor.scope,
                parent: Some(edge),
                distance: neighbor.distance.saturating_add(1),
            };
            write(accessor, pos, node);
            changed += 1;
        }
    }
    changed + propagate(accessor, seeds)
}

/// Recomputes every component containing one of `starts` from scratch.
///
/// Each component is flooded through reciprocated edges, re-derived
/// breadth first from the roots it still contains, and cleared when it has
/// none. Only nodes whose state differs are written. Returns the number of
/// node writes.
pub fn settle<A>(accessor: &mut A, starts: impl IntoIterator<Item = NodePos>) -> usize
where
    A: NodeAccessor + ?Sized,
{
    let mut visited: HashSet<NodePos> = HashSet::new();
    let mut changed = 0;
    for start in starts {
        if visited.contains(&start) || shape(accessor, start).is_none() {
            continue;
        }

        let mut component = Vec::new();
        let mut roots = Vec::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(pos) = stack.pop() {
            let Some(current) = shape(accessor, pos) else {
                continue;
            };
            component.push(pos);
            if current.is_source {
                roots.push((pos, current.source_scope));
            }
            for edge in current.edges {
                if let Some((next, _)) = accessor.neighbor(pos.coord, current.network, edge) {
                    if visited.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }

        if roots.len() > 1 {
            warn!(
                %start,
                roots = roots.len(),
                "settled component joins several sources"
            );
        }

        let mut resolved: HashMap<NodePos, Node> = HashMap::with_capacity(component.len());
        let mut queue = VecDeque::new();
        for (pos, scope) in roots {
            resolved.insert(pos, Node::root(pos, scope));
            queue.push_back(pos);
        }
        while let Some(pos) = queue.pop_front() {
            let (Some(current), Some(node)) = (shape(accessor, pos), resolved.get(&pos).copied()) else {
                continue;
            };
            for edge in current.edges {
                if let Some((next, _)) = accessor.neighbor(pos.coord, current.network, edge) {
                    if !resolved.contains_key(&next) {
                        resolved.insert(next, derived(&node, edge));
                        queue.push_back(next);
                    }
                }
            }
        }

        trace!(%start, size = component.len(), sourced = resolved.len(), "settled component");
        for pos in component {
            let target = resolved.get(&pos).copied().unwrap_or_default();
            if accessor.get_node(pos.coord, pos.index) != Some(target) {
                write(accessor, pos, target);
                changed += 1;
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::Face;
    use crate::storage::MemoryNodeAccessor;
    use crate::template::{BlockDefinition, BlockNodeTemplate, DynamicBits};

    fn template(json: &str) -> Arc<BlockNodeTemplate> {
        let definition = Arc::new(BlockDefinition::from_json(json).unwrap());
        Arc::new(BlockNodeTemplate::build(definition, DynamicBits::NONE).unwrap())
    }

    fn put(world: &mut MemoryNodeAccessor, coord: Coordinate, template: &Arc<BlockNodeTemplate>) {
        world.put_block(coord, template.clone(), template.create_nodes(coord));
    }

    fn c(x: i32, y: i32, z: i32) -> Coordinate {
        Coordinate::new(x, y, z, 0)
    }

    #[test]
    fn test_attach_spreads_down_a_chain() {
        let root = template(r#"{"nodes": [{"network": "term", "edges": ["source", "east-center"]}]}"#);
        let relay = template(r#"{"nodes": [{"network": "term", "edges": ["west-center", "east-center"]}]}"#);
        let mut world = MemoryNodeAccessor::new();
        put(&mut world, c(1, 0, 0), &relay);
        put(&mut world, c(2, 0, 0), &relay);
        put(&mut world, c(0, 0, 0), &root);

        let changed = attach(&mut world, c(0, 0, 0), &[0]);
        assert_eq!(changed, 2);
        let far = world.node(c(2, 0, 0), 0).unwrap();
        assert_eq!(far.source, Some(NodePos::new(c(0, 0, 0), 0)));
        assert_eq!(far.distance, 2);
        assert_eq!(far.parent, Some(Edge::WestCenter));
        assert_eq!(far.scope, Scope::Function);
    }

    #[test]
    fn test_propagate_is_idempotent() {
        let root = template(r#"{"nodes": [{"network": "term", "edges": ["source", "up-center"]}]}"#);
        let relay = template(r#"{"nodes": [{"network": "term", "edges": ["down-center", "up-center"]}]}"#);
        let mut world = MemoryNodeAccessor::new();
        put(&mut world, c(0, 0, 0), &root);
        for y in 1..5 {
            put(&mut world, c(0, y, 0), &relay);
        }
        attach(&mut world, c(0, 0, 0), &[0]);
        let seeds: Vec<_> = (0..5).map(|y| NodePos::new(c(0, y, 0), 0)).collect();
        assert_eq!(propagate(&mut world, seeds.clone()), 0);
        assert_eq!(settle(&mut world, seeds), 0);
    }

    #[test]
    fn test_settle_clears_orphaned_component() {
        let relay = template(
            r#"{"nodes": [{"network": "term", "edges": ["north-center", "south-center"]}]}"#,
        );
        let mut world = MemoryNodeAccessor::new();
        let stale = Node {
            source: Some(NodePos::new(c(0, 0, -1), 0)),
            scope: Scope::Function,
            parent: Some(Edge::NorthCenter),
            distance: 1,
        };
        for z in 0..3 {
            world.put_block(c(0, 0, z), relay.clone(), vec![stale]);
        }
        let changed = settle(&mut world, [NodePos::new(c(0, 0, 0), 0)]);
        assert_eq!(changed, 3);
        for z in 0..3 {
            assert_eq!(world.node(c(0, 0, z), 0), Some(Node::default()));
        }
    }

    #[test]
    fn test_one_sided_edge_is_inert() {
        let root = template(r#"{"nodes": [{"network": "term", "edges": ["source", "south-center"]}]}"#);
        let deaf = template(r#"{"nodes": [{"network": "term", "edges": ["south-center"]}]}"#);
        let mut world = MemoryNodeAccessor::new();
        put(&mut world, c(0, 0, 0), &root);
        put(&mut world, c(0, 0, 0).offset(Face::South), &deaf);
        assert_eq!(attach(&mut world, c(0, 0, 0), &[0]), 0);
        assert_eq!(world.source(c(0, 0, 1), 0), None);
    }

    #[test]
    fn test_layers_do_not_leak() {
        let root = template(r#"{"nodes": [{"network": "term", "edges": ["source", "south-center"]}]}"#);
        let other = template(r#"{"nodes": [{"network": "match", "edges": ["north-center"]}]}"#);
        let mut world = MemoryNodeAccessor::new();
        put(&mut world, c(0, 0, 0), &root);
        put(&mut world, c(0, 0, 1), &other);
        attach(&mut world, c(0, 0, 0), &[0]);
        assert_eq!(world.source(c(0, 0, 1), 0), None);
    }
}
