//! Property tests: random edit sequences on a small grid must always leave
//! every node resolved exactly as a from-scratch walk would resolve it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use proptest::prelude::*;
use voxel_network::network::propagation;
use voxel_network::{
    BlockNodeTemplate, Coordinate, DynamicBits, Edge, Face, MemoryNodeAccessor, NetworkManager, NetworkType,
    Node, NodeAccessor, NodePos, PlacementFailure,
};

#[derive(Debug, Clone)]
enum EditOp {
    Place { x: i32, z: i32, mask: u8, source: bool },
    Break { x: i32, z: i32 },
}

fn edit() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        4 => (0i32..4, 0i32..4, 0u8..16, prop::bool::weighted(0.2))
            .prop_map(|(x, z, mask, source)| EditOp::Place { x, z, mask, source }),
        1 => (0i32..4, 0i32..4).prop_map(|(x, z)| EditOp::Break { x, z }),
    ]
}

fn template(manager: &NetworkManager, mask: u8, source: bool) -> Arc<BlockNodeTemplate> {
    let mut edges: Vec<String> = Face::HORIZONTALS
        .iter()
        .enumerate()
        .filter(|&(bit, _)| mask & (1 << bit) != 0)
        .map(|(_, face)| format!("\"{}\"", Edge::face_center(*face).code()))
        .collect();
    if source {
        edges.push("\"source\"".to_string());
    }
    let json = format!(r#"{{"nodes": [{{"network": "term", "edges": [{}]}}]}}"#, edges.join(", "));
    manager.parse_json(&json, DynamicBits::NONE).unwrap()
}

fn face_edges(world: &MemoryNodeAccessor, coord: Coordinate) -> Vec<Edge> {
    world
        .get_template(coord)
        .and_then(|template| template.node_template(0))
        .map(|node| node.face_edges().collect())
        .unwrap_or_default()
}

fn is_root(world: &MemoryNodeAccessor, coord: Coordinate) -> bool {
    world
        .get_template(coord)
        .and_then(|template| template.node_template(0))
        .is_some_and(|node| node.is_source)
}

/// Source and hop count of every voxel, derived from scratch.
fn expected(world: &MemoryNodeAccessor) -> HashMap<Coordinate, Option<(NodePos, u32)>> {
    let mut resolved = HashMap::new();
    let mut seen = HashSet::new();
    for start in world.coords() {
        if !seen.insert(start) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        while let Some(coord) = stack.pop() {
            component.push(coord);
            for edge in face_edges(world, coord) {
                if let Some((pos, _)) = world.neighbor(coord, NetworkType::Term, edge) {
                    if seen.insert(pos.coord) {
                        stack.push(pos.coord);
                    }
                }
            }
        }

        let roots: Vec<Coordinate> = component.iter().copied().filter(|coord| is_root(world, *coord)).collect();
        assert!(roots.len() <= 1, "component joins two sources: {roots:?}");
        let Some(&root) = roots.first() else {
            resolved.extend(component.into_iter().map(|coord| (coord, None)));
            continue;
        };

        let source = NodePos::new(root, 0);
        let mut queue = VecDeque::from([(root, 0u32)]);
        resolved.insert(root, Some((source, 0)));
        while let Some((coord, distance)) = queue.pop_front() {
            for edge in face_edges(world, coord) {
                if let Some((pos, _)) = world.neighbor(coord, NetworkType::Term, edge) {
                    if !resolved.contains_key(&pos.coord) {
                        resolved.insert(pos.coord, Some((source, distance + 1)));
                        queue.push_back((pos.coord, distance + 1));
                    }
                }
            }
        }
    }
    resolved
}

fn check(world: &MemoryNodeAccessor) -> Result<(), TestCaseError> {
    for (coord, want) in expected(world) {
        let node = world.node(coord, 0).unwrap_or_default();
        match want {
            None => {
                prop_assert_eq!(node, Node::default(), "voxel at {}", coord);
            }
            Some((source, distance)) => {
                prop_assert_eq!(node.source, Some(source), "voxel at {}", coord);
                prop_assert_eq!(node.distance, distance, "voxel at {}", coord);
                if distance == 0 {
                    prop_assert_eq!(node.parent, None);
                    continue;
                }
                let parent = node.parent.ok_or_else(|| TestCaseError::fail(format!("no parent at {coord}")))?;
                let (_, upstream) = world
                    .neighbor(coord, NetworkType::Term, parent)
                    .ok_or_else(|| TestCaseError::fail(format!("dangling parent at {coord}")))?;
                prop_assert_eq!(upstream.source, Some(source));
                prop_assert_eq!(upstream.distance, distance - 1);
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn random_edits_keep_sources_consistent(edits in prop::collection::vec(edit(), 1..48)) {
        let manager = NetworkManager::default();
        let mut world = MemoryNodeAccessor::new();
        for op in edits {
            match op {
                EditOp::Place { x, z, mask, source } => {
                    let coord = Coordinate::new(x, 0, z, 0);
                    if let Err(err) = manager.place_block(&mut world, coord, template(&manager, mask, source)) {
                        prop_assert_eq!(err.failure_code(), Some(PlacementFailure::ConflictingSources.code()));
                    }
                }
                EditOp::Break { x, z } => {
                    manager.break_block(&mut world, Coordinate::new(x, 0, z, 0));
                }
            }
            check(&world)?;
        }

        let seeds: Vec<NodePos> = world.coords().into_iter().map(|coord| NodePos::new(coord, 0)).collect();
        prop_assert_eq!(propagation::propagate(&mut world, seeds), 0);
    }

    #[test]
    fn equal_definitions_share_templates(mask in 0u8..16, source in any::<bool>()) {
        let manager = NetworkManager::default();
        let a = template(&manager, mask, source);
        let b = template(&manager, mask, source);
        prop_assert!(Arc::ptr_eq(&a, &b));
        prop_assert_eq!(manager.template_count(), 1);
    }
}
