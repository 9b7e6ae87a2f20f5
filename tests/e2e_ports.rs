//! End-to-end tests for port decorations on host voxels.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use voxel_network::connect::place_port;
use voxel_network::storage::ChangeEvent;
use voxel_network::{
    BlockNodeTemplate, Coordinate, DynamicBits, Face, MemoryNodeAccessor, NetworkManager, NetworkType,
    NodeAccessor, NodePos, PortDirection, PortState,
};

const HOST: &str = r#"{
    "nodes": [{"name": "body", "network": "scope", "edges": ["source"]}],
    "ports": [
        {"name": "in", "parent": "body", "network": "term",
         "directions": ["direct-in"], "faces": ["north"]},
        {"name": "out", "network": "term",
         "directions": ["direct-out", "passthrough-out"], "faces": ["south"]}
    ]
}"#;

const EMITTER: &str = r#"{"nodes": [{"network": "term", "edges": ["source", "south-center"]}]}"#;
const SINK: &str = r#"{"nodes": [{"network": "term", "edges": ["north-center"]}]}"#;

fn c(x: i32, y: i32, z: i32) -> Coordinate {
    Coordinate::new(x, y, z, 0)
}

struct Fixture {
    manager: NetworkManager,
    world: MemoryNodeAccessor,
    host: Coordinate,
}

fn fixture() -> Fixture {
    let manager = NetworkManager::default();
    let mut world = MemoryNodeAccessor::new();
    let host = c(0, 0, 0);
    let template = manager.parse_json(HOST, DynamicBits::NONE).unwrap();
    manager.place_block(&mut world, host, template).unwrap();
    world.enable_ports(host);
    Fixture { manager, world, host }
}

fn host_template(f: &Fixture) -> Arc<BlockNodeTemplate> {
    f.world.get_template(f.host).unwrap().clone()
}

#[test]
fn test_input_port_joins_neighbor_source() {
    let mut f = fixture();
    let emitter = f.manager.parse_json(EMITTER, DynamicBits::NONE).unwrap();
    let upstream = f.host.offset(Face::North);
    f.manager.place_block(&mut f.world, upstream, emitter).unwrap();
    assert_eq!(f.world.source(f.host, 1), None);

    place_port(&f.manager, &mut f.world, f.host, Face::North, PortDirection::DirectIn).unwrap();

    let template = host_template(&f);
    assert_eq!(template.bits().port_direction(Face::North), PortDirection::DirectIn);
    assert_eq!(template.node_template(1).unwrap().network, NetworkType::Term);
    assert_eq!(f.world.source(f.host, 1), Some(NodePos::new(upstream, 0)));
    assert_eq!(f.world.decor(f.host, Face::North), Some(PortDirection::DirectIn));
    assert!(f.world.port_state(f.host).unwrap().is_ported(Face::North));
    assert!(f.world.events().contains(&ChangeEvent::KeyChanged(f.host)));
}

#[test]
fn test_output_port_becomes_source() {
    let mut f = fixture();
    place_port(&f.manager, &mut f.world, f.host, Face::South, PortDirection::DirectOut).unwrap();
    let out = NodePos::new(f.host, 2);
    assert_eq!(f.world.source(f.host, 2), Some(out));

    let sink = f.manager.parse_json(SINK, DynamicBits::NONE).unwrap();
    let downstream = f.host.offset(Face::South);
    f.manager.place_block(&mut f.world, downstream, sink).unwrap();
    assert_eq!(f.world.source(downstream, 0), Some(out));
    assert_eq!(f.manager.downstream(&f.world, out), vec![NodePos::new(downstream, 0)]);
}

#[test]
fn test_port_reports_key_change_once() {
    let key_changes = |world: &MemoryNodeAccessor| {
        world
            .events()
            .iter()
            .filter(|event| matches!(event, ChangeEvent::KeyChanged(_)))
            .count()
    };

    // Unsourced input: the node key stays the same.
    let mut f = fixture();
    f.world.drain_events();
    place_port(&f.manager, &mut f.world, f.host, Face::North, PortDirection::DirectIn).unwrap();
    assert_eq!(key_changes(&f.world), 1);

    // Output: the port node becomes a source and the node key moves.
    let mut f = fixture();
    f.world.drain_events();
    place_port(&f.manager, &mut f.world, f.host, Face::South, PortDirection::DirectOut).unwrap();
    assert_eq!(key_changes(&f.world), 1);
}

#[test]
fn test_refusals_report_codes_and_change_nothing() {
    let mut f = fixture();
    let before = host_template(&f);

    let code = |result: voxel_network::Result<()>| result.unwrap_err().failure_code();
    assert_eq!(
        code(place_port(&f.manager, &mut f.world, f.host, Face::Up, PortDirection::DirectIn)),
        Some("noporthere")
    );
    assert_eq!(
        code(place_port(&f.manager, &mut f.world, f.host, Face::North, PortDirection::DirectOut)),
        Some("wrongdirection")
    );
    assert_eq!(
        code(place_port(&f.manager, &mut f.world, c(9, 9, 9), Face::North, PortDirection::DirectIn)),
        Some("doesnotacceptports")
    );
    assert!(Arc::ptr_eq(&host_template(&f), &before));

    place_port(&f.manager, &mut f.world, f.host, Face::North, PortDirection::DirectIn).unwrap();
    assert_eq!(
        code(place_port(&f.manager, &mut f.world, f.host, Face::North, PortDirection::DirectIn)),
        Some("portfull")
    );
}

#[test]
fn test_existing_decor_blocks_port() {
    let mut f = fixture();
    let before = host_template(&f);
    assert!(f.world.set_decor(f.host, Face::South, PortDirection::PassthroughOut));

    let err = place_port(&f.manager, &mut f.world, f.host, Face::South, PortDirection::DirectOut).unwrap_err();
    assert_eq!(err.failure_code(), Some("existingdecorinplace"));
    assert!(Arc::ptr_eq(&host_template(&f), &before));
    assert_eq!(f.world.port_state(f.host), Some(PortState::default()));
}

#[test]
fn test_plain_voxel_does_not_accept_ports() {
    let manager = NetworkManager::default();
    let mut world = MemoryNodeAccessor::new();
    let sink = manager.parse_json(SINK, DynamicBits::NONE).unwrap();
    manager.place_block(&mut world, c(0, 0, 0), sink).unwrap();
    let err = place_port(&manager, &mut world, c(0, 0, 0), Face::North, PortDirection::DirectIn).unwrap_err();
    assert_eq!(err.failure_code(), Some("doesnotacceptports"));
}

#[test]
fn test_inventory_port_change_is_reported() {
    let manager = NetworkManager::default();
    let mut world = MemoryNodeAccessor::new();
    let host = c(0, 0, 0);
    let template = manager
        .parse_json(
            r#"{"ports": [
                {"name": "slot", "network": "term", "directions": ["direct-in"],
                 "faces": ["east"], "inventory": {}},
                {"name": "spare", "network": "term", "directions": ["direct-in"],
                 "faces": ["west"], "inventory": {"maxSlotStackSize": 8}}
            ]}"#,
            DynamicBits::NONE,
        )
        .unwrap();
    manager.place_block(&mut world, host, template).unwrap();
    world.enable_ports(host);

    // Closing the spare port leaves the active inventory port alone.
    place_port(&manager, &mut world, host, Face::West, PortDirection::DirectIn).unwrap();
    assert!(!world.events().contains(&ChangeEvent::InventoryChanged(host)));

    place_port(&manager, &mut world, host, Face::East, PortDirection::DirectIn).unwrap();
    assert!(world.events().contains(&ChangeEvent::InventoryChanged(host)));
}

#[test]
fn test_held_items_must_fit_next_inventory_port() {
    let manager = NetworkManager::default();
    let mut world = MemoryNodeAccessor::new();
    let host = c(0, 0, 0);
    let template = manager
        .parse_json(
            r#"{"ports": [
                {"name": "slot", "network": "term", "directions": ["direct-in"],
                 "faces": ["east"], "inventory": {}},
                {"name": "spare", "network": "term", "directions": ["direct-in"],
                 "faces": ["west"], "inventory": {"maxSlotStackSize": 8}}
            ]}"#,
            DynamicBits::NONE,
        )
        .unwrap();
    manager.place_block(&mut world, host, template).unwrap();
    world.set_port_state(
        host,
        PortState {
            inventory_count: 9,
            ..PortState::default()
        },
    );

    let err = place_port(&manager, &mut world, host, Face::East, PortDirection::DirectIn).unwrap_err();
    assert_eq!(err.failure_code(), Some("portinventoryfull"));
}

#[test]
fn test_port_state_restores_same_template() {
    let mut f = fixture();
    let emitter = f.manager.parse_json(EMITTER, DynamicBits::NONE).unwrap();
    f.manager.place_block(&mut f.world, f.host.offset(Face::North), emitter).unwrap();
    place_port(&f.manager, &mut f.world, f.host, Face::North, PortDirection::DirectIn).unwrap();
    place_port(&f.manager, &mut f.world, f.host, Face::South, PortDirection::DirectOut).unwrap();

    let live = host_template(&f);
    let state_json = serde_json::to_string(&f.world.port_state(f.host).unwrap()).unwrap();
    let saved = f.manager.save_nodes(&f.world, f.host).unwrap();
    let saved_json = saved.to_json().unwrap();

    // Rebuild the host from its persisted form in a fresh world.
    let state: PortState = serde_json::from_str(&state_json).unwrap();
    let base = f.manager.parse_json(HOST, DynamicBits::NONE).unwrap();
    let restored = f.manager.reparse(&base, state.dynamic_bits(base.bits())).unwrap();
    assert!(Arc::ptr_eq(&restored, &live));

    let mut fresh = MemoryNodeAccessor::new();
    let persisted = voxel_network::template::PersistedNodes::from_json(&saved_json).unwrap();
    assert!(f.manager.load_nodes(&mut fresh, f.host, restored.clone(), Some(&persisted)));
    assert_eq!(fresh.nodes(f.host), f.world.nodes(f.host));
    assert_eq!(
        restored.node_key(fresh.nodes(f.host).unwrap()),
        live.node_key(f.world.nodes(f.host).unwrap())
    );
}
