//! Port decorations on host voxels.
//!
//! A port is a decoration on one face of a host voxel. Accepting it turns
//! the matching placeholder node of the host into a real node with one
//! face edge (and a source for `direct-out`). Occupancy is part of the
//! template's dynamic bits, so every occupancy combination is its own
//! cached template.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Coordinate, Face};
use crate::network::NetworkManager;
use crate::storage::NodeAccessor;
use crate::template::{BlockDefinition, DynamicBits, InventoryOptions, PortDirection, PortOption};
use crate::{Error, PlacementFailure, Result};

/// Port bookkeeping a host keeps per voxel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortState {
    /// One bit per face that carries a port.
    pub ported_sides: u8,
    /// Port direction per face, `DynamicBits::BITS_PER_FACE` bits each.
    pub occupied_ports: u32,
    /// Item count held by the host's inventory slot.
    #[serde(default)]
    pub inventory_count: u32,
}

impl PortState {
    pub fn is_ported(&self, face: Face) -> bool {
        self.ported_sides & face.flag() != 0
    }

    /// Template bits for this occupancy, keeping `base`'s connect faces.
    pub fn dynamic_bits(&self, base: DynamicBits) -> DynamicBits {
        DynamicBits {
            occupied_ports: self.occupied_ports,
            ..base
        }
    }
}

/// Port acceptance rules of one host, evaluated against its definition and
/// current port state.
#[derive(Debug, Clone, Copy)]
pub struct AcceptPort<'a> {
    definition: &'a BlockDefinition,
    state: PortState,
}

impl<'a> AcceptPort<'a> {
    pub fn new(definition: &'a BlockDefinition, state: PortState) -> Self {
        Self { definition, state }
    }

    pub fn state(&self) -> PortState {
        self.state
    }

    /// A port option is full once any of its faces carries a port.
    pub fn is_port_full(&self, option: &PortOption) -> bool {
        option.faces.iter().any(|&face| self.state.is_ported(face))
    }

    fn inventory_ports(&self) -> impl Iterator<Item = (usize, &'a PortOption)> + '_ {
        self.definition
            .ports
            .iter()
            .enumerate()
            .filter(move |(_, option)| option.inventory.is_some() && !self.is_port_full(option))
    }

    /// The first free port option with an inventory.
    pub fn inventory_port(&self) -> Option<usize> {
        self.inventory_ports().map(|(index, _)| index).next()
    }

    /// The free inventory port that takes over once the current one fills.
    pub fn next_inventory_port(&self) -> Option<usize> {
        self.inventory_ports().map(|(index, _)| index).nth(1)
    }

    pub fn inventory_options(&self) -> Option<&'a InventoryOptions> {
        let index = self.inventory_port()?;
        self.definition.ports[index].inventory.as_ref()
    }

    /// Checks everything about a new port that does not need the world:
    /// a port option on the face, an allowed direction, a free option, and
    /// room for the held items if this port would close the inventory.
    pub fn check(&self, face: Face, direction: PortDirection) -> std::result::Result<(usize, &'a PortOption), PlacementFailure> {
        let (index, option) = self
            .definition
            .port_for_face(face)
            .ok_or(PlacementFailure::NoPortHere)?;
        if !option.directions.contains(&direction) {
            return Err(PlacementFailure::WrongDirection);
        }
        if self.is_port_full(option) {
            return Err(PlacementFailure::PortFull);
        }
        if self.inventory_port() == Some(index) && self.state.inventory_count > 0 {
            let capacity = self
                .next_inventory_port()
                .and_then(|next| self.definition.ports[next].inventory.as_ref())
                .map_or(0, |inventory| inventory.max_slot_stack_size);
            if capacity < self.state.inventory_count {
                return Err(PlacementFailure::PortInventoryFull);
            }
        }
        Ok((index, option))
    }
}

/// Attaches a port with `direction` to `face` of the host at `coord`.
///
/// On success the decoration is set, the port state and template are
/// updated, and the new port node is connected. On refusal nothing
/// changes.
pub fn set_port<A>(
    manager: &NetworkManager,
    accessor: &mut A,
    coord: Coordinate,
    face: Face,
    direction: PortDirection,
) -> Result<()>
where
    A: NodeAccessor + ?Sized,
{
    let template = accessor
        .get_template(coord)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("no block at {coord}")))?;
    let state = accessor
        .port_state(coord)
        .ok_or(PlacementFailure::DoesNotAcceptPorts)?;
    let definition = template.definition().clone();
    let host = AcceptPort::new(&definition, state);
    let (option_index, _) = host.check(face, direction)?;

    let bits = template.bits().with_port(face, direction);
    let next = manager.reparse(&template, bits)?;
    next.can_place(accessor, coord)?;
    if !accessor.set_decor(coord, face, direction) {
        return Err(PlacementFailure::ExistingDecorInPlace.into());
    }

    let previous_inventory = host.inventory_port();
    let updated = PortState {
        ported_sides: state.ported_sides | face.flag(),
        occupied_ports: bits.occupied_ports,
        ..state
    };
    accessor.set_port_state(coord, updated);

    let node_id = definition.nodes.len() + option_index;
    debug!(%coord, %face, ?direction, node_id, "port accepted");
    // A new port always changes the voxel's key; the swap only reports
    // changes to the node key.
    if !manager.swap_template(accessor, coord, next, &[node_id])? {
        accessor.key_changed(coord);
    }
    if AcceptPort::new(&definition, updated).inventory_port() != previous_inventory {
        accessor.inventory_changed(coord);
    }
    Ok(())
}

/// Places a port decoration on `face` of the voxel at `host`. Voxels that
/// are missing or have no port bookkeeping refuse with
/// `doesnotacceptports`.
pub fn place_port<A>(
    manager: &NetworkManager,
    accessor: &mut A,
    host: Coordinate,
    face: Face,
    direction: PortDirection,
) -> Result<()>
where
    A: NodeAccessor + ?Sized,
{
    if accessor.get_block(host).is_none() || accessor.port_state(host).is_none() {
        return Err(PlacementFailure::DoesNotAcceptPorts.into());
    }
    set_port(manager, accessor, host, face, direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn definition() -> BlockDefinition {
        BlockDefinition::from_json(
            r#"{"ports": [
                {"name": "a", "network": "term", "directions": ["direct-in"],
                 "faces": ["north", "south"], "inventory": {"maxSlotStackSize": 1}},
                {"name": "b", "network": "term", "directions": ["direct-in"],
                 "faces": ["east"], "inventory": {"maxSlotStackSize": 4}},
                {"name": "c", "network": "term", "directions": ["direct-out"], "faces": ["up"]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_check_order() {
        let definition = definition();
        let host = AcceptPort::new(&definition, PortState::default());
        assert_eq!(host.check(Face::Down, PortDirection::DirectIn), Err(PlacementFailure::NoPortHere));
        assert_eq!(host.check(Face::Up, PortDirection::DirectIn), Err(PlacementFailure::WrongDirection));
        assert_eq!(host.check(Face::Up, PortDirection::DirectOut).map(|(i, _)| i), Ok(2));

        let ported = PortState {
            ported_sides: Face::North.flag(),
            ..PortState::default()
        };
        let host = AcceptPort::new(&definition, ported);
        assert_eq!(host.check(Face::South, PortDirection::DirectIn), Err(PlacementFailure::PortFull));
    }

    #[test]
    fn test_inventory_port_selection() {
        let definition = definition();
        let host = AcceptPort::new(&definition, PortState::default());
        assert_eq!(host.inventory_port(), Some(0));
        assert_eq!(host.next_inventory_port(), Some(1));
        assert_eq!(host.inventory_options().map(|o| o.max_slot_stack_size), Some(1));

        let full_a = PortState {
            ported_sides: Face::South.flag(),
            ..PortState::default()
        };
        let host = AcceptPort::new(&definition, full_a);
        assert_eq!(host.inventory_port(), Some(1));
        assert_eq!(host.next_inventory_port(), None);
    }

    #[test]
    fn test_inventory_must_fit_next_port() {
        let definition = definition();
        let holding = PortState {
            inventory_count: 5,
            ..PortState::default()
        };
        let host = AcceptPort::new(&definition, holding);
        assert_eq!(host.check(Face::North, PortDirection::DirectIn), Err(PlacementFailure::PortInventoryFull));
        // Port `b` is not the active inventory port, so it may close freely.
        assert!(host.check(Face::East, PortDirection::DirectIn).is_ok());

        let fits = PortState {
            inventory_count: 4,
            ..PortState::default()
        };
        let host = AcceptPort::new(&definition, fits);
        assert!(host.check(Face::North, PortDirection::DirectIn).is_ok());
    }

    #[test]
    fn test_port_state_bits() {
        let state = PortState {
            ported_sides: Face::Up.flag(),
            occupied_ports: DynamicBits::NONE.with_port(Face::Up, PortDirection::DirectOut).occupied_ports,
            inventory_count: 0,
        };
        let bits = state.dynamic_bits(DynamicBits::NONE.with_connect_face(Face::West));
        assert_eq!(bits.port_direction(Face::Up), PortDirection::DirectOut);
        assert!(bits.has_connect_face(Face::West));
        assert!(state.is_ported(Face::Up));
        assert!(!state.is_ported(Face::Down));
    }
}
