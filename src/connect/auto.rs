//! Auto-connection of freshly placed voxels.

use std::sync::Arc;

use tracing::debug;

use super::{add_edge, can_add_edge, remove_edge, Placement};
use crate::model::{Coordinate, Edge, Face, NetworkType, NodePos};
use crate::network::NetworkManager;
use crate::storage::NodeAccessor;
use crate::template::{BlockNodeTemplate, ConnectOptions};
use crate::Result;

/// Forms edges between a placed voxel and its neighbors on the configured
/// networks. A refused edge never fails the placement itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoConnect {
    options: ConnectOptions,
}

fn conflicting(a: Option<NodePos>, b: Option<NodePos>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a != b)
}

impl AutoConnect {
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }

    /// The behavior declared by the template's definition, if any.
    pub fn for_template(template: &BlockNodeTemplate) -> Option<Self> {
        template.definition().connect.clone().map(Self::new)
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Places `template` at `coord`, then connects it: first on the
    /// preferred face, then on every other face unless single-connect.
    ///
    /// The preferred face is the one facing the clicked voxel. When that
    /// voxel is on none of the networks, the player's horizontal facing
    /// is used instead.
    pub fn place<A>(
        &self,
        manager: &NetworkManager,
        accessor: &mut A,
        coord: Coordinate,
        template: Arc<BlockNodeTemplate>,
        placement: &Placement,
    ) -> Result<()>
    where
        A: NodeAccessor + ?Sized,
    {
        manager.place_block(accessor, coord, template)?;

        let mut preferred = placement.face.opposite();
        let target = coord.offset(preferred);
        let in_network = self
            .options
            .networks
            .iter()
            .any(|&network| manager.is_block_in_network(accessor, target, network));
        if !in_network {
            preferred = Face::horizontal_from_yaw(placement.yaw);
        }

        self.try_add_edges(manager, accessor, coord, preferred)?;
        if !self.options.single_connect && !placement.single_connect {
            for face in Face::ALL {
                if face != preferred {
                    self.try_add_edges(manager, accessor, coord, face)?;
                }
            }
        }
        Ok(())
    }

    fn try_add_edges<A>(&self, manager: &NetworkManager, accessor: &mut A, coord: Coordinate, face: Face) -> Result<()>
    where
        A: NodeAccessor + ?Sized,
    {
        for &network in &self.options.networks {
            try_add_edge(manager, accessor, coord, network, Edge::face_center(face))?;
        }
        Ok(())
    }

    /// Drops edges whose neighbor stopped reciprocating, when configured.
    pub fn on_neighbor_change<A>(&self, manager: &NetworkManager, accessor: &mut A, coord: Coordinate) -> Result<()>
    where
        A: NodeAccessor + ?Sized,
    {
        if !self.options.disconnect_on_neighbor_change {
            return Ok(());
        }
        for face in Face::ALL {
            let edge = Edge::face_center(face);
            for &network in &self.options.networks {
                if manager.get_source(accessor, coord.offset(face), network, edge).is_none() {
                    remove_edge(manager, accessor, coord, network, edge)?;
                }
            }
        }
        Ok(())
    }

    /// Breaks the voxel at `coord` and, when configured, removes the edges
    /// its connectable neighbors had towards it.
    pub fn on_broken<A>(&self, manager: &NetworkManager, accessor: &mut A, coord: Coordinate) -> Result<()>
    where
        A: NodeAccessor + ?Sized,
    {
        manager.break_block(accessor, coord);
        if !self.options.disconnect_on_break {
            return Ok(());
        }
        for face in Face::ALL {
            let neighbor = coord.offset(face);
            for &network in &self.options.networks {
                remove_edge(manager, accessor, neighbor, network, Edge::face_center(face.opposite()))?;
            }
        }
        Ok(())
    }
}

/// Tries to connect `edge` of the voxel at `coord` on `network`.
///
/// Refuses when either side refuses the edge or when both sides already
/// resolve to different sources. Returns whether the edge was formed.
pub fn try_add_edge<A>(
    manager: &NetworkManager,
    accessor: &mut A,
    coord: Coordinate,
    network: NetworkType,
    edge: Edge,
) -> Result<bool>
where
    A: NodeAccessor + ?Sized,
{
    let (Some(face), Some(opposite)) = (edge.face(), edge.opposite()) else {
        return Ok(false);
    };
    let Some(source) = can_add_edge(accessor, coord, network, edge) else {
        return Ok(false);
    };
    let neighbor = coord.offset(face);
    match manager.get_source(accessor, neighbor, network, edge) {
        None => {
            let Some(neighbor_source) = can_add_edge(accessor, neighbor, network, opposite) else {
                return Ok(false);
            };
            if conflicting(source, neighbor_source) {
                debug!(%coord, %edge, "edge refused: conflicting sources");
                return Ok(false);
            }
            add_edge(manager, accessor, neighbor, network, opposite)?;
            add_edge(manager, accessor, coord, network, edge)?;
        }
        Some(neighbor_source) => {
            if conflicting(source, neighbor_source) {
                debug!(%coord, %edge, "edge refused: conflicting sources");
                return Ok(false);
            }
            add_edge(manager, accessor, coord, network, edge)?;
        }
    }
    Ok(true)
}
