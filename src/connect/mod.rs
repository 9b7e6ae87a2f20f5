//! # Connection Policy
//!
//! Decides which edges may form when voxels are placed, decorated or
//! broken. Edge operations dispatch on the template's `Connectivity`:
//! fixed voxels only pair what their definition declares, dynamic voxels
//! grow and shrink the face edges of node 0.

pub mod auto;
pub mod orient;
pub mod port;

pub use auto::AutoConnect;
pub use orient::{OrientOptions, OrientationMode};
pub use port::{place_port, set_port, AcceptPort, PortState};

use tracing::trace;

use crate::model::{Coordinate, Edge, Face, NetworkType, NodePos};
use crate::network::{propagation, NetworkManager};
use crate::storage::NodeAccessor;
use crate::template::Connectivity;
use crate::Result;

/// What the player did when placing a voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Face of the existing voxel the player clicked.
    pub face: Face,
    /// Hit point inside the clicked face, each axis in `0.0..=1.0`.
    pub hit_position: [f64; 3],
    /// Player yaw in radians.
    pub yaw: f32,
    pub sneaking: bool,
    /// The placed item asks for a single connection.
    pub single_connect: bool,
}

impl Placement {
    pub fn new(face: Face) -> Self {
        Self {
            face,
            hit_position: [0.5; 3],
            yaw: 0.0,
            sneaking: false,
            single_connect: false,
        }
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }

    pub fn with_hit(mut self, hit_position: [f64; 3]) -> Self {
        self.hit_position = hit_position;
        self
    }

    pub fn sneaking(mut self) -> Self {
        self.sneaking = true;
        self
    }

    pub fn single(mut self) -> Self {
        self.single_connect = true;
        self
    }
}

/// Whether the voxel at `coord` would take `edge` on `network`.
///
/// `None` is a refusal. Otherwise the inner value is the source the edge
/// would bring along, so callers can check it against the other side.
pub fn can_add_edge<A>(
    accessor: &A,
    coord: Coordinate,
    network: NetworkType,
    edge: Edge,
) -> Option<Option<NodePos>>
where
    A: NodeAccessor + ?Sized,
{
    let (template, nodes) = accessor.get_block(coord)?;
    match template.connectivity() {
        Connectivity::NotConnectable => None,
        Connectivity::Fixed => {
            let node = template.get_node_template(network, edge)?;
            Some(nodes.get(node.id).and_then(|node| node.source))
        }
        Connectivity::Dynamic { directions } => {
            let face = edge.face()?;
            let node = template.node_template(0)?;
            if node.network != network || directions & face.flag() != 0 {
                return None;
            }
            Some(nodes.first().and_then(|node| node.source))
        }
    }
}

/// Adds `edge` to the voxel at `coord`. Fixed voxels already own their
/// edges, so only propagation runs for them.
pub fn add_edge<A>(
    manager: &NetworkManager,
    accessor: &mut A,
    coord: Coordinate,
    network: NetworkType,
    edge: Edge,
) -> Result<()>
where
    A: NodeAccessor + ?Sized,
{
    let Some(template) = accessor.get_template(coord).cloned() else {
        return Ok(());
    };
    match template.connectivity() {
        Connectivity::NotConnectable => Ok(()),
        Connectivity::Fixed => {
            if let Some(node) = template.get_node_template(network, edge) {
                if manager.is_authority() {
                    propagation::attach(accessor, coord, &[node.id]);
                }
            }
            Ok(())
        }
        Connectivity::Dynamic { directions } => {
            let Some(face) = edge.face() else {
                return Ok(());
            };
            if directions & face.flag() != 0 {
                return Ok(());
            }
            trace!(%coord, %edge, "adding dynamic edge");
            let next = manager.reparse(&template, template.bits().with_connect_face(face))?;
            manager.swap_template(accessor, coord, next, &[0])?;
            Ok(())
        }
    }
}

/// Removes a dynamic edge from the voxel at `coord`. Fixed voxels keep
/// their edges.
pub fn remove_edge<A>(
    manager: &NetworkManager,
    accessor: &mut A,
    coord: Coordinate,
    network: NetworkType,
    edge: Edge,
) -> Result<()>
where
    A: NodeAccessor + ?Sized,
{
    let Some(template) = accessor.get_template(coord).cloned() else {
        return Ok(());
    };
    let Connectivity::Dynamic { directions } = template.connectivity() else {
        return Ok(());
    };
    let (Some(face), Some(node)) = (edge.face(), template.node_template(0)) else {
        return Ok(());
    };
    if node.network != network || directions & face.flag() == 0 {
        return Ok(());
    }
    trace!(%coord, %edge, "removing dynamic edge");
    let next = manager.reparse(&template, template.bits().without_connect_face(face))?;
    manager.swap_template(accessor, coord, next, &[0])?;
    Ok(())
}
