//! # Voxel Network Model
//!
//! Pure data shared by every layer: coordinates, faces, edges, network
//! layers and node state. No I/O, no caches, no accessor calls here.

pub mod coord;
pub mod edge;
pub mod network;
pub mod node;

pub use coord::{Axis, Coordinate, Face};
pub use edge::Edge;
pub use network::{NetworkType, Scope};
pub use node::{Node, NodePos, INF_DISTANCE};
