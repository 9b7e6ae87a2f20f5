//! # Templates
//!
//! `BlockDefinition` is what a voxel type declares; `BlockNodeTemplate` is
//! the parsed, immutable layout for one definition plus its dynamic bits.
//! Templates are built by `NetworkManager` and shared via `Arc`.

pub mod block;
pub mod definition;
pub mod node_template;
pub mod persist;

pub use block::{BlockNodeTemplate, Connectivity, DynamicBits};
pub use definition::{
    BlockDefinition, ConnectMode, ConnectOptions, InventoryOptions, NodeDefinition,
    PortDirection, PortOption,
};
pub use node_template::NodeTemplate;
pub use persist::PersistedNodes;
