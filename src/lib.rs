//! # voxel-network: Connectivity Networks over a Sparse Voxel Grid
//!
//! Nodes live at `(coordinate, index)` inside voxels, expose edges towards
//! the six neighboring voxels, and resolve to the root ("source") they are
//! reachable from. Edits are applied one voxel at a time and the engine
//! re-establishes every node's source incrementally.
//!
//! ## Design Principles
//!
//! 1. **Accessor-first**: `NodeAccessor` is the only way the engine reads or
//!    writes node state; the host owns storage
//! 2. **Immutable templates**: `BlockNodeTemplate` is parsed once per
//!    `(definition, dynamic bits)` and shared through `Arc`
//! 3. **Node is a value**: nodes never know their own coordinate; every
//!    operation receives `(manager, accessor, coordinate)` explicitly
//! 4. **Refuse, never repair**: two different sources are never allowed to
//!    meet, checked before an edge forms
//!
//! ## Quick Start
//!
//! ```rust
//! use voxel_network::{Coordinate, DynamicBits, MemoryNodeAccessor, NetworkManager, NodePos};
//!
//! # fn example() -> voxel_network::Result<()> {
//! let manager = NetworkManager::default();
//! let mut world = MemoryNodeAccessor::new();
//!
//! let emitter = manager.parse_json(
//!     r#"{"nodes": [{"network": "term", "edges": ["source", "south-center"]}]}"#, DynamicBits::NONE)?;
//! let relay = manager.parse_json(
//!     r#"{"nodes": [{"network": "term", "edges": ["north-center", "south-center"]}]}"#, DynamicBits::NONE)?;
//!
//! let a = Coordinate::new(0, 0, 0, 0);
//! let b = Coordinate::new(0, 0, 1, 0);
//! manager.place_block(&mut world, a, emitter)?;
//! manager.place_block(&mut world, b, relay)?;
//!
//! assert_eq!(world.source(b, 0), Some(NodePos::new(a, 0)));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Layers
//!
//! | Module | Contents |
//! |--------|----------|
//! | `model` | Coordinates, faces, edges, network layers, node state |
//! | `template` | Block definitions and parsed, cached node layouts |
//! | `storage` | `NodeAccessor` and the in-memory reference accessor |
//! | `network` | `NetworkManager`, propagation, configuration |
//! | `connect` | Auto-connect, port acceptance, orientation choice |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod template;
pub mod storage;
pub mod network;
pub mod connect;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Coordinate, Face, Edge, NetworkType, Scope,
    Node, NodePos, INF_DISTANCE,
};

// ============================================================================
// Re-exports: Templates
// ============================================================================

pub use template::{
    BlockDefinition, BlockNodeTemplate, Connectivity, DynamicBits,
    NodeTemplate, PortDirection, PortOption,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{NodeAccessor, MemoryNodeAccessor};

// ============================================================================
// Re-exports: Network
// ============================================================================

pub use network::{
    NetworkManager, NetworkSystem, ManagerConfig, SystemConfig, Side, PairState,
};

// ============================================================================
// Re-exports: Connect
// ============================================================================

pub use connect::{AcceptPort, AutoConnect, PortState, OrientOptions};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Placement refused: {0}")]
    Placement(#[from] PlacementFailure),
}

impl Error {
    /// Failure-reason code when this is an expected placement refusal.
    pub fn failure_code(&self) -> Option<&'static str> {
        match self {
            Error::Placement(failure) => Some(failure.code()),
            _ => None,
        }
    }
}

/// Expected, recoverable reasons an edit is refused. The node data is left
/// untouched whenever one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum PlacementFailure {
    #[error("the placement would connect two different sources")]
    ConflictingSources,

    #[error("no port can be attached to this face")]
    NoPortHere,

    #[error("the port option does not allow this direction")]
    WrongDirection,

    #[error("the port option is already occupied")]
    PortFull,

    #[error("the remaining inventory port cannot hold the current item")]
    PortInventoryFull,

    #[error("another decoration already occupies this face")]
    ExistingDecorInPlace,

    #[error("the target does not accept ports")]
    DoesNotAcceptPorts,
}

impl PlacementFailure {
    /// Stable failure-reason string.
    pub fn code(self) -> &'static str {
        match self {
            PlacementFailure::ConflictingSources => "conflictingsources",
            PlacementFailure::NoPortHere => "noporthere",
            PlacementFailure::WrongDirection => "wrongdirection",
            PlacementFailure::PortFull => "portfull",
            PlacementFailure::PortInventoryFull => "portinventoryfull",
            PlacementFailure::ExistingDecorInPlace => "existingdecorinplace",
            PlacementFailure::DoesNotAcceptPorts => "doesnotacceptports",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
