//! # Network Managers
//!
//! `NetworkManager` owns the template arena of one layer group and runs
//! every query and edit against a `NodeAccessor`. `propagation` holds the
//! graph walks; `NetworkSystem` groups the managers of a world session.

pub mod config;
pub mod manager;
pub mod propagation;
pub mod system;

pub use config::{LayerConfig, ManagerConfig, Side, SystemConfig};
pub use manager::{NetworkManager, PairState};
pub use system::{NetworkSystem, TERM_NETWORK, TOKEN_EMITTER};
