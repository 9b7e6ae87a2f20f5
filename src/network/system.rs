//! One manager per configured layer group.

use tracing::debug;

use super::config::SystemConfig;
use super::manager::NetworkManager;
use crate::{Error, Result};

/// Behavior name of the layer group carrying term, scope and match nodes.
pub const TERM_NETWORK: &str = "TermNetwork";
/// Behavior name of the layer group carrying token nodes.
pub const TOKEN_EMITTER: &str = "TokenEmitter";

/// The managers of one world session, keyed by the voxel behavior that
/// hosts each layer group.
#[derive(Debug)]
pub struct NetworkSystem {
    managers: Vec<(String, NetworkManager)>,
}

impl NetworkSystem {
    pub fn new(config: SystemConfig) -> Result<Self> {
        let mut managers: Vec<(String, NetworkManager)> = Vec::with_capacity(config.layers.len());
        for layer in &config.layers {
            if managers.iter().any(|(behavior, _)| *behavior == layer.behavior) {
                return Err(Error::Config(format!(
                    "layer behavior '{}' is configured twice",
                    layer.behavior
                )));
            }
            debug!(behavior = %layer.behavior, name = %layer.name, side = ?layer.side, "registering network layer");
            managers.push((layer.behavior.clone(), NetworkManager::new(layer.manager_config())));
        }
        Ok(Self { managers })
    }

    pub fn manager(&self, behavior: &str) -> Option<&NetworkManager> {
        self.managers
            .iter()
            .find(|(name, _)| name == behavior)
            .map(|(_, manager)| manager)
    }

    pub fn term_manager(&self) -> Option<&NetworkManager> {
        self.manager(TERM_NETWORK)
    }

    pub fn token_manager(&self) -> Option<&NetworkManager> {
        self.manager(TOKEN_EMITTER)
    }

    /// Configured behavior names, in configuration order.
    pub fn behaviors(&self) -> impl Iterator<Item = &str> {
        self.managers.iter().map(|(behavior, _)| behavior.as_str())
    }
}

impl Default for NetworkSystem {
    fn default() -> Self {
        let managers = SystemConfig::default()
            .layers
            .iter()
            .map(|layer| (layer.behavior.clone(), NetworkManager::new(layer.manager_config())))
            .collect();
        Self { managers }
    }
}
