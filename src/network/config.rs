//! Manager and system configuration.

use serde::{Deserialize, Serialize};

use super::system::{TERM_NETWORK, TOKEN_EMITTER};
use crate::{Error, Result};

/// Which copy of the world a manager serves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Owns the truth: checks placements and runs propagation.
    #[default]
    Authority,
    /// Mirrors persisted state only; never propagates or settles.
    Replica,
}

/// Configuration of one `NetworkManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerConfig {
    /// Tag written next to persisted node arrays.
    #[serde(default = "default_manager_name")]
    pub name: String,
    #[serde(default)]
    pub side: Side,
}

fn default_manager_name() -> String {
    "network".to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            name: default_manager_name(),
            side: Side::Authority,
        }
    }
}

impl ManagerConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }
}

/// One layer group of a `NetworkSystem`: the voxel behavior that hosts it
/// and the manager serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    pub behavior: String,
    #[serde(default = "default_manager_name")]
    pub name: String,
    #[serde(default)]
    pub side: Side,
}

impl LayerConfig {
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            name: self.name.clone(),
            side: self.side,
        }
    }
}

/// Configuration of every layer group in one world session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    pub layers: Vec<LayerConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            layers: vec![
                LayerConfig {
                    behavior: TERM_NETWORK.into(),
                    name: "term".into(),
                    side: Side::Authority,
                },
                LayerConfig {
                    behavior: TOKEN_EMITTER.into(),
                    name: "token".into(),
                    side: Side::Authority,
                },
            ],
        }
    }
}

impl SystemConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SystemConfig = serde_json::from_str(json)?;
        if config.layers.is_empty() {
            return Err(Error::Config("system config lists no layers".into()));
        }
        Ok(config)
    }

    /// Same layers, all switched to `side`.
    pub fn with_side(mut self, side: Side) -> Self {
        for layer in &mut self.layers {
            layer.side = side;
        }
        self
    }
}
