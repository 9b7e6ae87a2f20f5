//! Persisted form of a voxel's node array.

use serde::{Deserialize, Serialize};

use crate::model::Node;
use crate::Result;

/// Node array of one voxel, tagged with the name of the manager that wrote
/// it. Order follows the template's node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedNodes {
    pub network: String,
    pub nodes: Vec<Node>,
}

impl PersistedNodes {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
