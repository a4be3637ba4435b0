//! Engine configuration

use serde::{Deserialize, Serialize};
use types::ids::ESCROW_NAMESPACE;

/// Configuration for the escrow engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Namespace tag mixed into every derived escrow key.
    pub namespace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: ESCROW_NAMESPACE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
