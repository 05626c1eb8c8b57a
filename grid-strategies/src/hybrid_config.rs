//! HybridCoordinator configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridConfig {
    pub adx_dca_threshold: f64,
    #[serde(default)]
    pub allow_both: bool,
    #[serde(default = "default_tolerance")]
    pub adx_tolerance: f64,
}

fn default_tolerance() -> f64 {
    3.0
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            adx_dca_threshold: 25.0,
            allow_both: false,
            adx_tolerance: default_tolerance(),
        }
    }
}
