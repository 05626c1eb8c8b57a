//! Volatility-cluster parameter presets feeding the optimizer's coarse
//! search phase.

use crate::grid_config::GridSpacing;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Volatility classification for a traded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinCluster {
    Stable,
    BlueChips,
    MidCaps,
    Memes,
}

/// Coarse-phase parameter-range bundle for one [`CoinCluster`].
///
/// The optimizer's Phase 1 enumerates the Cartesian product of
/// `num_levels`, `profit_per_grid`, and `spacing` drawn from this preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterPreset {
    pub cluster: CoinCluster,
    pub num_levels_options: Vec<u32>,
    pub profit_per_grid_options: Vec<Decimal>,
    pub spacing_options: Vec<GridSpacing>,
    pub atr_multiplier_options: Vec<Decimal>,
}

impl ClusterPreset {
    /// Classification boundaries:
    /// `atr_pct < stable_threshold(0.5)` → Stable;
    /// `< blue_chips_threshold(2.0)` → BlueChips;
    /// `>= memes_threshold(5.0)` → Memes; else MidCaps.
    pub fn classify(atr_pct: f64) -> CoinCluster {
        if atr_pct < 0.5 {
            CoinCluster::Stable
        } else if atr_pct < 2.0 {
            CoinCluster::BlueChips
        } else if atr_pct >= 5.0 {
            CoinCluster::Memes
        } else {
            CoinCluster::MidCaps
        }
    }

    pub fn for_cluster(cluster: CoinCluster) -> Self {
        use rust_decimal_macros::dec;
        match cluster {
            CoinCluster::Stable => Self {
                cluster,
                num_levels_options: vec![10, 15, 20],
                profit_per_grid_options: vec![dec!(0.002), dec!(0.004), dec!(0.006)],
                spacing_options: vec![GridSpacing::Arithmetic],
                atr_multiplier_options: vec![dec!(1.0), dec!(1.5)],
            },
            CoinCluster::BlueChips => Self {
                cluster,
                num_levels_options: vec![10, 15, 20, 25],
                profit_per_grid_options: vec![dec!(0.004), dec!(0.006), dec!(0.01)],
                spacing_options: vec![GridSpacing::Arithmetic, GridSpacing::Geometric],
                atr_multiplier_options: vec![dec!(1.5), dec!(2.0), dec!(2.5)],
            },
            CoinCluster::MidCaps => Self {
                cluster,
                num_levels_options: vec![8, 12, 16, 20],
                profit_per_grid_options: vec![dec!(0.008), dec!(0.012), dec!(0.018)],
                spacing_options: vec![GridSpacing::Geometric, GridSpacing::Arithmetic],
                atr_multiplier_options: vec![dec!(2.0), dec!(2.5), dec!(3.0)],
            },
            CoinCluster::Memes => Self {
                cluster,
                num_levels_options: vec![6, 10, 14],
                profit_per_grid_options: vec![dec!(0.015), dec!(0.025), dec!(0.04)],
                spacing_options: vec![GridSpacing::Geometric],
                atr_multiplier_options: vec![dec!(2.5), dec!(3.0), dec!(4.0)],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_boundaries_match_clusterizer_thresholds() {
        assert_eq!(ClusterPreset::classify(0.1), CoinCluster::Stable);
        assert_eq!(ClusterPreset::classify(0.5), CoinCluster::BlueChips);
        assert_eq!(ClusterPreset::classify(1.9), CoinCluster::BlueChips);
        assert_eq!(ClusterPreset::classify(3.0), CoinCluster::MidCaps);
        assert_eq!(ClusterPreset::classify(5.0), CoinCluster::Memes);
        assert_eq!(ClusterPreset::classify(9.0), CoinCluster::Memes);
    }
}
