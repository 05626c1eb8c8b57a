//! Pure-data configuration types for every engine in the grid/DCA/hybrid
//! kernel, plus derivations that are pure functions of config (the
//! safety-order schedule, fee calculators). No engine state lives here —
//! see `grid-core` for the state machines that consume these types.

pub mod cluster_preset;
pub mod dca_config;
pub mod fees;
pub mod grid_config;
pub mod hybrid_config;
pub mod risk_config;
pub mod trailing_config;

pub use cluster_preset::{ClusterPreset, CoinCluster};
pub use dca_config::{DCAOrderConfig, DCASignalConfig, SafetyOrderLevel, SignalCondition};
pub use fees::FeeSchedule;
pub use grid_config::{DirectionBias, GridConfig, GridSpacing, VolatilityMode};
pub use hybrid_config::HybridConfig;
pub use risk_config::RiskLimits;
pub use trailing_config::{DCATrailingStopConfig, RecenterMode, TrailingGridConfig, TrailingStopMode};
