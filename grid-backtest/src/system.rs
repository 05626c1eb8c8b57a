//! `GridBacktestSystem` — classify → optimize → stress-test orchestrator,
//! wiring together the clusterizer, the C13 Optimizer, and the C12
//! BacktestSimulator into one pipeline.

use crate::checkpoint::CheckpointJournal;
use crate::clusterizer::{CoinClusterizer, CoinProfile};
use crate::config::GridBacktestConfig;
use crate::ohlcv::Candle;
use crate::optimizer::{Objective, OptimizationResult, Optimizer};
use crate::result::BacktestResult;
use crate::simulator::BacktestError;
use crate::stress::{self, StressTestReport};
use std::path::PathBuf;
use tracing::info;

/// Full report produced by [`GridBacktestSystem::run_full_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub profile: CoinProfile,
    pub optimization: OptimizationResult,
    pub best_config: GridBacktestConfig,
    pub stress: StressTestReport,
}

pub struct GridBacktestSystem {
    checkpoint_dir: Option<PathBuf>,
    max_workers: Option<usize>,
}

impl GridBacktestSystem {
    pub fn new() -> Self {
        Self {
            checkpoint_dir: None,
            max_workers: None,
        }
    }

    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Runs a single backtest with `config` as given, no optimization.
    pub async fn run_single_backtest(&self, config: &GridBacktestConfig, candles: &[Candle]) -> Result<BacktestResult, BacktestError> {
        crate::simulator::BacktestSimulator::run(config, candles).await
    }

    /// Classifies `candles` and runs the two-phase optimizer using the
    /// matching `ClusterPreset`.
    pub fn run_optimization(&self, base_config: &GridBacktestConfig, candles: &[Candle], objective: Objective, run_id: &str) -> (CoinProfile, OptimizationResult) {
        let profile = CoinClusterizer::classify(candles);
        let preset = CoinClusterizer::preset_for(&profile);
        info!(cluster = ?profile.cluster, atr_pct = profile.atr_pct, "classified symbol for optimization");

        let checkpoint = self.checkpoint_dir.as_deref().map(|dir| (dir, run_id));
        let result = Optimizer::run(base_config, candles, &preset, objective, self.max_workers, checkpoint);
        (profile, result)
    }

    /// Runs classify → optimize → stress-test in sequence, using the best
    /// trial's parameters for the stress phase.
    pub async fn run_full_pipeline(
        &self,
        base_config: &GridBacktestConfig,
        candles: &[Candle],
        objective: Objective,
        run_id: &str,
        stress_window_len: usize,
        stress_num_periods: usize,
    ) -> Result<PipelineReport, BacktestError> {
        let (profile, optimization) = self.run_optimization(base_config, candles, objective, run_id);

        let best_config = match &optimization.best_trial {
            Some(trial) => GridBacktestConfig {
                num_levels: trial.num_levels,
                profit_per_grid: trial.profit_per_grid,
                grid_spacing: trial.grid_spacing,
                atr_multiplier: trial.atr_multiplier,
                ..base_config.clone()
            },
            None => base_config.clone(),
        };

        let stress_report = stress::run_stress_tests(&best_config, candles, stress_window_len, stress_num_periods).await?;

        Ok(PipelineReport {
            profile,
            optimization,
            best_config,
            stress: stress_report,
        })
    }

    /// Removes a leftover checkpoint journal for `run_id`, e.g. after an
    /// operator decides to abandon a resumable run.
    pub fn discard_checkpoint(&self, run_id: &str) -> anyhow::Result<()> {
        if let Some(dir) = &self.checkpoint_dir {
            CheckpointJournal::new(dir, run_id).cleanup()?;
        }
        Ok(())
    }
}

impl Default for GridBacktestSystem {
    fn default() -> Self {
        Self::new()
    }
}
