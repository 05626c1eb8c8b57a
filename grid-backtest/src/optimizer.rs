//! Optimizer (C13) — two-phase parallel parameter search.
//!
//! Phase 1 (coarse) enumerates the Cartesian product of a `ClusterPreset`'s
//! option lists; Phase 2 (fine) narrows around the best coarse trial. Both
//! phases run over a `rayon` worker pool rather than a process pool, since
//! each trial is a pure, allocation-heavy computation with no IPC needed.

use crate::checkpoint::{config_hash, CheckpointJournal};
use crate::config::GridBacktestConfig;
use crate::ohlcv::Candle;
use crate::result::BacktestResult;
use crate::simulator::{BacktestError, BacktestSimulator};
use grid_strategies::{ClusterPreset, GridSpacing};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Roi,
    Sharpe,
    Calmar,
    ProfitFactor,
}

/// One point in parameter space and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub trial_id: u64,
    pub num_levels: u32,
    pub profit_per_grid: Decimal,
    pub grid_spacing: GridSpacing,
    pub atr_multiplier: Decimal,
    pub config_hash: String,
    pub objective_value: f64,
    pub result: Option<BacktestResult>,
    pub failed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_trial: Option<Trial>,
    pub all_trials: Vec<Trial>,
    pub coarse_trials: Vec<Trial>,
    pub fine_trials: Vec<Trial>,
    pub total_duration_seconds: f64,
}

impl OptimizationResult {
    pub fn top_n(&self, n: usize) -> Vec<&Trial> {
        let mut sorted: Vec<&Trial> = self.all_trials.iter().filter(|t| !t.failed).collect();
        sorted.sort_by(|a, b| b.objective_value.partial_cmp(&a.objective_value).unwrap_or(std::cmp::Ordering::Equal));
        sorted.into_iter().take(n).collect()
    }

    /// Mean objective value grouped by `num_levels`, for diagnostic reports.
    pub fn param_impact(&self) -> HashMap<u32, f64> {
        let mut sums: HashMap<u32, (f64, u32)> = HashMap::new();
        for trial in self.all_trials.iter().filter(|t| !t.failed) {
            let entry = sums.entry(trial.num_levels).or_insert((0.0, 0));
            entry.0 += trial.objective_value;
            entry.1 += 1;
        }
        sums.into_iter().map(|(k, (sum, count))| (k, sum / count as f64)).collect()
    }
}

struct Point {
    num_levels: u32,
    profit_per_grid: Decimal,
    grid_spacing: GridSpacing,
    atr_multiplier: Decimal,
}

fn point_config_hash(p: &Point) -> String {
    config_hash(&json!({
        "num_levels": p.num_levels,
        "profit_per_grid": p.profit_per_grid.to_string(),
        "grid_spacing": format!("{:?}", p.grid_spacing),
        "atr_multiplier": p.atr_multiplier.to_string(),
    }))
}

fn coarse_points(preset: &ClusterPreset) -> Vec<Point> {
    let mut points = Vec::new();
    for &num_levels in &preset.num_levels_options {
        for &profit_per_grid in &preset.profit_per_grid_options {
            for &grid_spacing in &preset.spacing_options {
                for &atr_multiplier in &preset.atr_multiplier_options {
                    points.push(Point {
                        num_levels,
                        profit_per_grid,
                        grid_spacing,
                        atr_multiplier,
                    });
                }
            }
        }
    }
    points
}

fn fine_u32_neighborhood(options: &[u32], best: u32) -> Vec<u32> {
    let mut out = vec![best.saturating_sub(1).max(2), best, best + 1];
    if !options.is_empty() {
        out.retain(|v| *v >= 2);
    }
    out.sort_unstable();
    out.dedup();
    out
}

fn fine_decimal_neighborhood(options: &[Decimal], best: Decimal) -> Vec<Decimal> {
    let idx = options.iter().position(|o| *o == best);
    let mut out = vec![best];
    if let Some(i) = idx {
        if i > 0 {
            out.push((options[i - 1] + best) / dec!(2));
        } else {
            out.push((best * dec!(0.8)).max(Decimal::new(1, 8)));
        }
        if i + 1 < options.len() {
            out.push((options[i + 1] + best) / dec!(2));
        } else {
            out.push(best * dec!(1.2));
        }
    } else {
        out.push(best * dec!(0.9));
        out.push(best * dec!(1.1));
    }
    out.sort();
    out.dedup();
    out
}

fn fine_points(preset: &ClusterPreset, best: &Trial) -> Vec<Point> {
    let num_levels_options = fine_u32_neighborhood(&preset.num_levels_options, best.num_levels);
    let profit_options = fine_decimal_neighborhood(&preset.profit_per_grid_options, best.profit_per_grid);
    let atr_options = fine_decimal_neighborhood(&preset.atr_multiplier_options, best.atr_multiplier);

    let mut points = Vec::new();
    for &num_levels in &num_levels_options {
        for &profit_per_grid in &profit_options {
            for &atr_multiplier in &atr_options {
                points.push(Point {
                    num_levels,
                    profit_per_grid,
                    grid_spacing: best.grid_spacing,
                    atr_multiplier,
                });
            }
        }
    }
    points
}

fn objective_of(result: &BacktestResult, objective: Objective) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    let raw = match objective {
        Objective::Roi => result.total_return_pct.to_f64().unwrap_or(f64::NAN),
        Objective::Sharpe => result.sharpe_ratio,
        Objective::Calmar => result.calmar_ratio,
        Objective::ProfitFactor => result.profit_factor,
    };
    if raw.is_finite() {
        raw
    } else {
        f64::NEG_INFINITY
    }
}

fn run_point(
    trial_id: u64,
    point: &Point,
    base_config: &GridBacktestConfig,
    candles: &[Candle],
    objective: Objective,
    journal: Option<&CheckpointJournal>,
    completed: &HashMap<String, BacktestResult>,
) -> Trial {
    let hash = point_config_hash(point);

    if let Some(cached) = completed.get(&hash) {
        return Trial {
            trial_id,
            num_levels: point.num_levels,
            profit_per_grid: point.profit_per_grid,
            grid_spacing: point.grid_spacing,
            atr_multiplier: point.atr_multiplier,
            config_hash: hash,
            objective_value: objective_of(cached, objective),
            result: Some(cached.clone()),
            failed: false,
        };
    }

    let mut trial_config = base_config.clone();
    trial_config.num_levels = point.num_levels;
    trial_config.profit_per_grid = point.profit_per_grid;
    trial_config.grid_spacing = point.grid_spacing;
    trial_config.atr_multiplier = point.atr_multiplier;

    let outcome: Result<BacktestResult, BacktestError> = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("building current-thread runtime for one trial")
        .block_on(BacktestSimulator::run(&trial_config, candles));

    match outcome {
        Ok(result) => {
            let objective_value = objective_of(&result, objective);
            if let Some(j) = journal {
                if let Err(e) = j.save_trial(trial_id, &hash, &result) {
                    warn!(trial_id, error = %e, "failed to checkpoint trial");
                }
            }
            Trial {
                trial_id,
                num_levels: point.num_levels,
                profit_per_grid: point.profit_per_grid,
                grid_spacing: point.grid_spacing,
                atr_multiplier: point.atr_multiplier,
                config_hash: hash,
                objective_value,
                result: Some(result),
                failed: false,
            }
        }
        Err(e) => {
            warn!(trial_id, error = %e, "trial failed, continuing search");
            Trial {
                trial_id,
                num_levels: point.num_levels,
                profit_per_grid: point.profit_per_grid,
                grid_spacing: point.grid_spacing,
                atr_multiplier: point.atr_multiplier,
                config_hash: hash,
                objective_value: f64::NEG_INFINITY,
                result: None,
                failed: true,
            }
        }
    }
}

pub struct Optimizer;

impl Optimizer {
    /// Runs the full coarse + fine search. `max_workers` defaults to
    /// `available_parallelism - 1`. `checkpoint_dir`/`run_id`, when given,
    /// enable resumable, crash-tolerant trials.
    pub fn run(
        base_config: &GridBacktestConfig,
        candles: &[Candle],
        preset: &ClusterPreset,
        objective: Objective,
        max_workers: Option<usize>,
        checkpoint: Option<(&Path, &str)>,
    ) -> OptimizationResult {
        let workers = max_workers.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get().saturating_sub(1)).unwrap_or(1).max(1));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .expect("building rayon pool for optimizer trials");

        let journal = checkpoint.map(|(dir, run_id)| CheckpointJournal::new(dir, run_id));
        let completed = journal.as_ref().map(|j| j.load_completed().unwrap_or_default()).unwrap_or_default();

        let coarse = coarse_points(preset);
        info!(trials = coarse.len(), "starting coarse optimization phase");
        let mut next_id = 0u64;
        let coarse_trials: Vec<Trial> = pool.install(|| {
            coarse
                .par_iter()
                .enumerate()
                .map(|(i, p)| run_point(i as u64, p, base_config, candles, objective, journal.as_ref(), &completed))
                .collect()
        });
        next_id += coarse_trials.len() as u64;

        let best_coarse = coarse_trials
            .iter()
            .filter(|t| !t.failed)
            .max_by(|a, b| a.objective_value.partial_cmp(&b.objective_value).unwrap_or(std::cmp::Ordering::Equal))
            .cloned();

        let fine_trials = if let Some(best) = &best_coarse {
            let fine = fine_points(preset, best);
            info!(trials = fine.len(), "starting fine optimization phase");
            pool.install(|| {
                fine.par_iter()
                    .enumerate()
                    .map(|(i, p)| run_point(next_id + i as u64, p, base_config, candles, objective, journal.as_ref(), &completed))
                    .collect()
            })
        } else {
            Vec::new()
        };

        let mut all_trials = coarse_trials.clone();
        all_trials.extend(fine_trials.clone());
        let best_trial = all_trials
            .iter()
            .filter(|t| !t.failed)
            .max_by(|a, b| a.objective_value.partial_cmp(&b.objective_value).unwrap_or(std::cmp::Ordering::Equal))
            .cloned();

        if let Some(j) = &journal {
            if let Err(e) = j.cleanup() {
                warn!(error = %e, "failed to clean up checkpoint journal");
            }
        }

        OptimizationResult {
            best_trial,
            all_trials,
            coarse_trials,
            fine_trials,
            total_duration_seconds: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candles() -> Vec<Candle> {
        (0..30u32)
            .map(|h| {
                let price = dec!(100) + Decimal::from(h % 5);
                Candle {
                    timestamp: Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap(),
                    open: price,
                    high: price + dec!(2),
                    low: price - dec!(2),
                    close: price,
                    volume: dec!(10),
                }
            })
            .collect()
    }

    #[test]
    fn coarse_points_covers_full_cartesian_product() {
        let preset = ClusterPreset::for_cluster(grid_strategies::CoinCluster::Stable);
        let points = coarse_points(&preset);
        assert_eq!(
            points.len(),
            preset.num_levels_options.len() * preset.profit_per_grid_options.len() * preset.spacing_options.len() * preset.atr_multiplier_options.len()
        );
    }

    #[test]
    fn optimizer_finds_a_best_trial_deterministically() {
        let preset = ClusterPreset::for_cluster(grid_strategies::CoinCluster::Stable);
        let base = GridBacktestConfig {
            auto_bounds: false,
            upper_price: Some(dec!(110)),
            lower_price: Some(dec!(90)),
            ..GridBacktestConfig::default()
        };
        let candles = candles();
        let r1 = Optimizer::run(&base, &candles, &preset, Objective::Roi, Some(2), None);
        let r2 = Optimizer::run(&base, &candles, &preset, Objective::Roi, Some(2), None);
        assert!(r1.best_trial.is_some());
        assert_eq!(r1.coarse_trials.len(), r2.coarse_trials.len());
        assert_eq!(
            r1.coarse_trials.iter().map(|t| t.config_hash.clone()).collect::<Vec<_>>(),
            r2.coarse_trials.iter().map(|t| t.config_hash.clone()).collect::<Vec<_>>(),
        );
    }

    #[test]
    fn checkpoint_resume_skips_completed_trials() {
        let preset = ClusterPreset::for_cluster(grid_strategies::CoinCluster::Stable);
        let base = GridBacktestConfig {
            auto_bounds: false,
            upper_price: Some(dec!(110)),
            lower_price: Some(dec!(90)),
            ..GridBacktestConfig::default()
        };
        let candles = candles();
        let dir = tempfile::tempdir().unwrap();
        let result = Optimizer::run(&base, &candles, &preset, Objective::Roi, Some(2), Some((dir.path(), "run-a")));
        // successful completion removes the journal.
        assert!(!dir.path().join("run-a.ndjson").exists());
        assert!(result.best_trial.is_some());
    }
}
