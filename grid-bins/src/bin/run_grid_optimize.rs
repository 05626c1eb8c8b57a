//! Drives the classify -> optimize -> stress-test pipeline over a CSV of
//! historical candles and writes the winning configuration as a YAML preset.

use anyhow::{bail, Context, Result};
use clap::Parser;
use grid_backtest::{ohlcv, preset, GridBacktestConfig, GridBacktestSystem};
use grid_core::utils::init_logger;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify, optimize, and stress-test a grid strategy")]
struct Args {
    /// Path to a TOML file describing the base `GridBacktestConfig`.
    #[arg(short, long)]
    config: PathBuf,

    /// Path to a CSV file of OHLCV candles.
    #[arg(short = 'd', long)]
    candles: PathBuf,

    /// Objective to maximize: roi, sharpe, calmar, or profit_factor.
    #[arg(long, default_value = "roi")]
    objective: String,

    /// Identifier for this run, used to key checkpoint files.
    #[arg(long, default_value = "run")]
    run_id: String,

    /// Directory for a resumable trial checkpoint journal. Omit to run
    /// without checkpointing.
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Maximum number of rayon worker threads for the optimizer. Defaults
    /// to the rayon global pool's own default.
    #[arg(long)]
    max_workers: Option<usize>,

    /// Number of candles per stress-test window.
    #[arg(long, default_value_t = 168)]
    stress_window_len: usize,

    /// Number of highest-volatility windows to stress-test against.
    #[arg(long, default_value_t = 3)]
    stress_num_periods: usize,

    /// Path to write the winning configuration as a YAML preset.
    #[arg(short, long)]
    output: PathBuf,

    /// Log level (e.g. info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON instead of pretty text.
    #[arg(long)]
    json_logs: bool,
}

fn parse_objective(raw: &str) -> Result<grid_backtest::optimizer::Objective> {
    use grid_backtest::optimizer::Objective;
    match raw.to_ascii_lowercase().as_str() {
        "roi" => Ok(Objective::Roi),
        "sharpe" => Ok(Objective::Sharpe),
        "calmar" => Ok(Objective::Calmar),
        "profit_factor" | "profit-factor" => Ok(Objective::ProfitFactor),
        other => bail!("unknown objective '{other}', expected one of: roi, sharpe, calmar, profit_factor"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, args.json_logs);

    let objective = parse_objective(&args.objective)?;
    let base_config = GridBacktestConfig::load(&args.config)?;
    let candles = ohlcv::load_csv(&args.candles)?;
    tracing::info!(candle_count = candles.len(), symbol = %base_config.symbol, objective = %args.objective, "starting optimization pipeline");

    let mut system = GridBacktestSystem::new();
    if let Some(dir) = &args.checkpoint_dir {
        system = system.with_checkpoint_dir(dir.clone());
    }
    if let Some(workers) = args.max_workers {
        system = system.with_max_workers(workers);
    }

    let report = system
        .run_full_pipeline(
            &base_config,
            &candles,
            objective,
            &args.run_id,
            args.stress_window_len,
            args.stress_num_periods,
        )
        .await
        .context("pipeline run failed")?;

    tracing::info!(cluster = ?report.profile.cluster, atr_pct = report.profile.atr_pct, "symbol classified");
    tracing::info!(
        trials = report.optimization.all_trials.len(),
        best_objective = ?report.optimization.best_trial.as_ref().map(|t| t.objective_value),
        "optimization complete"
    );
    tracing::info!(
        windows = report.stress.windows.len(),
        worst_drawdown_pct = %report.stress.worst_drawdown_pct,
        all_profitable = report.stress.all_profitable(),
        "stress test complete"
    );

    let Some(best_trial) = &report.optimization.best_trial else {
        bail!("optimizer produced no successful trials; nothing to write");
    };
    let best_result = best_trial
        .result
        .as_ref()
        .context("winning trial is missing its backtest result")?;
    let grid_preset = preset::build_preset(&report.best_config, best_trial, best_result);
    let yaml = preset::to_yaml(&grid_preset)?;
    std::fs::write(&args.output, yaml).with_context(|| format!("writing preset to {}", args.output.display()))?;
    tracing::info!(path = %args.output.display(), "wrote winning preset");

    Ok(())
}
