//! Runs a single grid backtest over a CSV of OHLCV candles and reports the
//! resulting metrics, optionally writing the full result as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use grid_backtest::{ohlcv, BacktestResult, GridBacktestConfig};
use grid_core::utils::init_logger;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a single grid backtest against historical candles")]
struct Args {
    /// Path to a TOML file describing the `GridBacktestConfig`.
    #[arg(short, long)]
    config: PathBuf,

    /// Path to a CSV file of OHLCV candles.
    #[arg(short = 'd', long)]
    candles: PathBuf,

    /// Optional path to write the full `BacktestResult` as JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (e.g. info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON instead of pretty text.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, args.json_logs);

    tracing::info!(config = %args.config.display(), candles = %args.candles.display(), "loading backtest inputs");
    let config = GridBacktestConfig::load(&args.config)?;
    let candles = ohlcv::load_csv(&args.candles)?;
    tracing::info!(candle_count = candles.len(), symbol = %config.symbol, "running backtest");

    let result = grid_backtest::BacktestSimulator::run(&config, &candles)
        .await
        .context("backtest run failed")?;

    print_summary(&result);

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&result).context("serializing backtest result")?;
        std::fs::write(path, json).with_context(|| format!("writing result to {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote full result");
    }

    Ok(())
}

fn print_summary(result: &BacktestResult) {
    tracing::info!(
        symbol = %result.symbol,
        total_return_pct = %result.total_return_pct,
        final_equity = %result.final_equity,
        max_drawdown_pct = %result.max_drawdown_pct,
        total_trades = result.total_trades,
        completed_cycles = result.completed_cycles,
        win_rate = %result.win_rate,
        sharpe_ratio = result.sharpe_ratio,
        profit_factor = result.profit_factor,
        "backtest complete"
    );
    if result.stopped_by_risk {
        tracing::warn!(reason = ?result.stop_reason, "run was stopped early by a risk limit");
    }
}
