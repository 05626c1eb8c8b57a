//! Optimizer checkpoint journal: an append-only, newline-delimited JSON
//! file per run. On resume, the journal is replayed and later entries with
//! the same `config_hash` win (a trial that was re-run after a crash
//! mid-write overrides its earlier record). The journal is deleted on a
//! run's successful completion.

use crate::result::BacktestResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub trial_id: u64,
    pub config_hash: String,
    pub result: BacktestResult,
}

/// 16-hex prefix of SHA-256 over the canonical (sorted-key) JSON form of a
/// trial config.
pub fn config_hash(config: &JsonValue) -> String {
    let canonical = canonical_json(config);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

fn canonical_json(v: &JsonValue) -> String {
    match v {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys.iter().map(|k| format!("\"{k}\":{}", canonical_json(&map[*k]))).collect();
            format!("{{{}}}", parts.join(","))
        }
        JsonValue::Array(items) => {
            format!("[{}]", items.iter().map(canonical_json).collect::<Vec<_>>().join(","))
        }
        other => other.to_string(),
    }
}

pub struct CheckpointJournal {
    path: PathBuf,
}

impl CheckpointJournal {
    pub fn new(checkpoint_dir: impl AsRef<Path>, run_id: &str) -> Self {
        Self {
            path: checkpoint_dir.as_ref().join(format!("{run_id}.ndjson")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one trial record. Creates the file (and parent directory) on
    /// first use.
    pub fn save_trial(&self, trial_id: u64, config_hash: &str, result: &BacktestResult) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating checkpoint directory {}", parent.display()))?;
        }
        let record = CheckpointRecord {
            trial_id,
            config_hash: config_hash.to_string(),
            result: result.clone(),
        };
        let line = serde_json::to_string(&record).context("serializing checkpoint record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening checkpoint journal {}", self.path.display()))?;
        writeln!(file, "{line}").context("appending checkpoint record")?;
        Ok(())
    }

    /// Loads every completed trial, keyed by `config_hash`. Malformed lines
    /// are skipped; among duplicate hashes the last occurrence wins.
    pub fn load_completed(&self) -> Result<HashMap<String, BacktestResult>> {
        let mut completed = HashMap::new();
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(completed),
            Err(e) => return Err(e).with_context(|| format!("opening checkpoint journal {}", self.path.display())),
        };
        for line in BufReader::new(file).lines() {
            let line = line.context("reading checkpoint journal line")?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CheckpointRecord>(&line) {
                Ok(record) => {
                    completed.insert(record.config_hash, record.result);
                }
                Err(_) => continue,
            }
        }
        Ok(completed)
    }

    /// Removes the journal file on successful run completion.
    pub fn cleanup(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing checkpoint journal {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dummy_result() -> BacktestResult {
        BacktestResult {
            symbol: "BTC/USDT".to_string(),
            total_return_pct: Default::default(),
            total_pnl: Default::default(),
            final_equity: Default::default(),
            max_drawdown_pct: Default::default(),
            total_trades: 0,
            win_rate: Default::default(),
            completed_cycles: 0,
            grid_fill_rate: Default::default(),
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            calmar_ratio: 0.0,
            profit_factor: 0.0,
            capital_efficiency: Default::default(),
            total_fees: Default::default(),
            equity_curve: Vec::new(),
            trade_history: Vec::new(),
            stopped_by_risk: false,
            stop_reason: None,
            duration_seconds: 0,
            price_left_grid_count: 0,
            max_one_sided_exposure: Default::default(),
            avg_profit_per_cycle: Default::default(),
        }
    }

    #[test]
    fn config_hash_is_stable_regardless_of_key_order() {
        let a = json!({"num_levels": 10, "profit_per_grid": "0.01"});
        let b = json!({"profit_per_grid": "0.01", "num_levels": 10});
        assert_eq!(config_hash(&a), config_hash(&b));
        assert_eq!(config_hash(&a).len(), 16);
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CheckpointJournal::new(dir.path(), "run-1");
        journal.save_trial(1, "hash-a", &dummy_result()).unwrap();
        journal.save_trial(2, "hash-b", &dummy_result()).unwrap();
        let completed = journal.load_completed().unwrap();
        assert_eq!(completed.len(), 2);
        assert!(completed.contains_key("hash-a"));
    }

    #[test]
    fn later_record_with_same_hash_wins() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CheckpointJournal::new(dir.path(), "run-1");
        let mut first = dummy_result();
        first.total_trades = 1;
        let mut second = dummy_result();
        second.total_trades = 2;
        journal.save_trial(1, "hash-a", &first).unwrap();
        journal.save_trial(1, "hash-a", &second).unwrap();
        let completed = journal.load_completed().unwrap();
        assert_eq!(completed["hash-a"].total_trades, 2);
    }

    #[test]
    fn cleanup_removes_the_journal_file() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CheckpointJournal::new(dir.path(), "run-1");
        journal.save_trial(1, "hash-a", &dummy_result()).unwrap();
        assert!(journal.path().exists());
        journal.cleanup().unwrap();
        assert!(!journal.path().exists());
    }

    #[test]
    fn missing_journal_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CheckpointJournal::new(dir.path(), "never-run");
        assert!(journal.load_completed().unwrap().is_empty());
    }
}
