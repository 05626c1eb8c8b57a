//! Typed error kinds for the grid/DCA/hybrid kernel.
//!
//! Two families: [`KernelError`] for fatal, construction-time failures
//! (invalid config, impossible bounds) that propagate via `anyhow::Result`
//! at call sites; [`ExecutionError`] for the `ExecutionLayer` capability
//! set, where callers must distinguish retryable network conditions from
//! exchange-side rejections.

use thiserror::Error;

/// Fatal errors raised during construction or reconfiguration of an engine.
///
/// `InvalidConfig` is fatal to the caller per — engines never
/// attempt to repair an invalid configuration themselves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("simulator inconsistency: {0}")]
    SimulatorInconsistent(String),
}

impl KernelError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Errors surfaced by an [`crate::execution::ExecutionLayer`] implementation.
///
/// Callers must tolerate an idempotent cancel of an already-filled order
/// (`OrderNotFound` on cancel is treated as success, not as an error, by the
/// caller — the execution layer still reports it truthfully).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("insufficient balance: need {required}, have {available}")]
    BalanceInsufficient {
        required: String,
        available: String,
    },

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("exchange rejected request: {0}")]
    ExchangeError(String),

    #[error("network error: {0}")]
    NetworkError(String),
}
