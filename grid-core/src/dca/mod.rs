//! DCA (dollar-cost-averaging) kernel: C6 DCAPositionManager, C7
//! DCASignalGenerator, C8 DCATrailingStop.

pub mod position_manager;
pub mod signal_generator;
pub mod trailing_stop;

pub use position_manager::{DCADeal, DCAPositionManager, DealStatus};
pub use signal_generator::{DCASignalGenerator, MarketIndicators, SignalResult};
pub use trailing_stop::{DCATrailingStop, TrailingStopEvaluation};
