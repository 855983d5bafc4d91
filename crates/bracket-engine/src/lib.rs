//! Bracket order builder and lifecycle monitor.
//!
//! Opens a directional position with a stop-loss and a take-profit attached,
//! then follows the three orders until the bracket resolves.
//!
//! # Key Components
//!
//! - [`BracketBuilder`]: Submits entry, stop-loss and take-profit for a request
//! - [`BracketPrices`]: Exit prices derived from the realized entry price
//! - [`BracketMonitor`]: Polls order status and unwinds the orphaned exit
//! - [`BracketPhase`]: Lifecycle phase reported by each poll
//! - [`CancelOutcome`]: Result of a cancel that tolerates already-closed orders
//! - [`PartialBracketPolicy`]: What to do when the entry is live but an exit failed

pub mod builder;
pub mod cancel;
pub mod config;
pub mod error;
pub mod monitor;
pub mod pricing;

pub use builder::{open_bracket, BracketBuilder};
pub use cancel::{cancel_best_effort, cancel_tolerant, BracketLeg, CancelOutcome};
pub use config::{BracketConfig, PartialBracketPolicy};
pub use error::{EngineError, EngineResult, PartialBracket};
pub use monitor::{poll_bracket, BracketMonitor, BracketPhase, CleanupReport};
pub use pricing::{entry_limit_price, BracketPrices};
