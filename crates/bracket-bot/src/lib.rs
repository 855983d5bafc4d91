//! Bracket order bot.
//!
//! Wires the engine to a paper exchange and runs the trade loop:
//! - Load TOML configuration
//! - Refresh reference prices from a fixed or HTTP feed
//! - Open a bracket, poll it until it resolves, repeat

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
