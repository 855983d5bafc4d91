//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value: {0}")]
    Core(#[from] bracket_core::CoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] bracket_engine::EngineError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] bracket_gateway::GatewayError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] bracket_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
