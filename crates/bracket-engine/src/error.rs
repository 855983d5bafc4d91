//! Engine error types.

use bracket_core::{CoreError, Order};
use bracket_gateway::GatewayError;
use thiserror::Error;

use crate::cancel::BracketLeg;

/// Entry went live but the bracket could not be completed.
///
/// The position may be unprotected; the operator has to look at it unless
/// `unwound` is set.
#[derive(Debug, Error)]
#[error(
    "partial bracket: {failed_leg} submission failed after entry {} ({}) at {}, unwound={unwound}: {source}",
    .entry.id,
    .entry.status,
    .entry.price
)]
pub struct PartialBracket {
    pub entry: Order,
    /// Stop-loss, when it was accepted before the take-profit failed.
    pub stop_loss: Option<Order>,
    pub failed_leg: BracketLeg,
    /// Whether the flatten policy closed the exposure.
    pub unwound: bool,
    #[source]
    pub source: GatewayError,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid bracket: {0}")]
    Core(#[from] CoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    PartialBracket(Box<PartialBracket>),
}

impl EngineError {
    /// The partial-bracket record, if this error left orders live.
    pub fn as_partial(&self) -> Option<&PartialBracket> {
        match self {
            Self::PartialBracket(partial) => Some(partial.as_ref()),
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
