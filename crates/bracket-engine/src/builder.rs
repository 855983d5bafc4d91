//! Bracket builder.
//!
//! Opens a position with a market entry, then attaches a stop-loss and a
//! take-profit priced off the realized entry fill:
//!
//! 1. Read the position id and the entry's reference price
//!    (oracle for longs, index for shorts).
//! 2. Submit the entry: long IOC at the reference, short FOK at
//!    `reference - slippage`.
//! 3. Derive exit prices from the price the exchange reports for the entry.
//! 4. Submit the stop, then the take-profit, both on the exit side.
//!
//! Nothing is retried. Once the entry is live, a failed exit submission is
//! reported as `EngineError::PartialBracket` and handled per
//! `PartialBracketPolicy`.

use bracket_core::{
    Bracket, BracketRequest, ClientOrderId, CoreError, Direction, Order, OrderSide, OrderSpec,
    OrderType, PositionId, Price, Size, TimeInForce,
};
use bracket_gateway::{ExchangeGateway, GatewayError};
use bracket_telemetry::Metrics;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::cancel::{cancel_best_effort, BracketLeg};
use crate::config::{BracketConfig, PartialBracketPolicy};
use crate::error::{EngineError, EngineResult, PartialBracket};
use crate::pricing::{entry_limit_price, BracketPrices};

/// Opens brackets on one market.
#[derive(Debug, Clone)]
pub struct BracketBuilder {
    config: BracketConfig,
}

impl BracketBuilder {
    pub fn new(config: BracketConfig) -> Self {
        Self { config }
    }

    /// Open a bracket for `request`.
    ///
    /// # Errors
    /// * `EngineError::Core` - invalid request or configuration, nothing submitted
    /// * `EngineError::Gateway` - a call failed before the entry was accepted
    /// * `EngineError::PartialBracket` - entry accepted, an exit was not
    pub async fn open<G>(&self, gateway: &G, request: &BracketRequest) -> EngineResult<Bracket>
    where
        G: ExchangeGateway + ?Sized,
    {
        self.config.validate()?;
        request.validate()?;

        let direction = request.direction;
        let market = self.config.market.clone();
        let tick = self.config.tick();

        let position_id = gateway.position_id().await?;
        let kind = direction.reference_kind();
        let reference = gateway.reference_price(market.clone(), kind).await?;

        let entry_price = entry_limit_price(direction, reference, self.config.slippage(), tick);
        if !entry_price.is_positive() {
            return Err(CoreError::InvalidPrice(format!(
                "entry price {entry_price} from {kind} reference {reference} is not positive"
            ))
            .into());
        }

        let expires_at = Utc::now() + Duration::seconds(self.config.order_ttl_secs as i64);
        let entry_tif = match direction {
            Direction::Long => TimeInForce::ImmediateOrCancel,
            Direction::Short => TimeInForce::FillOrKill,
        };

        let entry_spec = self.spec(
            &position_id,
            direction.entry_side(),
            OrderType::Market,
            request.size,
            entry_price,
            None,
            entry_tif,
            expires_at,
        );
        let entry = gateway.submit_order(entry_spec).await?;

        info!(
            market = %market,
            %direction,
            order_id = %entry.id,
            status = %entry.status,
            %reference,
            limit = %entry_price,
            realized = %entry.price,
            "Entry order submitted"
        );

        let realized = if entry.price.is_positive() {
            entry.price
        } else {
            warn!(
                order_id = %entry.id,
                limit = %entry_price,
                "Entry reported no price, deriving exits from the limit price"
            );
            entry_price
        };

        let prices = BracketPrices::compute(
            direction,
            realized,
            request.stop_loss_pct,
            request.roi_pct,
            tick,
        );
        if !prices.is_valid() {
            let source = GatewayError::Rejected(format!("non-positive exit prices {prices:?}"));
            return Err(self
                .partial(gateway, &position_id, request, entry, None, BracketLeg::StopLoss, source)
                .await);
        }

        let stop_spec = self.spec(
            &position_id,
            direction.exit_side(),
            OrderType::Stop,
            request.size,
            prices.stop_loss,
            Some(prices.stop_loss),
            TimeInForce::GoodTilTime,
            expires_at,
        );
        let stop_loss = match gateway.submit_order(stop_spec).await {
            Ok(order) => order,
            Err(source) => {
                return Err(self
                    .partial(gateway, &position_id, request, entry, None, BracketLeg::StopLoss, source)
                    .await)
            }
        };
        info!(
            order_id = %stop_loss.id,
            side = %stop_loss.side,
            price = %prices.stop_loss,
            "Stop-loss order submitted"
        );

        let take_profit_spec = self.spec(
            &position_id,
            direction.exit_side(),
            OrderType::TakeProfit,
            request.size,
            prices.take_profit_limit,
            Some(prices.take_profit_trigger),
            TimeInForce::GoodTilTime,
            expires_at,
        );
        let take_profit = match gateway.submit_order(take_profit_spec).await {
            Ok(order) => order,
            Err(source) => {
                return Err(self
                    .partial(
                        gateway,
                        &position_id,
                        request,
                        entry,
                        Some(stop_loss),
                        BracketLeg::TakeProfit,
                        source,
                    )
                    .await)
            }
        };
        info!(
            order_id = %take_profit.id,
            side = %take_profit.side,
            limit = %prices.take_profit_limit,
            trigger = %prices.take_profit_trigger,
            "Take-profit order submitted"
        );

        Metrics::bracket_opened(&direction.to_string());

        Ok(Bracket {
            direction,
            market,
            entry,
            stop_loss,
            take_profit,
            opened_at: Utc::now(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn spec(
        &self,
        position_id: &PositionId,
        side: OrderSide,
        order_type: OrderType,
        size: Size,
        limit_price: Price,
        trigger_price: Option<Price>,
        time_in_force: TimeInForce,
        expires_at: DateTime<Utc>,
    ) -> OrderSpec {
        OrderSpec {
            client_id: ClientOrderId::new(),
            position_id: position_id.clone(),
            market: self.config.market.clone(),
            side,
            order_type,
            size,
            limit_price,
            trigger_price,
            time_in_force,
            post_only: false,
            reduce_only: false,
            expires_at,
            fee_rate: self.config.fee_rate,
        }
    }

    /// Apply the partial-bracket policy and build the error to return.
    #[allow(clippy::too_many_arguments)]
    async fn partial<G>(
        &self,
        gateway: &G,
        position_id: &PositionId,
        request: &BracketRequest,
        entry: Order,
        stop_loss: Option<Order>,
        failed_leg: BracketLeg,
        source: GatewayError,
    ) -> EngineError
    where
        G: ExchangeGateway + ?Sized,
    {
        let policy = self.config.partial_policy;
        Metrics::partial_bracket(&policy.to_string());
        error!(
            entry_id = %entry.id,
            entry_status = %entry.status,
            %failed_leg,
            %policy,
            error = %source,
            "Bracket incomplete: entry is live without full protection"
        );

        let unwound = match policy {
            PartialBracketPolicy::Surface => false,
            PartialBracketPolicy::Flatten => {
                self.flatten(gateway, position_id, request, &entry, stop_loss.as_ref())
                    .await
            }
        };

        EngineError::PartialBracket(Box::new(PartialBracket {
            entry,
            stop_loss,
            failed_leg,
            unwound,
            source,
        }))
    }

    /// Cancel the live exit, if any, and close the entry's exposure.
    ///
    /// Returns true when nothing is left open.
    async fn flatten<G>(
        &self,
        gateway: &G,
        position_id: &PositionId,
        request: &BracketRequest,
        entry: &Order,
        stop_loss: Option<&Order>,
    ) -> bool
    where
        G: ExchangeGateway + ?Sized,
    {
        let mut exits_closed = true;
        if let Some(stop_loss) = stop_loss {
            exits_closed = cancel_best_effort(gateway, &stop_loss.id, BracketLeg::StopLoss)
                .await
                .is_closed();
        }

        if entry.status.is_working() {
            let entry_closed = cancel_best_effort(gateway, &entry.id, BracketLeg::Entry)
                .await
                .is_closed();
            return exits_closed && entry_closed;
        }
        if !entry.status.is_filled() {
            info!(entry_id = %entry.id, status = %entry.status, "Entry not filled, nothing to close");
            return exits_closed;
        }

        let direction = request.direction;
        // Worst acceptable price for the closing market order.
        let close_price = match direction {
            Direction::Long => entry.price - self.config.slippage(),
            Direction::Short => entry.price + self.config.slippage(),
        }
        .round_to_tick(self.config.tick());

        let mut close_spec = self.spec(
            position_id,
            direction.exit_side(),
            OrderType::Market,
            request.size,
            close_price,
            None,
            TimeInForce::ImmediateOrCancel,
            Utc::now() + Duration::seconds(self.config.order_ttl_secs as i64),
        );
        close_spec.reduce_only = true;

        match gateway.submit_order(close_spec).await {
            Ok(close) if close.status.is_filled() => {
                info!(
                    order_id = %close.id,
                    price = %close.price,
                    "Partial bracket flattened"
                );
                exits_closed
            }
            Ok(close) => {
                error!(
                    order_id = %close.id,
                    status = %close.status,
                    "Flatten order did not fill, position still open"
                );
                false
            }
            Err(e) => {
                error!(error = %e, "Flatten order failed, position still open");
                false
            }
        }
    }
}

/// Open a bracket with a one-off builder.
pub async fn open_bracket<G>(
    gateway: &G,
    config: &BracketConfig,
    request: &BracketRequest,
) -> EngineResult<Bracket>
where
    G: ExchangeGateway + ?Sized,
{
    BracketBuilder::new(config.clone()).open(gateway, request).await
}
