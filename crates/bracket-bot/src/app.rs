//! Trade loop.
//!
//! Every tick refreshes the paper exchange's prices, then either opens a
//! bracket (when none is active) or polls the active one. A resolved bracket
//! counts as a completed cycle; the loop stops after `poll.max_cycles` or on
//! ctrl-c.

use crate::config::{AppConfig, PriceFeedConfig};
use crate::error::{AppError, AppResult};
use bracket_core::{Bracket, MarketId, Price};
use bracket_engine::{BracketBuilder, BracketMonitor, EngineError};
use bracket_gateway::{GatewayResult, HttpPriceFeed, MarketPrices, PaperGateway};
use bracket_telemetry::Metrics;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Where the next set of reference prices comes from.
enum PriceSource {
    Fixed { current: MarketPrices, step: Price },
    Http(HttpPriceFeed),
}

impl PriceSource {
    fn from_config(config: &PriceFeedConfig) -> AppResult<Self> {
        match config {
            PriceFeedConfig::Fixed {
                oracle,
                index,
                step,
            } => Ok(Self::Fixed {
                current: MarketPrices {
                    oracle: Price::new(*oracle),
                    index: Price::new(*index),
                },
                step: Price::new(*step),
            }),
            PriceFeedConfig::Http {
                base_url,
                timeout_ms,
            } => {
                let feed = HttpPriceFeed::new(base_url.clone(), Duration::from_millis(*timeout_ms))?;
                info!(base_url = %feed.base_url(), timeout_ms, "Using HTTP price feed");
                Ok(Self::Http(feed))
            }
        }
    }

    async fn next(&mut self, market: &MarketId) -> GatewayResult<MarketPrices> {
        match self {
            Self::Fixed { current, step } => {
                let prices = *current;
                current.oracle = current.oracle + *step;
                current.index = current.index + *step;
                Ok(prices)
            }
            Self::Http(feed) => feed.fetch(market).await,
        }
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    gateway: PaperGateway,
    builder: BracketBuilder,
    monitor: BracketMonitor,
    prices: PriceSource,
    active: Option<Bracket>,
    completed: u32,
}

impl Application {
    /// Create a new application instance.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let gateway = PaperGateway::new(config.position_id.clone());
        let builder = BracketBuilder::new(config.bracket.clone());
        let prices = PriceSource::from_config(&config.price_feed)?;

        Ok(Self {
            config,
            gateway,
            builder,
            monitor: BracketMonitor::new(),
            prices,
            active: None,
            completed: 0,
        })
    }

    /// Brackets that have resolved so far.
    pub fn completed_cycles(&self) -> u32 {
        self.completed
    }

    /// The bracket currently being followed.
    pub fn active_bracket(&self) -> Option<&Bracket> {
        self.active.as_ref()
    }

    pub fn gateway(&self) -> &PaperGateway {
        &self.gateway
    }

    fn cycles_done(&self) -> bool {
        self.config.poll.max_cycles != 0 && self.completed >= self.config.poll.max_cycles
    }

    /// Run until `max_cycles` brackets have resolved or ctrl-c.
    ///
    /// # Errors
    /// A partially opened bracket or an invalid request stops the loop.
    /// Gateway failures are logged and retried on the next tick.
    pub async fn run(&mut self) -> AppResult<()> {
        self.run_until(tokio::signal::ctrl_c()).await
    }

    /// Run until `max_cycles` brackets have resolved or `shutdown` completes.
    ///
    /// `shutdown` is created once and stays registered across ticks, so a
    /// signal that arrives while a tick is in progress stops the loop right
    /// after that tick.
    pub async fn run_until<F>(&mut self, shutdown: F) -> AppResult<()>
    where
        F: Future,
    {
        info!(
            mode = ?self.config.mode,
            market = %self.config.bracket.market,
            direction = %self.config.trade.direction,
            interval_ms = self.config.poll.interval_ms,
            max_cycles = self.config.poll.max_cycles,
            "Starting trade loop"
        );

        let mut interval = tokio::time::interval(self.config.poll.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                _ = interval.tick() => {
                    if self.active.is_none() && self.cycles_done() {
                        info!(completed = self.completed, "All cycles completed");
                        break;
                    }
                    self.tick().await?;
                }
            }
        }

        if let Some(bracket) = &self.active {
            warn!(
                entry_id = %bracket.entry.id,
                stop_loss_id = %bracket.stop_loss.id,
                take_profit_id = %bracket.take_profit.id,
                "Exiting with an unresolved bracket"
            );
        }

        match Metrics::gather_text() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
        info!(completed = self.completed, "Shutting down");
        Ok(())
    }

    /// One loop iteration: refresh prices, then open or poll.
    async fn tick(&mut self) -> AppResult<()> {
        let market = self.config.bracket.market.clone();
        match self.prices.next(&market).await {
            Ok(prices) => {
                let filled = self.gateway.update_prices(&market, prices);
                debug!(
                    %market,
                    oracle = %prices.oracle,
                    index = %prices.index,
                    filled = filled.len(),
                    "Prices refreshed"
                );
            }
            Err(e) => {
                warn!(error = %e, "Price refresh failed, retrying next tick");
                return Ok(());
            }
        }

        match self.active.take() {
            None => self.open().await,
            Some(bracket) => {
                self.poll(bracket).await;
                Ok(())
            }
        }
    }

    async fn open(&mut self) -> AppResult<()> {
        let request = self.config.trade.request();
        match self.builder.open(&self.gateway, &request).await {
            Ok(bracket) => {
                info!(
                    cycle = self.completed + 1,
                    entry = %bracket.entry_price(),
                    stop_loss = %bracket.stop_loss.price,
                    take_profit = %bracket.take_profit.price,
                    "Bracket opened"
                );
                self.monitor.reset();
                self.active = Some(bracket);
                Ok(())
            }
            Err(EngineError::Gateway(e)) => {
                warn!(error = %e, "Bracket open failed, retrying next tick");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Bracket open failed");
                Err(AppError::Engine(e))
            }
        }
    }

    async fn poll(&mut self, bracket: Bracket) {
        match self.monitor.poll(&self.gateway, Some(&bracket)).await {
            Ok(phase) if phase.is_live() => {
                self.active = Some(bracket);
            }
            Ok(phase) => {
                self.completed += 1;
                info!(
                    cycle = self.completed,
                    %phase,
                    polls = self.monitor.polls(),
                    "Bracket resolved"
                );
            }
            Err(e) => {
                warn!(error = %e, "Bracket poll failed, retrying next tick");
                self.active = Some(bracket);
            }
        }
    }
}
