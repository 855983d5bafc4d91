//! Reference prices over public REST.
//!
//! Fetches oracle and index prices from the exchange's public markets
//! endpoint (`GET {base_url}/v3/markets?market=ETH-USD`). No
//! authentication is needed, which makes it usable to drive the paper
//! exchange with live prices.

use std::collections::HashMap;
use std::time::Duration;

use bracket_core::{MarketId, Price, ReferencePriceKind};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};

/// Default timeout for price requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Oracle and index price for one market at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPrices {
    pub oracle: Price,
    pub index: Price,
}

impl MarketPrices {
    pub fn get(&self, kind: ReferencePriceKind) -> Price {
        match kind {
            ReferencePriceKind::Oracle => self.oracle,
            ReferencePriceKind::Index => self.index,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    markets: HashMap<String, RawMarket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarket {
    oracle_price: String,
    index_price: String,
}

/// Client for the public markets endpoint.
pub struct HttpPriceFeed {
    client: Client,
    base_url: String,
}

impl HttpPriceFeed {
    /// Create a new price feed.
    ///
    /// # Arguments
    /// * `base_url` - API host, e.g. "https://api.dydx.exchange"
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch current oracle and index prices for `market`.
    pub async fn fetch(&self, market: &MarketId) -> GatewayResult<MarketPrices> {
        let url = format!("{}/v3/markets", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("market", market.as_str())])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let prices = parse_markets_response(&body, market)?;
        debug!(%market, oracle = %prices.oracle, index = %prices.index, "Fetched reference prices");
        Ok(prices)
    }
}

/// Extract `market`'s prices from a markets endpoint body.
pub fn parse_markets_response(body: &str, market: &MarketId) -> GatewayResult<MarketPrices> {
    let parsed: MarketsResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::InvalidResponse(format!("markets response: {e}")))?;

    let raw = parsed
        .markets
        .get(market.as_str())
        .ok_or_else(|| GatewayError::PriceUnavailable(format!("{market} missing from response")))?;

    let parse = |field: &str, value: &str| -> GatewayResult<Price> {
        let price: Price = value
            .parse()
            .map_err(|e| GatewayError::InvalidResponse(format!("{field} '{value}': {e}")))?;
        if !price.is_positive() {
            return Err(GatewayError::InvalidResponse(format!(
                "{field} must be positive, got {value}"
            )));
        }
        Ok(price)
    };

    Ok(MarketPrices {
        oracle: parse("oraclePrice", &raw.oracle_price)?,
        index: parse("indexPrice", &raw.index_price)?,
    })
}
