use super::{OracleError, PriceSource};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;

/// Fetches the price from a JSON endpoint shaped like
/// `{"<asset>": {"<currency>": <number>}}`
pub struct HttpPriceSource {
    client: Client,
    endpoint: String,
    asset: String,
    currency: String,
}

impl HttpPriceSource {
    pub fn new(
        endpoint: String,
        asset: String,
        currency: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            asset,
            currency,
        })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_price(&self) -> Result<Decimal, OracleError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            return Err(OracleError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout
            } else {
                OracleError::Malformed(e.to_string())
            }
        })?;

        parse_price(&body, &self.asset, &self.currency)
    }
}

fn map_transport(e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout
    } else {
        OracleError::Transport(e.to_string())
    }
}

/// Extract a positive, finite price at `body[asset][currency]`
pub fn parse_price(body: &Value, asset: &str, currency: &str) -> Result<Decimal, OracleError> {
    let raw = body
        .get(asset)
        .and_then(|quotes| quotes.get(currency))
        .ok_or_else(|| OracleError::Malformed(format!("missing {}.{}", asset, currency)))?;

    let value = raw
        .as_f64()
        .ok_or_else(|| OracleError::Malformed(format!("{}.{} is not a number", asset, currency)))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(OracleError::Malformed(format!("price {} is not positive", value)));
    }

    // NUMERIC(20, 8) in storage
    Decimal::from_f64(value)
        .map(|price| price.round_dp(8))
        .ok_or_else(|| OracleError::Malformed(format!("price {} is out of range", value)))
}
