//! Price oracle: live price source, bounded-staleness cache and a degraded
//! fallback generator.
//!
//! ```text
//! current_price():  PriceSource ──fail──> FallbackGenerator
//! cached_price():   PriceCache (fresh) ──expired──> current path ──fail──> stale entry
//! ```

mod cache;
mod fallback;
mod http;

pub use cache::{PriceCache, PriceQuote};
pub use fallback::FallbackGenerator;
pub use http::{parse_price, HttpPriceSource};

use crate::clock::Clock;
use crate::config::OracleConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Primary-source failures. These never escape the oracle as-is.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("price request failed: {0}")]
    Transport(String),

    #[error("price request timed out")]
    Timeout,

    #[error("price source returned status {0}")]
    Status(u16),

    #[error("malformed price response: {0}")]
    Malformed(String),
}

/// Remote source of the current asset price
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self) -> Result<Decimal, OracleError>;
}

/// Owns the primary source, the optional fallback generator and the cache
pub struct PriceOracle {
    source: Arc<dyn PriceSource>,
    fallback: Option<FallbackGenerator>,
    cache: PriceCache,
    clock: Arc<dyn Clock>,
}

impl PriceOracle {
    pub fn new(
        source: Arc<dyn PriceSource>,
        fallback: Option<FallbackGenerator>,
        cache_ttl: chrono::Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            fallback,
            cache: PriceCache::new(cache_ttl),
            clock,
        }
    }

    /// Build an oracle backed by the configured HTTP endpoint
    pub fn from_config(config: &OracleConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let source = HttpPriceSource::new(
            config.endpoint.clone(),
            config.asset.clone(),
            config.currency.clone(),
            config.request_timeout(),
        )
        .map_err(|e| AppError::Config(format!("Failed to build price client: {}", e)))?;

        let fallback = if config.fallback_enabled {
            Some(FallbackGenerator::new(
                config.fallback_min,
                config.fallback_max,
                config.fallback_seed,
            ))
        } else {
            None
        };

        Ok(Self::new(Arc::new(source), fallback, config.cache_ttl(), clock))
    }

    /// Freshest available price: primary source, or the fallback generator
    /// when the primary fails.
    ///
    /// Only fails (`UpstreamUnavailable`) when fallback is disabled.
    pub async fn current_price(&self) -> AppResult<Decimal> {
        match self.source.fetch_price().await {
            Ok(price) => Ok(price),
            Err(e) => match &self.fallback {
                Some(fallback) => {
                    let price = fallback.generate();
                    warn!("Price source unavailable ({}), using fallback price {}", e, price);
                    Ok(price)
                }
                None => Err(AppError::UpstreamUnavailable(e.to_string())),
            },
        }
    }

    /// Cached price for read paths.
    ///
    /// Serves the cached entry while younger than the TTL, refreshes it
    /// otherwise, and falls back to the stale entry if the refresh fails.
    pub async fn cached_price(&self) -> AppResult<PriceQuote> {
        let now = self.clock.now();

        if let Some(quote) = self.cache.fresh(now).await {
            debug!("Serving cached price {} (as of {})", quote.price, quote.as_of);
            return Ok(quote);
        }

        match self.current_price().await {
            Ok(price) => Ok(self.cache.store(price, self.clock.now()).await),
            Err(e) => match self.cache.latest().await {
                Some(stale) => {
                    warn!("Price refresh failed ({}), serving stale price as of {}", e, stale.as_of);
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }
}
