use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

/// A price together with the instant it was fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub price: Decimal,
    pub as_of: DateTime<Utc>,
}

/// Last-known price with a fixed time-to-live.
///
/// Entries are never evicted: an expired entry stays available as "stale"
/// until a refresh replaces it. Concurrent refreshes are last-writer-wins.
pub struct PriceCache {
    ttl: Duration,
    entry: RwLock<Option<PriceQuote>>,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// The cached quote if its age at `now` is below the TTL
    pub async fn fresh(&self, now: DateTime<Utc>) -> Option<PriceQuote> {
        let entry = *self.entry.read().await;
        entry.filter(|quote| now - quote.as_of < self.ttl)
    }

    /// The cached quote regardless of age
    pub async fn latest(&self) -> Option<PriceQuote> {
        *self.entry.read().await
    }

    pub async fn store(&self, price: Decimal, as_of: DateTime<Utc>) -> PriceQuote {
        let quote = PriceQuote { price, as_of };
        *self.entry.write().await = Some(quote);
        quote
    }
}
