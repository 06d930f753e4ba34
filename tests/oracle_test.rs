mod helpers;

use chrono::Duration;
use helpers::*;
use pricecall_backend::clock::Clock;
use pricecall_backend::error::ErrorKind;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_reads_within_ttl_return_identical_quote() {
    let h = TestHarness::new();

    let first = assert_ok!(h.oracle.cached_price().await);
    h.clock.advance(Duration::seconds(10));
    h.source.set_price(usd("51234.56"));
    let second = assert_ok!(h.oracle.cached_price().await);

    assert_eq!(first, second);
    assert_eq!(first.as_of, start_time());
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn test_read_after_ttl_refreshes() {
    let h = TestHarness::new();

    h.oracle.cached_price().await.unwrap();
    h.clock.advance(Duration::seconds(20));
    h.source.set_price(usd("51234.56"));
    let refreshed = h.oracle.cached_price().await.unwrap();

    assert_eq!(refreshed.price, usd("51234.56"));
    assert_eq!(refreshed.as_of, h.clock.now());
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn test_failed_refresh_serves_stale_quote() {
    let h = TestHarness::without_fallback();

    let cached = h.oracle.cached_price().await.unwrap();
    h.clock.advance(Duration::seconds(300));
    h.source.go_down();
    let stale = assert_ok!(h.oracle.cached_price().await);

    assert_eq!(stale, cached);
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn test_no_cached_value_and_no_fallback_fails() {
    let h = TestHarness::without_fallback();
    h.source.go_down();

    let err = assert_err!(h.oracle.cached_price().await);
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
}

#[tokio::test]
async fn test_expired_cache_refreshes_from_fallback_when_source_down() {
    let h = TestHarness::new();

    h.oracle.cached_price().await.unwrap();
    h.clock.advance(Duration::seconds(21));
    h.source.go_down();
    let quote = h.oracle.cached_price().await.unwrap();

    assert!(quote.price >= fallback_min() && quote.price <= fallback_max());
    assert_eq!(quote.as_of, h.clock.now());
}

#[tokio::test]
async fn test_current_price_bypasses_cache() {
    let h = TestHarness::new();

    h.oracle.cached_price().await.unwrap();
    h.source.set_price(usd("50100.00"));
    let live = h.oracle.current_price().await.unwrap();
    let cached = h.oracle.cached_price().await.unwrap();

    assert_eq!(live, usd("50100.00"));
    assert_eq!(cached.price, usd("50000.00"));
}

#[tokio::test]
async fn test_current_price_falls_back_only_when_enabled() {
    let with_fallback = TestHarness::new();
    with_fallback.source.go_down();
    let price = assert_ok!(with_fallback.oracle.current_price().await);
    assert!(price >= fallback_min() && price <= fallback_max());

    let without = TestHarness::without_fallback();
    without.source.go_down();
    let err = assert_err!(without.oracle.current_price().await);
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
}
