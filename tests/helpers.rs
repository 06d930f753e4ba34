#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pricecall_backend::clock::{Clock, ManualClock};
use pricecall_backend::config::GameConfig;
use pricecall_backend::models::Player;
use pricecall_backend::oracle::{FallbackGenerator, OracleError, PriceOracle, PriceSource};
use pricecall_backend::repositories::{GuessStore, InMemoryGuessStore};
use pricecall_backend::scheduler::{Scheduler, SchedulingError, SettlementPayload};
use pricecall_backend::services::{GuessService, PlayerService};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Parse a price literal such as "50000.00"
pub fn usd(value: &str) -> Decimal {
    value.parse().expect("valid decimal literal")
}

pub fn fallback_min() -> Decimal {
    usd("30000.00")
}

pub fn fallback_max() -> Decimal {
    usd("70000.00")
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Price source whose answer the test controls. `None` means "down".
pub struct ScriptedPriceSource {
    price: Mutex<Option<Decimal>>,
    calls: AtomicUsize,
}

impl ScriptedPriceSource {
    pub fn new(price: Decimal) -> Self {
        Self {
            price: Mutex::new(Some(price)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_price(&self, price: Decimal) {
        *self.price.lock().unwrap() = Some(price);
    }

    pub fn go_down(&self) {
        *self.price.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for ScriptedPriceSource {
    async fn fetch_price(&self) -> Result<Decimal, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let price = *self.price.lock().unwrap();
        price.ok_or_else(|| OracleError::Transport("connection refused".to_string()))
    }
}

/// Scheduler that records requests and can be switched to reject them
#[derive(Default)]
pub struct RecordingScheduler {
    requests: Mutex<Vec<(DateTime<Utc>, SettlementPayload)>>,
    failing: AtomicBool,
}

impl RecordingScheduler {
    pub fn fail_requests(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<(DateTime<Utc>, SettlementPayload)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn schedule_once(
        &self,
        when: DateTime<Utc>,
        payload: SettlementPayload,
    ) -> Result<(), SchedulingError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SchedulingError::Rejected("timer service unavailable".to_string()));
        }
        self.requests.lock().unwrap().push((when, payload));
        Ok(())
    }
}

/// Engine wired over in-memory capabilities and a manual clock
pub struct TestHarness {
    pub store: Arc<InMemoryGuessStore>,
    pub clock: Arc<ManualClock>,
    pub source: Arc<ScriptedPriceSource>,
    pub scheduler: Arc<RecordingScheduler>,
    pub oracle: Arc<PriceOracle>,
    pub players: PlayerService,
    pub guesses: GuessService,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(true)
    }

    pub fn without_fallback() -> Self {
        Self::build(false)
    }

    fn build(fallback_enabled: bool) -> Self {
        let store = Arc::new(InMemoryGuessStore::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let source = Arc::new(ScriptedPriceSource::new(usd("50000.00")));
        let scheduler = Arc::new(RecordingScheduler::default());

        let fallback = if fallback_enabled {
            Some(FallbackGenerator::new(fallback_min(), fallback_max(), Some(42)))
        } else {
            None
        };
        let oracle = Arc::new(PriceOracle::new(
            source.clone(),
            fallback,
            chrono::Duration::seconds(20),
            clock.clone(),
        ));

        let players = PlayerService::new(store.clone(), clock.clone());
        let guesses = GuessService::new(
            store.clone(),
            oracle.clone(),
            scheduler.clone(),
            clock.clone(),
            &GameConfig::default(),
        );

        Self {
            store,
            clock,
            source,
            scheduler,
            oracle,
            players,
            guesses,
        }
    }

    pub async fn player(&self, name: &str) -> Player {
        self.players
            .register_player(name)
            .await
            .expect("Failed to register player")
    }

    pub async fn score(&self, player: &Player) -> i64 {
        self.store
            .get_player(player.id)
            .await
            .expect("Failed to load player")
            .expect("Player should exist")
            .score
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
