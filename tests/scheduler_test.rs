mod helpers;

use chrono::Duration;
use helpers::*;
use pricecall_backend::clock::{Clock, ManualClock};
use pricecall_backend::config::GameConfig;
use pricecall_backend::error::ErrorKind;
use pricecall_backend::models::{Direction, Guess, GuessStatus};
use pricecall_backend::oracle::PriceOracle;
use pricecall_backend::repositories::{GuessStore, InMemoryGuessStore};
use pricecall_backend::scheduler::{Scheduler, SchedulingError, SettlementPayload, TokioScheduler};
use pricecall_backend::services::{GuessService, SettlementInvocation};
use pricecall_backend::settlement_worker::SettlementWorker;
use pricecall_backend::{AppConfig, AppState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Wired {
    app: AppState,
    store: Arc<InMemoryGuessStore>,
    clock: Arc<ManualClock>,
    source: Arc<ScriptedPriceSource>,
    sender: mpsc::Sender<SettlementInvocation>,
    _worker: JoinHandle<()>,
}

/// Full in-process wiring: TokioScheduler feeding a running SettlementWorker
fn wire(sweep_every: std::time::Duration) -> Wired {
    let config = AppConfig::default();
    let store = Arc::new(InMemoryGuessStore::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let source = Arc::new(ScriptedPriceSource::new(usd("50000.00")));
    let oracle = Arc::new(PriceOracle::new(
        source.clone(),
        None,
        Duration::seconds(20),
        clock.clone(),
    ));

    let (sender, receiver) = mpsc::channel(16);
    let scheduler = Arc::new(TokioScheduler::new(sender.clone(), clock.clone()));
    let app = AppState::new(&config, store.clone(), oracle, scheduler, clock.clone());

    let worker = SettlementWorker::new(app.guess_service.clone(), receiver)
        .with_sweep_interval(sweep_every)
        .with_sweep_batch_size(10);

    Wired {
        app,
        store,
        clock,
        source,
        sender,
        _worker: tokio::spawn(worker.start()),
    }
}

fn hours(n: u64) -> std::time::Duration {
    std::time::Duration::from_secs(n * 3600)
}

#[tokio::test(start_paused = true)]
async fn test_timer_settles_guess_at_resolve_time() {
    let w = wire(hours(1));
    let ada = w.app.player_service.register_player("Ada").await.unwrap();

    let created = w
        .app
        .guess_service
        .create_guess(ada.id, Direction::Up)
        .await
        .unwrap();
    assert!(created.scheduled);

    // Not yet due
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    let guess = w.store.get_guess(created.guess_id).await.unwrap().unwrap();
    assert_eq!(guess.status, GuessStatus::Active);

    w.source.set_price(usd("50500.00"));
    w.clock.advance(Duration::seconds(60));
    tokio::time::sleep(std::time::Duration::from_secs(31)).await;

    let guess = w.store.get_guess(created.guess_id).await.unwrap().unwrap();
    assert_eq!(guess.status, GuessStatus::Won);
    assert_eq!(guess.resolve_price, Some(usd("50500.00")));
    assert_eq!(w.store.get_player(ada.id).await.unwrap().unwrap().score, 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_timer_deliveries_score_once() {
    let w = wire(hours(1));
    let ada = w.app.player_service.register_player("Ada").await.unwrap();
    let created = w
        .app
        .guess_service
        .create_guess(ada.id, Direction::Down)
        .await
        .unwrap();

    w.source.set_price(usd("49000.00"));
    w.clock.advance(Duration::seconds(60));

    for _ in 0..3 {
        w.sender
            .send(SettlementInvocation::Timer {
                guess_id: created.guess_id,
                player_id: ada.id,
            })
            .await
            .unwrap();
    }
    // Let the worker drain the channel and the armed timer fire
    tokio::time::sleep(std::time::Duration::from_secs(120)).await;

    let guess = w.store.get_guess(created.guess_id).await.unwrap().unwrap();
    assert_eq!(guess.status, GuessStatus::Won);
    assert_eq!(w.store.get_player(ada.id).await.unwrap().unwrap().score, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_settles_guess_whose_timer_was_lost() {
    let w = wire(std::time::Duration::from_secs(30));
    let ada = w.app.player_service.register_player("Ada").await.unwrap();

    // Written straight to the store, so no timer was ever armed
    let guess = Guess::new(
        ada.id,
        Direction::Up,
        usd("40000.00"),
        w.clock.now() - Duration::seconds(120),
        Duration::seconds(60),
    );
    w.store.put_guess(&guess).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_secs(31)).await;

    let settled = w.store.get_guess(guess.id).await.unwrap().unwrap();
    assert_eq!(settled.status, GuessStatus::Won);
    assert_eq!(w.store.get_player(ada.id).await.unwrap().unwrap().score, 1);
}

#[tokio::test(start_paused = true)]
async fn test_worker_stops_when_all_senders_dropped() {
    let h = TestHarness::new();
    let (sender, receiver) = mpsc::channel(1);
    let guess_service = Arc::new(GuessService::new(
        h.store.clone(),
        h.oracle.clone(),
        h.scheduler.clone(),
        h.clock.clone(),
        &GameConfig::default(),
    ));
    let worker = tokio::spawn(SettlementWorker::new(guess_service, receiver).start());

    drop(sender);

    tokio::time::timeout(std::time::Duration::from_secs(5), worker)
        .await
        .expect("worker should stop")
        .unwrap();
}

#[tokio::test]
async fn test_closed_receiver_rejects_schedule() {
    let clock = Arc::new(ManualClock::new(start_time()));
    let (sender, receiver) = mpsc::channel(1);
    drop(receiver);
    let scheduler = TokioScheduler::new(sender, clock.clone());

    let payload = SettlementPayload {
        guess_id: uuid::Uuid::new_v4(),
        player_id: uuid::Uuid::new_v4(),
    };
    let result = scheduler
        .schedule_once(clock.now() + Duration::seconds(60), payload)
        .await;

    assert!(matches!(result, Err(SchedulingError::Closed)));
}

#[tokio::test]
async fn test_create_guess_survives_closed_scheduler() {
    let config = AppConfig::default();
    let store = Arc::new(InMemoryGuessStore::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let source = Arc::new(ScriptedPriceSource::new(usd("50000.00")));
    let oracle = Arc::new(PriceOracle::new(source, None, Duration::seconds(20), clock.clone()));

    let (sender, receiver) = mpsc::channel(1);
    drop(receiver);
    let scheduler = Arc::new(TokioScheduler::new(sender, clock.clone()));
    let app = AppState::new(&config, store.clone(), oracle, scheduler, clock);

    let ada = app.player_service.register_player("Ada").await.unwrap();
    let created = app
        .guess_service
        .create_guess(ada.id, Direction::Up)
        .await
        .unwrap();

    assert!(!created.scheduled);
    assert_eq!(created.schedule_error, Some(ErrorKind::SchedulingFailed));
    let active = store.find_active_guess(ada.id).await.unwrap().unwrap();
    assert_eq!(active.id, created.guess_id);
}
