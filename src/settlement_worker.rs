use crate::services::{GuessService, SettlementInvocation};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{error, info};

/// Background task that settles guesses delivered by the scheduler and
/// periodically sweeps ACTIVE guesses whose timer never fired
pub struct SettlementWorker {
    guess_service: Arc<GuessService>,
    receiver: mpsc::Receiver<SettlementInvocation>,
    sweep_interval: Duration,
    sweep_batch_size: i64,
}

impl SettlementWorker {
    pub fn new(
        guess_service: Arc<GuessService>,
        receiver: mpsc::Receiver<SettlementInvocation>,
    ) -> Self {
        Self {
            guess_service,
            receiver,
            sweep_interval: Duration::from_secs(30),
            sweep_batch_size: 100,
        }
    }

    /// Set sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set how many overdue guesses one sweep settles at most
    pub fn with_sweep_batch_size(mut self, batch_size: i64) -> Self {
        self.sweep_batch_size = batch_size;
        self
    }

    /// Run until every scheduler sender is dropped
    pub async fn start(mut self) {
        let mut sweep = time::interval(self.sweep_interval);
        info!("Settlement worker started, sweeping every {:?}", self.sweep_interval);

        loop {
            tokio::select! {
                invocation = self.receiver.recv() => {
                    match invocation {
                        Some(invocation) => self.settle(invocation).await,
                        None => {
                            info!("Settlement channel closed, worker stopping");
                            break;
                        }
                    }
                }
                _ = sweep.tick() => {
                    match self.guess_service.settle_overdue(self.sweep_batch_size).await {
                        Ok(0) => {}
                        Ok(n) => info!("Sweep settled {} overdue guesses", n),
                        Err(e) => error!("Overdue sweep failed: {}", e),
                    }
                }
            }
        }
    }

    async fn settle(&self, invocation: SettlementInvocation) {
        let guess_id = invocation.guess_id();
        match self.guess_service.handle_invocation(invocation).await {
            Ok(outcome) if outcome.already_settled => {
                info!("Guess {} was already settled as {}", guess_id, outcome.status.as_str());
            }
            Ok(_) => {}
            Err(e) => error!("Failed to settle guess {}: {}", guess_id, e),
        }
    }
}
