//! "Run this settlement at time T" capability.
//!
//! The engine only produces schedule requests. `TokioScheduler` satisfies the
//! capability in-process by sleeping until the requested instant and handing
//! a [`SettlementInvocation::Timer`] to the settlement worker over a channel.

use crate::clock::Clock;
use crate::error::AppError;
use crate::services::SettlementInvocation;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Payload delivered back to the settlement entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPayload {
    pub guess_id: Uuid,
    pub player_id: Uuid,
}

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("settlement receiver is closed")]
    Closed,

    #[error("scheduler rejected request: {0}")]
    Rejected(String),
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        AppError::SchedulingFailed(err.to_string())
    }
}

/// Schedules a single future settlement invocation.
///
/// Implementations must deliver at least once, at or after `when`.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn schedule_once(
        &self,
        when: DateTime<Utc>,
        payload: SettlementPayload,
    ) -> Result<(), SchedulingError>;
}

/// Timer-task scheduler on the tokio runtime.
///
/// Pending timers live only as long as the process; the settlement worker's
/// overdue sweep picks up whatever a restart drops.
pub struct TokioScheduler {
    sender: mpsc::Sender<SettlementInvocation>,
    clock: Arc<dyn Clock>,
}

impl TokioScheduler {
    pub fn new(sender: mpsc::Sender<SettlementInvocation>, clock: Arc<dyn Clock>) -> Self {
        Self { sender, clock }
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn schedule_once(
        &self,
        when: DateTime<Utc>,
        payload: SettlementPayload,
    ) -> Result<(), SchedulingError> {
        if self.sender.is_closed() {
            return Err(SchedulingError::Closed);
        }

        // Negative means already due
        let delay = (when - self.clock.now()).to_std().unwrap_or_default();
        let sender = self.sender.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let invocation = SettlementInvocation::Timer {
                guess_id: payload.guess_id,
                player_id: payload.player_id,
            };
            if sender.send(invocation).await.is_err() {
                warn!("Settlement timer for guess {} fired after worker shut down", payload.guess_id);
            }
        });

        debug!("Armed settlement timer for guess {} in {:?}", payload.guess_id, delay);
        Ok(())
    }
}
