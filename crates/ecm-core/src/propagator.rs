//! Asynchronous update propagation
//!
//! Bulk edits are never applied to single cases on the request path. The
//! engine hands the target references and the delta to an
//! [`UpdatePropagator`]; a successful hand-off means "queued", not
//! "applied", and per-case outcomes never flow back to the engine.

use crate::error::PropagationError;
use crate::store::{submit_case_update, CaseStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ecm_model::{AuthToken, UpdateDelta};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use ulid::Ulid;

/// Proof of hand-off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueReceipt {
    /// Message id
    pub message_id: Ulid,
    /// When the message was queued
    pub enqueued_at: DateTime<Utc>,
    /// Number of target cases
    pub case_count: usize,
}

/// Async fan-out of an update to many single cases
#[async_trait]
pub trait UpdatePropagator: Send + Sync {
    /// Queue `delta` for every case reference in `case_ids`
    async fn enqueue(
        &self,
        case_ids: Vec<String>,
        delta: UpdateDelta,
    ) -> Result<QueueReceipt, PropagationError>;
}

/// Message carried on the queue
#[derive(Debug, Clone)]
pub struct PropagationMessage {
    pub id: Ulid,
    pub enqueued_at: DateTime<Utc>,
    pub case_ids: Vec<String>,
    pub delta: UpdateDelta,
}

/// Consumer-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Messages consumed
    pub messages: usize,
    /// Cases updated
    pub applied: usize,
    /// Cases that could not be updated
    pub failed: usize,
}

/// Propagator backed by a bounded in-process channel
#[derive(Debug, Clone)]
pub struct ChannelPropagator {
    sender: mpsc::Sender<PropagationMessage>,
    capacity: usize,
}

impl ChannelPropagator {
    /// Create propagator and the receiving end of its queue
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PropagationMessage>) {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, capacity }, receiver)
    }

    /// Create propagator with a consumer task applying deltas to `store`
    ///
    /// The task ends once every propagator clone is dropped and the queue
    /// drains; its handle yields the consumer counters.
    #[must_use]
    pub fn spawn(
        store: Arc<dyn CaseStore>,
        auth: AuthToken,
        capacity: usize,
    ) -> (Self, JoinHandle<ConsumerStats>) {
        let (propagator, receiver) = Self::new(capacity);
        let handle = tokio::spawn(propagation_worker(store, auth, receiver));
        (propagator, handle)
    }
}

#[async_trait]
impl UpdatePropagator for ChannelPropagator {
    async fn enqueue(
        &self,
        case_ids: Vec<String>,
        delta: UpdateDelta,
    ) -> Result<QueueReceipt, PropagationError> {
        if case_ids.is_empty() {
            return Err(PropagationError::NoTargets);
        }

        let message = PropagationMessage {
            id: Ulid::new(),
            enqueued_at: Utc::now(),
            case_ids,
            delta,
        };
        let receipt = QueueReceipt {
            message_id: message.id,
            enqueued_at: message.enqueued_at,
            case_count: message.case_ids.len(),
        };

        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => PropagationError::QueueFull(self.capacity),
            TrySendError::Closed(_) => PropagationError::Closed,
        })?;

        tracing::info!(
            message_id = %receipt.message_id,
            cases = receipt.case_count,
            "Queued bulk update"
        );
        Ok(receipt)
    }
}

/// Consumer loop (runs in a separate tokio task)
pub async fn propagation_worker(
    store: Arc<dyn CaseStore>,
    auth: AuthToken,
    mut receiver: mpsc::Receiver<PropagationMessage>,
) -> ConsumerStats {
    let mut stats = ConsumerStats::default();

    while let Some(message) = receiver.recv().await {
        stats.messages += 1;
        let (applied, failed) = apply_message(store.as_ref(), &auth, &message).await;
        stats.applied += applied;
        stats.failed += failed;
    }

    tracing::debug!(?stats, "Propagation worker stopped");
    stats
}

async fn apply_message(
    store: &dyn CaseStore,
    auth: &AuthToken,
    message: &PropagationMessage,
) -> (usize, usize) {
    let delta = &message.delta;
    let cases = match store
        .retrieve_by_ids(auth, &delta.case_type_id, &delta.jurisdiction, &message.case_ids)
        .await
    {
        Ok(cases) => cases,
        Err(e) => {
            tracing::error!(message_id = %message.id, "Could not load target cases: {}", e);
            return (0, message.case_ids.len());
        }
    };

    let missing = message.case_ids.len().saturating_sub(cases.len());
    let mut applied = 0;
    let mut failed = missing;

    for mut case in cases {
        delta.changes.apply_to(&mut case);
        match submit_case_update(store, auth, &delta.case_type_id, &delta.jurisdiction, &case).await {
            Ok(_) => {
                applied += 1;
                tracing::debug!(message_id = %message.id, reference = %case.reference, "Applied update");
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(message_id = %message.id, reference = %case.reference, "Update failed: {}", e);
            }
        }
    }

    (applied, failed)
}
