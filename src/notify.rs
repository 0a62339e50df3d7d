//! Notification fan-out.
//!
//! Producers publish events through [`Notifier::publish`], which never
//! blocks and never fails the caller: when the queue is full the event
//! is counted and dropped. [`NotifyService`] drains the queue in a
//! tokio task and hands events to a [`NotifySink`]; delivery failures
//! are logged and the loop keeps going.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crossbeam_queue::ArrayQueue;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::time::interval;
use tracing::{info, warn};

use crate::core_types::{Symbol, UserId};
use crate::txlog::{Transaction, TxKind, TxStatus};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// One user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyEvent {
    pub user_id: UserId,
    pub kind: TxKind,
    pub reference: String,
    pub symbol: Symbol,
    pub amount: Decimal,
    pub status: TxStatus,
}

impl NotifyEvent {
    /// Build the notification for a mirror row.
    pub fn for_transaction(tx: &Transaction) -> Self {
        Self {
            user_id: tx.user_id,
            kind: tx.kind,
            reference: tx.reference.clone(),
            symbol: tx.symbol.clone(),
            amount: tx.amount,
            status: tx.status,
        }
    }
}

/// Where drained events end up.
#[async_trait]
pub trait NotifySink: Send + Sync {
    async fn deliver(&self, event: &NotifyEvent) -> Result<(), NotifyError>;
}

/// Sink that writes one log line per event.
pub struct LogSink;

#[async_trait]
impl NotifySink for LogSink {
    async fn deliver(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        info!(
            user_id = event.user_id,
            reference = %event.reference,
            kind = %event.kind,
            symbol = %event.symbol,
            amount = %event.amount,
            status = %event.status,
            "notify"
        );
        Ok(())
    }
}

/// Sink that records everything it receives, for tests.
pub struct CollectingSink {
    events: std::sync::Mutex<Vec<NotifyEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        match self.events.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for CollectingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifySink for CollectingSink {
    async fn deliver(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        let mut events = match self.events.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
        Ok(())
    }
}

/// Sink that rejects every event, for failure-path tests.
pub struct FailingSink {
    attempts: AtomicU32,
}

impl FailingSink {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for FailingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifySink for FailingSink {
    async fn deliver(&self, _event: &NotifyEvent) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Delivery("sink is down".to_string()))
    }
}

/// Fire-and-forget publisher side of the queue.
#[derive(Clone)]
pub struct Notifier {
    queue: Arc<ArrayQueue<NotifyEvent>>,
    dropped: Arc<AtomicU64>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue without blocking. A full queue drops the event.
    pub fn publish(&self, event: NotifyEvent) {
        if let Err(event) = self.queue.push(event) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                reference = %event.reference,
                "Notification queue full, dropping event"
            );
        }
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Consumer side. Runs in its own tokio task and polls the queue.
pub struct NotifyService {
    notifier: Notifier,
    sink: Arc<dyn NotifySink>,
}

impl NotifyService {
    pub fn new(notifier: Notifier, sink: Arc<dyn NotifySink>) -> Self {
        Self { notifier, sink }
    }

    /// Drain one batch. Returns the number of events handed to the sink.
    pub async fn drain(&self) -> usize {
        let mut count = 0;
        while let Some(event) = self.notifier.queue.pop() {
            if let Err(e) = self.sink.deliver(&event).await {
                warn!(reference = %event.reference, "Notification delivery failed: {}", e);
            }
            count += 1;
            if count >= 1000 {
                break;
            }
        }
        count
    }

    /// Run the service (consumes the queue until the task is aborted).
    pub async fn run(self) {
        let mut tick = interval(Duration::from_millis(10));
        info!("[NotifyService] Started - polling notification queue");

        loop {
            tick.tick().await;
            self.drain().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn event(reference: &str) -> NotifyEvent {
        NotifyEvent {
            user_id: 1,
            kind: TxKind::Deposit,
            reference: reference.to_string(),
            symbol: "BTC".to_string(),
            amount: dec!(1),
            status: TxStatus::Confirmed,
        }
    }

    #[tokio::test]
    async fn test_publish_and_drain() {
        let notifier = Notifier::new(8);
        let sink = Arc::new(CollectingSink::new());
        let service = NotifyService::new(notifier.clone(), sink.clone());

        notifier.publish(event("DEP_1"));
        notifier.publish(event("DEP_2"));
        assert_eq!(notifier.pending(), 2);

        let drained = service.drain().await;
        assert_eq!(drained, 2);
        assert_eq!(notifier.pending(), 0);

        let delivered = sink.events();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].reference, "DEP_1");
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let notifier = Notifier::new(2);
        notifier.publish(event("DEP_1"));
        notifier.publish(event("DEP_2"));
        notifier.publish(event("DEP_3"));

        assert_eq!(notifier.pending(), 2);
        assert_eq!(notifier.dropped(), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_stop_the_drain() {
        let notifier = Notifier::new(8);
        let sink = Arc::new(FailingSink::new());
        let service = NotifyService::new(notifier.clone(), sink.clone());

        notifier.publish(event("DEP_1"));
        notifier.publish(event("DEP_2"));

        let drained = service.drain().await;
        assert_eq!(drained, 2);
        assert_eq!(sink.attempts(), 2);
        assert_eq!(notifier.pending(), 0);
    }

    #[test]
    fn test_event_from_transaction() {
        let log = crate::txlog::TransactionLog::new();
        let tx = log
            .append(
                "WD_9".to_string(),
                TxKind::Withdrawal,
                42,
                "ETH",
                dec!(3.5),
                TxStatus::Pending,
            )
            .unwrap();

        let event = NotifyEvent::for_transaction(&tx);
        assert_eq!(event.user_id, 42);
        assert_eq!(event.reference, "WD_9");
        assert_eq!(event.status, TxStatus::Pending);
    }
}
