//! Dispatch notifications for SMS, push and toast consumers
//!
//! Two delivery paths: synchronous callbacks registered with
//! [`NotificationEmitter::on_token_dispatched`], and a broadcast channel for
//! async consumers. A failing or panicking callback is logged and skipped;
//! it never affects the dispatch or the other subscribers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use queue_types::DispatchNotice;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Handle returned when registering a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub uuid::Uuid);

impl SubscriptionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure reported by a notification subscriber
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriberError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

pub type DispatchCallback =
    Arc<dyn Fn(&DispatchNotice) -> Result<(), SubscriberError> + Send + Sync>;

/// Fans dispatch notices out to every subscriber
pub struct NotificationEmitter {
    sender: broadcast::Sender<DispatchNotice>,
    callbacks: RwLock<Vec<(SubscriptionId, DispatchCallback)>>,
}

impl NotificationEmitter {
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Register a callback invoked once per dispatch
    pub fn on_token_dispatched<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DispatchNotice) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        let id = SubscriptionId::generate();
        self.callbacks.write().push((id, Arc::new(callback)));
        debug!(subscription = %id, "Dispatch callback registered");
        id
    }

    /// Remove a callback. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(sid, _)| *sid != id);
        let removed = callbacks.len() != before;
        if removed {
            debug!(subscription = %id, "Dispatch callback removed");
        }
        removed
    }

    /// Receive notices asynchronously
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchNotice> {
        self.sender.subscribe()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Deliver a notice to every subscriber.
    ///
    /// Returns how many callbacks accepted it.
    pub fn emit(&self, notice: &DispatchNotice) -> usize {
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<_> = self.callbacks.read().clone();
        let mut delivered = 0;

        for (id, callback) in callbacks {
            let result = catch_unwind(AssertUnwindSafe(|| callback(notice)))
                .unwrap_or_else(|panic| Err(SubscriberError::Panicked(panic_message(&*panic))));
            match result {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    subscription = %id,
                    token_number = notice.token_number,
                    error = %e,
                    "Dispatch subscriber failed"
                ),
            }
        }

        // No receivers is fine
        let _ = self.sender.send(notice.clone());

        debug!(
            token_number = notice.token_number,
            delivered,
            recall = notice.recall,
            "Dispatch notice emitted"
        );
        delivered
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
