//! Review Registry
//!
//! Generic row store plus the transition driver. Each row is guarded by
//! its own async mutex; a transition validates against the shared table,
//! runs the per-resource-kind side effect INSIDE the row lock, and only
//! then commits the new state. If the effect fails the row is untouched,
//! so status, ledger and mirror never diverge.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use super::state::ReviewState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: ReviewState, to: ReviewState },

    #[error("Request not found: {0}")]
    NotFound(String),
}

/// A resource that carries review status.
pub trait Reviewed: Clone + Send + 'static {
    fn state(&self) -> ReviewState;

    /// Set the new state. Implementations also refresh their own
    /// `updated_at` timestamp here.
    fn set_state(&mut self, state: ReviewState);
}

/// Side effect bound to a state transition of one resource kind.
///
/// `apply` runs while the row lock is held: a returned error aborts the
/// transition entirely. Implementations must therefore order their own
/// steps so anything fallible happens before anything irreversible.
#[async_trait]
pub trait ReviewEffect<T>: Send + Sync {
    type Error: From<ReviewError> + Send;

    async fn apply(
        &self,
        resource: &T,
        from: ReviewState,
        to: ReviewState,
    ) -> Result<(), Self::Error>;
}

/// Effect that does nothing. For transitions without side effects.
pub struct NoEffect;

#[async_trait]
impl<T: Reviewed + Sync> ReviewEffect<T> for NoEffect {
    type Error = ReviewError;

    async fn apply(
        &self,
        _resource: &T,
        _from: ReviewState,
        _to: ReviewState,
    ) -> Result<(), ReviewError> {
        Ok(())
    }
}

/// Row store for one reviewed resource kind, keyed by request id.
pub struct ReviewRegistry<T: Reviewed> {
    rows: DashMap<String, Arc<Mutex<T>>>,
}

impl<T: Reviewed> ReviewRegistry<T> {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    /// Register a freshly created resource under its id.
    pub fn insert(&self, id: String, resource: T) {
        self.rows.insert(id, Arc::new(Mutex::new(resource)));
    }

    fn row(&self, id: &str) -> Option<Arc<Mutex<T>>> {
        self.rows.get(id).map(|e| e.value().clone())
    }

    /// Snapshot of one resource.
    pub async fn get(&self, id: &str) -> Option<T> {
        let row = self.row(id)?;
        let guard = row.lock().await;
        Some(guard.clone())
    }

    /// Snapshot of every resource matching the predicate.
    pub async fn filter<F>(&self, pred: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        // Collect handles first; never hold shard guards across an await.
        let rows: Vec<Arc<Mutex<T>>> = self.rows.iter().map(|e| e.value().clone()).collect();

        let mut out = Vec::new();
        for row in rows {
            let guard = row.lock().await;
            if pred(&guard) {
                out.push(guard.clone());
            }
        }
        out
    }

    /// Drive one transition, applying `effect` atomically with it.
    ///
    /// Validation order:
    /// 1. row must exist (`NotFound`)
    /// 2. the table must allow `current -> target` (`InvalidTransition`,
    ///    row untouched - this also makes terminal states idempotently
    ///    final)
    /// 3. the effect must succeed (its error propagates, row untouched)
    pub async fn transition<E>(
        &self,
        id: &str,
        target: ReviewState,
        effect: &E,
    ) -> Result<T, E::Error>
    where
        E: ReviewEffect<T>,
    {
        let row = self
            .row(id)
            .ok_or_else(|| E::Error::from(ReviewError::NotFound(id.to_string())))?;
        let mut guard = row.lock().await;

        let from = guard.state();
        if !from.can_transition_to(target) {
            return Err(E::Error::from(ReviewError::InvalidTransition {
                from,
                to: target,
            }));
        }

        let mut next = guard.clone();
        next.set_state(target);
        effect.apply(&next, from, target).await?;
        *guard = next.clone();
        drop(guard);

        info!(request_id = id, %from, %target, "review transition committed");
        Ok(next)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T: Reviewed> Default for ReviewRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
