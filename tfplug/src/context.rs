//! Request-scoped context
//!
//! Carries cancellation, an optional deadline and typed values across async
//! boundaries. Pass it as the first parameter of every async trait method.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::time;

type Values = Arc<RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>>;

#[derive(Clone)]
pub struct Context {
    deadline: Option<Instant>,
    values: Values,
    done_tx: Arc<watch::Sender<bool>>,
    done: watch::Receiver<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done) = watch::channel(false);
        Self {
            deadline: None,
            values: Arc::new(RwLock::new(HashMap::new())),
            done_tx: Arc::new(done_tx),
            done,
        }
    }

    /// Derived context cancelled after `timeout` or when this one is.
    /// Values are shared with the parent.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };

        let (done_tx, done) = watch::channel(*self.done.borrow());
        let done_tx = Arc::new(done_tx);

        let child_tx = done_tx.clone();
        let mut parent_done = self.done.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = wait_cancelled(&mut parent_done) => {}
                _ = child_tx.closed() => return,
            }
            let _ = child_tx.send(true);
        });

        Self {
            deadline: Some(deadline),
            values: self.values.clone(),
            done_tx,
            done,
        }
    }

    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        self.values
            .write()
            .await
            .insert(key.to_string(), Arc::new(value));
        self
    }

    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let values = self.values.read().await;
        values.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, None when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.done.clone();
        wait_cancelled(&mut done).await;
    }

    pub fn cancel(&self) {
        let _ = self.done_tx.send(true);
    }
}

async fn wait_cancelled(done: &mut watch::Receiver<bool>) {
    loop {
        if *done.borrow_and_update() {
            return;
        }
        if done.changed().await.is_err() {
            // sender gone, cancellation can no longer happen
            std::future::pending::<()>().await;
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_stores_and_retrieves_values() {
        let ctx = Context::new()
            .with_value("blueprint_id", "bp-1".to_string())
            .await;

        let value: Option<String> = ctx.get_value("blueprint_id").await;
        assert_eq!(value, Some("bp-1".to_string()));
        assert_eq!(ctx.get_value::<u32>("blueprint_id").await, None);
    }

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(120)).await;
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn timeout_context_keeps_parent_values() {
        let parent = Context::new().with_value("k", 7u32).await;
        let child = parent.with_timeout(Duration::from_secs(5));
        assert_eq!(child.get_value::<u32>("k").await, Some(7));
        assert!(child.remaining().is_some_and(|r| r <= Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn cancelling_parent_cancels_child() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(30));

        parent.cancel();
        time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .unwrap();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.deadline().is_none());

        ctx.cancel();
        assert!(ctx.is_cancelled());
    }
}
