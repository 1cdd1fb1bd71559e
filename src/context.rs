//! Request-scoped context carrying values, deadlines, and cancellation.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::error::Error;

/// Ambient data governing a single request: typed values a resolver can
/// key on (a tenant id, a sandbox handle), an optional deadline, and an
/// optional cooperative cancellation signal.
///
/// Cheap to clone; clones observe the same cancellation signal.
#[derive(Clone, Default)]
pub struct RequestContext {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    deadline: Option<Instant>,
    cancelled: Option<watch::Receiver<bool>>,
}

impl RequestContext {
    /// Creates an empty context with no values, deadline, or cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a value, keyed by its type. A second value of the same
    /// type replaces the first.
    pub fn with_value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Looks up a value by type.
    pub fn value<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get(&TypeId::of::<T>())?.downcast_ref::<T>()
    }

    /// Sets a deadline. If a deadline is already set, the earlier one wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// Sets a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Makes the context cancellable, returning the handle that cancels it.
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancelled = Some(rx);
        (self, CancelHandle { tx: Arc::new(tx) })
    }

    /// The context's deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the context has been cancelled or its deadline has passed.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The reason the context is done, or `None` if it is still live.
    /// Cancellation takes precedence over an expired deadline.
    pub fn done_error(&self) -> Option<Error> {
        if self.is_cancelled() {
            Some(Error::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Error::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Pends forever on a context with neither.
    pub async fn done(&self) {
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d.into()).await,
                None => std::future::pending::<()>().await,
            }
        };
        let cancelled = async {
            match self.cancelled.clone() {
                Some(mut rx) => loop {
                    if *rx.borrow_and_update() {
                        break;
                    }
                    if rx.changed().await.is_err() {
                        // Handle dropped without firing; cancellation can
                        // no longer happen.
                        std::future::pending::<()>().await;
                    }
                },
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = deadline => {}
            _ = cancelled => {}
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("values", &self.values.len())
            .field("deadline", &self.deadline)
            .field("cancellable", &self.cancelled.is_some())
            .finish()
    }
}

/// Cancels the context it was created from. Cloneable; any clone may fire.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Cancels the associated context. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TenantId(&'static str);

    #[test]
    fn test_value_lookup_by_type() {
        let ctx = RequestContext::new().with_value(TenantId("acme"));
        assert_eq!(ctx.value::<TenantId>(), Some(&TenantId("acme")));
        assert_eq!(ctx.value::<String>(), None);
    }

    #[test]
    fn test_value_replaced_by_same_type() {
        let ctx = RequestContext::new()
            .with_value(TenantId("acme"))
            .with_value(TenantId("globex"));
        assert_eq!(ctx.value::<TenantId>(), Some(&TenantId("globex")));
    }

    #[test]
    fn test_fresh_context_is_live() {
        let ctx = RequestContext::new();
        assert!(!ctx.is_done());
        assert!(ctx.done_error().is_none());
    }

    #[test]
    fn test_expired_deadline_is_done() {
        let ctx = RequestContext::new().with_deadline(Instant::now());
        assert!(ctx.is_done());
        assert!(matches!(ctx.done_error(), Some(Error::DeadlineExceeded)));
    }

    #[test]
    fn test_earlier_deadline_wins() {
        let near = Instant::now() + Duration::from_secs(1);
        let far = Instant::now() + Duration::from_secs(60);
        let ctx = RequestContext::new().with_deadline(far).with_deadline(near);
        assert_eq!(ctx.deadline(), Some(near));

        let ctx = RequestContext::new().with_deadline(near).with_deadline(far);
        assert_eq!(ctx.deadline(), Some(near));
    }

    #[test]
    fn test_cancel_marks_context_done() {
        let (ctx, cancel) = RequestContext::new().with_cancel();
        assert!(!ctx.is_done());

        cancel.cancel();
        assert!(ctx.is_done());
        assert!(matches!(ctx.done_error(), Some(Error::Cancelled)));
    }

    #[test]
    fn test_cancellation_precedes_expired_deadline() {
        let (ctx, cancel) = RequestContext::new()
            .with_deadline(Instant::now())
            .with_cancel();
        cancel.cancel();
        assert!(matches!(ctx.done_error(), Some(Error::Cancelled)));
    }

    #[test]
    fn test_clones_share_cancellation() {
        let (ctx, cancel) = RequestContext::new().with_cancel();
        let clone = ctx.clone();
        cancel.cancel();
        assert!(clone.is_done());
    }

    #[tokio::test]
    async fn test_done_resolves_on_cancel() {
        let (ctx, cancel) = RequestContext::new().with_cancel();
        let waiter = tokio::spawn(async move { ctx.done().await });
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("done() should resolve after cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn test_done_resolves_on_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(1), ctx.done())
            .await
            .expect("done() should resolve after the deadline");
    }
}
