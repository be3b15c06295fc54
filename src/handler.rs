use std::{future::Future, marker::PhantomData, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{EventKind, Result};

/// Behaviour triggered for a given event kind.
///
/// Handlers are registered in a [`HandlerRegistry`](crate::HandlerRegistry)
/// and invoked by the [`Dispatcher`](crate::Dispatcher), one at a time. A
/// handler may suspend internally (I/O, simulated latency); the dispatcher
/// waits for it to finish before taking the next event.
///
/// Returning an error does not stop the dispatcher: the failure is logged,
/// reported to monitors and the next event is processed.
///
/// # Examples
///
/// ```rust
/// use evroute::{Handler, Result, UserEvent, async_trait};
///
/// struct AuditLog;
///
/// #[async_trait]
/// impl Handler<UserEvent> for AuditLog {
///     async fn handle(&self, kind: UserEvent, payload: &str) -> Result<()> {
///         println!("{kind}: {payload}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<K: EventKind>: Send + Sync {
    async fn handle(&self, kind: K, payload: &str) -> Result<()>;
}

/// Adapter turning an async closure into a [`Handler`].
///
/// The payload is handed over as an owned `Arc<str>` so the returned future
/// doesn't borrow from the dispatcher.
pub struct FnHandler<K, F> {
    f: F,
    _kind: PhantomData<fn(K)>,
}

/// Wrap an async closure as a handler.
///
/// ```rust
/// use evroute::{UserEvent, handler_fn};
///
/// let handler = handler_fn(|kind: UserEvent, payload| async move {
///     println!("{kind}: {payload}");
///     Ok(())
/// });
/// ```
pub fn handler_fn<K, F, Fut>(f: F) -> FnHandler<K, F>
where
    K: EventKind,
    F: Fn(K, Arc<str>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    FnHandler {
        f,
        _kind: PhantomData,
    }
}

#[async_trait]
impl<K, F, Fut> Handler<K> for FnHandler<K, F>
where
    K: EventKind,
    F: Fn(K, Arc<str>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn handle(&self, kind: K, payload: &str) -> Result<()> {
        (self.f)(kind, Arc::from(payload)).await
    }
}

impl<K, F> std::fmt::Debug for FnHandler<K, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Handler that logs the event and then waits a fixed latency, standing in
/// for a real side effect such as a network call.
#[derive(Debug, Clone)]
pub struct LogHandler {
    latency: Duration,
}

impl LogHandler {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for LogHandler {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl<K: EventKind> Handler<K> for LogHandler {
    async fn handle(&self, kind: K, payload: &str) -> Result<()> {
        tracing::info!(kind = %kind.name(), "consuming {} event: {}", kind.name(), payload);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(())
    }
}
