use std::{any::Any, ops::Range, panic::AssertUnwindSafe, time::Duration};

use futures_util::FutureExt;
use rand::{SeedableRng, rngs::StdRng};
use tokio::{select, sync::watch};
use tokio_util::sync::CancellationToken;

use crate::{
    Config, Error, EventEnvelope, EventKind, EventQueue, HandlerRegistry, Result,
    internal::{pause, random_delay},
    monitor::{Monitor, Monitors},
};

/// What the dispatcher is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatcherState {
    /// Blocked on the queue, waiting for the next envelope.
    #[default]
    Waiting,
    /// Routing an envelope; a handler may be running.
    Dispatching,
}

/// Result of routing a single envelope.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The registered handler completed successfully.
    Handled,
    /// No handler was registered for the kind; the envelope was dropped.
    Unrouted,
    /// The handler returned an error or panicked.
    Failed(Error),
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled)
    }

    pub fn is_unrouted(&self) -> bool {
        matches!(self, DispatchOutcome::Unrouted)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DispatchOutcome::Failed(_))
    }
}

/// Counters collected by a dispatcher over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    pub handled: u64,
    pub unrouted: u64,
    pub failed: u64,
}

impl DispatchStats {
    /// Total number of envelopes taken off the queue.
    pub fn total(&self) -> u64 {
        self.handled + self.unrouted + self.failed
    }
}

/// The single consumer of an [`EventQueue`].
///
/// Loops forever: take the head of the queue, look up the handler for its
/// kind, await that handler (or drop the envelope when there is none), take
/// an optional pacing pause, repeat. Only one handler runs at a time.
///
/// - `run()` drives the loop until the cancellation token fires or every
///   queue sender is dropped.
/// - `dispatch(envelope)` performs a single routing step.
/// - `state()` exposes the `Waiting`/`Dispatching` state for observers.
///
/// A failing handler never stops the loop: its error (or panic) is logged,
/// reported to monitors and counted, and the next envelope is processed.
pub struct Dispatcher<K: EventKind> {
    queue: EventQueue<K>,
    registry: HandlerRegistry<K>,
    monitors: Monitors<K>,
    cancel_token: CancellationToken,
    pacing: Option<Range<Duration>>,
    shutdown_grace: Duration,
    state: watch::Sender<DispatcherState>,
    stats: DispatchStats,
    rng: StdRng,
}

impl<K: EventKind> Dispatcher<K> {
    /// Pacing and shutdown grace start from [`Config::default`].
    pub fn new(
        queue: EventQueue<K>,
        registry: HandlerRegistry<K>,
        cancel_token: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(DispatcherState::Waiting);
        Self {
            queue,
            registry,
            monitors: Monitors::new(),
            cancel_token,
            pacing: None,
            shutdown_grace: Config::default().shutdown_grace,
            state,
            stats: DispatchStats::default(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Apply pacing and shutdown settings from `config`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.pacing = config.dispatch_pacing.clone();
        self.shutdown_grace = config.shutdown_grace;
        self
    }

    pub fn with_pacing(mut self, pacing: Range<Duration>) -> Self {
        self.pacing = Some(pacing);
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_monitor<M: Monitor<K> + 'static>(mut self, monitor: M) -> Self {
        self.monitors.add(Box::new(monitor));
        self
    }

    pub(crate) fn add_boxed_monitor(&mut self, monitor: Box<dyn Monitor<K>>) {
        self.monitors.add(monitor);
    }

    /// Watch the dispatcher's state transitions.
    pub fn state(&self) -> watch::Receiver<DispatcherState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn registry(&self) -> &HandlerRegistry<K> {
        &self.registry
    }

    /// Run the dispatch loop until cancelled or until the queue closes.
    ///
    /// On cancellation, envelopes already buffered are still dispatched for up
    /// to the configured shutdown grace; anything left after that is dropped.
    pub async fn run(&mut self) -> Result<DispatchStats> {
        tracing::debug!(
            capacity = %self.queue.capacity(),
            monitors = self.monitors.len(),
            "dispatcher started"
        );
        loop {
            let envelope = select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                envelope = self.queue.get() => match envelope {
                    Some(envelope) => envelope,
                    None => {
                        tracing::debug!("event queue closed, dispatcher exiting");
                        return Ok(self.stats);
                    }
                },
            };

            self.dispatch(envelope).await;

            if let Some(pacing) = &self.pacing {
                let delay = random_delay(&mut self.rng, pacing);
                if !pause(&self.cancel_token, delay).await {
                    break;
                }
            }
        }
        self.shutdown().await;
        Ok(self.stats)
    }

    /// Route one envelope to its handler and wait for the handler to finish.
    pub async fn dispatch(&mut self, envelope: EventEnvelope<K>) -> DispatchOutcome {
        self.state.send_replace(DispatcherState::Dispatching);
        let outcome = self.route(&envelope).await;
        self.state.send_replace(DispatcherState::Waiting);
        outcome
    }

    async fn route(&mut self, envelope: &EventEnvelope<K>) -> DispatchOutcome {
        let kind = envelope.kind();
        let Some(handler) = self.registry.lookup(kind) else {
            tracing::debug!(
                kind = %kind.name(),
                event_id = %envelope.meta().id(),
                "no handler registered, dropping event"
            );
            self.stats.unrouted += 1;
            self.monitors.notify(|m| m.on_unrouted(envelope));
            return DispatchOutcome::Unrouted;
        };

        let result = AssertUnwindSafe(handler.handle(kind, envelope.payload()))
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(())) => {
                self.stats.handled += 1;
                self.monitors.notify(|m| m.on_dispatched(envelope));
                return DispatchOutcome::Handled;
            }
            Ok(Err(error)) => error,
            Err(panic) => Error::HandlerPanicked(panic_message(&*panic)),
        };

        tracing::error!(
            kind = %kind.name(),
            event_id = %envelope.meta().id(),
            producer = envelope.meta().producer(),
            %error,
            "handler failed, skipping event"
        );
        self.stats.failed += 1;
        self.monitors.notify(|m| m.on_handler_error(envelope, &error));
        DispatchOutcome::Failed(error)
    }

    async fn shutdown(&mut self) {
        use tokio::time::Instant;

        let start = Instant::now();
        while start.elapsed() < self.shutdown_grace {
            let Some(envelope) = self.queue.try_get() else {
                break;
            };
            self.dispatch(envelope).await;
        }

        let dropped = self.queue.len();
        if dropped > 0 {
            tracing::warn!(dropped, "dispatcher stopped with undispatched events");
        }
        tracing::debug!(
            handled = self.stats.handled,
            unrouted = self.stats.unrouted,
            failed = self.stats.failed,
            "dispatcher stopped"
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
