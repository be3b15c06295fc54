//! Observability hooks for the dispatcher.
//!
//! A [`Monitor`] is told about every routing outcome. Monitors run inline in
//! the dispatcher loop, so they must be quick; a monitor that panics is
//! removed and the loop carries on.
//!
//! ```ignore
//! use evroute::monitor::Tracer;
//!
//! system.add_monitor(Tracer);
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::{Error, EventEnvelope, EventKind};

pub trait Monitor<K: EventKind>: Send + Sync {
    /// A handler finished processing `envelope` successfully.
    fn on_dispatched(&self, envelope: &EventEnvelope<K>) {
        let _e = envelope;
    }

    /// No handler was registered for the envelope's kind; it was dropped.
    fn on_unrouted(&self, envelope: &EventEnvelope<K>) {
        let _e = envelope;
    }

    /// The handler returned an error or panicked.
    fn on_handler_error(&self, envelope: &EventEnvelope<K>, error: &Error) {
        let _e = envelope;
        let _err = error;
    }
}

/// Logs every dispatch outcome through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracer;

impl<K: EventKind> Monitor<K> for Tracer {
    fn on_dispatched(&self, envelope: &EventEnvelope<K>) {
        tracing::info!(
            kind = %envelope.kind().name(),
            producer = envelope.meta().producer(),
            event_id = %envelope.meta().id(),
            "event handled"
        );
    }

    fn on_unrouted(&self, envelope: &EventEnvelope<K>) {
        tracing::info!(
            kind = %envelope.kind().name(),
            producer = envelope.meta().producer(),
            event_id = %envelope.meta().id(),
            "event dropped, no handler"
        );
    }

    fn on_handler_error(&self, envelope: &EventEnvelope<K>, error: &Error) {
        tracing::warn!(
            kind = %envelope.kind().name(),
            event_id = %envelope.meta().id(),
            %error,
            "handler failed"
        );
    }
}

/// The set of monitors attached to a dispatcher.
pub(crate) struct Monitors<K: EventKind> {
    monitors: Vec<Box<dyn Monitor<K>>>,
}

impl<K: EventKind> Monitors<K> {
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    pub fn add(&mut self, monitor: Box<dyn Monitor<K>>) {
        self.monitors.push(monitor);
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn notify(&mut self, f: impl Fn(&dyn Monitor<K>)) {
        self.monitors.retain(|monitor| {
            let result = catch_unwind(AssertUnwindSafe(|| f(monitor.as_ref())));
            if result.is_err() {
                tracing::error!("Monitor panicked, removing");
            }
            result.is_ok()
        });
    }
}
