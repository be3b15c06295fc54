use std::{ops::Range, sync::Arc, time::Duration};

use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    EventEnvelope, EventKind, QueueSender, Result,
    internal::{pause, random_delay},
};

type PayloadFn<K> = Arc<dyn Fn(K) -> String + Send + Sync>;

/// A task that keeps synthesizing events and putting them on the queue.
///
/// Each round picks a kind uniformly from [`EventKind::variants`], builds a
/// payload for it, puts the envelope on the queue (waiting for capacity when
/// the queue is full) and then pauses for a random interval.
///
/// Envelopes from one producer reach the dispatcher in the order they were
/// produced. Nothing is guaranteed about interleaving across producers.
pub struct Producer<K: EventKind> {
    name: Arc<str>,
    sender: QueueSender<K>,
    interval: Range<Duration>,
    payload: PayloadFn<K>,
    rng: StdRng,
}

impl<K: EventKind> Producer<K> {
    pub fn new<N: Into<Arc<str>>>(name: N, sender: QueueSender<K>) -> Self {
        Self {
            name: name.into(),
            sender,
            interval: Duration::from_millis(500)..Duration::from_millis(1500),
            payload: Arc::new(|kind: K| format!("Event Data for {}", kind.name())),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Range the pause between two puts is drawn from.
    pub fn with_interval(mut self, interval: Range<Duration>) -> Self {
        self.interval = interval;
        self
    }

    /// Replace the default `"Event Data for <Kind>"` payload.
    pub fn with_payload<F>(mut self, f: F) -> Self
    where
        F: Fn(K) -> String + Send + Sync + 'static,
    {
        self.payload = Arc::new(f);
        self
    }

    /// Seed the random source, making the sequence of kinds reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the next envelope without enqueueing it.
    pub fn next_envelope(&mut self) -> Option<EventEnvelope<K>> {
        let kind = *K::variants().choose(&mut self.rng)?;
        let payload = (self.payload)(kind);
        Some(EventEnvelope::new(kind, payload, self.name.clone()))
    }

    /// Produce events until `cancel` fires.
    ///
    /// A hand-written kind with no variants leaves the producer idle until
    /// cancelled. Returns the number of envelopes put on the queue. Fails with
    /// [`Error::QueueClosed`](crate::Error::QueueClosed) if the dispatcher went away first.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<u64> {
        let mut produced = 0u64;
        loop {
            let Some(envelope) = self.next_envelope() else {
                tracing::warn!(producer = %self.name, "event kind has no variants, producer idle");
                cancel.cancelled().await;
                break;
            };
            let kind = envelope.kind();

            select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.sender.put(envelope) => res?,
            }
            produced += 1;
            tracing::info!(producer = %self.name, kind = %kind.name(), "produced");

            let delay = random_delay(&mut self.rng, &self.interval);
            if !pause(&cancel, delay).await {
                break;
            }
        }
        tracing::debug!(producer = %self.name, produced, "producer stopped");
        Ok(produced)
    }
}

impl<K: EventKind> std::fmt::Debug for Producer<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
