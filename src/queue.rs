use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::{Capacity, Error, EventEnvelope, EventKind, Result};

/// Creates an event queue with the given capacity.
///
/// Returns the cloneable producing side and the single consuming side.
/// Envelopes come out of [`EventQueue::get`] in exactly the order they went
/// into [`QueueSender::put`].
pub fn channel<K: EventKind>(capacity: Capacity) -> (QueueSender<K>, EventQueue<K>) {
    match capacity {
        Capacity::Bounded(size) => {
            // tokio rejects a zero-sized buffer; a single slot is the closest match.
            let (tx, rx) = mpsc::channel(size.max(1));
            (
                QueueSender {
                    inner: SenderInner::Bounded(tx),
                },
                EventQueue {
                    inner: ReceiverInner::Bounded(rx),
                    capacity,
                },
            )
        }
        Capacity::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                QueueSender {
                    inner: SenderInner::Unbounded(tx),
                },
                EventQueue {
                    inner: ReceiverInner::Unbounded(rx),
                    capacity,
                },
            )
        }
    }
}

#[derive(Debug)]
enum SenderInner<K: EventKind> {
    Bounded(mpsc::Sender<EventEnvelope<K>>),
    Unbounded(mpsc::UnboundedSender<EventEnvelope<K>>),
}

impl<K: EventKind> Clone for SenderInner<K> {
    fn clone(&self) -> Self {
        match self {
            SenderInner::Bounded(tx) => SenderInner::Bounded(tx.clone()),
            SenderInner::Unbounded(tx) => SenderInner::Unbounded(tx.clone()),
        }
    }
}

/// Producing side of the event queue. Cheap to clone; one per producer.
#[derive(Debug, Clone)]
pub struct QueueSender<K: EventKind> {
    inner: SenderInner<K>,
}

impl<K: EventKind> QueueSender<K> {
    /// Append an envelope to the tail of the queue.
    ///
    /// On a bounded queue this awaits free capacity (backpressure) rather
    /// than dropping the envelope. Fails only when the queue is closed.
    pub async fn put(&self, envelope: EventEnvelope<K>) -> Result<()> {
        match &self.inner {
            SenderInner::Bounded(tx) => tx.send(envelope).await?,
            SenderInner::Unbounded(tx) => tx.send(envelope).map_err(|_| Error::QueueClosed)?,
        }
        Ok(())
    }

    /// Append without waiting. Fails with [`Error::QueueFull`] on a saturated queue.
    pub fn try_put(&self, envelope: EventEnvelope<K>) -> Result<()> {
        match &self.inner {
            SenderInner::Bounded(tx) => tx.try_send(envelope)?,
            SenderInner::Unbounded(tx) => tx.send(envelope).map_err(|_| Error::QueueClosed)?,
        }
        Ok(())
    }

    /// Whether the consuming side has been dropped.
    pub fn is_closed(&self) -> bool {
        match &self.inner {
            SenderInner::Bounded(tx) => tx.is_closed(),
            SenderInner::Unbounded(tx) => tx.is_closed(),
        }
    }
}

#[derive(Debug)]
enum ReceiverInner<K: EventKind> {
    Bounded(mpsc::Receiver<EventEnvelope<K>>),
    Unbounded(mpsc::UnboundedReceiver<EventEnvelope<K>>),
}

/// Consuming side of the event queue, owned by the dispatcher.
#[derive(Debug)]
pub struct EventQueue<K: EventKind> {
    inner: ReceiverInner<K>,
    capacity: Capacity,
}

impl<K: EventKind> EventQueue<K> {
    /// Remove and return the head of the queue, waiting while it is empty.
    ///
    /// Returns `None` once every [`QueueSender`] is dropped and the buffer is drained.
    pub async fn get(&mut self) -> Option<EventEnvelope<K>> {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.recv().await,
            ReceiverInner::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Take the head of the queue if one is buffered.
    pub fn try_get(&mut self) -> Option<EventEnvelope<K>> {
        let res = match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.try_recv(),
            ReceiverInner::Unbounded(rx) => rx.try_recv(),
        };
        match res {
            Ok(envelope) => Some(envelope),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Number of envelopes currently buffered.
    pub fn len(&self) -> usize {
        match &self.inner {
            ReceiverInner::Bounded(rx) => rx.len(),
            ReceiverInner::Unbounded(rx) => rx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }
}
