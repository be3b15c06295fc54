use std::sync::Arc;

use crate::{EventKind, Meta};

/// The unit flowing through the queue: an event kind, its payload and metadata.
///
/// Envelopes are immutable once built. They move by value from the producer,
/// through the queue, to the dispatcher and finally into the handler call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "K: serde::Serialize + serde::de::DeserializeOwned")
)]
pub struct EventEnvelope<K: EventKind> {
    meta: Meta,
    kind: K,
    payload: Arc<str>,
}

impl<K: EventKind> EventEnvelope<K> {
    /// Create a new envelope tagged with the given producer name.
    pub fn new<P, N>(kind: K, payload: P, producer: N) -> Self
    where
        P: Into<Arc<str>>,
        N: Into<Arc<str>>,
    {
        Self {
            meta: Meta::new(producer.into()),
            kind,
            payload: payload.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> K {
        self.kind
    }

    #[inline]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    #[inline]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }
}
