use std::{sync::Arc, time::SystemTime};

use uuid::Uuid;

use crate::EventId;

/// Metadata attached to every event envelope.
///
/// - `id`: unique identifier for the envelope.
/// - `timestamp`: creation time in nanoseconds since Unix epoch (truncated to `u64`).
/// - `producer`: name of whoever put the envelope on the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Meta {
    id: EventId,
    timestamp: u64,
    producer: Arc<str>,
}

impl Meta {
    /// Construct metadata for the given producer name.
    pub fn new(producer: Arc<str>) -> Self {
        // A clock set before the epoch yields 0 rather than failing the put.
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4().as_u128(),
            timestamp,
            producer,
        }
    }

    /// Unique identifier for this envelope.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Timestamp in nanoseconds since Unix epoch (u64 truncation).
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Name of the producer that created the envelope.
    pub fn producer(&self) -> &str {
        &self.producer
    }
}
