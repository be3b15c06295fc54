use std::sync::Arc;

use tokio::sync::mpsc::error::{SendError, TrySendError};

use crate::{EventEnvelope, EventKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("The event queue is closed; its consumer is gone.")]
    QueueClosed,

    #[error("The event queue has reached its capacity.")]
    QueueFull,

    #[error("Handler failed: {0}")]
    Handler(String),

    #[error("Handler panicked: {0}")]
    HandlerPanicked(String),

    #[error("Event system has already started.")]
    AlreadyStarted,

    #[error("Event system has been stopped.")]
    Stopped,

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Error external to evroute occured: {0}")]
    External(Arc<str>),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convenience constructor for handlers reporting a failure.
    pub fn handler<S: ToString>(reason: S) -> Self {
        Error::Handler(reason.to_string())
    }
}

impl<K: EventKind> From<SendError<EventEnvelope<K>>> for Error {
    fn from(_: SendError<EventEnvelope<K>>) -> Self {
        Error::QueueClosed
    }
}

impl<K: EventKind> From<TrySendError<EventEnvelope<K>>> for Error {
    fn from(e: TrySendError<EventEnvelope<K>>) -> Self {
        match e {
            TrySendError::Full(_) => Error::QueueFull,
            TrySendError::Closed(_) => Error::QueueClosed,
        }
    }
}
