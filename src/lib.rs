//! evroute - in-process event dispatching for Tokio
//!
//! Producers put [`EventEnvelope`]s on a bounded FIFO [`EventQueue`]; a single
//! [`Dispatcher`] takes them off one at a time and routes each to the handler
//! registered for its [`EventKind`] in a [`HandlerRegistry`]. Events without a
//! handler are dropped. Handler failures are logged and skipped.
//!
//! [`EventSystem`] wires the pieces together:
//!
//! ```rust,no_run
//! use evroute::{EventSystem, LogHandler, UserEvent};
//!
//! #[tokio::main]
//! async fn main() -> evroute::Result {
//!     let mut system = EventSystem::<UserEvent>::default();
//!     system.register(UserEvent::Login, LogHandler::default());
//!     system.register(UserEvent::Purchase, LogHandler::default());
//!     system.add_producer("web")?;
//!     system.run_until_ctrl_c().await?;
//!     Ok(())
//! }
//! ```
//!
//! See `demos/user_events.rs`.

mod config;
mod dispatcher;
mod envelope;
mod error;
mod event;
mod handler;
mod meta;
mod producer;
mod queue;
mod registry;
mod system;

mod internal;

pub mod monitor;

pub use config::{Capacity, Config};
pub use dispatcher::{DispatchOutcome, DispatchStats, Dispatcher, DispatcherState};
pub use envelope::EventEnvelope;
pub use error::Error;
pub use event::{EventKind, UserEvent};
pub use handler::{FnHandler, Handler, LogHandler, handler_fn};
pub use meta::Meta;
pub use producer::Producer;
pub use queue::{EventQueue, QueueSender, channel};
pub use registry::HandlerRegistry;
pub use system::{EXTERNAL_PRODUCER, EventSystem};

pub use async_trait::async_trait;

#[cfg(feature = "macros")]
pub use evroute_macros::EventKind;

pub type Result<T = ()> = std::result::Result<T, Error>;
pub type EventId = u128;

pub mod prelude {
    pub use crate::config::{Capacity, Config};
    pub use crate::envelope::EventEnvelope;
    pub use crate::error::Error as EvrouteError;
    pub use crate::event::EventKind;
    pub use crate::handler::{Handler, handler_fn};
    pub use crate::registry::HandlerRegistry;
    pub use crate::system::EventSystem;
}
