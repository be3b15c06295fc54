use std::{fmt, ops::Range, time::Duration};

/// Capacity of the event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Capacity {
    /// At most `n` buffered envelopes; `put` suspends while the queue is full.
    Bounded(usize),
    /// No limit; `put` never suspends.
    Unbounded,
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Bounded(128)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Bounded(n) => write!(f, "bounded({n})"),
            Capacity::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Runtime configuration for the event system.
///
/// Use the builder methods to customize, or [`Default`] for sensible defaults.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use evroute::{Capacity, Config};
///
/// let config = Config::default()
///     .with_queue_capacity(Capacity::Bounded(16))
///     .with_dispatch_pacing(Duration::from_millis(500)..Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the queue between producers and the dispatcher.
    /// Default: `Bounded(128)`
    pub queue_capacity: Capacity,

    /// Random pause the dispatcher takes after each event, drawn uniformly
    /// from the range. `None` disables pacing.
    /// Default: `None`
    pub dispatch_pacing: Option<Range<Duration>>,

    /// Random pause a producer takes between two puts.
    /// Default: 500 ms..1500 ms
    pub producer_interval: Range<Duration>,

    /// How long the dispatcher keeps draining buffered events after a stop
    /// was requested. Set to `Duration::ZERO` to drop them.
    /// Default: 10 ms
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            queue_capacity: Capacity::default(),
            dispatch_pacing: None,
            producer_interval: Duration::from_millis(500)..Duration::from_millis(1500),
            shutdown_grace: Duration::from_millis(10),
        }
    }
}

impl Config {
    /// Set the queue capacity.
    ///
    /// A bounded queue applies backpressure: producers suspend in `put`
    /// until the dispatcher frees a slot.
    pub fn with_queue_capacity(mut self, capacity: Capacity) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_dispatch_pacing(mut self, pacing: Range<Duration>) -> Self {
        self.dispatch_pacing = Some(pacing);
        self
    }

    pub fn without_dispatch_pacing(mut self) -> Self {
        self.dispatch_pacing = None;
        self
    }

    pub fn with_producer_interval(mut self, interval: Range<Duration>) -> Self {
        self.producer_interval = interval;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
