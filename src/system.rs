use std::{future::Future, sync::Arc};

use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
    Config, DispatchStats, Dispatcher, DispatcherState, Error, EventEnvelope, EventKind, Handler,
    HandlerRegistry, Producer, QueueSender, Result, channel, monitor::Monitor,
};

/// Name stamped on envelopes sent through [`EventSystem::send`].
pub const EXTERNAL_PRODUCER: &str = "external";

/// Owns the queue, the dispatcher and the producers, and wires them together.
///
/// - Register handlers with `register(kind, handler)`, before or after `start()`.
/// - Add producers with `add_producer(name)`; they run once the system starts.
///   Adding one after `stop()` fails with [`Error::Stopped`].
/// - `start()` spawns the dispatcher and producers and returns immediately.
/// - `send(kind, payload)` enqueues an event from outside any producer.
/// - `stop()` cancels producers, lets the dispatcher drain, and returns its stats.
/// - `run_until_ctrl_c()` combines `start()` and `stop()` around a Ctrl-C wait.
///
/// See also: [`Dispatcher`], [`Producer`], [`HandlerRegistry`].
pub struct EventSystem<K: EventKind> {
    config: Config,
    registry: HandlerRegistry<K>,
    sender: QueueSender<K>,
    dispatcher: Option<Dispatcher<K>>,
    dispatcher_task: Option<JoinHandle<Result<DispatchStats>>>,
    pending_producers: Vec<Producer<K>>,
    producers: JoinSet<Result<u64>>,
    producer_token: CancellationToken,
    dispatcher_token: CancellationToken,
    state: watch::Receiver<DispatcherState>,
}

impl<K: EventKind> EventSystem<K> {
    /// Create a new event system with the given configuration.
    pub fn new(config: Config) -> Self {
        let (sender, queue) = channel(config.queue_capacity);
        let registry = HandlerRegistry::new();
        let dispatcher_token = CancellationToken::new();
        let dispatcher =
            Dispatcher::new(queue, registry.clone(), dispatcher_token.clone()).with_config(&config);
        let state = dispatcher.state();
        Self {
            config,
            registry,
            sender,
            dispatcher: Some(dispatcher),
            dispatcher_task: None,
            pending_producers: Vec::new(),
            producers: JoinSet::new(),
            producer_token: CancellationToken::new(),
            dispatcher_token,
            state,
        }
    }

    /// The routing table shared with the dispatcher.
    pub fn registry(&self) -> &HandlerRegistry<K> {
        &self.registry
    }

    /// Register `handler` for `kind`, replacing any earlier one.
    pub fn register<H>(&self, kind: K, handler: H) -> bool
    where
        H: Handler<K> + 'static,
    {
        self.registry.register(kind, handler)
    }

    /// Register an async closure for `kind`.
    pub fn register_fn<F, Fut>(&self, kind: K, f: F) -> bool
    where
        F: Fn(K, Arc<str>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.registry.register_fn(kind, f)
    }

    /// Attach a monitor to the dispatcher. Only possible before `start()`.
    pub fn add_monitor<M: Monitor<K> + 'static>(&mut self, monitor: M) -> Result<()> {
        let dispatcher = self.dispatcher.as_mut().ok_or(Error::AlreadyStarted)?;
        dispatcher.add_boxed_monitor(Box::new(monitor));
        Ok(())
    }

    /// Add a producer using the configured interval.
    pub fn add_producer(&mut self, name: &str) -> Result<()> {
        let producer = Producer::new(name, self.sender.clone())
            .with_interval(self.config.producer_interval.clone());
        self.add_producer_with(producer)
    }

    /// Add a custom producer. Spawned right away when the system is running.
    ///
    /// Fails with [`Error::Stopped`] once `stop()` has run; such a producer
    /// would never start.
    pub fn add_producer_with(&mut self, producer: Producer<K>) -> Result<()> {
        if self.is_running() {
            self.spawn_producer(producer);
        } else if self.dispatcher.is_some() {
            self.pending_producers.push(producer);
        } else {
            return Err(Error::Stopped);
        }
        Ok(())
    }

    /// A sender for feeding the queue from code that isn't a [`Producer`].
    pub fn sender(&self) -> QueueSender<K> {
        self.sender.clone()
    }

    /// Enqueue one event, waiting for capacity when the queue is full.
    pub async fn send<P: Into<Arc<str>>>(&self, kind: K, payload: P) -> Result<()> {
        self.sender
            .put(EventEnvelope::new(kind, payload, EXTERNAL_PRODUCER))
            .await
    }

    /// Watch the dispatcher's `Waiting`/`Dispatching` state.
    pub fn state(&self) -> watch::Receiver<DispatcherState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        self.dispatcher_task.is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Spawn the dispatcher and all pending producers. Returns immediately.
    pub fn start(&mut self) -> Result<()> {
        let mut dispatcher = self.dispatcher.take().ok_or(Error::AlreadyStarted)?;
        tracing::info!(
            capacity = %self.config.queue_capacity,
            handlers = self.registry.len(),
            producers = self.pending_producers.len(),
            "starting event system"
        );
        self.dispatcher_task = Some(tokio::spawn(async move { dispatcher.run().await }));
        for producer in std::mem::take(&mut self.pending_producers) {
            self.spawn_producer(producer);
        }
        Ok(())
    }

    fn spawn_producer(&mut self, mut producer: Producer<K>) {
        let token = self.producer_token.clone();
        self.producers
            .spawn(async move { producer.run(token).await });
    }

    /// Graceful shutdown.
    ///
    /// 1. Cancels the producers and waits for them to return.
    /// 2. Cancels the dispatcher, which keeps dispatching already-buffered
    ///    events for `Config::shutdown_grace`.
    /// 3. Returns the dispatcher's statistics.
    ///
    /// A producer task that panicked does not cut the shutdown short: every
    /// producer is joined and the dispatcher is stopped regardless, then the
    /// first join error is returned.
    pub async fn stop(&mut self) -> Result<DispatchStats> {
        self.producer_token.cancel();
        let mut failure = None;
        while let Some(res) = self.producers.join_next().await {
            match res {
                Ok(Ok(produced)) => tracing::debug!(produced, "producer finished"),
                Ok(Err(error)) => tracing::warn!(%error, "producer finished with error"),
                Err(error) => {
                    tracing::error!(%error, "producer task failed");
                    failure.get_or_insert(Error::TaskJoin(error));
                }
            }
        }

        self.dispatcher_token.cancel();
        let stats = match self.dispatcher_task.take() {
            Some(task) => task.await??,
            None => DispatchStats::default(),
        };
        tracing::info!(
            handled = stats.handled,
            unrouted = stats.unrouted,
            failed = stats.failed,
            "event system stopped"
        );
        match failure {
            Some(error) => Err(error),
            None => Ok(stats),
        }
    }

    /// Start, wait for Ctrl-C, then stop.
    pub async fn run_until_ctrl_c(&mut self) -> Result<DispatchStats> {
        self.start()?;
        tokio::signal::ctrl_c().await?;
        tracing::info!("Ctrl-C received, shutting down");
        self.stop().await
    }
}

impl<K: EventKind> Default for EventSystem<K> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<K: EventKind> Drop for EventSystem<K> {
    fn drop(&mut self) {
        self.producer_token.cancel();
        self.dispatcher_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use super::*;
    use crate::{Capacity, UserEvent};

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut system = EventSystem::<UserEvent>::default();
        system.start().unwrap();
        assert!(matches!(system.start(), Err(Error::AlreadyStarted)));
        system.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let mut system = EventSystem::<UserEvent>::default();
        assert_eq!(system.stop().await.unwrap(), DispatchStats::default());
    }

    #[tokio::test]
    async fn test_monitor_after_start_is_rejected() {
        let mut system = EventSystem::<UserEvent>::default();
        system.add_monitor(crate::monitor::Tracer).unwrap();
        system.start().unwrap();
        assert!(matches!(
            system.add_monitor(crate::monitor::Tracer),
            Err(Error::AlreadyStarted)
        ));
        system.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_is_dispatched_before_stop_returns() {
        let config = Config::default()
            .with_queue_capacity(Capacity::Bounded(8))
            .with_shutdown_grace(Duration::from_millis(50));
        let mut system = EventSystem::<UserEvent>::new(config);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        system.register_fn(UserEvent::Purchase, move |_, payload| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(payload.to_string());
                Ok(())
            }
        });

        system.start().unwrap();
        system.send(UserEvent::Purchase, "book").await.unwrap();
        system.send(UserEvent::Login, "ignored").await.unwrap();
        let stats = system.stop().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["book".to_string()]);
        assert_eq!(stats.handled, 1);
        assert_eq!(stats.unrouted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_producers_feed_dispatcher() {
        let config = Config::default()
            .with_producer_interval(Duration::from_millis(10)..Duration::from_millis(20))
            .with_shutdown_grace(Duration::from_millis(50));
        let mut system = EventSystem::<UserEvent>::new(config);
        for kind in UserEvent::variants() {
            system.register_fn(*kind, |_, _| async { Ok(()) });
        }
        system.add_producer("web").unwrap();
        system.add_producer("mobile").unwrap();

        system.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let stats = system.stop().await.unwrap();

        assert!(stats.handled >= 2, "handled {}", stats.handled);
        assert_eq!(stats.unrouted, 0);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_producer_still_stops_dispatcher() {
        let config = Config::default()
            .with_producer_interval(Duration::from_millis(10)..Duration::from_millis(20));
        let mut system = EventSystem::<UserEvent>::new(config);
        for kind in UserEvent::variants() {
            system.register_fn(*kind, |_, _| async { Ok(()) });
        }
        system.add_producer("web").unwrap();
        let broken = Producer::new("broken", system.sender())
            .with_payload(|_| -> String { panic!("payload bug") });
        system.add_producer_with(broken).unwrap();
        let state = system.state();

        system.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(matches!(system.stop().await, Err(Error::TaskJoin(_))));
        assert!(!system.is_running());
        // The dispatcher returned and dropped its state sender.
        assert!(state.has_changed().is_err());
    }

    #[tokio::test]
    async fn test_add_producer_after_stop_is_rejected() {
        let mut system = EventSystem::<UserEvent>::default();
        system.start().unwrap();
        system.add_producer("early").unwrap();
        system.stop().await.unwrap();

        assert!(matches!(system.add_producer("late"), Err(Error::Stopped)));
        let late = Producer::new("late", system.sender());
        assert!(matches!(system.add_producer_with(late), Err(Error::Stopped)));
    }
}
