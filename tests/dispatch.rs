use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use evroute::{
    Capacity, Config, DispatchStats, Dispatcher, Error, EventEnvelope, EventKind, EventSystem,
    HandlerRegistry, Producer, UserEvent, channel,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type Invocations = mpsc::UnboundedReceiver<(&'static str, UserEvent, String)>;

/// Registers a handler for `kind` that reports `(tag, kind, payload)` on every call.
fn reporting(
    registry: &HandlerRegistry<UserEvent>,
    kind: UserEvent,
    tag: &'static str,
    tx: &mpsc::UnboundedSender<(&'static str, UserEvent, String)>,
) {
    let tx = tx.clone();
    registry.register_fn(kind, move |kind, payload| {
        let tx = tx.clone();
        async move {
            let _ = tx.send((tag, kind, payload.to_string()));
            Ok(())
        }
    });
}

fn reporting_registry() -> (HandlerRegistry<UserEvent>, Invocations) {
    let (tx, rx) = mpsc::unbounded_channel();
    let registry = HandlerRegistry::new();
    reporting(&registry, UserEvent::Login, "login", &tx);
    reporting(&registry, UserEvent::Logout, "logout", &tx);
    reporting(&registry, UserEvent::Purchase, "purchase", &tx);
    (registry, rx)
}

#[tokio::test]
async fn test_handlers_invoked_in_enqueue_order() {
    let (registry, mut calls) = reporting_registry();
    let (tx, queue) = channel(Capacity::Bounded(8));
    let mut dispatcher = Dispatcher::new(queue, registry, CancellationToken::new());

    tx.put(EventEnvelope::new(UserEvent::Login, "a", "test")).await.unwrap();
    tx.put(EventEnvelope::new(UserEvent::Purchase, "b", "test")).await.unwrap();
    tx.put(EventEnvelope::new(UserEvent::Logout, "c", "test")).await.unwrap();
    drop(tx);

    let stats = dispatcher.run().await.unwrap();
    assert_eq!(stats.handled, 3);

    let mut seen = Vec::new();
    while let Ok(call) = calls.try_recv() {
        seen.push(call);
    }
    assert_eq!(
        seen,
        vec![
            ("login", UserEvent::Login, "a".to_string()),
            ("purchase", UserEvent::Purchase, "b".to_string()),
            ("logout", UserEvent::Logout, "c".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unrouted_event_does_not_block_following_events() {
    let (tx_calls, mut calls) = mpsc::unbounded_channel();
    let registry = HandlerRegistry::new();
    reporting(&registry, UserEvent::Purchase, "purchase", &tx_calls);

    let (tx, queue) = channel(Capacity::Bounded(8));
    let mut dispatcher = Dispatcher::new(queue, registry, CancellationToken::new());

    tx.put(EventEnvelope::new(UserEvent::Logout, "nobody listens", "test"))
        .await
        .unwrap();
    tx.put(EventEnvelope::new(UserEvent::Purchase, "order-1", "test"))
        .await
        .unwrap();
    drop(tx);

    let stats = dispatcher.run().await.unwrap();
    assert_eq!(
        stats,
        DispatchStats {
            handled: 1,
            unrouted: 1,
            failed: 0
        }
    );
    assert_eq!(
        calls.try_recv().unwrap(),
        ("purchase", UserEvent::Purchase, "order-1".to_string())
    );
    assert!(calls.try_recv().is_err());
}

#[tokio::test]
async fn test_failing_handler_does_not_stop_dispatcher() {
    let (tx_calls, mut calls) = mpsc::unbounded_channel();
    let registry = HandlerRegistry::new();
    registry.register_fn(UserEvent::Login, |_, _| async {
        Err(Error::handler("session store unavailable"))
    });
    registry.register_fn(UserEvent::Logout, |_, payload| async move {
        if payload.is_empty() {
            return Ok(());
        }
        panic!("unexpected logout payload: {payload}")
    });
    reporting(&registry, UserEvent::Purchase, "purchase", &tx_calls);

    let (tx, queue) = channel(Capacity::Bounded(8));
    let mut dispatcher = Dispatcher::new(queue, registry, CancellationToken::new());
    tx.put(EventEnvelope::new(UserEvent::Login, "a", "test")).await.unwrap();
    tx.put(EventEnvelope::new(UserEvent::Logout, "b", "test")).await.unwrap();
    tx.put(EventEnvelope::new(UserEvent::Purchase, "c", "test")).await.unwrap();
    drop(tx);

    let stats = dispatcher.run().await.unwrap();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.handled, 1);
    assert_eq!(calls.recv().await.unwrap().2, "c");
}

#[tokio::test]
async fn test_reregistration_replaces_handler_at_runtime() {
    let (tx_calls, mut calls) = mpsc::unbounded_channel();
    let mut system = EventSystem::<UserEvent>::default();
    reporting(system.registry(), UserEvent::Login, "first", &tx_calls);
    system.start().unwrap();

    system.send(UserEvent::Login, "one").await.unwrap();
    assert_eq!(calls.recv().await.unwrap().0, "first");

    reporting(system.registry(), UserEvent::Login, "second", &tx_calls);
    system.send(UserEvent::Login, "two").await.unwrap();
    system.send(UserEvent::Login, "three").await.unwrap();
    assert_eq!(
        calls.recv().await.unwrap(),
        ("second", UserEvent::Login, "two".to_string())
    );
    assert_eq!(
        calls.recv().await.unwrap(),
        ("second", UserEvent::Login, "three".to_string())
    );

    let stats = system.stop().await.unwrap();
    assert_eq!(stats.handled, 3);
    assert!(calls.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_handler_invocations_never_overlap() {
    let active = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let spans = Arc::new(Mutex::new(Vec::new()));

    let config = Config::default()
        .with_queue_capacity(Capacity::Bounded(4))
        .with_producer_interval(Duration::from_millis(1)..Duration::from_millis(5));
    let mut system = EventSystem::<UserEvent>::new(config);
    for kind in UserEvent::variants() {
        let active = active.clone();
        let overlaps = overlaps.clone();
        let spans = spans.clone();
        system.register_fn(*kind, move |_, _| {
            let active = active.clone();
            let overlaps = overlaps.clone();
            let spans = spans.clone();
            async move {
                if active.swap(true, Ordering::SeqCst) {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                let enter = tokio::time::Instant::now();
                tokio::time::sleep(Duration::from_millis(3)).await;
                let exit = tokio::time::Instant::now();
                active.store(false, Ordering::SeqCst);
                spans.lock().unwrap().push((enter, exit));
                Ok(())
            }
        });
    }
    for name in ["web", "mobile", "batch"] {
        system.add_producer(name).unwrap();
    }

    system.start().unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    system.stop().await.unwrap();

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    let spans = spans.lock().unwrap();
    assert!(spans.len() > 10, "only {} invocations", spans.len());
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "handler spans overlap: {pair:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_producer_order_is_preserved_end_to_end() {
    let (tx_calls, mut calls) = mpsc::unbounded_channel();
    let registry = HandlerRegistry::new();
    for kind in UserEvent::variants() {
        reporting(&registry, *kind, "any", &tx_calls);
    }

    let (tx, queue) = channel(Capacity::Bounded(2));
    let token = CancellationToken::new();
    let mut dispatcher = Dispatcher::new(queue, registry, token.clone())
        .with_shutdown_grace(Duration::from_millis(100));
    let dispatcher_task = tokio::spawn(async move { dispatcher.run().await });

    let counter = Arc::new(AtomicUsize::new(0));
    let mut producer = Producer::new("seq", tx)
        .with_seed(3)
        .with_interval(Duration::ZERO..Duration::from_millis(2))
        .with_payload(move |_| counter.fetch_add(1, Ordering::SeqCst).to_string());
    let producer_token = CancellationToken::new();
    let producer_task = {
        let producer_token = producer_token.clone();
        tokio::spawn(async move { producer.run(producer_token).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    producer_token.cancel();
    let produced = producer_task.await.unwrap().unwrap();
    token.cancel();
    let stats = dispatcher_task.await.unwrap().unwrap();
    assert_eq!(stats.handled, produced);

    let mut payloads = Vec::new();
    while let Ok((_, _, payload)) = calls.try_recv() {
        payloads.push(payload.parse::<usize>().unwrap());
    }
    let expected: Vec<usize> = (0..produced as usize).collect();
    assert_eq!(payloads, expected);
}
