//! A producer emitting random user events and a dispatcher routing each kind
//! to its own handler. Press Ctrl-C to stop.
use std::time::Duration;

use evroute::{Config, EventSystem, LogHandler, UserEvent, monitor::Tracer};

#[tokio::main]
async fn main() -> evroute::Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::default()
        .with_dispatch_pacing(Duration::from_millis(500)..Duration::from_millis(1000))
        .with_producer_interval(Duration::from_millis(500)..Duration::from_millis(1500));
    let mut system = EventSystem::<UserEvent>::new(config);

    let latency = Duration::from_millis(100);
    system.register(UserEvent::Login, LogHandler::new(latency));
    system.register(UserEvent::Logout, LogHandler::new(latency));
    system.register_fn(UserEvent::Purchase, |kind, payload| async move {
        tracing::info!(%kind, %payload, "charging customer");
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    });
    system.add_monitor(Tracer)?;
    system.add_producer("web")?;

    let stats = system.run_until_ctrl_c().await?;
    println!(
        "handled: {}, unrouted: {}, failed: {}",
        stats.handled, stats.unrouted, stats.failed
    );
    Ok(())
}
