//! Chronicle demo entry point.

use std::error::Error;
use std::sync::Arc;

use chronicle_cart::domain::aggregates::Cart;
use chronicle_core::clock::SystemClock;
use chronicle_core::repository::Repository;
use chronicle_demo::config::DemoConfig;
use chronicle_demo::logging;
use chronicle_demo::publisher::LoggingPublisher;
use chronicle_demo::scenario::run_cart_lifecycle;
use chronicle_publisher::background::BackgroundPublisher;
use chronicle_publisher::dead_letter::LoggingDeadLetterSink;
use chronicle_test_support::InMemoryEventStore;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Read configuration from environment.
    let config = DemoConfig::from_env()?;
    logging::init(config.log_format)?;

    tracing::info!(capacity = config.publisher.capacity, "Starting Chronicle demo");

    // Ctrl-C cancels in-flight commands.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let publisher = Arc::new(BackgroundPublisher::spawn(
        Arc::new(LoggingPublisher),
        Arc::new(LoggingDeadLetterSink),
        config.publisher,
    ));
    let repo = Repository::<Cart>::new(Arc::new(InMemoryEventStore::new()), publisher.clone());

    let outcome = run_cart_lifecycle("cart-demo", "demo-user", &SystemClock, &repo, &cancel).await;
    publisher.shutdown().await?;

    let view = outcome?;
    tracing::info!(
        cart_id = %view.cart_id,
        version = view.version,
        total = %view.total,
        lines = view.lines.len(),
        "Chronicle demo finished"
    );

    Ok(())
}
