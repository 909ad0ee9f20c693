use alert_relay::{
    api::{build_router, AppState, RequestVerifier},
    config::Config,
    correlation::{AlertClassifier, CorrelationCache},
    integrations::{MantisClient, TicketBridge},
    notifications::{ChatApi, NotificationForwarder, SlackClient},
    processing::{load_patterns, AlertDispatcher, MessageFilter, RelayProcessor, TicketWorker},
    state::DeliveryTracker,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration; every startup problem is fatal
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    init_tracing(&config);

    if let Err(e) = config.validate_startup() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Starting alert relay v{}", env!("CARGO_PKG_VERSION"));

    if config.observability.prometheus_enabled {
        if let Err(e) = alert_relay::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    let patterns = load_patterns(&config.relay.patterns_file).unwrap_or_else(|e| {
        tracing::error!("{}", e);
        std::process::exit(1);
    });
    let filter = MessageFilter::from_config(&config.slack, &patterns).unwrap_or_else(|e| {
        tracing::error!("{}", e);
        std::process::exit(1);
    });

    let slack = Arc::new(SlackClient::from_config(&config.slack)?);
    let forwarder = Arc::new(NotificationForwarder::from_config(slack.clone(), &config.slack));
    let identity = slack.identity().await.unwrap_or_else(|e| {
        tracing::error!("Failed to resolve bot identity: {}", e);
        std::process::exit(1);
    });

    // Relay worker owns the correlation cache
    let processor = RelayProcessor::new(
        AlertClassifier::from_config(&config.relay),
        CorrelationCache::default(),
        forwarder.clone(),
    );
    let (relay_queue, relay_handle) = processor.spawn(config.relay.queue_size);
    tracing::info!(
        target_channel = %config.slack.target_channel_id,
        channels = ?config.slack.channel_ids,
        "Relay worker started"
    );

    let mut dispatcher = AlertDispatcher::new(filter, relay_queue).with_identity(identity);
    let mut ticket_handle = None;

    if config.tracker.enabled {
        let tracker = Arc::new(MantisClient::from_config(&config.tracker)?);
        let bridge = Arc::new(TicketBridge::from_config(tracker, slack.clone(), &config.tracker));
        let (ticket_queue, handle) = TicketWorker::new(bridge.clone()).spawn(config.tracker.queue_size);

        dispatcher = dispatcher.with_tickets(bridge, ticket_queue);
        ticket_handle = Some(handle);
        tracing::info!(channels = ?config.tracker.channel_ids, "Ticket worker started");
    } else {
        tracing::info!("Issue tracker disabled in configuration");
    }

    let mut app_state = AppState::new(
        Arc::new(dispatcher),
        forwarder,
        DeliveryTracker::new(Duration::from_secs(config.relay.event_dedup_ttl_secs)),
    );
    match config.slack.signing_secret() {
        Some(secret) => app_state = app_state.with_verifier(RequestVerifier::new(secret)),
        None => tracing::warn!(
            "{} not set; Slack request signatures will not be verified",
            config.slack.signing_secret_env
        ),
    }

    let app = build_router(app_state).layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )));

    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP server listening on http://{}", http_addr);
    tracing::info!("   Events: http://{}/slack/events", http_addr);
    tracing::info!("   Actions: http://{}/slack/actions", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dropping the router closed every queue sender; let workers drain.
    if let Err(e) = relay_handle.await {
        tracing::error!("Relay worker error: {}", e);
    }
    if let Some(handle) = ticket_handle {
        if let Err(e) = handle.await {
            tracing::error!("Ticket worker error: {}", e);
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "alert_relay={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
