//! Order Service binary — the consumer half of the order-processing system.
//!
//! # Environment Variables
//!
//! - `KAFKA_BOOTSTRAP_SERVERS` (default `localhost:9092`)
//! - `ORDERS_TOPIC` (default `orders`); the DLT topic is derived as `{topic}.dlt`
//! - `ORDERS_CONSUMER_GROUP` (default `order-service`)
//! - `CONSUME_RETRY_INITIAL_MS` / `CONSUME_RETRY_MAX_MS` / `CONSUME_MAX_RETRIES`
//! - `HTTP_PORT` (default `8081`)
//! - `METRICS_PORT` (default `9091`)
//! - `RUST_LOG` (default `info`)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use order_service::application::QueryService;
use order_service::config::AppConfig;
use order_service::consume::{ConnectivityMonitor, ConsumeEngine, build_consumer, build_dlt_producer};
use order_service::domain::{IdempotencyIndex, ProcessedOrderStore};
use order_service::health::HealthReporter;
use order_service::observability::metrics::init_metrics;
use order_service::server::http::{OrderServer, create_router};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }

    #[allow(clippy::unwrap_used)]
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("order_service=info".parse().unwrap())
                .add_directive("tower_http=info".parse().unwrap()),
        )
        .init();

    tracing::info!("starting order-service (consumer)");

    let config = AppConfig::from_env()?;
    tracing::info!(
        bootstrap = %config.kafka.bootstrap_servers,
        topic = %config.kafka.topic,
        dlt_topic = %config.kafka.dlt_topic,
        group_id = %config.kafka.group_id,
        http_port = config.server.http_port,
        "configuration loaded"
    );

    if let Ok(metrics_port) = std::env::var("METRICS_PORT").unwrap_or_else(|_| "9091".to_string()).parse::<u16>() {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], metrics_port));
        if let Err(err) = init_metrics(metrics_addr) {
            tracing::warn!(error = %err, "failed to start metrics exporter, continuing without it");
        }
    }

    let consumer = build_consumer(&config.kafka)?;
    let dlt_producer = build_dlt_producer(&config.kafka)?;

    let processed_store = ProcessedOrderStore::new();
    let idempotency = IdempotencyIndex::new();

    let engine = Arc::new(ConsumeEngine::new(
        consumer,
        dlt_producer,
        config.kafka.clone(),
        config.retry.clone(),
        processed_store.clone(),
        idempotency,
    ));

    let connectivity = Arc::new(ConnectivityMonitor::new(config.kafka.clone()));
    tokio::spawn(Arc::clone(&connectivity).run());
    tokio::spawn(Arc::clone(&engine).run_with_connectivity(connectivity.subscribe()));

    let health = Arc::new(HealthReporter::new(Arc::clone(&connectivity), processed_store.clone()));
    let query_service = Arc::new(QueryService::new(processed_store));

    let server = OrderServer::new(query_service, health);
    let app = create_router(server);

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.server.http_port));
    tracing::info!(%http_addr, "HTTP server starting");
    tracing::info!("endpoints: POST /order-details, POST /getAllOrdersFromTopic, GET /health/live, GET /health/ready");

    let listener = TcpListener::bind(http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.stop().await;
    tracing::info!("order-service stopped");
    Ok(())
}

fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }

    tokio::time::sleep(Duration::from_millis(0)).await;
}
