//! Cart Service binary — the producer half of the order-processing system.
//!
//! # Environment Variables
//!
//! - `KAFKA_BOOTSTRAP_SERVERS` (default `localhost:9092`)
//! - `ORDERS_TOPIC` (default `orders`); the DLT topic is derived as `{topic}.dlt`
//! - `PUBLISH_REQUEST_TIMEOUT_MS` / `PUBLISH_DELIVERY_TIMEOUT_MS` / `PUBLISH_API_TIMEOUT_MS`
//! - `HTTP_PORT` (default `8080`)
//! - `FAILURE_LOG_PATH` (default `cart-service-failures.log`)
//! - `METRICS_PORT` (default `9090`)
//! - `RUST_LOG` (default `info`)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cart_service::application::OrderService;
use cart_service::broker::{ConnectivityMonitor, PublishEngine, kafka_producer};
use cart_service::config::AppConfig;
use cart_service::domain::OrderStore;
use cart_service::health::HealthReporter;
use cart_service::observability::metrics::init_metrics;
use cart_service::server::http::{CartServer, create_router};
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
                .add_directive("cart_service=info".parse().unwrap())
                .add_directive("tower_http=info".parse().unwrap()),
        )
        .init();

    tracing::info!("starting cart-service (producer)");

    let config = AppConfig::from_env()?;
    tracing::info!(
        bootstrap = %config.kafka.bootstrap_servers,
        topic = %config.kafka.topic,
        dlt_topic = %config.kafka.dlt_topic,
        http_port = config.server.http_port,
        "configuration loaded"
    );

    if let Ok(metrics_port) = std::env::var("METRICS_PORT").unwrap_or_else(|_| "9090".to_string()).parse::<u16>() {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], metrics_port));
        if let Err(err) = init_metrics(metrics_addr) {
            tracing::warn!(error = %err, "failed to start metrics exporter, continuing without it");
        }
    }

    let producer = kafka_producer::build_producer(&config.kafka)?;
    let publish_engine = PublishEngine::new(producer, config.kafka.clone(), &config.failure_log_path)?;
    let order_store = OrderStore::new();
    let order_service = Arc::new(OrderService::new(order_store.clone(), publish_engine));

    let connectivity = Arc::new(ConnectivityMonitor::new(config.kafka.clone()));
    tokio::spawn(Arc::clone(&connectivity).run());

    let health = Arc::new(HealthReporter::new(connectivity, order_store));

    let server = CartServer::new(Arc::clone(&order_service), health);
    let app = create_router(server);

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.server.http_port));
    tracing::info!(%http_addr, "HTTP server starting");
    tracing::info!("endpoints: POST /create-order, PUT /update-order, GET /health/live, GET /health/ready");

    let listener = TcpListener::bind(http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("cart-service stopped");
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
