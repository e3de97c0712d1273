use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio::sync::mpsc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{info, warn};

use ferremas_api::{
    auth::{AuthConfig, AuthService},
    config, db,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = config::load_config().context("Failed to load configuration")?;
    config::init_tracing(&app_config.log_level, app_config.log_json);

    info!(
        environment = %app_config.environment,
        "Starting ferremas-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_connection = db::establish_connection_from_app_config(&app_config)
        .await
        .context("Failed to connect to the database")?;
    let db_connection = Arc::new(db_connection);

    if app_config.auto_migrate {
        db::run_migrations(&db_connection)
            .await
            .context("Failed to run database migrations")?;
    }

    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = EventSender::new(event_tx);
    tokio::spawn(events::process_events(event_rx));

    let auth_service = Arc::new(AuthService::new(
        AuthConfig::from_app_config(&app_config),
        db_connection.clone(),
    ));

    let services = AppServices::new(db_connection.clone(), event_sender.clone(), &app_config)
        .context("Failed to build services")?;
    if app_config.webpay.simulate {
        warn!("Payments are using the simulated gateway");
    }

    let state = AppState {
        db: db_connection,
        config: app_config.clone(),
        event_sender,
        auth_service,
        services,
    };

    let cors = build_cors_layer(&app_config)?;
    let app = ferremas_api::app_router(state)
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(
            app_config.request_timeout_seconds,
        )))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", app_config.host, app_config.port)
        .parse()
        .context("Invalid host/port configuration")?;

    info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

fn build_cors_layer(config: &config::AppConfig) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match config.cors_origin_list() {
        None => Ok(layer.allow_origin(tower_http::cors::Any)),
        Some(origins) => {
            let parsed: Result<Vec<HeaderValue>, _> =
                origins.iter().map(|o| o.parse::<HeaderValue>()).collect();
            Ok(layer.allow_origin(parsed.context("Invalid CORS origin")?))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
