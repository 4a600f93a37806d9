use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use venueserv_shell::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    gateway::{GatewayState, HttpSessionGateway},
};

/// main
///
/// Loads configuration, initializes logging, connects the session gateway,
/// starts the initial session fetch and serves the shell.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "venueserv_shell=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Shell starting in {:?} mode", config.env);

    // 3. Session gateway to the VenueServ API
    let gateway = HttpSessionGateway::new(&config.api_base_url, config.api_timeout)
        .expect("FATAL: Failed to build the HTTP client for the session gateway.");
    let gateway = Arc::new(gateway) as GatewayState;
    tracing::info!(api = %config.api_base_url, "Session gateway ready");

    let app_state = AppState::new(gateway, &config);

    // 4. Initial session fetch, without visitor cookies. Pages answer "pending"
    // until it settles.
    let sessions = app_state.sessions.clone();
    tokio::spawn(async move {
        sessions.fetch_session(true).await;
    });

    // 5. Router and server
    let app = create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("FATAL: Failed to bind the shell's listen address.");

    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: Shell server terminated unexpectedly.");
}
