use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access policy core and the state it reads.
pub mod models;
pub mod policy;
pub mod session;

// Backend boundary and shell plumbing.
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod notify;

// Page route trees (General, Owner, Admin).
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use gateway::{
    Credentials, GatewayState, HttpSessionGateway, MockSessionGateway, SessionGateway,
};
pub use notify::{NotificationCenter, NotificationState};
pub use policy::{evaluate, evaluate_in_tree};
pub use routes::{PageState, PageTable};
pub use session::{SessionState, SessionStore};

/// ApiDoc
///
/// OpenAPI document for the shell's control API, served at `/api-docs/openapi.json`.
/// Page routes are left out: they answer with redirects and view models rather
/// than a stable API surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_session, handlers::refresh_session, handlers::get_decision,
        handlers::logout, handlers::get_notifications
    ),
    components(
        schemas(
            models::SessionView, models::Identity, models::Role, models::Decision,
            models::RedirectReason, models::RouteTree, models::PageView,
            models::LogoutOutcome, models::Notification, models::NotificationLevel,
        )
    ),
    tags(
        (name = "venueserv-shell", description = "VenueServ UI shell and access policy")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single container for everything the shell's handlers share. Cloning is cheap:
/// every member is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide session and the gateway it refreshes through.
    pub sessions: SessionState,
    /// Toasts waiting to be collected by the UI.
    pub notifications: NotificationState,
    /// Every page route and its access requirement.
    pub pages: PageState,
}

impl AppState {
    /// Assembles the state around a gateway, using the marketplace page table.
    /// Only the refresh interval is taken from `config`; the rest is consumed by `main`.
    pub fn new(gateway: GatewayState, config: &AppConfig) -> Self {
        let sessions = Arc::new(SessionStore::new(gateway, config.session_refresh_interval));
        Self {
            sessions,
            notifications: Arc::new(NotificationCenter::default()),
            pages: Arc::new(PageTable::venueserv()),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Control handlers pull only the component they use. The page handler needs all
// three and takes the whole `AppState`.

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for NotificationState {
    fn from_ref(app_state: &AppState) -> NotificationState {
        app_state.notifications.clone()
    }
}

impl FromRef<AppState> for PageState {
    fn from_ref(app_state: &AppState) -> PageState {
        app_state.pages.clone()
    }
}

/// shell_routes
///
/// The JSON control API the UI uses alongside page navigation.
fn shell_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/shell/session", get(handlers::get_session))
        .route("/shell/session/refresh", post(handlers::refresh_session))
        .route("/shell/decision", get(handlers::get_decision))
        .route("/shell/logout", post(handlers::logout))
        .route("/shell/notifications", get(handlers::get_notifications))
}

/// create_router
///
/// Assembles the page routes, the control API and the observability layers.
///
/// *Mechanism*: access control is not a middleware here. Every page route goes
/// through `handlers::render_page`, which looks its `RouteRequirement` up in the
/// page table and turns the policy's `Decision` into a response.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Swagger UI for the control API.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Page routes of all three trees, one registration per page pattern.
        .merge(routes::page_routes(&state.pages))
        // Control API used by the UI between navigations.
        .merge(shell_routes())
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID per incoming request.
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                // 3b. Request Tracing: one `navigation` span per request.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (outermost)
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, correlating every log line of a navigation by
/// its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "navigation",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
