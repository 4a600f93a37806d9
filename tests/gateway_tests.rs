use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;
use venueserv_shell::{
    AppConfig, AppState, create_router,
    gateway::{Credentials, GatewayError, GatewayState, HttpSessionGateway, SessionGateway},
    models::{Role, SessionView},
    session::SessionStore,
};

const VISITOR_COOKIE: &str = "token=visitor";

// --- Fake VenueServ Backend ---

/// What the fake backend answers on `/api/auth/fetch-session`.
#[derive(Clone)]
enum Reply {
    Json(serde_json::Value),
    /// The payload, but only for callers presenting `VISITOR_COOKIE`.
    /// Everyone else gets `{"success": false}`, like the real backend.
    CookieGated(serde_json::Value),
    Status(StatusCode),
    Garbage,
}

#[derive(Clone)]
struct Backend {
    fetch_reply: Arc<Mutex<Reply>>,
}

fn carries_visitor_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .any(|pair| pair.trim() == VISITOR_COOKIE)
}

async fn fetch_session(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    let reply = backend.fetch_reply.lock().unwrap().clone();
    match reply {
        Reply::Json(body) => Json(body).into_response(),
        Reply::CookieGated(body) if carries_visitor_cookie(&headers) => Json(body).into_response(),
        Reply::CookieGated(_) => Json(json!({ "success": false })).into_response(),
        Reply::Status(status) => status.into_response(),
        Reply::Garbage => (
            [(header::CONTENT_TYPE, "application/json")],
            "{\"success\": tru",
        )
            .into_response(),
    }
}

/// Only succeeds for the visitor's cookie, and clears it on the way out.
async fn logout(headers: HeaderMap) -> Response {
    if carries_visitor_cookie(&headers) {
        (
            [(header::SET_COOKIE, "token=; Max-Age=0; Path=/")],
            Json(json!({ "success": true, "message": "Logged out" })),
        )
            .into_response()
    } else {
        Json(json!({ "success": false, "message": "No active session" })).into_response()
    }
}

async fn spawn_backend(initial: Reply) -> (String, Backend) {
    let backend = Backend {
        fetch_reply: Arc::new(Mutex::new(initial)),
    };

    let router = Router::new()
        .route("/api/auth/fetch-session", get(fetch_session))
        .route("/api/auth/logout", get(logout))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://127.0.0.1:{}", port), backend)
}

fn gateway(base_url: &str) -> HttpSessionGateway {
    HttpSessionGateway::new(base_url, Duration::from_secs(5)).expect("client should build")
}

fn visitor() -> Credentials {
    Credentials::from_cookie(VISITOR_COOKIE)
}

fn owner_payload() -> serde_json::Value {
    json!({
        "success": true,
        "userdata": {
            "_id": "65f1a2b3c4",
            "name": "Olu Owner",
            "email": "olu@venues.test",
            "phone": "+2348000000000",
            "role": "Owner",
            "createdAt": "2024-03-01T10:00:00Z"
        }
    })
}

/// The full shell served over the real HTTP gateway, pointed at `backend_url`.
async fn spawn_shell_over(backend_url: &str) -> (String, AppState) {
    let state = AppState::new(Arc::new(gateway(backend_url)) as GatewayState, &AppConfig::default());
    let app = create_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{}", port), state)
}

fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

// --- Gateway ---

#[tokio::test]
async fn test_fetch_session_parses_userdata() {
    let (url, _backend) = spawn_backend(Reply::Json(owner_payload())).await;

    let response = gateway(&url)
        .fetch_session(&Credentials::anonymous())
        .await
        .expect("fetch should succeed");

    assert!(response.success);
    let userdata = response.userdata.expect("userdata present");
    assert_eq!(userdata.role, "Owner");
    assert_eq!(userdata.identity.id, "65f1a2b3c4");
    assert_eq!(userdata.identity.name, "Olu Owner");
    assert_eq!(userdata.identity.email.as_deref(), Some("olu@venues.test"));
}

#[tokio::test]
async fn test_trailing_slash_in_base_url_is_tolerated() {
    let (url, _backend) = spawn_backend(Reply::Json(owner_payload())).await;

    let response = gateway(&format!("{}/", url))
        .fetch_session(&Credentials::anonymous())
        .await;
    assert!(response.is_ok());
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let (url, _backend) = spawn_backend(Reply::Status(StatusCode::INTERNAL_SERVER_ERROR)).await;

    let err = gateway(&url)
        .fetch_session(&Credentials::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Status(500)));
}

#[tokio::test]
async fn test_malformed_payload_is_reported() {
    let (url, _backend) = spawn_backend(Reply::Garbage).await;

    let err = gateway(&url)
        .fetch_session(&Credentials::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_a_network_error() {
    // Bind then drop a listener to get a port nobody is serving.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = gateway(&format!("http://127.0.0.1:{}", port))
        .fetch_session(&Credentials::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Network(_)));
}

#[tokio::test]
async fn test_visitor_cookie_is_forwarded_to_fetch_session() {
    let (url, _backend) = spawn_backend(Reply::CookieGated(owner_payload())).await;
    let gateway = gateway(&url);

    let without = gateway
        .fetch_session(&Credentials::anonymous())
        .await
        .expect("fetch should succeed");
    assert!(!without.success);

    let with = gateway
        .fetch_session(&visitor())
        .await
        .expect("fetch should succeed");
    assert!(with.success);
    assert_eq!(with.userdata.map(|u| u.role).as_deref(), Some("Owner"));
}

#[tokio::test]
async fn test_visitor_cookie_is_forwarded_to_logout() {
    let (url, _backend) = spawn_backend(Reply::Json(owner_payload())).await;
    let gateway = gateway(&url);

    let without = gateway
        .logout(&Credentials::anonymous())
        .await
        .expect("logout request");
    assert!(!without.success);
    assert!(without.set_cookies.is_empty());

    let with = gateway.logout(&visitor()).await.expect("logout request");
    assert!(with.success);
    assert_eq!(with.message.as_deref(), Some("Logged out"));
    assert_eq!(with.set_cookies, vec!["token=; Max-Age=0; Path=/".to_string()]);
}

#[tokio::test]
async fn test_gateway_keeps_no_cookies_between_visitors() {
    let (url, _backend) = spawn_backend(Reply::CookieGated(owner_payload())).await;
    let gateway = gateway(&url);

    gateway
        .fetch_session(&visitor())
        .await
        .expect("fetch should succeed");

    let next = gateway
        .fetch_session(&Credentials::anonymous())
        .await
        .expect("fetch should succeed");
    assert!(!next.success);
}

#[tokio::test]
async fn test_store_over_http_collapses_failures_to_anonymous() {
    let (url, backend) = spawn_backend(Reply::Json(owner_payload())).await;
    let store = SessionStore::new(
        Arc::new(gateway(&url)) as GatewayState,
        Duration::from_secs(5),
    );

    assert_eq!(store.fetch_session(true).await.role(), Role::Owner);

    *backend.fetch_reply.lock().unwrap() = Reply::Status(StatusCode::BAD_GATEWAY);
    let session = store.fetch_session(true).await;
    assert_eq!(session.role(), Role::Anonymous);
    assert!(!session.is_authenticated());
}

// --- Shell Over The Real Gateway ---

#[tokio::test]
async fn test_refresh_with_visitor_cookie_yields_owner_session() {
    let (backend_url, _backend) = spawn_backend(Reply::CookieGated(owner_payload())).await;
    let (shell, state) = spawn_shell_over(&backend_url).await;
    state.sessions.fetch_session(true).await;
    assert_eq!(state.sessions.snapshot().role(), Role::Anonymous);

    let response = browser()
        .post(format!("{}/shell/session/refresh", shell))
        .header(header::COOKIE, VISITOR_COOKIE)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let session: SessionView = response.json().await.unwrap();
    assert!(session.is_authenticated);
    assert_eq!(session.role, Role::Owner);
}

#[tokio::test]
async fn test_navigation_with_login_cookie_settles_on_owner_dashboard() {
    let (backend_url, _backend) = spawn_backend(Reply::CookieGated(owner_payload())).await;
    let (shell, state) = spawn_shell_over(&backend_url).await;
    state.sessions.fetch_session(true).await;
    let client = browser();

    // Still anonymous locally: the first navigation is sent to /login, but the
    // background refresh it schedules carries the new cookie past the throttle.
    let first = client
        .get(format!("{}/owner", shell))
        .header(header::COOKIE, VISITOR_COOKIE)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(first.status(), StatusCode::SEE_OTHER);

    for _ in 0..100 {
        if state.sessions.snapshot().role() == Role::Owner {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(state.sessions.snapshot().role(), Role::Owner);

    let second = client
        .get(format!("{}/owner", shell))
        .header(header::COOKIE, VISITOR_COOKIE)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(second.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_shell_logout_relays_backend_cookie_clearing() {
    let (backend_url, _backend) = spawn_backend(Reply::CookieGated(owner_payload())).await;
    let (shell, _state) = spawn_shell_over(&backend_url).await;

    let response = browser()
        .post(format!("{}/shell/logout", shell))
        .header(header::COOKIE, VISITOR_COOKIE)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    assert_eq!(cleared.as_deref(), Some("token=; Max-Age=0; Path=/"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "redirect": "/login" }));
}
