//! Shell Handlers
//!
//! The page handler shared by every UI route, plus the JSON control API under
//! `/shell/*`. Handlers that talk to the backend first record the visitor's
//! `Cookie` header in the session store, so the backend sees the browser's own
//! session rather than the shell's.

use crate::{
    AppState,
    error::ShellError,
    gateway::Credentials,
    models::{Decision, LogoutOutcome, Notification, PageView, RedirectReason, SessionView},
    notify::NotificationState,
    policy,
    routes::{Page, PageState},
    session::SessionState,
};
use axum::{
    Json,
    extract::{MatchedPath, OriginalUri, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

pub const ACCESS_DENIED_MESSAGE: &str = "Access denied: you do not have permission to view that page.";

/// DecisionQuery
///
/// Query parameters for `GET /shell/decision`.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct DecisionQuery {
    /// Concrete page path to evaluate, e.g. `/venues/42`.
    pub path: String,
}

// --- Page Rendering ---

/// render_page
///
/// Shared handler for every page route. Evaluates the page's requirement against
/// the current session snapshot and turns the decision into a response:
/// 202 while the session loads, 200 with a `PageView` when allowed, 303 otherwise.
///
/// *Mechanism*: the decision is taken from the snapshot as it is *now*. A
/// throttled session refresh with the visitor's cookies is then spawned; it is
/// never cancelled and its result applies to whatever page the visitor is on next.
pub async fn render_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    matched: MatchedPath,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let response = match state.pages.by_pattern(matched.as_str()) {
        Some(page) => interpret(&state, page, uri.path()),
        None => StatusCode::NOT_FOUND.into_response(),
    };

    state
        .sessions
        .set_credentials(Credentials::from_headers(&headers));

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        sessions.fetch_session(false).await;
    });

    response
}

fn interpret(state: &AppState, page: &Page, path: &str) -> Response {
    let session = state.sessions.snapshot();
    let decision = policy::evaluate_in_tree(page.tree, &page.requirement, &session);
    debug!(path, ?decision, "access decision");

    match decision {
        Decision::Pending => {
            (StatusCode::ACCEPTED, Json(json!({ "status": "pending" }))).into_response()
        }
        Decision::Allow => Json(PageView {
            path: path.to_string(),
            title: page.title.to_string(),
            tree: page.tree,
            session: SessionView::from(&session),
        })
        .into_response(),
        Decision::Redirect { to, reason } => {
            if reason == RedirectReason::AccessDenied {
                state.notifications.error(ACCESS_DENIED_MESSAGE);
            }
            (StatusCode::SEE_OTHER, [(header::LOCATION, to)]).into_response()
        }
    }
}

// --- Shell Control API ---

/// get_session
///
/// Returns the current session snapshot without contacting the backend.
#[utoipa::path(
    get,
    path = "/shell/session",
    responses((status = 200, description = "Current session", body = SessionView))
)]
pub async fn get_session(State(sessions): State<SessionState>) -> Json<SessionView> {
    Json(SessionView::from(&sessions.snapshot()))
}

/// refresh_session
///
/// Forces a session fetch, bypassing the throttle. Called by the UI right after
/// a successful login, with the browser's fresh session cookie attached.
#[utoipa::path(
    post,
    path = "/shell/session/refresh",
    responses((status = 200, description = "Refreshed session", body = SessionView))
)]
pub async fn refresh_session(
    State(sessions): State<SessionState>,
    headers: HeaderMap,
) -> Json<SessionView> {
    sessions.set_credentials(Credentials::from_headers(&headers));
    let session = sessions.fetch_session(true).await;
    Json(SessionView::from(&session))
}

/// get_decision
///
/// Evaluates the access policy for an arbitrary page path without navigating.
#[utoipa::path(
    get,
    path = "/shell/decision",
    params(DecisionQuery),
    responses(
        (status = 200, description = "Decision", body = Decision),
        (status = 404, description = "Unknown page")
    )
)]
pub async fn get_decision(
    State(pages): State<PageState>,
    State(sessions): State<SessionState>,
    Query(query): Query<DecisionQuery>,
) -> Result<Json<Decision>, ShellError> {
    let page = pages
        .resolve(&query.path)
        .ok_or_else(|| ShellError::UnknownRoute(query.path.clone()))?;

    Ok(Json(policy::evaluate_in_tree(
        page.tree,
        &page.requirement,
        &sessions.snapshot(),
    )))
}

/// logout
///
/// Ends the backend session. On failure the local session is left as it was and
/// an error notification is queued for the visitor.
///
/// *Mechanism*: `Set-Cookie` headers from the backend's logout answer are
/// relayed on the 200 response, so the browser drops its session cookie too.
#[utoipa::path(
    post,
    path = "/shell/logout",
    responses(
        (status = 200, description = "Logged out", body = LogoutOutcome),
        (status = 502, description = "Logout failed")
    )
)]
pub async fn logout(
    State(sessions): State<SessionState>,
    State(notifications): State<NotificationState>,
    headers: HeaderMap,
) -> Result<Response, ShellError> {
    sessions.set_credentials(Credentials::from_headers(&headers));

    match sessions.logout().await {
        Ok(mut outcome) => {
            notifications.info("You have been logged out.");
            let set_cookies = std::mem::take(&mut outcome.set_cookies);

            let mut response = Json(outcome).into_response();
            for cookie in set_cookies {
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        response.headers_mut().append(header::SET_COOKIE, value);
                    }
                    Err(e) => warn!(error = %e, "dropping unrelayable Set-Cookie header"),
                }
            }
            Ok(response)
        }
        Err(e) => {
            let message = e.user_message();
            notifications.error(message.clone());
            Err(ShellError::Logout(message))
        }
    }
}

/// get_notifications
///
/// Drains the queued notifications, oldest first.
#[utoipa::path(
    get,
    path = "/shell/notifications",
    responses((status = 200, description = "Pending notifications", body = [Notification]))
)]
pub async fn get_notifications(
    State(notifications): State<NotificationState>,
) -> Json<Vec<Notification>> {
    Json(notifications.drain())
}
