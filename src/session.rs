//! Session Store
//!
//! Owns the process-wide `Session`. The store is the only writer: every update
//! replaces the whole session in one assignment, and readers only ever see
//! complete snapshots.
//!
//! Fetches and logouts run one at a time through `gate`. A caller that arrives
//! while a fetch is in flight waits for it and then sees its result through the
//! throttle, so completion order always matches request order.
//!
//! Backend calls carry the visitor's cookies. The shell records them from each
//! incoming request with `set_credentials`; a change of credentials (a fresh
//! login cookie, say) lifts the throttle for the next unforced fetch.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::gateway::{Credentials, GatewayError, GatewayState};
use crate::models::{LogoutOutcome, Session};
use crate::policy::LOGIN_PATH;

/// Minimum spacing between two unforced session fetches.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LogoutError {
    #[error("logout failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Rejected(String),
}

impl LogoutError {
    /// Short message suitable for a user-visible notification.
    pub fn user_message(&self) -> String {
        match self {
            LogoutError::Gateway(_) => "Logout failed, please try again.".to_string(),
            LogoutError::Rejected(message) => message.clone(),
        }
    }
}

/// Start time and credentials of the last network fetch.
struct LastFetch {
    started: Instant,
    credentials: Credentials,
}

pub struct SessionStore {
    gateway: GatewayState,
    current: RwLock<Session>,
    credentials: RwLock<Credentials>,
    /// Serialises fetch/logout.
    gate: Mutex<Option<LastFetch>>,
    refresh_interval: Duration,
}

/// SessionState
///
/// Shared handle to the single session store.
pub type SessionState = Arc<SessionStore>;

impl SessionStore {
    /// Creates a store in the initial loading state.
    pub fn new(gateway: GatewayState, refresh_interval: Duration) -> Self {
        Self {
            gateway,
            current: RwLock::new(Session::initial()),
            credentials: RwLock::new(Credentials::anonymous()),
            gate: Mutex::new(None),
            refresh_interval,
        }
    }

    pub fn snapshot(&self) -> Session {
        self.current.read().clone()
    }

    fn replace(&self, next: Session) {
        *self.current.write() = next;
    }

    /// Records the cookies the visitor's browser sent with its latest request.
    pub fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write() = credentials;
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials.read().clone()
    }

    /// fetch_session
    ///
    /// Refreshes the session from the backend and returns the resulting snapshot.
    /// Unless `force` is set, a fetch that started less than `refresh_interval`
    /// ago with the same credentials is reused instead of hitting the network
    /// again. Every failure resolves to the anonymous session.
    pub async fn fetch_session(&self, force: bool) -> Session {
        let mut last_fetch = self.gate.lock().await;
        let credentials = self.credentials();

        if !force {
            if let Some(last) = last_fetch.as_ref() {
                if last.credentials == credentials
                    && last.started.elapsed() < self.refresh_interval
                {
                    debug!("session fetch throttled");
                    return self.snapshot();
                }
            }
        }

        *last_fetch = Some(LastFetch {
            started: Instant::now(),
            credentials: credentials.clone(),
        });

        let next = match self.gateway.fetch_session(&credentials).await {
            Ok(response) => Session::from_response(response).unwrap_or_else(|| {
                debug!("backend reported no usable session");
                Session::anonymous()
            }),
            Err(e) => {
                warn!(error = %e, "session fetch failed, falling back to anonymous");
                Session::anonymous()
            }
        };

        let previous = self.snapshot();
        if previous.role() != next.role() || previous.loading() {
            info!(
                role = next.role().as_str(),
                authenticated = next.is_authenticated(),
                "session settled"
            );
        }

        self.replace(next.clone());
        next
    }

    /// logout
    ///
    /// Ends the backend session. On success the local session and the recorded
    /// credentials are reset to anonymous and the caller is told to navigate to
    /// `/login`; on any failure the local session is left untouched.
    pub async fn logout(&self) -> Result<LogoutOutcome, LogoutError> {
        let _gate = self.gate.lock().await;
        let credentials = self.credentials();

        let response = self.gateway.logout(&credentials).await.map_err(|e| {
            warn!(error = %e, "logout request failed");
            LogoutError::from(e)
        })?;

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Logout was rejected by the server.".to_string());
            warn!(%message, "logout rejected");
            return Err(LogoutError::Rejected(message));
        }

        self.replace(Session::anonymous());
        self.set_credentials(Credentials::anonymous());
        info!("session cleared by logout");

        Ok(LogoutOutcome {
            redirect: LOGIN_PATH.to_string(),
            set_cookies: response.set_cookies,
        })
    }
}
