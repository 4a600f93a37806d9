use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{
    StatusCode,
    header::{COOKIE, HeaderMap, SET_COOKIE},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::models::{FetchSessionResponse, Identity, LogoutResponse, UserData};

pub const FETCH_SESSION_PATH: &str = "/api/auth/fetch-session";
pub const LOGOUT_PATH: &str = "/api/auth/logout";

/// GatewayError
///
/// Failures talking to the backend auth endpoints. These never reach policy
/// callers: the session store collapses them to the anonymous session.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend answered with status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Decode(String),
}

/// Credentials
///
/// The visitor's `Cookie` header, captured from the incoming shell request and
/// replayed on every backend call made on their behalf. An empty value means
/// the visitor sent no cookies at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    cookie: Option<String>,
}

impl Credentials {
    /// No cookies: the backend will see an anonymous caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_cookie(cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        Self {
            cookie: (!cookie.trim().is_empty()).then_some(cookie),
        }
    }

    /// Joins every `Cookie` header of a request. Non-ASCII values are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let joined = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        Self::from_cookie(joined)
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }
}

// 1. SessionGateway Contract
/// SessionGateway
///
/// Abstract contract for the backend's session endpoints. Lets the session store
/// run against the real HTTP API in the shell and against `MockSessionGateway`
/// in tests without any change to the calling code.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// `GET /api/auth/fetch-session`, sent with the visitor's cookies.
    async fn fetch_session(
        &self,
        credentials: &Credentials,
    ) -> Result<FetchSessionResponse, GatewayError>;

    /// `GET /api/auth/logout`, sent with the visitor's cookies. Any `Set-Cookie`
    /// headers of the answer are returned in `LogoutResponse::set_cookies`.
    async fn logout(&self, credentials: &Credentials) -> Result<LogoutResponse, GatewayError>;
}

/// GatewayState
///
/// The shared handle to whichever gateway implementation the application runs with.
pub type GatewayState = Arc<dyn SessionGateway>;

// 2. The Real Implementation (VenueServ HTTP API)
/// HttpSessionGateway
///
/// reqwest-backed client. It keeps no cookie jar of its own: the session cookie
/// belongs to the visitor's browser and is forwarded verbatim on each call.
#[derive(Clone)]
pub struct HttpSessionGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issues a GET with the visitor's cookies and decodes the JSON body.
    /// Also returns the `Set-Cookie` headers of the answer.
    async fn get_json<T>(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<(T, Vec<String>), GatewayError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(cookie) = credentials.cookie() {
            request = request.header(COOKIE, cookie);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok().map(str::to_string))
            .collect();

        let body = response.bytes().await?;
        let payload =
            serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok((payload, set_cookies))
    }
}

#[async_trait]
impl SessionGateway for HttpSessionGateway {
    async fn fetch_session(
        &self,
        credentials: &Credentials,
    ) -> Result<FetchSessionResponse, GatewayError> {
        let (response, _) = self.get_json(FETCH_SESSION_PATH, credentials).await?;
        Ok(response)
    }

    async fn logout(&self, credentials: &Credentials) -> Result<LogoutResponse, GatewayError> {
        let (mut response, set_cookies): (LogoutResponse, _) =
            self.get_json(LOGOUT_PATH, credentials).await?;
        response.set_cookies = set_cookies;
        Ok(response)
    }
}

// 3. The Mock Implementation (For Tests)
/// MockSessionGateway
///
/// In-memory gateway with canned responses. Counts calls so tests can assert
/// how many requests actually reached the "network", and remembers the
/// credentials of the latest call.
#[derive(Default)]
pub struct MockSessionGateway {
    session_response: Mutex<FetchSessionResponse>,
    logout_response: Mutex<LogoutResponse>,
    /// When true, every call fails as if the backend were unreachable.
    fail: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
    fetch_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    last_credentials: Mutex<Option<Credentials>>,
}

impl MockSessionGateway {
    /// An anonymous backend whose logout succeeds.
    pub fn new() -> Self {
        let mock = Self::default();
        *mock.logout_response.lock() = LogoutResponse {
            success: true,
            ..LogoutResponse::default()
        };
        mock
    }

    /// A backend where every call fails.
    pub fn new_failing() -> Self {
        let mock = Self::new();
        mock.set_failing(true);
        mock
    }

    /// A backend reporting a signed-in visitor with the given raw role string.
    pub fn signed_in(role: &str) -> Self {
        let mock = Self::new();
        mock.sign_in(role);
        mock
    }

    pub fn sign_in(&self, role: &str) {
        *self.session_response.lock() = FetchSessionResponse {
            success: true,
            userdata: Some(UserData {
                role: role.to_string(),
                identity: Identity {
                    id: "65f1c0ffee".to_string(),
                    name: "Test Visitor".to_string(),
                    email: Some("visitor@venueserv.test".to_string()),
                    phone: None,
                    avatar: None,
                },
            }),
        };
    }

    pub fn sign_out(&self) {
        *self.session_response.lock() = FetchSessionResponse::default();
    }

    pub fn set_session_response(&self, response: FetchSessionResponse) {
        *self.session_response.lock() = response;
    }

    pub fn set_logout_response(&self, response: LogoutResponse) {
        *self.logout_response.lock() = response;
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Makes every call sleep first, to keep requests in flight during tests.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    /// Credentials passed to the most recent fetch or logout.
    pub fn last_credentials(&self) -> Option<Credentials> {
        self.last_credentials.lock().clone()
    }

    async fn simulate_latency(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn simulated_failure(&self) -> Option<GatewayError> {
        let fail = *self.fail.lock();
        fail.then(|| GatewayError::Status(StatusCode::SERVICE_UNAVAILABLE.as_u16()))
    }
}

#[async_trait]
impl SessionGateway for MockSessionGateway {
    async fn fetch_session(
        &self,
        credentials: &Credentials,
    ) -> Result<FetchSessionResponse, GatewayError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_credentials.lock() = Some(credentials.clone());
        self.simulate_latency().await;

        if let Some(err) = self.simulated_failure() {
            return Err(err);
        }
        Ok(self.session_response.lock().clone())
    }

    async fn logout(&self, credentials: &Credentials) -> Result<LogoutResponse, GatewayError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_credentials.lock() = Some(credentials.clone());
        self.simulate_latency().await;

        if let Some(err) = self.simulated_failure() {
            return Err(err);
        }
        Ok(self.logout_response.lock().clone())
    }
}
