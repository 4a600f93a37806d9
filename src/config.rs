use std::{env, time::Duration};

use tracing::warn;

use crate::session::DEFAULT_REFRESH_INTERVAL;

/// AppConfig
///
/// Holds the shell's entire configuration. Immutable once loaded.
///
/// *Mechanism*: `main` consumes it directly (log format, gateway URL and
/// timeout, bind address); only `session_refresh_interval` travels on, into
/// the `SessionStore` built by `AppState::new`. Handlers never read it.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and which settings are mandatory.
    pub env: Env,
    // Base URL of the VenueServ backend API (no trailing slash needed).
    pub api_base_url: String,
    // Address the shell's HTTP server binds to.
    pub bind_addr: String,
    // Minimum spacing between unforced session fetches.
    pub session_refresh_interval: Duration,
    // Per-request timeout for backend calls.
    pub api_timeout: Duration,
}

/// Env
///
/// Defines the runtime context: local development or production.
/// `Local` logs human-readable output and falls back to a backend on
/// `localhost:4000`; `Production` logs JSON and insists on `VENUESERV_API_URL`.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

// Fallbacks used outside production.
pub const LOCAL_API_URL: &str = "http://localhost:4000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(10);

impl Default for AppConfig {
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_base_url: LOCAL_API_URL.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            session_refresh_interval: DEFAULT_REFRESH_INTERVAL,
            api_timeout: DEFAULT_API_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, failing fast on
    /// anything production cannot run without.
    ///
    /// | Variable               | Default                 |
    /// |------------------------|-------------------------|
    /// | `APP_ENV`              | `local`                 |
    /// | `VENUESERV_API_URL`    | `http://localhost:4000` (required in production) |
    /// | `SHELL_BIND_ADDR`      | `0.0.0.0:3000`          |
    /// | `SESSION_REFRESH_SECS` | `5`                     |
    /// | `API_TIMEOUT_SECS`     | `10`                    |
    ///
    /// Numeric values that fail to parse are logged and replaced by their default.
    ///
    /// # Panics
    /// Panics in production when `VENUESERV_API_URL` is missing.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.trim().to_ascii_lowercase().as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match env {
            Env::Production => env::var("VENUESERV_API_URL")
                .expect("FATAL: VENUESERV_API_URL must be set in production."),
            Env::Local => {
                env::var("VENUESERV_API_URL").unwrap_or_else(|_| LOCAL_API_URL.to_string())
            }
        };

        Self {
            env,
            api_base_url,
            bind_addr: env::var("SHELL_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            session_refresh_interval: seconds_var("SESSION_REFRESH_SECS", DEFAULT_REFRESH_INTERVAL),
            api_timeout: seconds_var("API_TIMEOUT_SECS", DEFAULT_API_TIMEOUT),
        }
    }
}

/// Reads a whole number of seconds, keeping `default` when unset or unparsable.
fn seconds_var(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                warn!("Invalid {key} value {raw:?}: {e}, using default");
                default
            }
        },
        Err(_) => default,
    }
}
