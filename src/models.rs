use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles & Identity ---

/// Role
///
/// The closed set of visitor roles understood by the access policy.
/// Raw role strings from the backend are normalised through `Role::parse`
/// at the gateway boundary, so the policy never compares raw strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Anonymous,
    User,
    Owner,
    Admin,
}

impl Role {
    /// Trims and lowercases `raw` before matching. Unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Role> {
        match normalize_role(raw).as_str() {
            "anonymous" => Some(Role::Anonymous),
            "user" => Some(Role::User),
            "owner" => Some(Role::Owner),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::User => "user",
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }

    /// Admin and owner sessions are kept out of the general visitor area.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Owner)
    }
}

/// Canonical form used for every role comparison: whitespace-trimmed, ASCII lowercase.
pub fn normalize_role(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Identity
///
/// Display-only record of the signed-in visitor, taken from the backend's `userdata`.
/// Extra fields sent by the backend are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Identity {
    #[serde(alias = "_id", default)]
    pub id: String,
    #[serde(alias = "fullName", default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

// --- Session ---

/// Session
///
/// Snapshot of the current visitor's authentication state. Fields are private so
/// that a session can only be built whole: authenticated sessions always carry a
/// non-anonymous role and an identity, anonymous ones never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Session {
    is_authenticated: bool,
    role: Role,
    identity: Option<Identity>,
    loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Session::anonymous()
    }
}

impl Session {
    /// The settled anonymous default.
    pub fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            role: Role::Anonymous,
            identity: None,
            loading: false,
        }
    }

    /// The state at application start, before the first fetch has settled.
    pub fn initial() -> Self {
        Self {
            loading: true,
            ..Session::anonymous()
        }
    }

    /// An authenticated session. `Role::Anonymous` collapses to the anonymous default.
    pub fn authenticated(role: Role, identity: Identity) -> Self {
        if role == Role::Anonymous {
            return Session::anonymous();
        }
        Self {
            is_authenticated: true,
            role,
            identity: Some(identity),
            loading: false,
        }
    }

    /// Builds the session a `fetch-session` response describes.
    ///
    /// Returns `None` for anything that is not a complete, recognisable login:
    /// `success=false`, a missing `userdata` block, or a role outside the known set.
    pub fn from_response(response: FetchSessionResponse) -> Option<Self> {
        if !response.success {
            return None;
        }
        let userdata = response.userdata?;
        let role = Role::parse(&userdata.role)?;
        if role == Role::Anonymous {
            return None;
        }
        Some(Session::authenticated(role, userdata.identity))
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }
}

// --- Route Requirements & Decisions ---

/// RouteRequirement
///
/// Static access declaration attached to every page route.
/// Role names are stored normalised; names outside the known role set simply never match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RouteRequirement {
    pub required_roles: BTreeSet<String>,
    pub require_authentication: bool,
    pub logout_only: bool,
}

impl RouteRequirement {
    /// Open to every visitor.
    pub fn open() -> Self {
        Self::default()
    }

    /// Any signed-in visitor.
    pub fn authenticated() -> Self {
        Self {
            require_authentication: true,
            ..Self::default()
        }
    }

    /// Login/signup style routes that signed-in visitors are bounced away from.
    pub fn logout_only() -> Self {
        Self {
            logout_only: true,
            ..Self::default()
        }
    }

    /// Signed-in visitors holding one of `roles`.
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::authenticated().with_roles(roles)
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.required_roles
            .extend(roles.into_iter().map(|role| normalize_role(role.as_ref())));
        self
    }

    /// Whether at least one listed role is part of the known role set.
    pub fn names_known_role(&self) -> bool {
        self.required_roles
            .iter()
            .any(|required| Role::parse(required).is_some())
    }

    /// True when `role` satisfies the role list (an empty list admits everyone).
    pub fn admits(&self, role: Role) -> bool {
        self.required_roles.is_empty()
            || self
                .required_roles
                .iter()
                .any(|required| normalize_role(required) == role.as_str())
    }
}

/// RedirectReason
///
/// Which branch of the policy produced a redirect. Only `AccessDenied`
/// asks the shell for a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RedirectReason {
    LoginRequired,
    AlreadyAuthenticated,
    AccessDenied,
    PrivilegedArea,
}

/// Decision
///
/// Plain-data outcome of an access check, interpreted by the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
#[ts(export)]
pub enum Decision {
    /// The session is still loading; render a neutral state and re-evaluate later.
    Pending,
    Allow,
    Redirect { to: String, reason: RedirectReason },
}

impl Decision {
    pub fn redirect(to: &str, reason: RedirectReason) -> Self {
        Decision::Redirect {
            to: to.to_string(),
            reason,
        }
    }

    /// The redirect target, if this is a redirect.
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            Decision::Redirect { to, .. } => Some(to),
            _ => None,
        }
    }
}

/// RouteTree
///
/// The three disjoint page subtrees of the marketplace UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RouteTree {
    General,
    Owner,
    Admin,
}

// --- Backend Payloads ---

/// Response of `GET /api/auth/fetch-session`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FetchSessionResponse {
    pub success: bool,
    #[serde(default)]
    pub userdata: Option<UserData>,
}

/// The `userdata` block: a raw role string plus identity fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub role: String,
    #[serde(flatten)]
    pub identity: Identity,
}

/// Response of `GET /api/auth/logout`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogoutResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// `Set-Cookie` headers the backend sent (typically clearing the session
    /// cookie). Filled in by the gateway, not part of the JSON body.
    #[serde(skip)]
    pub set_cookies: Vec<String>,
}

// --- Shell Output Schemas ---

/// SessionView
///
/// Output schema for `GET /shell/session` and the `session` part of a page view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionView {
    pub is_authenticated: bool,
    pub role: Role,
    pub loading: bool,
    pub identity: Option<Identity>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            is_authenticated: session.is_authenticated(),
            role: session.role(),
            loading: session.loading(),
            identity: session.identity().cloned(),
        }
    }
}

/// PageView
///
/// View model returned when a page route is allowed to render.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageView {
    pub path: String,
    pub title: String,
    pub tree: RouteTree,
    pub session: SessionView,
}

/// Body of a successful `POST /shell/logout`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LogoutOutcome {
    pub redirect: String,
    /// Backend `Set-Cookie` headers to relay to the browser.
    #[serde(skip)]
    pub set_cookies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Notification
///
/// A transient, user-visible message (the UI's "toast").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    #[ts(type = "string")]
    pub raised_at: DateTime<Utc>,
}
