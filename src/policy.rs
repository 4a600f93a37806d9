//! Access Policy
//!
//! Pure decision logic mapping a route's `RouteRequirement` and the current
//! `Session` to a `Decision`. Nothing here performs I/O or keeps state, so the
//! same inputs always produce the same decision.

use crate::models::{Decision, RedirectReason, Role, RouteRequirement, RouteTree, Session};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
pub const ADMIN_HOME_PATH: &str = "/admin";
pub const OWNER_HOME_PATH: &str = "/owner";

/// Landing page for a role: its own dashboard for admin/owner, home for everyone else.
pub fn default_path_for(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_HOME_PATH,
        Role::Owner => OWNER_HOME_PATH,
        Role::User | Role::Anonymous => HOME_PATH,
    }
}

/// Target of an access-denied redirect. Only admins are sent back to their dashboard;
/// an owner denied elsewhere lands on home and is forwarded by the general tree.
pub fn denied_path_for(role: Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_HOME_PATH,
        _ => HOME_PATH,
    }
}

/// evaluate
///
/// Decides whether `session` may render a route declaring `requirement`.
/// Branches are checked in order and the first match wins:
///
/// 1. loading session: `Pending`
/// 2. authentication required but absent: redirect to `/login`
/// 3. logout-only route while signed in: redirect to the role's landing page
/// 4. no role list, or the session's role is listed: `Allow`
/// 5. anything else: access-denied redirect. When the role list names no known
///    role at all (a misconfigured route), the target is always home.
pub fn evaluate(requirement: &RouteRequirement, session: &Session) -> Decision {
    if session.loading() {
        return Decision::Pending;
    }

    if requirement.require_authentication && !session.is_authenticated() {
        return Decision::redirect(LOGIN_PATH, RedirectReason::LoginRequired);
    }

    if requirement.logout_only && session.is_authenticated() {
        return Decision::redirect(
            default_path_for(session.role()),
            RedirectReason::AlreadyAuthenticated,
        );
    }

    if requirement.admits(session.role()) {
        return Decision::Allow;
    }

    let target = if requirement.names_known_role() {
        denied_path_for(session.role())
    } else {
        HOME_PATH
    };
    Decision::redirect(target, RedirectReason::AccessDenied)
}

/// evaluate_in_tree
///
/// `evaluate` plus the subtree composition rule: the general tree turns an
/// `Allow` for admin and owner sessions into a redirect to their own area.
pub fn evaluate_in_tree(
    tree: RouteTree,
    requirement: &RouteRequirement,
    session: &Session,
) -> Decision {
    let decision = evaluate(requirement, session);

    match (tree, &decision) {
        (RouteTree::General, Decision::Allow) if session.role().is_privileged() => {
            Decision::redirect(
                default_path_for(session.role()),
                RedirectReason::PrivilegedArea,
            )
        }
        _ => decision,
    }
}
