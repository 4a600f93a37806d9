use super::Page;
use crate::models::{RouteRequirement, RouteTree};

/// Admin Page Tree
///
/// Pages exclusively accessible to sessions with the 'admin' role: user and venue
/// moderation, platform-wide bookings and payments, and marketplace configuration.
pub fn pages() -> Vec<Page> {
    let tree = RouteTree::Admin;
    let admin_only = || RouteRequirement::roles(["admin"]);

    vec![
        Page::new("/admin", "Admin Dashboard", tree, admin_only()),
        Page::new("/admin/users", "Users", tree, admin_only()),
        Page::new("/admin/venues", "Venues", tree, admin_only()),
        Page::new("/admin/bookings", "Bookings", tree, admin_only()),
        Page::new("/admin/payments", "Payments", tree, admin_only()),
        Page::new("/admin/config", "Marketplace Settings", tree, admin_only()),
    ]
}
