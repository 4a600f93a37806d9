use super::Page;
use crate::models::{RouteRequirement, RouteTree};

/// General Page Tree
///
/// Pages for anonymous visitors and regular users. None of them declare a role,
/// but the general tree redirects admin and owner sessions to their own
/// dashboards (see `policy::evaluate_in_tree`).
pub fn pages() -> Vec<Page> {
    let tree = RouteTree::General;
    vec![
        // --- Open to everyone ---
        Page::new("/", "Home", tree, RouteRequirement::open()),
        Page::new("/explore", "Explore Venues", tree, RouteRequirement::open()),
        Page::new("/venues/{id}", "Venue Details", tree, RouteRequirement::open()),
        Page::new("/about", "About", tree, RouteRequirement::open()),
        Page::new("/contact", "Contact", tree, RouteRequirement::open()),
        // --- Signed-in visitors ---
        Page::new("/bookings", "My Bookings", tree, RouteRequirement::authenticated()),
        Page::new(
            "/bookings/{id}",
            "Booking Details",
            tree,
            RouteRequirement::authenticated(),
        ),
        Page::new("/profile", "Profile", tree, RouteRequirement::authenticated()),
        // Checkout hands off to the payment widget; the payment itself is not handled here.
        Page::new(
            "/checkout/{venue_id}",
            "Checkout",
            tree,
            RouteRequirement::authenticated(),
        ),
        Page::new(
            "/payment/success",
            "Payment Complete",
            tree,
            RouteRequirement::authenticated(),
        ),
        // --- Auth forms, only while signed out ---
        Page::new("/login", "Log In", tree, RouteRequirement::logout_only()),
        Page::new("/signup", "Sign Up", tree, RouteRequirement::logout_only()),
        Page::new(
            "/forgot-password",
            "Reset Password",
            tree,
            RouteRequirement::logout_only(),
        ),
    ]
}
