use super::Page;
use crate::models::{RouteRequirement, RouteTree};

/// Owner Page Tree
///
/// The venue-owner dashboard: listing management, incoming bookings and reviews.
/// Every page requires a signed-in session with the 'owner' role; admins are
/// sent back to `/admin`, everyone else to `/`.
pub fn pages() -> Vec<Page> {
    let tree = RouteTree::Owner;
    let owner_only = || RouteRequirement::roles(["owner"]);

    vec![
        Page::new("/owner", "Owner Dashboard", tree, owner_only()),
        Page::new("/owner/venues", "My Venues", tree, owner_only()),
        Page::new("/owner/venues/new", "Add Venue", tree, owner_only()),
        Page::new("/owner/venues/{id}/edit", "Edit Venue", tree, owner_only()),
        Page::new("/owner/bookings", "Venue Bookings", tree, owner_only()),
        Page::new("/owner/reviews", "Venue Reviews", tree, owner_only()),
    ]
}
