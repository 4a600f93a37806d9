//! Router Module Index
//!
//! Organizes the marketplace's page routes into the three disjoint subtrees the
//! access policy knows about. Each page carries its own `RouteRequirement`, so
//! access control is declared next to the route rather than inside handlers.

use crate::{
    AppState, handlers,
    models::{RouteRequirement, RouteTree},
};
use axum::{Router, routing::get};
use std::{collections::HashMap, sync::Arc};

/// Home, discovery, venue pages, the visitor's bookings and the auth forms.
pub mod general;

/// Venue-owner dashboard. Requires the 'owner' role.
pub mod owner;

/// Marketplace administration. Requires the 'admin' role.
pub mod admin;

/// Page
///
/// One page route: its axum path pattern, display title, subtree and access requirement.
#[derive(Debug, Clone)]
pub struct Page {
    pub path: &'static str,
    pub title: &'static str,
    pub tree: RouteTree,
    pub requirement: RouteRequirement,
}

impl Page {
    pub fn new(
        path: &'static str,
        title: &'static str,
        tree: RouteTree,
        requirement: RouteRequirement,
    ) -> Self {
        Self {
            path,
            title,
            tree,
            requirement,
        }
    }

    /// Number of `{param}` segments in the pattern. Used to prefer literal matches.
    fn param_count(&self) -> usize {
        segments(self.path).filter(|s| is_param(s)).count()
    }

    /// Whether a concrete request path matches this page's pattern.
    pub fn matches(&self, path: &str) -> bool {
        let mut pattern = segments(self.path);
        let mut concrete = segments(path);

        loop {
            match (pattern.next(), concrete.next()) {
                (None, None) => return true,
                (Some(p), Some(c)) if is_param(p) || p == c => continue,
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn is_param(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
}

/// PageTable
///
/// Every page of the UI, indexed by its path pattern.
#[derive(Debug, Clone)]
pub struct PageTable {
    pages: Vec<Page>,
    by_pattern: HashMap<&'static str, usize>,
}

impl PageTable {
    pub fn new(pages: Vec<Page>) -> Self {
        let by_pattern = pages
            .iter()
            .enumerate()
            .map(|(index, page)| (page.path, index))
            .collect();
        Self { pages, by_pattern }
    }

    /// The full marketplace table: general, owner and admin subtrees.
    pub fn venueserv() -> Self {
        let mut pages = general::pages();
        pages.extend(owner::pages());
        pages.extend(admin::pages());
        Self::new(pages)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Looks a page up by its exact path pattern (as reported by axum's `MatchedPath`).
    pub fn by_pattern(&self, pattern: &str) -> Option<&Page> {
        self.by_pattern.get(pattern).map(|&index| &self.pages[index])
    }

    /// Resolves a concrete path such as `/venues/42` to its page. Literal
    /// segments win over `{param}` segments when several patterns match.
    pub fn resolve(&self, path: &str) -> Option<&Page> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        self.pages
            .iter()
            .filter(|page| page.matches(path))
            .min_by_key(|page| page.param_count())
    }
}

/// PageState
///
/// Shared, read-only handle to the page table.
pub type PageState = Arc<PageTable>;

/// page_routes
///
/// Registers every page of `table` with the shared page handler.
pub fn page_routes(table: &PageTable) -> Router<AppState> {
    table
        .pages()
        .iter()
        .fold(Router::new(), |router, page| {
            router.route(page.path, get(handlers::render_page))
        })
}
