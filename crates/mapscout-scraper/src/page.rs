//! Element-locator capability the extraction engines are written against.
//!
//! Engines never see selectors. They ask for a semantic [`Role`] and the
//! implementation (a live browser, or a scripted page in tests) decides how
//! that role is addressed.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use mapscout_core::{Locator, LocatorMap};

use crate::error::ScraperError;

/// Semantic element roles. Ordinals are 1-based, in site rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    CookieBanner,
    Title,
    PhoneReveal,
    Phone,
    Address,
    NextPage,
    ResultItem(usize),
    ReviewsEntry,
    OverallRating,
    TotalRatingCount,
    ReviewerName(usize),
    StarContainer(usize),
    ReviewText(usize),
    ReviewLikes(usize),
    LoadMore,
    ExpandText,
}

impl Role {
    /// Resolve this role to a concrete locator, substituting the ordinal.
    #[must_use]
    pub fn locate(self, map: &LocatorMap) -> Locator {
        match self {
            Role::CookieBanner => map.cookie_banner.clone(),
            Role::Title => map.title.clone(),
            Role::PhoneReveal => map.phone_reveal.clone(),
            Role::Phone => map.phone.clone(),
            Role::Address => map.address.clone(),
            Role::NextPage => map.next_page.clone(),
            Role::ResultItem(n) => map.result_item.at(n),
            Role::ReviewsEntry => map.reviews_entry.clone(),
            Role::OverallRating => map.overall_rating.clone(),
            Role::TotalRatingCount => map.total_rating_count.clone(),
            Role::ReviewerName(n) => map.reviewer_name.at(n),
            Role::StarContainer(n) => map.star_container.at(n),
            Role::ReviewText(n) => map.review_text.at(n),
            Role::ReviewLikes(n) => map.review_likes.at(n),
            Role::LoadMore => map.load_more.clone(),
            Role::ExpandText => map.expand_text.clone(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::CookieBanner => f.write_str("cookie banner"),
            Role::Title => f.write_str("title"),
            Role::PhoneReveal => f.write_str("phone reveal"),
            Role::Phone => f.write_str("phone"),
            Role::Address => f.write_str("address"),
            Role::NextPage => f.write_str("next page"),
            Role::ResultItem(n) => write!(f, "result item #{n}"),
            Role::ReviewsEntry => f.write_str("reviews entry"),
            Role::OverallRating => f.write_str("overall rating"),
            Role::TotalRatingCount => f.write_str("total rating count"),
            Role::ReviewerName(n) => write!(f, "reviewer name #{n}"),
            Role::StarContainer(n) => write!(f, "star container #{n}"),
            Role::ReviewText(n) => write!(f, "review text #{n}"),
            Role::ReviewLikes(n) => write!(f, "review likes #{n}"),
            Role::LoadMore => f.write_str("load more"),
            Role::ExpandText => f.write_str("expand text"),
        }
    }
}

/// How rating markers inside a star container are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStrategy {
    /// Discrete glyph sub-elements, one per star.
    Glyphs,
    /// Vector markers whose fill color marks them as active.
    FilledMarkers,
}

#[async_trait]
pub trait Page: Send + Sync {
    type Element: Clone + fmt::Debug + Send + Sync;

    /// Absence is `Ok(None)`, never an error.
    async fn find_one(&self, role: Role) -> Result<Option<Self::Element>, ScraperError>;

    /// Waits up to `timeout` for `role` to become clickable. A timeout
    /// degrades to `Ok(None)`.
    async fn wait_clickable(
        &self,
        role: Role,
        timeout: Duration,
    ) -> Result<Option<Self::Element>, ScraperError>;

    async fn click(&self, element: &Self::Element) -> Result<(), ScraperError>;

    async fn read_text(&self, element: &Self::Element) -> Result<String, ScraperError>;

    async fn count_rating_markers(
        &self,
        container: &Self::Element,
        strategy: MarkerStrategy,
    ) -> Result<usize, ScraperError>;

    /// First visible `role` element strictly below `anchor` and no more than
    /// `within_px` pixels away from it.
    async fn find_below(
        &self,
        role: Role,
        anchor: &Self::Element,
        within_px: f64,
    ) -> Result<Option<Self::Element>, ScraperError>;

    /// First clickable control whose lower-cased text contains any needle.
    async fn find_clickable_by_text(
        &self,
        needles: &[&str],
    ) -> Result<Option<Self::Element>, ScraperError>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<(), ScraperError>;

    async fn scroll_to_bottom(&self) -> Result<(), ScraperError>;

    async fn navigate(&self, url: &str) -> Result<(), ScraperError>;

    async fn go_back(&self) -> Result<(), ScraperError>;

    async fn current_url(&self) -> Result<String, ScraperError>;
}

/// A page bound to a live automation session for the length of one run.
#[async_trait]
pub trait AutomationHandle: Page {
    /// Release page memory: GC hint, console log clear, web storage clear.
    async fn housekeeping(&self) -> Result<(), ScraperError>;

    async fn shutdown(&mut self) -> Result<(), ScraperError>;
}

#[async_trait]
pub trait Launcher: Send + Sync {
    type Handle: AutomationHandle + 'static;

    async fn launch(&self) -> Result<Self::Handle, ScraperError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_roles_substitute_index() {
        let map = LocatorMap::default();
        let loc = Role::ReviewText(3).locate(&map);
        assert!(loc.path.contains("/div[2]/div[3]/div[4]"), "got {}", loc.path);
        assert!(!loc.is_ordinal());
    }

    #[test]
    fn fixed_roles_are_copied() {
        let map = LocatorMap::default();
        assert_eq!(Role::LoadMore.locate(&map), map.load_more);
        assert_eq!(Role::Title.locate(&map), map.title);
    }
}
