use mapscout_core::StarRating;

use crate::error::ScraperError;
use crate::page::{MarkerStrategy, Page, Role};

/// Star rating of the review at `ordinal`.
///
/// Glyphs are counted first. When none are found the filled vector markers
/// are counted instead. A missing container or a failed count is `Unknown`.
pub(crate) async fn read_star_rating<P: Page>(page: &P, ordinal: usize) -> StarRating {
    let container = match page.find_one(Role::StarContainer(ordinal)).await {
        Ok(Some(container)) => container,
        Ok(None) => return StarRating::Unknown,
        Err(e) => {
            tracing::debug!(ordinal, error = %e, "star container lookup failed");
            return StarRating::Unknown;
        }
    };

    match count_stars(page, &container).await {
        Ok(rating) => rating,
        Err(e) => {
            tracing::debug!(ordinal, error = %e, "star count failed");
            StarRating::Unknown
        }
    }
}

async fn count_stars<P: Page>(page: &P, container: &P::Element) -> Result<StarRating, ScraperError> {
    let glyphs = page
        .count_rating_markers(container, MarkerStrategy::Glyphs)
        .await?;
    if glyphs > 0 {
        return Ok(StarRating::from_count(glyphs));
    }

    let filled = page
        .count_rating_markers(container, MarkerStrategy::FilledMarkers)
        .await?;
    Ok(StarRating::from_count(filled))
}
