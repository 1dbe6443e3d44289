use std::time::Duration;

use crate::error::ScraperError;
use crate::events::Reporter;
use crate::page::{Page, Role};
use crate::text::LOAD_MORE_NEEDLES;

/// Result of one attempt to make the site render more reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Revealed,
    /// Controls failed; the page was scrolled to trigger lazy loading.
    ScrolledFallback,
    /// No control offers more reviews.
    Exhausted,
}

pub(crate) async fn reveal_more<P: Page>(
    page: &P,
    settle: Duration,
    reporter: &Reporter,
) -> RevealOutcome {
    match click_reveal_control(page, settle).await {
        Ok(true) => RevealOutcome::Revealed,
        Ok(false) => RevealOutcome::Exhausted,
        Err(e) => {
            reporter.warn(format!(
                "Load-more control failed ({e}), scrolling to the bottom instead"
            ));
            if let Err(e) = page.scroll_to_bottom().await {
                tracing::debug!(error = %e, "scroll fallback failed");
            }
            tokio::time::sleep(settle).await;
            RevealOutcome::ScrolledFallback
        }
    }
}

/// `Ok(true)` when a control was clicked, `Ok(false)` when none exists.
async fn click_reveal_control<P: Page>(page: &P, settle: Duration) -> Result<bool, ScraperError> {
    if let Some(button) = page.find_one(Role::LoadMore).await? {
        page.scroll_into_view(&button).await?;
        tokio::time::sleep(settle).await;
        match page.click(&button).await {
            Ok(()) => {
                tokio::time::sleep(settle).await;
                return Ok(true);
            }
            Err(ScraperError::NotInteractable { .. }) => {
                tracing::debug!("load-more button refused the click, searching by text");
            }
            Err(e) => return Err(e),
        }
    }

    let Some(control) = page.find_clickable_by_text(LOAD_MORE_NEEDLES).await? else {
        return Ok(false);
    };
    page.scroll_into_view(&control).await?;
    page.click(&control).await?;
    tokio::time::sleep(settle).await;
    Ok(true)
}
