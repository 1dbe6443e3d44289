//! Review extraction for one listing.
//!
//! Reviews are rendered in pages: a window of ordinals is scanned, new
//! records are committed one by one, then the site is asked to render more.
//! The loop ends when the target is met, the site has nothing more to show,
//! the load budget is spent, or the observer cancels.

mod rating;
mod reveal;

use std::collections::HashSet;
use std::time::Duration;

use mapscout_core::{AppConfig, RatingSummary, ReviewRecord};
use tokio_util::sync::CancellationToken;

use crate::controls::Controls;
use crate::error::ScraperError;
use crate::events::Reporter;
use crate::page::{Page, Role};
use crate::retry::retry_with_backoff;
use crate::text::{first_digit_run, looks_truncated, MISSING_REVIEW_TEXT};

pub use reveal::RevealOutcome;

#[derive(Debug, Clone)]
pub struct ReviewPolicy {
    /// Ordinals inspected per cycle.
    pub scan_window: usize,
    pub max_load_attempts: u32,
    /// Maximum vertical distance between a review body and its expand control.
    pub expand_within_px: f64,
    pub click_timeout: Duration,
    pub settle: Duration,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl ReviewPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scan_window: config.review_scan_window,
            max_load_attempts: config.review_max_load_attempts,
            expand_within_px: 200.0,
            click_timeout: config.click_timeout(),
            settle: config.settle(),
            max_retries: config.max_retries,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
        }
    }
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// A review as read from the page, before commit.
struct ScannedReview {
    reviewer_name: String,
    rating: mapscout_core::StarRating,
    text: String,
    likes: String,
}

#[derive(Debug, Clone)]
pub struct ReviewExtractor {
    policy: ReviewPolicy,
}

impl ReviewExtractor {
    #[must_use]
    pub fn new(policy: ReviewPolicy) -> Self {
        Self { policy }
    }

    /// Collect up to `target` reviews for the listing currently shown on `page`.
    ///
    /// Never fails: a missing reviews tab yields an empty list, and every
    /// per-review problem degrades to a default value. Returns at most
    /// `target` records, and no more than the site's reported total when it
    /// is known.
    pub async fn extract<P: Page>(
        &self,
        page: &P,
        place: &str,
        target: usize,
        controls: &Controls,
        reporter: &Reporter,
    ) -> Vec<ReviewRecord> {
        let token = controls.begin_reviews();

        if !self.open_reviews(page, place, reporter).await {
            return Vec::new();
        }

        let records = self
            .collect(page, place, target, controls, &token, reporter)
            .await;
        reporter.info(format!("{place}: collected {} reviews", records.len()));

        let back = retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base_ms,
            move || page.go_back(),
        )
        .await;
        if let Err(e) = back {
            reporter.warn(format!("{place}: could not leave the reviews tab: {e}"));
        }
        tokio::time::sleep(self.policy.settle).await;

        records
    }

    async fn open_reviews<P: Page>(&self, page: &P, place: &str, reporter: &Reporter) -> bool {
        let entry = match page
            .wait_clickable(Role::ReviewsEntry, self.policy.click_timeout)
            .await
        {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                reporter.warn(format!("{place}: no reviews tab, skipping reviews"));
                return false;
            }
            Err(e) => {
                reporter.warn(format!("{place}: reviews tab lookup failed: {e}"));
                return false;
            }
        };

        let entry = &entry;
        let clicked = retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base_ms,
            move || page.click(entry),
        )
        .await;
        if let Err(e) = clicked {
            reporter.warn(format!("{place}: could not open the reviews tab: {e}"));
            return false;
        }
        tokio::time::sleep(self.policy.settle).await;
        true
    }

    async fn collect<P: Page>(
        &self,
        page: &P,
        place: &str,
        requested: usize,
        controls: &Controls,
        token: &CancellationToken,
        reporter: &Reporter,
    ) -> Vec<ReviewRecord> {
        let (summary, reported_total) = match read_summary(page).await {
            Ok((overall, count_text)) => {
                let digits = first_digit_run(&count_text);
                let summary = RatingSummary {
                    overall_rating: if overall.is_empty() {
                        "0".to_string()
                    } else {
                        overall
                    },
                    total_ratings: digits.unwrap_or("0").to_string(),
                };
                (summary, digits.and_then(|d| d.parse::<usize>().ok()))
            }
            Err(e) => {
                reporter.warn(format!("{place}: rating summary unavailable: {e}"));
                (RatingSummary::default(), None)
            }
        };
        let clamp = |target: usize| reported_total.map_or(target, |total| target.min(total));

        let mut target = clamp(requested);
        if target < requested {
            reporter.info(format!(
                "{place}: only {target} reviews reported, lowering target from {requested}"
            ));
        }
        reporter.progress(place, 0, target);

        let mut summary = Some(summary);
        let mut committed: Vec<ReviewRecord> = Vec::new();
        let mut seen: HashSet<(String, usize)> = HashSet::new();
        let mut cursor = 1usize;
        let mut load_attempts = 0u32;
        let mut first_cycle = true;

        loop {
            let adjusted = apply_pending_target(controls, &mut target, clamp, place, reporter);
            if adjusted || !first_cycle {
                reporter.progress(place, committed.len(), target);
            }
            first_cycle = false;

            if committed.len() >= target {
                break;
            }
            if is_cancelled(controls, token) {
                reporter.warn(format!(
                    "{place}: review extraction stopped after {} reviews",
                    committed.len()
                ));
                break;
            }

            let mut highest = None;
            let mut interrupted = false;
            for ordinal in cursor..cursor + self.policy.scan_window {
                if committed.len() >= target {
                    break;
                }
                if is_cancelled(controls, token) {
                    interrupted = true;
                    break;
                }
                let Some(review) = self.read_review(page, ordinal).await else {
                    continue;
                };
                highest = Some(ordinal);
                if apply_pending_target(controls, &mut target, clamp, place, reporter) {
                    reporter.progress(place, committed.len(), target);
                    if committed.len() >= target {
                        break;
                    }
                }
                if !seen.insert((review.reviewer_name.clone(), ordinal)) {
                    continue;
                }
                committed.push(ReviewRecord {
                    reviewer_name: review.reviewer_name,
                    rating: review.rating,
                    text: review.text,
                    likes: review.likes,
                    ordinal,
                    summary: summary.take(),
                });
                reporter.progress(place, committed.len(), target);
            }

            if let Some(highest) = highest {
                cursor = highest + 1;
            }
            if interrupted {
                reporter.warn(format!(
                    "{place}: review extraction stopped after {} reviews",
                    committed.len()
                ));
                break;
            }
            if committed.len() >= target {
                break;
            }
            if load_attempts >= self.policy.max_load_attempts {
                reporter.warn(format!(
                    "{place}: gave up loading more reviews after {load_attempts} attempts"
                ));
                break;
            }

            match reveal::reveal_more(page, self.policy.settle, reporter).await {
                RevealOutcome::Exhausted => {
                    reporter.info(format!("{place}: no more reviews to load"));
                    break;
                }
                RevealOutcome::Revealed | RevealOutcome::ScrolledFallback => load_attempts += 1,
            }
        }

        committed
    }

    /// `None` when no named review is rendered at `ordinal`.
    async fn read_review<P: Page>(&self, page: &P, ordinal: usize) -> Option<ScannedReview> {
        let name_el = match page.find_one(Role::ReviewerName(ordinal)).await {
            Ok(Some(el)) => el,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(ordinal, error = %e, "reviewer name lookup failed");
                return None;
            }
        };
        let reviewer_name = page.read_text(&name_el).await.ok()?.trim().to_string();
        if reviewer_name.is_empty() {
            return None;
        }

        let rating = rating::read_star_rating(page, ordinal).await;
        let text = self.read_review_text(page, ordinal).await;
        let likes = read_likes(page, ordinal).await;

        Some(ScannedReview {
            reviewer_name,
            rating,
            text,
            likes,
        })
    }

    async fn read_review_text<P: Page>(&self, page: &P, ordinal: usize) -> String {
        let body = match page.find_one(Role::ReviewText(ordinal)).await {
            Ok(Some(el)) => el,
            Ok(None) => return MISSING_REVIEW_TEXT.to_string(),
            Err(e) => {
                tracing::debug!(ordinal, error = %e, "review text lookup failed");
                return MISSING_REVIEW_TEXT.to_string();
            }
        };
        let text = match page.read_text(&body).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => return MISSING_REVIEW_TEXT.to_string(),
        };

        if !looks_truncated(&text) {
            return text;
        }
        match self.expand_text(page, ordinal, &body).await {
            Ok(Some(full)) if !full.is_empty() => full,
            Ok(_) => text,
            Err(e) => {
                tracing::debug!(ordinal, error = %e, "expanding review text failed");
                text
            }
        }
    }

    async fn expand_text<P: Page>(
        &self,
        page: &P,
        ordinal: usize,
        body: &P::Element,
    ) -> Result<Option<String>, ScraperError> {
        let Some(control) = page
            .find_below(Role::ExpandText, body, self.policy.expand_within_px)
            .await?
        else {
            return Ok(None);
        };
        page.click(&control).await?;
        tokio::time::sleep(self.policy.settle).await;

        let Some(body) = page.find_one(Role::ReviewText(ordinal)).await? else {
            return Ok(None);
        };
        Ok(Some(page.read_text(&body).await?.trim().to_string()))
    }
}

async fn read_summary<P: Page>(page: &P) -> Result<(String, String), ScraperError> {
    let overall = page
        .find_one(Role::OverallRating)
        .await?
        .ok_or(ScraperError::NotFound {
            role: Role::OverallRating,
        })?;
    let overall = page.read_text(&overall).await?.trim().to_string();

    let count = page
        .find_one(Role::TotalRatingCount)
        .await?
        .ok_or(ScraperError::NotFound {
            role: Role::TotalRatingCount,
        })?;
    let count = page.read_text(&count).await?;

    Ok((overall, count))
}

async fn read_likes<P: Page>(page: &P, ordinal: usize) -> String {
    let likes = match page.find_one(Role::ReviewLikes(ordinal)).await {
        Ok(Some(el)) => page.read_text(&el).await.unwrap_or_default(),
        Ok(None) | Err(_) => String::new(),
    };
    let likes = likes.trim();
    if likes.is_empty() {
        "0".to_string()
    } else {
        likes.to_string()
    }
}

/// Take an observer target change, clamped to the reported total.
/// Returns `true` when the target changed.
fn apply_pending_target(
    controls: &Controls,
    target: &mut usize,
    clamp: impl Fn(usize) -> usize,
    place: &str,
    reporter: &Reporter,
) -> bool {
    let Some(requested) = controls.take_pending_target() else {
        return false;
    };
    *target = clamp(requested);
    reporter.info(format!("{place}: review target changed to {target}"));
    true
}

fn is_cancelled(controls: &Controls, token: &CancellationToken) -> bool {
    token.is_cancelled() || controls.is_stopped()
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
