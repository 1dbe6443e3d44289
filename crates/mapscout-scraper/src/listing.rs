//! Extraction of one business card.

use std::time::Duration;

use mapscout_core::ListingRecord;

use crate::controls::Controls;
use crate::error::ScraperError;
use crate::events::Reporter;
use crate::page::{Page, Role};
use crate::retry::retry_with_backoff;
use crate::reviews::{ReviewExtractor, ReviewPolicy};
use crate::text::decode_link;

#[derive(Debug, Clone)]
pub struct ListingExtractor {
    policy: ReviewPolicy,
    optional_wait: Duration,
    reviews: Option<ReviewExtractor>,
}

impl ListingExtractor {
    #[must_use]
    pub fn new(policy: ReviewPolicy, optional_wait: Duration, scrape_reviews: bool) -> Self {
        let reviews = scrape_reviews.then(|| ReviewExtractor::new(policy.clone()));
        Self {
            policy,
            optional_wait,
            reviews,
        }
    }

    /// Extract the business currently shown on `page`.
    ///
    /// Returns `Ok(None)` when the page has no title, i.e. it is not a
    /// business card.
    ///
    /// # Errors
    ///
    /// Returns `ScraperError` only when the title itself cannot be read.
    /// Missing phone, address or reviews degrade to empty values.
    pub async fn extract<P: Page>(
        &self,
        page: &P,
        controls: &Controls,
        reporter: &Reporter,
    ) -> Result<Option<ListingRecord>, ScraperError> {
        let Some(title) = page.find_one(Role::Title).await? else {
            return Ok(None);
        };
        let name = page.read_text(&title).await?.trim().to_string();
        if name.is_empty() {
            return Ok(None);
        }
        reporter.info(format!("Processing {name}"));

        let phone = self.read_phone(page, &name).await;
        let address = read_optional(page, Role::Address).await;
        let link = match page.current_url().await {
            Ok(url) => decode_link(&url),
            Err(e) => {
                tracing::warn!(listing = %name, error = %e, "could not read listing URL");
                String::new()
            }
        };

        let reviews = match &self.reviews {
            Some(engine) => Some(
                engine
                    .extract(page, &name, controls.max_reviews(), controls, reporter)
                    .await,
            ),
            None => None,
        };

        Ok(Some(ListingRecord {
            name,
            phone,
            address,
            link,
            latitude: String::new(),
            longitude: String::new(),
            reviews,
        }))
    }

    async fn read_phone<P: Page>(&self, page: &P, name: &str) -> String {
        let reveal = match page
            .wait_clickable(Role::PhoneReveal, self.optional_wait)
            .await
        {
            Ok(Some(reveal)) => reveal,
            Ok(None) => {
                tracing::debug!(listing = %name, "no phone reveal button");
                return String::new();
            }
            Err(e) => {
                tracing::debug!(listing = %name, error = %e, "phone reveal lookup failed");
                return String::new();
            }
        };

        let reveal = &reveal;
        let clicked = retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base_ms,
            move || page.click(reveal),
        )
        .await;
        if let Err(e) = clicked {
            tracing::warn!(listing = %name, error = %e, "could not reveal phone number");
            return String::new();
        }
        tokio::time::sleep(self.policy.settle).await;

        read_optional(page, Role::Phone).await
    }
}

/// Trimmed text of `role`, or empty when absent or unreadable.
async fn read_optional<P: Page>(page: &P, role: Role) -> String {
    match page.find_one(role).await {
        Ok(Some(el)) => page
            .read_text(&el)
            .await
            .map(|t| t.trim().to_string())
            .unwrap_or_default(),
        Ok(None) => String::new(),
        Err(e) => {
            tracing::debug!(%role, error = %e, "optional field lookup failed");
            String::new()
        }
    }
}
