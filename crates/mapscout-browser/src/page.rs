//! Live-browser implementation of the element locator capability.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::log::ClearParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::layout::BoundingBox;
use chromiumoxide::{Browser, Element, Page as CdpPage};
use mapscout_core::{Locator, LocatorKind, LocatorMap};
use mapscout_scraper::{AutomationHandle, MarkerStrategy, Page, Role, ScraperError};
use tokio::task::JoinHandle;

use crate::error::{classify, is_absent};
use crate::scripts;

/// A resolved DOM node plus the role it was looked up for, if any.
#[derive(Clone)]
pub struct ChromiumElement {
    element: Arc<Element>,
    role: Option<Role>,
}

impl fmt::Debug for ChromiumElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromiumElement")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl ChromiumElement {
    fn new(element: Element, role: Option<Role>) -> Self {
        Self {
            element: Arc::new(element),
            role,
        }
    }

    async fn visible_box(&self) -> Option<BoundingBox> {
        match self.element.bounding_box().await {
            Ok(bb) if bb.width > 0.0 && bb.height > 0.0 => Some(bb),
            _ => None,
        }
    }
}

/// One browser tab driven for the length of a run.
pub struct ChromiumPage {
    browser: Browser,
    page: CdpPage,
    handler: JoinHandle<()>,
    locators: Arc<LocatorMap>,
    poll_interval: Duration,
}

impl ChromiumPage {
    pub(crate) fn new(
        browser: Browser,
        page: CdpPage,
        handler: JoinHandle<()>,
        locators: Arc<LocatorMap>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            browser,
            page,
            handler,
            locators,
            poll_interval,
        }
    }

    async fn find_first(&self, locator: &Locator) -> Result<Option<Element>, CdpError> {
        let found = match locator.kind {
            LocatorKind::Xpath => self.page.find_xpath(locator.path.as_str()).await,
            LocatorKind::Css => self.page.find_element(locator.path.as_str()).await,
        };
        match found {
            Ok(el) => Ok(Some(el)),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>, CdpError> {
        let found = match locator.kind {
            LocatorKind::Xpath => self.page.find_xpaths(locator.path.as_str()).await,
            LocatorKind::Css => self.page.find_elements(locator.path.as_str()).await,
        };
        match found {
            Err(e) if is_absent(&e) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn eval(&self, script: &str) -> Result<(), ScraperError> {
        self.page
            .evaluate(script)
            .await
            .map(|_| ())
            .map_err(|e| classify(&e, None))
    }
}

#[async_trait]
impl Page for ChromiumPage {
    type Element = ChromiumElement;

    async fn find_one(&self, role: Role) -> Result<Option<ChromiumElement>, ScraperError> {
        let locator = role.locate(&self.locators);
        self.find_first(&locator)
            .await
            .map(|found| found.map(|el| ChromiumElement::new(el, Some(role))))
            .map_err(|e| classify(&e, Some(role)))
    }

    async fn wait_clickable(
        &self,
        role: Role,
        timeout: Duration,
    ) -> Result<Option<ChromiumElement>, ScraperError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(el) = self.find_one(role).await? {
                if el.visible_box().await.is_some() {
                    return Ok(Some(el));
                }
            }
            if Instant::now() >= deadline {
                tracing::debug!(%role, ?timeout, "element never became clickable");
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn click(&self, element: &ChromiumElement) -> Result<(), ScraperError> {
        element
            .element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| classify(&e, element.role))
    }

    async fn read_text(&self, element: &ChromiumElement) -> Result<String, ScraperError> {
        element
            .element
            .inner_text()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| classify(&e, element.role))
    }

    async fn count_rating_markers(
        &self,
        container: &ChromiumElement,
        strategy: MarkerStrategy,
    ) -> Result<usize, ScraperError> {
        match strategy {
            MarkerStrategy::Glyphs => {
                match container
                    .element
                    .find_elements(self.locators.rating_glyph.as_str())
                    .await
                {
                    Ok(glyphs) => Ok(glyphs.len()),
                    Err(e) if is_absent(&e) => Ok(0),
                    Err(e) => Err(classify(&e, container.role)),
                }
            }
            MarkerStrategy::FilledMarkers => {
                let script = scripts::filled_marker_fn(
                    &self.locators.rating_filled_marker,
                    &self.locators.rating_fill_colors,
                );
                let returns = container
                    .element
                    .call_js_fn(script, false)
                    .await
                    .map_err(|e| classify(&e, container.role))?;
                let count = returns
                    .result
                    .value
                    .as_ref()
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(0);
                Ok(usize::try_from(count).unwrap_or(usize::MAX))
            }
        }
    }

    async fn find_below(
        &self,
        role: Role,
        anchor: &ChromiumElement,
        within_px: f64,
    ) -> Result<Option<ChromiumElement>, ScraperError> {
        let Some(anchor_box) = anchor.visible_box().await else {
            return Ok(None);
        };
        let anchor_bottom = anchor_box.y + anchor_box.height;

        let locator = role.locate(&self.locators);
        let candidates = self
            .find_all(&locator)
            .await
            .map_err(|e| classify(&e, Some(role)))?;
        for candidate in candidates {
            let candidate = ChromiumElement::new(candidate, Some(role));
            let Some(bb) = candidate.visible_box().await else {
                continue;
            };
            if bb.y > anchor_box.y && bb.y - anchor_bottom <= within_px {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn find_clickable_by_text(
        &self,
        needles: &[&str],
    ) -> Result<Option<ChromiumElement>, ScraperError> {
        let hit = self
            .page
            .evaluate(scripts::tag_text_hit(needles))
            .await
            .map_err(|e| classify(&e, None))?
            .into_value::<bool>()
            .unwrap_or(false);
        if !hit {
            return Ok(None);
        }
        let selector = scripts::text_hit_selector();
        match self.page.find_element(selector.as_str()).await {
            Ok(el) => Ok(Some(ChromiumElement::new(el, None))),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(classify(&e, None)),
        }
    }

    async fn scroll_into_view(&self, element: &ChromiumElement) -> Result<(), ScraperError> {
        element
            .element
            .scroll_into_view()
            .await
            .map(|_| ())
            .map_err(|e| classify(&e, element.role))
    }

    async fn scroll_to_bottom(&self) -> Result<(), ScraperError> {
        self.eval(scripts::SCROLL_TO_BOTTOM).await
    }

    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        tracing::debug!(%url, "navigating");
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| ScraperError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn go_back(&self) -> Result<(), ScraperError> {
        self.eval(scripts::GO_BACK).await
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        self.page
            .url()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| classify(&e, None))
    }
}

#[async_trait]
impl AutomationHandle for ChromiumPage {
    async fn housekeeping(&self) -> Result<(), ScraperError> {
        self.eval(scripts::GC_HINT).await?;
        self.page
            .execute(ClearParams::default())
            .await
            .map_err(|e| classify(&e, None))?;
        self.eval(scripts::CLEAR_STORAGE).await?;
        tracing::debug!("page housekeeping done");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ScraperError> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "browser process wait failed");
        }
        self.handler.abort();
        closed
            .map(|_| ())
            .map_err(|e| ScraperError::Script(format!("browser close failed: {e}")))
    }
}
