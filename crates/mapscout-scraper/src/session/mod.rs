//! Run controller: owns one automation handle per run and walks either a
//! single business card or the search results, feeding the column store.

pub mod store;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mapscout_core::{AppConfig, ListingRecord, RunParams};

use crate::controls::Controls;
use crate::error::ScraperError;
use crate::events::Reporter;
use crate::export::{export_sheets, timestamp_now};
use crate::listing::ListingExtractor;
use crate::page::{AutomationHandle, Launcher, Page, Role};
use crate::retry::retry_with_backoff;
use crate::reviews::ReviewPolicy;

use self::store::ColumnStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
}

pub struct Session<L: Launcher> {
    launcher: L,
    config: AppConfig,
    policy: ReviewPolicy,
    controls: Arc<Controls>,
    reporter: Reporter,
    state: Mutex<SessionState>,
    store: Mutex<ColumnStore>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<L: Launcher> Session<L> {
    #[must_use]
    pub fn new(launcher: L, config: AppConfig, reporter: Reporter) -> Self {
        let policy = ReviewPolicy::from_config(&config);
        Self {
            launcher,
            config,
            policy,
            controls: Arc::new(Controls::default()),
            reporter,
            state: Mutex::new(SessionState::Idle),
            store: Mutex::new(ColumnStore::default()),
        }
    }

    #[must_use]
    pub fn controls(&self) -> Arc<Controls> {
        Arc::clone(&self.controls)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    /// Number of listings collected by the current or last run.
    #[must_use]
    pub fn collected(&self) -> usize {
        lock(&self.store).len()
    }

    /// Request a graceful stop. Returns `false` when no run is active.
    pub fn stop(&self) -> bool {
        let mut state = lock(&self.state);
        if *state != SessionState::Running {
            return false;
        }
        *state = SessionState::Stopping;
        drop(state);

        self.controls.stop();
        self.reporter.warn("Stop requested, finishing the current item");
        self.reporter.status("Stopping");
        true
    }

    /// Execute one run and export whatever it collected.
    ///
    /// A second call while a run is active is ignored with a warning.
    /// Whatever happens, the handle is shut down, the state returns to
    /// `Idle` and a `Finished` event is emitted.
    ///
    /// # Errors
    ///
    /// Returns `ScraperError` for run-level failures: invalid parameters,
    /// browser launch, initial navigation, or export.
    pub async fn start(&self, params: RunParams) -> Result<Option<PathBuf>, ScraperError> {
        {
            let mut state = lock(&self.state);
            if *state != SessionState::Idle {
                self.reporter.warn("A run is already in progress");
                return Ok(None);
            }
            // Re-armed under the state lock so a stop issued once the state
            // reads Running is never undone.
            self.controls.reset(params.max_reviews);
            *state = SessionState::Running;
        }

        let (output, result) = self.run(params).await;
        if let Err(e) = &result {
            self.reporter.error(format!("Run failed: {e}"));
        }

        *lock(&self.state) = SessionState::Idle;
        self.reporter.status("Ready");
        self.reporter.finished(output.clone());

        result.map(|()| output)
    }

    async fn run(&self, params: RunParams) -> (Option<PathBuf>, Result<(), ScraperError>) {
        let params = match params.validate(&self.config.allowed_host) {
            Ok(params) => params,
            Err(e) => return (None, Err(e.into())),
        };

        *lock(&self.store) = ColumnStore::new(params.scrape_reviews);
        self.reporter.status("Running");

        let mut handle = match self.launcher.launch().await {
            Ok(handle) => handle,
            Err(e) => return (None, Err(e)),
        };

        let driven = self.drive(&handle, &params).await;

        if let Err(e) = handle.housekeeping().await {
            tracing::warn!(error = %e, "final housekeeping failed");
        }
        let exported = self.export(&params);
        if let Err(e) = handle.shutdown().await {
            tracing::warn!(error = %e, "browser shutdown failed");
        }

        match exported {
            Ok(output) => (output, driven),
            Err(e) => {
                if let Err(run_err) = &driven {
                    self.reporter.error(format!("Run failed: {run_err}"));
                }
                (None, Err(e))
            }
        }
    }

    async fn drive<H: AutomationHandle>(
        &self,
        handle: &H,
        params: &RunParams,
    ) -> Result<(), ScraperError> {
        let url = match (&params.direct_url, &params.search_query) {
            (Some(url), _) => url.clone(),
            (None, Some(query)) => self.config.search_url(query),
            (None, None) => return Ok(()),
        };

        self.reporter.info(format!("Opening {url}"));
        let target = url.as_str();
        retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base_ms,
            move || handle.navigate(target),
        )
        .await?;
        tokio::time::sleep(self.policy.settle).await;
        self.accept_cookies(handle).await;

        let extractor = ListingExtractor::new(
            self.policy.clone(),
            self.config.optional_wait(),
            params.scrape_reviews,
        );
        let mut processed = 0usize;

        if params.direct_url.is_some() {
            match extractor.extract(handle, &self.controls, &self.reporter).await {
                Ok(Some(record)) => {
                    self.record(handle, &record, &mut processed).await;
                    return Ok(());
                }
                Ok(None) => self
                    .reporter
                    .info("Link is not a business card, reading it as search results"),
                Err(e) => self.reporter.warn(format!(
                    "Could not read the linked business ({e}), reading it as search results"
                )),
            }
        }

        self.walk_results(handle, &extractor, &mut processed).await;
        Ok(())
    }

    async fn walk_results<H: AutomationHandle>(
        &self,
        handle: &H,
        extractor: &ListingExtractor,
        processed: &mut usize,
    ) {
        for page_number in 1..=self.config.max_result_pages {
            self.reporter
                .info(format!("Processing results page {page_number}"));

            for ordinal in 1..=self.policy.scan_window {
                if self.controls.is_stopped() {
                    self.reporter.warn("Stopped by user");
                    return;
                }
                let item = match handle.find_one(Role::ResultItem(ordinal)).await {
                    Ok(Some(item)) => item,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::debug!(ordinal, error = %e, "result item lookup failed");
                        continue;
                    }
                };

                match self.open_result(handle, extractor, &item).await {
                    Ok(Some(record)) => self.record(handle, &record, processed).await,
                    Ok(None) => self
                        .reporter
                        .debug(format!("Result #{ordinal} is not a business card")),
                    Err(e) => self
                        .reporter
                        .error(format!("Failed to process result #{ordinal}: {e}")),
                }
            }

            if self.controls.is_stopped() {
                self.reporter.warn("Stopped by user");
                return;
            }
            if page_number == self.config.max_result_pages || !self.next_results_page(handle).await
            {
                break;
            }
        }
    }

    /// Click a result, extract it, and return to the results list.
    async fn open_result<H: AutomationHandle>(
        &self,
        handle: &H,
        extractor: &ListingExtractor,
        item: &H::Element,
    ) -> Result<Option<ListingRecord>, ScraperError> {
        retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base_ms,
            move || handle.click(item),
        )
        .await?;
        tokio::time::sleep(self.policy.settle).await;

        let extracted = extractor
            .extract(handle, &self.controls, &self.reporter)
            .await;

        let back = retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base_ms,
            move || handle.go_back(),
        )
        .await;
        tokio::time::sleep(self.policy.settle).await;
        if let Err(e) = back {
            self.reporter
                .warn(format!("Could not return to the results list: {e}"));
        }

        extracted
    }

    async fn next_results_page<H: AutomationHandle>(&self, handle: &H) -> bool {
        if let Err(e) = handle.scroll_to_bottom().await {
            tracing::debug!(error = %e, "scroll before pagination failed");
        }
        let next = match handle
            .wait_clickable(Role::NextPage, self.config.optional_wait())
            .await
        {
            Ok(Some(next)) => next,
            Ok(None) => {
                self.reporter.info("No more result pages");
                return false;
            }
            Err(e) => {
                self.reporter.warn(format!("Next page lookup failed: {e}"));
                return false;
            }
        };

        let next = &next;
        let clicked = retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base_ms,
            move || handle.click(next),
        )
        .await;
        match clicked {
            Ok(()) => {
                tokio::time::sleep(self.policy.settle).await;
                true
            }
            Err(e) => {
                self.reporter.warn(format!("Could not open the next results page: {e}"));
                false
            }
        }
    }

    async fn accept_cookies<H: AutomationHandle>(&self, handle: &H) {
        let banner = match handle.find_one(Role::CookieBanner).await {
            Ok(Some(banner)) => banner,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(error = %e, "cookie banner lookup failed");
                return;
            }
        };
        let banner = &banner;
        let clicked = retry_with_backoff(
            self.policy.max_retries,
            self.policy.retry_backoff_base_ms,
            move || handle.click(banner),
        )
        .await;
        match clicked {
            Ok(()) => self.reporter.debug("Cookie banner accepted"),
            Err(e) => tracing::debug!(error = %e, "cookie banner click failed"),
        }
    }

    async fn record<H: AutomationHandle>(
        &self,
        handle: &H,
        record: &ListingRecord,
        processed: &mut usize,
    ) {
        lock(&self.store).push(record);
        *processed += 1;
        self.reporter
            .info(format!("Saved {} ({processed} so far)", record.name));

        if *processed % self.config.housekeeping_interval == 0 {
            if let Err(e) = handle.housekeeping().await {
                self.reporter.warn(format!("Page housekeeping failed: {e}"));
            }
        }
    }

    fn export(&self, params: &RunParams) -> Result<Option<PathBuf>, ScraperError> {
        let mut store = lock(&self.store);
        let output = export_sheets(
            &mut store,
            &self.config.output_dir,
            &params.export_slug(),
            &timestamp_now(),
        )?;
        match &output {
            Some(path) => self.reporter.info(format!(
                "Saved {} businesses to {}",
                store.len(),
                path.display()
            )),
            None => self.reporter.warn("Nothing was collected, no file written"),
        }
        Ok(output)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
