use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::{Browser, BrowserConfig, Handler};
use futures::StreamExt;
use mapscout_core::{AppConfig, LocatorMap};
use mapscout_scraper::{Launcher, ScraperError};
use tokio::task::JoinHandle;

use crate::page::ChromiumPage;
use crate::scripts::{BLOCKED_URLS, LAUNCH_ARGS};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser process settings taken from [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub poll_interval: Duration,
}

impl LaunchSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            headless: config.headless,
            chrome_path: config.chrome_path.clone(),
            window_width: config.window_width,
            window_height: config.window_height,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.window_width, self.window_height)
            .no_sandbox();
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        for arg in LAUNCH_ARGS {
            builder = builder.arg(arg);
        }
        builder.build().map_err(ScraperError::Launch)
    }
}

/// Starts one Chromium process per run.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    settings: LaunchSettings,
    locators: Arc<LocatorMap>,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(settings: LaunchSettings, locators: LocatorMap) -> Self {
        Self {
            settings,
            locators: Arc::new(locators),
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig, locators: LocatorMap) -> Self {
        Self::new(LaunchSettings::from_config(config), locators)
    }

    #[must_use]
    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::warn!(error = %e, "browser handler event error");
            }
        }
        tracing::debug!("browser handler finished");
    })
}

#[async_trait]
impl Launcher for ChromiumLauncher {
    type Handle = ChromiumPage;

    async fn launch(&self) -> Result<ChromiumPage, ScraperError> {
        let config = self.settings.browser_config()?;
        let (mut browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::Launch(e.to_string()))?;
        let handler = spawn_handler(handler);

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(ScraperError::Launch(format!("could not open a tab: {e}")));
            }
        };

        let blocked: Vec<String> = BLOCKED_URLS.iter().map(ToString::to_string).collect();
        if let Err(e) = page.execute(EnableParams::default()).await {
            tracing::warn!(error = %e, "could not enable network domain");
        } else if let Err(e) = page.execute(SetBlockedUrLsParams::new(blocked)).await {
            tracing::warn!(error = %e, "could not install request blocking");
        }

        tracing::info!(
            headless = self.settings.headless,
            width = self.settings.window_width,
            height = self.settings.window_height,
            "browser launched"
        );

        Ok(ChromiumPage::new(
            browser,
            page,
            handler,
            Arc::clone(&self.locators),
            self.settings.poll_interval,
        ))
    }
}
