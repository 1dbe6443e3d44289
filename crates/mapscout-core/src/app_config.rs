use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Site root used to build search URLs, e.g. `"https://2gis.ru"`.
    pub base_url: String,
    /// City path segment inserted between the site root and `/search/`.
    pub city: String,
    /// Substring a direct URL's host must contain to be accepted.
    pub allowed_host: String,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub locator_map_path: Option<PathBuf>,
    pub click_timeout_secs: u64,
    pub optional_wait_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Pause after clicks that trigger page updates.
    pub settle_ms: u64,
    pub review_scan_window: usize,
    pub review_max_load_attempts: u32,
    pub max_result_pages: usize,
    pub housekeeping_interval: usize,
}

impl AppConfig {
    #[must_use]
    pub fn click_timeout(&self) -> Duration {
        Duration::from_secs(self.click_timeout_secs)
    }

    #[must_use]
    pub fn optional_wait(&self) -> Duration {
        Duration::from_secs(self.optional_wait_secs)
    }

    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Builds the search results URL for `query` in the configured city.
    ///
    /// The query is percent-encoded as a single path segment.
    #[must_use]
    pub fn search_url(&self, query: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        match url::Url::parse(base) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments
                        .pop_if_empty()
                        .push(&self.city)
                        .push("search")
                        .push(query);
                }
                url.to_string()
            }
            Err(_) => format!("{base}/{}/search/{query}", self.city),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: Environment::Development,
            log_level: "info".to_string(),
            base_url: "https://2gis.ru".to_string(),
            city: "almaty".to_string(),
            allowed_host: "2gis".to_string(),
            output_dir: PathBuf::from("./output"),
            headless: true,
            chrome_path: None,
            window_width: 1200,
            window_height: 800,
            locator_map_path: None,
            click_timeout_secs: 10,
            optional_wait_secs: 5,
            max_retries: 3,
            retry_backoff_base_ms: 1_000,
            settle_ms: 1_000,
            review_scan_window: 30,
            review_max_load_attempts: 15,
            max_result_pages: 5,
            housekeeping_interval: 3,
        }
    }
}
