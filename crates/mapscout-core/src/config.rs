use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does not read `.env` files, so tests and
/// callers that manage their own environment get exactly what is set.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable is optional; defaults match [`AppConfig::default`]. The lookup
/// is injected so the parsing rules can be tested with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let defaults = AppConfig::default();

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: u32| -> Result<u32, ConfigError> {
        let raw = or_default(var, &default.to_string());
        raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        let raw = or_default(var, &default.to_string());
        raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: usize| -> Result<usize, ConfigError> {
        let raw = or_default(var, &default.to_string());
        match raw.parse::<usize>() {
            Ok(0) => Err(invalid(var, "must be greater than zero".to_string())),
            Ok(v) => Ok(v),
            Err(e) => Err(invalid(var, e.to_string())),
        }
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
            },
        }
    };

    let optional_path = |var: &str| -> Option<PathBuf> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    };

    let env = parse_environment(&or_default("MAPSCOUT_ENV", "development"))?;
    let log_level = or_default("MAPSCOUT_LOG_LEVEL", &defaults.log_level);

    let base_url = or_default("MAPSCOUT_BASE_URL", &defaults.base_url);
    if let Err(e) = url::Url::parse(&base_url) {
        return Err(invalid("MAPSCOUT_BASE_URL", e.to_string()));
    }
    let city = or_default("MAPSCOUT_CITY", &defaults.city);
    let allowed_host = or_default("MAPSCOUT_ALLOWED_HOST", &defaults.allowed_host);
    let output_dir = optional_path("MAPSCOUT_OUTPUT_DIR").unwrap_or(defaults.output_dir);

    let headless = parse_bool("MAPSCOUT_HEADLESS", defaults.headless)?;
    let chrome_path = optional_path("MAPSCOUT_CHROME_PATH");
    let window_width = parse_u32("MAPSCOUT_WINDOW_WIDTH", defaults.window_width)?;
    let window_height = parse_u32("MAPSCOUT_WINDOW_HEIGHT", defaults.window_height)?;
    let locator_map_path = optional_path("MAPSCOUT_LOCATOR_MAP_PATH");

    let click_timeout_secs = parse_u64("MAPSCOUT_CLICK_TIMEOUT_SECS", defaults.click_timeout_secs)?;
    let optional_wait_secs = parse_u64("MAPSCOUT_OPTIONAL_WAIT_SECS", defaults.optional_wait_secs)?;
    let max_retries = parse_u32("MAPSCOUT_MAX_RETRIES", defaults.max_retries)?;
    let retry_backoff_base_ms = parse_u64(
        "MAPSCOUT_RETRY_BACKOFF_BASE_MS",
        defaults.retry_backoff_base_ms,
    )?;
    let settle_ms = parse_u64("MAPSCOUT_SETTLE_MS", defaults.settle_ms)?;

    let review_scan_window =
        parse_positive_usize("MAPSCOUT_REVIEW_SCAN_WINDOW", defaults.review_scan_window)?;
    let review_max_load_attempts = parse_u32(
        "MAPSCOUT_REVIEW_MAX_LOAD_ATTEMPTS",
        defaults.review_max_load_attempts,
    )?;
    if review_max_load_attempts == 0 {
        return Err(invalid(
            "MAPSCOUT_REVIEW_MAX_LOAD_ATTEMPTS",
            "must be greater than zero".to_string(),
        ));
    }
    let max_result_pages =
        parse_positive_usize("MAPSCOUT_MAX_RESULT_PAGES", defaults.max_result_pages)?;
    let housekeeping_interval = parse_positive_usize(
        "MAPSCOUT_HOUSEKEEPING_INTERVAL",
        defaults.housekeeping_interval,
    )?;

    Ok(AppConfig {
        env,
        log_level,
        base_url,
        city,
        allowed_host,
        output_dir,
        headless,
        chrome_path,
        window_width,
        window_height,
        locator_map_path,
        click_timeout_secs,
        optional_wait_secs,
        max_retries,
        retry_backoff_base_ms,
        settle_ms,
        review_scan_window,
        review_max_load_attempts,
        max_result_pages,
        housekeeping_interval,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MAPSCOUT_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
