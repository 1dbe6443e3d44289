use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read locator map {path}: {source}")]
    LocatorFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse locator map: {0}")]
    LocatorFileParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Rejections produced while validating the parameters of a single run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunParamsError {
    #[error("either a search query or a direct URL is required")]
    MissingTarget,

    #[error("invalid direct URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("maximum reviews must be at least 1")]
    MaxReviewsTooSmall,
}
