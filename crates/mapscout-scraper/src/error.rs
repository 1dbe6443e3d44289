use mapscout_core::RunParamsError;
use thiserror::Error;

use crate::page::Role;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("element not found: {role}")]
    NotFound { role: Role },

    #[error("element is not interactable: {role}")]
    NotInteractable { role: Role },

    #[error("element is no longer attached to the page")]
    Stale,

    #[error("timed out waiting for {role}")]
    Timeout { role: Role },

    #[error("page script failed: {0}")]
    Script(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    #[error("invalid run parameters: {0}")]
    InvalidParams(#[from] RunParamsError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl ScraperError {
    /// Returns `true` for conditions that may clear up on a second attempt.
    ///
    /// Absence, navigation and launch failures are final.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Stale | Self::Timeout { .. } | Self::NotInteractable { .. } | Self::Script(_)
        )
    }
}
