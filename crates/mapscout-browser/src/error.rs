use chromiumoxide::error::CdpError;
use mapscout_scraper::{Role, ScraperError};

const DETACHED_MARKERS: [&str; 3] = [
    "no node with given id",
    "node is detached",
    "cannot find context with specified id",
];

const NOT_INTERACTABLE_MARKERS: [&str; 3] = [
    "could not compute box model",
    "node is not visible",
    "scrolling failed",
];

/// `true` when the protocol error only means the lookup matched nothing.
pub(crate) fn is_absent(err: &CdpError) -> bool {
    if matches!(err, CdpError::NotFound) {
        return true;
    }
    let message = err.to_string().to_lowercase();
    message.contains("could not find node") || message.contains("no search results")
}

/// Map a protocol error raised while acting on `role` to the engine's
/// error vocabulary.
pub(crate) fn classify(err: &CdpError, role: Option<Role>) -> ScraperError {
    let message = err.to_string();
    let lower = message.to_lowercase();

    if DETACHED_MARKERS.iter().any(|m| lower.contains(m)) {
        return ScraperError::Stale;
    }
    match (err, role) {
        (CdpError::Timeout, Some(role)) => ScraperError::Timeout { role },
        (CdpError::NotFound, Some(role)) => ScraperError::NotFound { role },
        (_, Some(role)) if NOT_INTERACTABLE_MARKERS.iter().any(|m| lower.contains(m)) => {
            ScraperError::NotInteractable { role }
        }
        _ => ScraperError::Script(message),
    }
}
