pub mod controls;
pub mod error;
pub mod events;
pub mod export;
pub mod listing;
pub mod page;
pub mod retry;
pub mod reviews;
pub mod session;
pub mod text;

#[cfg(test)]
pub(crate) mod test_support;

pub use controls::Controls;
pub use error::{ExportError, ScraperError};
pub use events::{LogLevel, Reporter, RunEvent};
pub use export::export_sheets;
pub use listing::ListingExtractor;
pub use page::{AutomationHandle, Launcher, MarkerStrategy, Page, Role};
pub use reviews::{ReviewExtractor, ReviewPolicy, RevealOutcome};
pub use session::store::ColumnStore;
pub use session::{Session, SessionState};
