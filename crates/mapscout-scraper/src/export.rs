//! Tabular export of a finished run.
//!
//! Two CSV sheets are written side by side:
//!
//! - `{slug}_{timestamp}.csv`: one row per business.
//! - `{slug}_{timestamp}_reviews.csv`: one row per review, written only
//!   when at least one review was collected.

use std::path::{Path, PathBuf};

use mapscout_core::ReviewRecord;
use serde::Serialize;

use crate::error::ExportError;
use crate::session::store::{ColumnStore, REVIEWS_COLUMN};

/// Timestamp format used in export file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Serialize)]
struct ReviewRow<'a> {
    business_name: &'a str,
    reviewer_name: &'a str,
    rating: String,
    text: &'a str,
    likes: &'a str,
    overall_rating: &'a str,
    total_ratings: &'a str,
}

/// Current local time formatted for export file names.
#[must_use]
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Write the collected store to `dir`.
///
/// The store is padded first so every business row has the same width.
/// Returns the business sheet's path, or `None` when nothing was collected.
///
/// # Errors
///
/// Returns `ExportError` if the directory or either file cannot be written.
pub fn export_sheets(
    store: &mut ColumnStore,
    dir: &Path,
    slug: &str,
    timestamp: &str,
) -> Result<Option<PathBuf>, ExportError> {
    if store.is_empty() {
        tracing::info!("nothing collected, skipping export");
        return Ok(None);
    }
    store.pad();

    std::fs::create_dir_all(dir).map_err(|e| ExportError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let businesses = dir.join(format!("{slug}_{timestamp}.csv"));
    write_businesses(store, &businesses)?;
    tracing::info!(path = %businesses.display(), rows = store.len(), "wrote business sheet");

    let reviews = dir.join(format!("{slug}_{timestamp}_reviews.csv"));
    let review_rows = write_reviews(store, &reviews)?;
    if review_rows > 0 {
        tracing::info!(path = %reviews.display(), rows = review_rows, "wrote review sheet");
    }

    Ok(Some(businesses))
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> ExportError + '_ {
    move |source| ExportError::Csv {
        path: path.display().to_string(),
        source,
    }
}

fn write_businesses(store: &ColumnStore, path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_error(path))?;
    writer
        .write_record(store.headers())
        .map_err(csv_error(path))?;
    for index in 0..store.len() {
        writer
            .write_record(store.row(index))
            .map_err(csv_error(path))?;
    }
    writer.flush().map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Returns the number of review rows written; the file is only created when
/// there is at least one.
fn write_reviews(store: &ColumnStore, path: &Path) -> Result<usize, ExportError> {
    let (Some(names), Some(blobs)) = (store.column("Name"), store.column(REVIEWS_COLUMN)) else {
        return Ok(0);
    };

    let mut parsed: Vec<(&str, Vec<ReviewRecord>)> = Vec::new();
    for (name, blob) in names.iter().zip(blobs) {
        if blob.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Vec<ReviewRecord>>(blob) {
            Ok(reviews) if !reviews.is_empty() => parsed.push((name.as_str(), reviews)),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(business = %name, error = %e, "skipping unreadable review data");
            }
        }
    }

    if parsed.is_empty() {
        return Ok(0);
    }

    let mut writer = csv::Writer::from_path(path).map_err(csv_error(path))?;
    let mut rows = 0usize;
    for (business_name, reviews) in &parsed {
        for review in reviews {
            let (overall_rating, total_ratings) = review
                .summary
                .as_ref()
                .map_or(("", ""), |s| (s.overall_rating.as_str(), s.total_ratings.as_str()));
            writer
                .serialize(ReviewRow {
                    business_name,
                    reviewer_name: &review.reviewer_name,
                    rating: review.rating.to_string(),
                    text: &review.text,
                    likes: &review.likes,
                    overall_rating,
                    total_ratings,
                })
                .map_err(csv_error(path))?;
            rows += 1;
        }
    }
    writer.flush().map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(rows)
}
