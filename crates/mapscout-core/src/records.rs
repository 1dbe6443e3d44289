//! Records produced by the extraction engines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Highest star count a review can carry.
pub const MAX_STARS: u8 = 5;

/// Normalized star rating of one review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StarRating {
    Stars(u8),
    Unknown,
}

impl StarRating {
    /// Clamp a raw marker count into the valid range.
    #[must_use]
    pub fn from_count(count: usize) -> Self {
        let capped = count.min(usize::from(MAX_STARS));
        // capped <= MAX_STARS, so the conversion cannot fail
        Self::Stars(u8::try_from(capped).unwrap_or(MAX_STARS))
    }
}

impl fmt::Display for StarRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stars(n) => write!(f, "{n} stars"),
            Self::Unknown => f.write_str("Unknown rating"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized star rating: \"{0}\"")]
pub struct ParseStarRatingError(String);

impl FromStr for StarRating {
    type Err = ParseStarRatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("unknown rating") {
            return Ok(Self::Unknown);
        }
        trimmed
            .strip_suffix("stars")
            .or_else(|| trimmed.strip_suffix("star"))
            .and_then(|n| n.trim().parse::<usize>().ok())
            .map(Self::from_count)
            .ok_or_else(|| ParseStarRatingError(s.to_string()))
    }
}

impl Serialize for StarRating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StarRating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Listing-wide rating block shown above the reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub overall_rating: String,
    pub total_ratings: String,
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self {
            overall_rating: "0".to_string(),
            total_ratings: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub reviewer_name: String,
    pub rating: StarRating,
    pub text: String,
    pub likes: String,
    pub ordinal: usize,
    /// Present only on the first record of a listing.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RatingSummary>,
}

/// One business as written to the first export sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingRecord {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub link: String,
    pub latitude: String,
    pub longitude: String,
    pub reviews: Option<Vec<ReviewRecord>>,
}

impl ListingRecord {
    /// Serialized review slot: a JSON array, or empty when nothing was collected.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn reviews_blob(&self) -> Result<String, serde_json::Error> {
        match &self.reviews {
            Some(reviews) if !reviews.is_empty() => serde_json::to_string(reviews),
            _ => Ok(String::new()),
        }
    }
}
