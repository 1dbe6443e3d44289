pub mod app_config;
pub mod config;
pub mod error;
pub mod locators;
pub mod params;
pub mod records;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, RunParamsError};
pub use locators::{load_locator_map, Locator, LocatorKind, LocatorMap};
pub use params::RunParams;
pub use records::{
    ListingRecord, ParseStarRatingError, RatingSummary, ReviewRecord, StarRating, MAX_STARS,
};
