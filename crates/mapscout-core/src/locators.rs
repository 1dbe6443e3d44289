//! Role → page-address strategy.
//!
//! The extraction engines ask for elements by semantic role; this map is the
//! only place that knows how a role is addressed on the live site. Defaults
//! describe the current 2GIS layout and any subset can be overridden from a
//! YAML file without recompiling.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const COMMON_PREFIX: &str = "/html/body/div[2]/div/div/div[1]/div[1]/div[3]/div[2]/div/div/div/div/div[2]/div[2]/div/div[1]/div/div/div/div/div[2]";
const TITLE_PREFIX: &str = "/html/body/div[2]/div/div/div[1]/div[1]/div[3]/div[2]/div/div/div/div/div[2]/div[2]/div/div[1]/div/div/div/div/div[1]";
const RESULTS_BLOCK: &str = "/html/body/div[2]/div/div/div[1]/div[1]/div[3]/div/div/div[2]/div/div/div/div[2]/div[2]/div[1]/div/div/div/div[2]/div";

/// Placeholder substituted with a 1-based ordinal in ordinal roles.
pub const INDEX_PLACEHOLDER: &str = "{index}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    Xpath,
    Css,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub kind: LocatorKind,
    pub path: String,
}

impl Locator {
    #[must_use]
    pub fn xpath(path: impl Into<String>) -> Self {
        Self {
            kind: LocatorKind::Xpath,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn css(path: impl Into<String>) -> Self {
        Self {
            kind: LocatorKind::Css,
            path: path.into(),
        }
    }

    /// Returns a copy with every `{index}` placeholder replaced by `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Self {
        Self {
            kind: self.kind,
            path: self.path.replace(INDEX_PLACEHOLDER, &index.to_string()),
        }
    }

    #[must_use]
    pub fn is_ordinal(&self) -> bool {
        self.path.contains(INDEX_PLACEHOLDER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocatorMap {
    pub cookie_banner: Locator,
    pub title: Locator,
    pub phone_reveal: Locator,
    pub phone: Locator,
    pub address: Locator,
    pub next_page: Locator,
    /// Clickable entry of the n-th search result.
    pub result_item: Locator,
    pub reviews_entry: Locator,
    pub overall_rating: Locator,
    pub total_rating_count: Locator,
    pub reviewer_name: Locator,
    pub star_container: Locator,
    pub review_text: Locator,
    pub review_likes: Locator,
    pub load_more: Locator,
    /// "Read more" affordance rendered under a truncated review.
    pub expand_text: Locator,
    /// CSS selector for one rating glyph inside a star container.
    pub rating_glyph: String,
    /// CSS selector for vector markers inspected by the fallback count.
    pub rating_filled_marker: String,
    /// Fill-color fragments that mark a vector marker as filled.
    pub rating_fill_colors: Vec<String>,
}

impl Default for LocatorMap {
    fn default() -> Self {
        Self {
            cookie_banner: Locator::xpath("/html/body/div[2]/div/div/div[3]/div[1]/div[3]"),
            title: Locator::xpath(format!("{TITLE_PREFIX}/h1/span[1]")),
            phone_reveal: Locator::xpath(format!(
                "{COMMON_PREFIX}/div[2]/div[1]/div/div/div[3]/div[2]/div/button"
            )),
            phone: Locator::xpath(format!(
                "{COMMON_PREFIX}/div[2]/div[1]/div/div/div[3]/div[2]/div/a/bdo"
            )),
            address: Locator::xpath(
                "/html/body/div[2]/div/div/div[1]/div[1]/div[2]/div[2]/div/div/div/div/div[2]/div[2]/div/div[1]/div/div/div/div/div[2]/div[2]/div[1]/div/div/div[1]/div[2]/div/div[2]/div[1]",
            ),
            next_page: Locator::xpath(
                "/html/body/div[2]/div/div/div[1]/div[1]/div[3]/div[1]/div/div[2]/div/div/div/div[2]/div[2]/div[1]/div/div/div/div[3]/div[2]/div[2]",
            ),
            result_item: Locator::xpath(format!("{RESULTS_BLOCK}/div[{{index}}]/div/div[2]/a")),
            reviews_entry: Locator::xpath(format!(
                "{COMMON_PREFIX}/div[1]/div[2]/div/div/div[1]/div[3]/h2/a"
            )),
            overall_rating: Locator::xpath(format!("{COMMON_PREFIX}/div[2]/div[2]/div[1]/div[1]")),
            total_rating_count: Locator::xpath(format!(
                "{COMMON_PREFIX}/div[2]/div[2]/div[1]/div[2]"
            )),
            reviewer_name: Locator::xpath(format!(
                "{COMMON_PREFIX}/div[2]/div[{{index}}]/div[1]/div/div[1]/div[2]/span/span[1]/span"
            )),
            star_container: Locator::xpath(format!(
                "{COMMON_PREFIX}/div[2]/div[{{index}}]/div[1]/div/div[2]/div/div[1]"
            )),
            review_text: Locator::xpath(format!("{COMMON_PREFIX}/div[2]/div[{{index}}]/div[4]/div[1]/a")),
            review_likes: Locator::xpath(format!(
                "{COMMON_PREFIX}/div[2]/div[{{index}}]/div[4]/div[2]/div/div[1]/button/div[3]"
            )),
            load_more: Locator::css("button[class*='_kuel4no']"),
            expand_text: Locator::css("span[class*='_17ww69i']"),
            rating_glyph: "span".to_string(),
            rating_filled_marker: "svg path".to_string(),
            rating_fill_colors: vec!["#ffb".to_string(), "gold".to_string()],
        }
    }
}

impl LocatorMap {
    fn ordinal_roles(&self) -> [(&'static str, &Locator); 5] {
        [
            ("result_item", &self.result_item),
            ("reviewer_name", &self.reviewer_name),
            ("star_container", &self.star_container),
            ("review_text", &self.review_text),
            ("review_likes", &self.review_likes),
        ]
    }

    fn fixed_roles(&self) -> [(&'static str, &Locator); 11] {
        [
            ("cookie_banner", &self.cookie_banner),
            ("title", &self.title),
            ("phone_reveal", &self.phone_reveal),
            ("phone", &self.phone),
            ("address", &self.address),
            ("next_page", &self.next_page),
            ("reviews_entry", &self.reviews_entry),
            ("overall_rating", &self.overall_rating),
            ("total_rating_count", &self.total_rating_count),
            ("load_more", &self.load_more),
            ("expand_text", &self.expand_text),
        ]
    }
}

/// Load a locator map from a YAML file. Roles missing from the file keep
/// their built-in defaults.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_locator_map(path: &Path) -> Result<LocatorMap, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LocatorFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_locator_map(&content)
}

/// Parse and validate locator YAML held in memory.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML or failed validation.
pub fn parse_locator_map(content: &str) -> Result<LocatorMap, ConfigError> {
    let map: LocatorMap = serde_yaml::from_str(content)?;
    validate_locator_map(&map)?;
    Ok(map)
}

fn validate_locator_map(map: &LocatorMap) -> Result<(), ConfigError> {
    for (role, locator) in map.fixed_roles().into_iter().chain(map.ordinal_roles()) {
        if locator.path.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "locator for '{role}' must be non-empty"
            )));
        }
    }

    for (role, locator) in map.ordinal_roles() {
        if !locator.is_ordinal() {
            return Err(ConfigError::Validation(format!(
                "locator for '{role}' must contain the {INDEX_PLACEHOLDER} placeholder"
            )));
        }
    }

    if map.rating_glyph.trim().is_empty() || map.rating_filled_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "rating marker selectors must be non-empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_is_valid() {
        validate_locator_map(&LocatorMap::default()).expect("defaults must validate");
    }

    #[test]
    fn at_substitutes_every_placeholder() {
        let loc = Locator::xpath("//div[{index}]/span[{index}]");
        assert_eq!(loc.at(7).path, "//div[7]/span[7]");
        assert!(!loc.at(7).is_ordinal());
    }

    #[test]
    fn default_reviewer_name_expands_ordinal() {
        let map = LocatorMap::default();
        let path = map.reviewer_name.at(12).path;
        assert!(path.contains("/div[2]/div[12]/div[1]"), "got {path}");
    }

    #[test]
    fn yaml_overrides_only_named_roles() {
        let yaml = r##"
load_more:
  kind: css
  path: "button.more"
rating_fill_colors: ["#f5a623"]
"##;
        let map = parse_locator_map(yaml).expect("valid yaml");
        assert_eq!(map.load_more, Locator::css("button.more"));
        assert_eq!(map.rating_fill_colors, vec!["#f5a623".to_string()]);
        assert_eq!(map.title, LocatorMap::default().title);
    }

    #[test]
    fn default_fill_colors_skip_white_and_grey_markers() {
        let colors = LocatorMap::default().rating_fill_colors;
        let matches = |fill: &str| colors.iter().any(|c| fill.contains(&c.to_lowercase()));
        assert!(matches("#ffb81c"));
        assert!(matches("gold"));
        assert!(!matches("#ffffff"));
        assert!(!matches("#e6e6e6"));
        assert!(!matches("#ff0000"));
    }

    #[test]
    fn ordinal_role_without_placeholder_is_rejected() {
        let yaml = r#"
review_text:
  kind: xpath
  path: "//div[3]/a"
"#;
        let err = parse_locator_map(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("review_text")));
    }

    #[test]
    fn empty_path_is_rejected() {
        let yaml = r#"
title:
  kind: xpath
  path: "  "
"#;
        assert!(matches!(
            parse_locator_map(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn unknown_role_is_a_parse_error() {
        let err = parse_locator_map("favourite_colour:\n  kind: css\n  path: b\n").unwrap_err();
        assert!(matches!(err, ConfigError::LocatorFileParse(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locators.yaml");
        std::fs::write(&path, "phone:\n  kind: css\n  path: \"a[href^='tel:']\"\n").unwrap();
        let map = load_locator_map(&path).unwrap();
        assert_eq!(map.phone, Locator::css("a[href^='tel:']"));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = load_locator_map(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(
            matches!(err, ConfigError::LocatorFileIo { ref path, .. } if path.contains("not/here"))
        );
    }
}
