use crate::RunParamsError;

/// What a single run should scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub search_query: Option<String>,
    pub direct_url: Option<String>,
    pub scrape_reviews: bool,
    pub max_reviews: usize,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            search_query: None,
            direct_url: None,
            scrape_reviews: false,
            max_reviews: 10,
        }
    }
}

impl RunParams {
    /// Normalize and check the parameters before a run.
    ///
    /// Blank strings become `None`. A direct URL must carry a scheme and a host
    /// whose name contains `allowed_host`.
    ///
    /// # Errors
    ///
    /// Returns `RunParamsError` describing the first rejected field.
    pub fn validate(self, allowed_host: &str) -> Result<Self, RunParamsError> {
        let search_query = non_blank(self.search_query);
        let direct_url = non_blank(self.direct_url);

        if search_query.is_none() && direct_url.is_none() {
            return Err(RunParamsError::MissingTarget);
        }

        if let Some(raw) = &direct_url {
            check_direct_url(raw, allowed_host)?;
        }

        if self.scrape_reviews && self.max_reviews < 1 {
            return Err(RunParamsError::MaxReviewsTooSmall);
        }

        Ok(Self {
            search_query,
            direct_url,
            ..self
        })
    }

    /// File-name stem for export artifacts.
    ///
    /// Derived from the query when present, otherwise from the last path
    /// segment of the direct URL; `"listing"` when neither yields anything.
    #[must_use]
    pub fn export_slug(&self) -> String {
        let from_query = self.search_query.as_deref().map(slugify);
        let from_url = || {
            self.direct_url
                .as_deref()
                .and_then(|raw| url::Url::parse(raw).ok())
                .and_then(|url| {
                    url.path_segments()
                        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
                })
                .map(|segment| {
                    let decoded = percent_decode(&segment);
                    slugify(&decoded)
                })
        };

        from_query
            .filter(|s| !s.is_empty())
            .or_else(|| from_url().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "listing".to_string())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_direct_url(raw: &str, allowed_host: &str) -> Result<(), RunParamsError> {
    let invalid = |reason: &str| RunParamsError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = url::Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
    if !host.contains(allowed_host) {
        return Err(invalid(&format!("host must contain \"{allowed_host}\"")));
    }
    Ok(())
}

fn percent_decode(segment: &str) -> String {
    percent_encoding::percent_decode_str(segment)
        .decode_utf8_lossy()
        .into_owned()
}

/// Lower-case, keep alphanumerics, collapse everything else into single dashes.
fn slugify(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
