use mapscout_core::ListingRecord;

pub const BASE_COLUMNS: [&str; 6] = ["Name", "Phone", "Address", "Link", "Latitude", "Longitude"];
pub const REVIEWS_COLUMN: &str = "Reviews";

/// Column-oriented accumulator of processed listings, one cell per listing
/// in every column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnStore {
    columns: Vec<(String, Vec<String>)>,
}

impl ColumnStore {
    #[must_use]
    pub fn new(with_reviews: bool) -> Self {
        let mut columns: Vec<(String, Vec<String>)> = BASE_COLUMNS
            .iter()
            .map(|name| ((*name).to_string(), Vec::new()))
            .collect();
        if with_reviews {
            columns.push((REVIEWS_COLUMN.to_string(), Vec::new()));
        }
        Self { columns }
    }

    pub fn push(&mut self, listing: &ListingRecord) {
        self.push_cell("Name", listing.name.clone());
        self.push_cell("Phone", listing.phone.clone());
        self.push_cell("Address", listing.address.clone());
        self.push_cell("Link", listing.link.clone());
        self.push_cell("Latitude", listing.latitude.clone());
        self.push_cell("Longitude", listing.longitude.clone());
        if self.has_reviews() {
            let blob = listing.reviews_blob().unwrap_or_else(|e| {
                tracing::warn!(listing = %listing.name, error = %e, "could not serialize reviews");
                String::new()
            });
            self.push_cell(REVIEWS_COLUMN, blob);
        }
    }

    /// Append one cell. Unknown columns are ignored.
    pub fn push_cell(&mut self, column: &str, value: String) {
        if let Some((_, cells)) = self.columns.iter_mut().find(|(name, _)| name == column) {
            cells.push(value);
        }
    }

    /// Bring every column to the longest column's length with empty cells.
    pub fn pad(&mut self) {
        let len = self.len();
        for (_, cells) in &mut self.columns {
            cells.resize(len, String::new());
        }
    }

    /// Number of rows, i.e. the longest column's length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns
            .iter()
            .map(|(_, cells)| cells.len())
            .max()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn has_reviews(&self) -> bool {
        self.column(REVIEWS_COLUMN).is_some()
    }

    #[must_use]
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cells)| cells.as_slice())
    }

    /// Row `index` across all columns; missing cells read as empty.
    #[must_use]
    pub fn row(&self, index: usize) -> Vec<&str> {
        self.columns
            .iter()
            .map(|(_, cells)| cells.get(index).map_or("", String::as_str))
            .collect()
    }
}
