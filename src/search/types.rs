use serde::{Deserialize, Serialize};

/// Query string of the search endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "searchQuery", default)]
    pub search_query: String,
    /// `;`-separated categories, e.g. `math;physics`.
    pub categories: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
