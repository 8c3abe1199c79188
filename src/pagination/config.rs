/// Configuration for paginated requests
#[derive(Debug, Clone, Default)]
pub struct PaginationConfig {
    pub max_pages: Option<usize>,
}

impl PaginationConfig {
    /// `None` fetches every page.
    pub fn from_limit(max_pages: Option<usize>) -> Self {
        Self { max_pages }
    }
}
