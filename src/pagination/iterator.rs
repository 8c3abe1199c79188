use super::config::PaginationConfig;

/// Walks 1-based page numbers until the caller stops or the configured cap is hit
pub struct PageIterator {
    current_page: usize,
    config: PaginationConfig,
}

impl PageIterator {
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            current_page: 1,
            config,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn has_reached_max(&self) -> bool {
        self.config
            .max_pages
            .is_some_and(|max| self.current_page > max)
    }

    pub fn advance(&mut self) {
        self.current_page += 1;
    }
}
