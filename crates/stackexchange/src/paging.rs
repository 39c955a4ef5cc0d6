//! Page cursor for multi-page responses.
//!
//! See <https://api.stackexchange.com/docs/paging>.

/// Current page (1-based) and whether the last response reported more pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    page: u32,
    has_more: bool,
}

impl Paging {
    /// Current page number, 1 until moved.
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn next_page(&mut self) {
        self.page = self.current_page() + 1;
    }

    pub fn previous_page(&mut self) {
        self.page = self.current_page().saturating_sub(1).max(1);
    }

    pub fn first_page(&mut self) {
        self.page = 1;
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Record the `has_more` flag of the latest response.
    pub fn record(&mut self, has_more: bool) {
        self.has_more = has_more;
    }
}
