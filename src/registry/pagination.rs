use serde::Serialize;

pub const ITEMS_PER_PAGE: i64 = 5;

/// Pages needed for `row_count` rows; an empty table is still one page.
pub fn total_pages(row_count: i64) -> i64 {
    let pages = (row_count.max(0) + ITEMS_PER_PAGE - 1) / ITEMS_PER_PAGE;
    pages.max(1)
}

/// Row offset of the first row on `page` (pages start at 1).
pub fn page_offset(page: i64) -> i64 {
    (page.max(1) - 1) * ITEMS_PER_PAGE
}

/// Derived paging position. Rebuilt from the live row count, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub current_page: i64,
    pub items_per_page: i64,
    pub total_pages: i64,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            current_page: 1,
            items_per_page: ITEMS_PER_PAGE,
            total_pages: 1,
        }
    }
}

impl PaginationState {
    /// Recompute from the row count. `current_page` is left where it was,
    /// even if it now points past the last page.
    pub fn recount(&mut self, row_count: i64) {
        self.total_pages = total_pages(row_count);
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    /// Whether `page` is reachable with previous/next navigation.
    pub fn can_show(&self, page: i64) -> bool {
        (1..=self.total_pages).contains(&page)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_at_least_one() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(5), 1);
        assert_eq!(total_pages(6), 2);
        assert_eq!(total_pages(10), 2);
        assert_eq!(total_pages(11), 3);
    }

    #[test]
    fn total_pages_matches_ceiling_formula() {
        for n in 0..200i64 {
            let expected = std::cmp::max(1, (n as f64 / 5.0).ceil() as i64);
            assert_eq!(total_pages(n), expected, "rows={n}");
        }
    }

    #[test]
    fn offsets() {
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(2), 5);
        assert_eq!(page_offset(0), 0);
    }

    #[test]
    fn recount_does_not_clamp_current_page() {
        let mut state = PaginationState {
            current_page: 3,
            items_per_page: ITEMS_PER_PAGE,
            total_pages: 3,
        };
        state.recount(10);
        assert_eq!(state.total_pages, 2);
        assert_eq!(state.current_page, 3);
        assert!(!state.can_show(3));
        assert!(!state.has_next());
    }
}
