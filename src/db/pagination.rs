//! Page/limit pagination shared by every list operation.

/// Default page size.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Largest page size a client may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Largest page number; keeps `page * limit` within `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_LIMIT;

/// A 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    /// 1-based page number.
    pub page: i64,
    /// Items per page, within 1..=MAX_PAGE_LIMIT.
    pub limit: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageParams {
    /// Build from optional query values, clamping out-of-range input.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Window covering every row up to the end of this page.
    ///
    /// Merged listings fetch this much from each source before cutting the
    /// requested page out of the combined list.
    pub fn prefix_len(&self) -> i64 {
        self.offset() + self.limit
    }
}

/// Result of a paginated query.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Total number of items (across all pages).
    pub total: i64,
    pub page: PageParams,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: i64, page: PageParams) -> Self {
        Self { items, total, page }
    }

    /// Check if there are more items after this page.
    pub fn has_more(&self) -> bool {
        self.page.offset() + (self.items.len() as i64) < self.total
    }

    /// Number of pages needed for `total` items.
    pub fn total_pages(&self) -> i64 {
        (self.total + self.page.limit - 1) / self.page.limit
    }

    /// Map the items, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
        }
    }
}
