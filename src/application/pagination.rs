//! Shared offset pagination helpers.

use gamedex_types::PagedResult;
use thiserror::Error;

/// Page window derived from a total count and a requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub total_count: u64,
    pub page_size: u32,
    /// Requested page clamped into `1..=total_pages`.
    pub current_page: u32,
    pub total_pages: u32,
    pub offset: u64,
}

impl PageWindow {
    /// Reconcile a count result with the requested page.
    ///
    /// `total_pages` is at least 1, so an empty listing still reports page 1 of 1.
    pub fn resolve(total_count: u64, page: u32, page_size: u32) -> Result<Self, PaginationError> {
        if page_size == 0 {
            return Err(PaginationError::ZeroPageSize);
        }
        let pages = total_count.div_ceil(u64::from(page_size)).max(1);
        let total_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        let current_page = page.clamp(1, total_pages);
        let offset = u64::from(current_page - 1) * u64::from(page_size);
        Ok(Self {
            total_count,
            page_size,
            current_page,
            total_pages,
            offset,
        })
    }

    /// Wrap a fetched page of items. Extra items beyond the page size are dropped.
    pub fn into_result<T>(self, mut items: Vec<T>) -> PagedResult<T> {
        items.truncate(self.page_size as usize);
        PagedResult {
            items,
            total_count: self.total_count,
            current_page: self.current_page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page size must be positive")]
    ZeroPageSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_page_past_the_end() {
        let window = PageWindow::resolve(123, 10, 48).expect("window");
        assert_eq!(window.total_pages, 3);
        assert_eq!(window.current_page, 3);
        assert_eq!(window.offset, 96);
    }

    #[test]
    fn empty_listing_has_one_page() {
        let window = PageWindow::resolve(0, 4, 48).expect("window");
        assert_eq!(window.total_pages, 1);
        assert_eq!(window.current_page, 1);
        assert_eq!(window.offset, 0);
    }

    #[test]
    fn exact_multiple_does_not_add_a_page() {
        let window = PageWindow::resolve(96, 0, 48).expect("window");
        assert_eq!(window.total_pages, 2);
        assert_eq!(window.current_page, 1);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert_eq!(
            PageWindow::resolve(10, 1, 0),
            Err(PaginationError::ZeroPageSize)
        );
    }

    #[test]
    fn result_never_exceeds_page_size() {
        let window = PageWindow::resolve(5, 1, 2).expect("window");
        let page = window.into_result(vec![1, 2, 3]);
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.total_pages, 3);
    }
}
