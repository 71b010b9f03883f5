//! Pagination over the current view.

use std::ops::Range;

use crate::error::{MboxError, Result};

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Where the next page starts and how big pages are.
///
/// `position` is an offset into the current view: the first record of the
/// next page to show. Moving past either end clamps, it never wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    position: usize,
    page_size: usize,
    last_len: usize,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            position: 0,
            page_size: DEFAULT_PAGE_SIZE,
            last_len: 0,
        }
    }
}

impl PaginationCursor {
    pub fn new(page_size: usize) -> Result<Self> {
        let mut cursor = Self::default();
        cursor.set_page_size(page_size)?;
        Ok(cursor)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(MboxError::InvalidPageSize(page_size.to_string()));
        }
        self.page_size = page_size;
        Ok(())
    }

    /// Back to the first page (after the view changed).
    pub fn reset(&mut self) {
        self.position = 0;
        self.last_len = 0;
    }

    /// Range of the next page in a view of `view_len` records.
    ///
    /// Past the end, the last (possibly partial) page is shown again.
    pub fn advance(&mut self, view_len: usize) -> Range<usize> {
        let start = if self.position < view_len {
            self.position
        } else {
            self.last_page_start(view_len)
        };
        self.show(start, view_len)
    }

    /// Range of the page before the one last shown, saturating at 0.
    pub fn back(&mut self, view_len: usize) -> Range<usize> {
        let last_start = self.position.saturating_sub(self.last_len);
        let start = last_start
            .saturating_sub(self.page_size)
            .min(self.last_page_start(view_len));
        self.show(start, view_len)
    }

    fn last_page_start(&self, view_len: usize) -> usize {
        match view_len {
            0 => 0,
            n => (n - 1) / self.page_size * self.page_size,
        }
    }

    fn show(&mut self, start: usize, view_len: usize) -> Range<usize> {
        let end = start.saturating_add(self.page_size).min(view_len);
        let start = start.min(end);
        self.position = end;
        self.last_len = end - start;
        start..end
    }
}

/// Parse a user-supplied page size: a positive integer.
pub fn parse_page_size(arg: &str) -> Result<usize> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(MboxError::InvalidPageSize(arg.trim().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pages() {
        let mut c = PaginationCursor::new(20).unwrap();
        assert_eq!(c.advance(2345), 0..20);
        assert_eq!(c.position(), 20);
        assert_eq!(c.advance(2345), 20..40);
    }

    #[test]
    fn test_prev_from_second_page_returns_to_zero() {
        let mut c = PaginationCursor::new(20).unwrap();
        c.advance(2345);
        assert_eq!(c.position(), 20);
        assert_eq!(c.back(2345), 0..20);
        // Never negative
        assert_eq!(c.back(2345), 0..20);
    }

    #[test]
    fn test_prev_goes_one_page_back() {
        let mut c = PaginationCursor::new(20).unwrap();
        for _ in 0..3 {
            c.advance(100);
        }
        assert_eq!(c.back(100), 20..40);
        assert_eq!(c.back(100), 0..20);
    }

    #[test]
    fn test_end_clamps_to_last_partial_page() {
        let mut c = PaginationCursor::new(20).unwrap();
        let mut last = 0..0;
        for _ in 0..200 {
            last = c.advance(2345);
        }
        assert_eq!(last, 2340..2345);
        assert_eq!(c.advance(2345), 2340..2345);
    }

    #[test]
    fn test_huge_page_size_shows_the_rest() {
        let mut c = PaginationCursor::new(20).unwrap();
        c.advance(2345);
        c.set_page_size(usize::MAX).unwrap();
        assert_eq!(c.advance(2345), 20..2345);
        assert_eq!(c.advance(2345), 0..2345);
        assert_eq!(c.back(2345), 0..2345);
        assert_eq!(parse_page_size(&usize::MAX.to_string()).unwrap(), usize::MAX);
    }

    #[test]
    fn test_empty_view() {
        let mut c = PaginationCursor::default();
        assert_eq!(c.advance(0), 0..0);
        assert_eq!(c.back(0), 0..0);
    }

    #[test]
    fn test_page_size_validation() {
        assert!(matches!(
            PaginationCursor::new(0),
            Err(MboxError::InvalidPageSize(_))
        ));
        assert_eq!(parse_page_size(" 15 ").unwrap(), 15);
        assert!(parse_page_size("0").is_err());
        assert!(parse_page_size("-3").is_err());
        assert!(parse_page_size("ten").is_err());
    }
}
