use serde::Serialize;

/// Outcome of a `next`/`prev` request on a paged browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageMove {
    Moved { page: usize, fetched: bool },
    FirstPage,
    LastPage,
}

impl PageMove {
    #[must_use]
    pub fn notice(self) -> Option<&'static str> {
        match self {
            PageMove::Moved { .. } => None,
            PageMove::FirstPage => Some("Already on the first page."),
            PageMove::LastPage => Some("Already on the last page."),
        }
    }
}

/// Number of pages needed for `total` items, ceiling-divided.
#[must_use]
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 25), 0);
        assert_eq!(page_count(1, 25), 1);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
        assert_eq!(page_count(10, 0), 0);
    }

    #[test]
    fn test_notice() {
        assert!(PageMove::Moved { page: 2, fetched: false }.notice().is_none());
        assert_eq!(PageMove::LastPage.notice(), Some("Already on the last page."));
    }
}
