use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::models::EntryKind;
use crate::paging::{PageMove, page_count};

/// One numbered row of the picker's current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerRow<'a> {
    pub index: usize,
    pub name: &'a str,
}

/// Fixed-size pages over one sorted local catalog, used to choose what to log.
///
/// Indices always refer to the current page, so `resolve(1)` on page 2 is the
/// first name of page 2.
#[derive(Debug, Clone)]
pub struct DiaryPicker {
    kind: EntryKind,
    names: Vec<String>,
    page_size: usize,
    current_page: usize,
}

impl DiaryPicker {
    pub fn new(kind: EntryKind, mut names: Vec<String>, page_size: usize) -> LedgerResult<Self> {
        if page_size == 0 {
            return Err(LedgerError::validation("Page size must be at least 1"));
        }
        names.sort();
        Ok(Self {
            kind,
            names,
            page_size,
            current_page: 1,
        })
    }

    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Never less than 1, so an empty catalog still has a (blank) page.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        page_count(self.names.len(), self.page_size).max(1)
    }

    pub fn next(&mut self) -> PageMove {
        if self.current_page >= self.total_pages() {
            return PageMove::LastPage;
        }
        self.current_page += 1;
        PageMove::Moved {
            page: self.current_page,
            fetched: false,
        }
    }

    pub fn prev(&mut self) -> PageMove {
        if self.current_page <= 1 {
            return PageMove::FirstPage;
        }
        self.current_page -= 1;
        PageMove::Moved {
            page: self.current_page,
            fetched: false,
        }
    }

    fn page_slice(&self) -> &[String] {
        let start = ((self.current_page - 1) * self.page_size).min(self.names.len());
        let end = (start + self.page_size).min(self.names.len());
        &self.names[start..end]
    }

    #[must_use]
    pub fn page_rows(&self) -> Vec<PickerRow<'_>> {
        self.page_slice()
            .iter()
            .enumerate()
            .map(|(i, name)| PickerRow {
                index: i + 1,
                name,
            })
            .collect()
    }

    pub fn resolve(&self, index: usize) -> LedgerResult<&str> {
        let page = self.page_slice();
        if index == 0 || index > page.len() {
            return Err(LedgerError::InvalidIndex {
                index,
                available: page.len(),
            });
        }
        Ok(&page[index - 1])
    }
}
