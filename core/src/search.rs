//! Interactive browsing of a paged remote food search.
//!
//! The browser keeps every page it has fetched, in order, and never asks for
//! a page twice. What the user sees, and what a typed index refers to, is
//! always recomputed from `(fetched pages, current page, filter)`: numbers
//! shown before a page or filter change are never reused after it.

use serde::Serialize;

use crate::catalog::NameFilter;
use crate::error::{LedgerError, LedgerResult};
use crate::models::NutrientProfile;
use crate::paging::{PageMove, page_count};
use crate::service::NoshService;

/// Serving size assumed when the caller gives none, or gives a non-positive one.
pub const DEFAULT_SERVING_GRAMS: f64 = 100.0;

/// One search hit as the remote service describes it. Nutrients are per 100
/// grams (or millilitres) and any of them may be missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub name: String,
    pub quantity: Option<String>,
    pub calories: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub protein: Option<f64>,
}

impl RawRecord {
    /// Per-100g profile, or `None` when any of the four values is missing.
    #[must_use]
    pub fn profile(&self) -> Option<NutrientProfile> {
        let present = |v: Option<f64>| v.filter(|n| n.is_finite());
        Some(NutrientProfile::new(
            present(self.calories)?,
            present(self.fat)?,
            present(self.carbs)?,
            present(self.protein)?,
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub records: Vec<RawRecord>,
    pub total_count: usize,
}

/// A paged full-text food search.
///
/// Implemented over HTTP by the CLI; tests use in-memory fakes.
pub trait FoodSearchProvider {
    fn search_page(&self, query: &str, page: usize, page_size: usize) -> anyhow::Result<SearchPage>;
}

/// One numbered row of the current render.
#[derive(Debug, Clone, Copy)]
pub struct DisplayRow<'a> {
    pub index: usize,
    pub record: &'a RawRecord,
    pub per_100g: NutrientProfile,
}

/// A food written to the catalog from a search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedFood {
    pub local_name: String,
    pub source_name: String,
    pub grams: f64,
    pub used_default_grams: bool,
    pub profile: NutrientProfile,
}

pub struct SearchBrowser<'p, P: FoodSearchProvider + ?Sized> {
    provider: &'p P,
    query: String,
    page_size: usize,
    total_count: usize,
    fetched_pages: Vec<Vec<RawRecord>>,
    current_page: usize,
    filter: NameFilter,
}

impl<'p, P: FoodSearchProvider + ?Sized> SearchBrowser<'p, P> {
    /// Start a session by fetching the first page of `query`.
    pub fn open(provider: &'p P, query: &str, page_size: usize) -> LedgerResult<Self> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LedgerError::validation("Search query must not be empty"));
        }
        if page_size == 0 {
            return Err(LedgerError::validation("Page size must be at least 1"));
        }

        tracing::debug!(query, page = 1, "fetching search page");
        let first = provider
            .search_page(query, 1, page_size)
            .map_err(LedgerError::RemoteService)?;

        Ok(Self {
            provider,
            query: query.to_string(),
            page_size,
            total_count: first.total_count,
            fetched_pages: vec![first.records],
            current_page: 1,
            filter: NameFilter::default(),
        })
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn fetched_page_count(&self) -> usize {
        self.fetched_pages.len()
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        self.filter.as_str()
    }

    /// Pages advertised by the service, never fewer than those already held.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        page_count(self.total_count, self.page_size).max(self.fetched_pages.len())
    }

    /// True when the search produced nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count == 0 && self.fetched_pages.iter().all(Vec::is_empty)
    }

    /// The numbered rows for the current page and filter. Incomplete records
    /// and non-matching names take no slot.
    #[must_use]
    pub fn displayable(&self) -> Vec<DisplayRow<'_>> {
        self.fetched_pages[self.current_page - 1]
            .iter()
            .filter_map(|record| record.profile().map(|p| (record, p)))
            .filter(|(record, _)| self.filter.matches(&record.name))
            .enumerate()
            .map(|(i, (record, per_100g))| DisplayRow {
                index: i + 1,
                record,
                per_100g,
            })
            .collect()
    }

    pub fn next(&mut self) -> LedgerResult<PageMove> {
        if self.current_page >= self.total_pages() {
            return Ok(PageMove::LastPage);
        }

        let target = self.current_page + 1;
        let mut fetched = false;
        if target > self.fetched_pages.len() {
            tracing::debug!(query = %self.query, page = target, "fetching search page");
            let page = self
                .provider
                .search_page(&self.query, target, self.page_size)
                .map_err(|e| {
                    tracing::warn!(page = target, error = %e, "search page fetch failed");
                    LedgerError::RemoteService(e.context(format!("Error fetching page {target}")))
                })?;
            self.fetched_pages.push(page.records);
            fetched = true;
        }

        self.current_page = target;
        Ok(PageMove::Moved {
            page: target,
            fetched,
        })
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

    /// Replace the name filter. The page stays where it is.
    pub fn set_filter(&mut self, pattern: &str) -> LedgerResult<()> {
        self.filter = NameFilter::new(pattern)?;
        Ok(())
    }

    /// Resolve `index` against the rows currently on screen.
    pub fn resolve(&self, index: usize) -> LedgerResult<DisplayRow<'_>> {
        let rows = self.displayable();
        let available = rows.len();
        if index == 0 || index > available {
            return Err(LedgerError::InvalidIndex { index, available });
        }
        Ok(rows[index - 1])
    }

    /// Import the record at `index` as a new food named `local_name`, scaled
    /// to a serving of `grams` (100 when absent or not positive).
    pub fn select(
        &self,
        index: usize,
        local_name: &str,
        grams: Option<f64>,
        service: &mut NoshService,
    ) -> LedgerResult<ImportedFood> {
        let row = self.resolve(index)?;

        let (grams, used_default_grams) = match grams {
            None => (DEFAULT_SERVING_GRAMS, false),
            Some(g) if g.is_finite() && g > 0.0 => (g, false),
            Some(g) => {
                tracing::warn!(grams = g, "serving must be positive; using 100g");
                (DEFAULT_SERVING_GRAMS, true)
            }
        };

        let profile = row.per_100g * (grams / 100.0);
        let local_name = service.add_food(local_name, profile)?;

        Ok(ImportedFood {
            local_name,
            source_name: row.record.name.clone(),
            grams,
            used_default_grams,
            profile,
        })
    }

    /// End the session. Imports were saved as they happened.
    pub fn quit(self) {
        tracing::debug!(query = %self.query, pages = self.fetched_pages.len(), "search session closed");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::RecordKind;

    fn rec(name: &str, calories: f64) -> RawRecord {
        RawRecord {
            name: name.to_string(),
            quantity: Some("100 g".to_string()),
            calories: Some(calories),
            fat: Some(1.0),
            carbs: Some(10.0),
            protein: Some(2.0),
        }
    }

    fn incomplete(name: &str) -> RawRecord {
        RawRecord {
            protein: None,
            ..rec(name, 50.0)
        }
    }

    /// Serves fixed pages and records every page number requested.
    struct MockProvider {
        pages: Vec<Vec<RawRecord>>,
        total_count: usize,
        /// Pages whose next request fails once.
        fail_pages: RefCell<Vec<usize>>,
        requests: RefCell<Vec<usize>>,
    }

    impl MockProvider {
        fn new(pages: Vec<Vec<RawRecord>>, total_count: usize) -> Self {
            Self {
                pages,
                total_count,
                fail_pages: RefCell::new(Vec::new()),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<usize> {
            self.requests.borrow().clone()
        }
    }

    impl FoodSearchProvider for MockProvider {
        fn search_page(&self, _query: &str, page: usize, _page_size: usize) -> anyhow::Result<SearchPage> {
            self.requests.borrow_mut().push(page);
            let mut failing = self.fail_pages.borrow_mut();
            if let Some(pos) = failing.iter().position(|p| *p == page) {
                failing.remove(pos);
                anyhow::bail!("connection reset");
            }
            Ok(SearchPage {
                records: self.pages.get(page - 1).cloned().unwrap_or_default(),
                total_count: self.total_count,
            })
        }
    }

    fn three_pages() -> MockProvider {
        MockProvider::new(
            vec![
                vec![rec("Apple Juice", 46.0), incomplete("Apple Mystery"), rec("Banana Chips", 519.0), rec("Apple Pie", 237.0)],
                vec![rec("Apricot Jam", 250.0), rec("Blueberry Muffin", 377.0)],
                vec![rec("Cherry Cola", 42.0)],
            ],
            9,
        )
    }

    fn names(browser: &SearchBrowser<'_, MockProvider>) -> Vec<String> {
        browser
            .displayable()
            .iter()
            .map(|r| r.record.name.clone())
            .collect()
    }

    #[test]
    fn test_open_fetches_first_page_only() {
        let provider = three_pages();
        let browser = SearchBrowser::open(&provider, "apple", 4).unwrap();
        assert_eq!(provider.requests(), vec![1]);
        assert_eq!(browser.current_page(), 1);
        assert_eq!(browser.total_pages(), 3);
        assert!(!browser.is_empty());
    }

    #[test]
    fn test_open_rejects_empty_query() {
        let provider = three_pages();
        assert!(matches!(
            SearchBrowser::open(&provider, "  ", 4),
            Err(LedgerError::Validation(_))
        ));
        assert!(provider.requests().is_empty());
    }

    #[test]
    fn test_open_reports_remote_failure() {
        let mut provider = three_pages();
        provider.fail_pages = RefCell::new(vec![1]);
        assert!(matches!(
            SearchBrowser::open(&provider, "apple", 4),
            Err(LedgerError::RemoteService(_))
        ));
    }

    #[test]
    fn test_empty_search() {
        let provider = MockProvider::new(vec![], 0);
        let browser = SearchBrowser::open(&provider, "zzz", 4).unwrap();
        assert!(browser.is_empty());
        assert!(browser.displayable().is_empty());
    }

    #[test]
    fn test_incomplete_records_take_no_slot() {
        let provider = three_pages();
        let browser = SearchBrowser::open(&provider, "apple", 4).unwrap();
        let rows = browser.displayable();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[1].record.name, "Banana Chips");
        assert_eq!(rows[1].index, 2);
    }

    #[test]
    fn test_record_profile_requires_all_nutrients() {
        assert!(rec("x", 1.0).profile().is_some());
        assert!(incomplete("x").profile().is_none());
        let nan = RawRecord {
            fat: Some(f64::NAN),
            ..rec("x", 1.0)
        };
        assert!(nan.profile().is_none());
    }

    #[test]
    fn test_next_fetches_in_order_and_never_refetches() {
        let provider = three_pages();
        let mut browser = SearchBrowser::open(&provider, "apple", 4).unwrap();

        assert_eq!(browser.next().unwrap(), PageMove::Moved { page: 2, fetched: true });
        assert_eq!(names(&browser), vec!["Apricot Jam", "Blueberry Muffin"]);
        assert_eq!(browser.prev(), PageMove::Moved { page: 1, fetched: false });
        assert_eq!(browser.next().unwrap(), PageMove::Moved { page: 2, fetched: false });
        assert_eq!(browser.next().unwrap(), PageMove::Moved { page: 3, fetched: true });

        assert_eq!(provider.requests(), vec![1, 2, 3]);
        assert_eq!(browser.fetched_page_count(), 3);
    }

    #[test]
    fn test_next_on_last_page_is_noop() {
        let provider = three_pages();
        let mut browser = SearchBrowser::open(&provider, "apple", 4).unwrap();
        browser.next().unwrap();
        browser.next().unwrap();
        let before = provider.requests();

        assert_eq!(browser.next().unwrap(), PageMove::LastPage);
        assert_eq!(browser.current_page(), 3);
        assert_eq!(browser.fetched_page_count(), 3);
        assert_eq!(provider.requests(), before);
    }

    #[test]
    fn test_prev_on_first_page_is_noop() {
        let provider = three_pages();
        let mut browser = SearchBrowser::open(&provider, "apple", 4).unwrap();
        assert_eq!(browser.prev(), PageMove::FirstPage);
        assert_eq!(browser.current_page(), 1);
        assert_eq!(provider.requests(), vec![1]);
    }

    #[test]
    fn test_failed_fetch_keeps_page() {
        let mut provider = three_pages();
        provider.fail_pages = RefCell::new(vec![2]);
        let mut browser = SearchBrowser::open(&provider, "apple", 4).unwrap();

        let err = browser.next().unwrap_err();
        assert!(matches!(err, LedgerError::RemoteService(_)));
        assert!(err.to_string().contains("page 2"));
        assert_eq!(browser.current_page(), 1);
        assert_eq!(browser.fetched_page_count(), 1);
        assert_eq!(names(&browser).len(), 3);

        // The session carries on: retrying fetches page 2 and moves
        assert_eq!(browser.next().unwrap(), PageMove::Moved { page: 2, fetched: true });
        assert_eq!(browser.current_page(), 2);
        assert_eq!(browser.fetched_page_count(), 2);
        assert_eq!(provider.requests(), vec![1, 2, 2]);
    }

    #[test]
    fn test_filter_rescopes_current_page_without_fetch() {
        let provider = three_pages();
        let mut browser = SearchBrowser::open(&provider, "apple", 4).unwrap();
        browser.set_filter("APPLE*").unwrap();
        assert_eq!(browser.filter(), "apple*");
        assert_eq!(names(&browser), vec!["Apple Juice", "Apple Pie"]);
        assert_eq!(browser.current_page(), 1);
        assert_eq!(provider.requests(), vec![1]);

        browser.set_filter("").unwrap();
        assert_eq!(names(&browser).len(), 3);
    }

    #[test]
    fn test_invalid_filter_keeps_previous() {
        let provider = three_pages();
        let mut browser = SearchBrowser::open(&provider, "apple", 4).unwrap();
        browser.set_filter("*pie").unwrap();
        assert!(browser.set_filter("[oops").is_err());
        assert_eq!(browser.filter(), "*pie");
    }

    #[test]
    fn test_filter_then_select_first_match() {
        let provider = three_pages();
        let mut svc = NoshService::new_in_memory().unwrap();
        let mut browser = SearchBrowser::open(&provider, "apple", 4).unwrap();

        // Before filtering, index 1 is Apple Juice
        assert_eq!(browser.resolve(1).unwrap().record.name, "Apple Juice");

        browser.set_filter("banana*").unwrap();
        let imported = browser.select(1, "chips", None, &mut svc).unwrap();
        assert_eq!(imported.source_name, "Banana Chips");
        assert!((svc.foods()["chips"].calories - 519.0).abs() < 1e-9);
    }

    #[test]
    fn test_indices_follow_page_change() {
        let provider = three_pages();
        let mut svc = NoshService::new_in_memory().unwrap();
        let mut browser = SearchBrowser::open(&provider, "apple", 4).unwrap();
        browser.next().unwrap();

        let imported = browser.select(2, "muffin", None, &mut svc).unwrap();
        assert_eq!(imported.source_name, "Blueberry Muffin");
    }

    #[test]
    fn test_select_out_of_range() {
        let provider = three_pages();
        let mut svc = NoshService::new_in_memory().unwrap();
        let mut browser = SearchBrowser::open(&provider, "apple", 4).unwrap();
        browser.set_filter("apple*").unwrap();

        for bad in [0, 3, 4] {
            let err = browser.select(bad, "x", None, &mut svc).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidIndex { available: 2, .. }));
        }
        assert!(svc.foods().is_empty());
        assert_eq!(browser.current_page(), 1);
    }

    #[test]
    fn test_select_scales_by_grams() {
        let provider = three_pages();
        let mut svc = NoshService::new_in_memory().unwrap();
        let browser = SearchBrowser::open(&provider, "apple", 4).unwrap();

        let imported = browser.select(3, "Pie Slice", Some(180.0), &mut svc).unwrap();
        assert_eq!(imported.local_name, "pie slice");
        assert!(!imported.used_default_grams);
        let stored = svc.foods()["pie slice"];
        assert!((stored.calories - 237.0 * 1.8).abs() < 1e-9);
        assert!((stored.carbs - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_non_positive_grams_falls_back() {
        let provider = three_pages();
        let mut svc = NoshService::new_in_memory().unwrap();
        let browser = SearchBrowser::open(&provider, "apple", 4).unwrap();

        let imported = browser.select(1, "juice", Some(-5.0), &mut svc).unwrap();
        assert!(imported.used_default_grams);
        assert!((imported.grams - 100.0).abs() < f64::EPSILON);
        assert!((svc.foods()["juice"].calories - 46.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_duplicate_name_keeps_session() {
        let provider = three_pages();
        let mut svc = NoshService::new_in_memory().unwrap();
        svc.add_food("juice", NutrientProfile::new(1.0, 1.0, 1.0, 1.0))
            .unwrap();
        let browser = SearchBrowser::open(&provider, "apple", 4).unwrap();

        let err = browser.select(1, "juice", None, &mut svc).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::AlreadyExists {
                kind: RecordKind::Food,
                ..
            }
        ));
        assert!((svc.foods()["juice"].calories - 1.0).abs() < f64::EPSILON);

        // Session still usable
        let imported = browser.select(1, "juice2", None, &mut svc).unwrap();
        assert_eq!(imported.source_name, "Apple Juice");
    }

    #[test]
    fn test_short_total_count_still_shows_fetched_pages() {
        let provider = MockProvider::new(vec![vec![rec("A", 1.0)]], 0);
        let mut browser = SearchBrowser::open(&provider, "a", 4).unwrap();
        assert_eq!(browser.total_pages(), 1);
        assert_eq!(browser.next().unwrap(), PageMove::LastPage);
        assert!(!browser.is_empty());
    }
}
