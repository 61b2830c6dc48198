use anyhow::{Context, Result};

use nosh_core::openfoodfacts::{SearchResponse, response_to_page};
use nosh_core::search::{FoodSearchProvider, SearchPage};

const SEARCH_URL: &str = "https://world.openfoodfacts.org/cgi/search.pl";

/// Blocking `FoodSearchProvider` over the `OpenFoodFacts` search endpoint.
///
/// Owns a current-thread runtime and blocks on each request; the interactive
/// sessions that use it are synchronous.
pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    rt: tokio::runtime::Runtime,
}

impl OpenFoodFactsClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "nosh/{} (nutrition ledger)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        Ok(Self { client, rt })
    }

    pub async fn search_page_async(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<SearchPage> {
        let page = page.to_string();
        let page_size = page_size.to_string();
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("search_terms", query),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", page_size.as_str()),
                ("page", page.as_str()),
            ])
            .send()
            .await
            .context("Failed to reach OpenFoodFacts API")?
            .error_for_status()
            .context("OpenFoodFacts API returned an error")?;

        let data: SearchResponse = resp
            .json()
            .await
            .context("Failed to parse OpenFoodFacts search response")?;

        Ok(response_to_page(data))
    }
}

impl FoodSearchProvider for OpenFoodFactsClient {
    fn search_page(&self, query: &str, page: usize, page_size: usize) -> Result<SearchPage> {
        self.rt
            .block_on(self.search_page_async(query, page, page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Integration tests (hit real OpenFoodFacts API) ---

    #[test]
    #[ignore = "hits OpenFoodFacts API"]
    fn test_search_returns_results() {
        let client = OpenFoodFactsClient::new().unwrap();
        let page = client.search_page("nutella", 1, 5).unwrap();
        assert!(page.total_count > 0);
        assert!(!page.records.is_empty());
        assert!(page.records.len() <= 5);
    }

    #[test]
    #[ignore = "hits OpenFoodFacts API"]
    fn test_second_page_differs() {
        let client = OpenFoodFactsClient::new().unwrap();
        let first = client.search_page("apple", 1, 5).unwrap();
        let second = client.search_page("apple", 2, 5).unwrap();
        assert_ne!(first.records, second.records);
    }
}
