//! Paginated document listing.
//!
//! A matching document may sit on any page, so a fetch round always walks
//! every page the endpoint reports and concatenates them in page order.

use async_trait::async_trait;
use tracing::debug;

use super::model::{DocumentPage, DocumentRecord};
use crate::api::ApiClient;
use crate::error::FetchError;

const DOCUMENTS_PATH: &str = "/v1/documents";

/// Source of the full document listing for a filename filter.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Fetch one page (1-based).
    async fn fetch_page(&self, file_name: &str, page: u32) -> Result<DocumentPage, FetchError>;

    /// Fetch every page in ascending order and concatenate the results.
    ///
    /// Record order within a page is whatever the service returned.
    async fn fetch_all(&self, file_name: &str) -> Result<Vec<DocumentRecord>, FetchError> {
        let first = self.fetch_page(file_name, 1).await?;
        let total_pages = first.pagination.total_pages;
        let mut records = first.results;

        for page in 2..=total_pages {
            let next = self.fetch_page(file_name, page).await?;
            debug!(page, total_pages, count = next.results.len(), "Fetched listing page");
            records.extend(next.results);
        }

        debug!(
            file_name = %file_name,
            total_pages,
            count = records.len(),
            "Fetched document listing"
        );
        Ok(records)
    }
}

#[async_trait]
impl DocumentIndex for ApiClient {
    async fn fetch_page(&self, file_name: &str, page: u32) -> Result<DocumentPage, FetchError> {
        let query = [
            ("page", page.to_string()),
            ("original_file_name", file_name.to_string()),
            ("ordering", "-arrived_at".to_string()),
        ];
        self.get(DOCUMENTS_PATH, &query)
            .await
            .map_err(|source| FetchError::Page { page, source })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::documents::model::Pagination;
    use crate::error::ApiError;

    /// In-memory listing split into fixed-size pages.
    struct PagedListing {
        pages: Vec<Vec<DocumentRecord>>,
        fail_page: Option<u32>,
        requested: Mutex<Vec<u32>>,
    }

    impl PagedListing {
        fn new(records: Vec<DocumentRecord>, per_page: usize) -> Self {
            Self {
                pages: records.chunks(per_page).map(<[_]>::to_vec).collect(),
                fail_page: None,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentIndex for PagedListing {
        async fn fetch_page(&self, _file_name: &str, page: u32) -> Result<DocumentPage, FetchError> {
            self.requested.lock().unwrap().push(page);
            if self.fail_page == Some(page) {
                return Err(FetchError::Page {
                    page,
                    source: ApiError::Status {
                        url: "stub".into(),
                        status_code: 502,
                        body: String::new(),
                    },
                });
            }
            Ok(DocumentPage {
                pagination: Pagination {
                    total_pages: self.pages.len() as u32,
                },
                results: self
                    .pages
                    .get(page as usize - 1)
                    .cloned()
                    .unwrap_or_default(),
            })
        }
    }

    fn record(n: u32) -> DocumentRecord {
        DocumentRecord {
            original_file_name: "invoice.pdf".into(),
            arrived_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, n).unwrap(),
            annotation_links: vec![format!("https://api.example.com/v1/annotations/{n}")],
        }
    }

    #[tokio::test]
    async fn concatenates_every_page_in_order() {
        let all: Vec<DocumentRecord> = (0..7).map(record).collect();
        let listing = PagedListing::new(all.clone(), 3);

        let fetched = listing.fetch_all("invoice.pdf").await.unwrap();

        assert_eq!(fetched, all);
        assert_eq!(*listing.requested.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_listing_requests_only_first_page() {
        let listing = PagedListing::new(Vec::new(), 3);

        let fetched = listing.fetch_all("invoice.pdf").await.unwrap();

        assert!(fetched.is_empty());
        assert_eq!(*listing.requested.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn failing_page_fails_the_round() {
        let mut listing = PagedListing::new((0..6).map(record).collect(), 2);
        listing.fail_page = Some(2);

        let err = listing.fetch_all("invoice.pdf").await.unwrap_err();

        assert!(matches!(err, FetchError::Page { page: 2, .. }));
        assert!(!err.is_transport());
        assert_eq!(*listing.requested.lock().unwrap(), vec![1, 2]);
    }
}
