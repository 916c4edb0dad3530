//! Wire types of the document listing endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One document as listed by the remote service. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub original_file_name: String,
    pub arrived_at: DateTime<Utc>,
    /// Empty when the file format was rejected before queuing.
    #[serde(rename = "annotations", default)]
    pub annotation_links: Vec<String>,
}

impl DocumentRecord {
    /// The annotation link whose status is polled.
    pub fn primary_annotation(&self) -> Option<&str> {
        self.annotation_links.first().map(String::as_str)
    }
}

/// Pagination metadata of a listing page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub total_pages: u32,
}

/// `GET /v1/documents` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPage {
    pub pagination: Pagination,
    #[serde(default)]
    pub results: Vec<DocumentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing_page() {
        let body = r#"{
            "pagination": {"total": 2, "total_pages": 3, "next": null, "previous": null},
            "results": [
                {
                    "id": 11,
                    "original_file_name": "invoice.pdf",
                    "arrived_at": "2024-03-01T10:15:30.123456Z",
                    "annotations": ["https://api.example.com/v1/annotations/7"]
                },
                {
                    "id": 12,
                    "original_file_name": "sheet.xlsx",
                    "arrived_at": "2024-03-01T10:16:00.000000Z",
                    "annotations": []
                }
            ]
        }"#;

        let page: DocumentPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.results.len(), 2);

        let first = &page.results[0];
        assert_eq!(first.original_file_name, "invoice.pdf");
        assert_eq!(first.arrived_at.timestamp_subsec_micros(), 123_456);
        assert_eq!(
            first.primary_annotation(),
            Some("https://api.example.com/v1/annotations/7")
        );
        assert_eq!(page.results[1].primary_annotation(), None);
    }

    #[test]
    fn missing_annotations_field_means_no_links() {
        let body = r#"{"original_file_name": "a.pdf", "arrived_at": "2024-03-01T10:15:30Z"}"#;
        let record: DocumentRecord = serde_json::from_str(body).unwrap();
        assert!(record.annotation_links.is_empty());
    }
}
