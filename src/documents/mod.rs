//! Document listing: wire model and paginated fetcher.

pub mod index;
pub mod model;

pub use index::DocumentIndex;
pub use model::{DocumentPage, DocumentRecord, Pagination};
