//! Submission of the test file to the processing inbox.

pub mod email;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SubmissionError;

pub use email::SmtpSubmitter;

/// Sends a file to an inbox address.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Send `file_path` as an attachment to `to_address`.
    ///
    /// Returns the UTC instant the send completed; correlation only accepts
    /// documents that arrived strictly after it.
    async fn send_attachment(
        &self,
        file_path: &Path,
        to_address: &str,
    ) -> Result<DateTime<Utc>, SubmissionError>;
}
