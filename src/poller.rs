//! Annotation status polling.
//!
//! `importing` and any unrecognised status are non-terminal and polled again
//! after a fixed delay until the round budget runs out. `to_review` and
//! `failed_import` end polling immediately.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{ApiError, Error};

/// Round budget for status polling.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Maximum number of status queries.
    pub max_rounds: u32,
    /// Wait between queries.
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 30,
            delay: Duration::from_secs(20),
        }
    }
}

/// Processing status of an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationStatus {
    Importing,
    ToReview,
    FailedImport,
    /// Any value without an explicit rule. Treated as non-terminal.
    Other(String),
}

impl AnnotationStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "importing" => Self::Importing,
            "to_review" => Self::ToReview,
            "failed_import" => Self::FailedImport,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ToReview | Self::FailedImport)
    }
}

impl fmt::Display for AnnotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Importing => f.write_str("importing"),
            Self::ToReview => f.write_str("to_review"),
            Self::FailedImport => f.write_str("failed_import"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Terminal output of one check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// Reached `to_review`.
    Success,
    /// Reached `failed_import`.
    Failed,
    /// Never arrived, or arrived without an annotation.
    NotFound,
    /// Arrived but still non-terminal when the budget ran out.
    TimedOut,
}

impl PollResult {
    /// Process exit code: 0 on success, 1 otherwise.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failed | Self::NotFound | Self::TimedOut => 1,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for PollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::NotFound => "not_found",
            Self::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// Where annotation statuses come from.
#[async_trait]
pub trait AnnotationSource: Send + Sync {
    async fn fetch_status(&self, link: &str) -> Result<AnnotationStatus, ApiError>;
}

#[derive(Deserialize)]
struct AnnotationBody {
    status: String,
}

#[async_trait]
impl AnnotationSource for ApiClient {
    async fn fetch_status(&self, link: &str) -> Result<AnnotationStatus, ApiError> {
        let body: AnnotationBody = self.get(link, &[]).await?;
        Ok(AnnotationStatus::parse(&body.status))
    }
}

/// Drives one annotation to a terminal status.
pub struct StatusPoller {
    source: Arc<dyn AnnotationSource>,
    policy: PollPolicy,
}

impl StatusPoller {
    pub fn new(source: Arc<dyn AnnotationSource>, policy: PollPolicy) -> Self {
        Self { source, policy }
    }

    /// Query `link` until a terminal status or the round budget is spent.
    ///
    /// An unreachable link is an error, not a `PollResult`.
    pub async fn poll(&self, link: &str, cancel: &CancellationToken) -> Result<PollResult, Error> {
        let mut round = 1;

        loop {
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                status = self.source.fetch_status(link) => status?,
            };

            match status {
                AnnotationStatus::ToReview => {
                    info!(link = %link, round, "Annotation reached to_review");
                    return Ok(PollResult::Success);
                }
                AnnotationStatus::FailedImport => {
                    warn!(link = %link, round, "Annotation import failed");
                    return Ok(PollResult::Failed);
                }
                AnnotationStatus::Importing => {
                    debug!(link = %link, round, "Annotation still importing");
                }
                AnnotationStatus::Other(ref value) => {
                    warn!(link = %link, round, status = %value, "Unrecognised annotation status, polling again");
                }
            }

            if round >= self.policy.max_rounds {
                warn!(
                    link = %link,
                    rounds = round,
                    last_status = %status,
                    "Annotation still not terminal, giving up"
                );
                return Ok(PollResult::TimedOut);
            }
            round += 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(self.policy.delay) => {}
            }
        }
    }
}
