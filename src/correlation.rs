//! Submission correlation — find the remote document that is *our* submission.
//!
//! No server-side ID exists before submission, so a record is ours when its
//! filename matches and it arrived strictly after the send completed. Among
//! those, the most recent arrival wins; equal timestamps keep the first seen.
//! Concurrent submissions of the same filename cannot be told apart.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::documents::{DocumentIndex, DocumentRecord};
use crate::error::{Error, FetchError};

/// Round budget for correlation.
#[derive(Debug, Clone)]
pub struct CorrelationPolicy {
    /// Maximum fetch-and-evaluate rounds.
    pub max_rounds: u32,
    /// Wait before each round, giving the remote index time to catch up.
    pub round_delay: Duration,
}

impl Default for CorrelationPolicy {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            round_delay: Duration::from_secs(30),
        }
    }
}

/// Per-attempt accumulator. Owned by exactly one correlation run.
#[derive(Debug, Clone)]
pub struct CorrelationState {
    submitted_at: DateTime<Utc>,
    target_file_name: String,
    best_match: Option<DocumentRecord>,
    best_arrived_at: DateTime<Utc>,
}

impl CorrelationState {
    pub fn new(submitted_at: DateTime<Utc>, target_file_name: impl Into<String>) -> Self {
        Self {
            submitted_at,
            target_file_name: target_file_name.into(),
            best_match: None,
            best_arrived_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Consider one record. Returns `true` if it became the best match.
    pub fn observe(&mut self, record: &DocumentRecord) -> bool {
        if record.original_file_name != self.target_file_name {
            return false;
        }
        if record.arrived_at <= self.submitted_at || record.arrived_at <= self.best_arrived_at {
            return false;
        }
        self.best_arrived_at = record.arrived_at;
        self.best_match = Some(record.clone());
        true
    }

    /// Consider every record of one fetch round, in the order given.
    pub fn observe_all<'a>(&mut self, records: impl IntoIterator<Item = &'a DocumentRecord>) {
        for record in records {
            if self.observe(record) {
                debug!(
                    file_name = %record.original_file_name,
                    arrived_at = %record.arrived_at,
                    "New best correlation candidate"
                );
            }
        }
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn target_file_name(&self) -> &str {
        &self.target_file_name
    }

    pub fn best_match(&self) -> Option<&DocumentRecord> {
        self.best_match.as_ref()
    }

    pub fn best_arrived_at(&self) -> DateTime<Utc> {
        self.best_arrived_at
    }

    pub fn into_best_match(self) -> Option<DocumentRecord> {
        self.best_match
    }
}

/// Why correlation could not hand a document to the poller.
///
/// From the client's side, "not indexed yet" and "format rejected before
/// indexing" look identical; both end up as `NeverIndexed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No matching record appeared within the round budget.
    NeverIndexed { rounds: u32 },
    /// A record matched but carries no annotation link.
    NoAnnotation { record: DocumentRecord },
}

/// Outcome of a correlation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    Matched {
        record: DocumentRecord,
        annotation_link: String,
    },
    NotFound(NotFoundReason),
}

/// Drives fetch rounds until our submission shows up in the listing.
pub struct Correlator {
    index: Arc<dyn DocumentIndex>,
    policy: CorrelationPolicy,
}

impl Correlator {
    pub fn new(index: Arc<dyn DocumentIndex>, policy: CorrelationPolicy) -> Self {
        Self { index, policy }
    }

    /// Identify the document submitted at `submitted_at` as `file_name`.
    ///
    /// Transport failures abort immediately. HTTP status failures spend the
    /// round; if no round ever succeeded, the last one is returned.
    pub async fn correlate(
        &self,
        submitted_at: DateTime<Utc>,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Correlation, Error> {
        let mut state = CorrelationState::new(submitted_at, file_name);
        let mut last_error: Option<FetchError> = None;
        let mut any_round_succeeded = false;

        info!(
            file_name = %file_name,
            submitted_at = %submitted_at,
            max_rounds = self.policy.max_rounds,
            "Looking for submitted document"
        );

        for round in 1..=self.policy.max_rounds {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(self.policy.round_delay) => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                fetched = self.index.fetch_all(file_name) => fetched,
            };

            let records = match fetched {
                Ok(records) => records,
                Err(e) if e.is_transport() => return Err(e.into()),
                Err(e) => {
                    warn!(round, error = %e, "Document listing failed, retrying next round");
                    last_error = Some(e);
                    continue;
                }
            };
            any_round_succeeded = true;

            state.observe_all(&records);

            if state.best_match().is_some() {
                info!(round, arrived_at = %state.best_arrived_at(), "Submitted document found");
                break;
            }
            debug!(round, listed = records.len(), "Submitted document not listed yet");
        }

        if !any_round_succeeded
            && let Some(e) = last_error
        {
            return Err(e.into());
        }

        Ok(resolve(state, self.policy.max_rounds))
    }
}

/// Turn the final state into an outcome.
pub fn resolve(state: CorrelationState, rounds: u32) -> Correlation {
    let Some(record) = state.into_best_match() else {
        return Correlation::NotFound(NotFoundReason::NeverIndexed { rounds });
    };

    match record.primary_annotation().map(str::to_string) {
        Some(annotation_link) => Correlation::Matched {
            record,
            annotation_link,
        },
        None => Correlation::NotFound(NotFoundReason::NoAnnotation { record }),
    }
}
