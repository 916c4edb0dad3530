//! End-to-end check: authenticate → submit → correlate → poll → outcome.
//!
//! One attempt per run. Retries live only inside the bounded round loops of
//! the correlator and the poller.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{self, ApiClient};
use crate::config::{CheckerConfig, attachment_name};
use crate::correlation::{Correlation, CorrelationPolicy, Correlator, NotFoundReason};
use crate::documents::DocumentIndex;
use crate::error::{Error, Result};
use crate::poller::{AnnotationSource, PollPolicy, PollResult, StatusPoller};
use crate::submit::{SmtpSubmitter, Submitter};

/// Collaborators of one pipeline run.
pub struct PipelineDeps {
    pub submitter: Arc<dyn Submitter>,
    pub index: Arc<dyn DocumentIndex>,
    pub status: Arc<dyn AnnotationSource>,
}

/// Submit → correlate → poll, on already-authenticated collaborators.
pub struct Pipeline {
    submitter: Arc<dyn Submitter>,
    correlator: Correlator,
    poller: StatusPoller,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps, correlation: CorrelationPolicy, polling: PollPolicy) -> Self {
        Self {
            submitter: deps.submitter,
            correlator: Correlator::new(deps.index, correlation),
            poller: StatusPoller::new(deps.status, polling),
        }
    }

    /// Send `file_path` to `inbox_address` and follow it to a terminal outcome.
    pub async fn run(
        &self,
        file_path: &Path,
        inbox_address: &str,
        cancel: &CancellationToken,
    ) -> Result<PollResult> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let file_name = attachment_name(file_path);
        let submitted_at = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            sent = self.submitter.send_attachment(file_path, inbox_address) => sent?,
        };

        let correlation = self
            .correlator
            .correlate(submitted_at, &file_name, cancel)
            .await?;

        let result = match correlation {
            Correlation::Matched {
                record,
                annotation_link,
            } => {
                info!(
                    file_name = %record.original_file_name,
                    arrived_at = %record.arrived_at,
                    annotation = %annotation_link,
                    "Submission correlated"
                );
                self.poller.poll(&annotation_link, cancel).await?
            }
            Correlation::NotFound(NotFoundReason::NeverIndexed { rounds }) => {
                warn!(
                    file_name = %file_name,
                    rounds,
                    "Submission never appeared in the document listing (not indexed yet, or format rejected before indexing)"
                );
                PollResult::NotFound
            }
            Correlation::NotFound(NotFoundReason::NoAnnotation { record }) => {
                warn!(
                    file_name = %file_name,
                    arrived_at = %record.arrived_at,
                    "Submission was indexed without an annotation, file format is likely unsupported"
                );
                PollResult::NotFound
            }
        };

        log_outcome(result, &file_name);
        Ok(result)
    }
}

fn log_outcome(result: PollResult, file_name: &str) {
    match result {
        PollResult::Success => info!(file_name = %file_name, "Document processed, ready for review"),
        PollResult::Failed => error!(file_name = %file_name, "Document explicitly rejected: import failed"),
        PollResult::TimedOut => error!(file_name = %file_name, "Document arrived but is stuck in a non-terminal status"),
        PollResult::NotFound => error!(file_name = %file_name, "Document not found: never arrived or has no annotation"),
    }
}

/// Full run from configuration: log in, then drive the pipeline over HTTP and SMTP.
pub async fn run_check(config: &CheckerConfig, cancel: &CancellationToken) -> Result<PollResult> {
    let client = ApiClient::new(&config.api.base_url, config.api.request_timeout)?;

    let client = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        client = api::login(client, &config.api.username, &config.api.password) => client?,
    };
    let client = Arc::new(client);

    let deps = PipelineDeps {
        submitter: Arc::new(SmtpSubmitter::new(config.email.clone())),
        index: Arc::clone(&client) as Arc<dyn DocumentIndex>,
        status: client as Arc<dyn AnnotationSource>,
    };

    Pipeline::new(deps, config.correlation.clone(), config.polling.clone())
        .run(&config.file_path, &config.email.inbox_address, cancel)
        .await
}
