//! SMTP submission via lettre.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::info;

use super::Submitter;
use crate::config::{EmailConfig, attachment_name};
use crate::error::SubmissionError;

/// Port that speaks TLS from the first byte; anything else upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Sends the attachment through an authenticated SMTP relay.
pub struct SmtpSubmitter {
    config: EmailConfig,
}

impl SmtpSubmitter {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<SmtpTransport, SubmissionError> {
        let creds = Credentials::new(
            self.config.sender_address.clone(),
            self.config.sender_password.expose_secret().to_string(),
        );

        let builder = if self.config.smtp_port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&self.config.smtp_host)
        } else {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
        }
        .map_err(|e| SubmissionError::Smtp(format!("SMTP relay error: {e}")))?;

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(creds)
            .timeout(Some(self.config.timeout))
            .build())
    }

    /// Read the file and build the message addressed to `to_address`.
    async fn prepare(
        &self,
        file_path: &Path,
        to_address: &str,
    ) -> Result<(String, Message), SubmissionError> {
        let contents = tokio::fs::read(file_path).await.map_err(|source| {
            SubmissionError::ReadAttachment {
                path: file_path.display().to_string(),
                source,
            }
        })?;
        let file_name = attachment_name(file_path);
        let message = build_message(&self.config, to_address, &file_name, contents)?;
        Ok((file_name, message))
    }
}

/// Build the MIME message: plain-text body plus the file as an octet-stream attachment.
pub fn build_message(
    config: &EmailConfig,
    to_address: &str,
    file_name: &str,
    contents: Vec<u8>,
) -> Result<Message, SubmissionError> {
    let from: Mailbox = config
        .sender_address
        .parse()
        .map_err(|e| SubmissionError::InvalidAddress {
            field: "from".into(),
            reason: format!("{e}"),
        })?;
    let to: Mailbox = to_address
        .parse()
        .map_err(|e| SubmissionError::InvalidAddress {
            field: "to".into(),
            reason: format!("{e}"),
        })?;

    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| SubmissionError::Build(format!("content type: {e}")))?;
    let attachment = Attachment::new(file_name.to_string()).body(contents, content_type);

    Message::builder()
        .from(from)
        .to(to)
        .subject(config.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(config.body.clone()))
                .singlepart(attachment),
        )
        .map_err(|e| SubmissionError::Build(e.to_string()))
}

#[async_trait]
impl Submitter for SmtpSubmitter {
    async fn send_attachment(
        &self,
        file_path: &Path,
        to_address: &str,
    ) -> Result<DateTime<Utc>, SubmissionError> {
        let (file_name, message) = self.prepare(file_path, to_address).await?;
        let transport = self.transport()?;

        info!(
            file_name = %file_name,
            to = %to_address,
            smtp_host = %self.config.smtp_host,
            "Sending attachment"
        );

        let submitted_at = tokio::task::spawn_blocking(move || {
            transport
                .send(&message)
                .map(|_| Utc::now())
                .map_err(|e| SubmissionError::Smtp(e.to_string()))
        })
        .await
        .map_err(|e| SubmissionError::TaskFailed(e.to_string()))??;

        info!(submitted_at = %submitted_at, "Attachment delivered to SMTP relay");
        Ok(submitted_at)
    }
}
