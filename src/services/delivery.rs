//! Report delivery: SMTP with the PDF attached, or a local outbox directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::info;

use crate::config::SmtpSettings;
use crate::storage::sanitize_component;

/// Subject of every delivered report.
pub const REPORT_SUBJECT: &str = "Your Brand Visibility Report";

const REPORT_BODY: &str = "Attached is your automatically generated brand visibility report.";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Report file not found: {0}")]
    MissingReport(PathBuf),

    #[error("Invalid email address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Delivery task failed: {0}")]
    Task(String),
}

/// Sends a finished report to a recipient.
#[async_trait]
pub trait ReportDelivery: Send + Sync {
    async fn deliver(&self, recipient: &str, report: &Path, subject: &str) -> Result<(), DeliveryError>;
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: address.to_string(),
            message: e.to_string(),
        })
}

/// Build the message: a short text part plus the PDF attachment.
pub fn build_message(
    from: &str,
    recipient: &str,
    subject: &str,
    file_name: &str,
    pdf: Vec<u8>,
) -> Result<Message, DeliveryError> {
    let pdf_type =
        ContentType::parse("application/pdf").map_err(|e| DeliveryError::Message(e.to_string()))?;
    Message::builder()
        .from(parse_mailbox(from)?)
        .to(parse_mailbox(recipient)?)
        .subject(subject)
        .multipart(
            MultiPart::mixed()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(REPORT_BODY.to_string()),
                )
                .singlepart(Attachment::new(file_name.to_string()).body(pdf, pdf_type)),
        )
        .map_err(|e| DeliveryError::Message(e.to_string()))
}

/// STARTTLS relay with optional login.
pub struct SmtpDelivery {
    settings: SmtpSettings,
}

impl SmtpDelivery {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ReportDelivery for SmtpDelivery {
    async fn deliver(&self, recipient: &str, report: &Path, subject: &str) -> Result<(), DeliveryError> {
        if !report.is_file() {
            return Err(DeliveryError::MissingReport(report.to_path_buf()));
        }
        let pdf = tokio::fs::read(report).await.map_err(|source| DeliveryError::Io {
            path: report.to_path_buf(),
            source,
        })?;
        let file_name = report
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "report.pdf".to_string());
        let message = build_message(&self.settings.from, recipient, subject, &file_name, pdf)?;

        let settings = self.settings.clone();
        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || {
            let mut builder = SmtpTransport::starttls_relay(&settings.host)
                .map_err(|e| DeliveryError::Smtp(e.to_string()))?
                .port(settings.port);
            if let (Some(user), Some(password)) = (settings.username, settings.password) {
                builder = builder.credentials(Credentials::new(user, password));
            }
            builder
                .build()
                .send(&message)
                .map(|_| ())
                .map_err(|e| DeliveryError::Smtp(e.to_string()))
        })
        .await
        .map_err(|e| DeliveryError::Task(e.to_string()))??;

        info!("Report sent to {}", recipient);
        Ok(())
    }
}

/// Copies reports into a local directory instead of sending them.
pub struct OutboxDelivery {
    dir: PathBuf,
}

impl OutboxDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where a report for `recipient` lands.
    pub fn target(&self, recipient: &str, report: &Path) -> PathBuf {
        let name = report
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "report.pdf".to_string());
        self.dir
            .join(sanitize_component(recipient))
            .join(name)
    }
}

#[async_trait]
impl ReportDelivery for OutboxDelivery {
    async fn deliver(&self, recipient: &str, report: &Path, subject: &str) -> Result<(), DeliveryError> {
        if !report.is_file() {
            return Err(DeliveryError::MissingReport(report.to_path_buf()));
        }
        parse_mailbox(recipient)?;

        let target = self.target(recipient, report);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DeliveryError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::copy(report, &target)
            .await
            .map_err(|source| DeliveryError::Io {
                path: target.clone(),
                source,
            })?;
        info!("'{}' for {} placed in {}", subject, recipient, target.display());
        Ok(())
    }
}
