//! Email delivery through SMTP or the Gmail REST API, with body truncation
//! to each transport's size limit.
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use digest_core::{truncate, TruncateOptions, Truncated};
use digest_logging::{digest_info, digest_warn};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Serialize;
use thiserror::Error;

use crate::api::{endpoint, ensure_success, map_reqwest_error, ApiError, ApiSettings};
use crate::credentials::{AuthError, CredentialProvider};

pub const SMTP_BODY_LIMIT: usize = 25_000;
pub const GMAIL_API_BODY_LIMIT: usize = 20_000;
pub const DEFAULT_GMAIL_BASE_URL: &str = "https://gmail.googleapis.com";
const GMAIL_SEND_PATH: &str = "gmail/v1/users/me/messages/send";
const TRUNCATION_REASON: &str = "email length limits";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment: Option<MailAttachment>,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address}: {message}")]
    Address { address: String, message: String },
    #[error("message has no recipients")]
    NoRecipients,
    #[error("cannot build message: {0}")]
    Build(String),
    #[error("smtp delivery failed: {0}")]
    Smtp(String),
    #[error("mail api request failed: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        message: e.to_string(),
    })
}

/// Builds the RFC 5322 message: plain UTF-8 body, optional binary attachment.
pub fn build_message(message: &OutgoingMessage) -> Result<Message, MailError> {
    if message.to.is_empty() {
        return Err(MailError::NoRecipients);
    }
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .subject(message.subject.clone());
    for recipient in &message.to {
        builder = builder.to(mailbox(recipient)?);
    }

    let built = match &message.attachment {
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone()),
        Some(attachment) => {
            let binary = ContentType::parse("application/octet-stream")
                .map_err(|e| MailError::Build(e.to_string()))?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(message.body.clone()))
                    .singlepart(
                        Attachment::new(attachment.filename.clone())
                            .body(attachment.data.clone(), binary),
                    ),
            )
        }
    };
    built.map_err(|e| MailError::Build(e.to_string()))
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &str;
    /// Longest body, in characters, this transport accepts.
    fn max_body_len(&self) -> usize;
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError>;
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub max_body_len: usize,
}

impl SmtpSettings {
    pub fn gmail(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: username.into(),
            password: password.into(),
            max_body_len: SMTP_BODY_LIMIT,
        }
    }
}

/// STARTTLS relay with login credentials (app password).
pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    fn max_body_len(&self) -> usize {
        self.settings.max_body_len
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        let email = build_message(message)?;
        let transport = SmtpTransport::starttls_relay(&self.settings.host)
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.username.clone(),
                self.settings.password.clone(),
            ))
            .build();

        // lettre's SmtpTransport is blocking.
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .map_err(|e| MailError::Smtp(e.to_string()))?;
        Ok(())
    }
}

#[derive(Serialize)]
struct RawMessage {
    raw: String,
}

/// Gmail `messages.send` with a bearer token from a credential provider.
pub struct GmailApiMailer {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
    max_body_len: usize,
}

impl GmailApiMailer {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        base_url: impl Into<String>,
        max_body_len: usize,
        settings: &ApiSettings,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: settings.build_client()?,
            base_url: base_url.into(),
            credentials,
            max_body_len,
        })
    }
}

#[async_trait]
impl MailTransport for GmailApiMailer {
    fn name(&self) -> &str {
        "gmail-api"
    }

    fn max_body_len(&self) -> usize {
        self.max_body_len
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        let raw = URL_SAFE.encode(build_message(message)?.formatted());
        let credential = self.credentials.valid_credential().await?;
        let response = self
            .client
            .post(endpoint(&self.base_url, GMAIL_SEND_PATH)?)
            .bearer_auth(&credential.access_token)
            .json(&RawMessage { raw })
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Outcome of [`deliver`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Name of the transport that accepted the message.
    pub transport: Option<String>,
    /// Body as handed to the successful transport.
    pub sent: Option<Truncated>,
    /// `(transport, error)` for each failed attempt, in order.
    pub failures: Vec<(String, String)>,
}

impl DeliveryReport {
    pub fn delivered(&self) -> bool {
        self.transport.is_some()
    }
}

/// Tries each transport in order until one accepts the message.
///
/// Each attempt truncates the original body to that transport's limit, so a
/// fallback transport never receives text already cut for a smaller one.
pub async fn deliver(
    transports: &[&dyn MailTransport],
    draft: &OutgoingMessage,
    boundary_floor: f64,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for transport in transports {
        let options = TruncateOptions::new(transport.max_body_len())
            .with_reason(TRUNCATION_REASON)
            .with_boundary_floor(boundary_floor);
        let body = truncate(&draft.body, &options);
        if body.was_truncated {
            digest_info!(
                "{}: body truncated from {} to {} characters",
                transport.name(),
                body.original_len,
                body.kept_len
            );
        }

        let message = OutgoingMessage {
            body: body.text.clone(),
            ..draft.clone()
        };
        match transport.send(&message).await {
            Ok(()) => {
                digest_info!(
                    "email sent via {} to {}",
                    transport.name(),
                    draft.to.join(", ")
                );
                report.transport = Some(transport.name().to_string());
                report.sent = Some(body);
                return report;
            }
            Err(err) => {
                digest_warn!("{} delivery failed: {err}", transport.name());
                report
                    .failures
                    .push((transport.name().to_string(), err.to_string()));
            }
        }
    }
    report
}
