//! Mail transport.
//!
//! [`SmtpMailer`] sends each digest as a `multipart/alternative` message with
//! a single HTML part over an authenticated STARTTLS session. [`LogMailer`]
//! stands in for it on dry runs.

use crate::config::Config;
use crate::error::DeliveryError;
use crate::utils::truncate_for_log;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

/// One rendered digest, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingDigest {
    pub from_addr: String,
    pub from_name: String,
    pub to_addr: String,
    pub subject: String,
    pub body: String,
}

/// Something that can deliver a digest.
pub trait Mailer {
    async fn send(&self, digest: &OutgoingDigest) -> Result<(), DeliveryError>;
}

/// Build the MIME message for `digest`.
pub fn build_message(digest: &OutgoingDigest) -> Result<Message, DeliveryError> {
    let mail_err = |reason: String| DeliveryError::Mail {
        to: digest.to_addr.clone(),
        reason,
    };
    let from = Mailbox::new(
        Some(digest.from_name.clone()),
        digest
            .from_addr
            .parse()
            .map_err(|e| mail_err(format!("bad sender address: {e}")))?,
    );
    let to: Mailbox = digest
        .to_addr
        .parse()
        .map_err(|e| mail_err(format!("bad recipient address: {e}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(digest.subject.clone())
        .multipart(MultiPart::alternative().singlepart(SinglePart::html(digest.body.clone())))
        .map_err(|e| mail_err(e.to_string()))
}

/// Authenticated SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &Config) -> Result<Self, DeliveryError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| DeliveryError::Mail {
                to: config.smtp_host.clone(),
                reason: e.to_string(),
            })?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.smtp_timeout))
            .build();
        Ok(Self { transport })
    }
}

impl Mailer for SmtpMailer {
    #[instrument(level = "info", skip_all, fields(to = %digest.to_addr))]
    async fn send(&self, digest: &OutgoingDigest) -> Result<(), DeliveryError> {
        let message = build_message(digest)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Mail {
                to: digest.to_addr.clone(),
                reason: e.to_string(),
            })?;
        info!(code = %response.code(), "Digest sent");
        Ok(())
    }
}

/// Logs digests instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    #[instrument(level = "info", skip_all, fields(to = %digest.to_addr))]
    async fn send(&self, digest: &OutgoingDigest) -> Result<(), DeliveryError> {
        // still build the message so address problems show up on dry runs
        build_message(digest)?;
        info!(
            subject = %digest.subject,
            body = %truncate_for_log(&digest.body, 500),
            "Dry run: digest not sent"
        );
        Ok(())
    }
}

/// The transport picked at startup.
#[derive(Clone)]
pub enum Transport {
    Smtp(SmtpMailer),
    Log(LogMailer),
}

impl Transport {
    pub fn from_config(config: &Config) -> Result<Self, DeliveryError> {
        if config.dry_run {
            Ok(Self::Log(LogMailer))
        } else {
            SmtpMailer::new(config).map(Self::Smtp)
        }
    }
}

impl Mailer for Transport {
    async fn send(&self, digest: &OutgoingDigest) -> Result<(), DeliveryError> {
        match self {
            Self::Smtp(m) => m.send(digest).await,
            Self::Log(m) => m.send(digest).await,
        }
    }
}
