use std::time::Duration;

use lettre::{
    Message, SmtpTransport, Transport,
    address::AddressError,
    message::{Mailbox, MultiPart},
    transport::smtp::{self, authentication::Credentials},
};
use thiserror::Error;
use tracing::info;

use crate::{config::Config, digest::Digest, paper::Paper};

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("no papers to send")]
    Empty,
    #[error("invalid email address {value:?}")]
    Address {
        value: String,
        #[source]
        source: AddressError,
    },
    #[error("failed to build message")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed")]
    Transport(#[from] smtp::Error),
}

/// Delivers a digest of papers.
pub trait Mailer {
    fn send_digest(&self, papers: &[Paper]) -> Result<(), MailError>;
}

/// Sends digests through an SMTP relay with STARTTLS.
pub struct SmtpMailer {
    host: String,
    port: u16,
    user: String,
    password: String,
    from: String,
    to: String,
}

impl SmtpMailer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            user: config.smtp_user.clone(),
            password: config.smtp_password.expose().to_string(),
            from: config.email_from.clone(),
            to: config.email_to.clone(),
        }
    }

    fn message(&self, digest: Digest) -> Result<Message, MailError> {
        Ok(Message::builder()
            .from(mailbox(&self.from)?)
            .to(mailbox(&self.to)?)
            .subject(digest.subject)
            .multipart(MultiPart::alternative_plain_html(digest.plain, digest.html))?)
    }
}

fn mailbox(value: &str) -> Result<Mailbox, MailError> {
    value.trim().parse().map_err(|source| MailError::Address {
        value: value.to_string(),
        source,
    })
}

impl Mailer for SmtpMailer {
    fn send_digest(&self, papers: &[Paper]) -> Result<(), MailError> {
        let digest = Digest::compose(papers).ok_or(MailError::Empty)?;
        let message = self.message(digest)?;

        let mut builder = SmtpTransport::starttls_relay(&self.host)?
            .port(self.port)
            .timeout(Some(TIMEOUT));
        if !self.user.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.user.clone(),
                self.password.clone(),
            ));
        }
        builder.build().send(&message)?;

        info!(host = %self.host, count = papers.len(), "digest sent");
        Ok(())
    }
}
