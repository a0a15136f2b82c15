//! Outbound notification sink.
//!
//! The contact form hands a composed message to a [`Mailer`]; delivery
//! mechanics stay behind the trait. Production uses SMTP via lettre, dev
//! setups without SMTP configured fall back to logging the message.

use anyhow::Context;
use lettre::{
    Message, SmtpTransport, Transport,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

pub trait Mailer: Send + Sync {
    /// Blocking send; callers on the async runtime wrap this in
    /// `spawn_blocking`.
    fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
    to: String,
}

impl SmtpMailer {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .context("SMTP_HOST is not set")?;

        let mut builder = SmtpTransport::starttls_relay(host)?.port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.mail_from.clone(),
            to: config.contact_inbox.clone(),
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let mut builder = Message::builder()
            .from(self.from.parse()?)
            .to(self.to.parse()?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN);
        if let Some(reply_to) = mail.reply_to {
            builder = builder.reply_to(reply_to.parse()?);
        }
        let message = builder.body(mail.body)?;

        self.transport.send(&message)?;
        Ok(())
    }
}

/// Fallback sink for environments without SMTP; the message is traced so the
/// contact flow stays observable.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        tracing::info!(
            subject = %mail.subject,
            reply_to = mail.reply_to.as_deref().unwrap_or("-"),
            body = %mail.body,
            "smtp not configured; contact mail logged"
        );
        Ok(())
    }
}

/// Test sink that records what would have been sent.
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().expect("mailer lock").push(mail);
        Ok(())
    }
}
