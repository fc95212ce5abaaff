//! SMTP delivery via lettre.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;

use super::NotificationChannel;

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: String,
}

impl EmailChannel {
    /// Credentials come from the config file or, failing that, the
    /// EMAIL_USER / EMAIL_PASSWORD environment variables. Without a
    /// complete set of credentials the channel is not constructed.
    pub fn from_config(config: &EmailConfig) -> anyhow::Result<Self> {
        let username = config
            .username
            .clone()
            .or_else(|| std::env::var("EMAIL_USER").ok())
            .ok_or_else(|| anyhow!("no SMTP username configured (EMAIL_USER unset)"))?;
        let password = config
            .password
            .clone()
            .or_else(|| std::env::var("EMAIL_PASSWORD").ok())
            .ok_or_else(|| anyhow!("no SMTP password configured (EMAIL_PASSWORD unset)"))?;

        let from = config.from.clone().unwrap_or_else(|| username.clone());
        let to = config
            .to
            .clone()
            .ok_or_else(|| anyhow!("no alert recipient configured"))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, subject: &str, body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.parse().context("invalid sender address")?)
            .to(self.to.parse().context("invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(email).await?;
        Ok(())
    }
}
