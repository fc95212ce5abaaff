//! Alerting: notification channels and the dispatch actor.
//!
//! Threshold breaches detected during ingestion are handed to an
//! [`actor::AlertActor`] over a bounded channel; the actor applies
//! per-(server, metric) suppression and fans the remaining events out
//! to every configured [`NotificationChannel`].

pub mod actor;
pub mod email;
pub mod webhook;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::AlertsConfig;
use crate::detector::AnomalySet;
use crate::store::ServerIdentity;

/// A threshold breach on one server, ready to notify about.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub server: ServerIdentity,
    pub anomalies: AnomalySet,
    pub timestamp: String,
}

/// Something that can deliver an alert to the outside world.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Fans a single event out to all configured channels. Delivery errors
/// are logged and swallowed; alerting never fails ingestion.
pub struct AlertDispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl AlertDispatcher {
    pub fn from_config(config: &AlertsConfig) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = vec![];

        if let Some(email_config) = &config.email {
            match email::EmailChannel::from_config(email_config) {
                Ok(channel) => channels.push(Box::new(channel)),
                Err(e) => warn!("email alerts disabled: {e}"),
            }
        }

        if let Some(webhook) = &config.webhook {
            channels.push(Box::new(webhook::WebhookChannel::new(webhook.url.clone())));
        }

        if channels.is_empty() {
            info!("no notification channels configured, alerts will only be logged");
        }

        Self { channels }
    }

    pub fn with_channels(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    pub async fn dispatch(&self, event: &AlertEvent) {
        let subject = format!("Server Alert: {}", event.server.hostname);
        let body = format_alert_message(event);

        info!(
            server_id = %event.server.server_id,
            "dispatching alert: {}",
            event
                .anomalies
                .entries()
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ")
        );

        for channel in &self.channels {
            if let Err(e) = channel.send(&subject, &body).await {
                error!("failed to deliver alert via {}: {e}", channel.name());
            }
        }
    }
}

/// Human-readable alert body naming the server and each breaching metric.
pub fn format_alert_message(event: &AlertEvent) -> String {
    let mut message = format!(
        "Anomalies detected on {} ({}) at {}\nOS: {}\n\n",
        event.server.hostname, event.server.ip_address, event.timestamp, event.server.os_info,
    );

    for (name, value) in event.anomalies.entries() {
        message.push_str(&format!("  {name}: {value}\n"));
    }

    message
}
