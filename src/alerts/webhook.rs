//! Generic JSON webhook delivery.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;

use super::NotificationChannel;

pub struct WebhookChannel {
    client: Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, subject: &str, body: &str) -> anyhow::Result<()> {
        let payload = json!({
            "subject": subject,
            "message": body,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "webhook endpoint returned status {}",
                response.status()
            ));
        }

        Ok(())
    }
}
