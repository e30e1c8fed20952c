//! WhatsApp channel: Cloud API `messages` endpoint for replies and the webhook envelope Meta POSTs.

use crate::channels::inbound::InboundMessage;
use crate::channels::messenger::{DeliveryOutcome, Messenger};
use crate::config::WhatsAppConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    #[error("whatsapp {0} not configured")]
    NotConfigured(&'static str),
    #[error("whatsapp request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Webhook delivery envelope (message notifications and status callbacks share this shape).
/// Only `entry[0].changes[0].value.messages[0]` is read; everything around it stays untyped
/// so a malformed sibling entry or message does not hide the first one.
#[derive(Debug, Deserialize)]
pub struct WhatsAppWebhook {
    #[serde(default)]
    pub entry: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    #[serde(default)]
    pub text: Option<WebhookText>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookText {
    pub body: String,
}

impl WhatsAppWebhook {
    /// Sender and text of `entry[0].changes[0].value.messages[0]`, or None when the delivery
    /// carries no text message (status updates, media, missing sender).
    pub fn first_text_message(&self) -> Option<InboundMessage> {
        let first = self
            .entry
            .first()?
            .get("changes")?
            .get(0)?
            .get("value")?
            .get("messages")?
            .get(0)?;
        let message = WebhookMessage::deserialize(first).ok()?;
        let text = message.text?;
        Some(InboundMessage::new(message.from, text.body))
    }
}

#[derive(Debug, Serialize)]
struct OutboundText<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    typ: &'static str,
    text: OutboundTextBody<'a>,
}

#[derive(Debug, Serialize)]
struct OutboundTextBody<'a> {
    body: &'a str,
}

/// WhatsApp Cloud API connector for outbound text messages.
pub struct WhatsAppChannel {
    id: String,
    access_token: Option<String>,
    phone_number_id: Option<String>,
    api_base: String,
    api_version: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            id: "whatsapp".to_string(),
            access_token: config.access_token.clone(),
            phone_number_id: config.phone_number_id.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_version: config.api_version.trim_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// POST /{version}/{phone_number_id}/messages with a text body. Returns (status, raw body) for any HTTP answer.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<(u16, String), WhatsAppError> {
        let token = self
            .access_token
            .as_ref()
            .ok_or(WhatsAppError::NotConfigured("access token"))?;
        let phone_number_id = self
            .phone_number_id
            .as_ref()
            .ok_or(WhatsAppError::NotConfigured("phone number id"))?;
        let url = format!(
            "{}/{}/{}/messages",
            self.api_base, self.api_version, phone_number_id
        );
        let payload = OutboundText {
            messaging_product: "whatsapp",
            to,
            typ: "text",
            text: OutboundTextBody { body: text },
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Ok((status, body))
    }
}

#[async_trait]
impl Messenger for WhatsAppChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, recipient: &str, text: &str) -> DeliveryOutcome {
        match self.send_text(recipient, text).await {
            Ok((status, body)) => {
                log::info!("whatsapp send status: {}", status);
                log::info!("whatsapp send response: {}", body);
                if (200..300).contains(&status) {
                    DeliveryOutcome::Delivered { status, body }
                } else {
                    DeliveryOutcome::Failed(format!("{} {}", status, body))
                }
            }
            Err(e) => {
                log::warn!("whatsapp send to {} failed: {}", recipient, e);
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }
}
