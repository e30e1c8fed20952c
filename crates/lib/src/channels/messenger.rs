//! Outbound messaging seam.

use async_trait::async_trait;

/// Result of one send attempt. Callers may inspect it for logging; they never fail on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Provider answered 2xx; raw response body kept for diagnostics.
    Delivered { status: u16, body: String },
    /// Transport error, missing credentials, or non-2xx from the provider.
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Sends a text message to a recipient (e.g. a WhatsApp phone number).
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Channel id (e.g. "whatsapp").
    fn id(&self) -> &str;
    async fn send(&self, recipient: &str, text: &str) -> DeliveryOutcome;
}
