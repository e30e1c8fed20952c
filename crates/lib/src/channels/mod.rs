//! Messaging channels (WhatsApp Cloud API).
//!
//! [`Messenger`] is the outbound seam used by the agent; [`WhatsAppChannel`] implements it.
//! Inbound webhook payloads are parsed into [`InboundMessage`].

mod inbound;
mod messenger;
mod whatsapp;

pub use inbound::InboundMessage;
pub use messenger::{DeliveryOutcome, Messenger};
pub use whatsapp::{WhatsAppChannel, WhatsAppError, WhatsAppWebhook};
