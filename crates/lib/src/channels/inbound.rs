//! Inbound message from a channel: handed to the agent for a reply.

/// A message from a chat user. The phone is an opaque sender id (not validated).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub phone: String,
    pub text: String,
}

impl InboundMessage {
    pub fn new(phone: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            text: text.into(),
        }
    }
}
