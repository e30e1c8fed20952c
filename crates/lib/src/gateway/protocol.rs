//! Gateway HTTP payloads.

use serde::{Deserialize, Serialize};

/// Query of the webhook verification GET (`hub.mode`, `hub.verify_token`, `hub.challenge`).
/// All fields are optional so a bare GET reaches the handler and gets a 403.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Body of POST /webhook: `{ "phone", "message" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
    pub phone: String,
    pub message: String,
}

/// Error body: `{ "message": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement for provider deliveries that carry no message: `{ "status": "ok" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
