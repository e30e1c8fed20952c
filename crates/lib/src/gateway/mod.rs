//! Gateway: HTTP webhook server.
//!
//! Single port serves the provider webhook (`/webhook-incoming`), the direct message
//! endpoint (`/webhook`), the clinic directory and a health probe.

mod protocol;
mod server;

pub use protocol::{Ack, DirectMessage, ErrorBody, VerifyQuery};
pub use server::{router, run_gateway, run_resolved_gateway, GatewayError, GatewayState};
