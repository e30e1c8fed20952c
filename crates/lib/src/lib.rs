//! VetBot core library — config, gateway, LLM client, clinic tools, appointment recording
//! and the WhatsApp channel, used by the CLI.

pub mod agent;
pub mod appointments;
pub mod channels;
pub mod clinics;
pub mod config;
pub mod gateway;
pub mod llm;
pub mod sheets;
pub mod tools;

#[cfg(test)]
mod test_support;
