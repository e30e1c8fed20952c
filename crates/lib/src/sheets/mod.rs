//! Google Sheets access for the appointment agenda.
//!
//! Authenticates with a service-account key (JWT bearer grant), finds a spreadsheet by
//! title through the Drive API and appends rows to its first worksheet.

mod client;
mod credentials;

pub use client::{GoogleEndpoints, SheetsClient};
pub use credentials::{ServiceAccountKey, SHEETS_SCOPES};

#[cfg(test)]
pub(crate) use credentials::tests::test_key_json;

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("spreadsheet credentials not configured")]
    NotConfigured,
    #[error("invalid service account credentials: {0}")]
    Credentials(String),
    #[error("google request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("google api error: {0}")]
    Api(String),
    #[error("spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),
}
