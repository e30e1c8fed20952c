//! Appointment recording: one spreadsheet row per scheduling request.
//!
//! Recording is a side effect of message handling. Failures are logged and reported as
//! [`RecordOutcome::Failed`]; they never abort the reply.

use crate::config::SheetsConfig;
use crate::sheets::{GoogleEndpoints, ServiceAccountKey, SheetsClient, SheetsError};
use async_trait::async_trait;

/// Timestamp layout written to the agenda.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One agenda row: when, who, and what they wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRecord {
    pub timestamp: String,
    pub phone: String,
    pub message: String,
}

impl AppointmentRecord {
    /// Record stamped with the current local time.
    pub fn now(phone: &str, message: &str) -> Self {
        Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            phone: phone.to_string(),
            message: message.to_string(),
        }
    }

    pub fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.phone.clone(),
            self.message.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Saved,
    Failed(String),
}

/// Persists appointment requests. Implementations must not return errors; they report an outcome.
#[async_trait]
pub trait AppointmentRecorder: Send + Sync {
    async fn record(&self, phone: &str, message: &str) -> RecordOutcome;
}

/// Appends records to a Google spreadsheet found by title.
pub struct SheetsRecorder {
    client: Option<SheetsClient>,
    spreadsheet_name: String,
}

impl SheetsRecorder {
    /// Build from config. Missing or unreadable credentials are logged here and every
    /// later `record` reports a failure.
    pub fn from_config(config: &SheetsConfig) -> Self {
        Self::from_config_with_endpoints(config, GoogleEndpoints::default())
    }

    pub fn from_config_with_endpoints(config: &SheetsConfig, endpoints: GoogleEndpoints) -> Self {
        let key = match load_key(config) {
            Ok(key) => {
                log::info!("sheets: using service account {}", key.client_email);
                Some(key)
            }
            Err(e) => {
                log::warn!("sheets: appointments will not be recorded: {}", e);
                None
            }
        };
        Self {
            client: key.map(|k| SheetsClient::with_endpoints(k, endpoints)),
            spreadsheet_name: config.spreadsheet_name.clone(),
        }
    }

    async fn append(&self, record: &AppointmentRecord) -> Result<(), SheetsError> {
        let client = self.client.as_ref().ok_or(SheetsError::NotConfigured)?;
        client
            .append_row_by_title(&self.spreadsheet_name, &record.row())
            .await
    }
}

/// Base64 blob wins over the key file path.
fn load_key(config: &SheetsConfig) -> Result<ServiceAccountKey, SheetsError> {
    if let Some(ref blob) = config.credentials_base64 {
        return ServiceAccountKey::from_base64(blob);
    }
    if let Some(ref path) = config.credentials_path {
        return ServiceAccountKey::from_file(path);
    }
    Err(SheetsError::NotConfigured)
}

#[async_trait]
impl AppointmentRecorder for SheetsRecorder {
    async fn record(&self, phone: &str, message: &str) -> RecordOutcome {
        let record = AppointmentRecord::now(phone, message);
        match self.append(&record).await {
            Ok(()) => {
                log::info!("appointment saved to spreadsheet \"{}\"", self.spreadsheet_name);
                RecordOutcome::Saved
            }
            Err(e) => {
                log::error!("error saving appointment to spreadsheet: {}", e);
                RecordOutcome::Failed(e.to_string())
            }
        }
    }
}
