//! Service-account key loading and access-token exchange.

use crate::sheets::SheetsError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Scopes needed to look up a spreadsheet by title and append to it.
pub const SHEETS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// The fields of a Google service-account JSON key that we use.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_json(json: &[u8]) -> Result<Self, SheetsError> {
        serde_json::from_slice(json).map_err(|e| SheetsError::Credentials(e.to_string()))
    }

    /// Decode a base64 blob holding the JSON key (as stored in GOOGLE_CREDENTIALS_BASE64).
    pub fn from_base64(blob: &str) -> Result<Self, SheetsError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(blob.trim().as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("base64: {}", e)))?;
        Self::from_json(&bytes)
    }

    pub fn from_file(path: &Path) -> Result<Self, SheetsError> {
        let bytes = std::fs::read(path)
            .map_err(|e| SheetsError::Credentials(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&bytes)
    }

    /// Signed RS256 assertion for the JWT bearer grant, valid for one hour from `now`.
    pub fn signed_assertion(&self, scopes: &[&str], now: i64) -> Result<String, SheetsError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: scopes.join(" "),
            aud: &self.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("private key: {}", e)))?;
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| SheetsError::Credentials(format!("signing assertion: {}", e)))
    }

    /// Exchange a signed assertion for an OAuth access token at `token_uri`.
    pub async fn fetch_access_token(
        &self,
        client: &reqwest::Client,
        scopes: &[&str],
    ) -> Result<String, SheetsError> {
        let assertion = self.signed_assertion(scopes, chrono::Utc::now().timestamp())?;
        let res = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SheetsError::Api(format!("token exchange: {} {}", status, body)));
        }
        let data: TokenResponse = res.json().await?;
        data.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SheetsError::Api("token exchange: no access_token in response".to_string()))
    }
}
