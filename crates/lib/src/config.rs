//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.vetbot/config.json`) and environment.
//! Secrets normally come from the environment; the file holds everything else.
//! [`Config::resolve`] applies env overrides once at startup and the resulting
//! [`ResolvedConfig`] is handed to each component.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Eres VetBot, un asistente de una clínica veterinaria.";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Language-model backend (OpenAI-compatible chat completions).
    #[serde(default)]
    pub llm: LlmConfig,

    /// WhatsApp Cloud API settings for outbound replies.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Google Sheets settings for the appointment agenda.
    #[serde(default)]
    pub sheets: SheetsConfig,
}

/// Bind, port and webhook verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Shared secret echoed by Meta during the webhook handshake. Overridden by VETBOT_VERIFY_TOKEN env.
    #[serde(default = "default_verify_token")]
    pub verify_token: String,

    /// Allow any origin (used by the web front end). Default: true.
    #[serde(default = "default_true")]
    pub cors_allow_all: bool,
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_verify_token() -> String {
    "vetbot123".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            verify_token: default_verify_token(),
            cors_allow_all: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// OpenAI-compatible API base, including the version segment (default "https://api.openai.com/v1").
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model id passed as-is to the backend.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key. Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,

    /// Persona sent as the system message on every turn.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4-1106-preview".to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    /// Bearer token for the Graph API. Overridden by WHATSAPP_ACCESS_TOKEN env.
    pub access_token: Option<String>,

    /// Business phone number id. Overridden by WHATSAPP_PHONE_ID env.
    pub phone_number_id: Option<String>,

    /// Graph API version segment (default "v17.0").
    #[serde(default = "default_whatsapp_api_version")]
    pub api_version: String,

    /// Graph API host (default "https://graph.facebook.com").
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,
}

fn default_whatsapp_api_version() -> String {
    "v17.0".to_string()
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            api_version: default_whatsapp_api_version(),
            api_base: default_whatsapp_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetsConfig {
    /// Base64 of the service-account JSON key. Overridden by GOOGLE_CREDENTIALS_BASE64 env.
    pub credentials_base64: Option<String>,

    /// Path to a service-account JSON key file. Used only when no base64 blob is set.
    pub credentials_path: Option<PathBuf>,

    /// Spreadsheet title to open (default "Agenda VetBot").
    #[serde(default = "default_spreadsheet_name")]
    pub spreadsheet_name: String,
}

fn default_spreadsheet_name() -> String {
    "Agenda VetBot".to_string()
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            credentials_base64: None,
            credentials_path: None,
            spreadsheet_name: default_spreadsheet_name(),
        }
    }
}

/// Config with env overrides applied. Built once at startup and passed to components.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub gateway: GatewayConfig,
    pub llm: LlmConfig,
    pub whatsapp: WhatsAppConfig,
    pub sheets: SheetsConfig,
}

/// Trimmed, non-empty value of an env var.
fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Env value wins over the config value; both are trimmed and empty strings count as unset.
fn override_with(env: Option<String>, configured: Option<&String>) -> Option<String> {
    env.or_else(|| {
        configured
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

impl Config {
    /// Apply environment overrides for secrets and the verify token.
    pub fn resolve(&self) -> ResolvedConfig {
        self.resolve_with(env_non_empty)
    }

    /// Same as [`Config::resolve`] with a custom env lookup (tests).
    pub fn resolve_with<F>(&self, env: F) -> ResolvedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut gateway = self.gateway.clone();
        if let Some(token) = env("VETBOT_VERIFY_TOKEN") {
            gateway.verify_token = token;
        }

        let mut llm = self.llm.clone();
        llm.api_key = override_with(env("OPENAI_API_KEY"), self.llm.api_key.as_ref());

        let mut whatsapp = self.whatsapp.clone();
        whatsapp.access_token = override_with(
            env("WHATSAPP_ACCESS_TOKEN"),
            self.whatsapp.access_token.as_ref(),
        );
        whatsapp.phone_number_id = override_with(
            env("WHATSAPP_PHONE_ID"),
            self.whatsapp.phone_number_id.as_ref(),
        );

        let mut sheets = self.sheets.clone();
        sheets.credentials_base64 = override_with(
            env("GOOGLE_CREDENTIALS_BASE64"),
            self.sheets.credentials_base64.as_ref(),
        );

        ResolvedConfig {
            gateway,
            llm,
            whatsapp,
            sheets,
        }
    }
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("VETBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".vetbot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, VETBOT_CONFIG_PATH, or the default location. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Write a default config file (no secrets) if none exists. Returns true when a file was created.
pub fn init_config_file(path: &std::path::Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let body = serde_json::to_string_pretty(&Config::default())?;
    std::fs::write(path, body)
        .with_context(|| format!("writing default config to {}", path.display()))?;
    log::info!("created default config at {}", path.display());
    Ok(true)
}
