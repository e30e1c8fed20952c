//! Gateway HTTP server: provider webhook, direct message endpoint, clinic directory.

use crate::agent::Agent;
use crate::appointments::SheetsRecorder;
use crate::channels::{InboundMessage, WhatsAppChannel, WhatsAppWebhook};
use crate::clinics::{self, Clinic};
use crate::config::{self, Config, ResolvedConfig};
use crate::gateway::protocol::{Ack, DirectMessage, ErrorBody, VerifyQuery};
use crate::llm::{LlmError, OpenAiClient};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared per-process state. Requests never mutate it.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<ResolvedConfig>,
    pub agent: Agent,
}

impl GatewayState {
    /// Wire the production collaborators: OpenAI-compatible backend, Sheets recorder, WhatsApp messenger.
    pub fn from_config(config: ResolvedConfig) -> Self {
        let backend = Arc::new(OpenAiClient::new(
            Some(config.llm.base_url.clone()),
            config.llm.api_key.clone(),
        ));
        let recorder = Arc::new(SheetsRecorder::from_config(&config.sheets));
        let messenger = Arc::new(WhatsAppChannel::new(&config.whatsapp));
        let agent = Agent::new(
            backend,
            config.llm.model.clone(),
            config.llm.system_prompt.clone(),
            recorder,
            messenger,
        );
        Self {
            config: Arc::new(config),
            agent,
        }
    }
}

/// Errors that end a request with 500. Details go to the log, never to the client.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model backend: {0}")]
    Model(#[from] LlmError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        log::error!("request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new("Internal Server Error")),
        )
            .into_response()
    }
}

/// All routes, with permissive CORS when `gateway.corsAllowAll` is set.
pub fn router(state: GatewayState) -> Router {
    let cors_allow_all = state.config.gateway.cors_allow_all;
    let app = Router::new()
        .route("/", get(health_http))
        .route("/webhook", post(direct_webhook))
        .route(
            "/webhook-incoming",
            get(verify_webhook).post(incoming_webhook),
        )
        .route("/api/clinicas", get(list_clinics))
        .with_state(state);
    if cors_allow_all {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Env overrides are applied first. Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    run_resolved_gateway(config.resolve()).await
}

/// Same as [`run_gateway`] for a config whose env overrides are already applied.
pub async fn run_resolved_gateway(resolved: ResolvedConfig) -> Result<()> {
    let bind = resolved.gateway.bind.trim().to_string();
    if !config::is_loopback_bind(&bind) {
        log::warn!(
            "gateway bound to non-loopback address {}; the webhook is protected only by the verify token",
            bind
        );
    }
    if resolved.llm.api_key.is_none() {
        log::warn!("no model API key configured (set llm.apiKey or OPENAI_API_KEY)");
    }
    if resolved.whatsapp.access_token.is_none() || resolved.whatsapp.phone_number_id.is_none() {
        log::warn!("whatsapp credentials incomplete; replies will not be delivered");
    }
    log::info!(
        "model {} at {}",
        resolved.llm.model,
        resolved.llm.base_url
    );

    let port = resolved.gateway.port;
    let app = router(GatewayState::from_config(resolved));

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "service": "vetbot",
        "port": state.config.gateway.port,
    }))
}

/// GET /webhook-incoming — subscription handshake. Echoes the challenge as a JSON integer.
async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let authorized = query.mode.as_deref() == Some("subscribe")
        && query.verify_token.as_deref() == Some(state.config.gateway.verify_token.as_str());
    if !authorized {
        log::warn!("webhook verification rejected (mode {:?})", query.mode);
        return (StatusCode::FORBIDDEN, Json(ErrorBody::new("Invalid token"))).into_response();
    }
    match query
        .challenge
        .as_deref()
        .and_then(|c| c.trim().parse::<i64>().ok())
    {
        Some(challenge) => {
            log::info!("webhook verified");
            Json(challenge).into_response()
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("Invalid challenge")),
        )
            .into_response(),
    }
}

/// POST /webhook-incoming — provider delivery. Anything that is not a text message, and any
/// processing failure, is acknowledged with `{"status":"ok"}` so the provider does not retry.
async fn incoming_webhook(State(state): State<GatewayState>, body: Bytes) -> Response {
    let webhook: WhatsAppWebhook = match serde_json::from_slice(&body) {
        Ok(w) => w,
        Err(e) => {
            log::warn!("webhook-incoming: unreadable delivery: {}", e);
            return Json(Ack::ok()).into_response();
        }
    };
    let Some(inbound) = webhook.first_text_message() else {
        log::debug!("webhook-incoming: delivery without text message");
        return Json(Ack::ok()).into_response();
    };
    log::info!("webhook-incoming: message from {}", inbound.phone);
    match state.agent.handle(&inbound).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            log::error!("webhook-incoming: processing message from {} failed: {}", inbound.phone, e);
            Json(Ack::ok()).into_response()
        }
    }
}

/// POST /webhook — `{phone, message}` in, `{reply, to}` out.
async fn direct_webhook(
    State(state): State<GatewayState>,
    Json(body): Json<DirectMessage>,
) -> Result<Json<crate::agent::AgentReply>, GatewayError> {
    log::info!("webhook: message from {}", body.phone);
    let inbound = InboundMessage::new(body.phone, body.message);
    Ok(Json(state.agent.handle(&inbound).await?))
}

/// GET /api/clinicas — static clinic list.
async fn list_clinics() -> Json<Vec<Clinic>> {
    Json(clinics::all_clinics())
}
