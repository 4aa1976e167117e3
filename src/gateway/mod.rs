//! HTTP gateway: chat and history endpoints plus static assets.
//!
//! Routes:
//! - `POST /api/chat`: text prompt with session memory
//! - `POST /api/chat-with-file`: multipart upload (image or document)
//! - `POST /api/clear-history`
//! - `GET  /api/history`
//! - `GET  /health`
//!
//! Anything else is looked up under `gateway.static_dir`.

pub mod api;
pub mod static_files;

use crate::config::{Config, GenerationDefaults};
use crate::prompt::Persona;
use crate::providers::{self, Provider};
use crate::session::{self, SessionStore};
use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub type SharedState = Arc<AppState>;

/// Everything a request handler needs. Lives as long as the server.
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub persona: Persona,
    pub defaults: GenerationDefaults,
    pub default_session_id: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        persona: Persona,
        defaults: GenerationDefaults,
        default_session_id: impl Into<String>,
    ) -> SharedState {
        Arc::new(Self {
            store,
            provider,
            model: model.into(),
            persona,
            defaults,
            default_session_id: default_session_id.into(),
        })
    }

    /// Build state from config: provider, store and persona.
    pub fn from_config(config: &Config) -> Result<SharedState> {
        let provider: Arc<dyn Provider> = Arc::from(providers::create_provider(
            &config.provider.name,
            config.provider.api_key.as_deref(),
            config.provider.base_url.as_deref(),
            config.provider.timeout(),
        )?);
        let store: Arc<dyn SessionStore> =
            Arc::from(session::create_session_store(config.session.max_turns)?);
        let persona = Persona::from_config(&config.prompt)?;

        Ok(Self::new(
            store,
            provider,
            config.provider.model.clone(),
            persona,
            config.generation,
            config.session.default_session_id.clone(),
        ))
    }

    /// Requested session id, or the default when absent or blank.
    pub fn session_id(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.default_session_id)
            .to_string()
    }
}

/// Build the axum router with all gateway routes.
pub fn build_router(state: SharedState, static_dir: &Path, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route("/chat", post(api::handle_chat))
        .route("/chat-with-file", post(api::handle_chat_with_file))
        .route("/clear-history", post(api::handle_clear_history))
        .route("/history", get(api::handle_history))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(handle_health))
        .with_state(state)
        .nest("/api", api)
        .fallback_service(static_files::static_service(static_dir))
        .layer(TraceLayer::new_for_http())
}

async fn handle_health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.model,
        "provider": state.provider.name(),
        "sessionStore": state.store.name(),
    }))
}

/// Bind, serve until Ctrl+C.
pub async fn run_gateway(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;

    if !state.provider.has_credentials() {
        tracing::warn!(
            "No API key configured for provider {}; chat requests will fail until GEMINI_API_KEY is set",
            state.provider.name()
        );
    }
    if !config.gateway.static_dir.is_dir() {
        tracing::warn!(
            "Static directory {} does not exist, only API routes will respond",
            config.gateway.static_dir.display()
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;
    let local = listener.local_addr()?;

    tracing::info!("🚀 ProBot server running on http://{local}");
    tracing::info!("📋 Persona: {}", state.persona.source);
    tracing::info!("🤖 Model: {} via {}", state.model, state.provider.name());
    tracing::info!(
        "🧠 Sessions: {} (max {} turns, default id \"{}\")",
        state.store.name(),
        config.session.max_turns,
        state.default_session_id
    );

    let app = build_router(
        state,
        &config.gateway.static_dir,
        config.gateway.max_upload_bytes,
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
