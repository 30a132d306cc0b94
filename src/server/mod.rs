use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::errors::PlanError;
use crate::provider::gemini::GeminiApi;
use crate::provider::EndpointReply;
use crate::wire::GenerateBody;

mod error;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    /// `None` when no key is configured; every generate call then answers 500.
    pub upstream: Option<GeminiApi>,
    pub cfg: Arc<Config>,
}

impl AppState {
    pub fn from_config(cfg: Config) -> Self {
        let upstream = GeminiApi::from_config(&cfg).ok();
        if upstream.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; generate requests will fail");
        }
        Self { upstream, cfg: Arc::new(cfg) }
    }

    fn upstream(&self) -> Result<&GeminiApi, AppError> {
        self.upstream.as_ref().ok_or(AppError::Plan(PlanError::MissingApiKey))
    }
}

/// `/api/generate` (structured) and `/api/gemini-proxy` (raw pass-through),
/// POST only, with permissive CORS headers on every response.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/generate",
            post(generate).options(preflight).fallback(method_not_allowed),
        )
        .route(
            "/api/gemini-proxy",
            post(gemini_proxy).options(preflight).fallback(method_not_allowed),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::overriding(
                    ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static("POST, OPTIONS"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static("Content-Type, Authorization"),
                )),
        )
        .with_state(state)
}

pub async fn serve(cfg: Config) -> Result<()> {
    let bind = cfg.bind.clone();
    let app = router(AppState::from_config(cfg));
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!(addr = %bind, "proxy listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("server error")
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

fn parse_body(body: &Bytes) -> Result<Value, AppError> {
    if body.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|_| AppError::BadRequest("Invalid JSON body".into()))
}

async fn generate(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let api = state.upstream()?;
    let value = parse_body(&body)?;
    let req = GenerateBody::from_value(&value)
        .ok_or_else(|| AppError::BadRequest("prompt (string) is required".into()))?;

    let model = req.model.clone().unwrap_or_else(|| state.cfg.model.clone());
    let reply = api.generate(&state.cfg.api_version, &model, &req.into_upstream()).await?;

    if !reply.is_success() {
        tracing::error!(status = reply.status, %model, "upstream rejected generate request");
        let error = reply.body.get("error").cloned().unwrap_or(reply.body.clone());
        return Ok(with_status(reply.status, json!({ "error": error })));
    }
    Ok(with_status(reply.status, reply.body))
}

async fn gemini_proxy(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let api = state.upstream()?;
    let value = parse_body(&body)?;
    let EndpointReply { status, body } = api
        .generate(&state.cfg.proxy_api_version, &state.cfg.proxy_model, &value)
        .await?;
    Ok(with_status(status, body))
}

fn with_status(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(body)).into_response()
}
