use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;

use super::{send_with_timeout, Endpoint, EndpointReply};
use crate::config::Config;
use crate::errors::PlanError;
use crate::wire::GenerateBody;

/// Thin client for the upstream generative-language REST API. The key travels
/// as the `key` query parameter and is never logged.
#[derive(Clone)]
pub struct GeminiApi {
    client: Client,
    base: String,
    key: String,
    timeout: Duration,
}

impl GeminiApi {
    pub fn new(base: impl Into<String>, key: impl Into<String>, timeout: Duration) -> Self {
        Self { client: Client::new(), base: base.into(), key: key.into(), timeout }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, PlanError> {
        let key = cfg.api_key.clone().filter(|k| !k.is_empty()).ok_or(PlanError::MissingApiKey)?;
        Ok(Self::new(cfg.api_base.clone(), key, Duration::from_secs(cfg.timeout_secs)))
    }

    fn url(&self, segments: &[&str]) -> Result<Url, PlanError> {
        let mut url = Url::parse(&self.base)
            .map_err(|e| PlanError::InvalidRequest(format!("bad api base '{}': {e}", self.base)))?;
        url.path_segments_mut()
            .map_err(|_| PlanError::InvalidRequest(format!("api base '{}' cannot take a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// POST `payload` to `{base}/{version}/models/{model}:generateContent`.
    pub async fn generate<T: Serialize + ?Sized>(
        &self,
        version: &str,
        model: &str,
        payload: &T,
    ) -> Result<EndpointReply, PlanError> {
        let action = format!("{model}:generateContent");
        let url = self.url(&[version, "models", &action])?;
        tracing::debug!(path = url.path(), "POST upstream generateContent");
        let req = self.client.post(url).query(&[("key", &self.key)]).json(payload);
        send_with_timeout(req, self.timeout).await
    }

    /// GET `{base}/{version}/models`.
    pub async fn list_models(&self, version: &str) -> Result<EndpointReply, PlanError> {
        let url = self.url(&[version, "models"])?;
        tracing::debug!(path = url.path(), "GET upstream models");
        send_with_timeout(self.client.get(url).query(&[("key", &self.key)]), self.timeout).await
    }
}

/// Talks to the upstream API directly with a local key, skipping the proxy.
pub struct DirectEndpoint {
    api: GeminiApi,
    version: String,
    default_model: String,
}

impl DirectEndpoint {
    pub fn new(api: GeminiApi, version: String, default_model: String) -> Self {
        Self { api, version, default_model }
    }
}

#[async_trait]
impl Endpoint for DirectEndpoint {
    fn name(&self) -> &str {
        "direct"
    }

    async fn call(&self, body: &GenerateBody) -> Result<EndpointReply, PlanError> {
        let model = body.model.clone().unwrap_or_else(|| self.default_model.clone());
        let payload = body.clone().into_upstream();
        self.api.generate(&self.version, &model, &payload).await
    }
}
