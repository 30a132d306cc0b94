use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{send_with_timeout, Endpoint, EndpointReply};
use crate::errors::PlanError;
use crate::wire::GenerateBody;

/// Dev fallback: a pass-through proxy that expects the upstream
/// `generateContent` payload itself, schema inlined into the prompt text.
pub struct RawProxyEndpoint {
    url: String,
    client: Client,
    timeout: Duration,
}

impl RawProxyEndpoint {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self { url, client: Client::new(), timeout }
    }
}

#[async_trait]
impl Endpoint for RawProxyEndpoint {
    fn name(&self) -> &str {
        "raw-proxy"
    }

    async fn call(&self, body: &GenerateBody) -> Result<EndpointReply, PlanError> {
        // the proxy pins its own model; generationConfig is not forwarded
        let mut body = body.clone();
        body.model = None;
        body.generation_config = None;
        let payload = body.into_upstream();
        tracing::debug!(url = %self.url, "POST raw generate proxy");
        send_with_timeout(self.client.post(&self.url).json(&payload), self.timeout).await
    }
}
