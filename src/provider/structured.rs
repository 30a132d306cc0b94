use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{send_with_timeout, Endpoint, EndpointReply};
use crate::errors::PlanError;
use crate::wire::GenerateBody;

/// The app's own `/api/generate` route: takes `{prompt, system, model, schema}`
/// and performs the upstream call server side.
pub struct StructuredEndpoint {
    url: String,
    client: Client,
    timeout: Duration,
}

impl StructuredEndpoint {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self { url, client: Client::new(), timeout }
    }
}

#[async_trait]
impl Endpoint for StructuredEndpoint {
    fn name(&self) -> &str {
        "structured"
    }

    async fn call(&self, body: &GenerateBody) -> Result<EndpointReply, PlanError> {
        tracing::debug!(url = %self.url, "POST structured generate");
        send_with_timeout(self.client.post(&self.url).json(body), self.timeout).await
    }
}
