use async_trait::async_trait;
use base64::Engine as _;
use reqwest::RequestBuilder;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::errors::PlanError;
use crate::extract::extract_json;
use crate::wire::{error_message, GenerateBody, GenerateContentResponse, InlineData, Part};

pub mod gemini;
pub mod raw_proxy;
pub mod structured;

/// Status and decoded body of one endpoint exchange. A body that is not JSON
/// is kept as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointReply {
    pub status: u16,
    pub body: Value,
}

impl EndpointReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One way of reaching a text-generation backend.
#[async_trait]
pub trait Endpoint: Send + Sync {
    fn name(&self) -> &str;
    async fn call(&self, body: &GenerateBody) -> Result<EndpointReply, PlanError>;
}

pub type DynEndpoint = Box<dyn Endpoint + Send + Sync>;

/// Ordered list of endpoint strategies. The next one is tried only when the
/// current one answers 404.
pub struct GenerationClient {
    endpoints: Vec<DynEndpoint>,
}

impl GenerationClient {
    pub fn new(endpoints: Vec<DynEndpoint>) -> Self {
        Self { endpoints }
    }

    pub async fn call(&self, body: &GenerateBody) -> Result<EndpointReply, PlanError> {
        let last = self.endpoints.len().saturating_sub(1);
        for (i, ep) in self.endpoints.iter().enumerate() {
            let reply = ep.call(body).await?;
            tracing::debug!(endpoint = ep.name(), status = reply.status, "generation endpoint replied");
            if reply.status == 404 && i < last {
                tracing::info!(endpoint = ep.name(), "endpoint not found, trying next strategy");
                continue;
            }
            return Ok(reply);
        }
        Err(PlanError::InvalidRequest("no generation endpoint configured".into()))
    }

    /// Call and decode the reply into a JSON object or array.
    pub async fn generate_json(&self, body: &GenerateBody) -> Result<Value, PlanError> {
        let reply = self.call(body).await?;
        decode_reply(&reply)
    }
}

/// Build the strategy list from configuration: the direct upstream API when
/// `direct`, otherwise the structured endpoint with the raw proxy behind it.
pub fn make_client(cfg: &Config, direct: bool) -> Result<GenerationClient, PlanError> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let endpoints: Vec<DynEndpoint> = if direct {
        let api = gemini::GeminiApi::from_config(cfg)?;
        vec![Box::new(gemini::DirectEndpoint::new(api, cfg.api_version.clone(), cfg.model.clone()))]
    } else {
        vec![
            Box::new(structured::StructuredEndpoint::new(cfg.generate_url.clone(), timeout)),
            Box::new(raw_proxy::RawProxyEndpoint::new(cfg.proxy_url.clone(), timeout)),
        ]
    };
    Ok(GenerationClient::new(endpoints))
}

/// Send `req`, bounding the whole exchange (connect, headers, body) by `timeout`.
pub(crate) async fn send_with_timeout(req: RequestBuilder, timeout: Duration) -> Result<EndpointReply, PlanError> {
    let exchange = async {
        // reqwest's own deadline is a backstop; the outer timeout reports first
        let resp = req.timeout(timeout + Duration::from_secs(1)).send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        Ok::<_, PlanError>(EndpointReply {
            status,
            body: serde_json::from_str(&text).unwrap_or(Value::Null),
        })
    };
    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| PlanError::Timeout(timeout))?
}

/// Reject non-2xx replies with the upstream's own message, otherwise parse the
/// generateContent envelope.
pub fn check_reply(reply: &EndpointReply) -> Result<GenerateContentResponse, PlanError> {
    if !reply.is_success() {
        let message = error_message(&reply.body).unwrap_or_else(|| "Gemini error".to_string());
        tracing::warn!(status = reply.status, %message, "generation request failed");
        return Err(PlanError::Upstream { status: reply.status, message });
    }
    Ok(serde_json::from_value(reply.body.clone()).unwrap_or_default())
}

pub fn decode_reply(reply: &EndpointReply) -> Result<Value, PlanError> {
    let resp = check_reply(reply)?;
    decode_parts(resp.parts())
}

/// Inline base64 JSON wins; otherwise the joined text is parsed directly, then
/// searched with the extractor.
pub fn decode_parts(parts: &[Part]) -> Result<Value, PlanError> {
    if parts.is_empty() {
        return Err(PlanError::EmptyResponse);
    }

    let inline = parts
        .iter()
        .filter_map(|p| p.inline_data.as_ref())
        .find(|d| d.mime_type.to_ascii_lowercase().starts_with("application/json"));
    if let Some(v) = inline.and_then(decode_inline) {
        return Ok(v);
    }

    let text = joined_text(parts);
    serde_json::from_str::<Value>(text.trim())
        .ok()
        .filter(is_structured)
        .or_else(|| extract_json(&text).filter(is_structured))
        .ok_or_else(|| {
            tracing::warn!(chars = text.len(), "no JSON object or array in model output");
            PlanError::InvalidPlanFormat
        })
}

pub fn joined_text(parts: &[Part]) -> String {
    parts
        .iter()
        .map(|p| p.text.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_inline(data: &InlineData) -> Option<Value> {
    let compact: String = data.data.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn is_structured(v: &Value) -> bool {
    v.is_object() || v.is_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ok_reply(parts: Value) -> EndpointReply {
        EndpointReply {
            status: 200,
            body: json!({"candidates": [{"content": {"role": "model", "parts": parts}}]}),
        }
    }

    #[test]
    fn inline_base64_json_is_preferred() {
        let data = base64::engine::general_purpose::STANDARD.encode(r#"{"plan_title":"inline"}"#);
        let reply = ok_reply(json!([
            {"text": "{\"plan_title\":\"text\"}"},
            {"inlineData": {"mimeType": "application/json", "data": data}}
        ]));
        assert_eq!(decode_reply(&reply).unwrap(), json!({"plan_title": "inline"}));
    }

    #[test]
    fn broken_inline_falls_back_to_text() {
        let reply = ok_reply(json!([
            {"inlineData": {"mimeType": "application/json", "data": "!!!"}},
            {"text": "Here:\n```json\n{\"days\": []}\n```"}
        ]));
        assert_eq!(decode_reply(&reply).unwrap(), json!({"days": []}));
    }

    #[test]
    fn text_parts_are_joined_before_parsing() {
        let reply = ok_reply(json!([{"text": "[{\"title\":"}, {"text": "\"a\"}]"}]));
        assert_eq!(decode_reply(&reply).unwrap(), json!([{"title": "a"}]));
    }

    #[test]
    fn empty_parts_signal_empty_response() {
        assert_eq!(decode_reply(&ok_reply(json!([]))), Err(PlanError::EmptyResponse));
        let no_candidates = EndpointReply { status: 200, body: json!({"candidates": []}) };
        assert_eq!(decode_reply(&no_candidates), Err(PlanError::EmptyResponse));
        let not_json = EndpointReply { status: 200, body: Value::Null };
        assert_eq!(decode_reply(&not_json), Err(PlanError::EmptyResponse));
    }

    #[test]
    fn prose_without_json_is_invalid_format() {
        let reply = ok_reply(json!([{"text": "I cannot help with that."}]));
        assert_eq!(decode_reply(&reply), Err(PlanError::InvalidPlanFormat));
        let scalar = ok_reply(json!([{"text": "42"}]));
        assert_eq!(decode_reply(&scalar), Err(PlanError::InvalidPlanFormat));
    }

    #[test]
    fn upstream_errors_surface_their_message() {
        let reply = EndpointReply { status: 429, body: json!({"error": {"message": "Resource exhausted"}}) };
        assert_eq!(
            decode_reply(&reply),
            Err(PlanError::Upstream { status: 429, message: "Resource exhausted".into() })
        );
        let bare = EndpointReply { status: 502, body: Value::Null };
        assert_eq!(decode_reply(&bare).unwrap_err().to_string(), "Gemini error");
    }

    struct Canned {
        name: &'static str,
        status: u16,
        hits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Endpoint for Canned {
        fn name(&self) -> &str {
            self.name
        }
        async fn call(&self, _body: &GenerateBody) -> Result<EndpointReply, PlanError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(EndpointReply { status: self.status, body: json!({"from": self.name}) })
        }
    }

    fn canned(name: &'static str, status: u16) -> (DynEndpoint, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        (Box::new(Canned { name, status, hits: hits.clone() }), hits)
    }

    fn body() -> GenerateBody {
        GenerateBody::from_value(&json!({"prompt": "p"})).unwrap()
    }

    #[tokio::test]
    async fn falls_back_only_on_not_found() {
        let (a, a_hits) = canned("primary", 404);
        let (b, b_hits) = canned("fallback", 200);
        let reply = GenerationClient::new(vec![a, b]).call(&body()).await.unwrap();
        assert_eq!(reply.body, json!({"from": "fallback"}));
        assert_eq!(a_hits.load(Ordering::SeqCst), 1);
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn other_failures_short_circuit() {
        let (a, _) = canned("primary", 500);
        let (b, b_hits) = canned("fallback", 200);
        let reply = GenerationClient::new(vec![a, b]).call(&body()).await.unwrap();
        assert_eq!(reply.status, 500);
        assert_eq!(b_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn last_not_found_is_returned_as_is() {
        let (a, _) = canned("primary", 404);
        let (b, _) = canned("fallback", 404);
        let reply = GenerationClient::new(vec![a, b]).call(&body()).await.unwrap();
        assert_eq!(reply.body, json!({"from": "fallback"}));
        assert!(GenerationClient::new(vec![]).call(&body()).await.is_err());
    }
}
