use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// ========================================
/// Upstream generation API (generateContent)
/// ========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }
}

/// Base64 payload tagged with a media type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<Value>,
}

impl GenerateContentRequest {
    /// Single user turn: optional system text first, then the prompt.
    pub fn user_turn(system: Option<&str>, prompt: String, generation_config: Option<Value>) -> Self {
        let mut parts = Vec::with_capacity(2);
        if let Some(sys) = system.map(str::trim).filter(|s| !s.is_empty()) {
            parts.push(Part::text(sys));
        }
        parts.push(Part::text(prompt));
        Self {
            contents: vec![Content { role: Some("user".into()), parts }],
            generation_config,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate; empty when there is none.
    pub fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }
}

/// ========================================
/// Proxy contract (/api/generate)
/// ========================================

/// Body accepted by the structured generate endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Either a pre-serialized schema string or a schema object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<Value>,
}

impl GenerateBody {
    /// Loose reading of a client body: wrong-typed optional fields are ignored,
    /// a missing or non-string prompt is the only rejection.
    pub fn from_value(v: &Value) -> Option<Self> {
        let prompt = v.get("prompt")?.as_str().filter(|p| !p.is_empty())?.to_string();
        let string_field = |k: &str| v.get(k).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            prompt,
            model: string_field("model").filter(|m| !m.is_empty()),
            system: string_field("system"),
            schema: v.get("schema").filter(|s| s.is_string() || s.is_object()).cloned(),
            generation_config: v.get("generationConfig").filter(|g| g.is_object()).cloned(),
        })
    }

    /// Prompt text with the schema appended when one was supplied.
    pub fn prompt_with_schema(&self) -> String {
        match &self.schema {
            Some(Value::String(s)) => crate::prompt::append_schema(&self.prompt, s),
            Some(other) => crate::prompt::append_schema(&self.prompt, &other.to_string()),
            None => self.prompt.clone(),
        }
    }

    pub fn into_upstream(self) -> GenerateContentRequest {
        let prompt = self.prompt_with_schema();
        GenerateContentRequest::user_turn(self.system.as_deref(), prompt, self.generation_config)
    }
}

/// `{ "error": { "message": ... } }`
pub fn error_envelope(message: &str) -> Value {
    json!({ "error": { "message": message } })
}

/// Pull a human-readable message out of an error body, whatever its shape.
pub fn error_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(err) => err.get("message").and_then(Value::as_str).map(str::to_string),
        None => None,
    }
}
