use serde_json::Value;

use crate::errors::PlanError;
use crate::extract::extract_json;
use crate::plan::{self, Plan, PlanRequest, Subtask};
use crate::prompt::{self, PromptBundle};
use crate::provider::{check_reply, joined_text, GenerationClient};
use crate::wire::GenerateBody;

const DEFAULT_SUBTASK_MINUTES: i64 = 30;

/// Body for the structured endpoint; the schema travels pre-serialized.
pub fn plan_body(bundle: &PromptBundle, model: &str) -> GenerateBody {
    GenerateBody {
        prompt: bundle.prompt.clone(),
        model: Some(model.to_string()),
        system: Some(bundle.system.clone()),
        schema: Some(Value::String(bundle.schema.to_string())),
        generation_config: None,
    }
}

/// One full request/response cycle: prompt, call (with the single 404
/// fallback), decode, normalize, truncate to the requested day count.
pub async fn generate_plan(
    client: &GenerationClient,
    req: &PlanRequest,
    model: &str,
) -> Result<Plan, PlanError> {
    let bundle = prompt::build(req);
    let raw = client.generate_json(&plan_body(&bundle, model)).await?;

    let mut plan = plan::normalize(raw, &plan::title_prefix(&req.user_input))?;
    let requested = req.day_count as usize;
    if plan.days.len() > requested {
        tracing::info!(returned = plan.days.len(), requested, "model returned extra days, truncating");
        plan.truncate_days(requested);
    }
    tracing::info!(days = plan.days.len(), tasks = plan.summary.total_tasks, xp = plan.summary.total_xp, "plan generated");
    Ok(plan)
}

/// Break one task into 15-45 minute pieces. A reply that holds no JSON array
/// yields an empty list rather than an error.
pub async fn generate_subtasks(
    client: &GenerationClient,
    task_description: &str,
    focus_minutes: u32,
    model: &str,
) -> Result<Vec<Subtask>, PlanError> {
    let body = GenerateBody {
        prompt: prompt::subtask_prompt(task_description, focus_minutes),
        model: Some(model.to_string()),
        system: None,
        schema: None,
        generation_config: None,
    };
    let reply = client.call(&body).await?;
    let resp = check_reply(&reply)?;
    let text = joined_text(resp.parts());

    Ok(match extract_json(&text) {
        Some(Value::Array(items)) => items.into_iter().filter_map(subtask_of).collect(),
        _ => {
            tracing::warn!("subtask reply held no JSON array");
            Vec::new()
        }
    })
}

fn subtask_of(v: Value) -> Option<Subtask> {
    let title = v.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }
    let est_minutes = v
        .get("estMinutes")
        .and_then(|m| m.as_i64().or_else(|| m.as_f64().map(|f| f.round() as i64)))
        .unwrap_or(DEFAULT_SUBTASK_MINUTES);
    let difficulty = v
        .get("difficulty")
        .and_then(Value::as_i64)
        .map(|d| d.clamp(1, 3) as u8)
        .unwrap_or(1);
    Some(Subtask { title: title.to_string(), est_minutes, difficulty })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Difficulty, TimeWindow};
    use crate::provider::raw_proxy::RawProxyEndpoint;
    use crate::provider::structured::StructuredEndpoint;
    use crate::provider::DynEndpoint;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn text_reply(text: &str) -> Value {
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
    }

    fn client_for(server: &MockServer) -> GenerationClient {
        let timeout = Duration::from_secs(5);
        let endpoints: Vec<DynEndpoint> = vec![
            Box::new(StructuredEndpoint::new(format!("{}/api/generate", server.uri()), timeout)),
            Box::new(RawProxyEndpoint::new(format!("{}/api/gemini-proxy", server.uri()), timeout)),
        ];
        GenerationClient::new(endpoints)
    }

    fn request(days: u32) -> PlanRequest {
        PlanRequest::new("Ship my portfolio site", days, TimeWindow::parse("7pm - 9pm").unwrap(), None).unwrap()
    }

    #[tokio::test]
    async fn extra_days_are_truncated_in_order() {
        let server = MockServer::start().await;
        let raw = json!({
            "plan_title": "Portfolio sprint",
            "days": [
                {"day_title": "One", "tasks": [{"title": "a", "difficulty": "Hard", "duration": 50}]},
                {"day_title": "Two", "tasks": [{"title": "b", "difficulty": "Medium", "duration": 40}]},
                {"day_title": "Three", "tasks": [{"title": "c", "duration": 20}]}
            ]
        });
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(&raw.to_string())))
            .mount(&server)
            .await;

        let plan = generate_plan(&client_for(&server), &request(2), "gemini-2.5-flash").await.unwrap();
        let titles: Vec<_> = plan.days.iter().map(|d| d.day_title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
        assert_eq!(plan.summary.total_tasks, 2);
        assert_eq!(plan.summary.total_xp, 50);
        assert_eq!(plan.summary.total_time, 90);
    }

    #[tokio::test]
    async fn not_found_primary_uses_raw_proxy() {
        let server = MockServer::start().await;
        Mock::given(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/gemini-proxy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(
                "Sure!\n```json\n{\"days\":[{\"tasks\":[{\"title\":\"x\"}]}]}\n```",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let plan = generate_plan(&client_for(&server), &request(1), "m").await.unwrap();
        assert_eq!(plan.plan_title, "Ship my portfolio site Plan");
        let task = &plan.days[0].tasks[0];
        assert_eq!(plan.days[0].day_title, "Day 1");
        assert_eq!((task.difficulty, task.xp, task.duration), (Difficulty::Easy, 10, 30));
        assert_eq!(plan.summary.total_xp, 10);
    }

    #[tokio::test]
    async fn upstream_error_message_propagates() {
        let server = MockServer::start().await;
        Mock::given(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "Missing GEMINI_API_KEY"}})))
            .mount(&server)
            .await;

        let err = generate_plan(&client_for(&server), &request(1), "m").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing GEMINI_API_KEY");
    }

    #[tokio::test]
    async fn unusable_text_is_invalid_format() {
        let server = MockServer::start().await;
        Mock::given(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("no plan today")))
            .mount(&server)
            .await;

        let err = generate_plan(&client_for(&server), &request(1), "m").await.unwrap_err();
        assert_eq!(err, PlanError::InvalidPlanFormat);
    }

    #[tokio::test]
    async fn subtasks_are_coerced_and_non_arrays_are_empty() {
        let server = MockServer::start().await;
        Mock::given(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(
                r#"Here: [{"title":"Outline","estMinutes":20,"difficulty":1},{"title":"Draft","estMinutes":"lots","difficulty":9},{"nope":1}]"#,
            )))
            .mount(&server)
            .await;

        let subtasks = generate_subtasks(&client_for(&server), "Write intro", 25, "m").await.unwrap();
        assert_eq!(
            subtasks,
            vec![
                Subtask { title: "Outline".into(), est_minutes: 20, difficulty: 1 },
                Subtask { title: "Draft".into(), est_minutes: 30, difficulty: 3 },
            ]
        );

        let other = MockServer::start().await;
        Mock::given(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("{\"title\": \"single\"}")))
            .mount(&other)
            .await;
        assert!(generate_subtasks(&client_for(&other), "x", 25, "m").await.unwrap().is_empty());
    }
}
