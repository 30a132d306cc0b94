use anyhow::Context;
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::plan::{Plan, PlanRequest};
use crate::prompt::PromptBundle;

/// Default directives for this crate and the HTTP trace layer.
fn default_filter(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("{}={level},tower_http={level}", env!("CARGO_CRATE_NAME"))
}

/// `RUST_LOG` wins; otherwise info, or debug with `--debug`. Logs go to
/// stderr so `--format json` output on stdout stays clean.
pub fn init_tracing(debug: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug).into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

pub struct SavedPaths {
    pub dir: PathBuf,
    pub request: PathBuf,
    pub plan: PathBuf,
}

#[derive(Serialize)]
struct RequestArtifact<'a> {
    run_id: Uuid,
    timestamp: DateTime<Utc>,
    model: &'a str,
    request: &'a PlanRequest,
    prompt: &'a PromptBundle,
}

fn run_dir(out_dir: &Path, run: Uuid) -> PathBuf {
    out_dir.join(run.to_string())
}

/// Write `request.json` and `plan.json` for one run under `out_dir/<run>/`.
pub fn save_generation(
    out_dir: &Path,
    run: Uuid,
    model: &str,
    req: &PlanRequest,
    prompt: &PromptBundle,
    plan: &Plan,
) -> anyhow::Result<SavedPaths> {
    let dir = run_dir(out_dir, run);
    fs::create_dir_all(&dir)?;

    let artifact = RequestArtifact { run_id: run, timestamp: Utc::now(), model, request: req, prompt };
    let request = dir.join("request.json");
    write_atomic(&request, &serde_json::to_vec_pretty(&artifact)?)?;

    let plan_path = dir.join("plan.json");
    write_atomic(&plan_path, &serde_json::to_vec_pretty(plan)?)?;

    tracing::debug!(dir = %dir.display(), "saved generation artifacts");
    Ok(SavedPaths { dir, request, plan: plan_path })
}

/// Temp file in the destination directory, persisted over the target.
fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.persist(path)
        .with_context(|| format!("persisting {}", path.display()))?;
    Ok(())
}

pub fn print_saved_paths(saved: &SavedPaths) {
    println!("saved run artifacts in {}", saved.dir.display());
    println!("  request: {}", saved.request.display());
    println!("  plan:    {}", saved.plan.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{normalize, TimeWindow};
    use serde_json::{json, Value};

    #[test]
    fn default_filter_targets_this_crate() {
        let crate_root = module_path!().split("::").next().unwrap();
        assert_eq!(default_filter(false), format!("{crate_root}=info,tower_http=info"));
        assert_eq!(default_filter(true), format!("{crate_root}=debug,tower_http=debug"));
        let directive = default_filter(true).parse::<EnvFilter>();
        assert!(directive.is_ok());
    }

    #[test]
    fn artifacts_are_written_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let req = PlanRequest::new("Run a 5k", 1, TimeWindow::parse("6am - 7am").unwrap(), None).unwrap();
        let prompt = crate::prompt::build(&req);
        let plan = normalize(json!({"days": [[{"title": "Jog"}]]}), "Run a 5k").unwrap();
        let run = Uuid::new_v4();

        let saved = save_generation(dir.path(), run, "gemini-2.5-flash", &req, &prompt, &plan).unwrap();
        assert_eq!(saved.dir, dir.path().join(run.to_string()));

        let written: Plan = serde_json::from_str(&fs::read_to_string(&saved.plan).unwrap()).unwrap();
        assert_eq!(written, plan);
        let request: Value = serde_json::from_str(&fs::read_to_string(&saved.request).unwrap()).unwrap();
        assert_eq!(request["run_id"], run.to_string());
        assert_eq!(request["request"]["day_count"], 1);
        assert_eq!(request["model"], "gemini-2.5-flash");
    }
}
