use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

mod cli;
mod config;
mod errors;
mod extract;
mod log;
mod plan;
mod planner;
mod prompt;
mod provider;
mod server;
mod ux;
mod wire;

use cli::{Command, OutputFormat};
use provider::gemini::GeminiApi;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is a dev convenience; absence is fine
    let _ = dotenvy::dotenv();
    let args = cli::Args::parse();
    log::init_tracing(args.debug, args.log_json);

    let mut cfg = config::Config::load(args.config.as_deref())?;
    if let Some(model) = &args.model {
        cfg.model = model.clone();
    }
    if let Some(secs) = args.timeout_secs {
        cfg.timeout_secs = secs;
    }
    tracing::debug!(?cfg, "configuration loaded");

    match args.command {
        Command::Plan(p) => run_plan(&cfg, p).await,
        Command::Subtasks(s) => run_subtasks(&cfg, s).await,
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.bind = bind;
            }
            server::serve(cfg).await
        }
        Command::Models => run_models(&cfg).await,
        Command::Check => run_check(&cfg).await,
    }
}

async fn run_plan(cfg: &config::Config, args: cli::PlanArgs) -> Result<()> {
    let window = plan::TimeWindow::parse(&args.window)?;
    let req = plan::PlanRequest::new(args.goal, args.days, window, args.mood)?;
    let client = provider::make_client(cfg, args.direct)?;

    let progress = args.format == OutputFormat::Pretty && !args.no_progress;
    let pb = ux::spinner(&format!("Planning {} within {}", req.duration_label(), req.window), progress);
    let result = planner::generate_plan(&client, &req, &cfg.model).await;
    pb.finish_and_clear();
    let generated = result.context("plan generation failed")?;

    emit(&generated, args.format, ux::show_plan)?;

    if args.save {
        let run = Uuid::new_v4();
        let saved = log::save_generation(
            Path::new(&cfg.out_dir),
            run,
            &cfg.model,
            &req,
            &prompt::build(&req),
            &generated,
        )?;
        log::print_saved_paths(&saved);
    }
    Ok(())
}

async fn run_subtasks(cfg: &config::Config, args: cli::SubtaskArgs) -> Result<()> {
    let client = provider::make_client(cfg, args.direct)?;
    let subtasks = planner::generate_subtasks(&client, &args.task, args.focus, &cfg.model)
        .await
        .context("subtask generation failed")?;
    emit(&subtasks, args.format, |s| ux::show_subtasks(&args.task, s))
}

fn emit<T: Serialize + ?Sized>(value: &T, format: OutputFormat, pretty: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Pretty => pretty(value),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

async fn run_models(cfg: &config::Config) -> Result<()> {
    let api = GeminiApi::from_config(cfg)?;
    let (v1, v1beta) = futures::join!(api.list_models("v1"), api.list_models("v1beta"));
    for (version, reply) in [("v1", v1), ("v1beta", v1beta)] {
        let reply = reply.with_context(|| format!("listing {version} models"))?;
        println!("version {version} status {}", reply.status);
        if !reply.is_success() {
            println!("error {}", reply.body);
            continue;
        }
        let names: Vec<&str> = reply.body["models"]
            .as_array()
            .map(|m| m.iter().filter_map(|m| m["name"].as_str()).collect())
            .unwrap_or_default();
        println!("count {}", names.len());
        println!("sample {:?}", names.iter().take(10).collect::<Vec<_>>());
    }
    Ok(())
}

async fn run_check(cfg: &config::Config) -> Result<()> {
    let api = GeminiApi::from_config(cfg)?;
    let payload = wire::GenerateContentRequest::user_turn(
        None,
        "Return a JSON object with key message set to Hello.".to_string(),
        None,
    );
    let reply = api.generate(&cfg.api_version, &cfg.model, &payload).await?;

    println!("status {}", reply.status);
    let keys: Vec<&String> = reply.body.as_object().map(|o| o.keys().collect()).unwrap_or_default();
    println!("keys {:?}", keys);
    if reply.is_success() {
        let text = provider::joined_text(provider::check_reply(&reply)?.parts());
        println!("response {}", text.trim());
    } else {
        println!("error {}", reply.body.get("error").unwrap_or(&Value::Null));
    }
    Ok(())
}
