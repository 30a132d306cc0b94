use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "truflo", version, about = "Generate gamified daily task plans with an LLM")]
pub struct Args {
    /// TOML config file; environment and flags override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a multi-day plan
    Plan(PlanArgs),
    /// Break one task into 15-45 minute subtasks
    Subtasks(SubtaskArgs),
    /// Run the generate proxy
    Serve {
        #[arg(long, env = "TRUFLO_BIND")]
        bind: Option<String>,
    },
    /// List upstream models available to the configured key
    Models,
    /// Send a minimal request upstream and report the outcome
    Check,
}

#[derive(ClapArgs, Debug)]
pub struct PlanArgs {
    /// What you want to get done
    #[arg(long)]
    pub goal: String,

    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,

    /// Daily window, e.g. "6:00 pm - 8:30 pm" or "18:00-20:30"
    #[arg(long)]
    pub window: String,

    /// e.g. stressed, tired, in flow
    #[arg(long)]
    pub mood: Option<String>,

    /// Call the upstream API with the local key instead of the proxy
    #[arg(long, default_value_t = false)]
    pub direct: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Keep request and plan JSON under the configured out_dir
    #[arg(long, default_value_t = false)]
    pub save: bool,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug)]
pub struct SubtaskArgs {
    #[arg(long)]
    pub task: String,

    /// Preferred focus length in minutes
    #[arg(long, default_value_t = 25)]
    pub focus: u32,

    #[arg(long, default_value_t = false)]
    pub direct: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}
