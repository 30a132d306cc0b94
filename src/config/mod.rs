use anyhow::{Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub api_version: String,
    pub proxy_api_version: String,
    pub model: String,
    pub proxy_model: String,
    pub generate_url: String,
    pub proxy_url: String,
    pub bind: String,
    pub timeout_secs: u64,
    pub out_dir: String,
    /// Only ever read from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com".into(),
            api_version: "v1".into(),
            proxy_api_version: "v1beta".into(),
            model: "gemini-2.5-flash".into(),
            proxy_model: "gemini-1.5-flash".into(),
            generate_url: "http://127.0.0.1:8787/api/generate".into(),
            proxy_url: "http://127.0.0.1:8787/api/gemini-proxy".into(),
            bind: "127.0.0.1:8787".into(),
            timeout_secs: 120,
            out_dir: ".truflo/plans".into(),
            api_key: None,
        }
    }
}

// The key is redacted so the config can be logged whole.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("proxy_api_version", &self.proxy_api_version)
            .field("model", &self.model)
            .field("proxy_model", &self.proxy_model)
            .field("generate_url", &self.generate_url)
            .field("proxy_url", &self.proxy_url)
            .field("bind", &self.bind)
            .field("timeout_secs", &self.timeout_secs)
            .field("out_dir", &self.out_dir)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_toml(
                &fs::read_to_string(p).with_context(|| format!("reading config {}", p.display()))?,
            )
            .with_context(|| format!("parsing config {}", p.display()))?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay `GEMINI_API_KEY`, `GEMINI_API_BASE` and `TRUFLO_BIND`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        if let Some(key) = set(var("GEMINI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(base) = set(var("GEMINI_API_BASE")) {
            self.api_base = base;
        }
        if let Some(bind) = set(var("TRUFLO_BIND")) {
            self.bind = bind;
        }
    }
}
