use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Missing GEMINI_API_KEY")] MissingApiKey,
    #[error("{0}")] InvalidRequest(String),
    #[error("{message}")] Upstream { status: u16, message: String },
    #[error("Empty response from Gemini")] EmptyResponse,
    #[error("Invalid plan format")] InvalidPlanFormat,
    #[error("request failed: {0}")] Transport(String),
    #[error("request timed out after {0:?}")] Timeout(Duration),
}

impl From<reqwest::Error> for PlanError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest errors can embed the request url, which carries the key
        PlanError::Transport(err.without_url().to_string())
    }
}
