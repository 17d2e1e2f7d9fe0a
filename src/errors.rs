//! Crate-wide error type.
//!
//! Every fallible core API returns `Result<T, BctbError>`. Conversions from
//! `std::io::Error`, `serde_json::Error`, and `reqwest::Error` are derived
//! where the mapping is unambiguous; call sites that need the same
//! underlying error to become a different variant (e.g. a JSON parse
//! failure while reading the workspace config vs. while parsing agent
//! output) construct the variant explicitly instead of relying on `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BctbError {
    #[error("config error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error("LLM provider error: {0}")]
    Llm(String),

    #[error("{0}")]
    Output(String),

    #[error("{0}")]
    State(String),

    #[error("action dispatch error: {0}")]
    Action(String),

    #[error("{0}")]
    RuntimeSafety(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BctbError>;

impl BctbError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }
    pub fn telemetry(msg: impl Into<String>) -> Self {
        Self::Telemetry(msg.into())
    }
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
    pub fn action(msg: impl Into<String>) -> Self {
        Self::Action(msg.into())
    }
    pub fn runtime_safety(msg: impl Into<String>) -> Self {
        Self::RuntimeSafety(msg.into())
    }
}
