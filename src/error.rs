use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Claude API error: {0}")]
    Claude(String),

    #[error("Missing API key. Set one of: ANTHROPIC_API_KEY, CLAUDE_API_KEY, or CLAUDE_KEY")]
    MissingApiKey,

    #[error("No translator configured; natural language requests need an API key")]
    NoTranslator,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Server error: {0}")]
    Server(String),
}
