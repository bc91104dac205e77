// claude integration - turns plain english into sql

use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::schema::Schema;

const MODEL: &str = "claude-sonnet-4-20250514";
const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anything that can turn a natural-language request into SQL.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: &str, schema: &Schema) -> Result<String, Error>;
}

pub struct Claude {
    client: reqwest::Client,
    api_key: String,
}

// what we send to claude
#[derive(Serialize)]
struct Request {
    model: &'static str,
    max_tokens: u32,
    messages: Vec<Message>,
    system: String,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

// what claude sends back
#[derive(Deserialize)]
struct Response {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    text: String,
}

impl Claude {
    /// Use the given key, or fall back to the common env var names.
    pub fn new(api_key: Option<String>) -> Result<Self, Error> {
        let api_key = match api_key {
            Some(key) if !key.trim().is_empty() => key,
            _ => std::env::var("ANTHROPIC_API_KEY")
                .or_else(|_| std::env::var("CLAUDE_API_KEY"))
                .or_else(|_| std::env::var("CLAUDE_KEY"))
                .map_err(|_| Error::MissingApiKey)?,
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
        })
    }
}

#[async_trait]
impl Translator for Claude {
    async fn translate(&self, request: &str, schema: &Schema) -> Result<String, Error> {
        // tell claude what we need and give it the schema
        let system = format!(
            r#"You are a SQL query generator. Given a natural language request, generate a valid SQL query.

Database dialect: {dialect}

Database schema:
{schema}

Rules:
- Output ONLY the SQL query, no explanations or markdown
- Generate a single read-only SELECT statement unless the request clearly asks for a write
- Be precise with table and column names from the schema
- Use the relationships listed above for joins
- For SELECT queries, be specific about columns when possible
- For PostgreSQL: cast timestamp/date columns to text (e.g., created_at::text)"#,
            dialect = schema.dialect,
            schema = schema.to_prompt(),
        );

        let body = Request {
            model: MODEL,
            max_tokens: 1024,
            system,
            messages: vec![Message {
                role: "user",
                content: request.to_string(),
            }],
        };

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = response.text().await?;
            return Err(Error::Claude(error));
        }

        let response: Response = response.json().await?;
        let sql = response
            .content
            .first()
            .map(|c| c.text.as_str())
            .unwrap_or_default();

        Ok(strip_code_fence(sql))
    }
}

// claude sometimes wraps sql in markdown code blocks
pub fn strip_code_fence(text: &str) -> String {
    text.trim()
        .trim_start_matches("```sql")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}
