// run EXPLAIN for a statement and keep whatever comes back
// a failed explain is data, never an error - planning carries on without it

use serde::Serialize;

use super::db::{DbAdapter, QueryResult};
use super::dialect::Dialect;
use super::rewrite::strip_trailing_semicolon;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExplainResult {
    pub dialect: Dialect,
    pub explain_sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExplainResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub fn build_explain_sql(sql: &str, dialect: Dialect) -> String {
    let (body, _) = strip_trailing_semicolon(sql);
    dialect.explain(body)
}

pub async fn run_explain<A: DbAdapter + ?Sized>(sql: &str, adapter: &A) -> ExplainResult {
    let dialect = adapter.dialect();
    let explain_sql = build_explain_sql(sql, dialect);

    match adapter.explain(&explain_sql).await {
        Ok(rows) => ExplainResult {
            dialect,
            explain_sql,
            rows: Some(rows),
            error: None,
        },
        Err(e) => {
            tracing::warn!(%dialect, error = %e, "explain failed");
            ExplainResult {
                dialect,
                explain_sql,
                rows: None,
                error: Some(e.to_string()),
            }
        }
    }
}
