// build a risk-annotated plan for a statement without executing it
// the explain call is the only io; everything else is pure over the sql text

use serde::Serialize;

use super::db::DbAdapter;
use super::explain::{ExplainResult, run_explain};
use super::heuristics::{PlanJson, extract_plan_json};
use super::risk::{RiskLevel, assess_risk};
use super::rewrite::apply_limit;
use super::schema::Schema;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryPlan {
    pub explain: ExplainResult,
    pub estimate_ms: Option<f64>,
    pub plan_rows: Option<i64>,
    pub total_cost: Option<f64>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risky_reasons: Vec<String>,
    pub improvements: Vec<String>,
    pub plan_json: PlanJson,
    /// The statement with a row bound guaranteed.
    pub safe_sql: String,
    /// Set when `safe_sql` carries a LIMIT we appended.
    pub limit_injected: bool,
    pub notes: Vec<String>,
}

pub async fn build_query_plan<A: DbAdapter + ?Sized>(
    sql: &str,
    adapter: &A,
    safe_limit: u64,
    schema: Option<&Schema>,
) -> QueryPlan {
    let explain = run_explain(sql, adapter).await;
    let metrics = explain
        .rows
        .as_ref()
        .map(|rows| explain.dialect.analyze(rows))
        .unwrap_or_default();

    let risk = assess_risk(sql, &metrics);
    let risk_level = risk.level();
    let plan_json = extract_plan_json(sql, schema);
    let (safe_sql, limit_injected) = apply_limit(sql, safe_limit);

    let mut notes = Vec::new();
    if limit_injected {
        notes.push(format!("Added LIMIT {safe_limit} for safety."));
    }
    if metrics.estimate_ms.is_some() {
        notes.push("Runtime estimate is based on EXPLAIN cost (rough estimate).".to_string());
    } else {
        notes.push("Runtime estimate unavailable for this dialect.".to_string());
    }

    tracing::debug!(
        risk_score = risk.risk_score,
        ?risk_level,
        limit_injected,
        explain_ok = explain.is_ok(),
        "query planned"
    );

    QueryPlan {
        explain,
        estimate_ms: metrics.estimate_ms,
        plan_rows: metrics.plan_rows,
        total_cost: metrics.total_cost,
        risk_score: risk.risk_score,
        risk_level,
        risky_reasons: risk.risky_reasons,
        improvements: risk.improvements,
        plan_json,
        safe_sql,
        limit_injected,
        notes,
    }
}
