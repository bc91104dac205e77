// reading EXPLAIN output back into numbers and warnings
// one reader per plan shape; Dialect::analyze picks which one runs

use serde::Serialize;
use serde_json::Value;

use super::db::QueryResult;

const NESTED_LOOP_ROW_LIMIT: f64 = 5000.0;

/// Cost and risk facts pulled from a plan. Everything is optional because
/// most engines (and every failed EXPLAIN) give us nothing to read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanMetrics {
    /// Planner cost standing in for latency. Not a measurement.
    pub estimate_ms: Option<f64>,
    pub plan_rows: Option<i64>,
    pub total_cost: Option<f64>,
    pub plan_risks: Vec<String>,
}

/// Postgres `EXPLAIN (FORMAT JSON)`: one row, one "QUERY PLAN" column
/// holding a single-element array of `{ "Plan": {...} }`.
pub fn postgres(rows: &QueryResult) -> PlanMetrics {
    let Some(plan) = extract_postgres_plan(rows) else {
        return PlanMetrics::default();
    };

    let total_cost = plan.get("Total Cost").and_then(Value::as_f64);
    let plan_rows = plan.get("Plan Rows").and_then(as_rows);

    let mut plan_risks = Vec::new();
    walk_plan(&plan, &mut plan_risks);

    PlanMetrics {
        estimate_ms: total_cost.map(round2),
        plan_rows,
        total_cost,
        plan_risks,
    }
}

/// SQLite `EXPLAIN QUERY PLAN`: flat rows with a free-text `detail` column.
pub fn sqlite(rows: &QueryResult) -> PlanMetrics {
    let plan_risks = (0..rows.rows.len())
        .filter_map(|i| rows.value(i, "detail"))
        .filter(|detail| value_text(detail).to_uppercase().contains("SCAN"))
        .map(|_| "Full table scan detected.".to_string())
        .collect();

    PlanMetrics {
        plan_risks,
        ..PlanMetrics::default()
    }
}

/// Locate the top plan node, unwrapping the string/array/"Plan" envelopes.
pub fn extract_postgres_plan(rows: &QueryResult) -> Option<Value> {
    let first = rows.rows.first()?;
    let index = rows
        .columns
        .iter()
        .position(|c| c.to_lowercase().replace('_', " ") == "query plan")?;

    let mut plan = first.get(index)?.clone();

    // the any driver hands json back as text more often than not
    if let Value::String(text) = &plan {
        plan = serde_json::from_str(text).ok()?;
    }

    if let Value::Array(items) = plan {
        plan = items.into_iter().next()?;
    }

    match plan {
        Value::Object(mut map) => match map.remove("Plan") {
            Some(inner @ Value::Object(_)) => Some(inner),
            Some(_) => None,
            None => Some(Value::Object(map)),
        },
        _ => None,
    }
}

fn walk_plan(node: &Value, risks: &mut Vec<String>) {
    match node.get("Node Type").and_then(Value::as_str) {
        Some("Seq Scan") => {
            let relation = node
                .get("Relation Name")
                .and_then(Value::as_str)
                .filter(|r| !r.is_empty())
                .unwrap_or("table");
            risks.push(format!("Sequential scan on {relation}."));
        }
        Some("Nested Loop") => {
            let rows = node.get("Plan Rows").and_then(Value::as_f64);
            if rows.is_some_and(|r| r > NESTED_LOOP_ROW_LIMIT) {
                risks.push("Large nested loop join detected.".to_string());
            }
        }
        _ => {}
    }

    if let Some(children) = node.get("Plans").and_then(Value::as_array) {
        for child in children {
            walk_plan(child, risks);
        }
    }
}

fn as_rows(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|v| v as i64))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
