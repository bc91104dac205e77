// structural facts pulled out of sql text with regular expressions
// best-effort, not a parser: matching runs over the lowercased statement and
// string literals or quoted identifiers are not special-cased, so a literal
// containing `join` counts as a join

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::analyze::round2;
use super::graph::SchemaGraph;
use super::schema::Schema;
use super::statement::Statement;

static FROM_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"from\s+([a-z0-9_.]+)").unwrap());
static JOIN_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"join\s+([a-z0-9_.]+)").unwrap());
static WHERE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)where\s+(.*?)(group\s+by|order\s+by|\blimit\b|$)").unwrap()
});
static GROUP_BY_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)group\s+by\s+(.*?)(order\s+by|\blimit\b|$)").unwrap());
static ORDER_BY_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)order\s+by\s+(.*?)(\blimit\b|$)").unwrap());
static LIMIT_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\blimit\s+(\d+)").unwrap());

// `join <table> [[as] alias] on <t>.<c>`
static JOIN_ON_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"join\s+[a-z0-9_.]+(?:\s+(?:as\s+)?[a-z0-9_]+)?\s+on\s+([a-z0-9_]+)\.([a-z0-9_]+)",
    )
    .unwrap()
});
static WHERE_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"where\s+([a-z0-9_]+)\.([a-z0-9_]+)").unwrap());
static ORDER_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"order\s+by\s+([a-z0-9_]+)\.([a-z0-9_]+)").unwrap());

const AGGREGATES: &[&str] = &["count", "sum", "avg", "min", "max"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    Read,
    Write,
}

/// Shortest foreign-key route between two tables the query mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePath {
    pub from: String,
    pub to: String,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanJson {
    pub intent: Intent,
    pub tables: Vec<String>,
    pub joins: Vec<String>,
    pub filters: Vec<String>,
    pub aggregations: Vec<String>,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub confidence: f64,
    pub join_paths: Vec<TablePath>,
}

pub fn extract_plan_json(sql: &str, schema: Option<&Schema>) -> PlanJson {
    let text = sql.to_lowercase();

    let tables = extract_tables(&text);
    let joins = extract_joins(&text);
    let filters = extract_filters(&text);
    let limit = extract_limit(&text);

    let intent = if Statement::new(sql).is_write() {
        Intent::Write
    } else {
        Intent::Read
    };

    let mut confidence: f64 = 0.6;
    if !tables.is_empty() {
        confidence += 0.2;
    }
    if !filters.is_empty() || limit.is_some() {
        confidence += 0.1;
    }
    if !joins.is_empty() {
        confidence += 0.1;
    }

    let join_paths = schema
        .map(|s| SchemaGraph::build(s).join_paths(&tables))
        .unwrap_or_default();

    PlanJson {
        intent,
        aggregations: extract_aggregations(&text),
        group_by: clause_items(&GROUP_BY_CLAUSE, &text),
        order_by: clause_items(&ORDER_BY_CLAUSE, &text),
        tables,
        joins,
        filters,
        limit,
        confidence: round2(confidence.min(1.0)),
        join_paths,
    }
}

/// Tables after FROM, then after JOIN; schema prefixes dropped, first wins.
pub fn extract_tables(text: &str) -> Vec<String> {
    let found = FROM_TABLE
        .captures_iter(text)
        .chain(JOIN_TABLE.captures_iter(text))
        .map(|c| last_segment(&c[1]).to_string());

    dedup(found)
}

pub fn extract_joins(text: &str) -> Vec<String> {
    JOIN_TABLE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

pub fn extract_filters(text: &str) -> Vec<String> {
    WHERE_CLAUSE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|clause| !clause.is_empty())
        .into_iter()
        .collect()
}

pub fn extract_limit(text: &str) -> Option<u64> {
    LIMIT_VALUE
        .captures(text)
        .and_then(|c| c[1].parse().ok())
}

pub fn extract_aggregations(text: &str) -> Vec<String> {
    AGGREGATES
        .iter()
        .filter(|f| text.contains(&format!("{f}(")))
        .map(|f| f.to_string())
        .collect()
}

/// Naive index hints from `t.c` references after JOIN .. ON, WHERE and ORDER BY.
pub fn suggest_indexes(sql: &str) -> Vec<String> {
    let text = sql.to_lowercase();

    let joined = JOIN_ON_COLUMN
        .captures_iter(&text)
        .map(|c| format!("Consider index on {}.{}.", &c[1], &c[2]));
    let filtered = WHERE_COLUMN
        .captures_iter(&text)
        .map(|c| format!("Consider index on {}.{}.", &c[1], &c[2]));
    let ordered = ORDER_COLUMN
        .captures_iter(&text)
        .map(|c| format!("Consider index on {}.{} for ORDER BY.", &c[1], &c[2]));

    dedup(joined.chain(filtered).chain(ordered))
}

fn clause_items(pattern: &Regex, text: &str) -> Vec<String> {
    let Some(c) = pattern.captures(text) else {
        return vec![];
    };

    c[1].split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
