// core logic - planning, risk, the safety gate, and the pieces around them

mod agent;
mod ai;
mod analyze;
mod audit;
mod cache;
mod db;
mod dialect;
mod erd;
mod explain;
mod graph;
mod heuristics;
mod plan;
mod policy;
mod rewrite;
mod risk;
mod schema;
mod statement;
mod validate;

pub use agent::{
    Agent, AskOutcome, Limits, Metrics, PlanOutcome, RunMode, RunOptions, RunOutcome, Translation,
    WriteOutcome,
};
pub use ai::{Claude, Translator, strip_code_fence};
pub use analyze::{PlanMetrics, extract_postgres_plan};
pub use audit::AuditLog;
pub use cache::{Cache, DEFAULT_TTL, MemoryCache, NoCache, cache_key};
pub use db::{Db, DbAdapter, QueryResult};
pub use dialect::Dialect;
pub use erd::build_erd_mermaid;
pub use explain::{ExplainResult, build_explain_sql, run_explain};
pub use graph::SchemaGraph;
pub use heuristics::{
    Intent, PlanJson, TablePath, extract_aggregations, extract_filters, extract_joins,
    extract_limit, extract_plan_json, extract_tables, suggest_indexes,
};
pub use plan::{QueryPlan, build_query_plan};
pub use policy::{Policy, PolicyDecision, RULES, Rule, evaluate_policy, rules};
pub use rewrite::{apply_limit, has_limit, strip_trailing_semicolon};
pub use risk::{RiskAssessment, RiskLevel, assess_risk};
pub use schema::{Column, ForeignKey, Schema};
pub use statement::Statement;
pub use validate::{Validation, validate_read, validate_write};
