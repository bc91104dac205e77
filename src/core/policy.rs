// allow/deny decisions for a planned statement
// an ordered list of pure rules over (statement, plan, read_only); the first
// rule that returns a decision wins, so each rule may assume the ones before
// it passed

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::plan::QueryPlan;
use super::statement::Statement;

static JOIN_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bjoin\b").unwrap());

const MAX_JOINS: usize = 3;
const RISK_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Policy {
    ReadOnly,
    SingleStatement,
    JoinComplexity,
    UnboundedRead,
    SafeLimitApplied,
    RiskThreshold,
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub policy: Policy,
    pub reason: String,
    pub suggested_fix: String,
}

impl PolicyDecision {
    fn deny(policy: Policy, reason: &str, suggested_fix: &str) -> Self {
        Self {
            allowed: false,
            policy,
            reason: reason.to_string(),
            suggested_fix: suggested_fix.to_string(),
        }
    }

    pub fn allow() -> Self {
        Self {
            allowed: true,
            policy: Policy::Allow,
            reason: String::new(),
            suggested_fix: String::new(),
        }
    }
}

pub type Rule = fn(&Statement, &QueryPlan, bool) -> Option<PolicyDecision>;

/// Evaluation order. Do not reorder without revisiting every rule below.
pub const RULES: &[Rule] = &[
    rules::read_only,
    rules::single_statement,
    rules::join_complexity,
    rules::bounded_read,
    rules::risk_threshold,
];

pub fn evaluate_policy(sql: &str, plan: &QueryPlan, read_only: bool) -> PolicyDecision {
    let stmt = Statement::new(sql);

    let decision = RULES
        .iter()
        .find_map(|rule| rule(&stmt, plan, read_only))
        .unwrap_or_else(PolicyDecision::allow);

    tracing::debug!(policy = ?decision.policy, allowed = decision.allowed, "policy evaluated");
    decision
}

pub mod rules {
    use super::*;

    pub fn read_only(stmt: &Statement, _: &QueryPlan, read_only: bool) -> Option<PolicyDecision> {
        (read_only && !stmt.is_read()).then(|| {
            PolicyDecision::deny(
                Policy::ReadOnly,
                "WRITE_OPERATION_DETECTED",
                "Use SELECT or switch to a write tool with explicit approval.",
            )
        })
    }

    pub fn single_statement(stmt: &Statement, _: &QueryPlan, _: bool) -> Option<PolicyDecision> {
        stmt.has_inner_semicolon().then(|| {
            PolicyDecision::deny(
                Policy::SingleStatement,
                "MULTIPLE_STATEMENTS_DETECTED",
                "Send a single statement per request.",
            )
        })
    }

    pub fn join_complexity(stmt: &Statement, _: &QueryPlan, _: bool) -> Option<PolicyDecision> {
        (JOIN_WORD.find_iter(stmt.text()).count() >= MAX_JOINS).then(|| {
            PolicyDecision::deny(
                Policy::JoinComplexity,
                "TOO_MANY_JOINS",
                "Reduce joins or add filters and indexes.",
            )
        })
    }

    // an unbounded read is only let through when the plan already bounded it
    pub fn bounded_read(stmt: &Statement, plan: &QueryPlan, _: bool) -> Option<PolicyDecision> {
        if !stmt.is_unbounded() {
            return None;
        }

        let mut decision = PolicyDecision::deny(
            Policy::UnboundedRead,
            "NO_WHERE_OR_LIMIT",
            "Add WHERE filters or a LIMIT clause.",
        );
        if limit_applied(stmt, plan) {
            decision.allowed = true;
            decision.policy = Policy::SafeLimitApplied;
        }
        Some(decision)
    }

    pub fn risk_threshold(_: &Statement, plan: &QueryPlan, _: bool) -> Option<PolicyDecision> {
        (plan.risk_score >= RISK_THRESHOLD).then(|| {
            PolicyDecision::deny(
                Policy::RiskThreshold,
                "HIGH_RISK_SCORE",
                "Apply filters, add LIMIT, or optimize indexes.",
            )
        })
    }

    // plans built here carry the flag; plans from elsewhere only have safe_sql
    fn limit_applied(stmt: &Statement, plan: &QueryPlan) -> bool {
        if plan.limit_injected {
            return true;
        }
        let safe = Statement::new(&plan.safe_sql);
        !safe.is_empty() && safe != *stmt
    }
}
