// lightweight heuristics to flag common slow-query patterns
// checks run in a fixed order so reasons and improvements are reproducible

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::analyze::{PlanMetrics, round2};
use super::heuristics::suggest_indexes;
use super::statement::Statement;

static WILDCARD_LIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"like\s+'%.*%'").unwrap());
static SELECT_STAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bselect\s+\*").unwrap());

const HIGH_COST: f64 = 10_000.0;
const FALLBACK: &str = "Query looks reasonable; no obvious improvements detected.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            Self::High
        } else if score >= 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risky_reasons: Vec<String>,
    pub improvements: Vec<String>,
}

impl RiskAssessment {
    fn flag(&mut self, weight: f64, reason: &str, improvement: &str) {
        self.risk_score += weight;
        self.risky_reasons.push(reason.to_string());
        self.improvements.push(improvement.to_string());
    }

    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }
}

pub fn assess_risk(sql: &str, plan: &PlanMetrics) -> RiskAssessment {
    let stmt = Statement::new(sql);
    let text = stmt.text();
    let mut risk = RiskAssessment::default();

    if stmt.is_unbounded() {
        risk.flag(
            0.3,
            "SELECT without WHERE or LIMIT.",
            "Add WHERE filters to reduce scanned rows.",
        );
    }

    if stmt.has_word("join") {
        risk.flag(
            0.1,
            "JOIN detected; ensure indexed join keys.",
            "Add indexes on JOIN columns if missing.",
        );
    }

    if WILDCARD_LIKE.is_match(text) {
        risk.flag(
            0.2,
            "Leading wildcard LIKE can be slow.",
            "Prefer prefix search or use a trigram/full-text index.",
        );
    }

    if stmt.has_word("order by") && !stmt.has_limit() {
        risk.flag(
            0.1,
            "ORDER BY without LIMIT can be expensive.",
            "Add LIMIT when ordering large tables.",
        );
    }

    if SELECT_STAR.is_match(text) {
        risk.flag(
            0.05,
            "SELECT * can fetch unnecessary columns.",
            "Select only the columns you need.",
        );
    }

    if plan.total_cost.is_some_and(|cost| cost > HIGH_COST) {
        risk.flag(
            0.2,
            "High planner cost detected.",
            "Consider adding WHERE filters or indexes.",
        );
    }

    if !plan.plan_risks.is_empty() {
        risk.risk_score += 0.2;
        risk.risky_reasons.extend(plan.plan_risks.iter().cloned());
    }

    risk.improvements.extend(suggest_indexes(text));
    if risk.improvements.is_empty() {
        risk.improvements.push(FALLBACK.to_string());
    }

    risk.risk_score = round2(risk.risk_score.min(1.0));
    risk
}
