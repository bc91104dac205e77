// request workflows: plan, run, write, ask
// validation -> planning -> policy -> execution, with an audit line for each

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

use super::ai::Translator;
use super::audit::AuditLog;
use super::cache::{Cache, MemoryCache, cache_key};
use super::db::{DbAdapter, QueryResult};
use super::erd::build_erd_mermaid;
use super::plan::{QueryPlan, build_query_plan};
use super::policy::{PolicyDecision, evaluate_policy};
use super::rewrite::apply_limit;
use super::schema::Schema;
use super::validate::{validate_read, validate_write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Row bound appended to reads that have none.
    pub safe_limit: u64,
    /// Row bound for preview runs.
    pub preview_limit: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            safe_limit: 1000,
            preview_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Execute,
    Preview,
    Explain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Enforce the policy and run the bounded sql.
    pub safe: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Execute,
            safe: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub schema_ms: Option<f64>,
    pub llm_ms: Option<f64>,
    pub compile_sql_ms: Option<f64>,
    pub db_exec_ms: Option<f64>,
    pub rows_returned: Option<usize>,
    pub cache_hit: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub sql: String,
    pub recommended_sql: String,
    pub plan: QueryPlan,
    pub policy: PolicyDecision,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    /// The statement failed validation and was never planned.
    Rejected { error: String },
    Blocked {
        error: String,
        plan: Box<QueryPlan>,
        policy: PolicyDecision,
    },
    Explained {
        plan: Box<QueryPlan>,
        policy: PolicyDecision,
        metrics: Metrics,
    },
    Executed {
        executed_sql: String,
        result: QueryResult,
        plan: Box<QueryPlan>,
        policy: PolicyDecision,
        metrics: Metrics,
    },
}

impl RunOutcome {
    pub fn policy(&self) -> Option<&PolicyDecision> {
        match self {
            Self::Rejected { .. } => None,
            Self::Blocked { policy, .. }
            | Self::Explained { policy, .. }
            | Self::Executed { policy, .. } => Some(policy),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Rejected { error } | Self::Blocked { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WriteOutcome {
    Rejected {
        error: String,
    },
    Blocked {
        error: String,
        policy: PolicyDecision,
    },
    Written {
        row_count: u64,
        policy: PolicyDecision,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Translation {
    pub sql: String,
    pub schema: Schema,
    pub schema_ms: f64,
    pub llm_ms: f64,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub request: String,
    pub sql: String,
    pub recommended_sql: String,
    pub plan: QueryPlan,
    pub policy: PolicyDecision,
    pub metrics: Metrics,
    pub executed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunOutcome>,
}

pub struct Agent<A: DbAdapter> {
    db: A,
    translator: Option<Box<dyn Translator>>,
    cache: Box<dyn Cache>,
    audit: AuditLog,
    limits: Limits,
}

impl<A: DbAdapter> Agent<A> {
    pub fn new(db: A) -> Self {
        Self {
            db,
            translator: None,
            cache: Box::new(MemoryCache::default()),
            audit: AuditLog::disabled(),
            limits: Limits::default(),
        }
    }

    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Some(Box::new(translator));
        self
    }

    pub fn with_cache(mut self, cache: impl Cache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn db(&self) -> &A {
        &self.db
    }

    pub async fn schema(&self) -> Result<Schema, Error> {
        self.db.schema().await
    }

    pub async fn erd(&self) -> Result<String, Error> {
        Ok(build_erd_mermaid(&self.db.schema().await?))
    }

    /// Plan a statement without executing it.
    pub async fn plan(&self, sql: &str) -> PlanOutcome {
        // join paths are a nice-to-have; plan without them if introspection fails
        let schema = match self.db.schema().await {
            Ok(schema) => Some(schema),
            Err(e) => {
                tracing::warn!(error = %e, "schema unavailable, planning without join paths");
                None
            }
        };

        let start = Instant::now();
        let plan = build_query_plan(sql, &self.db, self.limits.safe_limit, schema.as_ref()).await;
        let metrics = Metrics {
            compile_sql_ms: Some(elapsed_ms(start)),
            ..Metrics::default()
        };
        let policy = evaluate_policy(sql, &plan, true);

        self.audit.record(
            "plan",
            &json!({ "sql": sql, "risk_score": plan.risk_score, "policy": policy, "metrics": metrics }),
        );

        PlanOutcome {
            sql: sql.to_string(),
            recommended_sql: plan.safe_sql.clone(),
            plan,
            policy,
            metrics,
        }
    }

    /// Validate, plan, gate and (depending on mode) execute a read.
    pub async fn run(&self, sql: &str, options: RunOptions) -> Result<RunOutcome, Error> {
        let outcome = self.run_with_plan(sql, options, None, Metrics::default()).await?;

        self.audit.record(
            "run",
            &json!({ "sql": sql, "mode": options.mode, "safe": options.safe, "policy": outcome.policy() }),
        );
        Ok(outcome)
    }

    async fn run_with_plan(
        &self,
        sql: &str,
        options: RunOptions,
        plan: Option<QueryPlan>,
        mut metrics: Metrics,
    ) -> Result<RunOutcome, Error> {
        let validation = validate_read(sql);
        if !validation.is_ok() {
            return Ok(RunOutcome::Rejected {
                error: validation.message,
            });
        }

        let plan = match plan {
            Some(plan) => plan,
            None => {
                let start = Instant::now();
                let plan = build_query_plan(sql, &self.db, self.limits.safe_limit, None).await;
                metrics.compile_sql_ms = Some(elapsed_ms(start));
                plan
            }
        };

        let policy = evaluate_policy(sql, &plan, true);
        if options.safe && !policy.allowed {
            return Ok(RunOutcome::Blocked {
                error: "Query blocked by safety policy.".to_string(),
                plan: Box::new(plan),
                policy,
            });
        }

        let mut exec_sql = if options.safe {
            plan.safe_sql.clone()
        } else {
            sql.to_string()
        };

        match options.mode {
            RunMode::Explain => {
                return Ok(RunOutcome::Explained {
                    plan: Box::new(plan),
                    policy,
                    metrics,
                });
            }
            RunMode::Preview => exec_sql = apply_limit(&exec_sql, self.limits.preview_limit).0,
            RunMode::Execute => {}
        }

        let start = Instant::now();
        let result = self.db.query(&exec_sql).await?;
        metrics.db_exec_ms = Some(elapsed_ms(start));
        metrics.rows_returned = Some(result.row_count);

        Ok(RunOutcome::Executed {
            executed_sql: exec_sql,
            result,
            plan: Box::new(plan),
            policy,
            metrics,
        })
    }

    /// Validate and gate an INSERT/UPDATE/DELETE, then execute it.
    pub async fn write(&self, sql: &str, allow_write: bool) -> Result<WriteOutcome, Error> {
        let outcome = self.write_inner(sql, allow_write).await?;

        let policy = match &outcome {
            WriteOutcome::Blocked { policy, .. } | WriteOutcome::Written { policy, .. } => {
                Some(policy)
            }
            WriteOutcome::Rejected { .. } => None,
        };
        self.audit.record(
            "write",
            &json!({ "sql": sql, "allow_write": allow_write, "policy": policy }),
        );
        Ok(outcome)
    }

    async fn write_inner(&self, sql: &str, allow_write: bool) -> Result<WriteOutcome, Error> {
        let validation = validate_write(sql);
        if !validation.is_ok() {
            return Ok(WriteOutcome::Rejected {
                error: validation.message,
            });
        }

        // writes are not explained; the gate sees a zero-risk plan
        let policy = evaluate_policy(sql, &QueryPlan::default(), !allow_write);
        if !policy.allowed {
            return Ok(WriteOutcome::Blocked {
                error: "Write blocked by safety policy.".to_string(),
                policy,
            });
        }

        let row_count = self.db.execute_write(sql).await?;
        Ok(WriteOutcome::Written { row_count, policy })
    }

    /// Natural language to sql, served from the cache when the schema is unchanged.
    pub async fn translate(&self, request: &str) -> Result<Translation, Error> {
        let translator = self.translator.as_ref().ok_or(Error::NoTranslator)?;

        let start = Instant::now();
        let schema = self.db.schema().await?;
        let schema_ms = elapsed_ms(start);

        let key = cache_key(request, &schema);
        if let Some(sql) = self.cache.get(&key) {
            tracing::debug!(%key, "translation cache hit");
            return Ok(Translation {
                sql,
                schema,
                schema_ms,
                llm_ms: 0.0,
                cache_hit: true,
            });
        }

        let start = Instant::now();
        let sql = translator.translate(request, &schema).await?;
        let llm_ms = elapsed_ms(start);
        self.cache.set(&key, sql.clone());

        Ok(Translation {
            sql,
            schema,
            schema_ms,
            llm_ms,
            cache_hit: false,
        })
    }

    /// Translate, plan and gate a request; optionally run it with the same plan.
    pub async fn ask(
        &self,
        request: &str,
        execute: bool,
        options: RunOptions,
    ) -> Result<AskOutcome, Error> {
        let translation = self.translate(request).await?;
        let sql = translation.sql;

        let start = Instant::now();
        let plan = build_query_plan(
            &sql,
            &self.db,
            self.limits.safe_limit,
            Some(&translation.schema),
        )
        .await;
        let metrics = Metrics {
            schema_ms: Some(translation.schema_ms),
            llm_ms: Some(translation.llm_ms),
            compile_sql_ms: Some(elapsed_ms(start)),
            cache_hit: Some(translation.cache_hit),
            ..Metrics::default()
        };
        let policy = evaluate_policy(&sql, &plan, true);

        // reuse the plan so cost and risk signals stay consistent
        let run = if execute {
            Some(
                self.run_with_plan(&sql, options, Some(plan.clone()), metrics.clone())
                    .await?,
            )
        } else {
            None
        };

        self.audit.record(
            "ask",
            &json!({ "request": request, "sql": sql, "policy": policy, "metrics": metrics }),
        );

        Ok(AskOutcome {
            request: request.to_string(),
            recommended_sql: plan.safe_sql.clone(),
            sql,
            plan,
            policy,
            metrics,
            executed: run.is_some(),
            run,
        })
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}
