// tests for the request workflows: run, write, plan, ask

mod common;

use common::{FakeDb, FakeTranslator, result, shop_schema, sqlite_explain};
use serde_json::{Value, json};
use sqlgate::core::{
    AuditLog, Dialect, Limits, NoCache, Policy, RunMode, RunOptions, RunOutcome, WriteOutcome,
};
use sqlgate::{Agent, Error};
use std::sync::atomic::Ordering;

fn agent() -> Agent<FakeDb> {
    let db = FakeDb::new(Dialect::Sqlite)
        .with_explain(sqlite_explain(&["SEARCH users USING INTEGER PRIMARY KEY (rowid=?)"]))
        .with_rows(result(&["id", "name"], vec![vec![json!(1), json!("ada")]]));
    Agent::new(db)
}

fn mode(mode: RunMode) -> RunOptions {
    RunOptions {
        mode,
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn test_run_rejects_non_select() {
    let agent = agent();
    let outcome = agent
        .run("DROP TABLE users", RunOptions::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Rejected { .. }));
    assert_eq!(outcome.error(), Some("Only SELECT queries are allowed."));
    assert!(agent.db().queries().is_empty());
}

#[tokio::test]
async fn test_run_blocks_too_many_joins() {
    let agent = agent();
    let sql = "select * from a join b on a.x = b.x join c on b.y = c.y join d on c.z = d.z \
               where a.id = 1";

    let outcome = agent.run(sql, RunOptions::default()).await.unwrap();

    let RunOutcome::Blocked { error, policy, .. } = &outcome else {
        panic!("expected blocked, got {outcome:?}");
    };
    assert_eq!(error, "Query blocked by safety policy.");
    assert_eq!(policy.policy, Policy::JoinComplexity);
    assert!(agent.db().executed().is_empty());
}

#[tokio::test]
async fn test_run_unsafe_skips_gate() {
    let agent = agent();
    let sql = "select * from a join b on a.x = b.x join c on b.y = c.y join d on c.z = d.z";
    let options = RunOptions {
        safe: false,
        ..RunOptions::default()
    };

    let outcome = agent.run(sql, options).await.unwrap();

    let RunOutcome::Executed {
        executed_sql,
        policy,
        ..
    } = &outcome
    else {
        panic!("expected executed, got {outcome:?}");
    };
    // the decision is still reported, just not enforced
    assert!(!policy.allowed);
    assert_eq!(executed_sql, sql);
}

#[tokio::test]
async fn test_run_executes_bounded_sql() {
    let agent = agent().with_limits(Limits {
        safe_limit: 5,
        preview_limit: 2,
    });

    let outcome = agent
        .run("SELECT * FROM users", RunOptions::default())
        .await
        .unwrap();

    let RunOutcome::Executed {
        executed_sql,
        result,
        policy,
        metrics,
        ..
    } = &outcome
    else {
        panic!("expected executed, got {outcome:?}");
    };
    assert_eq!(executed_sql, "SELECT * FROM users LIMIT 5");
    assert_eq!(policy.policy, Policy::SafeLimitApplied);
    assert!(policy.allowed);
    assert_eq!(result.row_count, 1);
    assert_eq!(metrics.rows_returned, Some(1));
    assert!(metrics.db_exec_ms.is_some());
    assert_eq!(agent.db().executed(), vec!["SELECT * FROM users LIMIT 5"]);
}

#[tokio::test]
async fn test_run_explain_mode_does_not_execute() {
    let agent = agent();
    let outcome = agent
        .run("select id from users where id = 1", mode(RunMode::Explain))
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Explained { .. }));
    assert_eq!(agent.db().queries().len(), 1);
    assert!(agent.db().executed().is_empty());
}

#[tokio::test]
async fn test_run_preview_caps_rows() {
    let agent = agent();
    let options = RunOptions {
        mode: RunMode::Preview,
        safe: false,
    };

    let outcome = agent
        .run("select id from users where id > 1", options)
        .await
        .unwrap();

    let RunOutcome::Executed { executed_sql, .. } = outcome else {
        panic!("expected executed");
    };
    assert_eq!(executed_sql, "select id from users where id > 1 LIMIT 50");
}

#[tokio::test]
async fn test_run_outcome_serializes_status() {
    let agent = agent();
    let outcome = agent
        .run("select * from users", mode(RunMode::Explain))
        .await
        .unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "explained");
    assert_eq!(json["policy"]["policy"], "SAFE_LIMIT_APPLIED");
    assert_eq!(json["plan"]["safe_sql"], "select * from users LIMIT 1000");
}

#[tokio::test]
async fn test_write_blocked_without_approval() {
    let agent = agent();
    let outcome = agent
        .write("UPDATE users SET name = 'x' WHERE id = 1", false)
        .await
        .unwrap();

    let WriteOutcome::Blocked { error, policy } = &outcome else {
        panic!("expected blocked, got {outcome:?}");
    };
    assert_eq!(error, "Write blocked by safety policy.");
    assert_eq!(policy.policy, Policy::ReadOnly);
    assert!(agent.db().writes().is_empty());
}

#[tokio::test]
async fn test_write_with_approval() {
    let agent = agent();
    let outcome = agent
        .write("UPDATE users SET name = 'x' WHERE id = 1", true)
        .await
        .unwrap();

    let WriteOutcome::Written { row_count, policy } = &outcome else {
        panic!("expected written, got {outcome:?}");
    };
    assert_eq!(*row_count, 1);
    assert!(policy.allowed);
    assert_eq!(
        agent.db().writes(),
        vec!["UPDATE users SET name = 'x' WHERE id = 1"]
    );
}

#[tokio::test]
async fn test_write_without_where_blocked() {
    let agent = agent();
    let outcome = agent.write("DELETE FROM users", true).await.unwrap();

    let WriteOutcome::Blocked { policy, .. } = &outcome else {
        panic!("expected blocked, got {outcome:?}");
    };
    assert_eq!(policy.policy, Policy::UnboundedRead);
    assert!(agent.db().writes().is_empty());
}

#[tokio::test]
async fn test_write_rejects_select() {
    let agent = agent();
    let outcome = agent.write("SELECT * FROM users", true).await.unwrap();
    assert!(matches!(outcome, WriteOutcome::Rejected { .. }));
}

#[tokio::test]
async fn test_plan_uses_schema_for_join_paths() {
    let agent = agent();
    let outcome = agent
        .plan("select * from users u join orders o on o.user_id = u.id")
        .await;

    assert_eq!(outcome.recommended_sql, outcome.plan.safe_sql);
    assert_eq!(outcome.plan.plan_json.join_paths.len(), 1);
    assert_eq!(
        outcome.plan.plan_json.join_paths[0].path,
        vec!["users", "orders"]
    );
    assert!(outcome.metrics.compile_sql_ms.is_some());
}

#[tokio::test]
async fn test_plan_without_schema() {
    let agent = Agent::new(FakeDb::new(Dialect::Sqlite).without_schema());
    let outcome = agent.plan("select * from users").await;

    assert!(outcome.plan.plan_json.join_paths.is_empty());
    assert_eq!(outcome.policy.policy, Policy::SafeLimitApplied);
}

#[tokio::test]
async fn test_ask_needs_translator() {
    let agent = agent();
    let err = agent
        .ask("all users", false, RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoTranslator));
}

#[tokio::test]
async fn test_ask_caches_translation() {
    let translator = FakeTranslator::new("SELECT * FROM users");
    let calls = translator.counter();
    let agent = agent().with_translator(translator);

    let first = agent
        .ask("show me all users", false, RunOptions::default())
        .await
        .unwrap();
    let second = agent
        .ask("show me all users", false, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.metrics.cache_hit, Some(false));
    assert_eq!(second.metrics.cache_hit, Some(true));
    assert_eq!(second.sql, "SELECT * FROM users");
    assert_eq!(second.recommended_sql, "SELECT * FROM users LIMIT 1000");
    assert!(!second.executed);
    assert!(second.run.is_none());
    assert!(agent.db().executed().is_empty());
}

#[tokio::test]
async fn test_ask_without_cache() {
    let translator = FakeTranslator::new("SELECT * FROM users");
    let calls = translator.counter();
    let agent = agent().with_translator(translator).with_cache(NoCache);

    agent.ask("users", false, RunOptions::default()).await.unwrap();
    agent.ask("users", false, RunOptions::default()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_ask_and_execute() {
    let agent = agent().with_translator(FakeTranslator::new("SELECT id, name FROM users"));

    let outcome = agent
        .ask("list users", true, RunOptions::default())
        .await
        .unwrap();

    assert!(outcome.executed);
    let Some(RunOutcome::Executed { executed_sql, .. }) = &outcome.run else {
        panic!("expected executed run, got {:?}", outcome.run);
    };
    assert_eq!(executed_sql, "SELECT id, name FROM users LIMIT 1000");
    // one explain for the shared plan, one execution
    assert_eq!(agent.db().queries().len(), 2);
}

#[tokio::test]
async fn test_ask_translated_write_is_rejected() {
    let agent = agent().with_translator(FakeTranslator::new("DELETE FROM users"));

    let outcome = agent
        .ask("remove everyone", true, RunOptions::default())
        .await
        .unwrap();

    assert!(!outcome.policy.allowed);
    assert_eq!(outcome.policy.policy, Policy::ReadOnly);
    assert!(matches!(outcome.run, Some(RunOutcome::Rejected { .. })));
    assert!(agent.db().writes().is_empty());
}

#[tokio::test]
async fn test_erd_from_agent() {
    let agent = agent();
    let erd = agent.erd().await.unwrap();
    assert!(erd.starts_with("erDiagram"));
    assert!(erd.contains("users ||--o{ orders : \"user_id\""));
}

#[tokio::test]
async fn test_audit_log_records_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("audit.jsonl");
    let agent = agent().with_audit(AuditLog::to_file(&path));

    agent
        .run("select * from users", RunOptions::default())
        .await
        .unwrap();
    agent.write("DELETE FROM users", false).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "run");
    assert_eq!(lines[0]["sql"], "select * from users");
    assert_eq!(lines[0]["policy"]["policy"], "SAFE_LIMIT_APPLIED");
    assert!(lines[0]["ts"].is_string());
    assert_eq!(lines[1]["event"], "write");
    assert_eq!(lines[1]["policy"]["allowed"], false);
}

#[tokio::test]
async fn test_schema_passthrough() {
    let agent = agent();
    assert_eq!(agent.schema().await.unwrap(), shop_schema());
}
