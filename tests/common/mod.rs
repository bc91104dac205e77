// in-memory stand-ins for the database and the translator

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use sqlgate::core::{Column, Dialect, ForeignKey, Translator};
use sqlgate::{DbAdapter, Error, QueryResult, Schema};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct FakeDb {
    pub dialect: Dialect,
    pub explain: Result<QueryResult, String>,
    pub rows: QueryResult,
    pub schema: Option<Schema>,
    pub affected: u64,
    pub queries: Mutex<Vec<String>>,
    pub writes: Mutex<Vec<String>>,
}

impl FakeDb {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            explain: Ok(QueryResult::default()),
            rows: QueryResult::default(),
            schema: Some(shop_schema()),
            affected: 1,
            queries: Mutex::new(vec![]),
            writes: Mutex::new(vec![]),
        }
    }

    pub fn with_explain(mut self, rows: QueryResult) -> Self {
        self.explain = Ok(rows);
        self
    }

    pub fn failing_explain(mut self, message: &str) -> Self {
        self.explain = Err(message.to_string());
        self
    }

    pub fn with_rows(mut self, rows: QueryResult) -> Self {
        self.rows = rows;
        self
    }

    pub fn without_schema(mut self) -> Self {
        self.schema = None;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    // statements that actually ran, explain excluded
    pub fn executed(&self) -> Vec<String> {
        self.queries()
            .into_iter()
            .filter(|q| !q.starts_with("EXPLAIN"))
            .collect()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DbAdapter for FakeDb {
    async fn query(&self, sql: &str) -> Result<QueryResult, Error> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.rows.clone())
    }

    async fn explain(&self, sql: &str) -> Result<QueryResult, Error> {
        self.queries.lock().unwrap().push(sql.to_string());
        self.explain
            .clone()
            .map_err(|m| Error::Database(sqlx::Error::Protocol(m)))
    }

    async fn execute_write(&self, sql: &str) -> Result<u64, Error> {
        self.writes.lock().unwrap().push(sql.to_string());
        Ok(self.affected)
    }

    async fn schema(&self) -> Result<Schema, Error> {
        self.schema
            .clone()
            .ok_or_else(|| Error::Database(sqlx::Error::Protocol("no schema".into())))
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

pub struct FakeTranslator {
    pub sql: String,
    pub calls: Arc<AtomicUsize>,
}

impl FakeTranslator {
    pub fn new(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    // shared counter, still readable after the translator moves into an agent
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, _request: &str, _schema: &Schema) -> Result<String, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.sql.clone())
    }
}

// users <- orders <- order_items, plus an unrelated audit table
pub fn shop_schema() -> Schema {
    let mut schema = Schema {
        dialect: "sqlite".into(),
        ..Schema::default()
    };
    schema.tables.insert(
        "users".into(),
        vec![Column::new("id", "INTEGER"), Column::new("name", "TEXT")],
    );
    schema.tables.insert(
        "orders".into(),
        vec![Column::new("id", "INTEGER"), Column::new("user_id", "INTEGER")],
    );
    schema.tables.insert(
        "order_items".into(),
        vec![Column::new("id", "INTEGER"), Column::new("order_id", "INTEGER")],
    );
    schema
        .tables
        .insert("audit".into(), vec![Column::new("id", "INTEGER")]);
    schema.foreign_keys = vec![
        ForeignKey {
            table: "orders".into(),
            columns: vec!["user_id".into()],
            referred_table: "users".into(),
            referred_columns: vec!["id".into()],
        },
        ForeignKey {
            table: "order_items".into(),
            columns: vec!["order_id".into()],
            referred_table: "orders".into(),
            referred_columns: vec!["id".into()],
        },
    ];
    schema
}

pub fn result(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult::new(columns.iter().map(|c| c.to_string()).collect(), rows)
}

// what the typed postgres pool decodes for EXPLAIN (FORMAT JSON)
pub fn postgres_explain(plan: Value) -> QueryResult {
    result(&["QUERY PLAN"], vec![vec![json!([{ "Plan": plan }])]])
}

// the same plan when a driver hands the column back as text
pub fn postgres_explain_text(plan: Value) -> QueryResult {
    let body = json!([{ "Plan": plan }]).to_string();
    result(&["QUERY PLAN"], vec![vec![Value::String(body)]])
}

pub fn sqlite_explain(details: &[&str]) -> QueryResult {
    let rows = details
        .iter()
        .enumerate()
        .map(|(i, d)| vec![json!(i), json!(0), json!(0), json!(d)])
        .collect();
    result(&["id", "parent", "notused", "detail"], rows)
}
