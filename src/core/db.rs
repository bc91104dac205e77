// database connection, query execution and schema introspection
// supports postgres, sqlite, and mysql

use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{AnyPool, Column as _, Row, any::AnyPoolOptions};
use std::collections::BTreeMap;

use super::dialect::Dialect;
use super::schema::{Column, ForeignKey, Schema};

/// What the planner needs from a database.
#[async_trait]
pub trait DbAdapter: Send + Sync {
    async fn query(&self, sql: &str) -> Result<QueryResult, Error>;

    /// Run an INSERT/UPDATE/DELETE and return the affected row count.
    async fn execute_write(&self, sql: &str) -> Result<u64, Error>;

    /// Run an EXPLAIN statement built for this adapter's dialect.
    async fn explain(&self, sql: &str) -> Result<QueryResult, Error> {
        self.query(sql).await
    }

    async fn schema(&self) -> Result<Schema, Error>;

    fn dialect(&self) -> Dialect;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&serde_json::Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    // rows keyed by column name, the shape callers usually want to serialize
    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

pub struct Db {
    pool: AnyPool,
    // typed pool for plans; the any driver can't decode postgres json
    plans: Option<PgPool>,
    dialect: Dialect,
}

impl Db {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        sqlx::any::install_default_drivers();

        // figure out which database we're talking to
        let dialect = Dialect::from_url(url);

        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;

        let plans = match dialect {
            Dialect::Postgres => Some(
                PgPoolOptions::new()
                    .max_connections(2)
                    .connect(url)
                    .await?,
            ),
            _ => None,
        };

        tracing::debug!(%dialect, "connected");
        Ok(Self {
            pool,
            plans,
            dialect,
        })
    }

    async fn postgres_schema(&self) -> Result<Schema, Error> {
        let columns: Vec<(String, String, String)> = sqlx::query_as(
            r#"SELECT table_name::text, column_name::text, data_type::text
               FROM information_schema.columns
               WHERE table_schema = 'public'
               ORDER BY table_name, ordinal_position"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let keys: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"SELECT tc.constraint_name::text, tc.table_name::text, kcu.column_name::text,
                      ccu.table_name::text, ccu.column_name::text
               FROM information_schema.table_constraints tc
               JOIN information_schema.key_column_usage kcu
                 ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
               JOIN information_schema.constraint_column_usage ccu
                 ON ccu.constraint_name = tc.constraint_name
                AND ccu.table_schema = tc.table_schema
               WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = 'public'
               ORDER BY tc.table_name, tc.constraint_name, kcu.ordinal_position"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(build_schema(self.dialect, columns, group_foreign_keys(keys)))
    }

    async fn sqlite_schema(&self) -> Result<Schema, Error> {
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&self.pool)
        .await?;

        // pragma rows are read by column name; the any driver is picky about
        // integer widths so ids go through the json conversion instead
        let mut columns = Vec::new();
        let mut keys = Vec::new();
        for (table,) in tables {
            let query = format!("PRAGMA table_info(\"{}\")", table);
            for row in sqlx::query(&query).fetch_all(&self.pool).await? {
                let name: String = row.try_get("name")?;
                let dtype: Option<String> = row.try_get("type")?;
                columns.push((table.clone(), name, dtype.unwrap_or_default()));
            }

            // one row per column pair, grouped by the fk id
            let query = format!("PRAGMA foreign_key_list(\"{}\")", table);
            for row in sqlx::query(&query).fetch_all(&self.pool).await? {
                let id = row_value_to_json(&row, 0).to_string();
                let referred: String = row.try_get("table")?;
                let from: String = row.try_get("from")?;
                let to: Option<String> = row.try_get("to")?;
                keys.push((id, table.clone(), from, referred, to.unwrap_or_default()));
            }
        }

        Ok(build_schema(self.dialect, columns, group_foreign_keys(keys)))
    }

    async fn mysql_schema(&self) -> Result<Schema, Error> {
        let columns: Vec<(String, String, String)> = sqlx::query_as(
            r#"SELECT table_name, column_name, data_type
               FROM information_schema.columns
               WHERE table_schema = DATABASE()
               ORDER BY table_name, ordinal_position"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let keys: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"SELECT constraint_name, table_name, column_name,
                      referenced_table_name, referenced_column_name
               FROM information_schema.key_column_usage
               WHERE table_schema = DATABASE() AND referenced_table_name IS NOT NULL
               ORDER BY table_name, constraint_name, ordinal_position"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(build_schema(self.dialect, columns, group_foreign_keys(keys)))
    }
}

#[async_trait]
impl DbAdapter for Db {
    // run the sql and return results as json
    async fn query(&self, sql: &str) -> Result<QueryResult, Error> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        if rows.is_empty() {
            return Ok(QueryResult::default());
        }

        let columns: Vec<String> = rows[0]
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let json_rows: Vec<Vec<serde_json::Value>> = rows
            .iter()
            .map(|row| {
                (0..columns.len())
                    .map(|i| row_value_to_json(row, i))
                    .collect()
            })
            .collect();

        Ok(QueryResult::new(columns, json_rows))
    }

    async fn execute_write(&self, sql: &str) -> Result<u64, Error> {
        let done = sqlx::query(sql).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn explain(&self, sql: &str) -> Result<QueryResult, Error> {
        let Some(pg) = &self.plans else {
            return self.query(sql).await;
        };

        // one json document per row, kept as json rather than text
        let rows = sqlx::query(sql).fetch_all(pg).await?;
        let plans = rows
            .iter()
            .map(|row| row.try_get::<serde_json::Value, _>(0).map(|plan| vec![plan]))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryResult::new(vec!["QUERY PLAN".to_string()], plans))
    }

    async fn schema(&self) -> Result<Schema, Error> {
        match self.dialect {
            Dialect::Postgres => self.postgres_schema().await,
            Dialect::Mysql => self.mysql_schema().await,
            // anything else the any driver accepted is treated like sqlite
            Dialect::Sqlite | Dialect::Generic => self.sqlite_schema().await,
        }
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

fn build_schema(
    dialect: Dialect,
    columns: Vec<(String, String, String)>,
    foreign_keys: Vec<ForeignKey>,
) -> Schema {
    let mut tables: BTreeMap<String, Vec<Column>> = BTreeMap::new();
    for (table, column, dtype) in columns {
        tables.entry(table).or_default().push(Column::new(column, dtype));
    }

    Schema {
        dialect: dialect.tag().to_string(),
        tables,
        foreign_keys,
    }
}

// rows are (constraint, table, column, referred table, referred column),
// one per column pair; multi-column keys collapse into one ForeignKey
fn group_foreign_keys(rows: Vec<(String, String, String, String, String)>) -> Vec<ForeignKey> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut keys: BTreeMap<(String, String), ForeignKey> = BTreeMap::new();

    for (constraint, table, column, referred_table, referred_column) in rows {
        if table.is_empty() || referred_table.is_empty() {
            continue;
        }

        let id = (table.clone(), constraint);
        let fk = keys.entry(id.clone()).or_insert_with(|| {
            order.push(id);
            ForeignKey {
                table,
                columns: vec![],
                referred_table,
                referred_columns: vec![],
            }
        });

        if !fk.columns.contains(&column) {
            fk.columns.push(column);
        }
        if !referred_column.is_empty() && !fk.referred_columns.contains(&referred_column) {
            fk.referred_columns.push(referred_column);
        }
    }

    order
        .into_iter()
        .filter_map(|id| keys.remove(&id))
        .collect()
}

// convert database values to json (handling type mismatches gracefully)
fn row_value_to_json(row: &sqlx::any::AnyRow, index: usize) -> serde_json::Value {
    use sqlx::ValueRef;

    // null check first
    if row.try_get_raw(index).map(|v| v.is_null()).unwrap_or(true) {
        return serde_json::Value::Null;
    }

    // try types in order of how common they are
    if let Ok(v) = row.try_get::<String, _>(index) {
        return serde_json::Value::String(v);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return serde_json::Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<i32, _>(index) {
        return serde_json::Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return serde_json::Value::Bool(v);
    }

    // give up - some postgres types just don't work with the any driver
    serde_json::Value::String("<unsupported>".to_string())
}
