// which database engine we're talking to
// each variant owns its EXPLAIN shape and how to read the plan back

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::analyze::{self, PlanMetrics};
use super::db::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    Postgres,
    Sqlite,
    Mysql,
    #[default]
    Generic,
}

impl Dialect {
    /// Parse a dialect tag as reported by a driver ("postgresql", "sqlite", ...).
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Self::Postgres,
            "sqlite" => Self::Sqlite,
            "mysql" | "mariadb" => Self::Mysql,
            _ => Self::Generic,
        }
    }

    /// Figure out the dialect from a connection string.
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Self::Postgres
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Self::Mysql
        } else if url.starts_with("sqlite:") {
            Self::Sqlite
        } else {
            Self::Generic
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Postgres => "postgresql",
            Self::Sqlite => "sqlite",
            Self::Mysql => "mysql",
            Self::Generic => "sql",
        }
    }

    /// Wrap a statement body (no trailing semicolon) in this engine's EXPLAIN.
    pub fn explain(&self, body: &str) -> String {
        match self {
            Self::Sqlite => format!("EXPLAIN QUERY PLAN {body}"),
            Self::Postgres => format!("EXPLAIN (FORMAT JSON) {body}"),
            Self::Mysql | Self::Generic => format!("EXPLAIN {body}"),
        }
    }

    /// Pull cost, row estimates and structural risks out of EXPLAIN rows.
    ///
    /// Engines without a plan reader degrade to empty metrics.
    pub fn analyze(&self, rows: &QueryResult) -> PlanMetrics {
        match self {
            Self::Postgres => analyze::postgres(rows),
            Self::Sqlite => analyze::sqlite(rows),
            Self::Mysql | Self::Generic => PlanMetrics::default(),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for Dialect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for Dialect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}
