// schema metadata - tables, columns and foreign keys
// produced by Db::schema, read by the join-path finder, the translator and the erd

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub dialect: String,
    // btree so the serialized form (and cache keys) never depend on insertion order
    pub tables: BTreeMap<String, Vec<Column>>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub table: String,
    pub columns: Vec<String>,
    pub referred_table: String,
    #[serde(default)]
    pub referred_columns: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

impl Schema {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    // readable text for the translator prompt
    pub fn to_prompt(&self) -> String {
        let mut result = String::new();

        for (table, columns) in &self.tables {
            if !result.is_empty() {
                result.push_str("\n\n");
            }
            result.push_str(&format!("TABLE {table} (\n"));
            for column in columns {
                result.push_str(&format!("  {} {}\n", column.name, column.data_type));
            }
            result.push(')');
        }

        if !self.foreign_keys.is_empty() {
            result.push_str("\n\nRELATIONSHIPS\n");
            for fk in &self.foreign_keys {
                result.push_str(&format!(
                    "  {}({}) -> {}({})\n",
                    fk.table,
                    fk.columns.join(", "),
                    fk.referred_table,
                    fk.referred_columns.join(", ")
                ));
            }
        }

        result
    }
}
