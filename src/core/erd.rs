// mermaid er diagram from schema metadata

use regex::Regex;
use std::sync::LazyLock;

use super::schema::Schema;

static NON_IDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_]").unwrap());

fn sanitize(value: &str) -> String {
    let cleaned = NON_IDENT.replace_all(value, "_");
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned.into_owned()
    }
}

pub fn build_erd_mermaid(schema: &Schema) -> String {
    let mut lines = vec!["erDiagram".to_string()];

    for (table, columns) in &schema.tables {
        lines.push(format!("  {} {{", sanitize(table)));
        for column in columns {
            lines.push(format!(
                "    {} {}",
                sanitize(&column.data_type),
                sanitize(&column.name)
            ));
        }
        lines.push("  }".to_string());
    }

    for fk in &schema.foreign_keys {
        let label = if fk.columns.is_empty() {
            "fk".to_string()
        } else {
            fk.columns
                .iter()
                .map(|c| sanitize(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        lines.push(format!(
            "  {} ||--o{{ {} : \"{label}\"",
            sanitize(&fk.referred_table),
            sanitize(&fk.table)
        ));
    }

    lines.join("\n")
}
