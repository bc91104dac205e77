// output formatting - tables for humans, csv and json for scripts

use crate::Error;
use crate::core::QueryResult;

const MAX_CELL: usize = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    #[default]
    Json,
    Table,
    Grid,
    Csv,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    #[default]
    Simple,
    Grid,
}

pub fn render(result: &QueryResult, format: Format) -> Result<String, Error> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(&result.records())?),
        Format::Table => Ok(format_table(result, TableStyle::Simple)),
        Format::Grid => Ok(format_table(result, TableStyle::Grid)),
        Format::Csv => format_csv(result),
    }
}

pub fn format_table(result: &QueryResult, style: TableStyle) -> String {
    if result.columns.is_empty() {
        return String::new();
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| truncate(format_value(v))).collect())
        .collect();

    // figure out column widths, capped so things don't get crazy
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.len().min(MAX_CELL)).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let columns: Vec<String> = result.columns.iter().cloned().map(truncate).collect();

    match style {
        TableStyle::Simple => {
            let mut lines = vec![
                line(&columns, &widths, " | "),
                widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"),
            ];
            lines.extend(cells.iter().map(|row| line(row, &widths, " | ")));
            lines.join("\n")
        }
        TableStyle::Grid => {
            let border = format!(
                "+{}+",
                widths
                    .iter()
                    .map(|w| "-".repeat(w + 2))
                    .collect::<Vec<_>>()
                    .join("+")
            );
            let boxed = |values: &[String]| format!("| {} |", line(values, &widths, " | "));

            let mut lines = vec![border.clone(), boxed(columns.as_slice()), border.clone()];
            lines.extend(cells.iter().map(|row| boxed(row.as_slice())));
            lines.push(border);
            lines.join("\n")
        }
    }
}

pub fn format_csv(result: &QueryResult) -> Result<String, Error> {
    if result.columns.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(&result.columns)?;
    for row in &result.rows {
        writer.write_record(row.iter().map(format_value))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
}

pub fn format_value(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => val.to_string(),
    }
}

fn line(values: &[String], widths: &[usize], sep: &str) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(v, &w)| format!("{v:w$}"))
        .collect::<Vec<_>>()
        .join(sep)
}

fn truncate(s: String) -> String {
    if s.chars().count() > MAX_CELL {
        let head: String = s.chars().take(MAX_CELL - 3).collect();
        format!("{head}...")
    } else {
        s
    }
}
