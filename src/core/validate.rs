// statement validation for the read and write paths
// keyword based - catches the obvious stuff, not a security boundary

use serde::Serialize;

use super::statement::Statement;

const READ_BLOCKLIST: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "truncate", "create", "grant", "revoke", "copy",
];

const WRITE_BLOCKLIST: &[&str] = &["drop", "alter", "truncate", "create", "grant", "revoke", "copy"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub ok: bool,
    pub message: String,
}

impl Validation {
    fn pass() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    fn reject(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }
}

/// Accept a single SELECT/WITH statement with no write or DDL keywords.
pub fn validate_read(sql: &str) -> Validation {
    let stmt = Statement::new(sql);
    if stmt.is_empty() {
        return Validation::reject("SQL is empty.");
    }
    if !stmt.is_read() {
        return Validation::reject("Only SELECT queries are allowed.");
    }
    check_common(&stmt, READ_BLOCKLIST)
}

/// Accept a single INSERT/UPDATE/DELETE statement with no DDL keywords.
pub fn validate_write(sql: &str) -> Validation {
    let stmt = Statement::new(sql);
    if stmt.is_empty() {
        return Validation::reject("SQL is empty.");
    }
    if !stmt.is_write() {
        return Validation::reject("Only INSERT/UPDATE/DELETE are allowed.");
    }
    check_common(&stmt, WRITE_BLOCKLIST)
}

fn check_common(stmt: &Statement, blocked: &[&str]) -> Validation {
    if stmt.has_inner_semicolon() {
        return Validation::reject("Multiple statements are not allowed.");
    }

    match blocked.iter().find(|word| stmt.has_word(word)) {
        Some(word) => Validation::reject(format!("Blocked keyword: {word}.")),
        None => Validation::pass(),
    }
}
