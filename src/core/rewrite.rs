// safe sql rewriting - make sure every read has a row bound

use regex::Regex;
use std::sync::LazyLock;

static LIMIT_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\blimit\b").unwrap());

/// True when the statement already carries a `LIMIT` token (any case).
pub fn has_limit(sql: &str) -> bool {
    LIMIT_WORD.is_match(sql)
}

/// Split off one trailing semicolon, ignoring trailing whitespace.
///
/// Returns the statement body and the removed terminator (`";"` or `""`).
pub fn strip_trailing_semicolon(sql: &str) -> (&str, &str) {
    let text = sql.trim_end();
    match text.strip_suffix(';') {
        Some(base) => (base, ";"),
        None => (text, ""),
    }
}

/// Append `LIMIT n` unless the statement already has a limit.
///
/// The boolean is `true` only when the clause was added.
pub fn apply_limit(sql: &str, limit: u64) -> (String, bool) {
    if has_limit(sql) {
        return (sql.to_string(), false);
    }

    let (base, semi) = strip_trailing_semicolon(sql);
    (format!("{base} LIMIT {limit}{semi}"), true)
}
