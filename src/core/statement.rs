// normalized view of a sql statement
// lowercased, whitespace collapsed - the keyword checks below are
// substring heuristics over this text, not a tokenizer

use super::rewrite;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    text: String,
}

impl Statement {
    pub fn new(sql: &str) -> Self {
        let text = sql
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn starts_with_any(&self, prefixes: &[&str]) -> bool {
        prefixes.iter().any(|p| self.text.starts_with(p))
    }

    pub fn is_read(&self) -> bool {
        self.starts_with_any(&["select", "with"])
    }

    pub fn is_write(&self) -> bool {
        self.starts_with_any(&["insert", "update", "delete"])
    }

    // " word " inside " text ", so "deleted_at" never matches "delete"
    pub fn has_word(&self, word: &str) -> bool {
        format!(" {} ", self.text).contains(&format!(" {word} "))
    }

    // a trailing semicolon is fine, anything before the last char is not
    pub fn has_inner_semicolon(&self) -> bool {
        match self.text.char_indices().last() {
            Some((last, _)) => self.text[..last].contains(';'),
            None => false,
        }
    }

    pub fn has_limit(&self) -> bool {
        rewrite::has_limit(&self.text)
    }

    // no WHERE and no LIMIT means the read can touch every row
    pub fn is_unbounded(&self) -> bool {
        !self.has_word("where") && !self.has_limit()
    }
}
