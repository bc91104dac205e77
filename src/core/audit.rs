// append-only audit trail, one json object per line

use crate::Error;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record an event. Failures are logged and swallowed: losing an audit
    /// line must not fail the request that produced it.
    pub fn record<T: Serialize>(&self, event: &str, payload: &T) {
        if let Err(e) = self.try_record(event, payload) {
            tracing::warn!(event, error = %e, "audit write failed");
        }
    }

    pub fn try_record<T: Serialize>(&self, event: &str, payload: &T) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut line = Map::new();
        line.insert("ts".into(), Value::String(chrono::Utc::now().to_rfc3339()));
        line.insert("event".into(), Value::String(event.to_string()));
        match serde_json::to_value(payload)? {
            Value::Object(fields) => line.extend(fields),
            Value::Null => {}
            other => {
                line.insert("payload".into(), other);
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", Value::Object(line))?;
        Ok(())
    }
}
