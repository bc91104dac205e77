// runtime settings, resolved once from cli flags and env vars

use std::path::PathBuf;

use crate::Error;
use crate::core::{Agent, AuditLog, Claude, Db, Limits};

#[derive(Debug, Clone)]
pub struct Settings {
    pub db_url: String,
    pub api_key: Option<String>,
    pub audit_log: Option<PathBuf>,
    pub limits: Limits,
}

impl Settings {
    pub async fn connect(&self) -> Result<Agent<Db>, Error> {
        let db = Db::connect(&self.db_url).await?;

        let audit = match &self.audit_log {
            Some(path) => AuditLog::to_file(path),
            None => AuditLog::disabled(),
        };

        let agent = Agent::new(db).with_audit(audit).with_limits(self.limits);

        // plan/run/write work without a translator; only ask needs one
        match Claude::new(self.api_key.clone()) {
            Ok(claude) => Ok(agent.with_translator(claude)),
            Err(e) => {
                tracing::debug!(error = %e, "translator disabled");
                Ok(agent)
            }
        }
    }
}
