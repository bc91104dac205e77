// sqlgate library - guardrailed sql planning and execution

pub mod cli;
pub mod config;
pub mod core;
mod error;
pub mod logging;
pub mod output;
mod server;

pub use self::core::{
    Agent, Db, DbAdapter, PolicyDecision, QueryPlan, QueryResult, Schema, apply_limit,
    build_query_plan, evaluate_policy, has_limit, validate_read, validate_write,
};
pub use error::Error;
pub use server::Server;
