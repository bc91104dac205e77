// command line interface

use std::path::PathBuf;

use crate::config::Settings;
use crate::core::{
    Limits, QueryPlan, RunMode, RunOptions, RunOutcome, WriteOutcome, evaluate_policy,
    validate_read, validate_write,
};
use crate::output::{self, Format};
use crate::{Server, logging};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "sqlgate", about = "Plan, gate and run sql with guardrails")]
struct Cli {
    /// database connection url
    #[arg(long, short, env = "DATABASE_URL", global = true)]
    db: Option<String>,

    /// api key for natural language requests
    #[arg(long, short = 'k', global = true)]
    api_key: Option<String>,

    /// log filter (e.g. info, sqlgate=debug)
    #[arg(long, env = "SQLGATE_LOG", default_value = "info", global = true)]
    log_level: String,

    /// emit logs as json lines
    #[arg(long, global = true)]
    log_json: bool,

    /// append audit events to this jsonl file
    #[arg(long, env = "AUDIT_LOG_PATH", global = true)]
    audit_log: Option<PathBuf>,

    /// row bound added to reads without a LIMIT
    #[arg(long, default_value_t = 1000, global = true)]
    safe_limit: u64,

    /// row bound for preview runs
    #[arg(long, default_value_t = 50, global = true)]
    preview_limit: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// explain and risk-score a query without running it
    Plan { sql: String },

    /// validate and gate a query offline (no database needed)
    Check {
        sql: String,

        /// check as a write statement
        #[arg(long)]
        write: bool,
    },

    /// run a read query through the safety gate
    Run {
        sql: String,

        #[arg(long, value_enum, default_value_t = RunMode::Execute)]
        mode: RunMode,

        /// skip the policy gate and the safe limit
        #[arg(long = "unsafe")]
        skip_safety: bool,

        #[arg(long, short, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// run an INSERT/UPDATE/DELETE
    Write {
        sql: String,

        /// required, otherwise the read-only policy blocks the write
        #[arg(long)]
        allow_write: bool,
    },

    /// translate plain english to sql, plan it, optionally run it
    Ask {
        prompt: String,

        #[arg(long, short)]
        execute: bool,

        #[arg(long, value_enum, default_value_t = RunMode::Execute)]
        mode: RunMode,
    },

    /// print schema metadata as json
    Schema,

    /// print a mermaid er diagram
    Erd,

    /// start as http server
    Serve {
        /// port number
        #[arg(long, short, default_value = "3000")]
        port: u16,

        /// host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Serialize)]
struct CheckReport {
    validation: crate::core::Validation,
    policy: crate::core::PolicyDecision,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_json)?;

    // check is the one command that never touches the database
    if let Commands::Check { sql, write } = &cli.command {
        let validation = if *write {
            validate_write(sql)
        } else {
            validate_read(sql)
        };
        let policy = evaluate_policy(sql, &QueryPlan::default(), !*write);
        return print_json(&CheckReport { validation, policy });
    }

    let db_url = cli
        .db
        .clone()
        .ok_or_else(|| miette::miette!("database url required (--db or DATABASE_URL)"))?;

    let settings = Settings {
        db_url,
        api_key: cli.api_key.clone(),
        audit_log: cli.audit_log.clone(),
        limits: Limits {
            safe_limit: cli.safe_limit,
            preview_limit: cli.preview_limit,
        },
    };

    if let Commands::Serve { port, host } = &cli.command {
        return Ok(Server::run(&settings, host, *port).await?);
    }

    let agent = settings.connect().await?;

    match cli.command {
        Commands::Plan { sql } => print_json(&agent.plan(&sql).await),

        Commands::Run {
            sql,
            mode,
            skip_safety,
            format,
        } => {
            let options = RunOptions {
                mode,
                safe: !skip_safety,
            };
            let outcome = agent.run(&sql, options).await?;

            match &outcome {
                RunOutcome::Executed { result, .. } if format != Format::Json => {
                    println!("{}", output::render(result, format)?);
                }
                _ => print_json(&outcome)?,
            }

            match outcome.error() {
                Some(error) => Err(miette::miette!("{error}")),
                None => Ok(()),
            }
        }

        Commands::Write { sql, allow_write } => {
            let outcome = agent.write(&sql, allow_write).await?;
            print_json(&outcome)?;

            match outcome {
                WriteOutcome::Rejected { error } | WriteOutcome::Blocked { error, .. } => {
                    Err(miette::miette!("{error}"))
                }
                WriteOutcome::Written { .. } => Ok(()),
            }
        }

        Commands::Ask {
            prompt,
            execute,
            mode,
        } => {
            let options = RunOptions {
                mode,
                ..RunOptions::default()
            };
            print_json(&agent.ask(&prompt, execute, options).await?)
        }

        Commands::Schema => print_json(&agent.schema().await?),

        Commands::Erd => {
            println!("{}", agent.erd().await?);
            Ok(())
        }

        Commands::Check { .. } | Commands::Serve { .. } => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}
