use anyhow::Context;
use serde::Serialize;
use sqlgate_core::{AuditEntry, AuditTrail, Config, GuardError, GuardedConnection};

use crate::cli::args::{CheckArgs, OutputFormat};
use crate::exit_codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Compiled,
    Denied,
    Failed,
}

#[derive(Debug, Serialize)]
struct StatementReport {
    sql: String,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    requests: Vec<AuditEntry>,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    exit_code: i32,
    statements: Vec<StatementReport>,
}

pub fn run(args: CheckArgs) -> anyhow::Result<i32> {
    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("✖ {e}");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        },
        None => Config::default(),
    };

    let mut conn = match &args.db {
        Some(path) => GuardedConnection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?,
        None => GuardedConnection::open_in_memory()?,
    };

    if let Some(init) = &args.init {
        let script = std::fs::read_to_string(init)
            .with_context(|| format!("failed to read {}", init.display()))?;
        conn.execute_batch(&script)
            .with_context(|| format!("failed to run {}", init.display()))?;
    }

    let trail = AuditTrail::new();
    conn.set_authorizer(Some(config.build_authorizer(Some(trail.clone()))?))?;

    let statements: Vec<StatementReport> = args
        .sql
        .iter()
        .map(|sql| check_one(&conn, &trail, sql))
        .collect();

    let exit_code = decide_check_exit(&statements);
    let report = CheckReport {
        exit_code,
        statements,
    };
    print_report(&report, args.format)?;
    Ok(exit_code)
}

fn check_one(conn: &GuardedConnection, trail: &AuditTrail, sql: &str) -> StatementReport {
    let (outcome, error) = match conn.check(sql) {
        Ok(()) => (Outcome::Compiled, None),
        Err(e @ GuardError::Denied { .. }) => (Outcome::Denied, Some(e.to_string())),
        Err(e) => (Outcome::Failed, Some(e.to_string())),
    };
    let requests = trail.drain();
    tracing::debug!(
        event = "statement_checked",
        sql,
        outcome = ?outcome,
        requests = requests.len()
    );
    StatementReport {
        sql: sql.to_string(),
        outcome,
        error,
        requests,
    }
}

fn decide_check_exit(statements: &[StatementReport]) -> i32 {
    if statements.iter().any(|s| s.outcome == Outcome::Denied) {
        exit_codes::DENIED
    } else if statements.iter().any(|s| s.outcome == Outcome::Failed) {
        exit_codes::STATEMENT_FAILED
    } else {
        exit_codes::SUCCESS
    }
}

fn print_report(report: &CheckReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            for statement in &report.statements {
                println!("{}", statement.sql);
                for entry in &statement.requests {
                    println!("  {:<6}  {}", entry.decision.as_str(), describe(entry));
                }
                match statement.outcome {
                    Outcome::Compiled => println!("  => compiled"),
                    Outcome::Denied => println!("  => denied"),
                    Outcome::Failed => println!(
                        "  => failed: {}",
                        statement.error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
            let denied = count(report, Outcome::Denied);
            let failed = count(report, Outcome::Failed);
            let total = report.statements.len();
            if denied == 0 && failed == 0 {
                eprintln!("✔ {} statement{} compiled", total, plural(total));
            } else {
                eprintln!(
                    "✖ {} of {} statement{} denied, {} failed",
                    denied,
                    total,
                    plural(total),
                    failed
                );
            }
        }
    }
    Ok(())
}

fn describe(entry: &AuditEntry) -> String {
    let req = &entry.request;
    let mut parts = vec![req.action.to_string()];
    parts.extend(req.arg1.iter().cloned());
    parts.extend(req.arg2.iter().cloned());
    if let Some(db) = &req.arg3 {
        parts.push(format!("db={db}"));
    }
    if let Some(via) = &req.arg4 {
        parts.push(format!("via={via}"));
    }
    parts.join(" ")
}

fn count(report: &CheckReport, outcome: Outcome) -> usize {
    report
        .statements
        .iter()
        .filter(|s| s.outcome == outcome)
        .count()
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
