use serde_json::json;
use sqlgate_core::Config;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::exit_codes;

struct ValidateReport {
    errors: Vec<String>,
    warnings: Vec<String>,
    rules: usize,
    default: Option<String>,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let report = validate_file(&args);
    let exit_code = if report.errors.is_empty() {
        exit_codes::SUCCESS
    } else {
        exit_codes::CONFIG_ERROR
    };
    print_report(&report, &args, exit_code)?;
    Ok(exit_code)
}

fn validate_file(args: &ValidateArgs) -> ValidateReport {
    let mut report = ValidateReport {
        errors: Vec::new(),
        warnings: Vec::new(),
        rules: 0,
        default: None,
    };

    let content = match std::fs::read_to_string(&args.config) {
        Ok(content) => content,
        Err(e) => {
            report
                .errors
                .push(format!("failed to read {}: {}", args.config.display(), e));
            return report;
        }
    };

    let (config, ignored) = match Config::parse(&content) {
        Ok(parsed) => parsed,
        Err(e) => {
            report.errors.push(format!("failed to parse config: {e}"));
            return report;
        }
    };
    report.warnings = ignored
        .into_iter()
        .map(|key| format!("unknown key '{key}' ignored"))
        .collect();

    if let Err(e) = config.validate() {
        report.errors.push(e.to_string());
        return report;
    }
    report.rules = config.policy.rules.len();
    report.default = Some(config.policy.default.to_string());
    report
}

fn print_report(
    report: &ValidateReport,
    args: &ValidateArgs,
    exit_code: i32,
) -> anyhow::Result<()> {
    match args.format {
        OutputFormat::Json => {
            let doc = json!({
                "config": args.config,
                "valid": report.errors.is_empty(),
                "exit_code": exit_code,
                "errors": report.errors,
                "warnings": report.warnings,
                "rules": report.rules,
                "default": report.default,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Text => {
            // Human-readable output goes to stderr
            for warning in &report.warnings {
                eprintln!("⚠️  {warning}");
            }
            for error in &report.errors {
                eprintln!("✖ {error}");
            }
            if report.errors.is_empty() {
                eprintln!(
                    "✔ Config OK ({} rule{}, default {})",
                    report.rules,
                    if report.rules != 1 { "s" } else { "" },
                    report.default.as_deref().unwrap_or("allow")
                );
            }
        }
    }
    Ok(())
}
