use serde_json::json;
use sqlgate_core::{ArgSlot, ALL_ACTIONS};

use crate::cli::args::{ActionsArgs, OutputFormat};
use crate::exit_codes;

pub fn run(args: ActionsArgs) -> anyhow::Result<i32> {
    match args.format {
        OutputFormat::Json => {
            let actions: Vec<_> = ALL_ACTIONS
                .iter()
                .map(|action| {
                    json!({
                        "code": action.as_raw(),
                        "name": action.as_str(),
                        "schema": action.schema(),
                        "schema_change": action.is_schema_change(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&actions)?);
        }
        OutputFormat::Text => {
            println!("{:>4}  {:<20} {:<18} {:<18} DDL", "CODE", "NAME", "ARG1", "ARG2");
            for action in ALL_ACTIONS {
                let schema = action.schema();
                println!(
                    "{:>4}  {:<20} {:<18} {:<18} {}",
                    action.as_raw(),
                    action.as_str(),
                    slot(schema.arg1),
                    slot(schema.arg2),
                    if action.is_schema_change() { "yes" } else { "" }
                );
            }
        }
    }
    Ok(exit_codes::SUCCESS)
}

fn slot(slot: ArgSlot) -> String {
    match slot {
        ArgSlot::Absent => "-".to_string(),
        ArgSlot::Required(label) => label.to_string(),
        ArgSlot::Optional(label) => format!("[{label}]"),
    }
}
