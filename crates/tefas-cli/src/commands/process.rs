use serde::Serialize;
use tefas_core::read_funds_from_path;

use crate::cli::ProcessArgs;
use crate::error::CliError;

use super::{write_processed, CommandResult, ExportPaths};

#[derive(Debug, Serialize)]
struct ProcessSummary {
    funds: usize,
    files: ExportPaths,
}

pub fn run(args: &ProcessArgs) -> Result<CommandResult, CliError> {
    let funds = read_funds_from_path(&args.input)?;
    let processed = write_processed(&funds, &args.output)?;

    let summary = ProcessSummary {
        funds: funds.len(),
        files: ExportPaths {
            raw: None,
            processed: Some(processed),
        },
    };
    Ok(CommandResult::ok(serde_json::to_value(summary)?))
}
