use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::commands::{CommandResult, FailureRecord};
use crate::error::CliError;

#[derive(Serialize)]
struct Summary<'a> {
    data: &'a Value,
    failures: &'a [FailureRecord],
}

/// Writes the run summary as one JSON document on stdout.
pub fn render(result: &CommandResult, pretty: bool) -> Result<(), CliError> {
    let summary = Summary {
        data: &result.data,
        failures: &result.failures,
    };
    let rendered = if pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
