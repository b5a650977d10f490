use serde::Serialize;
use tefas_core::{ExporterConfig, IssuerFetcher};

use crate::error::CliError;

use super::{requester, CommandResult};

#[derive(Debug, Serialize)]
struct IssuerRow<'a> {
    code: &'a str,
    name: &'a str,
}

pub async fn run(config: &ExporterConfig) -> Result<CommandResult, CliError> {
    let issuers = IssuerFetcher::new(requester(config)).fetch_issuers().await?;
    let rows: Vec<IssuerRow<'_>> = issuers
        .iter()
        .map(|issuer| IssuerRow {
            code: issuer.code(),
            name: issuer.name(),
        })
        .collect();

    Ok(CommandResult::ok(serde_json::to_value(rows)?))
}
