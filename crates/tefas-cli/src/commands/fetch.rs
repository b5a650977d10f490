use serde::Serialize;
use tefas_core::CatalogSelection;
use tracing::info;

use crate::cli::FetchArgs;
use crate::error::CliError;

use super::{manager, requester, write_exports, CommandResult, ExportPaths};

#[derive(Debug, Serialize)]
struct FetchSummary {
    selection: String,
    range: Option<String>,
    attempted: usize,
    fetched: usize,
    failed: usize,
    files: ExportPaths,
}

pub async fn run(
    args: &FetchArgs,
    mut config: tefas_core::ExporterConfig,
) -> Result<CommandResult, CliError> {
    if let Some(max_workers) = args.max_workers {
        config = config.with_max_workers(max_workers);
    }

    let selection = if !args.issuers.is_empty() {
        CatalogSelection::Issuers(args.issuers.clone())
    } else if args.listed_only {
        CatalogSelection::Listed
    } else {
        CatalogSelection::All
    };
    let price_range = args
        .range
        .map(|frame| frame.range_ending(config.today()))
        .transpose()?;

    let requester = requester(&config);
    let manager = manager(&config, &requester).with_price_range(price_range);

    let report = manager.fetch_all(&selection).await?;
    info!(
        fetched = report.funds.len(),
        failed = report.failures.len(),
        "fetch finished"
    );

    let files = write_exports(&report.funds, &args.export)?;
    let summary = FetchSummary {
        selection: format!("{selection:?}"),
        range: price_range.map(|range| range.to_string()),
        attempted: report.attempted(),
        fetched: report.funds.len(),
        failed: report.failures.len(),
        files,
    };

    Ok(CommandResult::ok(serde_json::to_value(summary)?).with_failures(&report.failures))
}
