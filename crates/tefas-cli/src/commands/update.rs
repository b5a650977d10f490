use serde::Serialize;
use tefas_core::{read_funds_from_path, HistoryFetcher, PriceUpdater};

use crate::cli::UpdateArgs;
use crate::error::CliError;

use super::{manager, requester, write_exports, CommandResult, ExportPaths};

#[derive(Debug, Serialize)]
struct UpdateSummary {
    window: String,
    funds: usize,
    updated: usize,
    revised: usize,
    inserted: usize,
    appended: usize,
    new_codes: Vec<String>,
    failed: usize,
    files: ExportPaths,
}

pub async fn run(
    args: &UpdateArgs,
    mut config: tefas_core::ExporterConfig,
) -> Result<CommandResult, CliError> {
    if let Some(max_workers) = args.max_workers {
        config = config.with_max_workers(max_workers);
    }
    if let Some(margin_days) = args.margin_days {
        config = config.with_margin_days(margin_days);
    }

    let funds = read_funds_from_path(&args.input)?;

    let requester = requester(&config);
    let history = HistoryFetcher::new(requester.clone()).with_fund_type(config.fund_type.clone());
    let updater = PriceUpdater::new(history, manager(&config, &requester))
        .with_margin_days(config.margin_days);

    let report = updater.update(funds, config.today()).await?;

    let files = write_exports(&report.funds, &args.export)?;
    let summary = UpdateSummary {
        window: report.window.to_string(),
        funds: report.funds.len(),
        updated: report.updated,
        revised: report.merge_totals.revised,
        inserted: report.merge_totals.inserted,
        appended: report.merge_totals.appended,
        new_codes: report.new_codes.iter().map(ToString::to_string).collect(),
        failed: report.failures.len(),
        files,
    };

    Ok(CommandResult::ok(serde_json::to_value(summary)?).with_failures(&report.failures))
}
