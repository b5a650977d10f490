mod fetch;
mod issuers;
mod process;
mod update;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tefas_core::interchange::RAW_FILE_NAME;
use tefas_core::report::PROCESSED_FILE_NAME;
use tefas_core::{
    write_funds_to_path, CatalogFetcher, ExporterConfig, FetchError, Fund, FundCode,
    FundDataManager, ProcessedTable, RecordFetcher, ReqwestHttpClient, Requester, TaskFailure,
};
use tracing::info;

use crate::cli::{Cli, Command, ExportArgs};
use crate::error::CliError;

/// One fund the run could not produce.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub code: String,
    pub reason: String,
}

pub struct CommandResult {
    pub data: Value,
    pub failures: Vec<FailureRecord>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            failures: Vec::new(),
        }
    }

    pub fn with_failures(mut self, failures: &[(FundCode, TaskFailure<FetchError>)]) -> Self {
        self.failures.extend(failures.iter().map(|(code, failure)| FailureRecord {
            code: code.to_string(),
            reason: failure.to_string(),
        }));
        self
    }
}

/// Files written by a run.
#[derive(Debug, Serialize)]
pub struct ExportPaths {
    pub raw: Option<PathBuf>,
    pub processed: Option<PathBuf>,
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let config = load_config(cli)?;

    match &cli.command {
        Command::Fetch(args) => fetch::run(args, config).await,
        Command::Update(args) => update::run(args, config).await,
        Command::Process(args) => process::run(args),
        Command::Issuers => issuers::run(&config).await,
    }
}

/// Environment configuration with global flag overrides applied.
fn load_config(cli: &Cli) -> Result<ExporterConfig, CliError> {
    let mut config = ExporterConfig::from_env()?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
    if let Some(attempts) = cli.retry_attempts {
        config.retry_attempts = attempts;
    }
    Ok(config)
}

fn requester(config: &ExporterConfig) -> Arc<Requester> {
    Arc::new(Requester::from_config(
        Arc::new(ReqwestHttpClient::new()),
        config,
    ))
}

/// Wires the fetchers; the issuer directory is read on the first catalog listing.
fn manager(config: &ExporterConfig, requester: &Arc<Requester>) -> FundDataManager {
    let catalog = CatalogFetcher::loading_issuers(Arc::clone(requester))
        .with_fund_type(config.fund_type.clone());
    FundDataManager::new(catalog, RecordFetcher::new(Arc::clone(requester)))
        .with_max_workers(config.max_workers)
}

fn write_exports(funds: &[Fund], export: &ExportArgs) -> Result<ExportPaths, CliError> {
    fs::create_dir_all(&export.output)?;

    let raw = export.output.join(RAW_FILE_NAME);
    write_funds_to_path(&raw, funds)?;
    info!(path = %raw.display(), funds = funds.len(), "wrote raw export");

    let processed = if export.no_processed {
        None
    } else {
        Some(write_processed(funds, &export.output)?)
    };

    Ok(ExportPaths {
        raw: Some(raw),
        processed,
    })
}

fn write_processed(funds: &[Fund], directory: &Path) -> Result<PathBuf, CliError> {
    fs::create_dir_all(directory)?;
    let path = directory.join(PROCESSED_FILE_NAME);
    ProcessedTable::from_funds(funds).write_to_path(&path)?;
    info!(path = %path.display(), funds = funds.len(), "wrote processed export");
    Ok(path)
}
