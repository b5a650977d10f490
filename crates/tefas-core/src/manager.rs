//! Catalog selection plus concurrent record fetching.

use std::sync::Arc;

use tracing::info;

use crate::catalog::{CatalogFetcher, FundCatalog};
use crate::domain::{DateRange, Fund, FundCode};
use crate::error::FetchError;
use crate::pipeline::{fetch_many, TaskFailure, DEFAULT_MAX_WORKERS};
use crate::record::RecordFetcher;

/// Which part of the catalog a full fetch covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CatalogSelection {
    #[default]
    All,
    Listed,
    Issuers(Vec<String>),
}

/// Funds fetched by one run and the identifiers that failed.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Sorted by fund code.
    pub funds: Vec<Fund>,
    /// Sorted by fund code.
    pub failures: Vec<(FundCode, TaskFailure<FetchError>)>,
}

impl FetchReport {
    pub fn attempted(&self) -> usize {
        self.funds.len() + self.failures.len()
    }
}

#[derive(Debug, Clone)]
pub struct FundDataManager {
    catalog: CatalogFetcher,
    records: RecordFetcher,
    max_workers: usize,
    price_range: Option<DateRange>,
}

impl FundDataManager {
    pub fn new(catalog: CatalogFetcher, records: RecordFetcher) -> Self {
        Self {
            catalog,
            records,
            max_workers: DEFAULT_MAX_WORKERS,
            price_range: None,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Keeps only prices inside `range` on every fetched fund.
    pub fn with_price_range(mut self, range: Option<DateRange>) -> Self {
        self.price_range = range;
        self
    }

    pub fn catalog(&self) -> &CatalogFetcher {
        &self.catalog
    }

    pub async fn resolve_catalog(
        &self,
        selection: &CatalogSelection,
    ) -> Result<FundCatalog, FetchError> {
        match selection {
            CatalogSelection::All => self.catalog.fetch_all_identifiers().await,
            CatalogSelection::Listed => self.catalog.fetch_listed_identifiers().await,
            CatalogSelection::Issuers(codes) => {
                self.catalog.fetch_identifiers_for_issuers(codes).await
            }
        }
    }

    /// Resolves the catalog, then fetches every record in it.
    ///
    /// A catalog failure aborts the run; record failures are collected in the report.
    pub async fn fetch_all(&self, selection: &CatalogSelection) -> Result<FetchReport, FetchError> {
        let catalog = self.resolve_catalog(selection).await?;
        info!(funds = catalog.len(), ?selection, "resolved catalog");
        Ok(self.fetch_funds(catalog).await)
    }

    pub async fn fetch_funds(&self, catalog: FundCatalog) -> FetchReport {
        let codes: Vec<FundCode> = catalog.keys().cloned().collect();
        let catalog = Arc::new(catalog);
        let records = self.records.clone();
        let range = self.price_range;

        let outcome = fetch_many(
            codes,
            move |code: FundCode| {
                let records = records.clone();
                let catalog = Arc::clone(&catalog);
                async move {
                    let issuer = catalog.get(&code).and_then(Option::as_ref);
                    let fund = records.fetch_record(&code, issuer).await?;
                    let fund = match range {
                        Some(range) => fund.restricted_to(&range)?,
                        None => fund,
                    };
                    Ok::<_, FetchError>(fund)
                }
            },
            self.max_workers,
        )
        .await
        .sorted();

        FetchReport {
            funds: outcome.results.into_iter().map(|(_, fund)| fund).collect(),
            failures: outcome.errors,
        }
    }
}
