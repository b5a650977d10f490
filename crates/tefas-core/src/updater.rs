//! Incremental refresh of an existing fund dataset.
//!
//! The refresh window starts `margin_days` before the most recent price in
//! the dataset so late corrections published by the source are picked up.
//! Observed prices are merged into known funds; codes the dataset has never
//! seen are resolved through the catalog and fetched as full records.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use time::{Date, Duration};
use tracing::{debug, info, warn};

use crate::catalog::CatalogFetcher;
use crate::domain::{format_date, DateRange, Fund, FundCode, MergeReport, Price};
use crate::error::FetchError;
use crate::manager::FundDataManager;
use crate::pipeline::TaskFailure;
use crate::requester::Requester;
use crate::source::Endpoint;

pub const DEFAULT_MARGIN_DAYS: u32 = 7;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("cannot refresh an empty dataset")]
    EmptyDataset,

    #[error("refresh window could not be computed from {last}")]
    Window { last: Date },

    #[error("price history fetch failed: {0}")]
    History(#[source] FetchError),

    #[error("catalog lookup for new funds failed: {0}")]
    Catalog(#[source] FetchError),
}

/// Window `[last − margin_days, today]` where `last` is the latest price date
/// across `funds`. The start never passes `today`.
pub fn refresh_window(
    funds: &[Fund],
    margin_days: u32,
    today: Date,
) -> Result<DateRange, UpdateError> {
    let last = funds
        .iter()
        .map(|fund| fund.date_range().end())
        .max()
        .ok_or(UpdateError::EmptyDataset)?;
    let start = last
        .checked_sub(Duration::days(i64::from(margin_days)))
        .ok_or(UpdateError::Window { last })?;

    DateRange::new(start.min(today), today).map_err(|_| UpdateError::Window { last })
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    data: Vec<HistoryRow>,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "FONKODU", default)]
    fund_code: Option<String>,
    #[serde(rename = "FIYAT", default)]
    price: Option<serde_json::Value>,
}

impl HistoryRow {
    fn price_value(&self) -> Option<f64> {
        match self.price.as_ref()? {
            serde_json::Value::Number(number) => number.as_f64(),
            serde_json::Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Daily price snapshots across all funds.
#[derive(Debug, Clone)]
pub struct HistoryFetcher {
    requester: Arc<Requester>,
    fund_type: String,
}

impl HistoryFetcher {
    pub fn new(requester: Arc<Requester>) -> Self {
        Self {
            requester,
            fund_type: String::from("YAT"),
        }
    }

    pub fn with_fund_type(mut self, fund_type: impl Into<String>) -> Self {
        self.fund_type = fund_type.into();
        self
    }

    /// Every fund's price for `day`; zero prices are skipped.
    pub async fn fetch_day(&self, day: Date) -> Result<Vec<(FundCode, Price)>, FetchError> {
        let formatted = format_date(day);
        let response: HistoryResponse = self
            .requester
            .post_json(
                &Endpoint::HistoryInfo,
                &[
                    ("fontip", self.fund_type.as_str()),
                    ("bastarih", formatted.as_str()),
                    ("bittarih", formatted.as_str()),
                ],
            )
            .await?;

        let mut observed = Vec::with_capacity(response.data.len());
        for row in response.data {
            let Some(raw_code) = row.fund_code.as_deref() else {
                continue;
            };
            let Some(value) = row.price_value() else {
                warn!(code = raw_code, day = %formatted, "skipping history row without price");
                continue;
            };
            let parsed = FundCode::parse(raw_code)
                .and_then(|code| Ok((code, Price::observed(day, value)?)));
            match parsed {
                Ok((code, Some(price))) => observed.push((code, price)),
                Ok((_, None)) => {}
                Err(error) => {
                    warn!(code = raw_code, day = %formatted, %error, "skipping history row");
                }
            }
        }

        debug!(day = %formatted, rows = observed.len(), "fetched daily prices");
        Ok(observed)
    }

    /// Prices for every day of `range`, grouped by fund in date order.
    ///
    /// Any terminal failure aborts the whole window.
    pub async fn fetch_window(
        &self,
        range: &DateRange,
    ) -> Result<BTreeMap<FundCode, Vec<Price>>, FetchError> {
        let mut by_code: BTreeMap<FundCode, Vec<Price>> = BTreeMap::new();
        for day in range.days() {
            for (code, price) in self.fetch_day(day).await? {
                by_code.entry(code).or_default().push(price);
            }
        }
        Ok(by_code)
    }
}

/// Result of one incremental refresh.
#[derive(Debug)]
pub struct UpdateReport {
    /// Existing funds (merged) followed by newly fetched ones, sorted by code.
    pub funds: Vec<Fund>,
    pub window: DateRange,
    /// Funds whose price series changed.
    pub updated: usize,
    pub merge_totals: MergeReport,
    /// Codes observed in the window that the dataset did not contain.
    pub new_codes: Vec<FundCode>,
    pub failures: Vec<(FundCode, TaskFailure<FetchError>)>,
}

#[derive(Debug, Clone)]
pub struct PriceUpdater {
    history: HistoryFetcher,
    catalog: CatalogFetcher,
    manager: FundDataManager,
    margin_days: u32,
}

impl PriceUpdater {
    pub fn new(history: HistoryFetcher, manager: FundDataManager) -> Self {
        Self {
            history,
            catalog: manager.catalog().clone(),
            manager,
            margin_days: DEFAULT_MARGIN_DAYS,
        }
    }

    pub fn with_margin_days(mut self, margin_days: u32) -> Self {
        self.margin_days = margin_days;
        self
    }

    /// Refreshes `funds` up to `today`, resolved once by the caller.
    pub async fn update(&self, funds: Vec<Fund>, today: Date) -> Result<UpdateReport, UpdateError> {
        let window = refresh_window(&funds, self.margin_days, today)?;
        info!(%window, funds = funds.len(), "refreshing prices");

        let observed = self
            .history
            .fetch_window(&window)
            .await
            .map_err(UpdateError::History)?;

        let mut by_code: BTreeMap<FundCode, Fund> = BTreeMap::new();
        for fund in funds {
            if let Some(previous) = by_code.insert(fund.code().clone(), fund) {
                warn!(code = %previous.code(), "duplicate fund in dataset, keeping the later row");
            }
        }

        let mut updated = 0;
        let mut merge_totals = MergeReport::default();
        let mut failures = Vec::new();
        let mut new_codes = BTreeSet::new();
        for (code, prices) in observed {
            let Some(fund) = by_code.get_mut(&code) else {
                new_codes.insert(code);
                continue;
            };
            match fund.merge_prices(prices) {
                Ok(report) => {
                    if report.changed() {
                        updated += 1;
                    }
                    merge_totals.revised += report.revised;
                    merge_totals.inserted += report.inserted;
                    merge_totals.appended += report.appended;
                }
                Err(error) => {
                    warn!(%code, %error, "price merge rejected");
                    failures.push((code, TaskFailure::Failed(FetchError::Validation(error))));
                }
            }
        }

        let mut funds: Vec<Fund> = by_code.into_values().collect();
        if !new_codes.is_empty() {
            info!(count = new_codes.len(), "fetching newly listed funds");
            let catalog = self
                .catalog
                .fetch_identifiers_for(&new_codes)
                .await
                .map_err(UpdateError::Catalog)?;
            let report = self.manager.fetch_funds(catalog).await;
            funds.extend(report.funds);
            failures.extend(report.failures);
        }
        funds.sort_by(|left, right| left.code().cmp(right.code()));
        failures.sort_by(|left, right| left.0.cmp(&right.0));

        info!(
            updated,
            appended = merge_totals.appended,
            revised = merge_totals.revised,
            new = new_codes.len(),
            failed = failures.len(),
            "refresh finished"
        );

        Ok(UpdateReport {
            funds,
            window,
            updated,
            merge_totals,
            new_codes: new_codes.into_iter().collect(),
            failures,
        })
    }
}
