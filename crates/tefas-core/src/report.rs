//! Processed export: one flat row per fund with trailing returns and
//! distribution weights spread into columns.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{format_date, DateRange, Fund, TimeFrame};
use crate::error::InterchangeError;

pub const PROCESSED_FILE_NAME: &str = "fund_data.csv";

/// Return horizons in column order.
pub const HORIZONS: [(&str, TimeFrame); 7] = [
    ("return_1d", TimeFrame::Days(1)),
    ("return_7d", TimeFrame::Days(7)),
    ("return_14d", TimeFrame::Days(14)),
    ("return_1m", TimeFrame::Months(1)),
    ("return_3m", TimeFrame::Months(3)),
    ("return_6m", TimeFrame::Months(6)),
    ("return_1y", TimeFrame::Years(1)),
];

const FIXED_COLUMNS: [&str; 9] = [
    "code",
    "name",
    "category",
    "issuer_code",
    "risk_score",
    "is_listed",
    "market_share",
    "last_date",
    "last_price",
];

/// Ratio between the last price and the first price on or after
/// `last_date − frame`, rounded to 4 decimals.
///
/// `None` when the history does not reach back that far.
pub fn horizon_return(fund: &Fund, frame: TimeFrame) -> Option<f64> {
    let last = fund.last_price().date();
    let target = frame.start_from(last).ok()?;
    if target < fund.date_range().start() {
        return None;
    }
    let window = DateRange::new(target, last).ok()?;
    fund.price_change_ratio(Some(&window))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRow {
    pub code: String,
    pub name: String,
    pub category: String,
    pub issuer_code: Option<String>,
    pub risk_score: Option<u8>,
    pub is_listed: bool,
    pub market_share: Option<f64>,
    pub last_date: String,
    pub last_price: f64,
    /// Same order as [`HORIZONS`].
    pub returns: Vec<Option<f64>>,
    pub distributions: BTreeMap<String, f64>,
}

impl ProcessedRow {
    pub fn from_fund(fund: &Fund) -> Self {
        let last = fund.last_price();
        Self {
            code: fund.code().to_string(),
            name: fund.name().to_owned(),
            category: fund.category().to_owned(),
            issuer_code: fund.issuer_code().map(str::to_owned),
            risk_score: fund.risk_score().value(),
            is_listed: fund.is_listed(),
            market_share: fund.market_share(),
            last_date: format_date(last.date()),
            last_price: last.value(),
            returns: HORIZONS
                .iter()
                .map(|(_, frame)| horizon_return(fund, *frame))
                .collect(),
            distributions: fund
                .distributions()
                .iter()
                .map(|slice| (slice.name().to_owned(), slice.weight()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessedTable {
    /// Union of distribution names across all rows, sorted.
    pub distribution_columns: Vec<String>,
    pub rows: Vec<ProcessedRow>,
}

impl ProcessedTable {
    pub fn from_funds(funds: &[Fund]) -> Self {
        let rows: Vec<ProcessedRow> = funds.iter().map(ProcessedRow::from_fund).collect();
        let distribution_columns = rows
            .iter()
            .flat_map(|row| row.distributions.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            distribution_columns,
            rows,
        }
    }

    pub fn header(&self) -> Vec<String> {
        FIXED_COLUMNS
            .iter()
            .map(|column| (*column).to_owned())
            .chain(HORIZONS.iter().map(|(column, _)| (*column).to_owned()))
            .chain(self.distribution_columns.iter().cloned())
            .collect()
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<(), InterchangeError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.header())?;

        for row in &self.rows {
            let mut record = vec![
                row.code.clone(),
                row.name.clone(),
                row.category.clone(),
                row.issuer_code.clone().unwrap_or_default(),
                optional(row.risk_score),
                row.is_listed.to_string(),
                optional(row.market_share),
                row.last_date.clone(),
                row.last_price.to_string(),
            ];
            record.extend(row.returns.iter().map(|value| optional(*value)));
            record.extend(
                self.distribution_columns
                    .iter()
                    .map(|name| optional(row.distributions.get(name).copied())),
            );
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), InterchangeError> {
        self.write(File::create(path)?)
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}
