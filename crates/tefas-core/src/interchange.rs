//! Flat CSV interchange for fund collections.
//!
//! One row per fund. Scalar columns are plain cells; prices, distributions
//! and the date range are JSON documents inside a cell:
//!
//! ```text
//! code,name,category,risk_score,is_listed,issuer_code,market_share,prices,asset_distributions,date_range
//! AFT,Ak Portföy ...,Hisse Senedi Fonu,6,true,AKP,0.0125,"[{""date"":""02.01.2024"",""value"":1.5}]",...
//! ```
//!
//! An unknown risk score is an empty cell. Files without the optional
//! `issuer_code` / `market_share` columns are accepted.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{DateRange, Distribution, Fund, FundCode, Price, RiskScore};
use crate::error::InterchangeError;

pub const RAW_FILE_NAME: &str = "fund_data_raw.csv";

#[derive(Debug, Serialize, Deserialize)]
struct FundRow {
    code: String,
    name: String,
    category: String,
    #[serde(default)]
    risk_score: Option<i64>,
    #[serde(alias = "is_in_tefas", deserialize_with = "deserialize_flag")]
    is_listed: bool,
    #[serde(default)]
    issuer_code: Option<String>,
    #[serde(default)]
    market_share: Option<f64>,
    prices: String,
    asset_distributions: String,
    #[serde(default)]
    date_range: Option<String>,
}

impl FundRow {
    fn from_fund(fund: &Fund) -> Result<Self, InterchangeError> {
        Ok(Self {
            code: fund.code().to_string(),
            name: fund.name().to_owned(),
            category: fund.category().to_owned(),
            risk_score: fund.risk_score().value().map(i64::from),
            is_listed: fund.is_listed(),
            issuer_code: fund.issuer_code().map(str::to_owned),
            market_share: fund.market_share(),
            prices: to_json(fund.prices())?,
            asset_distributions: to_json(fund.distributions())?,
            date_range: Some(to_json(&fund.date_range())?),
        })
    }

    fn into_fund(self, row: usize) -> Result<Fund, InterchangeError> {
        let invalid = |source| InterchangeError::Row { row, source };

        let code = FundCode::parse(&self.code).map_err(invalid)?;
        let risk_score = match self.risk_score {
            // Older exports wrote -1 for an unknown score.
            None | Some(-1) => RiskScore::Unknown,
            Some(value) => RiskScore::new(value).map_err(invalid)?,
        };
        let prices: Vec<Price> = from_json(row, "prices", &self.prices)?;
        let distributions: Vec<Distribution> =
            from_json(row, "asset_distributions", &self.asset_distributions)?;

        let fund = Fund::new(
            code,
            self.name,
            self.category,
            risk_score,
            self.is_listed,
            prices,
            distributions,
        )
        .map_err(invalid)?
        .with_issuer_code(self.issuer_code)
        .with_market_share(self.market_share)
        .map_err(invalid)?;

        if let Some(cell) = self.date_range.filter(|cell| !cell.trim().is_empty()) {
            let declared: DateRange = from_json(row, "date_range", &cell)?;
            if declared != fund.date_range() {
                return Err(InterchangeError::Column {
                    row,
                    column: "date_range",
                    message: format!(
                        "declared {declared} but prices span {}",
                        fund.date_range()
                    ),
                });
            }
        }

        Ok(fund)
    }
}

/// Accepts `true`/`false` in any case as well as `1`/`0`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as DeError;

    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(D::Error::custom(format!("invalid listed flag '{other}'"))),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, InterchangeError> {
    serde_json::to_string(value).map_err(|error| InterchangeError::Column {
        row: 0,
        column: "json",
        message: error.to_string(),
    })
}

fn from_json<T>(row: usize, column: &'static str, cell: &str) -> Result<T, InterchangeError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_str(cell).map_err(|error| InterchangeError::Column {
        row,
        column,
        message: error.to_string(),
    })
}

pub fn write_funds<W: Write>(writer: W, funds: &[Fund]) -> Result<(), InterchangeError> {
    let mut writer = csv::Writer::from_writer(writer);
    for fund in funds {
        writer.serialize(FundRow::from_fund(fund)?)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parses every row; the first invalid row fails the whole read with its 1-based row number.
pub fn read_funds<R: Read>(reader: R) -> Result<Vec<Fund>, InterchangeError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut funds = Vec::new();
    for (index, row) in reader.deserialize::<FundRow>().enumerate() {
        funds.push(row?.into_fund(index + 1)?);
    }
    Ok(funds)
}

pub fn write_funds_to_path(path: impl AsRef<Path>, funds: &[Fund]) -> Result<(), InterchangeError> {
    write_funds(File::create(path)?, funds)
}

pub fn read_funds_from_path(path: impl AsRef<Path>) -> Result<Vec<Fund>, InterchangeError> {
    read_funds(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    const HEADER: &str = "code,name,category,risk_score,is_listed,issuer_code,market_share,prices,asset_distributions,date_range";

    #[test]
    fn writes_expected_header_and_empty_unknown_risk() {
        let fund = Fund::new(
            FundCode::parse("XYZ").expect("valid"),
            "Fund",
            "Category",
            RiskScore::Unknown,
            false,
            vec![Price::new(date!(2024 - 01 - 02), 1.5).expect("valid")],
            vec![Distribution::new("Mevduat", 1.0).expect("valid")],
        )
        .expect("valid");

        let mut buffer = Vec::new();
        write_funds(&mut buffer, &[fund]).expect("written");
        let text = String::from_utf8(buffer).expect("utf-8");
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some(HEADER));
        let row = lines.next().expect("data row");
        assert!(row.starts_with("XYZ,Fund,Category,,false,,,"));
        assert!(row.contains(r#"""date"":""02.01.2024"""#));
    }

    #[test]
    fn accepts_legacy_columns() {
        let csv = "code,name,category,risk_score,is_in_tefas,prices,asset_distributions\n\
                   AFT,Fund,Category,-1,True,\"[{\"\"date\"\":\"\"02.01.2024\"\",\"\"value\"\":1.5}]\",\"[{\"\"name\"\":\"\"Hisse\"\",\"\"amount\"\":1.0}]\"\n";

        let funds = read_funds(csv.as_bytes()).expect("legacy file parses");
        assert_eq!(funds[0].risk_score(), RiskScore::Unknown);
        assert!(funds[0].is_listed());
        assert_eq!(funds[0].issuer_code(), None);
    }

    #[test]
    fn rejects_unreadable_listed_flag() {
        let csv = format!(
            "{HEADER}\nAFT,Fund,Category,3,maybe,,,[],[],\n"
        );
        let err = read_funds(csv.as_bytes()).expect_err("bad flag");
        assert!(matches!(err, InterchangeError::Csv(_)));
    }

    #[test]
    fn reports_row_of_invalid_fund() {
        let csv = format!(
            "{HEADER}\nAFT,,Category,3,true,,,\"[{{\"\"date\"\":\"\"02.01.2024\"\",\"\"value\"\":1.5}}]\",\"[{{\"\"name\"\":\"\"Hisse\"\",\"\"amount\"\":1.0}}]\",\n"
        );
        let err = read_funds(csv.as_bytes()).expect_err("empty name");
        assert!(matches!(err, InterchangeError::Row { row: 1, .. }));
    }

    #[test]
    fn rejects_inconsistent_date_range() {
        let csv = format!(
            "{HEADER}\nAFT,Fund,Category,3,true,,,\"[{{\"\"date\"\":\"\"02.01.2024\"\",\"\"value\"\":1.5}}]\",\"[{{\"\"name\"\":\"\"Hisse\"\",\"\"amount\"\":1.0}}]\",\"{{\"\"start_date\"\":\"\"01.01.2024\"\",\"\"end_date\"\":\"\"02.01.2024\"\"}}\"\n"
        );
        let err = read_funds(csv.as_bytes()).expect_err("range mismatch");
        assert!(matches!(err, InterchangeError::Column { column: "date_range", .. }));
    }
}
