//! Endpoints exposed by the fund data source.
//!
//! | Endpoint | Method | Returns |
//! |----------|--------|---------|
//! | [`Endpoint::Comparison`] | GET | comparison page holding the issuer `<select>` |
//! | [`Endpoint::FundAnalysis`] | GET | per-fund analysis page |
//! | [`Endpoint::ManagementFees`] | POST | `{"data":[...]}` fund listing |
//! | [`Endpoint::HistoryInfo`] | POST | `{"data":[...]}` daily prices |

use std::fmt::{Display, Formatter};

use crate::domain::FundCode;

pub const DEFAULT_BASE_URL: &str = "https://www.tefas.gov.tr";
pub const DEFAULT_HOST: &str = "www.tefas.gov.tr";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Comparison,
    FundAnalysis(FundCode),
    ManagementFees,
    HistoryInfo,
}

impl Endpoint {
    /// Path relative to the source base URL, without a leading slash.
    pub fn path(&self) -> String {
        match self {
            Self::Comparison => String::from("FonKarsilastirma.aspx"),
            Self::FundAnalysis(code) => {
                format!("FonAnaliz.aspx?FonKod={}", urlencoding::encode(code.as_str()))
            }
            Self::ManagementFees => String::from("api/DB/BindComparisonManagementFees"),
            Self::HistoryInfo => String::from("api/DB/BindHistoryInfo"),
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
