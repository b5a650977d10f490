//! Record fetcher: one analysis page per fund, four independent extractions.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::{Document, Selector};
use crate::domain::{
    parse_date, sort_by_weight_desc, Distribution, Fund, FundCode, Issuer, Price, RiskScore,
};
use crate::error::FetchError;
use crate::extract::{Extraction, IndicatorValue, ProfileValue};
use crate::js::{array_after, parse_literal, JsValue};
use crate::requester::Requester;
use crate::source::Endpoint;
use crate::ValidationError;

const FUND_NAME_ID: &str = "MainContent_FormViewMainIndicators_LabelFund";
const PRICE_CHART_MARKER: &str = "chartMainContent_FonFiyatGrafik";

/// Scalar indicators shown above the charts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainIndicators {
    pub name: Option<String>,
    pub category: Option<IndicatorValue>,
    /// Percent as printed by the source (`1.25` means 1.25%).
    pub market_share: Option<IndicatorValue>,
}

/// Label-matched rows of the fund profile table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundProfile {
    pub risk_score: Option<ProfileValue>,
    pub listed: Option<ProfileValue>,
}

impl FundProfile {
    /// `Unknown` when the row is missing or not an integer.
    pub fn risk_score(&self) -> Result<RiskScore, ValidationError> {
        match self.risk_score.as_ref().and_then(ProfileValue::as_integer) {
            Some(value) => RiskScore::new(value),
            None => Ok(RiskScore::Unknown),
        }
    }
}

/// Chart encodings the asset distribution may be published in, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionChart {
    Pie,
    Column,
}

impl DistributionChart {
    pub const PRIORITY: [Self; 2] = [Self::Pie, Self::Column];

    pub const fn marker(self) -> &'static str {
        match self {
            Self::Pie => "chartMainContent_PieChartFonDagilim",
            Self::Column => "chartMainContent_ColumnChartFonDagilim",
        }
    }

    /// Raw `(name, percent)` pairs from this encoding.
    pub fn parse(self, scripts: &str) -> Extraction<Vec<(String, f64)>> {
        let literal = match self {
            Self::Pie => array_after(scripts, &[self.marker(), "series", "data"]),
            Self::Column => array_after(scripts, &[self.marker(), "series"]),
        };
        let Some(literal) = literal else {
            return Extraction::Absent;
        };
        let value = match parse_literal(literal) {
            Ok(value) => value,
            Err(error) => return Extraction::Malformed(format!("{self:?} chart: {error}")),
        };
        let Some(items) = value.as_array() else {
            return Extraction::Malformed(format!("{self:?} chart data is not an array"));
        };

        let pairs: Option<Vec<(String, f64)>> = items
            .iter()
            .map(|item| match self {
                Self::Pie => {
                    let pair = item.as_array()?;
                    Some((pair.first()?.as_str()?.to_owned(), pair.get(1)?.as_f64()?))
                }
                Self::Column => Some((
                    item.get("name")?.as_str()?.to_owned(),
                    item.get("data")?.as_array()?.first()?.as_f64()?,
                )),
            })
            .collect();

        match pairs {
            Some(pairs) if pairs.is_empty() => Extraction::Absent,
            Some(pairs) => Extraction::Found(pairs),
            None => Extraction::Malformed(format!("{self:?} chart has unexpected entries")),
        }
    }
}

/// Parsed analysis page of a single fund.
#[derive(Debug, Clone)]
pub struct FundPage {
    document: Document,
    scripts: String,
}

impl FundPage {
    pub fn new(document: Document) -> Self {
        let scripts = document.scripts();
        Self { document, scripts }
    }

    pub fn parse(html: impl Into<String>) -> Self {
        Self::new(Document::parse(html))
    }

    pub fn main_indicators(&self) -> Extraction<MainIndicators> {
        let Some(section) = self
            .document
            .find("div", Selector::Class("main-indicators"))
        else {
            return Extraction::Absent;
        };

        let mut indicators = MainIndicators {
            name: section
                .find("span", Selector::Id(FUND_NAME_ID))
                .map(|span| span.text())
                .filter(|name| !name.is_empty()),
            ..MainIndicators::default()
        };

        for item in section.find_all("li", Selector::Any) {
            let strings = item.stripped_strings();
            let Some(label) = strings.first() else {
                continue;
            };
            let value = strings.get(1).and_then(|raw| IndicatorValue::parse(raw));
            match label.as_str() {
                "Kategorisi" => indicators.category = value,
                "Pazar Payı" => indicators.market_share = value,
                _ => {}
            }
        }

        Extraction::Found(indicators)
    }

    pub fn profile(&self) -> Extraction<FundProfile> {
        let Some(table) = self
            .document
            .find("div", Selector::Class("fund-profile"))
            .and_then(|section| section.find("table", Selector::Id("MainContent_DetailsViewFund")))
        else {
            return Extraction::Absent;
        };

        let mut profile = FundProfile::default();
        for row in table.find_all("tr", Selector::Any) {
            let header = row.find("td", Selector::Class("fund-profile-header"));
            let item = row.find("td", Selector::Class("fund-profile-item"));
            let (Some(header), Some(item)) = (header, item) else {
                continue;
            };
            let value = ProfileValue::parse(&item.text());
            match header.text().as_str() {
                "Fonun Risk Değeri" => profile.risk_score = value,
                "Platform İşlem Durumu" => profile.listed = value,
                _ => {}
            }
        }

        Extraction::Found(profile)
    }

    /// Daily prices from the price chart, zero observations dropped.
    pub fn prices(&self) -> Extraction<Vec<Price>> {
        let categories = array_after(&self.scripts, &[PRICE_CHART_MARKER, "xAxis", "categories"]);
        let data = array_after(&self.scripts, &[PRICE_CHART_MARKER, "series", "data"]);
        let (Some(categories), Some(data)) = (categories, data) else {
            return Extraction::Absent;
        };

        let (dates, values) = match (parse_literal(categories), parse_literal(data)) {
            (Ok(JsValue::Array(dates)), Ok(JsValue::Array(values))) => (dates, values),
            (Err(error), _) | (_, Err(error)) => {
                return Extraction::Malformed(format!("price chart: {error}"))
            }
            _ => return Extraction::Malformed(String::from("price chart is not an array")),
        };
        if dates.len() != values.len() {
            warn!(
                dates = dates.len(),
                values = values.len(),
                "price chart arrays differ in length, keeping the shorter"
            );
        }

        let mut prices = Vec::with_capacity(values.len());
        for (date, value) in dates.iter().zip(&values) {
            let (Some(date), Some(value)) = (date.as_str(), value.as_f64()) else {
                return Extraction::Malformed(String::from("price chart has non-scalar entries"));
            };
            let observed = parse_date(date).and_then(|date| Price::observed(date, value));
            match observed {
                Ok(Some(price)) => prices.push(price),
                Ok(None) => {}
                Err(error) => return Extraction::Malformed(error.to_string()),
            }
        }

        Extraction::Found(prices)
    }

    /// Asset distribution from the first chart encoding that yields entries,
    /// normalised to fractions and sorted by descending weight.
    pub fn distributions(&self) -> Extraction<Vec<Distribution>> {
        let mut first_problem = None;
        let mut pairs = None;
        for chart in DistributionChart::PRIORITY {
            match chart.parse(&self.scripts) {
                Extraction::Found(found) => {
                    pairs = Some(found);
                    break;
                }
                Extraction::Malformed(reason) => {
                    first_problem.get_or_insert(reason);
                }
                Extraction::Absent => {}
            }
        }

        let Some(pairs) = pairs else {
            return first_problem.map_or(Extraction::Absent, Extraction::Malformed);
        };

        let mut distributions = Vec::with_capacity(pairs.len());
        for (name, percent) in pairs {
            match Distribution::from_percent(name, percent) {
                Ok(slice) => distributions.push(slice),
                Err(ValidationError::ZeroDistributionWeight { .. }) => {}
                Err(error) => return Extraction::Malformed(error.to_string()),
            }
        }
        sort_by_weight_desc(&mut distributions);
        Extraction::Found(distributions)
    }

    /// Builds the validated fund; missing required data fails in [`Fund::new`].
    pub fn to_fund(&self, code: FundCode, issuer: Option<&Issuer>) -> Result<Fund, FetchError> {
        let indicators = self.main_indicators();
        let profile = self.profile();
        let prices = self.prices();
        let distributions = self.distributions();

        for (field, reason) in [
            ("prices", prices.malformed_reason()),
            ("distributions", distributions.malformed_reason()),
        ] {
            if let Some(reason) = reason {
                debug!(%code, field, %reason, "malformed extraction");
                return Err(FetchError::Extraction {
                    code: code.to_string(),
                    field,
                    reason: reason.to_owned(),
                });
            }
        }

        let indicators = indicators.unwrap_or_empty();
        let profile = profile.unwrap_or_empty();
        let is_listed = profile
            .listed
            .as_ref()
            .and_then(ProfileValue::as_listed)
            .ok_or(ValidationError::MissingField { field: "is_listed" })?;
        let market_share = indicators
            .market_share
            .as_ref()
            .and_then(IndicatorValue::as_number)
            .map(|percent| percent / 100.0);

        let fund = Fund::new(
            code,
            indicators.name.unwrap_or_default(),
            indicators
                .category
                .map(IndicatorValue::into_text)
                .unwrap_or_default(),
            profile.risk_score()?,
            is_listed,
            prices.unwrap_or_empty(),
            distributions.unwrap_or_empty(),
        )?
        .with_issuer_code(issuer.map(|issuer| issuer.code().to_owned()))
        .with_market_share(market_share)?;

        Ok(fund)
    }
}

/// Fetches and assembles single fund records.
#[derive(Debug, Clone)]
pub struct RecordFetcher {
    requester: Arc<Requester>,
}

impl RecordFetcher {
    pub fn new(requester: Arc<Requester>) -> Self {
        Self { requester }
    }

    pub async fn fetch_record(
        &self,
        code: &FundCode,
        issuer: Option<&Issuer>,
    ) -> Result<Fund, FetchError> {
        let document = self
            .requester
            .get_document(&Endpoint::FundAnalysis(code.clone()))
            .await?;
        FundPage::new(document).to_fund(code.clone(), issuer)
    }
}
