use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::domain::{DateRange, Distribution, FundCode, Price};
use crate::ValidationError;

/// Fund risk score on the 1..=7 scale, or the source's "unknown" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<u8>", into = "Option<u8>")]
pub enum RiskScore {
    Known(u8),
    #[default]
    Unknown,
}

impl RiskScore {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        match u8::try_from(value) {
            Ok(score) if score > 0 => Ok(Self::Known(score)),
            _ => Err(ValidationError::NonPositiveRiskScore { value }),
        }
    }

    pub const fn value(self) -> Option<u8> {
        match self {
            Self::Known(score) => Some(score),
            Self::Unknown => None,
        }
    }
}

impl From<Option<u8>> for RiskScore {
    fn from(value: Option<u8>) -> Self {
        match value {
            Some(score) if score > 0 => Self::Known(score),
            _ => Self::Unknown,
        }
    }
}

impl From<RiskScore> for Option<u8> {
    fn from(value: RiskScore) -> Self {
        value.value()
    }
}

impl Display for RiskScore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(score) => write!(f, "{score}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Counts of what a price merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Existing dates whose value was replaced by a revised observation.
    pub revised: usize,
    /// Dates inside the existing span that were previously missing.
    pub inserted: usize,
    /// Dates after the previous last date.
    pub appended: usize,
}

impl MergeReport {
    pub const fn changed(&self) -> bool {
        self.revised + self.inserted + self.appended > 0
    }
}

/// Validated fund with its price history and asset distribution.
///
/// Prices are non-empty and strictly increasing by date, so the derived
/// [`DateRange`] always spans the first and last observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fund {
    code: FundCode,
    name: String,
    category: String,
    risk_score: RiskScore,
    is_listed: bool,
    issuer_code: Option<String>,
    market_share: Option<f64>,
    prices: Vec<Price>,
    distributions: Vec<Distribution>,
}

impl Fund {
    pub fn new(
        code: FundCode,
        name: impl Into<String>,
        category: impl Into<String>,
        risk_score: RiskScore,
        is_listed: bool,
        prices: Vec<Price>,
        distributions: Vec<Distribution>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_owned();
        let category = category.into().trim().to_owned();

        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if category.is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if risk_score == RiskScore::Known(0) {
            return Err(ValidationError::NonPositiveRiskScore { value: 0 });
        }
        if prices.is_empty() {
            return Err(ValidationError::EmptyPrices);
        }
        validate_ordering(&prices)?;
        if distributions.is_empty() {
            return Err(ValidationError::EmptyDistributions);
        }

        Ok(Self {
            code,
            name,
            category,
            risk_score,
            is_listed,
            issuer_code: None,
            market_share: None,
            prices,
            distributions,
        })
    }

    pub fn with_issuer_code(mut self, issuer_code: Option<String>) -> Self {
        self.issuer_code = issuer_code
            .map(|code| code.trim().to_owned())
            .filter(|code| !code.is_empty());
        self
    }

    pub fn with_market_share(mut self, market_share: Option<f64>) -> Result<Self, ValidationError> {
        if market_share.is_some_and(|share| !share.is_finite()) {
            return Err(ValidationError::NonFiniteValue {
                field: "market share",
            });
        }
        self.market_share = market_share;
        Ok(self)
    }

    pub fn code(&self) -> &FundCode {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub const fn risk_score(&self) -> RiskScore {
        self.risk_score
    }

    pub const fn is_listed(&self) -> bool {
        self.is_listed
    }

    pub fn issuer_code(&self) -> Option<&str> {
        self.issuer_code.as_deref()
    }

    pub const fn market_share(&self) -> Option<f64> {
        self.market_share
    }

    pub fn prices(&self) -> &[Price] {
        &self.prices
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    pub fn date_range(&self) -> DateRange {
        // Both ends exist and are ordered: prices are non-empty and strictly increasing.
        let first = self.prices[0].date();
        let last = self.prices[self.prices.len() - 1].date();
        DateRange::from_ordered(first, last)
    }

    pub fn last_price(&self) -> &Price {
        &self.prices[self.prices.len() - 1]
    }

    pub fn prices_in(&self, range: &DateRange) -> impl Iterator<Item = &Price> + '_ {
        let range = *range;
        self.prices
            .iter()
            .filter(move |price| range.contains(price.date()))
    }

    /// Relative change between the first and last price, optionally inside `range`,
    /// rounded to 4 decimal places.
    pub fn price_change_ratio(&self, range: Option<&DateRange>) -> Option<f64> {
        let (first, last) = match range {
            None => (self.prices.first()?, self.prices.last()?),
            Some(range) => {
                let mut inside = self.prices_in(range);
                let first = inside.next()?;
                (first, inside.last().unwrap_or(first))
            }
        };
        Some(((last.value() / first.value() - 1.0) * 10_000.0).round() / 10_000.0)
    }

    /// Copy of this fund keeping only the prices inside `range`.
    pub fn restricted_to(&self, range: &DateRange) -> Result<Self, ValidationError> {
        let prices: Vec<Price> = self.prices_in(range).copied().collect();
        if prices.is_empty() {
            return Err(ValidationError::EmptyPrices);
        }
        Ok(Self {
            prices,
            ..self.clone()
        })
    }

    /// Appends prices strictly after the current last date.
    ///
    /// The whole batch is rejected if any price is dated on or before the
    /// preceding one; nothing is applied in that case.
    pub fn extend_prices(
        &mut self,
        prices: impl IntoIterator<Item = Price>,
    ) -> Result<usize, ValidationError> {
        let mut last = self.last_price().date();
        let mut accepted = Vec::new();
        for price in prices {
            if price.date() <= last {
                return Err(ValidationError::StalePrice {
                    last,
                    date: price.date(),
                });
            }
            last = price.date();
            accepted.push(price);
        }

        let count = accepted.len();
        self.prices.extend(accepted);
        Ok(count)
    }

    /// Merges a window of freshly fetched prices.
    ///
    /// Observations on dates already present replace the stored value, dates
    /// missing inside the current span are inserted in order, and later dates
    /// are appended through [`Fund::extend_prices`].
    pub fn merge_prices(
        &mut self,
        prices: impl IntoIterator<Item = Price>,
    ) -> Result<MergeReport, ValidationError> {
        let mut incoming: Vec<Price> = prices.into_iter().collect();
        incoming.sort_by_key(Price::date);
        // Keep the latest observation per date.
        incoming.reverse();
        incoming.dedup_by_key(|price| price.date());
        incoming.reverse();

        let last = self.last_price().date();
        let split = incoming.partition_point(|price| price.date() <= last);
        let tail = incoming.split_off(split);

        let mut merged = self.clone();
        let mut report = MergeReport::default();
        for price in incoming {
            match merged
                .prices
                .binary_search_by_key(&price.date(), Price::date)
            {
                Ok(index) => {
                    if merged.prices[index].value() != price.value() {
                        merged.prices[index] = price;
                        report.revised += 1;
                    }
                }
                Err(index) => {
                    merged.prices.insert(index, price);
                    report.inserted += 1;
                }
            }
        }
        report.appended = merged.extend_prices(tail)?;
        validate_ordering(&merged.prices)?;

        *self = merged;
        Ok(report)
    }
}

fn validate_ordering(prices: &[Price]) -> Result<(), ValidationError> {
    for pair in prices.windows(2) {
        if pair[1].date() <= pair[0].date() {
            return Err(ValidationError::UnorderedPrices {
                previous: pair[0].date(),
                next: pair[1].date(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::date;
    use time::Date;

    use super::*;

    fn price(date: Date, value: f64) -> Price {
        Price::new(date, value).expect("valid price")
    }

    fn sample_fund(prices: Vec<Price>) -> Result<Fund, ValidationError> {
        Fund::new(
            FundCode::parse("AFT").expect("valid"),
            "Ak Portföy Yeni Teknolojiler",
            "Hisse Senedi Fonu",
            RiskScore::Known(6),
            true,
            prices,
            vec![Distribution::new("Hisse Senedi", 0.9).expect("valid")],
        )
    }

    #[test]
    fn date_range_spans_first_and_last_price() {
        let fund = sample_fund(vec![
            price(date!(2024 - 01 - 02), 1.0),
            price(date!(2024 - 01 - 03), 1.1),
            price(date!(2024 - 01 - 05), 1.2),
        ])
        .expect("valid fund");

        let range = fund.date_range();
        assert_eq!(range.start(), fund.prices()[0].date());
        assert_eq!(range.end(), fund.prices()[2].date());
    }

    #[test]
    fn rejects_malformed_inputs() {
        let code = FundCode::parse("AFT").expect("valid");
        let prices = vec![price(date!(2024 - 01 - 02), 1.0)];
        let slices = vec![Distribution::new("Mevduat", 1.0).expect("valid")];

        let cases = [
            (
                ("", "Cat", RiskScore::Known(3)),
                prices.clone(),
                slices.clone(),
                ValidationError::EmptyName,
            ),
            (
                ("Name", " ", RiskScore::Known(3)),
                prices.clone(),
                slices.clone(),
                ValidationError::EmptyCategory,
            ),
            (
                ("Name", "Cat", RiskScore::Known(0)),
                prices.clone(),
                slices.clone(),
                ValidationError::NonPositiveRiskScore { value: 0 },
            ),
            (
                ("Name", "Cat", RiskScore::Known(3)),
                Vec::new(),
                slices.clone(),
                ValidationError::EmptyPrices,
            ),
            (
                ("Name", "Cat", RiskScore::Known(3)),
                prices.clone(),
                Vec::new(),
                ValidationError::EmptyDistributions,
            ),
        ];

        for ((name, category, risk), prices, slices, expected) in cases {
            let err = Fund::new(code.clone(), name, category, risk, false, prices, slices)
                .expect_err("malformed fund must fail");
            assert_eq!(err, expected);
        }
    }

    #[test]
    fn unknown_risk_is_a_valid_state() {
        let fund = Fund::new(
            FundCode::parse("XYZ").expect("valid"),
            "Name",
            "Cat",
            RiskScore::Unknown,
            false,
            vec![price(date!(2024 - 01 - 02), 1.0)],
            vec![Distribution::new("Mevduat", 1.0).expect("valid")],
        )
        .expect("unknown risk is allowed");
        assert_eq!(fund.risk_score().value(), None);
    }

    #[test]
    fn risk_score_must_be_positive() {
        assert!(matches!(
            RiskScore::new(0),
            Err(ValidationError::NonPositiveRiskScore { value: 0 })
        ));
        assert!(RiskScore::new(-3).is_err());
        assert_eq!(RiskScore::new(7), Ok(RiskScore::Known(7)));
    }

    #[test]
    fn rejects_unordered_prices() {
        let err = sample_fund(vec![
            price(date!(2024 - 01 - 03), 1.0),
            price(date!(2024 - 01 - 03), 1.1),
        ])
        .expect_err("duplicate dates must fail");
        assert!(matches!(err, ValidationError::UnorderedPrices { .. }));
    }

    #[test]
    fn extend_rejects_stale_dates_atomically() {
        let mut fund = sample_fund(vec![price(date!(2024 - 01 - 02), 1.0)]).expect("valid");

        let err = fund
            .extend_prices([
                price(date!(2024 - 01 - 03), 1.1),
                price(date!(2024 - 01 - 03), 1.2),
            ])
            .expect_err("duplicate must be rejected");
        assert!(matches!(err, ValidationError::StalePrice { .. }));
        assert_eq!(fund.prices().len(), 1);

        let err = fund
            .extend_prices([price(date!(2024 - 01 - 01), 0.9)])
            .expect_err("earlier date must be rejected");
        assert!(matches!(err, ValidationError::StalePrice { .. }));

        let added = fund
            .extend_prices([price(date!(2024 - 01 - 04), 1.3)])
            .expect("later date extends");
        assert_eq!(added, 1);
        assert_eq!(fund.date_range().end(), date!(2024 - 01 - 04));
    }

    #[test]
    fn merge_revises_inserts_and_appends() {
        let mut fund = sample_fund(vec![
            price(date!(2024 - 01 - 01), 1.0),
            price(date!(2024 - 01 - 03), 1.1),
            price(date!(2024 - 01 - 04), 1.2),
        ])
        .expect("valid");

        let report = fund
            .merge_prices([
                price(date!(2024 - 01 - 06), 1.4),
                price(date!(2024 - 01 - 04), 1.25),
                price(date!(2024 - 01 - 02), 1.05),
                price(date!(2024 - 01 - 03), 1.1),
                price(date!(2024 - 01 - 05), 1.3),
            ])
            .expect("merge succeeds");

        assert_eq!(
            report,
            MergeReport {
                revised: 1,
                inserted: 1,
                appended: 2,
            }
        );
        let values: Vec<f64> = fund.prices().iter().map(Price::value).collect();
        assert_eq!(values, vec![1.0, 1.05, 1.1, 1.25, 1.3, 1.4]);
        assert_eq!(fund.date_range().end(), date!(2024 - 01 - 06));
    }

    #[test]
    fn merge_of_identical_window_changes_nothing() {
        let prices = vec![
            price(date!(2024 - 01 - 01), 1.0),
            price(date!(2024 - 01 - 02), 1.1),
        ];
        let mut fund = sample_fund(prices.clone()).expect("valid");
        let report = fund.merge_prices(prices).expect("merge succeeds");
        assert!(!report.changed());
        assert_eq!(fund.prices().len(), 2);
    }

    #[test]
    fn price_change_ratio_is_rounded() {
        let fund = sample_fund(vec![
            price(date!(2024 - 01 - 01), 3.0),
            price(date!(2024 - 01 - 02), 3.5),
            price(date!(2024 - 01 - 03), 4.0),
        ])
        .expect("valid");

        assert_eq!(fund.price_change_ratio(None), Some(0.3333));

        let window = DateRange::new(date!(2024 - 01 - 02), date!(2024 - 01 - 03)).expect("valid");
        assert_eq!(fund.price_change_ratio(Some(&window)), Some(0.1429));

        let empty = DateRange::new(date!(2023 - 01 - 01), date!(2023 - 01 - 02)).expect("valid");
        assert_eq!(fund.price_change_ratio(Some(&empty)), None);
    }

    #[test]
    fn restricted_copy_keeps_window_only() {
        let fund = sample_fund(vec![
            price(date!(2024 - 01 - 01), 1.0),
            price(date!(2024 - 02 - 01), 1.1),
            price(date!(2024 - 03 - 01), 1.2),
        ])
        .expect("valid");

        let window = DateRange::new(date!(2024 - 01 - 15), date!(2024 - 03 - 31)).expect("valid");
        let restricted = fund.restricted_to(&window).expect("non-empty window");
        assert_eq!(restricted.prices().len(), 2);
        assert_eq!(restricted.date_range().start(), date!(2024 - 02 - 01));

        let outside = DateRange::new(date!(2025 - 01 - 01), date!(2025 - 02 - 01)).expect("valid");
        assert_eq!(fund.restricted_to(&outside), Err(ValidationError::EmptyPrices));
    }
}
