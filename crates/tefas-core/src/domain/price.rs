use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::date_range::{format_date, parse_date};
use crate::ValidationError;

/// Daily unit price observation.
///
/// Zero is the source's missing-data sentinel, so only strictly positive
/// values are representable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price {
    date: Date,
    value: f64,
}

impl Price {
    pub fn new(date: Date, value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }
        if value <= 0.0 {
            return Err(ValidationError::NonPositivePrice { date, value });
        }
        Ok(Self { date, value })
    }

    /// Builds a price from a raw source value, treating zero as "no observation".
    pub fn observed(date: Date, value: f64) -> Result<Option<Self>, ValidationError> {
        if value == 0.0 {
            return Ok(None);
        }
        Self::new(date, value).map(Some)
    }

    pub const fn date(&self) -> Date {
        self.date
    }

    pub const fn value(&self) -> f64 {
        self.value
    }
}

#[derive(Serialize, Deserialize)]
struct PriceRecord {
    date: String,
    value: f64,
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PriceRecord {
            date: format_date(self.date),
            value: self.value,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as DeError;

        let record = PriceRecord::deserialize(deserializer)?;
        let date = parse_date(&record.date).map_err(D::Error::custom)?;
        Self::new(date, record.value).map_err(D::Error::custom)
    }
}
