use serde::{Deserialize, Serialize};

use crate::ValidationError;

const WEIGHT_SCALE: f64 = 10_000.0;

/// One slice of a fund's asset distribution, weight expressed as a fraction of 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    name: String,
    weight: f64,
}

impl Distribution {
    /// Weight is rounded to 4 decimal places; a weight that rounds to zero is rejected.
    pub fn new(name: impl Into<String>, weight: f64) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(ValidationError::EmptyDistributionName);
        }
        if !weight.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "distribution weight",
            });
        }

        let weight = round_weight(weight);
        if weight == 0.0 {
            return Err(ValidationError::ZeroDistributionWeight { name });
        }

        Ok(Self { name, weight })
    }

    /// Builds a distribution from a source percentage (`45.5` means 45.5%).
    pub fn from_percent(name: impl Into<String>, percent: f64) -> Result<Self, ValidationError> {
        Self::new(name, percent / 100.0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn weight(&self) -> f64 {
        self.weight
    }
}

/// Orders distributions by descending weight, name as tie breaker.
pub fn sort_by_weight_desc(distributions: &mut [Distribution]) {
    distributions.sort_by(|left, right| {
        right
            .weight
            .total_cmp(&left.weight)
            .then_with(|| left.name.cmp(&right.name))
    });
}

fn round_weight(weight: f64) -> f64 {
    (weight * WEIGHT_SCALE).round() / WEIGHT_SCALE
}

#[derive(Serialize, Deserialize)]
struct DistributionRecord {
    name: String,
    amount: f64,
}

impl Serialize for Distribution {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        DistributionRecord {
            name: self.name.clone(),
            amount: self.weight,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Distribution {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as DeError;

        let record = DistributionRecord::deserialize(deserializer)?;
        Self::new(record.name, record.amount).map_err(D::Error::custom)
    }
}
