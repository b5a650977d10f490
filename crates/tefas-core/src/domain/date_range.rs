use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Duration, Month};

use crate::ValidationError;

/// Formats a date the way the source and the interchange files expect (`DD.MM.YYYY`).
pub fn format_date(date: Date) -> String {
    format!(
        "{:02}.{:02}.{:04}",
        date.day(),
        u8::from(date.month()),
        date.year()
    )
}

/// Parses a `DD.MM.YYYY` date.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input.trim(), format_description!("[day].[month].[year]")).map_err(|_| {
        ValidationError::InvalidDate {
            value: input.to_owned(),
        }
    })
}

/// Closed calendar interval, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub(crate) const fn from_ordered(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    pub const fn start(&self) -> Date {
        self.start
    }

    pub const fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn len_days(&self) -> u32 {
        ((self.end - self.start).whole_days() + 1) as u32
    }

    /// Every calendar day in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = Date> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |day| {
            day.next_day().filter(|next| *next <= end)
        })
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", format_date(self.start), format_date(self.end))
    }
}

#[derive(Serialize, Deserialize)]
struct DateRangeRecord {
    start_date: String,
    end_date: String,
}

impl Serialize for DateRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        DateRangeRecord {
            start_date: format_date(self.start),
            end_date: format_date(self.end),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DateRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error as DeError;

        let record = DateRangeRecord::deserialize(deserializer)?;
        let start = parse_date(&record.start_date).map_err(D::Error::custom)?;
        let end = parse_date(&record.end_date).map_err(D::Error::custom)?;
        Self::new(start, end).map_err(D::Error::custom)
    }
}

/// Look-back span used to select a price range ending at a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFrame {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
}

impl TimeFrame {
    /// First day of the span that ends on `end`.
    pub fn start_from(self, end: Date) -> Result<Date, ValidationError> {
        let start = match self {
            Self::Days(amount) => end.checked_sub(Duration::days(i64::from(amount))),
            Self::Weeks(amount) => end.checked_sub(Duration::weeks(i64::from(amount))),
            Self::Months(amount) => months_before(end, amount),
            Self::Years(amount) => months_before(end, amount.saturating_mul(12)),
        };

        start.ok_or_else(|| ValidationError::InvalidTimeFrame {
            value: self.to_string(),
        })
    }

    pub fn range_ending(self, end: Date) -> Result<DateRange, ValidationError> {
        DateRange::new(self.start_from(end)?, end)
    }
}

impl Display for TimeFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Days(amount) => write!(f, "{amount}d"),
            Self::Weeks(amount) => write!(f, "{amount}w"),
            Self::Months(amount) => write!(f, "{amount}m"),
            Self::Years(amount) => write!(f, "{amount}y"),
        }
    }
}

impl FromStr for TimeFrame {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTimeFrame {
            value: value.to_owned(),
        };

        let normalized = value.trim().to_ascii_lowercase();
        if normalized.len() < 2 {
            return Err(invalid());
        }
        let (amount, unit) = normalized.split_at(normalized.len() - 1);
        let amount = amount.parse::<u32>().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }

        match unit {
            "d" => Ok(Self::Days(amount)),
            "w" => Ok(Self::Weeks(amount)),
            "m" => Ok(Self::Months(amount)),
            "y" => Ok(Self::Years(amount)),
            _ => Err(invalid()),
        }
    }
}

/// Same day-of-month `months` earlier, clamped to the length of the target month.
fn months_before(date: Date, months: u32) -> Option<Date> {
    let index = i64::from(date.year()) * 12 + i64::from(u8::from(date.month())) - 1
        - i64::from(months);
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;
    let day = date.day().min(time::util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).ok()
}
