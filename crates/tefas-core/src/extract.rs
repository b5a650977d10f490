//! Per-field extraction results and the source's value conventions.

/// Outcome of extracting one field group from a page.
///
/// `Absent` means the marker the field lives under is not on the page, which
/// the source does legitimately for some funds. `Malformed` means the marker
/// was found but its content could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T> {
    Found(T),
    Absent,
    Malformed(String),
}

impl<T> Extraction<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent | Self::Malformed(_) => None,
        }
    }

    pub fn malformed_reason(&self) -> Option<&str> {
        match self {
            Self::Malformed(reason) => Some(reason),
            Self::Found(_) | Self::Absent => None,
        }
    }
}

impl<T: Default> Extraction<T> {
    /// Value when found, otherwise the empty default.
    pub fn unwrap_or_empty(self) -> T {
        self.found().unwrap_or_default()
    }
}

/// Scalar read from the indicator list: a number after locale normalisation, or the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Number(f64),
    Text(String),
}

impl IndicatorValue {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match parse_locale_number(raw) {
            Some(number) => Self::Number(number),
            None => Self::Text(raw.to_owned()),
        })
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(text) => text,
        }
    }
}

/// Parses a Turkish-formatted number: `.` groups thousands, `,` is the decimal
/// separator and a `%` sign may lead or trail.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let normalized = raw
        .trim()
        .replace('.', "")
        .replace(',', ".")
        .trim_matches('%')
        .trim()
        .to_owned();
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

const LISTED: &str = "TEFAS'ta işlem görüyor";
const NOT_LISTED: &str = "TEFAS'ta İşlem Görmüyor";

/// Cell value from the fund profile table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValue {
    Integer(i64),
    Listed(bool),
    Text(String),
}

impl ProfileValue {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let digits = raw.replace('.', "");
        if !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()) {
            if let Ok(value) = digits.parse::<i64>() {
                return Some(Self::Integer(value));
            }
        }
        Some(match raw {
            LISTED => Self::Listed(true),
            NOT_LISTED => Self::Listed(false),
            other => Self::Text(other.to_owned()),
        })
    }

    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_listed(&self) -> Option<bool> {
        match self {
            Self::Listed(value) => Some(*value),
            _ => None,
        }
    }
}
