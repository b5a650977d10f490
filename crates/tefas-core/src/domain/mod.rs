//! # Domain Models
//!
//! Validated fund types shared by the fetchers, the updater and the
//! interchange layer.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Fund`] | Fund metadata with price history and asset distribution |
//! | [`FundCode`] | Validated fund identifier |
//! | [`Price`] | Daily unit price, strictly positive |
//! | [`Distribution`] | Named slice of the asset distribution |
//! | [`DateRange`] | Closed calendar interval |
//! | [`TimeFrame`] | Look-back span such as `1y` or `30d` |
//! | [`Issuer`] | Portfolio management company |
//!
//! Every constructor enforces its invariants and returns a
//! [`ValidationError`](crate::ValidationError) instead of defaulting:
//!
//! ```rust
//! use tefas_core::{Price, ValidationError};
//! use time::macros::date;
//!
//! let zero = Price::new(date!(2024 - 03 - 01), 0.0);
//! assert!(matches!(zero, Err(ValidationError::NonPositivePrice { .. })));
//! ```

mod date_range;
mod distribution;
mod fund;
mod fund_code;
mod issuer;
mod price;

pub use date_range::{format_date, parse_date, DateRange, TimeFrame};
pub use distribution::{sort_by_weight_desc, Distribution};
pub use fund::{Fund, MergeReport, RiskScore};
pub use fund_code::FundCode;
pub use issuer::{Issuer, IssuerDirectory};
pub use price::Price;
