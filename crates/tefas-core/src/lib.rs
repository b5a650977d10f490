//! # TEFAS Core
//!
//! Fetching, updating and exporting mutual fund data published by TEFAS.
//!
//! ## Overview
//!
//! - **Domain models** for funds, prices, asset distributions and issuers
//! - **Resilient requester** with linear retry and optional rate limiting
//! - **Catalog and record fetchers** that read the public fund pages
//! - **Bounded concurrent pipeline** that isolates per-fund failures
//! - **Incremental updater** that merges recent prices into an existing dataset
//! - **CSV interchange** for raw and processed exports
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`catalog`] | Issuer list and fund identifier listings |
//! | [`config`] | Environment driven exporter configuration |
//! | [`document`] | Minimal HTML element lookup |
//! | [`domain`] | Domain models (Fund, Price, Distribution, Issuer) |
//! | [`error`] | Core error types |
//! | [`extract`] | Tri-state extraction results and cell parsing |
//! | [`http_client`] | HTTP client abstraction |
//! | [`interchange`] | Raw CSV import and export |
//! | [`js`] | JavaScript literal parsing for embedded chart data |
//! | [`manager`] | Catalog selection plus concurrent record fetching |
//! | [`pipeline`] | Bounded fan-out / fan-in over fetches |
//! | [`record`] | Single fund page extraction |
//! | [`report`] | Processed export with trailing returns |
//! | [`requester`] | Retrying request execution |
//! | [`retry`] | Retry and backoff configuration |
//! | [`source`] | Upstream endpoints |
//! | [`throttle`] | Request rate limiting |
//! | [`updater`] | Incremental price refresh |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tefas_core::{
//!     CatalogFetcher, CatalogSelection, FundDataManager, IssuerFetcher, RecordFetcher,
//!     ReqwestHttpClient, Requester,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let requester = Arc::new(Requester::new(Arc::new(ReqwestHttpClient::new())));
//!     let issuers = IssuerFetcher::new(Arc::clone(&requester)).fetch_directory().await?;
//!     let manager = FundDataManager::new(
//!         CatalogFetcher::new(Arc::clone(&requester), Arc::new(issuers)),
//!         RecordFetcher::new(requester),
//!     );
//!
//!     let report = manager.fetch_all(&CatalogSelection::Listed).await?;
//!     println!("{} funds, {} failures", report.funds.len(), report.failures.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / User     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  PriceUpdater   │────▶│ HistoryFetcher   │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ FundDataManager │────▶│ fetch_many       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Catalog/Record  │────▶│ Requester        │
//! │ Fetchers        │     │ (retry/throttle) │
//! └─────────────────┘     └────────┬─────────┘
//!                                  ▼
//!                         ┌──────────────────┐
//!                         │ HttpClient       │
//!                         └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Fetch failures carry the endpoint and the number of attempts made:
//!
//! ```rust
//! use tefas_core::FetchError;
//!
//! fn describe(error: &FetchError) -> String {
//!     match error.attempts() {
//!         Some(attempts) => format!("gave up after {attempts} attempts: {error}"),
//!         None => error.to_string(),
//!     }
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod document;
pub mod domain;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod interchange;
pub mod js;
pub mod manager;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod requester;
pub mod retry;
pub mod source;
pub mod throttle;
pub mod updater;

// Fetchers
pub use catalog::{CatalogFetcher, FundCatalog, IssuerFetcher};
pub use record::{FundPage, RecordFetcher};

// Configuration
pub use config::{ConfigError, ExporterConfig};

// Domain models
pub use domain::{
    format_date, parse_date, DateRange, Distribution, Fund, FundCode, Issuer, IssuerDirectory,
    MergeReport, Price, RiskScore, TimeFrame,
};

// Error types
pub use error::{FetchError, InterchangeError, ValidationError};

pub use extract::Extraction;

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient, ScriptedHttpClient,
};

// Concurrency
pub use manager::{CatalogSelection, FetchReport, FundDataManager};
pub use pipeline::{fetch_many, BatchOutcome, TaskFailure};

// Exports
pub use interchange::{read_funds, read_funds_from_path, write_funds, write_funds_to_path};
pub use report::{ProcessedRow, ProcessedTable};

// Requests
pub use requester::Requester;
pub use retry::{Backoff, RetryConfig};
pub use source::Endpoint;
pub use throttle::RequestThrottle;

// Updates
pub use updater::{refresh_window, HistoryFetcher, PriceUpdater, UpdateError, UpdateReport};
