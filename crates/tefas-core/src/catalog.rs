//! Issuer listing and fund catalog lookups.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::document::Selector;
use crate::domain::{FundCode, Issuer, IssuerDirectory};
use crate::error::FetchError;
use crate::requester::Requester;
use crate::source::Endpoint;

const ISSUER_SELECT_ID: &str = "DropDownListFounderYAT";
const ALL_ISSUERS_OPTION: &str = "Tümü";

/// Fund codes in lexicographic order, each with its resolved issuer when known.
pub type FundCatalog = BTreeMap<FundCode, Option<Issuer>>;

/// Reads the issuer list from the comparison page.
#[derive(Debug, Clone)]
pub struct IssuerFetcher {
    requester: Arc<Requester>,
}

impl IssuerFetcher {
    pub fn new(requester: Arc<Requester>) -> Self {
        Self { requester }
    }

    pub async fn fetch_issuers(&self) -> Result<Vec<Issuer>, FetchError> {
        let endpoint = Endpoint::Comparison;
        let document = self.requester.get_document(&endpoint).await?;
        let select = document
            .find("select", Selector::Id(ISSUER_SELECT_ID))
            .ok_or_else(|| FetchError::Decode {
                endpoint: endpoint.to_string(),
                message: format!("issuer list '{ISSUER_SELECT_ID}' not found"),
            })?;

        let mut issuers = Vec::new();
        for option in select.find_all("option", Selector::Any) {
            let code = option.attr("value").unwrap_or_default();
            if code.trim().is_empty() || code.trim() == ALL_ISSUERS_OPTION {
                continue;
            }
            issuers.push(Issuer::new(code, option.text())?);
        }

        debug!(count = issuers.len(), "fetched issuers");
        Ok(issuers)
    }

    pub async fn fetch_directory(&self) -> Result<IssuerDirectory, FetchError> {
        Ok(IssuerDirectory::new(self.fetch_issuers().await?))
    }
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    data: Vec<ListingRow>,
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    #[serde(rename = "FONKODU", default)]
    fund_code: Option<String>,
    #[serde(rename = "KURUCUKODU", default)]
    issuer_code: Option<String>,
}

/// Queries the fund listing endpoint and resolves issuers against a directory snapshot.
///
/// Clones share the snapshot. A fetcher built with [`CatalogFetcher::loading_issuers`]
/// reads the issuer list on its first listing and keeps it afterwards.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    requester: Arc<Requester>,
    issuers: Arc<OnceCell<Arc<IssuerDirectory>>>,
    fund_type: String,
}

impl CatalogFetcher {
    pub fn new(requester: Arc<Requester>, issuers: Arc<IssuerDirectory>) -> Self {
        Self {
            requester,
            issuers: Arc::new(OnceCell::from(issuers)),
            fund_type: String::from("YAT"),
        }
    }

    pub fn loading_issuers(requester: Arc<Requester>) -> Self {
        Self {
            requester,
            issuers: Arc::new(OnceCell::new()),
            fund_type: String::from("YAT"),
        }
    }

    pub fn with_fund_type(mut self, fund_type: impl Into<String>) -> Self {
        self.fund_type = fund_type.into();
        self
    }

    pub async fn issuers(&self) -> Result<Arc<IssuerDirectory>, FetchError> {
        let directory = self
            .issuers
            .get_or_try_init(|| async {
                let directory = IssuerFetcher::new(Arc::clone(&self.requester))
                    .fetch_directory()
                    .await?;
                info!(issuers = directory.len(), "loaded issuer directory");
                Ok::<_, FetchError>(Arc::new(directory))
            })
            .await?;
        Ok(Arc::clone(directory))
    }

    pub async fn fetch_all_identifiers(&self) -> Result<FundCatalog, FetchError> {
        self.fetch_listing(&[]).await
    }

    /// Funds currently traded on the platform.
    pub async fn fetch_listed_identifiers(&self) -> Result<FundCatalog, FetchError> {
        self.fetch_listing(&[("islemdurum", "1")]).await
    }

    pub async fn fetch_identifiers_for_issuer(
        &self,
        issuer_code: &str,
    ) -> Result<FundCatalog, FetchError> {
        self.fetch_listing(&[("kurucukod", issuer_code.trim())]).await
    }

    /// Union of the catalogs of several issuers.
    pub async fn fetch_identifiers_for_issuers(
        &self,
        issuer_codes: &[String],
    ) -> Result<FundCatalog, FetchError> {
        let mut catalog = FundCatalog::new();
        for issuer_code in issuer_codes {
            catalog.extend(self.fetch_identifiers_for_issuer(issuer_code).await?);
        }
        Ok(catalog)
    }

    /// Catalog entries for exactly `codes`.
    ///
    /// Codes the listing does not know are kept with no issuer so they can still
    /// be fetched.
    pub async fn fetch_identifiers_for(
        &self,
        codes: &BTreeSet<FundCode>,
    ) -> Result<FundCatalog, FetchError> {
        let mut listing = self.fetch_all_identifiers().await?;
        Ok(codes
            .iter()
            .map(|code| (code.clone(), listing.remove(code).flatten()))
            .collect())
    }

    async fn fetch_listing(&self, filters: &[(&str, &str)]) -> Result<FundCatalog, FetchError> {
        let mut fields = vec![("fontip", self.fund_type.as_str())];
        fields.extend_from_slice(filters);

        let response: ListingResponse = self
            .requester
            .post_json(&Endpoint::ManagementFees, &fields)
            .await?;
        let issuers = self.issuers().await?;

        let mut catalog = FundCatalog::new();
        for row in response.data {
            let Some(raw_code) = row.fund_code.filter(|code| !code.trim().is_empty()) else {
                continue;
            };
            let code = match FundCode::parse(&raw_code) {
                Ok(code) => code,
                Err(error) => {
                    warn!(code = %raw_code, %error, "skipping listing row");
                    continue;
                }
            };
            let issuer = row
                .issuer_code
                .as_deref()
                .and_then(|issuer_code| issuers.get(issuer_code))
                .cloned();
            catalog.insert(code, issuer);
        }

        debug!(count = catalog.len(), ?filters, "fetched fund catalog");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::http_client::{HttpResponse, ScriptedHttpClient};
    use crate::retry::RetryConfig;

    fn requester(client: &ScriptedHttpClient) -> Arc<Requester> {
        Arc::new(
            Requester::new(Arc::new(client.clone()))
                .with_retry(RetryConfig::linear(2, Duration::ZERO)),
        )
    }

    #[tokio::test]
    async fn issuer_list_skips_all_option() {
        let client = ScriptedHttpClient::new();
        client.respond(
            "FonKarsilastirma",
            HttpResponse::ok(
                r#"<select id="DropDownListFounderYAT">
                     <option value="Tümü">Tümü</option>
                     <option value="AKP">Ak Portföy Yönetimi A.Ş.</option>
                     <option value="IYP">İş Portföy Yönetimi A.Ş.</option>
                   </select>"#,
            ),
        );

        let issuers = IssuerFetcher::new(requester(&client))
            .fetch_issuers()
            .await
            .expect("issuers parsed");

        let codes: Vec<&str> = issuers.iter().map(Issuer::code).collect();
        assert_eq!(codes, vec!["AKP", "IYP"]);
        assert_eq!(issuers[1].name(), "İş Portföy Yönetimi A.Ş.");
    }

    #[tokio::test]
    async fn catalog_is_deduplicated_sorted_and_resolved() {
        let client = ScriptedHttpClient::new();
        client.respond(
            "BindComparisonManagementFees",
            HttpResponse::ok(
                r#"{"data":[
                    {"FONKODU":"TTE","KURUCUKODU":"IYP"},
                    {"FONKODU":"AFT","KURUCUKODU":"AKP"},
                    {"FONKODU":"AFT","KURUCUKODU":"AKP"},
                    {"FONKODU":"ZZZ","KURUCUKODU":"NOPE"},
                    {"FONKODU":null}
                ]}"#,
            ),
        );
        let directory = IssuerDirectory::new([
            Issuer::new("AKP", "Ak Portföy").expect("valid"),
            Issuer::new("IYP", "İş Portföy").expect("valid"),
        ]);

        let catalog = CatalogFetcher::new(requester(&client), Arc::new(directory))
            .fetch_all_identifiers()
            .await
            .expect("catalog fetched");

        let codes: Vec<&str> = catalog.keys().map(FundCode::as_str).collect();
        assert_eq!(codes, vec!["AFT", "TTE", "ZZZ"]);
        assert_eq!(
            catalog
                .values()
                .next()
                .and_then(Option::as_ref)
                .map(Issuer::code),
            Some("AKP")
        );
        assert!(catalog.values().nth(2).is_some_and(Option::is_none));
        assert_eq!(
            client.calls()[0].body.as_deref(),
            Some("fontip=YAT"),
        );
    }

    #[tokio::test]
    async fn issuer_filter_is_sent_in_form() {
        let client = ScriptedHttpClient::new();
        client.respond(
            "kurucukod=AKP",
            HttpResponse::ok(r#"{"data":[{"FONKODU":"AFT","KURUCUKODU":"AKP"}]}"#),
        );

        let catalog = CatalogFetcher::new(requester(&client), Arc::default())
            .fetch_identifiers_for_issuer("AKP")
            .await
            .expect("catalog fetched");

        assert_eq!(catalog.len(), 1);
        assert_eq!(client.calls()[0].body.as_deref(), Some("fontip=YAT&kurucukod=AKP"));
    }

    #[tokio::test]
    async fn listing_failure_fails_whole_catalog() {
        let client = ScriptedHttpClient::new();
        client.respond("BindComparisonManagementFees", HttpResponse::new(500, "down"));

        let err = CatalogFetcher::new(requester(&client), Arc::default())
            .fetch_listed_identifiers()
            .await
            .expect_err("terminal failure");
        assert!(matches!(err, FetchError::Status { status: 500, attempts: 2, .. }));
    }

    #[tokio::test]
    async fn issuer_directory_is_loaded_once_on_first_listing() {
        let client = ScriptedHttpClient::new();
        client.respond(
            "FonKarsilastirma",
            HttpResponse::ok(
                r#"<select id="DropDownListFounderYAT">
                     <option value="AKP">Ak Portföy Yönetimi A.Ş.</option>
                   </select>"#,
            ),
        );
        client.respond(
            "BindComparisonManagementFees",
            HttpResponse::ok(r#"{"data":[{"FONKODU":"AFT","KURUCUKODU":"AKP"}]}"#),
        );
        let fetcher = CatalogFetcher::loading_issuers(requester(&client));
        assert_eq!(client.call_count("FonKarsilastirma"), 0);

        let first = fetcher.fetch_all_identifiers().await.expect("catalog fetched");
        let second = fetcher.clone().fetch_listed_identifiers().await.expect("catalog fetched");

        assert_eq!(client.call_count("FonKarsilastirma"), 1);
        for catalog in [first, second] {
            let issuer = catalog.values().next().and_then(Option::as_ref);
            assert_eq!(issuer.map(Issuer::code), Some("AKP"));
        }
    }
}
