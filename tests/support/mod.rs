//! Shared fixtures for the behaviour tests: canned pages and JSON bodies
//! served through `ScriptedHttpClient`.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tefas_core::{
    CatalogFetcher, FundDataManager, HistoryFetcher, HttpResponse, Issuer, IssuerDirectory,
    RecordFetcher, Requester, RetryConfig, ScriptedHttpClient,
};

/// One fund analysis page as the source renders it.
pub struct PageFixture<'a> {
    pub name: &'a str,
    pub category: &'a str,
    pub risk: &'a str,
    pub listed: bool,
    pub market_share: &'a str,
    pub prices: &'a [(&'a str, f64)],
    pub pie: &'a [(&'a str, f64)],
}

impl Default for PageFixture<'_> {
    fn default() -> Self {
        Self {
            name: "Ak Portföy Hisse Senedi Fonu",
            category: "Hisse Senedi Fonu",
            risk: "6",
            listed: true,
            market_share: "%1,25",
            prices: &[("02.01.2024", 1.5), ("03.01.2024", 1.6)],
            pie: &[("Hisse Senedi", 80.0), ("Mevduat", 20.0)],
        }
    }
}

impl PageFixture<'_> {
    pub fn html(&self) -> String {
        let listed = if self.listed {
            "TEFAS'ta işlem görüyor"
        } else {
            "TEFAS'ta İşlem Görmüyor"
        };
        let categories = self
            .prices
            .iter()
            .map(|(date, _)| format!("'{date}'"))
            .collect::<Vec<_>>()
            .join(",");
        let values = self
            .prices
            .iter()
            .map(|(_, value)| value.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let slices = self
            .pie
            .iter()
            .map(|(name, percent)| format!("['{name}', {percent}]"))
            .collect::<Vec<_>>()
            .join(",");

        format!(
            r#"<html><body>
<div class="main-indicators">
  <span id="MainContent_FormViewMainIndicators_LabelFund">{name}</span>
  <ul class="top-list">
    <li>Kategorisi<span>{category}</span></li>
    <li>Pazar Payı<span>{market_share}</span></li>
  </ul>
</div>
<div class="fund-profile">
  <table id="MainContent_DetailsViewFund">
    <tr><td class="fund-profile-header">Fonun Risk Değeri</td><td class="fund-profile-item">{risk}</td></tr>
    <tr><td class="fund-profile-header">Platform İşlem Durumu</td><td class="fund-profile-item">{listed}</td></tr>
  </table>
</div>
<script type="text/javascript">
Highcharts.chart('chartMainContent_FonFiyatGrafik', {{ xAxis: {{ categories: [{categories}] }}, series: [{{ name: 'Fiyat', data: [{values}] }}] }});
Highcharts.chart('chartMainContent_PieChartFonDagilim', {{ series: [{{ type: 'pie', data: [{slices}] }}] }});
</script>
</body></html>"#,
            name = self.name,
            category = self.category,
            market_share = self.market_share,
            risk = self.risk,
        )
    }
}

pub fn page_response(fixture: &PageFixture<'_>) -> HttpResponse {
    HttpResponse::ok(fixture.html())
}

/// `BindComparisonManagementFees` body listing `(code, issuer)` rows.
pub fn listing_body(rows: &[(&str, &str)]) -> String {
    let rows = rows
        .iter()
        .map(|(code, issuer)| format!(r#"{{"FONKODU":"{code}","KURUCUKODU":"{issuer}"}}"#))
        .collect::<Vec<_>>()
        .join(",");
    format!(r#"{{"data":[{rows}]}}"#)
}

/// `BindHistoryInfo` body with one `(code, price)` row per fund.
pub fn history_body(rows: &[(&str, f64)]) -> String {
    let rows = rows
        .iter()
        .map(|(code, price)| format!(r#"{{"FONKODU":"{code}","FIYAT":{price}}}"#))
        .collect::<Vec<_>>()
        .join(",");
    format!(r#"{{"data":[{rows}]}}"#)
}

pub fn fast_requester(client: &ScriptedHttpClient, attempts: u32) -> Arc<Requester> {
    Arc::new(
        Requester::new(Arc::new(client.clone()))
            .with_retry(RetryConfig::linear(attempts, Duration::ZERO)),
    )
}

pub fn directory() -> Arc<IssuerDirectory> {
    Arc::new(IssuerDirectory::new([
        Issuer::new("AKP", "Ak Portföy Yönetimi A.Ş.").expect("valid issuer"),
        Issuer::new("IYP", "İş Portföy Yönetimi A.Ş.").expect("valid issuer"),
    ]))
}

pub fn manager(requester: &Arc<Requester>, workers: usize) -> FundDataManager {
    FundDataManager::new(
        CatalogFetcher::new(Arc::clone(requester), directory()),
        RecordFetcher::new(Arc::clone(requester)),
    )
    .with_max_workers(workers)
}

pub fn history(requester: &Arc<Requester>) -> HistoryFetcher {
    HistoryFetcher::new(Arc::clone(requester))
}
