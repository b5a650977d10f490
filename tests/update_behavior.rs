//! Behaviour tests for the incremental price refresh.

mod support;

use time::macros::date;

use tefas_core::{
    CatalogFetcher, Distribution, Fund, FundCode, FundDataManager, HttpResponse, Price,
    PriceUpdater, RecordFetcher, RiskScore, ScriptedHttpClient, UpdateError,
};

use support::{
    fast_requester, history, history_body, listing_body, manager, page_response, PageFixture,
};

fn existing(code: &str, prices: &[(time::Date, f64)]) -> Fund {
    Fund::new(
        FundCode::parse(code).expect("valid code"),
        "Existing Fund",
        "Borçlanma Araçları Fonu",
        RiskScore::Known(2),
        true,
        prices
            .iter()
            .map(|(day, value)| Price::new(*day, *value).expect("valid price"))
            .collect(),
        vec![Distribution::new("Devlet Tahvili", 1.0).expect("valid slice")],
    )
    .expect("valid fund")
    .with_issuer_code(Some(String::from("AKP")))
}

fn updater(client: &ScriptedHttpClient) -> PriceUpdater {
    let requester = fast_requester(client, 2);
    PriceUpdater::new(history(&requester), manager(&requester, 4)).with_margin_days(1)
}

/// Updater whose catalog reads the issuer list only when a listing is needed.
fn lazy_updater(client: &ScriptedHttpClient) -> PriceUpdater {
    let requester = fast_requester(client, 2);
    let manager = FundDataManager::new(
        CatalogFetcher::loading_issuers(requester.clone()),
        RecordFetcher::new(requester.clone()),
    );
    PriceUpdater::new(history(&requester), manager).with_margin_days(1)
}

fn script_window(client: &ScriptedHttpClient) {
    client.respond(
        "bastarih=02.01.2024",
        HttpResponse::ok(history_body(&[("AFT", 1.5)])),
    );
    client.respond(
        "bastarih=03.01.2024",
        HttpResponse::ok(history_body(&[("AFT", 1.65)])),
    );
    client.respond(
        "bastarih=04.01.2024",
        HttpResponse::ok(history_body(&[("AFT", 1.7), ("TTE", 2.0)])),
    );
    client.respond(
        "bastarih=05.01.2024",
        HttpResponse::ok(history_body(&[("AFT", 0.0)])),
    );
}

// =============================================================================
// Updater: merging into known funds
// =============================================================================

#[tokio::test]
async fn recent_prices_are_revised_and_appended() {
    // Given: A dataset ending on 03.01 and a source that revised that day
    let client = ScriptedHttpClient::new();
    script_window(&client);
    client.respond(
        "BindComparisonManagementFees",
        HttpResponse::ok(listing_body(&[("AFT", "AKP"), ("TTE", "IYP")])),
    );
    client.respond("FonKod=TTE", page_response(&PageFixture::default()));
    let funds = vec![existing(
        "AFT",
        &[(date!(2024 - 01 - 02), 1.5), (date!(2024 - 01 - 03), 1.6)],
    )];

    // When: The dataset is refreshed on 05.01
    let report = updater(&client)
        .update(funds, date!(2024 - 01 - 05))
        .await
        .expect("refresh succeeds");

    // Then: The window covers the margin and every day up to today
    assert_eq!(report.window.start(), date!(2024 - 01 - 02));
    assert_eq!(report.window.end(), date!(2024 - 01 - 05));
    assert_eq!(client.call_count("BindHistoryInfo"), 4);

    // And: AFT was revised once and extended by one day, the zero price ignored
    let aft = &report.funds[0];
    assert_eq!(aft.code().as_str(), "AFT");
    let values: Vec<f64> = aft.prices().iter().map(Price::value).collect();
    assert_eq!(values, vec![1.5, 1.65, 1.7]);
    assert_eq!(report.merge_totals.revised, 1);
    assert_eq!(report.merge_totals.appended, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(aft.issuer_code(), Some("AKP"));
}

#[tokio::test]
async fn unseen_codes_are_fetched_as_new_funds() {
    // Given: A history window mentioning a fund the dataset does not hold
    let client = ScriptedHttpClient::new();
    script_window(&client);
    client.respond(
        "BindComparisonManagementFees",
        HttpResponse::ok(listing_body(&[("AFT", "AKP"), ("TTE", "IYP")])),
    );
    client.respond("FonKod=TTE", page_response(&PageFixture::default()));
    let funds = vec![existing(
        "AFT",
        &[(date!(2024 - 01 - 02), 1.5), (date!(2024 - 01 - 03), 1.6)],
    )];

    // When: The dataset is refreshed
    let report = updater(&client)
        .update(funds, date!(2024 - 01 - 05))
        .await
        .expect("refresh succeeds");

    // Then: The new fund is fetched in full with its issuer resolved
    let codes: Vec<&str> = report.new_codes.iter().map(FundCode::as_str).collect();
    assert_eq!(codes, vec!["TTE"]);
    assert_eq!(report.funds.len(), 2);
    assert_eq!(report.funds[1].code().as_str(), "TTE");
    assert_eq!(report.funds[1].issuer_code(), Some("IYP"));
    assert_eq!(client.call_count("FonKod=AFT"), 0);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn funds_without_observations_are_left_untouched() {
    // Given: A second fund the window never mentions
    let client = ScriptedHttpClient::new();
    client.respond("BindHistoryInfo", HttpResponse::ok(history_body(&[])));
    let quiet = existing("BBB", &[(date!(2024 - 01 - 03), 3.0)]);
    let funds = vec![quiet.clone()];

    // When: The dataset is refreshed
    let report = updater(&client)
        .update(funds, date!(2024 - 01 - 05))
        .await
        .expect("refresh succeeds");

    // Then: The fund is returned as it was
    assert_eq!(report.funds, vec![quiet]);
    assert_eq!(report.updated, 0);
    assert!(report.new_codes.is_empty());
    assert_eq!(client.call_count("BindComparisonManagementFees"), 0);
}

#[tokio::test]
async fn refresh_of_known_funds_does_not_need_the_issuer_list() {
    // Given: A window that only mentions known funds and an unavailable comparison page
    let client = ScriptedHttpClient::new();
    client.respond("BindHistoryInfo", HttpResponse::ok(history_body(&[("AFT", 1.7)])));
    client.respond("FonKarsilastirma", HttpResponse::new(500, "down"));
    let funds = vec![existing("AFT", &[(date!(2024 - 01 - 03), 1.6)])];

    // When: The dataset is refreshed
    let report = lazy_updater(&client)
        .update(funds, date!(2024 - 01 - 05))
        .await
        .expect("refresh succeeds");

    // Then: Prices were merged without touching the issuer list
    assert_eq!(report.updated, 1);
    assert_eq!(report.funds[0].last_price().value(), 1.7);
    assert_eq!(client.call_count("FonKarsilastirma"), 0);
}

#[tokio::test]
async fn new_codes_load_the_issuer_list_on_demand() {
    // Given: A window with a new code and a reachable comparison page
    let client = ScriptedHttpClient::new();
    script_window(&client);
    client.respond(
        "FonKarsilastirma",
        HttpResponse::ok(
            r#"<select id="DropDownListFounderYAT"><option value="IYP">İş Portföy</option></select>"#,
        ),
    );
    client.respond(
        "BindComparisonManagementFees",
        HttpResponse::ok(listing_body(&[("AFT", "AKP"), ("TTE", "IYP")])),
    );
    client.respond("FonKod=TTE", page_response(&PageFixture::default()));
    let funds = vec![existing("AFT", &[(date!(2024 - 01 - 03), 1.6)])];

    // When: The dataset is refreshed
    let report = lazy_updater(&client)
        .update(funds, date!(2024 - 01 - 05))
        .await
        .expect("refresh succeeds");

    // Then: The issuer list was read once and resolved the new fund
    assert_eq!(client.call_count("FonKarsilastirma"), 1);
    assert_eq!(report.funds[1].issuer_code(), Some("IYP"));
}

// =============================================================================
// Updater: failures
// =============================================================================

#[tokio::test]
async fn history_failure_aborts_the_refresh() {
    // Given: A history endpoint that fails on one day of the window
    let client = ScriptedHttpClient::new();
    client.respond("bastarih=04.01.2024", HttpResponse::new(500, "error"));
    client.respond("BindHistoryInfo", HttpResponse::ok(history_body(&[("AFT", 1.6)])));
    let funds = vec![existing("AFT", &[(date!(2024 - 01 - 03), 1.6)])];

    // When: The dataset is refreshed
    let result = updater(&client).update(funds, date!(2024 - 01 - 05)).await;

    // Then: The whole refresh fails after the retry budget
    let err = result.expect_err("history failure is terminal");
    assert!(matches!(err, UpdateError::History(ref source) if source.attempts() == Some(2)));
}

#[tokio::test]
async fn catalog_failure_for_new_codes_aborts_the_refresh() {
    // Given: A new code in the window and an unavailable listing endpoint
    let client = ScriptedHttpClient::new();
    client.respond("BindHistoryInfo", HttpResponse::ok(history_body(&[("NEW", 1.0)])));
    client.respond("BindComparisonManagementFees", HttpResponse::new(503, "down"));
    let funds = vec![existing("AFT", &[(date!(2024 - 01 - 03), 1.6)])];

    // When: The dataset is refreshed
    let result = updater(&client).update(funds, date!(2024 - 01 - 05)).await;

    // Then: The catalog error is surfaced
    assert!(matches!(result, Err(UpdateError::Catalog(_))));
}

#[tokio::test]
async fn empty_dataset_cannot_be_refreshed() {
    let client = ScriptedHttpClient::new();

    let result = updater(&client).update(Vec::new(), date!(2024 - 01 - 05)).await;

    assert!(matches!(result, Err(UpdateError::EmptyDataset)));
    assert!(client.calls().is_empty());
}
