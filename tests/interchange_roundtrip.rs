//! Behaviour tests for the raw and processed CSV exports.

use std::fs;

use tempfile::tempdir;
use time::macros::date;

use tefas_core::interchange::RAW_FILE_NAME;
use tefas_core::report::PROCESSED_FILE_NAME;
use tefas_core::{
    read_funds, read_funds_from_path, write_funds, write_funds_to_path, Distribution, Fund,
    FundCode, InterchangeError, Price, ProcessedTable, RiskScore,
};

fn sample_funds() -> Vec<Fund> {
    let listed = Fund::new(
        FundCode::parse("AFT").expect("valid code"),
        "Ak Portföy Yeni Teknolojiler Yabancı Hisse Senedi Fonu",
        "Hisse Senedi Fonu",
        RiskScore::Known(6),
        true,
        vec![
            Price::new(date!(2023 - 12 - 29), 0.912345).expect("valid price"),
            Price::new(date!(2024 - 01 - 02), 0.95).expect("valid price"),
            Price::new(date!(2024 - 01 - 03), 1.0).expect("valid price"),
        ],
        vec![
            Distribution::new("Yabancı Hisse Senedi", 0.9).expect("valid slice"),
            Distribution::new("Mevduat, \"TL\"", 0.1).expect("valid slice"),
        ],
    )
    .expect("valid fund")
    .with_issuer_code(Some(String::from("AKP")))
    .with_market_share(Some(0.0125))
    .expect("valid share");

    let unknown_risk = Fund::new(
        FundCode::parse("ZZZ").expect("valid code"),
        "Unlisted Fund",
        "Serbest Fon",
        RiskScore::Unknown,
        false,
        vec![Price::new(date!(2024 - 01 - 03), 12.5).expect("valid price")],
        vec![Distribution::new("Repo", 1.0).expect("valid slice")],
    )
    .expect("valid fund");

    vec![listed, unknown_risk]
}

#[test]
fn raw_export_reads_back_identically() {
    // Given: Funds with quoted names, an unknown risk and optional columns
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join(RAW_FILE_NAME);
    let funds = sample_funds();

    // When: They are written and read back
    write_funds_to_path(&path, &funds).expect("written");
    let restored = read_funds_from_path(&path).expect("read back");

    // Then: Nothing was lost
    assert_eq!(restored, funds);
}

#[test]
fn full_precision_prices_survive_the_json_cells() {
    // Given: Prices that need all 17 significant digits
    let values = [250.73804429243242, 0.1 + 0.2, 1.0 / 3.0];
    let fund = Fund::new(
        FundCode::parse("PRC").expect("valid code"),
        "Precision Fund",
        "Para Piyasası Fonu",
        RiskScore::Known(1),
        true,
        values
            .iter()
            .zip([date!(2024 - 01 - 02), date!(2024 - 01 - 03), date!(2024 - 01 - 04)])
            .map(|(value, day)| Price::new(day, *value).expect("valid price"))
            .collect(),
        vec![Distribution::new("Repo", 1.0).expect("valid slice")],
    )
    .expect("valid fund");

    // When: The fund is written and read back
    let mut buffer = Vec::new();
    write_funds(&mut buffer, std::slice::from_ref(&fund)).expect("written");
    let restored = read_funds(buffer.as_slice()).expect("read back");

    // Then: Every price is bit-for-bit identical
    let restored: Vec<u64> = restored[0]
        .prices()
        .iter()
        .map(|price| price.value().to_bits())
        .collect();
    let expected: Vec<u64> = values.iter().map(|value| value.to_bits()).collect();
    assert_eq!(restored, expected);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempdir().expect("temp dir");

    let err = read_funds_from_path(dir.path().join("absent.csv")).expect_err("no file");

    assert!(matches!(err, InterchangeError::Io(_)));
}

#[test]
fn processed_export_has_returns_and_distribution_columns() {
    // Given: A fund with history reaching back one week
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join(PROCESSED_FILE_NAME);
    let table = ProcessedTable::from_funds(&sample_funds());

    // When: The processed table is written
    table.write_to_path(&path).expect("written");
    let text = fs::read_to_string(&path).expect("readable");

    // Then: One header plus one row per fund, with union distribution columns
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let header: Vec<String> = reader
        .headers()
        .expect("header")
        .iter()
        .map(str::to_owned)
        .collect();
    assert_eq!(&header[..3], ["code", "name", "category"]);
    assert!(header.contains(&String::from("return_1d")));
    assert!(header.ends_with(&[
        String::from("Mevduat, \"TL\""),
        String::from("Repo"),
        String::from("Yabancı Hisse Senedi"),
    ]));

    let rows: Vec<csv::StringRecord> = reader.records().map(|row| row.expect("row")).collect();
    assert_eq!(rows.len(), 2);

    let column = |name: &str| header.iter().position(|column| column == name).expect("column");
    assert_eq!(&rows[0][column("return_1d")], "0.0526");
    assert_eq!(&rows[0][column("return_7d")], "");
    assert_eq!(&rows[0][column("market_share")], "0.0125");
    assert_eq!(&rows[1][column("risk_score")], "");
    assert_eq!(&rows[1][column("Repo")], "1");
    assert_eq!(&rows[1][column("Yabancı Hisse Senedi")], "");
}
