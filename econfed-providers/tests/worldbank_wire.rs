use httpmock::prelude::*;
use serde_json::json;

use econfed_core::ProviderAdapter;
use econfed_providers::WorldBankAdapter;
use econfed_types::FetchRequest;

fn record(iso3: &str, name: &str, year: &str, value: f64) -> serde_json::Value {
    json!({
        "indicator": {"id": "NY.GDP.MKTP.KD.ZG", "value": "GDP growth (annual %)"},
        "country": {"id": iso3, "value": name},
        "countryiso3code": iso3,
        "date": year,
        "value": value,
        "unit": "",
        "decimal": 1
    })
}

#[tokio::test]
async fn g7_request_yields_one_series_per_country() {
    let server = MockServer::start_async().await;
    let countries = [
        ("CAN", "Canada"),
        ("FRA", "France"),
        ("DEU", "Germany"),
        ("ITA", "Italy"),
        ("JPN", "Japan"),
        ("GBR", "United Kingdom"),
        ("USA", "United States"),
    ];
    let mut records = Vec::new();
    for (iso3, name) in &countries {
        records.push(record(iso3, name, "2022", 2.1));
        records.push(record(iso3, name, "2023", 1.4));
    }
    server
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/v2/country/CA;FR;DE;IT;JP;GB;US/indicator/NY.GDP.MKTP.KD.ZG");
            then.status(200)
                .json_body(json!([{ "page": 1, "pages": 1, "per_page": 1000, "total": 14 }, records]));
        })
        .await;

    let adapter = WorldBankAdapter::new().with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "GDP growth".into(),
        series_id: Some("NY.GDP.MKTP.KD.ZG".into()),
        countries: vec!["CA", "FR", "DE", "IT", "JP", "GB", "US"]
            .into_iter()
            .map(String::from)
            .collect(),
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();

    assert_eq!(series.len(), 7);
    let ids: Vec<&str> = series.iter().map(|s| s.meta.series_id.as_str()).collect();
    assert_eq!(ids, vec!["CAN", "FRA", "DEU", "ITA", "JPN", "GBR", "USA"]);
    for s in &series {
        assert!(s.meta.indicator.contains("growth"));
        assert_eq!(s.points.len(), 2);
        assert_eq!(s.points[0].date.to_string(), "2022-01-01");
    }
}

#[tokio::test]
async fn pagination_is_followed_to_the_last_page() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/country/US/indicator/SP.POP.TOTL")
                .query_param("page", "1");
            then.status(200).json_body(json!([
                {"page": 1, "pages": 2, "per_page": 1000, "total": 2},
                [{
                    "indicator": {"id": "SP.POP.TOTL", "value": "Population, total"},
                    "country": {"id": "US", "value": "United States"},
                    "countryiso3code": "USA",
                    "date": "2022",
                    "value": 333_000_000.0,
                    "unit": ""
                }]
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v2/country/US/indicator/SP.POP.TOTL")
                .query_param("page", "2");
            then.status(200).json_body(json!([
                {"page": 2, "pages": 2, "per_page": 1000, "total": 2},
                [{
                    "indicator": {"id": "SP.POP.TOTL", "value": "Population, total"},
                    "country": {"id": "US", "value": "United States"},
                    "countryiso3code": "USA",
                    "date": "2023",
                    "value": 334_000_000.0,
                    "unit": ""
                }]
            ]));
        })
        .await;

    let adapter = WorldBankAdapter::new().with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "population".into(),
        series_id: Some("SP.POP.TOTL".into()),
        countries: vec!["US".into()],
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();
    assert_eq!(series[0].points.len(), 2);
}

#[tokio::test]
async fn error_message_array_becomes_data_not_available() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path_includes("/v2/country");
            then.status(200).json_body(json!([
                {"message": [{"id": "120", "key": "Invalid value", "value": "The provided parameter value is not valid"}]}
            ]));
        })
        .await;

    let adapter = WorldBankAdapter::new().with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "NY.GDP.MKTP.KD.ZG".into(),
        countries: vec!["US".into()],
        ..FetchRequest::default()
    };
    let err = adapter.fetch(&req).await.unwrap_err();
    match err {
        econfed_types::FedError::DataNotAvailable { message, .. } => {
            assert!(message.contains("not valid"));
        }
        other => panic!("expected DataNotAvailable, got {other:?}"),
    }
}
