use httpmock::prelude::*;
use serde_json::json;

use econfed_core::ProviderAdapter;
use econfed_providers::EurostatAdapter;
use econfed_types::{FetchRequest, Frequency};

/// A une_rt_a JSON-stat body where the thousands-of-persons slice comes
/// before the percentage slice; reading the wrong slice is the classic
/// decoding failure this adapter exists to prevent.
fn unemployment_body() -> serde_json::Value {
    json!({
        "label": "Unemployment by sex and age - annual data",
        "id": ["freq", "unit", "geo", "time"],
        "size": [1, 2, 1, 3],
        "dimension": {
            "freq": {"category": {"index": {"A": 0}, "label": {"A": "Annual"}}},
            "unit": {"category": {
                "index": {"THS_PER": 0, "PC_ACT": 1},
                "label": {
                    "THS_PER": "Thousand persons",
                    "PC_ACT": "Percentage of population in the labour force"
                }
            }},
            "geo": {"category": {"index": {"DE": 0}, "label": {"DE": "Germany"}}},
            "time": {"category": {"index": {"2021": 0, "2022": 1, "2023": 2}, "label": {}}}
        },
        "value": {"0": 1621.0, "1": 1446.0, "2": 1490.0, "3": 3.6, "4": 3.1, "5": 3.0}
    })
}

#[tokio::test]
async fn unemployment_reads_the_percentage_slice() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/statistics/1.0/data/une_rt_a")
                .query_param("geo", "DE");
            then.status(200).json_body(unemployment_body());
        })
        .await;

    let adapter = EurostatAdapter::new().with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "unemployment rate".into(),
        countries: vec!["DE".into()],
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();

    assert_eq!(series.len(), 1);
    let s = &series[0];
    assert_eq!(s.meta.country, "Germany");
    assert_eq!(s.meta.frequency, Frequency::Annual);
    // The percentage slice, not thousands of persons.
    assert_eq!(s.points[0].value, Some(3.6));
    assert_eq!(s.points[2].value, Some(3.0));
    assert!(s.meta.unit.to_lowercase().contains("percentage"));
}

#[tokio::test]
async fn quarterly_time_labels_normalize_to_quarter_start() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/statistics/1.0/data/gov_10q_ggdebt");
            then.status(200).json_body(json!({
                "label": "Government debt",
                "id": ["unit", "geo", "time"],
                "size": [1, 1, 2],
                "dimension": {
                    "unit": {"category": {"index": {"PC_GDP": 0}, "label": {"PC_GDP": "Percentage of GDP"}}},
                    "geo": {"category": {"index": {"FR": 0}, "label": {"FR": "France"}}},
                    "time": {"category": {"index": {"2023-Q1": 0, "2023-Q2": 1}, "label": {}}}
                },
                "value": {"0": 111.9, "1": 111.8}
            }));
        })
        .await;

    let adapter = EurostatAdapter::new().with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "government debt".into(),
        series_id: Some("gov_10q_ggdebt".into()),
        countries: vec!["FR".into()],
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();
    let s = &series[0];
    assert_eq!(s.meta.frequency, Frequency::Quarterly);
    assert_eq!(s.points[0].date.to_string(), "2023-01-01");
    assert_eq!(s.points[1].date.to_string(), "2023-04-01");
}

#[tokio::test]
async fn all_null_slices_are_not_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/statistics/1.0/data/une_rt_a");
            then.status(200).json_body(json!({
                "id": ["time"],
                "size": [2],
                "dimension": {
                    "time": {"category": {"index": {"2022": 0, "2023": 1}, "label": {}}}
                },
                "value": {}
            }));
        })
        .await;

    let adapter = EurostatAdapter::new().with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "unemployment rate".into(),
        countries: vec!["DE".into()],
        ..FetchRequest::default()
    };
    let err = adapter.fetch(&req).await.unwrap_err();
    assert!(matches!(err, econfed_types::FedError::DataNotAvailable { .. }));
}
