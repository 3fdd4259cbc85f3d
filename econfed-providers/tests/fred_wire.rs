use httpmock::prelude::*;
use serde_json::json;

use econfed_providers::FredAdapter;
use econfed_core::ProviderAdapter;
use econfed_types::{FetchRequest, Frequency};

fn series_body() -> serde_json::Value {
    json!({
        "seriess": [{
            "id": "UNRATE",
            "title": "Unemployment Rate",
            "frequency": "Monthly",
            "units": "Percent",
            "seasonal_adjustment": "Seasonally Adjusted",
            "notes": "The unemployment rate represents the number of unemployed as a percentage of the labor force."
        }]
    })
}

#[tokio::test]
async fn unemployment_window_returns_six_monthly_points() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/fred/series")
                .query_param("series_id", "UNRATE");
            then.status(200).json_body(series_body());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/fred/series/observations")
                .query_param("series_id", "UNRATE")
                .query_param("observation_start", "2020-01-01")
                .query_param("observation_end", "2020-06-01");
            then.status(200).json_body(json!({
                "observations": [
                    {"date": "2020-01-01", "value": "3.6"},
                    {"date": "2020-02-01", "value": "3.5"},
                    {"date": "2020-03-01", "value": "4.4"},
                    {"date": "2020-04-01", "value": "14.8"},
                    {"date": "2020-05-01", "value": "13.2"},
                    {"date": "2020-06-01", "value": "11.0"}
                ]
            }));
        })
        .await;

    let adapter = FredAdapter::new(Some("testkey".into())).with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "unemployment rate".into(),
        start_date: Some("2020-01-01".parse().unwrap()),
        end_date: Some("2020-06-01".parse().unwrap()),
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();

    assert_eq!(series.len(), 1);
    let s = &series[0];
    assert_eq!(s.meta.series_id, "UNRATE");
    assert_eq!(s.meta.frequency, Frequency::Monthly);
    assert!(s.meta.unit.contains("Percent"));
    assert_eq!(s.points.len(), 6);
    assert_eq!(s.points[0].date.to_string(), "2020-01-01");
    assert_eq!(s.points[5].date.to_string(), "2020-06-01");
    // Real percentages are not rescaled.
    assert_eq!(s.points[3].value, Some(14.8));
    // The key never leaks into reproducibility metadata.
    assert!(!s.meta.api_url.contains("testkey"));
    assert!(s.meta.api_url.contains("api_key=***"));
}

#[tokio::test]
async fn missing_observations_are_gaps_not_zeroes() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fred/series");
            then.status(200).json_body(series_body());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fred/series/observations");
            then.status(200).json_body(json!({
                "observations": [
                    {"date": "2020-01-01", "value": "3.6"},
                    {"date": "2020-02-01", "value": "."},
                    {"date": "2020-03-01", "value": "4.4"}
                ]
            }));
        })
        .await;

    let adapter = FredAdapter::new(None).with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "UNRATE".into(),
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();
    assert_eq!(series[0].points[1].value, None);
}

#[tokio::test]
async fn decimal_encoded_percent_series_are_rescaled() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fred/series");
            then.status(200).json_body(json!({
                "seriess": [{
                    "id": "RATESERIES",
                    "title": "Some Rate",
                    "frequency": "Quarterly",
                    "units": "Percent",
                    "seasonal_adjustment": ""
                }]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fred/series/observations");
            then.status(200).json_body(json!({
                "observations": [
                    {"date": "2020-01-01", "value": "0.025"},
                    {"date": "2020-04-01", "value": "0.031"}
                ]
            }));
        })
        .await;

    let adapter = FredAdapter::new(None).with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "RATESERIES".into(),
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();
    assert_eq!(series[0].points[0].value, Some(2.5));
    assert_eq!(series[0].points[1].value, Some(3.1));
}

#[tokio::test]
async fn series_search_returns_ranked_hits() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fred/series/search");
            then.status(200).json_body(json!({
                "seriess": [
                    {"id": "TOTALSL", "title": "Total Consumer Credit", "frequency": "Monthly", "units": "Billions of Dollars", "seasonal_adjustment": "SA"},
                    {"id": "REVOLSL", "title": "Revolving Consumer Credit", "frequency": "Monthly", "units": "Billions of Dollars", "seasonal_adjustment": "SA"}
                ]
            }));
        })
        .await;

    let adapter = FredAdapter::new(None).with_base_url(server.base_url());
    let hits = adapter.search_series("consumer credit", 10).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "TOTALSL");
}

#[tokio::test]
async fn empty_observations_become_data_not_available() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fred/series");
            then.status(200).json_body(series_body());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fred/series/observations");
            then.status(200).json_body(json!({"observations": []}));
        })
        .await;

    let adapter = FredAdapter::new(None).with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "UNRATE".into(),
        ..FetchRequest::default()
    };
    let err = adapter.fetch(&req).await.unwrap_err();
    assert!(matches!(err, econfed_types::FedError::DataNotAvailable { .. }));
}
