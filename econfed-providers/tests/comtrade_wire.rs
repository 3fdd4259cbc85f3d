use httpmock::prelude::*;
use serde_json::json;

use econfed_core::ProviderAdapter;
use econfed_providers::ComtradeAdapter;
use econfed_types::{FetchRequest, TradeFlow};

fn trade_record(reporter: &str, partner: &str, year: i32, flow: &str, value: f64) -> serde_json::Value {
    json!({
        "refYear": year,
        "reporterDesc": reporter,
        "partnerDesc": partner,
        "flowCode": flow,
        "cmdCode": "TOTAL",
        "primaryValue": value
    })
}

#[tokio::test]
async fn taiwan_reporter_flips_to_partner_perspective() {
    let server = MockServer::start_async().await;
    // Expect partner-perspective queries: major partners as reporters,
    // Taiwan (490) as partner, flow flipped from EXPORT to IMPORT.
    let partners = [
        ("156", "China"),
        ("840", "USA"),
        ("392", "Japan"),
        ("410", "Rep. of Korea"),
        ("344", "China, Hong Kong SAR"),
        ("702", "Singapore"),
    ];
    let mut mocks = Vec::new();
    for (code, name) in partners {
        let record = trade_record(name, "Other Asia, nes", 2022, "M", 1.0e9);
        let mock = server
            .mock_async(move |when, then| {
                when.method(GET)
                    .path("/data/v1/get/C/A/HS")
                    .query_param("reporterCode", code)
                    .query_param("partnerCode", "490")
                    .query_param("flowCode", "M");
                then.status(200).json_body(json!({"data": [record]}));
            })
            .await;
        mocks.push(mock);
    }

    let adapter = ComtradeAdapter::new(Some("k".into())).with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "exports".into(),
        reporter: Some("Taiwan".into()),
        flow: Some(TradeFlow::Export),
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();

    for mock in &mocks {
        mock.assert_async().await;
    }
    assert_eq!(series.len(), 6);
    // Each series is labeled by the partner whose books were read.
    assert!(series[0].meta.indicator.contains("Taiwan exports"));
    assert_eq!(series[0].meta.country, "China");
}

#[tokio::test]
async fn revisions_dedup_to_the_largest_magnitude() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/v1/get/C/A/HS")
                .query_param("reporterCode", "124");
            then.status(200).json_body(json!({"data": [
                trade_record("Canada", "World", 2022, "X", 500.0e9),
                // A later revision of the same (period, flow, commodity).
                trade_record("Canada", "World", 2022, "X", 598.0e9),
                trade_record("Canada", "World", 2023, "X", 610.0e9)
            ]}));
        })
        .await;

    let adapter = ComtradeAdapter::new(None).with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "exports".into(),
        reporter: Some("Canada".into()),
        flow: Some(TradeFlow::Export),
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].points.len(), 2);
    assert_eq!(series[0].points[0].value, Some(598.0e9));
}

#[tokio::test]
async fn eu_partner_expands_to_member_queries() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/data/v1/get/C/A/HS");
            then.status(200).json_body(json!({"data": [
                trade_record("USA", "Germany", 2022, "X", 80.0e9)
            ]}));
        })
        .await;

    let adapter = ComtradeAdapter::new(None).with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "exports".into(),
        reporter: Some("US".into()),
        partner: Some("EU".into()),
        flow: Some(TradeFlow::Export),
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();
    // One upstream query per EU member.
    assert_eq!(mock.hits_async().await, 27);
    assert_eq!(series.len(), 27);
}
