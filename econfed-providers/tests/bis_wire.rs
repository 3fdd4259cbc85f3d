use httpmock::prelude::*;
use serde_json::json;

use econfed_core::ProviderAdapter;
use econfed_providers::BisAdapter;
use econfed_types::{FedError, FetchRequest, Frequency};

/// A WS_TC payload with three series; only one matches the preferred
/// private-non-financial / percent-of-GDP / adjusted / market-value combo.
fn total_credit_body() -> serde_json::Value {
    json!({
        "data": {
            "dataSets": [{
                "series": {
                    // Government borrowers, USD: lots of data, wrong slice.
                    "0:0:0:1:0": {"observations": {"0": [900.1], "1": [905.7], "2": [911.0], "3": [914.2]}},
                    // Private non-financial, % of GDP, adjusted, market value.
                    "0:1:1:0:0": {"observations": {"0": [160.5], "1": [161.2]}},
                    // Private non-financial, USD.
                    "0:1:0:1:0": {"observations": {"0": [20500.0], "1": [20750.0], "2": [21000.0]}}
                }
            }],
            "structure": {
                "dimensions": {
                    "series": [
                        {"id": "FREQ", "values": [{"id": "Q"}]},
                        {"id": "TC_BORROWERS", "values": [{"id": "G"}, {"id": "P"}]},
                        {"id": "UNIT_TYPE", "values": [{"id": "XDC"}, {"id": "770"}]},
                        {"id": "TC_ADJUST", "values": [{"id": "A"}, {"id": "U"}]},
                        {"id": "VALUATION", "values": [{"id": "M"}]}
                    ],
                    "observation": [
                        {"id": "TIME_PERIOD", "values": [
                            {"id": "2023-Q1"}, {"id": "2023-Q2"}, {"id": "2023-Q3"}, {"id": "2023-Q4"}
                        ]}
                    ]
                }
            }
        }
    })
}

#[tokio::test]
async fn total_credit_selects_the_preferred_series_deterministically() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/data/WS_TC/Q.US");
            then.status(200).json_body(total_credit_body());
        })
        .await;

    let adapter = BisAdapter::new().with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "total credit".into(),
        countries: vec!["US".into()],
        // The caller asks monthly; WS_TC only exists quarterly.
        frequency: Some(Frequency::Monthly),
        ..FetchRequest::default()
    };

    for _ in 0..3 {
        let series = adapter.fetch(&req).await.unwrap();
        assert_eq!(series.len(), 1);
        let s = &series[0];
        // The % of GDP series wins despite having the fewest observations.
        assert_eq!(s.meta.series_id, "WS_TC/0:1:1:0:0");
        assert_eq!(s.meta.unit, "Percent of GDP");
        assert_eq!(s.meta.frequency, Frequency::Quarterly);
        assert_eq!(s.points[0].date.to_string(), "2023-01-01");
        assert_eq!(s.points[0].value, Some(160.5));
        assert_eq!(s.points[1].date.to_string(), "2023-04-01");
    }
}

#[tokio::test]
async fn all_unsupported_countries_fail_without_any_http_call() {
    // No mock server routes: any HTTP call would error differently.
    let adapter = BisAdapter::new().with_base_url("http://127.0.0.1:9");
    let req = FetchRequest {
        indicator: "policy rate".into(),
        countries: vec!["ZW".into()],
        ..FetchRequest::default()
    };
    let err = adapter.fetch(&req).await.unwrap_err();
    match err {
        FedError::DataNotAvailable { message, suggestions, .. } => {
            assert!(message.contains("ZW"));
            assert!(suggestions[0].contains("WorldBank"));
        }
        other => panic!("expected DataNotAvailable, got {other:?}"),
    }
}

#[tokio::test]
async fn mixed_support_skips_the_uncovered_country() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/data/WS_CBPOL/M.US");
            then.status(200).json_body(json!({
                "data": {
                    "dataSets": [{
                        "series": {"0:0": {"observations": {"0": [5.25], "1": [5.5]}}}
                    }],
                    "structure": {
                        "dimensions": {
                            "series": [
                                {"id": "FREQ", "values": [{"id": "M"}]},
                                {"id": "REF_AREA", "values": [{"id": "US"}]}
                            ],
                            "observation": [
                                {"id": "TIME_PERIOD", "values": [{"id": "2023-06"}, {"id": "2023-07"}]}
                            ]
                        }
                    }
                }
            }));
        })
        .await;

    let adapter = BisAdapter::new().with_base_url(server.base_url());
    let req = FetchRequest {
        indicator: "policy rate".into(),
        countries: vec!["US".into(), "ZW".into()],
        ..FetchRequest::default()
    };
    let series = adapter.fetch(&req).await.unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].meta.frequency, Frequency::Monthly);
    assert_eq!(series[0].points[0].date.to_string(), "2023-06-01");
}
