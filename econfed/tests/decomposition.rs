//! Decomposed and multi-indicator query behaviour.

use std::sync::Arc;
use std::time::Duration;

use econfed::{EconFed, ParsedIntent, Provider};
use econfed_mock::{MockAdapter, fixtures};
use econfed_types::Decomposition;

#[tokio::test]
async fn decomposed_results_preserve_entity_order_not_arrival_order() {
    // The first entity's fetch is slower than the second's; the output
    // must still follow the input entity order.
    let worldbank = Arc::new(
        MockAdapter::new(Provider::WorldBank)
            .then_ok(vec![fixtures::annual_series(
                Provider::WorldBank,
                "GDP (current US$)",
                "Japan",
                "USD",
                &[("2022-01-01", 4.2e12)],
            )])
            .then_ok(vec![fixtures::annual_series(
                Provider::WorldBank,
                "GDP (current US$)",
                "Germany",
                "USD",
                &[("2022-01-01", 4.0e12)],
            )])
            .with_delay(Duration::from_millis(25)),
    );
    let fed = EconFed::builder()
        .with_adapter(worldbank.clone())
        .build()
        .unwrap();

    let mut intent = ParsedIntent::for_indicator("gdp", "GDP of Japan and Germany");
    intent.decomposition = Some(Decomposition {
        kind: "by_country".into(),
        entities: vec!["Japan".into(), "Germany".into()],
    });
    let series = fed.execute(&intent).await.unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].meta.country, "Japan");
    assert_eq!(series[1].meta.country, "Germany");
    assert_eq!(worldbank.calls(), 2);
}

#[tokio::test]
async fn multi_indicator_intents_split_and_concatenate_in_order() {
    let fred = Arc::new(
        MockAdapter::new(Provider::Fred)
            .then_ok(vec![fixtures::monthly_series(
                Provider::Fred,
                "UNRATE",
                "United States",
                &[("2024-01-01", 3.7)],
            )])
            .then_ok(vec![fixtures::monthly_series(
                Provider::Fred,
                "CPIAUCSL",
                "United States",
                &[("2024-01-01", 308.4)],
            )]),
    );
    let fed = EconFed::builder().with_adapter(fred.clone()).build().unwrap();

    let mut intent =
        ParsedIntent::for_indicator("unemployment rate", "US unemployment and inflation");
    intent.indicators = vec!["unemployment rate".into(), "inflation".into()];
    intent.set_param("country", "US");
    let series = fed.execute(&intent).await.unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].meta.series_id, "UNRATE");
    assert_eq!(series[1].meta.series_id, "CPIAUCSL");
}
