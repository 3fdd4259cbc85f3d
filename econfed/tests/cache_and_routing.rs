//! End-to-end cache keying, routing locks, and idempotence.

use std::sync::Arc;

use econfed::{EconFed, ParsedIntent, Provider};
use econfed_mock::{MockAdapter, fixtures};
use econfed_types::Frequency;

fn fx_series(pair: &str, value: f64) -> Vec<econfed::Series> {
    vec![fixtures::series_with(
        Provider::ExchangeRate,
        "exchange rate",
        pair,
        "United States",
        Frequency::RealTime,
        "rate",
        &[("2024-06-01", value)],
    )]
}

#[tokio::test]
async fn distinct_currency_pairs_never_share_a_cache_entry() {
    let fx = Arc::new(
        MockAdapter::new(Provider::ExchangeRate)
            .then_ok(fx_series("USD/EUR", 0.92))
            .then_ok(fx_series("USD/JPY", 151.4)),
    );
    let fed = EconFed::builder().with_adapter(fx.clone()).build().unwrap();

    let eur = fed
        .execute(&ParsedIntent::for_indicator("exchange rate", "USD to EUR"))
        .await
        .unwrap();
    let jpy = fed
        .execute(&ParsedIntent::for_indicator("exchange rate", "USD to JPY"))
        .await
        .unwrap();

    // Two upstream calls: the JPY query must not reuse the EUR entry.
    assert_eq!(fx.calls(), 2);
    assert_ne!(eur[0].points[0].value, jpy[0].points[0].value);

    // Re-running the first query is a pure cache hit.
    let eur_again = fed
        .execute(&ParsedIntent::for_indicator("exchange rate", "USD to EUR"))
        .await
        .unwrap();
    assert_eq!(fx.calls(), 2);
    assert_eq!(eur_again[0].points[0].value, eur[0].points[0].value);
}

#[tokio::test]
async fn explicit_provider_mention_locks_routing() {
    // Both adapters could serve unemployment; the user named OECD.
    let oecd = Arc::new(MockAdapter::new(Provider::Oecd).then_ok(vec![
        fixtures::annual_series(
            Provider::Oecd,
            "Unemployment rate",
            "Germany",
            "Percent",
            &[("2022-01-01", 3.1)],
        ),
    ]));
    let fred = Arc::new(MockAdapter::new(Provider::Fred));
    let fed = EconFed::builder()
        .with_adapter(oecd.clone())
        .with_adapter(fred.clone())
        .build()
        .unwrap();

    let mut intent = ParsedIntent::for_indicator(
        "unemployment rate",
        "German unemployment rate from OECD",
    );
    intent.set_param("country", "DE");
    let series = fed.execute(&intent).await.unwrap();

    assert_eq!(series[0].meta.source, Provider::Oecd);
    assert_eq!(oecd.calls(), 1);
    assert_eq!(fred.calls(), 0);
}

#[tokio::test]
async fn currency_routing_splits_on_historical_intent() {
    let fx = Arc::new(
        MockAdapter::new(Provider::ExchangeRate).then_ok(fx_series("USD/EUR", 0.92)),
    );
    let fred = Arc::new(MockAdapter::new(Provider::Fred).then_ok(vec![
        fixtures::series_with(
            Provider::Fred,
            "U.S. Dollars to Euro Spot Exchange Rate",
            "DEXUSEU",
            "United States",
            Frequency::Daily,
            "USD per EUR",
            &[("2018-01-02", 1.206), ("2018-01-03", 1.201)],
        ),
    ]));
    let fed = EconFed::builder()
        .with_adapter(fx.clone())
        .with_adapter(fred.clone())
        .build()
        .unwrap();

    // Spot query goes to ExchangeRate.
    fed.execute(&ParsedIntent::for_indicator("exchange rate", "USD to EUR"))
        .await
        .unwrap();
    assert_eq!(fx.calls(), 1);
    assert_eq!(fred.calls(), 0);

    // The same text with a start date goes to FRED's bilateral series.
    let mut historical = ParsedIntent::for_indicator("exchange rate", "USD to EUR");
    historical.set_param("startDate", "2018-01-01");
    let series = fed.execute(&historical).await.unwrap();
    assert_eq!(series[0].meta.series_id, "DEXUSEU");
    assert_eq!(fred.calls(), 1);
}

#[tokio::test]
async fn repeated_queries_are_idempotent() {
    let worldbank = Arc::new(MockAdapter::new(Provider::WorldBank).then_ok(vec![
        fixtures::annual_series(
            Provider::WorldBank,
            "GDP growth (annual %)",
            "Germany",
            "annual %",
            &[("2021-01-01", 3.2), ("2022-01-01", 1.8)],
        ),
    ]));
    let fed = EconFed::builder()
        .with_adapter(worldbank.clone())
        .build()
        .unwrap();

    let mut intent = ParsedIntent::for_indicator("GDP growth", "GDP growth of Germany and Japan");
    intent.parameters.insert(
        "countries".into(),
        serde_json::json!(["Germany", "Japan"]),
    );
    let first = fed.execute(&intent).await.unwrap();
    let second = fed.execute(&intent).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(worldbank.calls(), 1);
}
