mod support;

use std::sync::Arc;

use anyhow::Result;
use avgx::clock::ManualClock;
use avgx::rates::{AssetClass, RateError, RateOrigin};
use avgx::AvgxServiceBuilder;
use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{
    config_for, mount_crypto, mount_fiat, requests_to, write_documents, BASELINE, CRYPTO_ASSETS,
    FIAT_ASSETS,
};

const FIAT_BODY: &str = r#"{"base": "USD", "rates": {"USD": 1, "EUR": 0.9}}"#;
const CRYPTO_BODY: &str = r#"{"bitcoin": {"usd": 60000}, "ethereum": {"usd": 3000}}"#;

fn start_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
    ))
}

#[tokio::test]
async fn partial_fetch_fills_gaps_and_reports_missing() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path(), FIAT_ASSETS, CRYPTO_ASSETS, "{}")?;
    let server = MockServer::start().await;
    mount_fiat(&server, FIAT_BODY).await;
    mount_crypto(&server, CRYPTO_BODY).await;

    let service = AvgxServiceBuilder::new(config_for(dir.path(), &server))
        .with_clock(start_clock())
        .build();

    let rates = service.fiat_rates_with_weights().await;
    let origins: Vec<(&str, RateOrigin)> = rates.iter().map(|a| (a.code(), a.origin)).collect();
    assert_eq!(
        origins,
        vec![
            ("USD", RateOrigin::Live),
            ("EUR", RateOrigin::Live),
            ("XYZ", RateOrigin::Default),
        ]
    );
    assert_eq!(service.missing_currencies(), vec!["XYZ".to_string()]);
    assert!(service.missing_cryptos().is_empty());

    let fiat_average = service.weighted_fiat_average().await?;
    let expected_fiat = (1.0 + 1.0 / 0.9 + 1.0) / 3.0;
    assert!((fiat_average - expected_fiat).abs() < 1e-9);

    let crypto_average = service.weighted_crypto_average().await?;
    assert!((crypto_average - 17250.0).abs() < 1e-9);

    let index = service.current_index().await?;
    assert!((index.value - (0.5 * expected_fiat + 0.5 * 17250.0)).abs() < 1e-9);
    assert_eq!(index.change_24h_pct, None);

    Ok(())
}

#[tokio::test]
async fn total_provider_failure_falls_back_to_baseline() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path(), FIAT_ASSETS, CRYPTO_ASSETS, BASELINE)?;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let service = AvgxServiceBuilder::new(config_for(dir.path(), &server))
        .with_clock(start_clock())
        .build();

    let index = service.current_index().await?;
    assert!(index.value.is_finite());

    let fiat = service.fiat_cache().peek().expect("fiat snapshot");
    assert_eq!(fiat.used_baseline, vec!["EUR".to_string()]);
    assert_eq!(fiat.missing, vec!["XYZ".to_string()]);
    assert_eq!(fiat.get("USD").map(|a| a.origin), Some(RateOrigin::Live));

    let crypto = service.crypto_cache().peek().expect("crypto snapshot");
    assert_eq!(crypto.used_baseline, vec!["BTC".to_string(), "ETH".to_string()]);
    assert!((index.crypto_average - (50000.0 + 3.0 * 2000.0) / 4.0).abs() < 1e-9);

    assert_eq!(requests_to(&server, "/latest.json").await, 3);
    assert_eq!(requests_to(&server, "/simple/price").await, 3);

    Ok(())
}

#[tokio::test]
async fn cache_serves_within_ttl_and_refreshes_once_after() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path(), FIAT_ASSETS, CRYPTO_ASSETS, BASELINE)?;
    let server = MockServer::start().await;
    mount_fiat(&server, FIAT_BODY).await;
    mount_crypto(&server, CRYPTO_BODY).await;

    let clock = start_clock();
    let service = AvgxServiceBuilder::new(config_for(dir.path(), &server))
        .with_clock(clock.clone())
        .build();

    service.current_index().await?;
    service.weighted_fiat_average().await?;
    clock.advance(Duration::seconds(30));
    service.current_index().await?;
    assert_eq!(requests_to(&server, "/latest.json").await, 1);
    assert_eq!(requests_to(&server, "/simple/price").await, 1);

    clock.advance(Duration::seconds(31));
    let (a, b) = tokio::join!(service.current_index(), service.current_index());
    a?;
    b?;
    assert_eq!(requests_to(&server, "/latest.json").await, 2);
    assert_eq!(requests_to(&server, "/simple/price").await, 2);

    // Both calls fell on the same snapshot timestamp.
    assert_eq!(service.history().len(), 2);

    Ok(())
}

#[tokio::test]
async fn convert_routes_through_usd_and_index() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path(), FIAT_ASSETS, CRYPTO_ASSETS, BASELINE)?;
    let server = MockServer::start().await;
    mount_fiat(&server, FIAT_BODY).await;
    mount_crypto(&server, CRYPTO_BODY).await;

    let service = AvgxServiceBuilder::new(config_for(dir.path(), &server))
        .with_clock(start_clock())
        .build();

    // Converting before any index read leaves the history empty.
    let first = service.convert(1.0, "AVGX", "USD").await?;
    assert!(service.history().is_empty());

    let index = service.current_index().await?;
    assert!((first - index.value).abs() < 1e-9);
    let recorded = service.history();
    let avgx_in_usd = service.convert(1.0, "avgx", "USD").await?;
    assert!((avgx_in_usd - index.value).abs() < 1e-9);
    let usd_in_avgx = service.convert(index.value, "USD", "AVGX").await?;
    assert!((usd_in_avgx - 1.0).abs() < 1e-12);
    // Conversions leave the history alone.
    assert_eq!(service.history(), recorded);

    let eur_in_usd = service.convert(9.0, "EUR", "USD").await?;
    assert!((eur_in_usd - 10.0).abs() < 1e-9);

    let btc = service.convert(120000.0, "USD", "BTC").await?;
    assert!((btc - 2.0).abs() < 1e-12);

    let err = service.convert(1.0, "USD", "DOGE").await.unwrap_err();
    assert!(matches!(err, RateError::UnknownCode(code) if code == "DOGE"));

    Ok(())
}

#[tokio::test]
async fn change_24h_compares_against_seeded_baseline_value() -> Result<()> {
    let dir = TempDir::new()?;
    let baseline = r#"{
        "as_of": "2026-09-30T00:00:00Z",
        "fiat": {"EUR": 0.95},
        "crypto": {"BTC": 50000, "ETH": 2000},
        "avgx_value": 8000.0
    }"#;
    write_documents(dir.path(), FIAT_ASSETS, CRYPTO_ASSETS, baseline)?;
    let server = MockServer::start().await;
    mount_fiat(&server, FIAT_BODY).await;
    mount_crypto(&server, CRYPTO_BODY).await;

    let service = AvgxServiceBuilder::new(config_for(dir.path(), &server))
        .with_clock(start_clock())
        .build();

    assert_eq!(service.history().len(), 1);
    let index = service.current_index().await?;
    let change = index.change_24h_pct.expect("seeded point is older than 24h");
    assert!((change - (index.value - 8000.0) / 8000.0 * 100.0).abs() < 1e-9);
    assert_eq!(service.history().len(), 2);

    Ok(())
}

#[tokio::test]
async fn empty_basket_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path(), "[]", CRYPTO_ASSETS, BASELINE)?;
    let server = MockServer::start().await;
    mount_crypto(&server, CRYPTO_BODY).await;

    let service = AvgxServiceBuilder::new(config_for(dir.path(), &server))
        .with_clock(start_clock())
        .build();

    let err = service.current_index().await.unwrap_err();
    assert!(matches!(err, RateError::EmptyBasket(AssetClass::Fiat)));
    assert!(service.weighted_crypto_average().await.is_ok());

    Ok(())
}

#[tokio::test]
async fn zero_total_weight_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let crypto = r#"[
        {"code": "BTC", "display_name": "Bitcoin", "weight": 0},
        {"code": "ETH", "display_name": "Ethereum", "weight": 0}
    ]"#;
    write_documents(dir.path(), FIAT_ASSETS, crypto, BASELINE)?;
    let server = MockServer::start().await;
    mount_fiat(&server, FIAT_BODY).await;
    mount_crypto(&server, CRYPTO_BODY).await;

    let service = AvgxServiceBuilder::new(config_for(dir.path(), &server))
        .with_clock(start_clock())
        .build();

    let err = service.weighted_crypto_average().await.unwrap_err();
    assert!(matches!(err, RateError::ZeroWeight(AssetClass::Crypto)));

    Ok(())
}

#[tokio::test]
async fn offline_service_never_contacts_providers() -> Result<()> {
    let dir = TempDir::new()?;
    write_documents(dir.path(), FIAT_ASSETS, CRYPTO_ASSETS, BASELINE)?;
    let server = MockServer::start().await;

    let service = AvgxServiceBuilder::new(config_for(dir.path(), &server))
        .offline_only()
        .with_clock(start_clock())
        .build();

    service.refresh_all().await;
    let status = service.status();
    assert_eq!(status.fiat.assets, 3);
    assert_eq!(status.fiat.used_baseline, vec!["EUR".to_string()]);
    assert_eq!(status.crypto.used_baseline.len(), 2);
    assert!(!status.fiat.stale);

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());

    Ok(())
}
