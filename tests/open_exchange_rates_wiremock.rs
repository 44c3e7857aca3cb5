use anyhow::Result;
use avgx::rates::providers::OpenExchangeRatesSource;
use avgx::rates::{AssetConfig, RateError, RateSource};
use secrecy::SecretString;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn basket() -> Vec<AssetConfig> {
    vec![
        AssetConfig::new("USD", "US Dollar", 1.0),
        AssetConfig::new("EUR", "Euro", 1.0),
        AssetConfig::new("GBP", "Pound", 1.0),
    ]
}

#[tokio::test]
async fn fetch_sends_key_and_keeps_basket_codes() -> Result<()> {
    let server = MockServer::start().await;
    let source = OpenExchangeRatesSource::new(Some(SecretString::from("test-key".to_string())))
        .with_base_url(server.uri());

    let body = r#"{
        "base": "USD",
        "rates": {"USD": 1, "EUR": 0.92, "GBP": 0.79, "JPY": 157.1}
    }"#;

    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .and(query_param("base", "USD"))
        .and(query_param("app_id", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let rates = source.fetch(&basket()).await?;
    assert_eq!(rates.len(), 3);
    assert!((rates["EUR"] - 0.92).abs() < 1e-12);
    assert!(!rates.contains_key("JPY"));

    Ok(())
}

#[tokio::test]
async fn non_success_status_is_source_unavailable() {
    let server = MockServer::start().await;
    let source = OpenExchangeRatesSource::new(None).with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_app_id"))
        .mount(&server)
        .await;

    let err = source.fetch(&basket()).await.unwrap_err();
    match err {
        RateError::SourceUnavailable { message, .. } => assert!(message.contains("401")),
        other => panic!("expected SourceUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_rates_object_is_malformed() {
    let server = MockServer::start().await;
    let source = OpenExchangeRatesSource::new(None).with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"error": false, "base": "USD"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let err = source.fetch(&basket()).await.unwrap_err();
    assert!(matches!(err, RateError::MalformedResponse { .. }));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let server = MockServer::start().await;
    let source = OpenExchangeRatesSource::new(None).with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = source.fetch(&basket()).await.unwrap_err();
    assert!(matches!(err, RateError::MalformedResponse { .. }));
}

#[tokio::test]
async fn unreachable_host_is_source_unavailable() {
    // Port 9 (discard) on localhost is not serving HTTP.
    let source = OpenExchangeRatesSource::new(None).with_base_url("http://127.0.0.1:9");
    let err = source.fetch(&basket()).await.unwrap_err();
    assert!(matches!(err, RateError::SourceUnavailable { .. }));
}
