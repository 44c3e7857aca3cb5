#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use avgx::config::{Config, ResolvedConfig};
use avgx::rates::RetryPolicy;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const FIAT_ASSETS: &str = r#"[
    {"code": "USD", "display_name": "US Dollar", "weight": 1},
    {"code": "EUR", "display_name": "Euro", "weight": 1},
    {"code": "XYZ", "display_name": "Unlisted", "weight": 1}
]"#;

pub const CRYPTO_ASSETS: &str = r#"[
    {"code": "BTC", "display_name": "Bitcoin", "weight": 1},
    {"code": "ETH", "display_name": "Ethereum", "weight": 3}
]"#;

pub const BASELINE: &str = r#"{
    "fiat": {"EUR": 0.95},
    "crypto": {"BTC": 50000, "ETH": 2000}
}"#;

/// Writes the three documents into `dir/data`.
pub fn write_documents(dir: &Path, fiat: &str, crypto: &str, baseline: &str) -> Result<()> {
    let data = dir.join("data");
    std::fs::create_dir_all(&data)?;
    std::fs::write(data.join("fiat_assets.json"), fiat)?;
    std::fs::write(data.join("crypto_assets.json"), crypto)?;
    std::fs::write(data.join("baseline.json"), baseline)?;
    Ok(())
}

/// Default config pointed at `server` for both providers, with near-instant retries.
pub fn config_for(dir: &Path, server: &MockServer) -> ResolvedConfig {
    let mut config = Config::default();
    config.sources.fiat.base_url = server.uri();
    config.sources.fiat.api_key_env = "AVGX_TEST_UNSET_KEY".to_string();
    config.sources.crypto.base_url = server.uri();
    config.retry = RetryPolicy::new(3, Duration::from_millis(1));
    config.resolve(dir)
}

pub async fn mount_fiat(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/latest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json"))
        .mount(server)
        .await;
}

pub async fn mount_crypto(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json"))
        .mount(server)
        .await;
}

pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}
