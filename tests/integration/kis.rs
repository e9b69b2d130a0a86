//! Integration tests for the KIS client against a mock server

use std::path::PathBuf;
use std::time::Duration;

use backon::ExponentialBuilder;
use chrono::NaiveDate;
use serde_json::{json, Value};
use stockpulse::config::KisConfig;
use stockpulse::models::ticker::Exchange;
use stockpulse::services::kis::KisClient;
use tokio_test::assert_ok;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DAILY_PATH: &str = "/uapi/overseas-price/v1/quotations/dailyprice";

fn token_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("stockpulse-test-{}", std::process::id()))
        .join(format!("{}.json", name))
}

fn client(server: &MockServer, name: &str) -> KisClient {
    let token_path = token_path(name);
    let _ = std::fs::remove_file(&token_path);

    KisClient::new(&KisConfig {
        base_url: server.uri(),
        app_key: "test-key".to_string(),
        app_secret: "test-secret".to_string(),
        rate_limit: Duration::from_millis(1),
        token_path,
    })
    .expect("client")
    .with_backoff(
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(1))
            .with_max_times(2),
    )
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth2/tokenP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc123",
            "access_token_token_expired": "2099-12-31 23:59:59",
            "token_type": "Bearer",
            "expires_in": 86400
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn rows(dates: &[&str]) -> Value {
    let rows: Vec<Value> = dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            json!({
                "xymd": date,
                "clos": format!("{}.00", 150 - i),
                "open": "149.50",
                "high": "151.25",
                "low": "148.75",
                "tvol": "1,000,000"
            })
        })
        .collect();
    json!({ "rt_cd": "0", "msg_cd": "MCA00000", "msg1": "OK", "output1": {}, "output2": rows })
}

#[tokio::test]
async fn daily_candles_sends_auth_headers() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(DAILY_PATH))
        .and(header("authorization", "Bearer abc123"))
        .and(header("appkey", "test-key"))
        .and(header("appsecret", "test-secret"))
        .and(header("tr_id", "HHDFS76240000"))
        .and(header("custtype", "P"))
        .and(query_param("EXCD", "NYS"))
        .and(query_param("SYMB", "IBM"))
        .and(query_param("GUBN", "0"))
        .and(query_param("MODP", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(&[
            "20240105", "20240104", "20240103",
        ])))
        .mount(&server)
        .await;

    let kis = client(&server, "headers");
    let candles = kis.daily_candles("ibm", Exchange::Nys, 2).await.unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].time, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    assert_eq!(candles[0].close, 150.0);
    assert_eq!(candles[0].volume, 1_000_000);
}

#[tokio::test]
async fn token_is_requested_once_and_cached_on_disk() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(DAILY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(&["20240105"])))
        .mount(&server)
        .await;

    let kis = client(&server, "cached");
    kis.daily_candles("AAPL", Exchange::Nas, 30).await.unwrap();
    kis.daily_candles("MSFT", Exchange::Nas, 30).await.unwrap();

    let status = kis.tokens().status().await;
    assert!(status.valid);
    assert_eq!(status.expires_at.as_deref(), Some("2099-12-31 23:59:59"));
    assert!(token_path("cached").exists());
}

#[tokio::test]
async fn year_fetch_pages_backwards_and_dedupes() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(DAILY_PATH))
        .and(query_param("BYMD", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(&[
            "20240110", "20240109", "20240108", "20240107", "20240106",
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DAILY_PATH))
        .and(query_param("BYMD", "20240106"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(&[
            "20240106", "20240105", "20240104", "20240103", "20240102",
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DAILY_PATH))
        .and(query_param("BYMD", "20240102"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let kis = client(&server, "paging");
    let candles = kis.daily_candles_year("AAPL", Exchange::Nas, 365).await.unwrap();

    assert_eq!(candles.len(), 9);
    assert_eq!(candles[0].time, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    assert_eq!(candles[8].time, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
}

#[tokio::test]
async fn year_fetch_stops_at_max_days() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(DAILY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows(&[
            "20240110", "20240109", "20240108", "20240107", "20240106",
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let kis = client(&server, "max-days");
    let candles = kis.daily_candles_year("AAPL", Exchange::Nas, 3).await.unwrap();
    assert_eq!(candles.len(), 3);
}

#[tokio::test]
async fn client_error_yields_empty_list() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(DAILY_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad symbol"))
        .expect(1)
        .mount(&server)
        .await;

    let kis = client(&server, "client-error");
    let candles = assert_ok!(kis.daily_candles("NOPE", Exchange::Nas, 30).await);
    assert!(candles.is_empty());
}

#[tokio::test]
async fn server_errors_are_retried_then_give_up() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(DAILY_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let kis = client(&server, "retry");
    let candles = assert_ok!(kis.daily_candles("AAPL", Exchange::Nas, 30).await);
    assert!(candles.is_empty());
}

#[tokio::test]
async fn malformed_fields_are_zeroed() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path(DAILY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output2": [
                { "xymd": "20240105", "clos": "", "open": "1", "high": "2", "low": "0.5", "tvol": "10" },
                { "xymd": "", "clos": "5", "open": "1", "high": "2", "low": "0.5", "tvol": "10" }
            ]
        })))
        .mount(&server)
        .await;

    let kis = client(&server, "malformed");
    let candles = kis.daily_candles("AAPL", Exchange::Nas, 30).await.unwrap();
    assert_eq!(candles.len(), 1);
    assert_eq!(candles[0].close, 0.0);
}

#[tokio::test]
async fn price_parses_latest_quote() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/uapi/overseas-price/v1/quotations/price"))
        .and(header("tr_id", "HHDFS00000300"))
        .and(query_param("SYMB", "AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output": {
                "last": "189.25",
                "base": "187.00",
                "diff": "2.25",
                "rate": "1.20",
                "tvol": "52,000,000"
            }
        })))
        .mount(&server)
        .await;

    let kis = client(&server, "quote");
    let quote = assert_ok!(kis.price("aapl", Exchange::Nas).await).expect("quote");

    assert_eq!(quote.last, 189.25);
    assert_eq!(quote.previous_close, 187.0);
    assert_eq!(quote.volume, 52_000_000);
}

#[tokio::test]
async fn price_without_last_is_none() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/uapi/overseas-price/v1/quotations/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "0",
            "output": { "last": "", "base": "" }
        })))
        .mount(&server)
        .await;

    let kis = client(&server, "quote-empty");
    assert!(assert_ok!(kis.price("ZZZZ", Exchange::Ams).await).is_none());
}

#[tokio::test]
async fn refresh_bypasses_cached_token() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;

    let kis = client(&server, "refresh");
    assert_eq!(assert_ok!(kis.tokens().get_token().await), "abc123");
    assert_eq!(assert_ok!(kis.tokens().get_token().await), "abc123");
    assert_eq!(assert_ok!(kis.tokens().refresh_token().await), "abc123");
}

#[tokio::test]
async fn token_grant_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/tokenP"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let kis = client(&server, "denied");
    let status = kis.tokens().status().await;
    assert!(!status.valid);
    tokio_test::assert_err!(kis.tokens().get_token().await);
}
