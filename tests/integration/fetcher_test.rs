//! Fetcher loop against a local stand-in for the upstream API

use crate::common::{spawn_upstream, upstream_config, LogBuffer, SCENARIO_BODY};
use axum::http::StatusCode;
use kline_relay::fetcher::Fetcher;
use kline_relay::hub::BroadcastHub;
use kline_relay::kline::{BinanceKlineClient, FetchError, KlineSource, CANDLE_FIELDS};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn fetcher(base_url: &str, hub: Arc<BroadcastHub>) -> Fetcher {
    let client = BinanceKlineClient::new(upstream_config(base_url)).unwrap();
    Fetcher::new(Arc::new(client), hub, Duration::from_secs(60))
}

#[tokio::test]
async fn test_scenario_record_truncated_and_stored() {
    let (base_url, upstream) = spawn_upstream(StatusCode::OK, SCENARIO_BODY).await;
    let hub = Arc::new(BroadcastHub::default());

    let count = fetcher(&base_url, hub.clone()).run_cycle().await.unwrap();
    assert_eq!(count, 1);

    let latest = hub.latest().await.unwrap();
    assert_eq!(
        serde_json::to_value(&*latest).unwrap(),
        json!([[1620000000000i64, "100.0", "101.0", "99.5", "100.5"]])
    );

    let queries = upstream.lock().unwrap().queries.clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["symbol"], "BTCUSDC");
    assert_eq!(queries[0]["interval"], "1m");
    assert_eq!(queries[0]["limit"], "250");
}

#[tokio::test]
async fn test_every_record_has_five_fields_in_order() {
    let body = json!([
        [1620000000000i64, "1.0", "2.0", "0.5", "1.5", "9", 1620000059999i64, "9", 1, "9", "9", "0"],
        [1620000060000i64, "1.5", "2.5", "1.0", "2.0", "9", 1620000119999i64, "9", 1, "9", "9", "0"],
        [1620000120000i64, "2.0", "3.0", "1.5", "2.5", "9", 1620000179999i64, "9", 1, "9", "9", "0"]
    ])
    .to_string();
    let (base_url, _upstream) = spawn_upstream(StatusCode::OK, &body).await;
    let hub = Arc::new(BroadcastHub::default());

    fetcher(&base_url, hub.clone()).run_cycle().await.unwrap();

    let wire = serde_json::to_value(&*hub.latest().await.unwrap()).unwrap();
    let records = wire.as_array().unwrap();
    assert_eq!(records.len(), 3);
    for (i, record) in records.iter().enumerate() {
        let fields = record.as_array().unwrap();
        assert_eq!(fields.len(), CANDLE_FIELDS);
        assert_eq!(fields[0], json!(1620000000000i64 + i as i64 * 60_000));
    }
}

#[tokio::test]
async fn test_http_500_is_network_and_keeps_snapshot() {
    let (base_url, upstream) = spawn_upstream(StatusCode::OK, SCENARIO_BODY).await;
    let hub = Arc::new(BroadcastHub::default());
    let f = fetcher(&base_url, hub.clone());

    f.run_cycle().await.unwrap();
    let before = hub.latest().await.unwrap();

    {
        let mut upstream = upstream.lock().unwrap();
        upstream.status = StatusCode::INTERNAL_SERVER_ERROR;
        upstream.body = "internal error".to_string();
    }

    let err = f.run_cycle().await.unwrap_err();
    assert!(matches!(err, FetchError::Network(_)));
    assert_eq!(err.category(), "network");
    assert_eq!(hub.latest().await.unwrap(), before);
}

#[tokio::test]
async fn test_http_500_logs_single_network_error() {
    let logs = LogBuffer::default();
    let _guard = logs.install();

    let (base_url, _upstream) =
        spawn_upstream(StatusCode::INTERNAL_SERVER_ERROR, "internal error").await;
    let f = fetcher(&base_url, Arc::new(BroadcastHub::default()));

    f.run_cycle().await.unwrap_err();

    let errors = logs.error_lines();
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].contains("category=\"network\""), "{}", errors[0]);
    assert!(errors[0].contains("Kline fetch failed"));
}

#[tokio::test]
async fn test_malformed_body_logs_single_parse_error() {
    let logs = LogBuffer::default();
    let _guard = logs.install();

    let (base_url, _upstream) = spawn_upstream(StatusCode::OK, "[[1620000000000,").await;
    let f = fetcher(&base_url, Arc::new(BroadcastHub::default()));

    f.run_cycle().await.unwrap_err();

    let errors = logs.error_lines();
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].contains("category=\"parse\""), "{}", errors[0]);
}

#[tokio::test]
async fn test_malformed_json_is_parse_error() {
    let (base_url, _upstream) = spawn_upstream(StatusCode::OK, "[[1620000000000,\"1\"").await;
    let hub = Arc::new(BroadcastHub::default());

    let err = fetcher(&base_url, hub.clone()).run_cycle().await.unwrap_err();
    assert_eq!(err.category(), "parse");
    assert!(hub.latest().await.is_none());
}

#[tokio::test]
async fn test_upstream_error_object_is_parse_error() {
    let (base_url, _upstream) =
        spawn_upstream(StatusCode::OK, r#"{"code":-1121,"msg":"Invalid symbol."}"#).await;
    let client = BinanceKlineClient::new(upstream_config(&base_url)).unwrap();

    let err = client.fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}

#[tokio::test]
async fn test_slow_upstream_hits_timeout() {
    let (base_url, upstream) = spawn_upstream(StatusCode::OK, SCENARIO_BODY).await;
    upstream.lock().unwrap().delay = Duration::from_secs(3);

    let mut config = upstream_config(&base_url);
    config.timeout_secs = 1;
    let client = BinanceKlineClient::new(config).unwrap();

    let err = client.fetch().await.unwrap_err();
    assert_eq!(err.category(), "network");
}

#[tokio::test]
async fn test_custom_query_parameters() {
    let (base_url, upstream) = spawn_upstream(StatusCode::OK, "[]").await;
    let mut config = upstream_config(&base_url);
    config.symbol = "ETHUSDC".to_string();
    config.interval = "5m".to_string();
    config.limit = 10;

    let snapshot = BinanceKlineClient::new(config)
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert!(snapshot.is_empty());

    let query = upstream.lock().unwrap().queries[0].clone();
    assert_eq!(query["symbol"], "ETHUSDC");
    assert_eq!(query["interval"], "5m");
    assert_eq!(query["limit"], "10");
}
