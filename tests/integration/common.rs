//! Shared helpers: a stand-in upstream klines API and a relay server

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use futures_util::StreamExt;
use kline_relay::config::UpstreamConfig;
use kline_relay::hub::{BroadcastHub, PushEvent};
use kline_relay::server::{router, AppState, Keepalive};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upstream kline record as Binance sends it (12 fields)
pub const SCENARIO_BODY: &str = r#"[[1620000000000,"100.0","101.0","99.5","100.5","12.5",1620000059999,"1250.0",42,"6.0","600.0","0"]]"#;

/// Programmable upstream response plus a log of received query strings
#[derive(Debug)]
pub struct Upstream {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
    pub queries: Vec<HashMap<String, String>>,
}

pub type SharedUpstream = Arc<Mutex<Upstream>>;

async fn klines(
    State(upstream): State<SharedUpstream>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let (status, body, delay) = {
        let mut upstream = upstream.lock().unwrap();
        upstream.queries.push(query);
        (upstream.status, upstream.body.clone(), upstream.delay)
    };
    tokio::time::sleep(delay).await;
    (status, body)
}

/// Start a fake `/api/v3/klines` endpoint; returns its base URL
pub async fn spawn_upstream(status: StatusCode, body: &str) -> (String, SharedUpstream) {
    let upstream = Arc::new(Mutex::new(Upstream {
        status,
        body: body.to_string(),
        delay: Duration::ZERO,
        queries: Vec::new(),
    }));

    let app = Router::new()
        .route("/api/v3/klines", get(klines))
        .with_state(upstream.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), upstream)
}

pub fn upstream_config(base_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..Default::default()
    }
}

/// Start the relay's HTTP/WebSocket server on an ephemeral port
pub async fn spawn_relay(hub: Arc<BroadcastHub>) -> SocketAddr {
    spawn_relay_with(hub, Keepalive::default()).await
}

pub async fn spawn_relay_with(hub: Arc<BroadcastHub>, keepalive: Keepalive) -> SocketAddr {
    let state = AppState { hub, keepalive };
    let app = router(state, "http://127.0.0.1").unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn connect_client(addr: SocketAddr) -> WsClient {
    let (ws, _response) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();
    ws
}

/// Next text frame, decoded; panics after 5s
pub async fn next_event(ws: &mut WsClient) -> (serde_json::Value, PushEvent) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                    let event: PushEvent = serde_json::from_str(&text).unwrap();
                    return (value, event);
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Assert no text frame arrives within `window`
pub async fn expect_silence(ws: &mut WsClient, window: Duration) {
    let result = tokio::time::timeout(window, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    })
    .await;

    if let Ok(text) = result {
        panic!("expected no event, got {}", text);
    }
}

/// Formatted log output collected from a scoped subscriber
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    /// Install as the default subscriber for the current thread
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Drain the buffer, keeping ERROR lines only
    pub fn error_lines(&self) -> Vec<String> {
        let bytes = std::mem::take(&mut *self.0.lock().unwrap());
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter(|line| line.contains(" ERROR "))
            .map(str::to_string)
            .collect()
    }
}

/// Wait until the hub has exactly `n` subscribers
pub async fn wait_for_subscribers(hub: &BroadcastHub, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while hub.subscriber_count().await != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("hub never reached {} subscribers", n));
}
