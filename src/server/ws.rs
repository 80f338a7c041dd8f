//! WebSocket push channel
//!
//! Each connection is one hub subscriber: registered on upgrade, removed when
//! the socket closes or errors. Clients that go quiet past the idle timeout,
//! or stop reading for that long, are dropped as well.

use super::AppState;
use crate::hub::{SubscriberId, Subscription};
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

/// WebSocket upgrade handler
pub(super) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection until it ends, then unregister it
async fn handle_socket(socket: WebSocket, state: AppState) {
    let Subscription { id, mut events } = state.hub.connect().await;
    let (mut sender, mut receiver) = socket.split();

    let keepalive = state.keepalive;
    let mut ping = interval_at(Instant::now() + keepalive.ping_interval, keepalive.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::debug!(subscriber = %id, "Hub dropped subscriber");
                    break;
                };
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(subscriber = %id, error = %e, "Failed to encode event");
                        continue;
                    }
                };
                if !send_within(&mut sender, id, Message::Text(text.into()), keepalive.idle_timeout).await {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => last_seen = Instant::now(),
                    Some(Err(e)) => {
                        tracing::debug!(subscriber = %id, error = %e, "Receive failed, closing");
                        break;
                    }
                }
            }

            _ = ping.tick() => {
                if last_seen.elapsed() >= keepalive.idle_timeout {
                    tracing::warn!(subscriber = %id, "Client idle timeout");
                    break;
                }
                if !send_within(&mut sender, id, Message::Ping(Bytes::new()), keepalive.idle_timeout).await {
                    break;
                }
            }
        }
    }

    state.hub.disconnect(id).await;
}

/// Send one frame, giving up when the client stops draining its socket
///
/// Returns `false` when the connection should be closed.
async fn send_within(
    sender: &mut SplitSink<WebSocket, Message>,
    id: SubscriberId,
    msg: Message,
    limit: Duration,
) -> bool {
    match timeout(limit, sender.send(msg)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(subscriber = %id, error = %e, "Send failed, closing");
            false
        }
        Err(_) => {
            tracing::warn!(subscriber = %id, limit_secs = limit.as_secs(), "Send stalled, closing");
            false
        }
    }
}
