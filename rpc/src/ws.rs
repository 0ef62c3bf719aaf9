//! WebSocket push feed of ledger events.
//!
//! Clients connect to `/events/ws?from=N` and receive every logged event with
//! sequence `>= N` as one JSON text frame each, first the backlog and then
//! live events. A client that reconnects with `from` set to one past the last
//! sequence it saw misses nothing.

use crate::server::RpcState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use fundrelay_ledger::LoggedEvent;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub from: Option<u64>,
}

pub async fn events_ws(
    ws: WebSocketUpgrade,
    State(state): State<RpcState>,
    Query(query): Query<FeedQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    ws.on_upgrade(move |socket| handle_socket(socket, state, from))
}

async fn handle_socket(socket: WebSocket, state: RpcState, from: u64) {
    let (mut sender, mut receiver) = socket.split();
    let (backlog, mut rx) = state.chain.subscribe_from(from).await;
    let mut next = from;

    tracing::debug!(from, backlog = backlog.len(), "event feed client connected");

    for event in backlog {
        if !send_event(&mut sender, &event).await {
            return;
        }
        next = event.sequence + 1;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "event feed receive error");
                    break;
                }
                Some(Ok(_)) => {}
            },
            live = rx.recv() => match live {
                Ok(event) => {
                    if event.sequence < next {
                        continue;
                    }
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                    next = event.sequence + 1;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, next, "event feed client lagged, replaying from log");
                    let missed = state
                        .chain
                        .read(|c| c.events().range(next, usize::MAX).to_vec())
                        .await;
                    for event in missed {
                        if !send_event(&mut sender, &event).await {
                            return;
                        }
                        next = event.sequence + 1;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    tracing::debug!(next, "event feed client disconnected");
}

/// Returns false once the client is gone.
async fn send_event<S>(sender: &mut S, event: &LoggedEvent) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    match serde_json::to_string(event) {
        Ok(text) => sender.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, sequence = event.sequence, "failed to encode event");
            false
        }
    }
}
