use crate::api::rest::AppState;
use crate::messaging::NotificationBus;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Upgrade a dashboard session to a live alert feed. The session receives
/// every ledger event as a JSON snapshot envelope until it disconnects.
pub async fn alerts_subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let bus = state.bus.clone();
    ws.on_upgrade(move |socket| handle_dashboard_socket(socket, bus))
}

async fn handle_dashboard_socket(socket: WebSocket, bus: Arc<NotificationBus>) {
    let mut subscription = bus.subscribe();
    let (mut sink, mut stream) = socket.split();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

    info!("Dashboard session connected ({} live)", bus.subscriber_count());

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize event for dashboard: {}", e),
                }
            }
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(other)) => debug!("Ignoring dashboard message: {:?}", other),
                }
            }
            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    // Dropping the subscription unsubscribes this session from the bus
    info!("Dashboard session disconnected");
}
