use crate::infra::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Extension;
use futures::{SinkExt, StreamExt};
use incident_watch::workflows::reports::ReportNotification;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};

/// Upgrade to a websocket that receives every report notification published from now on.
pub(crate) async fn stream_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    let notifications = state.notifier.subscribe();
    ws.on_upgrade(move |socket| forward_notifications(socket, notifications))
}

async fn forward_notifications(
    socket: WebSocket,
    mut notifications: broadcast::Receiver<ReportNotification>,
) {
    let (mut sender, mut receiver) = socket.split();
    info!("stream listener connected");

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "stream socket error");
                    break;
                }
            },
            event = notifications.recv() => match event {
                Ok(notification) => {
                    let frame = match notification_frame(&notification) {
                        Ok(frame) => frame,
                        Err(err) => {
                            error!(error = %err, "unable to encode notification");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "stream listener lagged, notifications dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("stream listener disconnected");
}

/// `{"event": <name>, "data": <report snapshot>}`
pub(crate) fn notification_frame(
    notification: &ReportNotification,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(notification)
}
