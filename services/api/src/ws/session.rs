//! Manages the WebSocket connection lifecycle for one viewer on `/anim`.

use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a viewer WebSocket.
pub async fn anim_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_viewer(socket, state))
}

/// Pushes every published batch to the viewer until either side goes away.
///
/// Messages sent by the viewer are read only to notice a close; their
/// content is ignored.
#[instrument(name = "anim_viewer", skip_all, fields(viewer_id))]
async fn handle_viewer(socket: WebSocket, state: Arc<AppState>) {
    let mut subscription = match state.fanout.join() {
        Ok(subscription) => subscription,
        Err(e) => {
            error!(error = %e, "Could not register viewer");
            return;
        }
    };
    tracing::Span::current().record("viewer_id", &subscription.id().to_string());
    info!("Viewer connected");

    let (mut socket_tx, mut socket_rx) = socket.split();

    loop {
        tokio::select! {
            batch = subscription.recv() => {
                let Some(batch) = batch else { break };
                if let Err(e) = send_text(&mut socket_tx, &batch).await {
                    warn!(error = %e, "Failed to push batch to viewer");
                    break;
                }
            },
            incoming = socket_rx.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => debug!("Ignoring message from viewer"),
                Some(Err(e)) => {
                    warn!(error = %e, "Viewer socket error");
                    break;
                }
            },
        }
    }

    info!("Viewer disconnected");
}

/// A helper function to send one serialized batch to the viewer.
async fn send_text(socket_tx: &mut SplitSink<WebSocket, Message>, text: &str) -> Result<()> {
    socket_tx.send(Message::Text(text.into())).await?;
    Ok(())
}
