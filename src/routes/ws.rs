use std::time::Duration;

use axum::{
    extract::{ws::{WebSocket, WebSocketUpgrade}, Extension},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::time;
use tracing::{debug, info};

use crate::{
    state::SharedHub,
    sync::{
        broadcast,
        heartbeat::{self, Exit, Heartbeat},
    },
};

/// How long a cleanly closed session may spend flushing queued frames.
const WRITER_GRACE: Duration = Duration::from_secs(2);

pub fn router() -> Router {
    Router::new().route("/socket", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(hub): Extension<SharedHub>,
    Extension(beat): Extension<Heartbeat>,
) -> impl IntoResponse {
    ws.on_upgrade(move |s| session(s, hub, beat))
}

/* ---------------- per connection ---------------- */
async fn session(sock: WebSocket, hub: SharedHub, beat: Heartbeat) {
    let (mut sink, stream) = sock.split();
    let (tx, mut rx) = broadcast::outbox();
    let conn = hub.lock().await.connect(tx.clone());
    info!(%conn, "connected");

    /* writer: the only place that touches the sink */
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sink.send(msg).await {
                debug!(%conn, error = %e, "socket write failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let exit = heartbeat::supervise(hub, conn, tx, stream, beat).await;
    info!(%conn, ?exit, "disconnected");

    // a dead peer may never drain its buffer; a closing one gets a bounded flush
    let grace = match exit {
        Exit::Closed => WRITER_GRACE,
        Exit::Unresponsive | Exit::Failed => Duration::ZERO,
    };
    if time::timeout(grace, &mut writer).await.is_err() {
        debug!(%conn, "writer still busy, aborting");
        writer.abort();
    }
}
