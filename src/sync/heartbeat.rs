use std::{fmt::Display, time::Duration};

use axum::extract::ws::Message;
use futures_util::{Stream, StreamExt};
use tokio::{sync::mpsc::error::TrySendError, time};
use tracing::{debug, error, warn};

use super::{broadcast::Outbox, router, ConnId};
use crate::{error::SyncError, state::SharedHub};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Heartbeat {
    /// Silence tolerated before we ping.
    pub recv_timeout: Duration,
    /// How long a ping may go unanswered.
    pub pong_timeout: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            recv_timeout: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

/// Why a session's loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Close frame or end of stream.
    Closed,
    /// Ping went unanswered.
    Unresponsive,
    /// Transport error, or the outbox is gone.
    Failed,
}

/// Drive one connection's receive loop until it ends, then evict it.
///
/// Any inbound frame counts as proof of life, including the one that
/// arrives while we are waiting for a pong.
pub async fn supervise<S, E>(
    hub: SharedHub,
    conn: ConnId,
    outbox: Outbox,
    mut inbound: S,
    beat: Heartbeat,
) -> Exit
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let exit = loop {
        let frame = match time::timeout(beat.recv_timeout, inbound.next()).await {
            Ok(frame) => frame,
            Err(_) => {
                debug!(%conn, "receive timeout, pinging");
                match outbox.try_send(Message::Ping(Vec::new())) {
                    Ok(()) => {}
                    // silent and not draining what we already sent
                    Err(TrySendError::Full(_)) => {
                        warn!(%conn, "outbox full at ping time");
                        break Exit::Unresponsive;
                    }
                    Err(TrySendError::Closed(_)) => break Exit::Failed,
                }
                match time::timeout(beat.pong_timeout, inbound.next()).await {
                    Ok(frame) => frame,
                    Err(_) => {
                        warn!(%conn, "no pong within liveness timeout");
                        break Exit::Unresponsive;
                    }
                }
            }
        };

        match frame {
            Some(Ok(msg)) => {
                if let Some(exit) = handle(&hub, conn, msg).await {
                    break exit;
                }
            }
            Some(Err(e)) => {
                error!(%conn, error = %e, "leaving room after unhandled transport error");
                break Exit::Failed;
            }
            None => break Exit::Closed,
        }
    };

    hub.lock().await.disconnect(conn);
    exit
}

async fn handle(hub: &SharedHub, conn: ConnId, msg: Message) -> Option<Exit> {
    match msg {
        Message::Text(text) => router::route(hub, conn, &text).await,
        Message::Binary(_) => hub
            .lock()
            .await
            .report(conn, &SyncError::Protocol("improperly formed data".into())),
        Message::Ping(_) | Message::Pong(_) => {}
        Message::Close(_) => return Some(Exit::Closed),
    }
    None
}
