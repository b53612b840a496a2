use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use super::{room::Snapshot, ConnId};

/// Frames a peer may have queued before we start dropping.
pub const OUTBOX_CAPACITY: usize = 32;

/// Per-connection outbound queue, drained by that socket's writer task.
/// One queue per peer keeps frames to the same peer in issue order.
pub type Outbox = mpsc::Sender<Message>;

pub fn outbox() -> (Outbox, mpsc::Receiver<Message>) {
    mpsc::channel(OUTBOX_CAPACITY)
}

/* ------------ outbound events ------------ */
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Event {
    Error { error: String },
    Playlist(Snapshot),
}

impl From<Snapshot> for Event {
    fn from(s: Snapshot) -> Self { Event::Playlist(s) }
}

pub enum Target<'a> {
    One(ConnId),
    Many(&'a [ConnId]),
}

struct Peer {
    outbox:  Outbox,
    dropped: AtomicU64,
}

#[derive(Default)]
pub struct Broadcaster {
    peers: HashMap<ConnId, Peer>,
}

impl Broadcaster {
    pub fn register(&mut self, conn: ConnId, outbox: Outbox) {
        self.peers.insert(conn, Peer { outbox, dropped: AtomicU64::new(0) });
    }

    pub fn unregister(&mut self, conn: ConnId) {
        self.peers.remove(&conn);
    }

    /// Serialize once, enqueue for every target. A dead or backed-up
    /// recipient is logged and skipped; nothing is reported to the caller.
    pub fn notify(&self, target: Target<'_>, event: &Event) {
        let text = match serde_json::to_string(event) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "failed to serialize event");
                return;
            }
        };
        match target {
            Target::One(conn) => self.send(conn, Message::Text(text)),
            Target::Many(conns) => {
                debug!(recipients = conns.len(), "broadcast");
                for &conn in conns {
                    self.send(conn, Message::Text(text.clone()));
                }
            }
        }
    }

    /// A full queue drops the frame: playlist events are whole snapshots,
    /// so the next one a reader does get is complete.
    fn send(&self, conn: ConnId, msg: Message) {
        let Some(peer) = self.peers.get(&conn) else {
            warn!(%conn, "no outbox for connection, dropping event");
            return;
        };
        match peer.outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let drops = peer.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(%conn, total_drops = drops, "outbox full, dropping event");
            }
            Err(TrySendError::Closed(_)) => warn!(%conn, "outbox closed, dropping event"),
        }
    }

    #[cfg(test)]
    pub fn dropped(&self, conn: ConnId) -> u64 {
        self.peers.get(&conn).map_or(0, |p| p.dropped.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn text(msg: Message) -> String {
        match msg {
            Message::Text(t) => t,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn error_event_shape() {
        let ev = Event::Error { error: "Not an admin".into() };
        assert_eq!(serde_json::to_string(&ev).unwrap(), r#"{"error":"Not an admin"}"#);
    }

    #[test]
    fn closed_recipient_does_not_stop_the_rest() {
        let mut b = Broadcaster::default();
        let (tx1, mut rx1) = outbox();
        let (tx2, rx2)     = outbox();
        let (tx3, mut rx3) = outbox();
        b.register(ConnId(1), tx1);
        b.register(ConnId(2), tx2);
        b.register(ConnId(3), tx3);
        drop(rx2);

        let ev = Event::from(Snapshot { uris: vec!["u1".into()], last_updated: Utc::now() });
        b.notify(Target::Many(&[ConnId(1), ConnId(2), ConnId(3), ConnId(99)]), &ev);

        let a = text(rx1.try_recv().unwrap());
        let c = text(rx3.try_recv().unwrap());
        assert_eq!(a, c);
        assert!(a.contains(r#""uris":["u1"]"#));
    }

    #[test]
    fn same_recipient_keeps_issue_order() {
        let mut b = Broadcaster::default();
        let (tx, mut rx) = outbox();
        b.register(ConnId(1), tx);

        for i in 0..5 {
            b.notify(Target::One(ConnId(1)), &Event::Error { error: i.to_string() });
        }
        let got: Vec<_> = (0..5).map(|_| text(rx.try_recv().unwrap())).collect();
        let want: Vec<_> = (0..5).map(|i| format!(r#"{{"error":"{i}"}}"#)).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn backed_up_recipient_is_capped_and_others_unaffected() {
        let mut b = Broadcaster::default();
        let (slow_tx, mut slow_rx) = outbox();
        let (fast_tx, mut fast_rx) = outbox();
        b.register(ConnId(1), slow_tx);
        b.register(ConnId(2), fast_tx);

        for i in 0..2000 {
            let ev = Event::from(Snapshot { uris: vec![i.to_string()], last_updated: Utc::now() });
            b.notify(Target::Many(&[ConnId(1), ConnId(2)]), &ev);
            // the fast peer keeps up
            text(fast_rx.try_recv().unwrap());
        }

        let mut queued = 0;
        while slow_rx.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, OUTBOX_CAPACITY);
        assert_eq!(b.dropped(ConnId(1)), (2000 - OUTBOX_CAPACITY) as u64);
        assert_eq!(b.dropped(ConnId(2)), 0);

        // drained peer gets the next event again
        b.notify(Target::One(ConnId(1)), &Event::Error { error: "x".into() });
        assert_eq!(text(slow_rx.try_recv().unwrap()), r#"{"error":"x"}"#);
    }
}
