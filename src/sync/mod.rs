//! Real-time room synchronisation: who is in which room, what the playlist
//! looks like, and getting changes out to every member.

use std::fmt;

pub mod broadcast;
pub mod heartbeat;
pub mod hub;
pub mod registry;
pub mod room;
pub mod router;

/// Opaque handle for one live socket. Allocated by the hub, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub(crate) u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
