use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::ConnId;

/* ------------ one room's playlist ------------ */
#[derive(Debug)]
pub struct RoomState {
    pub admin:        ConnId,
    pub songs:        Vec<String>,
    pub last_updated: DateTime<Utc>,
    pub members:      BTreeSet<ConnId>,   // admin included while the room lives
}

/// What a member sees: the playlist and when it last changed.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub uris:         Vec<String>,
    pub last_updated: DateTime<Utc>,
}

impl RoomState {
    pub fn new(admin: ConnId) -> Self {
        Self {
            admin,
            songs:        Vec::new(),
            last_updated: Utc::now(),
            members:      BTreeSet::from([admin]),
        }
    }

    /// Appends and bumps `last_updated`, strictly past its previous value even
    /// when the clock has not moved.
    pub fn push_song(&mut self, uri: String) {
        self.songs.push(uri);
        let now = Utc::now();
        self.last_updated = if now > self.last_updated {
            now
        } else {
            self.last_updated + Duration::microseconds(1)
        };
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot { uris: self.songs.clone(), last_updated: self.last_updated }
    }

    pub fn member_list(&self) -> Vec<ConnId> {
        self.members.iter().copied().collect()
    }
}
