use std::collections::HashMap;

use tracing::{debug, info};

use super::{
    broadcast::{Broadcaster, Event, Outbox, Target},
    registry::ConnectionRegistry,
    room::RoomState,
    ConnId,
};
use crate::error::SyncError;

/// Owns every room, the connection → room map and the outboxes.
///
/// All methods are synchronous: callers hold the hub lock for the whole
/// operation, so each create/join/leave/add_song is atomic w.r.t. the others.
/// Checks run before any mutation, so an `Err` leaves the hub untouched.
#[derive(Default)]
pub struct RoomHub {
    rooms:       HashMap<String, RoomState>,
    registry:    ConnectionRegistry,
    broadcaster: Broadcaster,
    next_conn:   u64,
}

impl RoomHub {
    /* ---------------- connection lifecycle ---------------- */

    pub fn connect(&mut self, outbox: Outbox) -> ConnId {
        self.next_conn += 1;
        let conn = ConnId(self.next_conn);
        self.broadcaster.register(conn, outbox);
        conn
    }

    /// Evict from any room, then forget the outbox.
    pub fn disconnect(&mut self, conn: ConnId) {
        self.leave(conn);
        self.broadcaster.unregister(conn);
    }

    /* ---------------- room actions ---------------- */

    /// Rejects a taken name; the existing room is left exactly as it was.
    pub fn create(&mut self, name: &str, admin: ConnId) -> Result<(), SyncError> {
        if self.rooms.contains_key(name) {
            return Err(SyncError::Conflict("room already exists".into()));
        }
        self.leave(admin);
        self.rooms.insert(name.to_owned(), RoomState::new(admin));
        self.registry.assign(admin, name);
        info!(conn = %admin, room = name, "room created");
        Ok(())
    }

    /// Sends the current snapshot to `conn` only.
    pub fn join(&mut self, name: &str, conn: ConnId) -> Result<(), SyncError> {
        if !self.rooms.contains_key(name) {
            return Err(SyncError::NotFound("Room doesn't exist".into()));
        }
        if self.registry.lookup(conn) == Some(name) {
            return Err(SyncError::Conflict("Already in the room!".into()));
        }
        self.leave(conn);

        let room = self
            .rooms
            .get_mut(name)
            .ok_or_else(|| SyncError::NotFound("Room doesn't exist".into()))?;
        room.members.insert(conn);
        self.registry.assign(conn, name);

        self.broadcaster.notify(Target::One(conn), &room.snapshot().into());
        info!(%conn, room = name, "joined");
        Ok(())
    }

    /// Returns every connection that ended up unjoined, `conn` first.
    ///
    /// When the admin leaves, the remaining members are evicted from a copy
    /// of the member set and the room entry is dropped.
    pub fn leave(&mut self, conn: ConnId) -> Vec<ConnId> {
        let Some(name) = self.registry.lookup(conn).map(str::to_owned) else {
            return Vec::new();
        };
        self.registry.clear(conn);
        let mut evicted = vec![conn];

        let Some(room) = self.rooms.get_mut(&name) else {
            return evicted;
        };
        room.members.remove(&conn);
        if room.admin != conn {
            debug!(%conn, room = %name, "left");
            return evicted;
        }

        for member in room.member_list() {
            room.members.remove(&member);
            self.registry.clear(member);
            evicted.push(member);
        }
        self.rooms.remove(&name);
        info!(%conn, room = %name, kicked = evicted.len() - 1, "admin left, room closed");
        evicted
    }

    /// Admin only. Broadcasts the new snapshot to every member, admin included.
    pub fn add_song(&mut self, conn: ConnId, uri: &str) -> Result<(), SyncError> {
        let name = self
            .registry
            .lookup(conn)
            .ok_or_else(|| SyncError::NotFound("Not in a room".into()))?
            .to_owned();
        let room = self
            .rooms
            .get_mut(&name)
            .ok_or_else(|| SyncError::NotFound("Room doesn't exist".into()))?;
        if room.admin != conn {
            return Err(SyncError::Permission("Not an admin".into()));
        }

        room.push_song(uri.to_owned());
        self.broadcaster
            .notify(Target::Many(&room.member_list()), &room.snapshot().into());
        debug!(%conn, room = %name, songs = room.songs.len(), "song added");
        Ok(())
    }

    /// Scoped error event to a single connection.
    pub fn report(&self, conn: ConnId, err: &SyncError) {
        debug!(%conn, kind = err.kind(), error = %err, "reporting error");
        self.broadcaster
            .notify(Target::One(conn), &Event::Error { error: err.to_string() });
    }

    /* ---------------- read access ---------------- */

    #[cfg(test)]
    pub fn room(&self, name: &str) -> Option<&RoomState> {
        self.rooms.get(name)
    }

    #[cfg(test)]
    pub fn room_of(&self, conn: ConnId) -> Option<&str> {
        self.registry.lookup(conn)
    }
}
