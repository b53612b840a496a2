use std::collections::HashMap;

use super::ConnId;

/// Connection → room name. At most one room per connection.
///
/// Pure bookkeeping: the hub keeps `RoomState::members` in step with it.
#[derive(Default, Debug)]
pub struct ConnectionRegistry {
    rooms: HashMap<ConnId, String>,
}

impl ConnectionRegistry {
    /// Overwrites whatever `conn` was mapped to before.
    pub fn assign(&mut self, conn: ConnId, room: &str) {
        self.rooms.insert(conn, room.to_owned());
    }

    pub fn lookup(&self, conn: ConnId) -> Option<&str> {
        self.rooms.get(&conn).map(String::as_str)
    }

    pub fn clear(&mut self, conn: ConnId) {
        self.rooms.remove(&conn);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_overwrites_and_clear_is_idempotent() {
        let mut reg = ConnectionRegistry::default();
        let conn = ConnId(7);

        assert_eq!(reg.lookup(conn), None);
        reg.assign(conn, "party");
        reg.assign(conn, "afterparty");
        assert_eq!(reg.lookup(conn), Some("afterparty"));

        reg.clear(conn);
        reg.clear(conn);
        assert_eq!(reg.lookup(conn), None);
        assert_eq!(reg.len(), 0);
    }
}
