use serde_json::{Map, Value};
use tracing::warn;

use super::{hub::RoomHub, ConnId};
use crate::{error::SyncError, state::SharedHub};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateRoom { room_name: String },
    JoinRoom   { room_name: String },
    LeaveRoom,
    AddSong    { song_uri: String },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    /// `action` present but not one we know; ignored.
    Unsupported(String),
}

/// Envelope → command.
///
/// Not JSON, not an object, or no `action` → `Protocol`.
/// Known action with its required field missing or empty → `Validation`.
pub fn decode(raw: &str) -> Result<Inbound, SyncError> {
    let malformed = || SyncError::Protocol("improperly formed data".into());
    let value: Value = serde_json::from_str(raw).map_err(|_| malformed())?;
    let fields = value.as_object().ok_or_else(malformed)?;
    let action = fields.get("action").ok_or_else(malformed)?;

    let Some(action) = action.as_str() else {
        return Ok(Inbound::Unsupported(action.to_string()));
    };
    let cmd = match action {
        "create_room" => Command::CreateRoom {
            room_name: required(fields, "room_name", "Room name not specified")?,
        },
        "join_room" => Command::JoinRoom {
            room_name: required(fields, "room_name", "Room name not specified")?,
        },
        "leave_room" => Command::LeaveRoom,
        "add_song" => Command::AddSong {
            song_uri: required(fields, "song_uri", "Song not specified")?,
        },
        other => return Ok(Inbound::Unsupported(other.to_owned())),
    };
    Ok(Inbound::Command(cmd))
}

fn required(fields: &Map<String, Value>, key: &str, msg: &str) -> Result<String, SyncError> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| SyncError::Validation(msg.into()))
}

pub fn dispatch(hub: &mut RoomHub, conn: ConnId, cmd: Command) -> Result<(), SyncError> {
    match cmd {
        Command::CreateRoom { room_name } => hub.create(&room_name, conn),
        Command::JoinRoom { room_name }   => hub.join(&room_name, conn),
        Command::LeaveRoom                => { hub.leave(conn); Ok(()) }
        Command::AddSong { song_uri }     => hub.add_song(conn, &song_uri),
    }
}

/// Decode, dispatch, and turn any failure into an error event for `conn`.
/// Never fails: the receive loop keeps going whatever happens here.
pub async fn route(hub: &SharedHub, conn: ConnId, raw: &str) {
    let inbound = decode(raw);
    let mut hub = hub.lock().await;
    let result = match inbound {
        Ok(Inbound::Command(cmd)) => dispatch(&mut hub, conn, cmd),
        Ok(Inbound::Unsupported(action)) => {
            warn!(%conn, %action, "unsupported action");
            Ok(())
        }
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        hub.report(conn, &e);
    }
}
