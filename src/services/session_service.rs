//! Session operations behind the WebSocket protocol: naming, room lifecycle,
//! game start, and event forwarding. Each operation takes the core lock once
//! and issues its broadcasts before releasing it, so observers always see
//! updates in mutation order.

use serde_json::Value;
use tracing::{debug, info};

use crate::{
    dto::ws::ServerMessage,
    error::SessionError,
    games::{GameEvent, GameType, TimerScheduler},
    state::{SharedState, connections::ConnectionId, rooms::normalize_room_code},
};

/// Generated display name for connections that never set one.
fn fallback_name(prefix: &str, id: ConnectionId) -> String {
    let hex = id.simple().to_string();
    format!("{prefix}-{}", &hex[..4])
}

fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn clean_code(code: Option<&str>) -> Option<String> {
    code.map(normalize_room_code).filter(|c| !c.is_empty())
}

/// Record a display name for the connection. Blank input falls back to a
/// generated name. If the connection is seated, the room sees the change.
pub async fn set_name(
    state: &SharedState,
    id: ConnectionId,
    name: Option<String>,
) -> Result<(), SessionError> {
    let name = clean_name(name).unwrap_or_else(|| fallback_name("Player", id));
    let mut core = state.core().await;
    core.rooms.set_player_name(id, name);

    if let Some(code) = core.rooms.room_code_for(id).map(str::to_string)
        && let Some(view) = core.rooms.serialize_room(&code)
    {
        state.connections().broadcast(&code, &ServerMessage::RoomState(view));
    }
    Ok(())
}

/// Create a room with the caller as host and confirm with a private
/// `room:created`.
pub async fn create_room(
    state: &SharedState,
    id: ConnectionId,
    game_type: Option<String>,
) -> Result<(), SessionError> {
    let game_type = game_type
        .as_deref()
        .map(str::parse::<GameType>)
        .transpose()?;

    let mut core = state.core().await;
    let name = core
        .rooms
        .player_name(id)
        .map(str::to_string)
        .unwrap_or_else(|| fallback_name("Host", id));

    let code = core.rooms.create_room(id, game_type).code.clone();
    core.rooms.add_player(&code, id, name, true);
    state.connections().join_channel(&code, id);

    if let Some(view) = core.rooms.serialize_room(&code) {
        state.connections().send(id, &ServerMessage::RoomCreated(view));
    }
    Ok(())
}

/// Seat the caller in an existing room and broadcast the new membership.
/// Joining a room with a game in progress also delivers a private game
/// snapshot so the late joiner can render immediately.
pub async fn join_room(
    state: &SharedState,
    id: ConnectionId,
    room_code: Option<String>,
    name: Option<String>,
) -> Result<(), SessionError> {
    let code = clean_code(room_code.as_deref()).ok_or(SessionError::InvalidRoomCode)?;

    let mut guard = state.core().await;
    let core = &mut *guard;
    if core.rooms.get_room(&code).is_none() {
        return Err(SessionError::RoomNotFound);
    }

    let name = clean_name(name)
        .or_else(|| core.rooms.player_name(id).map(str::to_string))
        .unwrap_or_else(|| fallback_name("Player", id));

    if !core.rooms.add_player(&code, id, name, false) {
        return Err(SessionError::JoinFailed);
    }
    state.connections().join_channel(&code, id);

    if let Some(view) = core.rooms.serialize_room(&code) {
        state.connections().broadcast(&code, &ServerMessage::RoomState(view));
    }

    let timers = TimerScheduler::new(state);
    if let Some(game_state) =
        core.engine
            .state_view(&core.rooms, state.connections(), &timers, &code)
    {
        state.connections().send(id, &ServerMessage::GameState(game_state));
    }

    info!(room = %code, connection = %id, "player joined room");
    Ok(())
}

/// Send the caller a private snapshot of its current room.
pub async fn get_state(state: &SharedState, id: ConnectionId) -> Result<(), SessionError> {
    let core = state.core().await;
    let code = core.rooms.room_code_for(id).ok_or(SessionError::NotInRoom)?;
    let view = core.rooms.serialize_room(code).ok_or(SessionError::NotInRoom)?;
    state.connections().send(id, &ServerMessage::RoomState(view));
    Ok(())
}

/// Start a game in the caller's room. Host only. The room resolves from the
/// explicit code first, then from where the caller is seated.
pub async fn start_game(
    state: &SharedState,
    id: ConnectionId,
    room_code: Option<String>,
    game_type: Option<String>,
    payload: Value,
) -> Result<(), SessionError> {
    let requested = game_type
        .as_deref()
        .map(str::parse::<GameType>)
        .transpose()?;

    let mut guard = state.core().await;
    let core = &mut *guard;

    let code = match clean_code(room_code.as_deref()) {
        Some(code) => code,
        None => core
            .rooms
            .room_code_for(id)
            .map(str::to_string)
            .ok_or(SessionError::NoRoomForHost)?,
    };

    let room = core.rooms.get_room(&code).ok_or(SessionError::RoomNotFound)?;
    if room.host_connection_id != id {
        return Err(SessionError::NotHost);
    }

    let timers = TimerScheduler::new(state);
    core.engine.start_game(
        &mut core.rooms,
        state.connections(),
        &timers,
        state.config(),
        &code,
        requested,
        &payload,
        id,
    )?;
    Ok(())
}

/// Forward an in-game event to the room's active game. Unresolvable rooms
/// and rooms without an active game are silent no-ops.
pub async fn game_event(
    state: &SharedState,
    id: ConnectionId,
    room_code: Option<String>,
    event_name: &str,
    payload: &Value,
) {
    let mut guard = state.core().await;
    let core = &mut *guard;

    let code = match clean_code(room_code.as_deref())
        .or_else(|| core.rooms.room_code_for(id).map(str::to_string))
    {
        Some(code) => code,
        None => {
            debug!(connection = %id, event = event_name, "game event with no resolvable room");
            return;
        }
    };

    let timers = TimerScheduler::new(state);
    let event = GameEvent {
        name: event_name,
        payload,
        connection_id: id,
    };
    core.engine
        .handle_event(&mut core.rooms, state.connections(), &timers, &code, &event);
}

/// Handle a closed connection: unseat the player, hand off the host role or
/// start the empty-room grace period, and update the room. No `room:closed`
/// is sent here; the room only closes if the grace period expires.
pub async fn disconnect(state: &SharedState, id: ConnectionId) {
    let mut guard = state.core().await;
    let core = &mut *guard;

    let Some(removed) = core.rooms.remove_player(id) else {
        return;
    };
    state.connections().leave_channel(&removed.room_code, id);

    if removed.room_now_empty {
        info!(room = %removed.room_code, "room empty; grace period started");
        state.schedule_room_destruction(core, &removed.room_code);
        return;
    }

    if let Some(promoted) = removed.promoted_host {
        info!(room = %removed.room_code, host = %promoted, "host role transferred");
    }
    if let Some(view) = core.rooms.serialize_room(&removed.room_code) {
        state
            .connections()
            .broadcast(&removed.room_code, &ServerMessage::RoomState(view));
    }
}
