//! Room manager: room and membership lifecycle, disconnect grace periods,
//! host failover, and room serialization. Depends only on connection
//! identifiers and never calls into the transport.

use std::{collections::HashMap, time::SystemTime};

use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;
use tokio::task::AbortHandle;
use tracing::info;
use utoipa::ToSchema;

use crate::{dto::room::RoomView, games::GameType, state::connections::ConnectionId};

/// Length of generated room codes.
const ROOM_CODE_LEN: usize = 4;

/// Lifecycle phase of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RoomPhase {
    /// Players are gathering; no game has started yet.
    Lobby,
    /// A game instance is active.
    InProgress,
    /// The last game ended; a new one may be started.
    Ended,
}

/// A player seated in a room.
#[derive(Debug, Clone)]
pub struct Player {
    /// Transport identifier, unique within the room.
    pub connection_id: ConnectionId,
    /// Display name.
    pub name: String,
    /// Host flag; exactly one player holds it while the room is non-empty.
    pub is_host: bool,
    /// When the player joined.
    pub joined_at: SystemTime,
}

/// A session container identified by a short code, holding players and at
/// most one active game.
#[derive(Debug)]
pub struct Room {
    /// Unique, human-typeable code.
    pub code: String,
    /// Connection holding host privileges. Outside the grace window this
    /// always references an entry in `players`.
    pub host_connection_id: ConnectionId,
    /// Selected game type, if any.
    pub game_type: Option<GameType>,
    /// Lifecycle phase.
    pub phase: RoomPhase,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last mutation timestamp.
    pub updated_at: SystemTime,
    /// Seated players in join order. Join order drives host promotion.
    pub players: IndexMap<ConnectionId, Player>,
    /// Pending grace-period destruction timer, if the room is empty.
    pub destroy_timer: Option<AbortHandle>,
}

impl Room {
    /// Record a mutation on the room.
    pub fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }

    /// Abort a pending destruction timer, if any. Called when a player joins
    /// within the grace window.
    pub fn cancel_destroy_timer(&mut self) {
        if let Some(handle) = self.destroy_timer.take() {
            handle.abort();
        }
    }
}

/// Result of removing a player from its room.
#[derive(Debug)]
pub struct RemovedPlayer {
    /// The room the player left.
    pub room_code: String,
    /// Always false on this path: empty rooms linger through the grace
    /// period, so the caller must not announce closure yet.
    pub room_destroyed: bool,
    /// True when the departure emptied the room; the caller schedules the
    /// grace-period destruction timer.
    pub room_now_empty: bool,
    /// Player promoted to host because the departing player held the role.
    pub promoted_host: Option<ConnectionId>,
}

/// Owns the set of rooms and player memberships. All mutation goes through
/// this type; other components only see operation results and snapshots.
#[derive(Default)]
pub struct RoomManager {
    rooms: HashMap<String, Room>,
    /// connection -> room code, for reverse lookup on disconnect.
    player_index: HashMap<ConnectionId, String>,
    /// connection -> display name, kept even before the connection joins a room.
    names: HashMap<ConnectionId, String>,
}

impl RoomManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with a freshly generated, collision-checked code and
    /// register it. The host is not seated yet; callers follow up with
    /// [`RoomManager::add_player`].
    pub fn create_room(
        &mut self,
        host_connection_id: ConnectionId,
        game_type: Option<GameType>,
    ) -> &Room {
        let mut code = generate_room_code();
        while self.rooms.contains_key(&code) {
            code = generate_room_code();
        }

        let now = SystemTime::now();
        let room = Room {
            code: code.clone(),
            host_connection_id,
            game_type,
            phase: RoomPhase::Lobby,
            created_at: now,
            updated_at: now,
            players: IndexMap::new(),
            destroy_timer: None,
        };

        info!(room = %code, "room created");
        self.rooms.entry(code).or_insert(room)
    }

    /// Pure lookup.
    pub fn get_room(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// Mutable lookup, used by the engine to record phase transitions.
    pub fn get_room_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// Number of live rooms, including rooms inside their grace period.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Seat a player in a room. Returns false when the room does not exist.
    ///
    /// Joining cancels any pending destruction timer (reconnection within the
    /// grace window rescues the room). When the recorded host is no longer
    /// present in `players`, the joining player is promoted unconditionally,
    /// regardless of `is_host`; this is how a rejoining player rescues an
    /// orphaned room.
    pub fn add_player(
        &mut self,
        code: &str,
        connection_id: ConnectionId,
        name: String,
        is_host: bool,
    ) -> bool {
        let Some(room) = self.rooms.get_mut(code) else {
            return false;
        };

        room.cancel_destroy_timer();

        let host_present = room.players.contains_key(&room.host_connection_id);
        let becomes_host = is_host || !host_present;

        room.players.insert(
            connection_id,
            Player {
                connection_id,
                name: name.clone(),
                is_host: becomes_host,
                joined_at: SystemTime::now(),
            },
        );

        if becomes_host {
            room.host_connection_id = connection_id;
        }
        room.touch();

        self.player_index.insert(connection_id, code.to_string());
        self.names.insert(connection_id, name);

        true
    }

    /// Remove a player from its room on disconnect. Returns `None` when the
    /// connection is not tracked.
    ///
    /// An emptied room is not deleted here; the caller schedules the grace
    /// timer and the room is purged only if nobody rejoins. A departing host
    /// in a non-empty room hands the role to the next player in join order.
    pub fn remove_player(&mut self, connection_id: ConnectionId) -> Option<RemovedPlayer> {
        let room_code = self.player_index.remove(&connection_id)?;
        self.names.remove(&connection_id);

        let Some(room) = self.rooms.get_mut(&room_code) else {
            return None;
        };

        room.players.shift_remove(&connection_id);
        room.touch();

        let mut promoted_host = None;
        let room_now_empty = room.players.is_empty();

        if !room_now_empty && room.host_connection_id == connection_id {
            if let Some(next) = room.players.values_mut().next() {
                next.is_host = true;
                promoted_host = Some(next.connection_id);
                room.host_connection_id = next.connection_id;
                room.touch();
            }
        }

        Some(RemovedPlayer {
            room_code,
            room_destroyed: false,
            room_now_empty,
            promoted_host,
        })
    }

    /// Delete a room outright. Used by the grace-timer expiry path after the
    /// emptiness condition has been re-validated.
    pub fn purge_room(&mut self, code: &str) {
        if let Some(mut room) = self.rooms.remove(code) {
            room.cancel_destroy_timer();
            for id in room.players.keys() {
                self.player_index.remove(id);
            }
        }
    }

    /// Room code the connection is seated in, if any.
    pub fn room_code_for(&self, connection_id: ConnectionId) -> Option<&str> {
        self.player_index.get(&connection_id).map(String::as_str)
    }

    /// Update the display-name index and, if seated, the player record.
    pub fn set_player_name(&mut self, connection_id: ConnectionId, name: String) {
        self.names.insert(connection_id, name.clone());

        let Some(code) = self.player_index.get(&connection_id) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(code) else {
            return;
        };
        if let Some(player) = room.players.get_mut(&connection_id) {
            player.name = name;
            room.touch();
        }
    }

    /// Display name recorded for a connection, if any.
    pub fn player_name(&self, connection_id: ConnectionId) -> Option<&str> {
        self.names.get(&connection_id).map(String::as_str)
    }

    /// Owned snapshot of a room for transmission.
    pub fn serialize_room(&self, code: &str) -> Option<RoomView> {
        self.rooms.get(code).map(RoomView::from_room)
    }
}

/// Normalize a client-supplied room code: trimmed, uppercased.
pub fn normalize_room_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| (b'A' + rng.random_range(0..26)) as char)
        .collect()
}
