use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    games::GameType,
    state::rooms::{Player, Room, RoomPhase},
};

/// Read-only snapshot of a room suitable for transmission. Holds no
/// references into the room manager's mutable state.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    /// Human-typeable room code.
    pub code: String,
    /// Connection currently holding host privileges.
    pub host_connection_id: Uuid,
    /// Selected game type, if any.
    pub game_type: Option<GameType>,
    /// Room lifecycle phase.
    pub phase: RoomPhase,
    /// Creation timestamp (RFC3339).
    pub created_at: String,
    /// Last mutation timestamp (RFC3339).
    pub updated_at: String,
    /// Players in join order.
    pub players: Vec<PlayerView>,
}

/// Public projection of a seated player.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// The player's transport connection identifier.
    pub connection_id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether this player holds host privileges.
    pub is_host: bool,
    /// Join timestamp (RFC3339).
    pub joined_at: String,
}

impl RoomView {
    /// Snapshot a room and its players.
    pub fn from_room(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            host_connection_id: room.host_connection_id,
            game_type: room.game_type,
            phase: room.phase,
            created_at: format_system_time(room.created_at),
            updated_at: format_system_time(room.updated_at),
            players: room.players.values().map(PlayerView::from_player).collect(),
        }
    }
}

impl PlayerView {
    fn from_player(player: &Player) -> Self {
        Self {
            connection_id: player.connection_id,
            name: player.name.clone(),
            is_host: player.is_host,
            joined_at: format_system_time(player.joined_at),
        }
    }
}
