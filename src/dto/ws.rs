use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::room::RoomView, games::GameType};

/// Messages accepted from WebSocket clients. The `type` tags are the wire
/// contract and must not change.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Set or change the connection's display name.
    #[serde(rename = "player:setName")]
    SetName {
        /// Requested name; blank or missing falls back to a generated one.
        #[serde(default)]
        name: Option<String>,
    },
    /// Create a room, optionally preselecting a game type.
    #[serde(rename = "host:createRoom", rename_all = "camelCase")]
    CreateRoom {
        /// Game type tag, e.g. `"buzzin"`.
        #[serde(default)]
        game_type: Option<String>,
    },
    /// Join an existing room by code.
    #[serde(rename = "player:joinRoom", rename_all = "camelCase")]
    JoinRoom {
        /// Room code; trimmed and uppercased before lookup.
        #[serde(default)]
        room_code: Option<String>,
        /// Display name for this player.
        #[serde(default)]
        name: Option<String>,
    },
    /// Request a private snapshot of the caller's current room.
    #[serde(rename = "room:getState")]
    GetState,
    /// Start a game in the caller's room (host only).
    #[serde(rename = "host:startGame", rename_all = "camelCase")]
    StartGame {
        /// Room code; falls back to the caller's seated room.
        #[serde(default)]
        room_code: Option<String>,
        /// Requested game type; falls back to the room's, then the default.
        #[serde(default)]
        game_type: Option<String>,
        /// Opaque start payload forwarded to the game's start handler
        /// (e.g. `{"categories": [...], "questionCount": 10}`).
        #[serde(default)]
        #[schema(value_type = Object)]
        payload: serde_json::Value,
    },
    /// Forward an in-game event to the room's active game instance.
    #[serde(rename = "game:event", rename_all = "camelCase")]
    GameEvent {
        /// Room code; falls back to the caller's seated room.
        #[serde(default)]
        room_code: Option<String>,
        /// Game-defined event name, e.g. `"player:buzz"`.
        event_name: String,
        /// Game-defined payload.
        #[serde(default)]
        #[schema(value_type = Object)]
        payload: serde_json::Value,
    },
}

/// Messages emitted to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Room created; sent privately to the creating host.
    #[serde(rename = "room:created")]
    RoomCreated(RoomView),
    /// Room membership or metadata changed.
    #[serde(rename = "room:state")]
    RoomState(RoomView),
    /// Private caller error; no state changed.
    #[serde(rename = "room:error")]
    RoomError(String),
    /// The room was destroyed.
    #[serde(rename = "room:closed")]
    RoomClosed,
    /// A game instance started in the room.
    #[serde(rename = "game:started", rename_all = "camelCase")]
    GameStarted {
        /// The resolved game type.
        game_type: GameType,
        /// Room snapshot at start time.
        room: RoomView,
    },
    /// The room's game instance ended.
    #[serde(rename = "game:ended", rename_all = "camelCase")]
    GameEnded {
        /// The type of the game that ended.
        game_type: GameType,
        /// Why it ended.
        reason: String,
    },
    /// Game-defined full state snapshot.
    #[serde(rename = "game:state")]
    GameState(serde_json::Value),
    /// Discrete, non-snapshot game notification.
    #[serde(rename = "game:event")]
    GameEvent(GameNotice),
}

/// Discrete game notifications, distinct from the state snapshot so clients
/// can trigger presentation effects exactly once.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameNotice {
    /// The game advanced to a fresh question (not yet revealed).
    NewQuestion,
    /// The host revealed the current question.
    QuestionShown,
    /// A player won the buzzer race.
    #[serde(rename_all = "camelCase")]
    Buzz {
        /// The buzzing player.
        player_id: Uuid,
    },
    /// The host judged the answer correct.
    #[serde(rename_all = "camelCase")]
    Correct {
        /// The scored player.
        player_id: Uuid,
        /// Points awarded.
        points: i64,
    },
    /// The host judged the answer wrong.
    #[serde(rename_all = "camelCase")]
    Wrong {
        /// The penalized player.
        player_id: Uuid,
        /// Points deducted (negative).
        points: i64,
    },
    /// The answer window elapsed with no judgment.
    #[serde(rename_all = "camelCase")]
    Timeout {
        /// The penalized player.
        player_id: Uuid,
        /// Points deducted (negative).
        points: i64,
    },
    /// Private in-game caller error.
    Error {
        /// Human-readable reason.
        message: String,
    },
}
