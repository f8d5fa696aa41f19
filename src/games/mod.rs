//! Game module registry and the capability interface every game implements.

pub mod buzzin;
pub mod catalog;
pub mod engine;
pub mod reflex;
pub mod trivia;

use std::{
    fmt,
    str::FromStr,
    sync::{Arc, Weak},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    error::EngineError,
    state::{
        AppState, SharedState,
        connections::{ConnectionId, ConnectionRegistry},
        rooms::{Room, RoomManager},
    },
};

/// Fixed catalog of game implementations. Parsing an unknown tag is the
/// "unknown game type" failure of the engine contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    /// Reflex challenge stub.
    Reflex,
    /// Trivia battle stub.
    Trivia,
    /// The buzz-in reference game.
    Buzzin,
}

impl GameType {
    /// Wire form of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Reflex => "reflex",
            GameType::Trivia => "trivia",
            GameType::Buzzin => "buzzin",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reflex" => Ok(GameType::Reflex),
            "trivia" => Ok(GameType::Trivia),
            "buzzin" => Ok(GameType::Buzzin),
            other => Err(EngineError::UnknownGameType(other.to_string())),
        }
    }
}

/// Instantiate a game of the given type bound to a room. The instance owns
/// all of its state; nothing outside mutates it except through its handlers.
pub fn create_game(game_type: GameType, room: &Room, config: &Arc<AppConfig>) -> Box<dyn Game> {
    match game_type {
        GameType::Reflex => Box::new(reflex::ReflexGame::new(room)),
        GameType::Trivia => Box::new(trivia::TriviaGame::new(room)),
        GameType::Buzzin => Box::new(buzzin::BuzzinGame::new(room, Arc::clone(config))),
    }
}

/// An inbound event routed to a game instance, verbatim from the transport
/// (or synthesized by the engine for start handling).
#[derive(Debug)]
pub struct GameEvent<'a> {
    /// Game-defined event name, e.g. `"player:buzz"`.
    pub name: &'a str,
    /// Game-defined payload.
    pub payload: &'a serde_json::Value,
    /// The connection that submitted the event.
    pub connection_id: ConnectionId,
}

/// Deferred events delivered back to a game by a timer it scheduled. This
/// path is internal only; clients cannot inject timer events.
#[derive(Debug, Clone)]
pub enum GameTimer {
    /// The per-buzz answer window elapsed.
    AnswerTimeout {
        /// The player who held the buzzer when the timer was scheduled.
        connection_id: ConnectionId,
    },
}

/// Collaborators handed to a game for the duration of one handler call.
/// Games read room data and broadcast through these; they never keep them.
pub struct GameContext<'a> {
    /// Room lookup and player names.
    pub rooms: &'a RoomManager,
    /// Outbound delivery.
    pub connections: &'a ConnectionRegistry,
    /// Deferred-event scheduling.
    pub timers: &'a TimerScheduler,
}

/// Capability interface implemented by every game module.
pub trait Game: Send {
    /// React to an inbound event. Invalid events for the current phase are
    /// silent no-ops; this must never panic the process.
    fn handle_event(&mut self, ctx: &GameContext<'_>, event: &GameEvent<'_>);

    /// React to a timer this instance scheduled earlier. Implementations must
    /// re-validate that the condition the timer was scheduled for still holds.
    fn handle_timer(&mut self, _ctx: &GameContext<'_>, _timer: &GameTimer) {}

    /// Snapshot of the game's public state.
    fn state(&self, ctx: &GameContext<'_>) -> serde_json::Value;

    /// True once the game reached its terminal phase; the engine then tears
    /// it down.
    fn finished(&self) -> bool {
        false
    }

    /// Release resources (cancel timers, drop state) before the instance is
    /// discarded.
    fn teardown(&mut self) {}
}

/// Schedules deferred game events against the shared application state.
///
/// Holds a weak handle so a scheduler captured by an in-flight timer never
/// keeps the application state alive on its own.
#[derive(Clone)]
pub struct TimerScheduler {
    state: Weak<AppState>,
}

impl TimerScheduler {
    /// Scheduler bound to the running application.
    pub fn new(state: &SharedState) -> Self {
        Self {
            state: Arc::downgrade(state),
        }
    }

    /// Scheduler whose timers fire into nothing. Used by unit tests that
    /// drive game instances directly.
    pub fn detached() -> Self {
        Self { state: Weak::new() }
    }

    /// Deliver `timer` to the room's active game after `delay`, unless the
    /// returned handle is aborted first. Delivery re-enters the engine, so
    /// the fired event is serialized with all other room mutations.
    pub fn schedule(&self, room_code: &str, timer: GameTimer, delay: Duration) -> AbortHandle {
        let state = self.state.clone();
        let room_code = room_code.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(state) = state.upgrade() {
                state.deliver_game_timer(&room_code, timer).await;
            }
        })
        .abort_handle()
    }
}
