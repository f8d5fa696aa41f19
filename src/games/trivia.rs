//! Trivia battle placeholder. Registered in the catalog so rooms can select
//! it, but the gameplay is not built yet.

use std::time::SystemTime;

use serde_json::{Value, json};
use tracing::debug;

use crate::{
    games::{Game, GameContext, GameEvent},
    state::rooms::Room,
};

/// Stub instance; tracks nothing beyond its room binding.
pub struct TriviaGame {
    room_code: String,
    started_at: SystemTime,
}

impl TriviaGame {
    /// Bind a stub instance to a room.
    pub fn new(room: &Room) -> Self {
        Self {
            room_code: room.code.clone(),
            started_at: SystemTime::now(),
        }
    }
}

impl Game for TriviaGame {
    fn handle_event(&mut self, _ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        debug!(room = %self.room_code, event = event.name, "trivia is a stub; event ignored");
    }

    fn state(&self, _ctx: &GameContext<'_>) -> Value {
        json!({
            "game": "trivia",
            "status": "unimplemented",
            "startedAt": crate::dto::format_system_time(self.started_at),
        })
    }
}
