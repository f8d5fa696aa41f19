//! Reflex challenge placeholder. Registered in the catalog so rooms can
//! select it, but the gameplay is not built yet.

use std::time::SystemTime;

use serde_json::{Value, json};
use tracing::debug;

use crate::{
    games::{Game, GameContext, GameEvent},
    state::rooms::Room,
};

/// Stub instance; tracks nothing beyond its room binding.
pub struct ReflexGame {
    room_code: String,
    started_at: SystemTime,
}

impl ReflexGame {
    /// Bind a stub instance to a room.
    pub fn new(room: &Room) -> Self {
        Self {
            room_code: room.code.clone(),
            started_at: SystemTime::now(),
        }
    }
}

impl Game for ReflexGame {
    fn handle_event(&mut self, _ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        debug!(room = %self.room_code, event = event.name, "reflex is a stub; event ignored");
    }

    fn state(&self, _ctx: &GameContext<'_>) -> Value {
        json!({
            "game": "reflex",
            "status": "unimplemented",
            "startedAt": crate::dto::format_system_time(self.started_at),
        })
    }
}
