//! Game engine: owns the room-code-to-game-instance binding and routes
//! events, timers, and lifecycle transitions into game modules.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dto::ws::ServerMessage,
    error::EngineError,
    games::{Game, GameContext, GameEvent, GameTimer, GameType, TimerScheduler, create_game},
    state::{
        connections::{ConnectionId, ConnectionRegistry},
        rooms::{RoomManager, RoomPhase},
    },
};

struct ActiveGame {
    game_type: GameType,
    instance: Box<dyn Game>,
}

/// At most one active game per room. The engine never touches game internals;
/// it only forwards events and observes the `finished` flag.
#[derive(Default)]
pub struct GameEngine {
    active: HashMap<String, ActiveGame>,
}

impl GameEngine {
    /// Create an engine with no active games.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a room currently has an active game.
    pub fn has_game(&self, room_code: &str) -> bool {
        self.active.contains_key(room_code)
    }

    /// Start a game in a room and broadcast `game:started`.
    ///
    /// The game type resolves in order: explicit request, the room's selected
    /// type, the configured default. The start payload is forwarded to the
    /// new instance as a synthetic `host:startGame` event so games own their
    /// start semantics.
    #[allow(clippy::too_many_arguments)]
    pub fn start_game(
        &mut self,
        rooms: &mut RoomManager,
        connections: &ConnectionRegistry,
        timers: &TimerScheduler,
        config: &Arc<AppConfig>,
        room_code: &str,
        requested: Option<GameType>,
        start_payload: &Value,
        initiator: ConnectionId,
    ) -> Result<GameType, EngineError> {
        let room = rooms.get_room_mut(room_code).ok_or(EngineError::RoomNotFound)?;
        let game_type = requested
            .or(room.game_type)
            .unwrap_or(config.default_game_type);

        if let Some(previous) = self.active.remove(room_code) {
            // Restart semantics: the old instance is dropped without teardown
            // notifications. Its stale timers no-op on fire-time validation.
            warn!(
                room = room_code,
                previous = %previous.game_type,
                "replacing active game without teardown"
            );
        }

        let instance = create_game(game_type, room, config);
        room.game_type = Some(game_type);
        room.phase = RoomPhase::InProgress;
        room.touch();
        self.active
            .insert(room_code.to_string(), ActiveGame { game_type, instance });

        if let Some(view) = rooms.serialize_room(room_code) {
            connections.broadcast(
                room_code,
                &ServerMessage::GameStarted {
                    game_type,
                    room: view,
                },
            );
        }
        info!(room = room_code, game = %game_type, "game started");

        let event = GameEvent {
            name: "host:startGame",
            payload: start_payload,
            connection_id: initiator,
        };
        self.dispatch(rooms, connections, timers, room_code, &event);
        self.sweep_finished(rooms, connections, room_code);

        Ok(game_type)
    }

    /// Forward an in-game event to the room's active game, then end the game
    /// if the event drove it to its terminal phase. No active game is a
    /// silent no-op.
    pub fn handle_event(
        &mut self,
        rooms: &mut RoomManager,
        connections: &ConnectionRegistry,
        timers: &TimerScheduler,
        room_code: &str,
        event: &GameEvent<'_>,
    ) {
        self.dispatch(rooms, connections, timers, room_code, event);
        self.sweep_finished(rooms, connections, room_code);
    }

    /// Deliver a fired timer to the room's active game. Timers raced by a
    /// game replacement or room destruction land here with no target and do
    /// nothing.
    pub fn handle_timer(
        &mut self,
        rooms: &mut RoomManager,
        connections: &ConnectionRegistry,
        timers: &TimerScheduler,
        room_code: &str,
        timer: &GameTimer,
    ) {
        if let Some(active) = self.active.get_mut(room_code) {
            let ctx = GameContext {
                rooms,
                connections,
                timers,
            };
            active.instance.handle_timer(&ctx, timer);
        }
        self.sweep_finished(rooms, connections, room_code);
    }

    /// End a room's game: teardown, mark the room ended, broadcast
    /// `game:ended`. The room survives and can start another game.
    pub fn end_game(
        &mut self,
        rooms: &mut RoomManager,
        connections: &ConnectionRegistry,
        room_code: &str,
        reason: &str,
    ) {
        let Some(mut active) = self.active.remove(room_code) else {
            return;
        };
        active.instance.teardown();

        if let Some(room) = rooms.get_room_mut(room_code) {
            room.phase = RoomPhase::Ended;
            room.touch();
        }

        connections.broadcast(
            room_code,
            &ServerMessage::GameEnded {
                game_type: active.game_type,
                reason: reason.to_string(),
            },
        );
        info!(room = room_code, game = %active.game_type, reason, "game ended");
    }

    /// Drop a room's game with teardown but without notifications. Used when
    /// the room itself is destroyed and there is nobody left to notify.
    pub fn discard(&mut self, room_code: &str) {
        if let Some(mut active) = self.active.remove(room_code) {
            active.instance.teardown();
        }
    }

    /// Snapshot of the room's active game state, if any.
    pub fn state_view(
        &self,
        rooms: &RoomManager,
        connections: &ConnectionRegistry,
        timers: &TimerScheduler,
        room_code: &str,
    ) -> Option<Value> {
        let active = self.active.get(room_code)?;
        let ctx = GameContext {
            rooms,
            connections,
            timers,
        };
        Some(active.instance.state(&ctx))
    }

    fn dispatch(
        &mut self,
        rooms: &RoomManager,
        connections: &ConnectionRegistry,
        timers: &TimerScheduler,
        room_code: &str,
        event: &GameEvent<'_>,
    ) {
        let Some(active) = self.active.get_mut(room_code) else {
            return;
        };
        let ctx = GameContext {
            rooms,
            connections,
            timers,
        };
        active.instance.handle_event(&ctx, event);
    }

    fn sweep_finished(
        &mut self,
        rooms: &mut RoomManager,
        connections: &ConnectionRegistry,
        room_code: &str,
    ) {
        let finished = self
            .active
            .get(room_code)
            .is_some_and(|active| active.instance.finished());
        if finished {
            self.end_game(rooms, connections, room_code, "completed");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    struct Fixture {
        rooms: RoomManager,
        connections: ConnectionRegistry,
        timers: TimerScheduler,
        engine: GameEngine,
        config: Arc<AppConfig>,
        code: String,
        host: ConnectionId,
        player: ConnectionId,
    }

    fn fixture(game_type: Option<GameType>) -> Fixture {
        let mut rooms = RoomManager::new();
        let host = Uuid::new_v4();
        let player = Uuid::new_v4();
        let code = rooms.create_room(host, game_type).code.clone();
        assert!(rooms.add_player(&code, host, "Host".into(), true));
        assert!(rooms.add_player(&code, player, "Ann".into(), false));

        Fixture {
            rooms,
            connections: ConnectionRegistry::new(),
            timers: TimerScheduler::detached(),
            engine: GameEngine::new(),
            config: Arc::new(AppConfig::default()),
            code,
            host,
            player,
        }
    }

    impl Fixture {
        fn start(&mut self, requested: Option<GameType>, payload: Value) -> Result<GameType, EngineError> {
            self.engine.start_game(
                &mut self.rooms,
                &self.connections,
                &self.timers,
                &self.config,
                &self.code.clone(),
                requested,
                &payload,
                self.host,
            )
        }

        fn event(&mut self, name: &str, connection_id: ConnectionId, payload: Value) {
            let event = GameEvent {
                name,
                payload: &payload,
                connection_id,
            };
            self.engine.handle_event(
                &mut self.rooms,
                &self.connections,
                &self.timers,
                &self.code.clone(),
                &event,
            );
        }
    }

    #[tokio::test]
    async fn starting_in_an_unknown_room_fails() {
        let mut fx = fixture(None);
        let result = fx.engine.start_game(
            &mut fx.rooms,
            &fx.connections,
            &fx.timers,
            &fx.config,
            "ZZZZ",
            None,
            &Value::Null,
            fx.host,
        );
        assert_eq!(result, Err(EngineError::RoomNotFound));
    }

    #[tokio::test]
    async fn game_type_resolution_prefers_request_then_room_then_default() {
        let mut fx = fixture(Some(GameType::Trivia));
        assert_eq!(fx.start(Some(GameType::Buzzin), json!({})), Ok(GameType::Buzzin));

        let mut fx = fixture(Some(GameType::Trivia));
        assert_eq!(fx.start(None, Value::Null), Ok(GameType::Trivia));

        let mut fx = fixture(None);
        assert_eq!(fx.start(None, Value::Null), Ok(fx.config.default_game_type));
    }

    #[tokio::test]
    async fn starting_marks_the_room_in_progress() {
        let mut fx = fixture(None);
        fx.start(Some(GameType::Buzzin), json!({})).unwrap();

        let room = fx.rooms.get_room(&fx.code).unwrap();
        assert_eq!(room.phase, RoomPhase::InProgress);
        assert_eq!(room.game_type, Some(GameType::Buzzin));
        assert!(fx.engine.has_game(&fx.code));
    }

    #[tokio::test]
    async fn restart_replaces_the_active_instance() {
        let mut fx = fixture(None);
        fx.start(Some(GameType::Reflex), Value::Null).unwrap();
        assert_eq!(fx.start(Some(GameType::Buzzin), json!({})), Ok(GameType::Buzzin));
        assert_eq!(
            fx.rooms.get_room(&fx.code).unwrap().game_type,
            Some(GameType::Buzzin)
        );
    }

    #[tokio::test]
    async fn a_completed_game_is_ended_and_the_room_survives() {
        let mut fx = fixture(None);
        fx.start(
            Some(GameType::Buzzin),
            json!({"categories": ["science"], "questionCount": 5}),
        )
        .unwrap();

        let (host, player) = (fx.host, fx.player);
        for _ in 0..5 {
            fx.event("host:showQuestion", host, Value::Null);
            fx.event("player:buzz", player, Value::Null);
            fx.event("host:nextQuestion", host, Value::Null);
        }

        assert!(!fx.engine.has_game(&fx.code));
        let room = fx.rooms.get_room(&fx.code).unwrap();
        assert_eq!(room.phase, RoomPhase::Ended);
    }

    #[tokio::test]
    async fn end_game_without_an_active_game_is_a_no_op() {
        let mut fx = fixture(None);
        fx.engine
            .end_game(&mut fx.rooms, &fx.connections, &fx.code.clone(), "completed");
        assert_eq!(fx.rooms.get_room(&fx.code).unwrap().phase, RoomPhase::Lobby);
    }

    #[tokio::test]
    async fn state_view_exposes_the_running_game() {
        let mut fx = fixture(None);
        assert!(
            fx.engine
                .state_view(&fx.rooms, &fx.connections, &fx.timers, &fx.code)
                .is_none()
        );

        fx.start(
            Some(GameType::Buzzin),
            json!({"categories": ["science"], "questionCount": 5}),
        )
        .unwrap();
        let state = fx
            .engine
            .state_view(&fx.rooms, &fx.connections, &fx.timers, &fx.code)
            .unwrap();
        assert_eq!(state["phase"], "waiting");
        assert_eq!(state["totalQuestions"], 5);
    }
}
