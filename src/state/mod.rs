//! Shared application state: the connection registry plus the lock-guarded
//! room/game core.

pub mod connections;
pub mod rooms;

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::{
    config::AppConfig,
    dto::ws::ServerMessage,
    games::{GameTimer, TimerScheduler, engine::GameEngine},
    state::{connections::ConnectionRegistry, rooms::RoomManager},
};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Room and game state guarded by one lock. Every mutation of rooms or games
/// runs under it, so racing buzzes, disconnects, and timer fires are fully
/// serialized per process.
pub struct Core {
    /// Room and membership lifecycle.
    pub rooms: RoomManager,
    /// Active game instances.
    pub engine: GameEngine,
}

/// Top-level application state shared by all routes and connections.
pub struct AppState {
    config: Arc<AppConfig>,
    connections: ConnectionRegistry,
    core: Mutex<Core>,
}

impl AppState {
    /// Build the shared state from a loaded configuration.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            connections: ConnectionRegistry::new(),
            core: Mutex::new(Core {
                rooms: RoomManager::new(),
                engine: GameEngine::new(),
            }),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    /// Connection registry; lock-free, usable outside the core lock.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Acquire the room/game core.
    pub async fn core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().await
    }

    /// Number of live rooms, including rooms inside their grace period.
    pub async fn room_count(&self) -> usize {
        self.core.lock().await.rooms.room_count()
    }

    /// Entry point for fired game timers: re-enters the engine under the core
    /// lock, so delivery is serialized with client events.
    pub async fn deliver_game_timer(self: &Arc<Self>, room_code: &str, timer: GameTimer) {
        let timers = TimerScheduler::new(self);
        let mut guard = self.core.lock().await;
        let core = &mut *guard;
        core.engine
            .handle_timer(&mut core.rooms, &self.connections, &timers, room_code, &timer);
    }

    /// Arm the grace-period destruction timer for a newly emptied room. The
    /// cancel handle lives on the room, so a rejoin aborts it via
    /// [`rooms::Room::cancel_destroy_timer`].
    pub fn schedule_room_destruction(self: &Arc<Self>, core: &mut Core, room_code: &str) {
        let Some(room) = core.rooms.get_room_mut(room_code) else {
            return;
        };
        room.cancel_destroy_timer();

        let state = Arc::downgrade(self);
        let code = room_code.to_string();
        let delay = self.config.room_grace_period;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(state) = state.upgrade() {
                state.expire_room(&code).await;
            }
        })
        .abort_handle();

        room.destroy_timer = Some(handle);
    }

    /// Grace-timer expiry. The emptiness condition is re-validated under the
    /// lock: an abort can race the fire, so a repopulated room must survive.
    async fn expire_room(self: &Arc<Self>, room_code: &str) {
        let mut guard = self.core.lock().await;
        let core = &mut *guard;

        let still_empty = core
            .rooms
            .get_room(room_code)
            .is_some_and(|room| room.players.is_empty());
        if !still_empty {
            return;
        }

        core.engine.discard(room_code);
        core.rooms.purge_room(room_code);
        self.connections
            .broadcast(room_code, &ServerMessage::RoomClosed);
        self.connections.drop_channel(room_code);
        info!(room = room_code, "empty room destroyed after grace period");
    }
}
